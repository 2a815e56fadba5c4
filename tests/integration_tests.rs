//! Integration Tests
//!
//! End-to-end behavior of the sample transform: buffer shapes, exactness
//! guarantees, channel routing and configuration files.

use pcm_transform::signal::{
    bytes_to_f64s, calculate_peak, deinterleave, f64s_to_bytes, interleave, max_abs_diff,
    periodic_sine,
};
use pcm_transform::{
    ChannelMap, ChannelRoute, ClipPolicy, Endian, ErrorKind, SampleFormat, SampleTransform,
    SampleWidth, TransformConfig, TransformError,
};
use pretty_assertions::assert_eq;
use test_case::test_case;

/// Install a subscriber so `RUST_LOG=pcm_transform=trace` shows engine logs
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fmt(name: &str) -> SampleFormat {
    name.parse().unwrap()
}

/// Encode a periodic sine into the given format
fn sine_in(format: SampleFormat, frames: usize) -> Vec<u8> {
    let double = SampleFormat::new(SampleWidth::Double).with_channels(format.channels() as u16);
    let signal = periodic_sine(frames * format.channels(), 123);
    SampleTransform::with_formats(double, format, None)
        .unwrap()
        .convert(&f64s_to_bytes(&signal, Endian::Little))
        .unwrap()
}

// === Buffer Shape Tests ===

#[test_case("8bit-unsigned", "double-bendian-stereo" ; "widening")]
#[test_case("real24bit-signed-lendian-3ch", "16bit-signed-lendian" ; "narrowing")]
#[test_case("24bit-unsigned-bendian-stereo", "real24bit-signed-bendian-stereo" ; "slot to packed")]
fn test_output_length_is_frames_times_dest_frame(src: &str, dst: &str) {
    init_tracing();
    let (src, dst) = (fmt(src), fmt(dst));
    let map = ChannelMap::new(
        (0..dst.channels())
            .map(|i| ChannelRoute::Source(i % src.channels()))
            .collect(),
    );
    let mut transform = SampleTransform::with_formats(src, dst, Some(map)).unwrap();

    for frames in [0, 1, 7, 5000] {
        let input = vec![0x5Au8; frames * src.frame_size()];
        let output = transform.convert(&input).unwrap();
        assert_eq!(output.len(), frames * dst.frame_size());
    }
}

#[test]
fn test_unaligned_input_produces_no_output() {
    init_tracing();
    let src = fmt("real24bit-signed-lendian-stereo");
    let dst = fmt("float-lendian-stereo");
    let mut transform = SampleTransform::with_formats(src, dst, None).unwrap();

    let mut output = vec![0xAAu8; 8];
    let err = transform.convert_into(&[0u8; 7], &mut output).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert_eq!(output, vec![0xAA; 8]);
}

// === Exactness Tests ===

#[test]
fn test_identity_conversion_is_bit_exact() {
    init_tracing();
    let input: Vec<u8> = (0..=255u8).cycle().take(24 * 40).collect();

    for width in SampleWidth::ALL {
        let format = SampleFormat::new(width).unsigned().big_endian().with_channels(3);
        let mut transform = SampleTransform::with_formats(format, format, None).unwrap();
        assert!(transform.plan().unwrap().is_copy());

        let aligned = &input[..input.len() / format.frame_size() * format.frame_size()];
        assert_eq!(transform.convert(aligned).unwrap(), aligned.to_vec(), "{}", format);
    }
}

#[test]
fn test_16bit_signed_to_unsigned_bendian_and_back() {
    init_tracing();
    let input: Vec<u8> = (i16::MIN..=i16::MAX).flat_map(i16::to_le_bytes).collect();

    let signed = fmt("16bit-signed-lendian");
    let unsigned = fmt("16bit-unsigned-bendian");
    let there = SampleTransform::with_formats(signed, unsigned, None)
        .unwrap()
        .convert(&input)
        .unwrap();
    // -32768 becomes 0, 0 becomes 0x8000
    assert_eq!(&there[..2], &[0x00, 0x00]);
    assert_eq!(&there[65536..65538], &[0x80, 0x00]);

    let back = SampleTransform::with_formats(unsigned, signed, None)
        .unwrap()
        .convert(&there)
        .unwrap();
    assert_eq!(back, input);
}

#[test_case(SampleWidth::Bit8 ; "8bit")]
#[test_case(SampleWidth::Bit16 ; "16bit")]
#[test_case(SampleWidth::Bit24 ; "24bit slot")]
#[test_case(SampleWidth::Bit32 ; "32bit")]
#[test_case(SampleWidth::Real24 ; "real24bit")]
fn test_sign_round_trip_is_exact(width: SampleWidth) {
    init_tracing();
    for endian in [Endian::Little, Endian::Big] {
        let signed = SampleFormat::new(width).with_endian(endian).with_channels(2);
        let unsigned = signed.unsigned();
        let input = sine_in(signed, 1000);

        let mut to_unsigned = SampleTransform::with_formats(signed, unsigned, None).unwrap();
        let mut to_signed = SampleTransform::with_formats(unsigned, signed, None).unwrap();
        let back = to_signed
            .convert(&to_unsigned.convert(&input).unwrap())
            .unwrap();
        assert_eq!(back, input, "{}", signed);
    }
}

// === Channel Routing Tests ===

#[test]
fn test_silence_routes_decode_to_zero() {
    init_tracing();
    let src = fmt("16bit-signed-lendian");
    let input = sine_in(src, 300);

    for width in SampleWidth::ALL {
        for dst in [SampleFormat::new(width), SampleFormat::new(width).unsigned().big_endian()] {
            let dst = dst.with_channels(2);
            let map = ChannelMap::new(vec![ChannelRoute::Silence, ChannelRoute::Source(0)]);
            let output = SampleTransform::with_formats(src, dst, Some(map))
                .unwrap()
                .convert(&input)
                .unwrap();

            let double = SampleFormat::new(SampleWidth::Double).with_channels(2);
            let decoded = SampleTransform::with_formats(dst, double, None)
                .unwrap()
                .convert(&output)
                .unwrap();
            let channels = deinterleave(&bytes_to_f64s(&decoded, Endian::Little), 2);
            assert!(
                channels[0].iter().all(|&s| s == 0.0),
                "silence not exact for {}",
                dst
            );
            assert!(calculate_peak(&channels[1]) > 0.99, "signal lost for {}", dst);
        }
    }
}

#[test]
fn test_stereo_split_and_swap() {
    init_tracing();
    let src = fmt("16bit-signed-lendian-stereo");
    // left = 0x0102, right = 0x0304
    let input: [u8; 4] = [0x02, 0x01, 0x04, 0x03];

    let mono = fmt("16bit");

    let mut left =
        SampleTransform::with_formats(src, mono, Some(ChannelMap::stereo_to_left())).unwrap();
    assert_eq!(left.convert(&input).unwrap(), vec![0x02, 0x01]);

    let mut right =
        SampleTransform::with_formats(src, mono, Some(ChannelMap::stereo_to_right())).unwrap();
    assert_eq!(right.convert(&input).unwrap(), vec![0x04, 0x03]);

    let swapped = ChannelMap::from_sources(&[1, 0]);
    let mut swap = SampleTransform::with_formats(src, src, Some(swapped)).unwrap();
    assert_eq!(swap.convert(&input).unwrap(), vec![0x04, 0x03, 0x02, 0x01]);
}

#[test]
fn test_swapped_channels_stay_independent() {
    init_tracing();
    let left = periodic_sine(1000, 123);
    let right: Vec<f64> = periodic_sine(1000, 50).iter().map(|s| s * 0.5).collect();
    let input = f64s_to_bytes(&interleave(&[left.clone(), right.clone()]), Endian::Little);

    let double = fmt("double-lendian-stereo");
    let packed = fmt("24bit-unsigned-bendian-stereo");
    let swap = ChannelMap::from_sources(&[1, 0]);

    let encoded = SampleTransform::with_formats(double, packed, Some(swap))
        .unwrap()
        .convert(&input)
        .unwrap();
    let decoded = SampleTransform::with_formats(packed, double, None)
        .unwrap()
        .convert(&encoded)
        .unwrap();
    let channels = deinterleave(&bytes_to_f64s(&decoded, Endian::Little), 2);

    let step = 1.0 / 8_388_608.0;
    let (diff, index) = max_abs_diff(&right, &channels[0]);
    assert!(diff <= step, "left output differs by {diff} at {index}");
    let (diff, index) = max_abs_diff(&left, &channels[1]);
    assert!(diff <= step, "right output differs by {diff} at {index}");
}

#[test]
fn test_packed_channel_map_configures() {
    init_tracing();
    let src = fmt("8bit-signed-stereo");
    let dst = fmt("8bit-signed-stereo");
    let map = ChannelMap::from_packed(ChannelMap::UNITY_PACKED, 2).unwrap();

    let transform = SampleTransform::with_formats(src, dst, Some(map)).unwrap();
    assert!(transform.plan().unwrap().is_copy());
}

// === Staging Tests ===

#[test_case(16 ; "one frame blocks")]
#[test_case(100 ; "uneven blocks")]
#[test_case(65000 ; "large blocks")]
fn test_staging_size_does_not_change_output(staging: usize) {
    init_tracing();
    let src = fmt("float-bendian-stereo");
    let dst = fmt("real24bit-unsigned-lendian-stereo");
    let input = sine_in(src, 1756);

    let mut reference = SampleTransform::with_formats(src, dst, None).unwrap();
    let mut blocked = SampleTransform::new();
    blocked.reserve_staging(staging).unwrap();
    blocked.configure_default(src, dst).unwrap();

    assert_eq!(blocked.convert(&input).unwrap(), reference.convert(&input).unwrap());
}

#[test]
fn test_reuse_across_reconfigure() {
    init_tracing();
    let mut transform = SampleTransform::new();
    transform.reserve_staging(4096).unwrap();

    let pairs = [
        ("8bit-unsigned", "16bit"),
        ("double-stereo", "32bit-unsigned-bendian-stereo"),
    ];
    for (src, dst) in pairs {
        let (src, dst) = (fmt(src), fmt(dst));
        transform.configure_default(src, dst).unwrap();
        let input = sine_in(src, 2000);
        let output = transform.convert(&input).unwrap();
        assert_eq!(output.len(), 2000 * dst.frame_size());
    }
    assert_eq!(transform.staging_bytes(), 4096);
}

// === Clip Policy and Config Tests ===

#[test]
fn test_strict_config_from_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transform.json");
    std::fs::write(
        &path,
        r#"{"source": "double", "dest": "16bit-signed-bendian", "clip_policy": "strict"}"#,
    )
    .unwrap();

    let mut transform = TransformConfig::from_json_file(&path).unwrap().build().unwrap();
    let input = f64s_to_bytes(&[0.5, 1.5, -0.5], Endian::Little);

    let err = transform.convert(&input).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert!(matches!(err, TransformError::Clipped { clipped_samples: 1, .. }));
    assert_eq!(
        err.into_output().unwrap(),
        vec![0x40, 0x00, 0x7F, 0xFF, 0xC0, 0x00]
    );

    transform.set_clip_policy(ClipPolicy::Clamp);
    assert_eq!(transform.convert(&input).unwrap().len(), 6);
}
