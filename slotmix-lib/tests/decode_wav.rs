mod common;

use slotmix_lib::asset::{AudioAsset, PcmDecoder, SymphoniaDecoder};
use slotmix_lib::AssetLoadError;
use tempfile::TempDir;

#[test]
fn mono_wav_is_duplicated_into_stereo() {
    let dir = TempDir::new().unwrap();
    let source: Vec<i16> = (0..1_000).map(|i| (i * 30 - 15_000) as i16).collect();
    let path = common::write_wav(dir.path(), "mono.wav", 44_100, 1, &source);

    let asset = AudioAsset::load(&path).unwrap();
    assert_eq!(asset.length(), source.len());
    assert_eq!(asset.source().channels, 1);
    for (index, sample) in source.iter().enumerate() {
        let expected = *sample as f32 / i16::MAX as f32;
        assert_eq!(asset.frame(index), Some((expected, expected)));
    }
}

#[test]
fn stereo_wav_keeps_both_sides() {
    let dir = TempDir::new().unwrap();
    let source = [i16::MAX, -i16::MAX, 8_192, -4_096, 0, 1];
    let path = common::write_wav(dir.path(), "stereo.wav", 48_000, 2, &source);

    let asset = AudioAsset::load(&path).unwrap();
    assert_eq!(asset.length(), 3);
    assert_eq!(asset.source().sample_rate, 48_000);
    assert_eq!(asset.frame(0), Some((1.0, -1.0)));
    let (left, right) = asset.frame(1).unwrap();
    assert!((left - 8_192.0 / 32_767.0).abs() < 1e-6);
    assert!((right + 4_096.0 / 32_767.0).abs() < 1e-6);
}

#[test]
fn decoder_reports_the_raw_layout() {
    let dir = TempDir::new().unwrap();
    let path = common::write_wav(dir.path(), "raw.wav", 22_050, 2, &[100; 40]);

    let pcm = SymphoniaDecoder.decode(&path).unwrap();
    assert_eq!(pcm.sample_rate, 22_050);
    assert_eq!(pcm.channels, 2);
    assert_eq!(pcm.frames, 20);
    assert_eq!(pcm.samples.len(), 40);
}

#[test]
fn quad_wav_decodes_but_is_rejected_as_an_asset() {
    let dir = TempDir::new().unwrap();
    let path = common::write_wav(dir.path(), "quad.wav", 44_100, 4, &[250; 400]);

    let pcm = SymphoniaDecoder.decode(&path).unwrap();
    assert_eq!(pcm.channels, 4);
    assert_eq!(pcm.frames, 100);

    let err = AudioAsset::load(&path).unwrap_err();
    assert!(matches!(err, AssetLoadError::UnsupportedChannels(4)));
}

#[test]
fn garbage_files_fail_to_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noise.wav");
    std::fs::write(&path, b"definitely not a riff file").unwrap();

    let err = AudioAsset::load(&path).unwrap_err();
    assert!(!matches!(err, AssetLoadError::Empty(_)));
}
