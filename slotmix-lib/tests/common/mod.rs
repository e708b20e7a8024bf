use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

/// Write interleaved 16-bit PCM to `dir/name` and return the path.
pub fn write_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    channels: u16,
    samples: &[i16],
) -> PathBuf {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let path = dir.join(name);
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
    path
}
