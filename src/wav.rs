/*! WAV file loading: any `hound`-supported PCM format, downmixed to a
single mono `Float` stream in `[-1.0, 1.0]`.
*/

use crate::{Error, Float, Result};

/// A loaded WAV file's sample rate and mono sample stream.
pub struct Wave {
    pub sample_rate: u32,
    pub samples: Vec<Float>,
}

/// Load a WAV file from `path`, downmixing multi-channel audio to mono by
/// averaging channels and normalizing integer PCM to `[-1.0, 1.0]`.
pub fn load(path: &std::path::Path) -> Result<Wave> {
    let mut reader = hound::WavReader::open(path).map_err(Error::Wav)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let mono: Vec<Float> = match spec.sample_format {
        hound::SampleFormat::Float => {
            let samples: Vec<Float> =
                reader.samples::<f32>().collect::<std::result::Result<_, _>>().map_err(Error::Wav)?;
            downmix(&samples, channels)
        }
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as Float;
            let samples: Vec<Float> = reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as Float * scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(Error::Wav)?;
            downmix(&samples, channels)
        }
    };

    Ok(Wave { sample_rate: spec.sample_rate, samples: mono })
}

fn downmix(samples: &[Float], channels: usize) -> Vec<Float> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<Float>() / frame.len() as Float)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &std::path::Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_mono_16bit_and_normalizes() {
        let dir = std::env::temp_dir();
        let path = dir.join("packetdsp_test_mono.wav");
        write_wav(&path, 1, &[0, i16::MAX, i16::MIN]);
        let wave = load(&path).unwrap();
        assert_eq!(wave.sample_rate, 8000);
        assert_eq!(wave.samples.len(), 3);
        assert!((wave.samples[1] - 1.0).abs() < 1e-3);
        assert!((wave.samples[2] - (-1.0)).abs() < 1e-3);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn downmixes_stereo_by_averaging() {
        let dir = std::env::temp_dir();
        let path = dir.join("packetdsp_test_stereo.wav");
        write_wav(&path, 2, &[i16::MAX, 0, 0, i16::MIN]);
        let wave = load(&path).unwrap();
        assert_eq!(wave.samples.len(), 2);
        assert!((wave.samples[0] - 0.5).abs() < 1e-3);
        assert!((wave.samples[1] - (-0.5)).abs() < 1e-3);
        let _ = std::fs::remove_file(&path);
    }
}
