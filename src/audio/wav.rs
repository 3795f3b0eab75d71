//! WAV decoding and recorded-file access.
//!
//! Capture sessions write raw little-endian PCM, byte for byte as read from
//! the device. Pre-recorded assets usually carry a RIFF header instead, so
//! readers here detect and skip it; both kinds of file feed the same
//! playback and recognition paths.

use crate::defaults::{SAMPLE_RATE, WAV_HEADER_BYTES};
use crate::error::{Result, TalkbackError};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Open a recorded or pre-recorded file as a raw PCM byte stream.
///
/// If the file begins with a RIFF magic, the canonical 44-byte header is
/// skipped; otherwise the stream starts at byte 0.
pub fn open_pcm_source(path: &Path) -> Result<Box<dyn Read + Send>> {
    let mut file = File::open(path)?;

    let mut magic = [0u8; 4];
    let read = file.read(&mut magic)?;
    if read == 4 && &magic == b"RIFF" {
        file.seek(SeekFrom::Start(WAV_HEADER_BYTES as u64))?;
    } else {
        file.seek(SeekFrom::Start(0))?;
    }

    Ok(Box::new(BufReader::new(file)))
}

/// Decode a WAV file to 16kHz mono i16 samples.
///
/// Accepts arbitrary rates and mono/stereo layouts: stereo is mixed down by
/// averaging, other rates are linearly resampled.
pub fn decode_wav(path: &Path) -> Result<Vec<i16>> {
    let mut reader = hound::WavReader::open(path).map_err(|e| TalkbackError::Other(format!(
        "Failed to parse WAV file {}: {}",
        path.display(),
        e
    )))?;

    let spec = reader.spec();
    let source_rate = spec.sample_rate;
    let source_channels = spec.channels;

    let raw: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TalkbackError::Other(format!("Failed to read WAV samples: {}", e)))?;

    let mono: Vec<i16> = match source_channels {
        1 => raw,
        2 => raw
            .chunks_exact(2)
            .map(|frame| ((frame[0] as i32 + frame[1] as i32) / 2) as i16)
            .collect(),
        n => {
            return Err(TalkbackError::Other(format!(
                "Unsupported WAV channel count: {}",
                n
            )));
        }
    };

    if source_rate == SAMPLE_RATE {
        Ok(mono)
    } else {
        Ok(resample(&mono, source_rate, SAMPLE_RATE))
    }
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

/// i16 samples to little-endian PCM bytes.
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Little-endian PCM bytes to i16 samples. A trailing odd byte is dropped.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn open_pcm_source_reads_raw_file_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.pcm");
        std::fs::write(&path, [1u8, 2, 3, 4]).unwrap();

        let mut source = open_pcm_source(&path).unwrap();
        let mut data = Vec::new();
        source.read_to_end(&mut data).unwrap();
        assert_eq!(data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn open_pcm_source_skips_riff_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.wav");
        write_wav(&path, 16000, 1, &[100, 200, 300]);

        let mut source = open_pcm_source(&path).unwrap();
        let mut data = Vec::new();
        source.read_to_end(&mut data).unwrap();

        assert_eq!(bytes_to_samples(&data), vec![100, 200, 300]);
    }

    #[test]
    fn open_pcm_source_short_file_is_not_riff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.pcm");
        std::fs::write(&path, [9u8, 9]).unwrap();

        let mut source = open_pcm_source(&path).unwrap();
        let mut data = Vec::new();
        source.read_to_end(&mut data).unwrap();
        assert_eq!(data, vec![9, 9]);
    }

    #[test]
    fn decode_wav_mono_16khz_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let samples = vec![1i16, -2, 3, -4];
        write_wav(&path, 16000, 1, &samples);

        assert_eq!(decode_wav(&path).unwrap(), samples);
    }

    #[test]
    fn decode_wav_stereo_mixes_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 16000, 2, &[100, 200, -100, 100]);

        assert_eq!(decode_wav(&path).unwrap(), vec![150, 0]);
    }

    #[test]
    fn decode_wav_48khz_resamples_to_16khz() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hires.wav");
        let samples = vec![0i16; 48000];
        write_wav(&path, 48000, 1, &samples);

        let decoded = decode_wav(&path).unwrap();
        assert!((decoded.len() as i64 - 16000).abs() <= 1);
    }

    #[test]
    fn decode_wav_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"not a wav file").unwrap();

        assert!(decode_wav(&path).is_err());
    }

    #[test]
    fn resample_identity_same_rate() {
        let samples = vec![1i16, 2, 3];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn resample_halves_length_on_downsample() {
        let samples = vec![0i16; 3200];
        let out = resample(&samples, 32000, 16000);
        assert_eq!(out.len(), 1600);
    }

    #[test]
    fn sample_byte_round_trip() {
        let samples = vec![0i16, -1, i16::MAX, i16::MIN];
        assert_eq!(bytes_to_samples(&samples_to_bytes(&samples)), samples);
    }

    #[test]
    fn bytes_to_samples_drops_odd_trailing_byte() {
        assert_eq!(bytes_to_samples(&[0, 1, 2]), vec![256]);
    }
}
