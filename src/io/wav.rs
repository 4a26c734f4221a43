//! WAV-only audio reading: metadata probing and mono float32 PCM decode.
//!
//! Grounded directly in `read_audio_metadata` / `_read_wav_metadata` /
//! `read_wav_audio` from the original `io/audio.py`: only `.wav`/`.wave`
//! suffixes are supported, 8/16/32-bit PCM is converted to `[-1, 1]`
//! float samples, and multichannel audio is downmixed by averaging.
//! Uses `byteorder` directly over the RIFF container rather than the
//! teacher's `symphonia`, since the WAV contract here is fully pinned
//! (exact bit depths, exact downmix rule) and a general-purpose decoder
//! both over- and under-specifies it.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioMetadata {
    pub duration_sec: f64,
    pub sample_rate_hz: u32,
    pub audio_format: &'static str,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WavError {
    #[error("unsupported audio container (only .wav/.wave is supported)")]
    UnsupportedContainer,
    #[error("failed to read audio file: {0}")]
    Io(String),
    #[error("malformed RIFF/WAVE container: {0}")]
    Malformed(String),
    #[error("unsupported PCM sample width: {0} bytes")]
    UnsupportedSampleWidth(u16),
}

struct FmtChunk {
    channels: u16,
    sample_rate_hz: u32,
    bits_per_sample: u16,
}

/// Read duration/sample-rate metadata for a WAV file. Returns `None`-like
/// semantics via `Err` for unsupported containers or unparseable files,
/// matching the original's "degrade gracefully" contract.
pub fn read_audio_metadata(path: &Path) -> Result<AudioMetadata, WavError> {
    require_wav_suffix(path)?;
    let bytes = fs::read(path).map_err(|err| WavError::Io(err.to_string()))?;
    let (fmt, data_len) = parse_chunks(&bytes)?;
    if fmt.sample_rate_hz == 0 {
        return Err(WavError::Malformed("sample rate is zero".to_string()));
    }

    let bytes_per_sample = (fmt.bits_per_sample / 8).max(1) as usize;
    let frame_size = bytes_per_sample * fmt.channels.max(1) as usize;
    let frame_count = if frame_size == 0 { 0 } else { data_len / frame_size };
    let duration_sec = round3(frame_count as f64 / f64::from(fmt.sample_rate_hz));

    Ok(AudioMetadata {
        duration_sec,
        sample_rate_hz: fmt.sample_rate_hz,
        audio_format: "wav",
    })
}

/// Decode a WAV file to mono float32 samples in `[-1, 1]`, along with its
/// native sample rate.
pub fn read_wav_audio(path: &Path) -> Result<(Vec<f32>, u32), WavError> {
    require_wav_suffix(path)?;
    let bytes = fs::read(path).map_err(|err| WavError::Io(err.to_string()))?;
    let (fmt, data) = parse_chunks_with_data(&bytes)?;
    if fmt.sample_rate_hz == 0 || fmt.channels == 0 {
        return Err(WavError::Malformed("invalid sample rate or channel count".to_string()));
    }

    let samples = decode_pcm(&data, fmt.bits_per_sample)?;
    let mono = downmix(&samples, fmt.channels as usize);
    Ok((mono, fmt.sample_rate_hz))
}

fn require_wav_suffix(path: &Path) -> Result<(), WavError> {
    let suffix = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());
    match suffix.as_deref() {
        Some("wav") | Some("wave") => Ok(()),
        _ => Err(WavError::UnsupportedContainer),
    }
}

fn parse_chunks(bytes: &[u8]) -> Result<(FmtChunk, usize), WavError> {
    let mut cursor = riff_cursor(bytes)?;
    let mut fmt: Option<FmtChunk> = None;
    let mut data_len: Option<usize> = None;

    while let Some((id, len)) = read_chunk_header(&mut cursor) {
        match &id {
            b"fmt " => fmt = Some(read_fmt_chunk(&mut cursor, len)?),
            b"data" => {
                data_len = Some(len as usize);
                skip(&mut cursor, len)?;
            }
            _ => skip(&mut cursor, len)?,
        }
    }

    let fmt = fmt.ok_or_else(|| WavError::Malformed("missing fmt chunk".to_string()))?;
    let data_len = data_len.ok_or_else(|| WavError::Malformed("missing data chunk".to_string()))?;
    Ok((fmt, data_len))
}

fn parse_chunks_with_data(bytes: &[u8]) -> Result<(FmtChunk, Vec<u8>), WavError> {
    let mut cursor = riff_cursor(bytes)?;
    let mut fmt: Option<FmtChunk> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some((id, len)) = read_chunk_header(&mut cursor) {
        match &id {
            b"fmt " => fmt = Some(read_fmt_chunk(&mut cursor, len)?),
            b"data" => {
                let mut buf = vec![0u8; len as usize];
                cursor
                    .read_exact(&mut buf)
                    .map_err(|err| WavError::Malformed(err.to_string()))?;
                if len % 2 == 1 {
                    skip(&mut cursor, 1)?;
                }
                data = Some(buf);
            }
            _ => skip(&mut cursor, len)?,
        }
    }

    let fmt = fmt.ok_or_else(|| WavError::Malformed("missing fmt chunk".to_string()))?;
    let data = data.ok_or_else(|| WavError::Malformed("missing data chunk".to_string()))?;
    Ok((fmt, data))
}

fn riff_cursor(bytes: &[u8]) -> Result<Cursor<&[u8]>, WavError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(WavError::Malformed("not a RIFF/WAVE file".to_string()));
    }
    let mut cursor = Cursor::new(bytes);
    cursor.set_position(12);
    Ok(cursor)
}

fn read_chunk_header(cursor: &mut Cursor<&[u8]>) -> Option<([u8; 4], u32)> {
    let mut id = [0u8; 4];
    if cursor.read_exact(&mut id).is_err() {
        return None;
    }
    let len = cursor.read_u32::<LittleEndian>().ok()?;
    Some((id, len))
}

fn read_fmt_chunk(cursor: &mut Cursor<&[u8]>, len: u32) -> Result<FmtChunk, WavError> {
    if len < 16 {
        return Err(WavError::Malformed("fmt chunk too short".to_string()));
    }
    let _audio_format = cursor.read_u16::<LittleEndian>().map_err(malformed)?;
    let channels = cursor.read_u16::<LittleEndian>().map_err(malformed)?;
    let sample_rate_hz = cursor.read_u32::<LittleEndian>().map_err(malformed)?;
    let _byte_rate = cursor.read_u32::<LittleEndian>().map_err(malformed)?;
    let _block_align = cursor.read_u16::<LittleEndian>().map_err(malformed)?;
    let bits_per_sample = cursor.read_u16::<LittleEndian>().map_err(malformed)?;
    skip(cursor, len - 16)?;

    Ok(FmtChunk {
        channels,
        sample_rate_hz,
        bits_per_sample,
    })
}

fn skip(cursor: &mut Cursor<&[u8]>, len: u32) -> Result<(), WavError> {
    if len == 0 {
        return Ok(());
    }
    let padded = len + (len % 2);
    let mut buf = vec![0u8; padded as usize];
    cursor.read_exact(&mut buf).map_err(malformed)?;
    Ok(())
}

fn malformed(err: impl std::fmt::Display) -> WavError {
    WavError::Malformed(err.to_string())
}

fn decode_pcm(data: &[u8], bits_per_sample: u16) -> Result<Vec<f32>, WavError> {
    match bits_per_sample {
        8 => Ok(data.iter().map(|&b| (f32::from(b) - 128.0) / 128.0).collect()),
        16 => {
            let mut cursor = Cursor::new(data);
            let mut samples = Vec::with_capacity(data.len() / 2);
            while let Ok(value) = cursor.read_i16::<LittleEndian>() {
                samples.push(f32::from(value) / 32768.0);
            }
            Ok(samples)
        }
        32 => {
            let mut cursor = Cursor::new(data);
            let mut samples = Vec::with_capacity(data.len() / 4);
            while let Ok(value) = cursor.read_i32::<LittleEndian>() {
                samples.push(value as f32 / 2_147_483_648.0);
            }
            Ok(samples)
        }
        other => Err(WavError::UnsupportedSampleWidth(other / 8)),
    }
}

fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .filter(|chunk| chunk.len() == channels)
        .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_wav(sample_rate: u32, channels: u16, bits_per_sample: u16, samples: &[i16]) -> Vec<u8> {
        let mut data = Vec::new();
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        let byte_rate = sample_rate * u32::from(channels) * u32::from(bits_per_sample / 8);
        let block_align = channels * (bits_per_sample / 8);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&bits_per_sample.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&data);
        bytes
    }

    #[test]
    fn parses_metadata_from_mono_16bit_wav() {
        let samples = [0i16, 100, -100, 200, -200];
        let bytes = build_wav(16_000, 1, 16, &samples);
        let (fmt, data_len) = parse_chunks(&bytes).unwrap();
        assert_eq!(fmt.sample_rate_hz, 16_000);
        assert_eq!(fmt.channels, 1);
        assert_eq!(data_len, samples.len() * 2);
    }

    #[test]
    fn decodes_stereo_16bit_pcm_and_downmixes() {
        let samples = [1000i16, -1000, 2000, -2000];
        let bytes = build_wav(8_000, 2, 16, &samples);
        let (fmt, data) = parse_chunks_with_data(&bytes).unwrap();
        let decoded = decode_pcm(&data, fmt.bits_per_sample).unwrap();
        let mono = downmix(&decoded, fmt.channels as usize);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn eight_bit_pcm_centers_at_zero() {
        let decoded = decode_pcm(&[128, 0, 255], 8).unwrap();
        assert!((decoded[0] - 0.0).abs() < 1e-6);
        assert!(decoded[1] < 0.0);
        assert!(decoded[2] > 0.0);
    }

    #[test]
    fn non_wav_suffix_is_rejected() {
        let result = require_wav_suffix(Path::new("clip.mp3"));
        assert!(matches!(result, Err(WavError::UnsupportedContainer)));
    }
}
