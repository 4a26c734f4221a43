//! Audio and export I/O: WAV reading, resampling, JSON serialization.

pub mod export;
pub mod resample;
pub mod wav;

pub use export::{to_json, write_json, ExportError};
pub use resample::{resample_linear, ResampleError};
pub use wav::{read_audio_metadata, read_wav_audio, AudioMetadata, WavError};
