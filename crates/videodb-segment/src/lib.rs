//! videodb-segment
//!
//! Turns raw media documents into timestamped chunks: sliding audio windows
//! (`audio`) and sampled video frames (`frames`, via an external transcoder),
//! plus the modality `filter` applied before indexing.
pub mod audio;
pub mod batch;
pub mod extract;
pub mod filter;
pub mod frames;
pub mod source;
pub mod transcoder;

pub use audio::{AudioSegmenter, Window};
pub use batch::{segment_batch, segment_video, BatchReport};
pub use extract::AudioExtractor;
pub use filter::ChunkFilter;
pub use frames::FrameSegmenter;
pub use transcoder::FfmpegTranscoder;
