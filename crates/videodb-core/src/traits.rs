use std::path::Path;

use crate::config::{FrameSampling, Resolution};
use crate::error::Result;
use crate::types::{Chunk, MediaDocument, Modality};

/// Per-request overrides for segmentation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SegmentParams {
    /// Overrides the configured audio window stride, in seconds.
    pub chunk_stride: Option<f64>,
}

/// Turns one raw document into its ordered chunks.
///
/// Implementations hold only immutable configuration, so one instance may be
/// shared across threads processing independent documents.
pub trait Segmenter: Send + Sync {
    fn modality(&self) -> Modality;
    fn segment(&self, doc: &MediaDocument, params: &SegmentParams) -> Result<Vec<Chunk>>;
}

/// External decoder invoked by the frame and audio paths.
pub trait Transcoder: Send + Sync {
    /// Writes numbered PNG frames (`frame_00001.png`, ...) into `out_dir`.
    ///
    /// Returns the presentation time in seconds of each written frame, in
    /// file order, when the transcoder knows it. Fixed-rate sampling may
    /// return an empty list; the rate then determines the times.
    fn extract_frames(
        &self,
        source: &Path,
        sampling: FrameSampling,
        resolution: Resolution,
        out_dir: &Path,
    ) -> Result<Vec<f64>>;

    /// Writes the audio track as mono 16-bit PCM WAV at `sample_rate`.
    fn extract_audio(&self, source: &Path, sample_rate: u32, out_file: &Path) -> Result<()>;
}

impl<T: Transcoder + ?Sized> Transcoder for std::sync::Arc<T> {
    fn extract_frames(
        &self,
        source: &Path,
        sampling: FrameSampling,
        resolution: Resolution,
        out_dir: &Path,
    ) -> Result<Vec<f64>> {
        (**self).extract_frames(source, sampling, resolution, out_dir)
    }

    fn extract_audio(&self, source: &Path, sample_rate: u32, out_file: &Path) -> Result<()> {
        (**self).extract_audio(source, sample_rate, out_file)
    }
}
