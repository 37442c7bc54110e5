//! Decodes a video's audio track into an audio document ready for windowing.

use std::path::Path;

use videodb_core::traits::Transcoder;
use videodb_core::types::{tags, MediaDocument, Modality};
use videodb_core::{Error, Result};

use crate::source;

pub struct AudioExtractor<T: Transcoder> {
    transcoder: T,
    sample_rate: u32,
    retain_temp: bool,
}

impl<T: Transcoder> AudioExtractor<T> {
    pub fn new(transcoder: T, sample_rate: u32, retain_temp: bool) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidConfiguration("audio extraction needs a positive sample rate".into()));
        }
        Ok(Self { transcoder, sample_rate, retain_temp })
    }

    /// Returns a new document with the same id and uri carrying mono samples
    /// and a `sample_rate` tag.
    pub fn extract(&self, doc: &MediaDocument) -> Result<MediaDocument> {
        let source = source::materialize(doc)?;
        let result = self.extract_from(doc, source.path());
        source.release(self.retain_temp);
        result
    }

    fn extract_from(&self, doc: &MediaDocument, source: &Path) -> Result<MediaDocument> {
        let scratch = tempfile::Builder::new()
            .prefix("videodb-audio-")
            .tempdir()
            .map_err(|e| Error::filesystem(std::env::temp_dir(), e))?;
        let wav_path = scratch.path().join("track.wav");
        let decoded = self
            .transcoder
            .extract_audio(source, self.sample_rate, &wav_path)
            .and_then(|()| read_wav(&wav_path));

        if self.retain_temp {
            let kept = scratch.keep();
            tracing::debug!(path = %kept.display(), "retained audio directory");
        } else {
            let path = scratch.path().to_path_buf();
            if let Err(e) = scratch.close() {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove audio directory");
            }
        }

        let (samples, sample_rate) = decoded?;
        let mut doc_tags = doc.tags.clone();
        doc_tags.insert(tags::SAMPLE_RATE.to_string(), sample_rate.into());
        tracing::debug!(doc_id = %doc.id, samples = samples.len(), sample_rate, "extracted audio track");
        Ok(MediaDocument {
            id: doc.id.clone(),
            uri: doc.uri.clone(),
            samples: Some(samples),
            bytes: None,
            modality: Some(Modality::Audio),
            tags: doc_tags,
            chunks: Vec::new(),
        })
    }
}

/// Reads a WAV file as mono f32 samples in `[-1, 1]`, averaging channels.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path).map_err(|e| Error::Decode(format!("{}: {e}", path.display())))?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Decode(format!("{}: {e}", path.display())))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Decode(format!("{}: {e}", path.display())))?
        }
    };
    let channels = usize::from(spec.channels.max(1));
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };
    Ok((samples, spec.sample_rate))
}
