use std::path::Path;

use serde_json::json;

use videodb_core::config::{AudioSettings, FrameSampling, Resolution};
use videodb_core::traits::{SegmentParams, Segmenter, Transcoder};
use videodb_core::types::{MediaDocument, Modality};
use videodb_core::{Error, Result};
use videodb_segment::extract::read_wav;
use videodb_segment::{AudioExtractor, AudioSegmenter};

/// Writes `seconds` of a stereo 16-bit track whose channels are `left` and `right`.
struct StereoWav {
    seconds: u32,
    left: i16,
    right: i16,
}

impl Transcoder for StereoWav {
    fn extract_frames(&self, _: &Path, _: FrameSampling, _: Resolution, _: &Path) -> Result<Vec<f64>> {
        Err(Error::Transcoding("not used".into()))
    }

    fn extract_audio(&self, _source: &Path, sample_rate: u32, out_file: &Path) -> Result<()> {
        let spec = hound::WavSpec { channels: 2, sample_rate, bits_per_sample: 16, sample_format: hound::SampleFormat::Int };
        let mut writer = hound::WavWriter::create(out_file, spec).map_err(|e| Error::Decode(e.to_string()))?;
        for _ in 0..self.seconds * sample_rate {
            writer.write_sample(self.left).map_err(|e| Error::Decode(e.to_string()))?;
            writer.write_sample(self.right).map_err(|e| Error::Decode(e.to_string()))?;
        }
        writer.finalize().map_err(|e| Error::Decode(e.to_string()))
    }
}

struct Failing;

impl Transcoder for Failing {
    fn extract_frames(&self, _: &Path, _: FrameSampling, _: Resolution, _: &Path) -> Result<Vec<f64>> {
        Err(Error::Transcoding("not used".into()))
    }

    fn extract_audio(&self, _: &Path, _: u32, _: &Path) -> Result<()> {
        Err(Error::Transcoding("no audio stream".into()))
    }
}

fn video(id: &str) -> MediaDocument {
    let mut doc = MediaDocument::new(id, format!("/videos/{id}"));
    doc.modality = Some(Modality::Video);
    doc.tags.insert("source".into(), json!("toy-data"));
    doc
}

#[test]
fn extracted_track_is_mono_and_tagged() {
    let extractor = AudioExtractor::new(StereoWav { seconds: 2, left: 16384, right: 0 }, 8, false).expect("extractor");
    let audio = extractor.extract(&video("vid1.mp4")).expect("extract");

    assert_eq!(audio.id, "vid1.mp4");
    assert_eq!(audio.uri, "/videos/vid1.mp4");
    assert_eq!(audio.modality, Some(Modality::Audio));
    assert_eq!(audio.tags["sample_rate"], json!(8));
    assert_eq!(audio.tags["source"], json!("toy-data"));

    let samples = audio.samples.expect("samples");
    assert_eq!(samples.len(), 16);
    assert!(samples.iter().all(|s| (s - 0.25).abs() < 1e-6), "channels are averaged: {samples:?}");
}

#[test]
fn extracted_track_feeds_the_window_segmenter() {
    let extractor = AudioExtractor::new(StereoWav { seconds: 10, left: 0, right: 0 }, 10, false).expect("extractor");
    let audio = extractor.extract(&video("vid1.mp4")).expect("extract");

    let segmenter = AudioSegmenter::new(AudioSettings { chunk_duration: 5.0, chunk_stride: 1.0 }).expect("segmenter");
    let chunks = segmenter.segment(&audio, &SegmentParams::default()).expect("segment");
    assert_eq!(chunks.len(), 5);
    assert_eq!(chunks[4].timestamp(), Some(4.0));
    assert!(chunks.iter().all(|c| c.parent_id == "vid1.mp4"));
}

#[test]
fn transcoder_failure_is_propagated() {
    let extractor = AudioExtractor::new(Failing, 16_000, false).expect("extractor");
    let err = extractor.extract(&video("silent.mp4")).unwrap_err();
    assert!(matches!(err, Error::Transcoding(_)), "got {err:?}");
}

#[test]
fn zero_sample_rate_is_rejected() {
    let err = AudioExtractor::new(Failing, 0, false).err().expect("must fail");
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[test]
fn read_wav_accepts_float_samples() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("float.wav");
    let spec = hound::WavSpec { channels: 1, sample_rate: 22_050, bits_per_sample: 32, sample_format: hound::SampleFormat::Float };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for s in [0.5f32, -0.5, 1.0] {
        writer.write_sample(s)?;
    }
    writer.finalize()?;

    let (samples, rate) = read_wav(&path)?;
    assert_eq!(rate, 22_050);
    assert_eq!(samples, vec![0.5, -0.5, 1.0]);
    Ok(())
}

#[test]
fn read_wav_reports_garbage_as_decode_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("garbage.wav");
    std::fs::write(&path, b"RIFF but not really")?;
    assert!(matches!(read_wav(&path), Err(Error::Decode(_))));
    Ok(())
}
