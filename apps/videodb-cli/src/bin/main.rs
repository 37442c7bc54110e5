use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use videodb_core::config::{expand_path, Config, Settings};
use videodb_core::data_processor::MediaLoader;
use videodb_core::logging;
use videodb_core::traits::SegmentParams;
use videodb_core::types::{Chunk, Location, MediaDocument, Modality, QueryDocument};
use videodb_rank::{MatchAggregator, RankParams};
use videodb_segment::{
    segment_video, AudioExtractor, AudioSegmenter, BatchReport, ChunkFilter, FfmpegTranscoder, FrameSegmenter,
};

#[derive(Parser)]
#[command(name = "videodb", version, about = "Segment videos into searchable chunks and rank chunk-level matches")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample frames and audio windows from every video in DATA_DIR
    Segment {
        /// Defaults to `data_dir` from the configuration
        data_dir: Option<PathBuf>,
        /// Only process the first N videos
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Aggregate chunk-level matches (JSON array of query documents) per video
    Rank {
        matches: PathBuf,
        #[arg(long)]
        top_k: Option<usize>,
        /// min, max, mean_min or mean_max
        #[arg(long)]
        policy: Option<String>,
    },
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    id: &'a str,
    uri: &'a str,
    chunks: Vec<ChunkEntry<'a>>,
}

/// Chunk metadata without the payload.
#[derive(Serialize)]
struct ChunkEntry<'a> {
    id: &'a str,
    modality: Modality,
    offset: usize,
    location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<f64>,
}

impl<'a> From<&'a Chunk> for ChunkEntry<'a> {
    fn from(chunk: &'a Chunk) -> Self {
        Self {
            id: &chunk.id,
            modality: chunk.modality,
            offset: chunk.offset,
            location: chunk.location,
            timestamp: chunk.timestamp(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    logging::init_with_config(&config.settings().logging);
    let cli = Cli::parse();
    match cli.command {
        Command::Segment { data_dir, limit } => segment(config.settings(), data_dir, limit),
        Command::Rank { matches, top_k, policy } => rank(config.settings(), &matches, top_k, policy),
    }
}

fn segment(settings: &Settings, data_dir: Option<PathBuf>, limit: Option<usize>) -> anyhow::Result<()> {
    let workspace = expand_path(&settings.workspace);
    if workspace.exists() {
        println!("Workspace {} already exists. Remove it to re-index.", workspace.display());
        std::process::exit(1);
    }
    let data_dir = data_dir.unwrap_or_else(|| expand_path(&settings.data_dir));
    println!("Video Segmenter\n===============");
    println!("Data directory: {}", data_dir.display());

    let loader = MediaLoader::new();
    let mut docs = match limit {
        Some(limit) => {
            println!("🔢 Limiting to {} videos", limit);
            loader.load_directory_limited(&data_dir, limit)?
        }
        None => loader.load_directory(&data_dir)?,
    };

    let frames = &settings.segment.frames;
    let transcoder = Arc::new(FfmpegTranscoder::from_settings(frames)?);
    let frame_segmenter = FrameSegmenter::new(Arc::clone(&transcoder), frames)?;
    let extractor = AudioExtractor::new(Arc::clone(&transcoder), frames.audio_sample_rate, frames.retain_temp)?;
    let audio_segmenter = AudioSegmenter::new(settings.segment.audio)?;
    let params = SegmentParams::default();

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);
    let mut report = BatchReport::default();
    for doc in docs.iter_mut() {
        pb.set_message(doc.id.clone());
        match segment_video(doc, &frame_segmenter, &extractor, &audio_segmenter, &params) {
            Ok(chunks) => {
                report.chunks += chunks.len();
                doc.chunks = chunks;
            }
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, error = %e, "skipping video");
                report.failed.push((doc.id.clone(), e));
            }
        }
        report.processed += 1;
        pb.inc(1);
    }
    pb.finish_and_clear();

    ChunkFilter::from_settings(&settings.filter).apply_batch(&mut docs);
    let manifest_path = write_manifest(&workspace, &docs)?;

    let kept: usize = docs.iter().map(|d| d.chunks.len()).sum();
    println!("\n✅ Segmentation completed");
    println!("📊 {} videos, {} chunks produced, {} kept after filtering", report.processed, report.chunks, kept);
    if !report.is_clean() {
        println!("⚠️  {} videos failed:", report.failed.len());
        for (id, e) in &report.failed {
            println!("   {}: {}", id, e);
        }
    }
    println!("📄 Manifest: {}", manifest_path.display());
    Ok(())
}

fn write_manifest(workspace: &Path, docs: &[MediaDocument]) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(workspace)?;
    let entries: Vec<ManifestEntry> = docs
        .iter()
        .map(|d| ManifestEntry { id: &d.id, uri: &d.uri, chunks: d.chunks.iter().map(ChunkEntry::from).collect() })
        .collect();
    let path = workspace.join("chunks.json");
    fs::write(&path, serde_json::to_string_pretty(&entries)?)?;
    Ok(path)
}

fn rank(settings: &Settings, matches: &Path, top_k: Option<usize>, policy: Option<String>) -> anyhow::Result<()> {
    let mut rank_settings = settings.rank.clone();
    if let Some(policy) = policy {
        rank_settings.policy = policy;
    }
    let aggregator = MatchAggregator::from_settings(&rank_settings)?;
    let queries: Vec<QueryDocument> = serde_json::from_str(&fs::read_to_string(matches)?)?;
    let results = aggregator.aggregate_batch(&queries, &RankParams { top_k });
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
