//! Media discovery: turns a directory of video files into raw documents.
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{MediaDocument, Modality};

#[derive(Debug, Clone)]
pub struct MediaLoader {
    extensions: Vec<String>,
}

impl Default for MediaLoader {
    fn default() -> Self {
        Self { extensions: vec!["mp4".to_string()] }
    }
}

impl MediaLoader {
    pub fn new() -> Self { Self::default() }

    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { extensions: extensions.into_iter().map(|e| e.into().to_ascii_lowercase()).collect() }
    }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<MediaDocument>> {
        self.load(data_dir, None)
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<MediaDocument>> {
        self.load(data_dir, Some(limit))
    }

    fn load(&self, data_dir: &Path, limit: Option<usize>) -> Result<Vec<MediaDocument>> {
        if !data_dir.is_dir() {
            return Err(Error::filesystem(
                data_dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "data directory does not exist"),
            ));
        }
        let mut files = self.list_media_files(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no media files found");
            return Ok(vec![]);
        }
        if let Some(limit) = limit {
            if files.len() > limit {
                files.truncate(limit);
                tracing::info!(limit, "limited media files");
            }
        }
        let docs: Vec<MediaDocument> = files.iter().map(|path| self.to_document(path)).collect();
        tracing::info!(count = docs.len(), dir = %data_dir.display(), "loaded media documents");
        Ok(docs)
    }

    fn to_document(&self, file_path: &Path) -> MediaDocument {
        let mut doc = MediaDocument::new(self.extract_doc_id(file_path), file_path.to_string_lossy());
        doc.modality = Some(Modality::Video);
        doc
    }

    /// The file name, extension included; rankers strip it when building links.
    fn extract_doc_id(&self, file_path: &Path) -> String {
        file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.to_string_lossy().to_string())
    }

    fn list_media_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut media_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
            if matches { media_files.push(path.to_path_buf()); }
        }
        media_files.sort();
        media_files
    }
}
