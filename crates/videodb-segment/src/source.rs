//! Resolves a document's media source to something the transcoder can open.
//!
//! Embedded sources (`bytes` payloads and `data:` uris) are written to a
//! uniquely named temporary file; everything else is handed over as-is.

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use tempfile::TempPath;

use videodb_core::types::MediaDocument;
use videodb_core::{Error, Result};

pub struct MaterializedSource {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl MaterializedSource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    /// Deletes the materialized file unless `retain` is set. Failures are logged.
    pub fn release(self, retain: bool) {
        let Some(temp) = self.temp else { return };
        if retain {
            match temp.keep() {
                Ok(path) => tracing::debug!(path = %path.display(), "retained materialized source"),
                Err(e) => tracing::warn!(error = %e, "failed to retain materialized source"),
            }
        } else if let Err(e) = temp.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove materialized source");
        }
    }
}

pub fn materialize(doc: &MediaDocument) -> Result<MaterializedSource> {
    if let Some(bytes) = &doc.bytes {
        return write_temp(bytes, suffix_from_uri(&doc.uri));
    }
    let uri = doc.uri.trim();
    if uri.is_empty() {
        return Err(Error::InvalidInput(format!("document '{}' has neither uri nor bytes", doc.id)));
    }
    if let Some(rest) = uri.strip_prefix("data:") {
        let (mime, payload) = parse_data_uri(rest)?;
        return write_temp(&payload, suffix_from_mime(&mime));
    }
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    Ok(MaterializedSource { path: PathBuf::from(path), temp: None })
}

/// Splits `<mediatype>;base64,<payload>` and decodes the payload.
fn parse_data_uri(rest: &str) -> Result<(String, Vec<u8>)> {
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidInput("data uri without ',' separator".into()))?;
    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default().to_string();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(Error::InvalidInput("only base64 data uris are supported".into()));
    }
    let payload = STANDARD
        .decode(data.trim())
        .map_err(|e| Error::InvalidInput(format!("invalid base64 in data uri: {e}")))?;
    Ok((mime, payload))
}

fn suffix_from_mime(mime: &str) -> String {
    match mime.rsplit_once('/') {
        Some((_, sub)) if !sub.is_empty() => format!(".{sub}"),
        _ => ".bin".to_string(),
    }
}

fn suffix_from_uri(uri: &str) -> String {
    Path::new(uri)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_else(|| ".bin".to_string())
}

fn write_temp(bytes: &[u8], suffix: String) -> Result<MaterializedSource> {
    let mut file = tempfile::Builder::new()
        .prefix("videodb-src-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| Error::filesystem(std::env::temp_dir(), e))?;
    file.write_all(bytes).map_err(|e| Error::filesystem(file.path(), e))?;
    file.flush().map_err(|e| Error::filesystem(file.path(), e))?;
    let temp = file.into_temp_path();
    Ok(MaterializedSource { path: temp.to_path_buf(), temp: Some(temp) })
}
