use videodb_core::config::FilterSettings;
use videodb_core::types::{MediaDocument, Modality};

/// Keeps only chunks of one modality. Without a target it is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkFilter {
    modality: Option<Modality>,
}

impl ChunkFilter {
    pub fn new(modality: Option<Modality>) -> Self {
        Self { modality }
    }

    pub fn from_settings(settings: &FilterSettings) -> Self {
        Self::new(settings.modality)
    }

    pub fn modality(&self) -> Option<Modality> {
        self.modality
    }

    pub fn apply(&self, doc: &mut MediaDocument) {
        let Some(target) = self.modality else { return };
        let before = doc.chunks.len();
        doc.chunks.retain(|c| c.modality == target);
        tracing::trace!(doc_id = %doc.id, %target, before, after = doc.chunks.len(), "filtered chunks");
    }

    pub fn apply_batch(&self, docs: &mut [MediaDocument]) {
        for doc in docs {
            self.apply(doc);
        }
    }
}
