//! Reduces chunk-level matches to one ranked entry per parent document.

use indexmap::IndexMap;

use videodb_core::config::RankSettings;
use videodb_core::types::{AggregatedDocument, AggregatedMatch, Match, Modality, QueryDocument, ResultTags};
use videodb_core::{Error, Result};

use crate::policy::{RankingPolicy, SortDirection, Strategy};

/// Divisor applied to image-modality timestamps. Frame chunks are already
/// stamped in seconds, so it stays 1.
pub const FRAMES_PER_SECOND: f64 = 1.0;
pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankParams {
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct MatchAggregator {
    metric: String,
    policy: RankingPolicy,
    top_k: usize,
    /// `None` admits every modality.
    modalities: Option<Vec<Modality>>,
}

impl MatchAggregator {
    pub fn new(metric: impl Into<String>, policy: RankingPolicy, top_k: usize) -> Result<Self> {
        let metric = metric.into();
        if metric.trim().is_empty() {
            return Err(Error::InvalidConfiguration("ranking metric must not be empty".into()));
        }
        Ok(Self { metric, policy, top_k, modalities: None })
    }

    /// Aggregator that only groups matches of the given modalities.
    pub fn blended(
        metric: impl Into<String>,
        policy: RankingPolicy,
        top_k: usize,
        modalities: impl IntoIterator<Item = Modality>,
    ) -> Result<Self> {
        let mut aggregator = Self::new(metric, policy, top_k)?;
        aggregator.modalities = Some(modalities.into_iter().collect());
        Ok(aggregator)
    }

    /// An empty `modalities` list means no modality restriction.
    pub fn from_settings(settings: &RankSettings) -> Result<Self> {
        let policy: RankingPolicy = settings.policy.parse()?;
        if settings.modalities.is_empty() {
            Self::new(settings.metric.clone(), policy, settings.top_k)
        } else {
            Self::blended(settings.metric.clone(), policy, settings.top_k, settings.modalities.iter().copied())
        }
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn policy(&self) -> RankingPolicy {
        self.policy
    }

    fn admits(&self, modality: Modality) -> bool {
        self.modalities.as_ref().map_or(true, |allowed| allowed.contains(&modality))
    }

    pub fn aggregate(&self, query: &QueryDocument, params: &RankParams) -> AggregatedDocument {
        let mut groups: IndexMap<&str, Vec<(&Match, f64)>> = IndexMap::new();
        let mut skipped = 0usize;
        for m in &query.matches {
            if !self.admits(m.modality) {
                continue;
            }
            match m.score(&self.metric) {
                Some(score) if score.is_finite() => groups.entry(m.parent_id.as_str()).or_default().push((m, score)),
                Some(score) => {
                    skipped += 1;
                    tracing::debug!(query = %query.id, match_id = %m.id, score, "non-finite score, skipping");
                }
                None => {
                    skipped += 1;
                    tracing::debug!(query = %query.id, match_id = %m.id, metric = %self.metric, "match lacks metric, skipping");
                }
            }
        }

        let strategy = self.policy.strategy();
        let mut ranked: Vec<(f64, AggregatedMatch)> =
            groups.into_iter().map(|(parent, group)| self.reduce_group(parent, &group, &strategy)).collect();
        match strategy.direction {
            SortDirection::Ascending => ranked.sort_by(|a, b| a.0.total_cmp(&b.0)),
            SortDirection::Descending => ranked.sort_by(|a, b| b.0.total_cmp(&a.0)),
        }
        ranked.truncate(params.top_k.unwrap_or(self.top_k));

        tracing::debug!(
            query = %query.id,
            policy = %self.policy,
            input = query.matches.len(),
            skipped,
            output = ranked.len(),
            "aggregated matches"
        );
        AggregatedDocument { id: query.id.clone(), matches: ranked.into_iter().map(|(_, m)| m).collect() }
    }

    pub fn aggregate_batch(&self, queries: &[QueryDocument], params: &RankParams) -> Vec<AggregatedDocument> {
        queries.iter().map(|q| self.aggregate(q, params)).collect()
    }

    fn reduce_group(&self, parent: &str, group: &[(&Match, f64)], strategy: &Strategy) -> (f64, AggregatedMatch) {
        let values: Vec<f64> = group.iter().map(|(_, score)| *score).collect();
        let score = (strategy.reduce)(&values);
        let timestamp = strategy
            .representative
            .and_then(|pick| group.get(pick(&values)))
            .and_then(|(m, _)| display_timestamp(m));

        let record = AggregatedMatch {
            id: parent.to_string(),
            scores: [(self.metric.clone(), score)].into_iter().collect(),
            uri: Some(watch_url(parent, timestamp)),
            tags: ResultTags { timestamp },
        };
        (score, record)
    }
}

fn display_timestamp(m: &Match) -> Option<f64> {
    let t = m.timestamp?;
    Some(if m.modality == Modality::Image { t / FRAMES_PER_SECOND } else { t })
}

/// `WATCH_URL_BASE` + the parent id up to its first `.`, with a `#t=<secs>s`
/// fragment when a timestamp is known.
pub fn watch_url(parent_id: &str, timestamp: Option<f64>) -> String {
    let video_id = parent_id.split_once('.').map_or(parent_id, |(head, _)| head);
    match timestamp.filter(|t| t.is_finite()) {
        Some(t) => format!("{WATCH_URL_BASE}{video_id}#t={}s", t.floor() as i64),
        None => format!("{WATCH_URL_BASE}{video_id}"),
    }
}
