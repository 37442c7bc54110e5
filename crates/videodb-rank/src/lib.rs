//! videodb-rank
//!
//! Collapses chunk-level search matches back to their parent videos and
//! orders them under a selectable policy.
pub mod aggregator;
pub mod policy;

pub use aggregator::{watch_url, MatchAggregator, RankParams, FRAMES_PER_SECOND, WATCH_URL_BASE};
pub use policy::{RankingPolicy, SortDirection, Strategy};
