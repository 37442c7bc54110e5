use std::collections::BTreeMap;

use serde_json::json;

use videodb_core::config::RankSettings;
use videodb_core::types::{Match, Modality, QueryDocument};
use videodb_core::Error;
use videodb_rank::{watch_url, MatchAggregator, RankParams, RankingPolicy};

fn m(id: &str, parent: &str, modality: Modality, cosine: f64, timestamp: Option<f64>) -> Match {
    Match {
        id: id.to_string(),
        parent_id: parent.to_string(),
        modality,
        scores: BTreeMap::from([("cosine".to_string(), cosine)]),
        timestamp,
        location: None,
        embedding: Some(vec![0.1, 0.2]),
    }
}

fn query(matches: Vec<Match>) -> QueryDocument {
    QueryDocument { id: "q1".into(), embedding: Some(vec![1.0, 0.0]), matches }
}

fn vid1_query() -> QueryDocument {
    query(vec![
        m("vid1.mp4:image:0", "vid1.mp4", Modality::Image, 0.2, Some(0.0)),
        m("vid1.mp4:image:1", "vid1.mp4", Modality::Image, 0.5, Some(1.0)),
        m("vid1.mp4:image:2", "vid1.mp4", Modality::Image, 0.1, Some(2.0)),
    ])
}

fn aggregator(policy: RankingPolicy, top_k: usize) -> MatchAggregator {
    MatchAggregator::new("cosine", policy, top_k).expect("aggregator")
}

fn mixed_query() -> QueryDocument {
    let scores = [
        ("a.mp4", 0.9),
        ("b.mp4", 0.3),
        ("a.mp4", 0.4),
        ("c.mp4", 0.7),
        ("b.mp4", 0.8),
        ("d.mp4", 0.05),
        ("c.mp4", 0.6),
        ("a.mp4", 0.2),
    ];
    query(
        scores
            .iter()
            .enumerate()
            .map(|(i, (parent, s))| m(&format!("{parent}:image:{i}"), parent, Modality::Image, *s, Some(i as f64)))
            .collect(),
    )
}

#[test]
fn min_policy_picks_smallest_and_its_timestamp() {
    let out = aggregator(RankingPolicy::Min, 10).aggregate(&vid1_query(), &RankParams::default());

    assert_eq!(out.id, "q1");
    assert_eq!(out.matches.len(), 1);
    let top = &out.matches[0];
    assert_eq!(top.id, "vid1.mp4");
    assert_eq!(top.scores["cosine"], 0.1);
    assert_eq!(top.tags.timestamp, Some(2.0));
    assert_eq!(top.uri.as_deref(), Some("https://www.youtube.com/watch?v=vid1#t=2s"));
}

#[test]
fn max_policy_picks_largest_and_its_timestamp() {
    let out = aggregator(RankingPolicy::Max, 10).aggregate(&vid1_query(), &RankParams::default());
    let top = &out.matches[0];
    assert_eq!(top.scores["cosine"], 0.5);
    assert_eq!(top.tags.timestamp, Some(1.0));
    assert_eq!(top.uri.as_deref(), Some("https://www.youtube.com/watch?v=vid1#t=1s"));
}

#[test]
fn mean_policies_average_without_representative() {
    for policy in [RankingPolicy::MeanMin, RankingPolicy::MeanMax] {
        let out = aggregator(policy, 10).aggregate(&vid1_query(), &RankParams::default());
        let top = &out.matches[0];
        assert!((top.scores["cosine"] - 0.8 / 3.0).abs() < 1e-9, "{policy}: {}", top.scores["cosine"]);
        assert_eq!(top.tags.timestamp, None);
        assert_eq!(top.uri.as_deref(), Some("https://www.youtube.com/watch?v=vid1"));
    }
}

#[test]
fn mean_min_and_mean_max_differ_only_in_order() {
    let q = mixed_query();
    let asc = aggregator(RankingPolicy::MeanMin, 10).aggregate(&q, &RankParams::default());
    let desc = aggregator(RankingPolicy::MeanMax, 10).aggregate(&q, &RankParams::default());

    let mut reversed = desc.matches.clone();
    reversed.reverse();
    assert_eq!(asc.matches, reversed);
}

#[test]
fn first_match_attaining_the_extreme_is_representative() {
    let q = query(vec![
        m("x:0", "x.mp4", Modality::Audio, 0.3, Some(7.0)),
        m("x:1", "x.mp4", Modality::Audio, 0.3, Some(9.0)),
    ]);
    for policy in [RankingPolicy::Min, RankingPolicy::Max] {
        let out = aggregator(policy, 10).aggregate(&q, &RankParams::default());
        assert_eq!(out.matches[0].tags.timestamp, Some(7.0), "{policy}");
    }
}

#[test]
fn empty_matches_yield_empty_result() {
    for policy in RankingPolicy::ALL {
        let out = aggregator(policy, 10).aggregate(&query(Vec::new()), &RankParams::default());
        assert_eq!(out.id, "q1");
        assert!(out.matches.is_empty());
    }
}

#[test]
fn one_entry_per_parent_in_policy_order() {
    let q = mixed_query();
    for policy in RankingPolicy::ALL {
        let out = aggregator(policy, 10).aggregate(&q, &RankParams::default());
        let mut ids: Vec<&str> = out.matches.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 4, "{policy}");
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4, "{policy}: duplicate parents");

        let scores: Vec<f64> = out.matches.iter().map(|r| r.scores["cosine"]).collect();
        let ordered = match policy {
            RankingPolicy::Min | RankingPolicy::MeanMin => scores.windows(2).all(|w| w[0] <= w[1]),
            RankingPolicy::Max | RankingPolicy::MeanMax => scores.windows(2).all(|w| w[0] >= w[1]),
        };
        assert!(ordered, "{policy}: {scores:?}");
    }
}

#[test]
fn min_policy_over_mixed_parents() {
    let out = aggregator(RankingPolicy::Min, 10).aggregate(&mixed_query(), &RankParams::default());
    let summary: Vec<(&str, f64)> = out.matches.iter().map(|r| (r.id.as_str(), r.scores["cosine"])).collect();
    assert_eq!(summary, vec![("d.mp4", 0.05), ("a.mp4", 0.2), ("b.mp4", 0.3), ("c.mp4", 0.6)]);
}

#[test]
fn top_k_truncates_and_can_be_overridden() {
    let agg = aggregator(RankingPolicy::Max, 2);
    let q = mixed_query();

    let out = agg.aggregate(&q, &RankParams::default());
    let ids: Vec<&str> = out.matches.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a.mp4", "b.mp4"]);

    let wider = agg.aggregate(&q, &RankParams { top_k: Some(3) });
    assert_eq!(wider.matches.len(), 3);
    assert_eq!(wider.matches[2].id, "c.mp4");
}

#[test]
fn single_match_parents_keep_their_scores() {
    let q = query(vec![
        m("a:0", "a.mp4", Modality::Audio, 0.4, Some(3.0)),
        m("b:0", "b.mp4", Modality::Audio, 0.1, Some(5.0)),
        m("c:0", "c.mp4", Modality::Audio, 0.7, None),
    ]);
    for policy in RankingPolicy::ALL {
        let out = aggregator(policy, 10).aggregate(&q, &RankParams::default());
        let mut scores: BTreeMap<&str, f64> = BTreeMap::new();
        for r in &out.matches {
            scores.insert(r.id.as_str(), r.scores["cosine"]);
        }
        assert_eq!(scores, BTreeMap::from([("a.mp4", 0.4), ("b.mp4", 0.1), ("c.mp4", 0.7)]), "{policy}");
    }
}

#[test]
fn matches_without_the_metric_are_skipped() {
    let mut other = m("z:0", "z.mp4", Modality::Image, 0.0, None);
    other.scores = BTreeMap::from([("euclidean".to_string(), 0.01)]);
    let mut q = vid1_query();
    q.matches.push(other);

    let out = aggregator(RankingPolicy::Min, 10).aggregate(&q, &RankParams::default());
    assert_eq!(out.matches.len(), 1);
    assert_eq!(out.matches[0].id, "vid1.mp4");
}

#[test]
fn non_finite_scores_never_outrank_real_ones() {
    let q = query(vec![
        m("a:0", "a.mp4", Modality::Image, 0.9, Some(0.0)),
        m("b:0", "b.mp4", Modality::Image, f64::NAN, Some(0.0)),
        m("c:0", "c.mp4", Modality::Image, 0.4, Some(3.0)),
        m("c:1", "c.mp4", Modality::Image, f64::INFINITY, Some(5.0)),
    ]);
    for policy in [RankingPolicy::Max, RankingPolicy::MeanMax, RankingPolicy::Min, RankingPolicy::MeanMin] {
        let out = aggregator(policy, 10).aggregate(&q, &RankParams::default());
        let ids: Vec<&str> = out.matches.iter().map(|r| r.id.as_str()).collect();
        assert!(!ids.contains(&"b.mp4"), "{policy}: {ids:?}");
        assert!(out.matches.iter().all(|r| r.scores["cosine"].is_finite()), "{policy}");
    }

    let out = aggregator(RankingPolicy::Max, 10).aggregate(&q, &RankParams::default());
    let ids: Vec<&str> = out.matches.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a.mp4", "c.mp4"]);
    assert_eq!(out.matches[1].tags.timestamp, Some(3.0));
}

#[test]
fn blended_admits_only_configured_modalities() {
    let q = query(vec![
        m("v:img", "v.mp4", Modality::Image, 0.5, Some(4.0)),
        m("v:aud", "v.mp4", Modality::Audio, 0.2, Some(12.0)),
        m("t:txt", "t.mp4", Modality::Text, 0.01, None),
    ]);
    let agg = MatchAggregator::blended("cosine", RankingPolicy::Min, 10, [Modality::Image, Modality::Audio]).expect("aggregator");
    let out = agg.aggregate(&q, &RankParams::default());

    assert_eq!(out.matches.len(), 1);
    assert_eq!(out.matches[0].id, "v.mp4");
    assert_eq!(out.matches[0].scores["cosine"], 0.2);
    assert_eq!(out.matches[0].tags.timestamp, Some(12.0));
    assert_eq!(out.matches[0].uri.as_deref(), Some("https://www.youtube.com/watch?v=v#t=12s"));

    let unrestricted = aggregator(RankingPolicy::Min, 10).aggregate(&q, &RankParams::default());
    assert_eq!(unrestricted.matches[0].id, "t.mp4");
}

#[test]
fn fractional_timestamps_floor_in_the_fragment() {
    let q = query(vec![m("a:0", "clip.final.mp4", Modality::Audio, 0.1, Some(12.75))]);
    let out = aggregator(RankingPolicy::Min, 10).aggregate(&q, &RankParams::default());
    assert_eq!(out.matches[0].tags.timestamp, Some(12.75));
    assert_eq!(out.matches[0].uri.as_deref(), Some("https://www.youtube.com/watch?v=clip#t=12s"));
    assert_eq!(watch_url("noext", None), "https://www.youtube.com/watch?v=noext");
}

#[test]
fn settings_build_a_blended_aggregator() {
    let agg = MatchAggregator::from_settings(&RankSettings::default()).expect("defaults are valid");
    assert_eq!(agg.metric(), "cosine");
    assert_eq!(agg.policy(), RankingPolicy::Min);

    let q = query(vec![m("t:txt", "t.mp4", Modality::Text, 0.01, None)]);
    assert!(agg.aggregate(&q, &RankParams::default()).matches.is_empty());
}

#[test]
fn unknown_policy_fails_construction() {
    let settings = RankSettings { policy: "median".into(), ..RankSettings::default() };
    let err = MatchAggregator::from_settings(&settings).unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)), "got {err:?}");

    assert_eq!(" Mean_Max ".parse::<RankingPolicy>().expect("parse"), RankingPolicy::MeanMax);
}

#[test]
fn empty_metric_fails_construction() {
    let err = MatchAggregator::new("  ", RankingPolicy::Min, 10).unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[test]
fn output_carries_no_embedding() {
    let out = aggregator(RankingPolicy::Min, 10).aggregate(&vid1_query(), &RankParams::default());
    let value = serde_json::to_value(&out).expect("serialize");
    assert_eq!(
        value,
        json!({
            "id": "q1",
            "matches": [{
                "id": "vid1.mp4",
                "scores": {"cosine": 0.1},
                "uri": "https://www.youtube.com/watch?v=vid1#t=2s",
                "tags": {"timestamp": 2.0}
            }]
        })
    );
}

#[test]
fn batch_aggregates_each_query_independently() {
    let mut second = mixed_query();
    second.id = "q2".into();
    let out = aggregator(RankingPolicy::Min, 1).aggregate_batch(&[vid1_query(), second], &RankParams::default());
    assert_eq!(out.len(), 2);
    assert_eq!((out[0].id.as_str(), out[0].matches[0].id.as_str()), ("q1", "vid1.mp4"));
    assert_eq!((out[1].id.as_str(), out[1].matches[0].id.as_str()), ("q2", "d.mp4"));
}
