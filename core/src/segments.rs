//! Segment drill-down: stage-by-industry distribution inside one
//! account segment.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::query::QueryMap;
use crate::store::DeskStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndustryCount {
    pub industry: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSeries {
    pub stage: String,
    pub values: Vec<IndustryCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentStageIndustry {
    /// The segment actually reported on.
    pub segment: String,
    /// Every segment present in the data, for the drill-down picker.
    pub segments: Vec<String>,
    pub stages: Vec<String>,
    pub industries: Vec<String>,
    pub series: Vec<StageSeries>,
}

/// Deal counts per stage and industry within one segment. The caller
/// may name any segment, including one absent from the data (that
/// yields an empty cross-tab, not an error); otherwise the first
/// segment alphabetically is reported. Industries are capped to the
/// `topIndustries` most common in the segment.
pub fn segment_stage_industry(store: &DeskStore, query: &QueryMap) -> SegmentStageIndustry {
    let top_industries = query.int_clamped("topIndustries", 4, 2, 10);

    let joined: Vec<(&str, &str, &str)> = store
        .deals
        .iter()
        .filter_map(|d| {
            let account = store.account(&d.account_id)?;
            Some((
                account.segment.as_str(),
                account.industry.as_str(),
                d.stage.label(),
            ))
        })
        .collect();

    let segments: BTreeSet<&str> = joined.iter().map(|&(seg, _, _)| seg).collect();
    let chosen: &str = query
        .text("segment")
        .or_else(|| segments.iter().next().copied())
        .unwrap_or("Unknown");

    let in_segment: Vec<(&str, &str)> = joined
        .iter()
        .filter(|&&(seg, _, _)| seg == chosen)
        .map(|&(_, industry, stage)| (stage, industry))
        .collect();

    let stages: BTreeSet<&str> = in_segment.iter().map(|&(stage, _)| stage).collect();

    let mut industry_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &(_, industry) in &in_segment {
        *industry_counts.entry(industry).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, usize)> = industry_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let industries: Vec<&str> = ranked
        .into_iter()
        .take(top_industries as usize)
        .map(|(industry, _)| industry)
        .collect();

    let mut pair_counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for &(stage, industry) in &in_segment {
        if industries.contains(&industry) {
            *pair_counts.entry((stage, industry)).or_insert(0) += 1;
        }
    }

    let series: Vec<StageSeries> = stages
        .iter()
        .map(|&stage| StageSeries {
            stage: stage.to_string(),
            values: industries
                .iter()
                .map(|&industry| IndustryCount {
                    industry: industry.to_string(),
                    count: pair_counts.get(&(stage, industry)).copied().unwrap_or(0),
                })
                .collect(),
        })
        .collect();

    SegmentStageIndustry {
        segment: chosen.to_string(),
        segments: segments.iter().map(|s| s.to_string()).collect(),
        stages: stages.iter().map(|s| s.to_string()).collect(),
        industries: industries.iter().map(|s| s.to_string()).collect(),
        series,
    }
}
