//! Results presenter: confidence tiers and display modes over a search response.

use crate::types::{ImageHandle, MatchResult, Probe, SearchResponse};

const HIGH_CONFIDENCE: f32 = 80.0;
const MEDIUM_CONFIDENCE: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn of(similarity: f32) -> Self {
        if similarity >= HIGH_CONFIDENCE {
            ConfidenceTier::High
        } else if similarity >= MEDIUM_CONFIDENCE {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// First match only, side by side with the probe.
    BestMatch,
    #[default]
    FullGrid,
}

/// A match ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMatch<'a> {
    /// 1-based position in service order.
    pub rank: usize,
    pub tier: ConfidenceTier,
    pub result: &'a MatchResult,
}

impl<'a> RenderedMatch<'a> {
    fn new(rank: usize, result: &'a MatchResult) -> Self {
        Self {
            rank,
            tier: ConfidenceTier::of(result.similarity),
            result,
        }
    }

    /// Similarity badge text, e.g. "92%" or "87.5%".
    pub fn badge(&self) -> String {
        format!("{}%", self.result.similarity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView<'a> {
    /// Search succeeded with nothing above threshold.
    NoMatches,
    BestMatch {
        probe: &'a ImageHandle,
        entry: RenderedMatch<'a>,
    },
    Grid(Vec<RenderedMatch<'a>>),
}

impl<'a> ResultsView<'a> {
    /// Lay out `response` in the order it was received.
    pub fn render(response: &'a SearchResponse, mode: DisplayMode, probe: &'a Probe) -> Self {
        let Some(first) = response.results.first() else {
            return ResultsView::NoMatches;
        };
        match mode {
            DisplayMode::BestMatch => ResultsView::BestMatch {
                probe: probe.image(),
                entry: RenderedMatch::new(1, first),
            },
            DisplayMode::FullGrid => ResultsView::Grid(
                response
                    .results
                    .iter()
                    .enumerate()
                    .map(|(i, r)| RenderedMatch::new(i + 1, r))
                    .collect(),
            ),
        }
    }

    pub fn entries(&self) -> Vec<&RenderedMatch<'a>> {
        match self {
            ResultsView::NoMatches => Vec::new(),
            ResultsView::BestMatch { entry, .. } => vec![entry],
            ResultsView::Grid(entries) => entries.iter().collect(),
        }
    }
}

/// "Found 1 match" / "Found 3 matches".
pub fn heading(match_count: u32) -> String {
    let noun = if match_count == 1 { "match" } else { "matches" };
    format!("Found {match_count} {noun}")
}
