//! Plain-text rendering for terminal output.

use sketchmatch_core::results::{heading, RenderedMatch};
use sketchmatch_core::{
    DisplayMode, FaceMetadata, FaceRecord, FeatureCatalog, HealthStatus, ImageHandle, Probe,
    ResultsView, SearchResponse,
};
use std::fmt::Write;

pub fn results(response: &SearchResponse, mode: DisplayMode, probe: &Probe) -> String {
    let mut out = String::new();
    match ResultsView::render(response, mode, probe) {
        ResultsView::NoMatches => out.push_str("No matches found\n"),
        ResultsView::BestMatch { probe, entry } => {
            let _ = writeln!(out, "{}", heading(response.match_count));
            let _ = writeln!(out, "probe:      {}", image_label(probe));
            let _ = writeln!(out, "best match: {}", match_line(&entry));
        }
        ResultsView::Grid(entries) => {
            let _ = writeln!(out, "{}", heading(response.match_count));
            for entry in &entries {
                let _ = writeln!(out, "{}", match_line(entry));
            }
        }
    }
    out
}

fn match_line(entry: &RenderedMatch<'_>) -> String {
    let result = entry.result;
    let mut line = format!(
        "{:>2}. {:>6}  {:<6}  {}",
        entry.rank,
        entry.badge(),
        entry.tier.label(),
        display_name(&result.metadata, &result.id),
    );
    push_metadata(&mut line, &result.metadata);
    if !result.asset_ref.is_empty() {
        let _ = write!(line, "  <{}>", result.asset_ref);
    }
    line
}

pub fn record(record: &FaceRecord) -> String {
    let mut line = format!("{}  {}", record.id, display_name(&record.metadata, &record.id));
    push_metadata(&mut line, &record.metadata);
    if let Some(at) = record.metadata.uploaded_at {
        let _ = write!(line, "  uploaded {}", at.format("%Y-%m-%d %H:%M"));
    }
    line
}

pub fn catalog(catalog: &FeatureCatalog) -> String {
    if catalog.is_empty() {
        return "No facial features available\n".to_string();
    }
    let mut out = String::new();
    for (category, variants) in catalog.categories() {
        let _ = writeln!(out, "{category}:");
        for variant in variants {
            let _ = writeln!(out, "  {:<16} {}", variant.id, variant.name);
        }
    }
    out
}

pub fn health(status: &HealthStatus) -> String {
    let mut out = format!("status: {}\n", status.status);
    for (key, value) in &status.details {
        let _ = writeln!(out, "{key}: {value}");
    }
    out
}

pub fn image_label(handle: &ImageHandle) -> &str {
    match handle {
        ImageHandle::Local(image) => &image.file_name,
        ImageHandle::Remote { url } => url,
    }
}

fn display_name<'a>(metadata: &'a FaceMetadata, id: &'a str) -> &'a str {
    metadata
        .name
        .as_deref()
        .or(metadata.original_filename.as_deref())
        .unwrap_or(id)
}

fn push_metadata(line: &mut String, metadata: &FaceMetadata) {
    if !metadata.tags.is_empty() {
        let _ = write!(line, "  [{}]", metadata.tags.join(", "));
    }
    if let Some(notes) = &metadata.notes {
        let _ = write!(line, "  \"{notes}\"");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchmatch_core::{MatchResult, SynthesizedAsset};

    fn hit(id: &str, similarity: f32, name: Option<&str>) -> MatchResult {
        MatchResult {
            id: id.to_string(),
            similarity,
            metadata: FaceMetadata {
                name: name.map(str::to_string),
                ..FaceMetadata::default()
            },
            asset_ref: format!("/media/faces/{id}.jpg"),
        }
    }

    fn sketch_probe() -> Probe {
        Probe::composed(SynthesizedAsset {
            asset_ref: "/media/sketches/s1.png".to_string(),
            embedding: None,
        })
    }

    #[test]
    fn test_grid_keeps_order_and_tiers() {
        let response = SearchResponse {
            match_count: 2,
            results: vec![hit("a", 55.0, Some("Ann")), hit("b", 92.0, None)],
        };
        let text = results(&response, DisplayMode::FullGrid, &sketch_probe());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Found 2 matches");
        assert!(lines[1].starts_with(" 1."));
        assert!(lines[1].contains("55%") && lines[1].contains("low") && lines[1].contains("Ann"));
        assert!(lines[2].contains("92%") && lines[2].contains("high") && lines[2].contains(" b "));
    }

    #[test]
    fn test_best_match_pairs_probe() {
        let response = SearchResponse {
            match_count: 1,
            results: vec![hit("a", 65.0, Some("Ann"))],
        };
        let text = results(&response, DisplayMode::BestMatch, &sketch_probe());
        assert!(text.starts_with("Found 1 match\n"));
        assert!(text.contains("probe:      /media/sketches/s1.png"));
        assert!(text.contains("best match:") && text.contains("medium"));
    }

    #[test]
    fn test_no_matches() {
        let response = SearchResponse::default();
        let text = results(&response, DisplayMode::FullGrid, &sketch_probe());
        assert_eq!(text, "No matches found\n");
    }

    #[test]
    fn test_record_falls_back_to_filename() {
        let record = FaceRecord {
            id: "9".to_string(),
            metadata: FaceMetadata {
                original_filename: Some("mugshot.jpg".to_string()),
                tags: vec!["fraud".to_string()],
                ..FaceMetadata::default()
            },
            asset_ref: None,
        };
        assert_eq!(super::record(&record), "9  mugshot.jpg  [fraud]");
    }
}
