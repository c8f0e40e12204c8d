use camera_motion_detector::{DetectionReport, DetectionSummary, TransitionReport};
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    summary: DetectionSummary,
    transitions: &'a [TransitionReport],
}

pub fn render_text(report: &DetectionReport) -> String {
    let summary = report.summary();
    let indices = if summary.movement_indices.is_empty() {
        "none".to_string()
    } else {
        summary
            .movement_indices
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Total frames:     {}\nMovement frames:  {}\nMovement rate:    {:.1}%\nMovement indices: {}",
        summary.total_frames, summary.movement_count, summary.movement_rate, indices
    )
}

pub fn render_json(report: &DetectionReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        summary: report.summary(),
        transitions: &report.transitions,
    })
}
