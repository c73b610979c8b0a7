//! Prompt pipeline display formatting
//!
//! Formats readiness reports and prompt metadata. Prompt text itself is
//! written by the caller, never formatted here.

use crate::prompt::{PromptMetadata, ReadinessReport};

fn check_mark(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "FAILED"
    }
}

/// Format a readiness report as an aligned checklist
pub fn format_readiness_report(session_id: &str, report: &ReadinessReport) -> String {
    let mut output = String::new();
    output.push_str(&format!("Readiness for session {}\n", session_id));
    output.push_str(&format!("{:-<40}\n", ""));

    let rows = [
        ("Session", report.session),
        ("Auth", report.auth),
        ("Memory", report.memory),
        ("Network", report.network),
    ];
    for (label, ok) in rows {
        output.push_str(&format!("  {:<10} {}\n", label, check_mark(ok)));
    }

    let ready = report.session && report.auth && report.memory && report.network;
    output.push('\n');
    output.push_str(if ready {
        "Ready to use prompt."
    } else {
        "Not ready."
    });
    output
}

/// Format prompt metadata for display after a successful fetch
pub fn format_prompt_metadata(metadata: &PromptMetadata) -> String {
    format!(
        "Form:     {} ({})\nSession:  {}\nDuration: {} ms",
        metadata.form_name, metadata.form_id, metadata.session_id, metadata.duration
    )
}
