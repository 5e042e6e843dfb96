//! Text rendering of verdicts

use crate::handler::{Severity, Verdict};
use crate::types::prediction::Label;

/// Width of a full (p = 1.0) bar in characters
pub const DEFAULT_BAR_WIDTH: usize = 40;

pub const FRAUD_HEADLINE: &str = "FRAUD DETECTED";
pub const LEGITIMATE_HEADLINE: &str = "LEGITIMATE TRANSACTION";

/// Probability formatted for display
pub fn format_probability(p: f64) -> String {
    format!("{:.4}", p)
}

/// `Not Fraud: 0.1234 | Fraud: 0.8766`
pub fn summary_line(verdict: &Verdict) -> String {
    format!(
        "{}: {} | {}: {}",
        Label::NotFraud.display_name(),
        format_probability(verdict.probability(Label::NotFraud)),
        Label::Fraud.display_name(),
        format_probability(verdict.probability(Label::Fraud)),
    )
}

/// Horizontal bar chart of both class probabilities
pub fn bar_chart(verdict: &Verdict, width: usize) -> String {
    [Label::NotFraud, Label::Fraud]
        .iter()
        .map(|&label| {
            let p = verdict.probability(label).clamp(0.0, 1.0);
            let filled = (p * width as f64).round() as usize;
            format!(
                "{:>9} │{}{}│ {}",
                label.display_name(),
                "█".repeat(filled),
                "░".repeat(width - filled),
                format_probability(p)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Headline, probability summary and chart as one block
pub fn render_verdict(verdict: &Verdict) -> String {
    let marker = match verdict.severity() {
        Severity::Alert => "[!]",
        Severity::Success => "[ok]",
    };

    format!(
        "{} {}\n{}\n\n{}",
        marker,
        verdict.headline(),
        summary_line(verdict),
        bar_chart(verdict, DEFAULT_BAR_WIDTH)
    )
}
