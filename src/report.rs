//! Report formatting for assessment results.

use crate::models::DimensionId;
use crate::ranking::{ClassificationLabel, RankedEntry};
use crate::result::AssessmentResult;
use crate::store::ResultComparison;

const BAR_WIDTH: usize = 30;

/// Output format for result reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output.
    Pretty,
    /// JSON output.
    Json,
    /// Markdown report.
    Markdown,
    /// Compact single line per dimension.
    Compact,
}

/// Format an assessment result for output.
///
/// With `full` the pretty and markdown formats also list every ranked
/// dimension rather than just the top entries.
pub fn format_result(result: &AssessmentResult, format: OutputFormat, full: bool) -> String {
    match format {
        OutputFormat::Pretty => format_pretty(result, full),
        OutputFormat::Json => format_json(result),
        OutputFormat::Markdown => format_markdown(result, full),
        OutputFormat::Compact => format_compact(result),
    }
}

/// Format a comparison for output.
pub fn format_comparison(comparison: &ResultComparison, format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => format_comparison_pretty(comparison),
        OutputFormat::Json => format_comparison_json(comparison),
        OutputFormat::Markdown => format_comparison_markdown(comparison),
        OutputFormat::Compact => format_comparison_compact(comparison),
    }
}

fn label_of(result: &AssessmentResult, id: &DimensionId) -> ClassificationLabel {
    if result.strengths.iter().any(|e| &e.id == id) {
        ClassificationLabel::Strength
    } else if result.weaknesses.iter().any(|e| &e.id == id) {
        ClassificationLabel::Weakness
    } else {
        ClassificationLabel::Unlabeled
    }
}

fn bar(score: f64) -> String {
    let filled = ((score.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn format_pretty(result: &AssessmentResult, full: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\x1b[1mAssessment: {}\x1b[0m\n",
        result.catalog_id
    ));
    output.push_str(&format!(
        "Answered {} of {} prompts, ranked by {} ({})\n\n",
        result.answered_prompts, result.total_prompts, result.primary_source, result.normalization
    ));

    output.push_str(&format!(
        "\x1b[1mRecommended:\x1b[0m \x1b[42;30m {} \x1b[0m {:.1}\n",
        result.recommended.label, result.recommended.score
    ));
    for line in wrap_text(&result.recommended.rationale, 72) {
        output.push_str(&format!("  {}\n", line));
    }
    output.push('\n');

    let entries: &[RankedEntry] = if full {
        &result.ranked_dimensions
    } else {
        &result.top3_primary
    };
    output.push_str(if full { "Ranking:\n" } else { "Top matches:\n" });
    let width = entries
        .iter()
        .map(|e| e.label.chars().count())
        .max()
        .unwrap_or(0);
    for entry in entries {
        let marker = match label_of(result, &entry.id) {
            ClassificationLabel::Strength => " \x1b[32m▲\x1b[0m",
            ClassificationLabel::Weakness => " \x1b[31m▼\x1b[0m",
            ClassificationLabel::Unlabeled => "",
        };
        output.push_str(&format!(
            "  {:>2}. {:<width$} {} {:>5.1}{}\n",
            entry.rank,
            entry.label,
            bar(entry.normalized_score),
            entry.normalized_score,
            marker,
            width = width
        ));
    }
    output.push('\n');

    if !full && !result.top3_secondary.is_empty() {
        let also: Vec<String> = result
            .top3_secondary
            .iter()
            .map(|e| format!("{} ({:.1})", e.label, e.normalized_score))
            .collect();
        output.push_str(&format!("Also consider: {}\n\n", also.join(", ")));
    }

    if !result.insights.is_empty() {
        output.push_str("Insights:\n");
        for insight in &result.insights {
            output.push_str(&format!("  • {}\n", insight));
        }
        output.push('\n');
    }

    if !result.recommendations.is_empty() {
        output.push_str("Next steps:\n");
        for recommendation in &result.recommendations {
            output.push_str(&format!("  - {}\n", recommendation));
        }
    }

    output
}

/// Wrap text to fit within a given width
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.chars().count() + 1 + word.chars().count() <= width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

fn format_json(result: &AssessmentResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|e| format!("Error: {}", e))
}

fn format_markdown(result: &AssessmentResult, full: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Assessment Report\n\n**Catalog**: `{}`\n**Answered**: {} of {}\n**Ranked by**: {}\n\n",
        result.catalog_id, result.answered_prompts, result.total_prompts, result.primary_source
    ));

    output.push_str(&format!(
        "## Recommendation\n\n**{}** ({:.1})\n\n{}\n\n",
        result.recommended.label, result.recommended.score, result.recommended.rationale
    ));

    let entries: &[RankedEntry] = if full {
        &result.ranked_dimensions
    } else {
        &result.top3_primary
    };
    output.push_str("## Ranking\n\n| Rank | Dimension | Score | Raw | Label |\n|------|-----------|-------|-----|-------|\n");
    for entry in entries {
        output.push_str(&format!(
            "| {} | {} | {:.1} | {:.2} | {} |\n",
            entry.rank,
            entry.label,
            entry.normalized_score,
            entry.raw_score,
            label_of(result, &entry.id)
        ));
    }
    output.push('\n');

    if !result.insights.is_empty() {
        output.push_str("## Insights\n\n");
        for insight in &result.insights {
            output.push_str(&format!("- {}\n", insight));
        }
        output.push('\n');
    }

    if !result.recommendations.is_empty() {
        output.push_str("## Next Steps\n\n");
        for recommendation in &result.recommendations {
            output.push_str(&format!("- {}\n", recommendation));
        }
    }

    output
}

fn format_compact(result: &AssessmentResult) -> String {
    let mut output = format!(
        "{} -> {} ({:.1})\n",
        result.catalog_id, result.recommended.id, result.recommended.score
    );
    for entry in &result.ranked_dimensions {
        output.push_str(&format!(
            "{} {} {:.1} {}\n",
            entry.rank,
            entry.id,
            entry.normalized_score,
            label_of(result, &entry.id)
        ));
    }
    output
}

fn signed(delta: f64) -> String {
    if delta > 0.0 {
        format!("+{:.1}", delta)
    } else {
        format!("{:.1}", delta)
    }
}

fn format_comparison_pretty(comparison: &ResultComparison) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Result Comparison: {}\n\nRecommended: {} -> {}{}\n\n",
        comparison.catalog_id,
        comparison.before_recommended,
        comparison.after_recommended,
        if comparison.recommendation_changed {
            " (changed)"
        } else {
            ""
        }
    ));

    let width = comparison
        .deltas
        .iter()
        .map(|d| d.label.chars().count())
        .max()
        .unwrap_or(0);
    for delta in &comparison.deltas {
        output.push_str(&format!(
            "  {:<width$} {:>5.1} -> {:>5.1} ({})\n",
            delta.label,
            delta.before,
            delta.after,
            signed(delta.delta),
            width = width
        ));
    }
    output.push('\n');

    if !comparison.improvements.is_empty() {
        output.push_str("Improvements:\n");
        for imp in &comparison.improvements {
            output.push_str(&format!("  + {}\n", imp));
        }
        output.push('\n');
    }

    if !comparison.regressions.is_empty() {
        output.push_str("Regressions:\n");
        for reg in &comparison.regressions {
            output.push_str(&format!("  - {}\n", reg));
        }
        output.push('\n');
    }

    output
}

fn format_comparison_json(comparison: &ResultComparison) -> String {
    serde_json::to_string_pretty(comparison).unwrap_or_else(|e| format!("Error: {}", e))
}

fn format_comparison_markdown(comparison: &ResultComparison) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Result Comparison\n\n**Catalog**: `{}`\n**Before**: {}\n**After**: {}\n\n",
        comparison.catalog_id, comparison.before_recommended, comparison.after_recommended
    ));

    output.push_str("| Dimension | Before | After | Change |\n|-----------|--------|-------|--------|\n");
    for delta in &comparison.deltas {
        output.push_str(&format!(
            "| {} | {:.1} | {:.1} | {} |\n",
            delta.label,
            delta.before,
            delta.after,
            signed(delta.delta)
        ));
    }
    output.push('\n');

    if !comparison.improvements.is_empty() {
        output.push_str("## Improvements\n\n");
        for imp in &comparison.improvements {
            output.push_str(&format!("- {}\n", imp));
        }
        output.push('\n');
    }

    if !comparison.regressions.is_empty() {
        output.push_str("## Regressions\n\n");
        for reg in &comparison.regressions {
            output.push_str(&format!("- {}\n", reg));
        }
    }

    output
}

fn format_comparison_compact(comparison: &ResultComparison) -> String {
    let changes: Vec<String> = comparison
        .deltas
        .iter()
        .map(|d| format!("{}:{}", d.id, signed(d.delta)))
        .collect();
    format!(
        "{} -> {} [{}]",
        comparison.before_recommended,
        comparison.after_recommended,
        changes.join(" ")
    )
}
