//! Coloured console report of an evaluated question

use crate::harness::QuestionEvaluation;
use console::style;
use std::fmt::Write;

const RULE_WIDTH: usize = 80;

/// Full report for one question: reply, sources, per-metric verdicts and a summary
pub fn render_question(result: &QuestionEvaluation) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    let _ = writeln!(out, "\n{}", style(&rule).cyan());
    let _ = writeln!(out, "{} {}", style("Question:").cyan(), result.question);
    let _ = writeln!(
        out,
        "\n{} {}",
        style("API Response:").cyan(),
        result.reply.response
    );
    let _ = writeln!(
        out,
        "\n{} {}",
        style("Ground Truth:").cyan(),
        result.ground_truth
    );
    let _ = writeln!(out, "\n{}", style("Context:").cyan());
    for (i, item) in result.reply.context.iter().enumerate() {
        let _ = writeln!(out, "Source {} - {}", i + 1, item.filename);
    }

    let _ = writeln!(out, "\n{}", style("Evaluations:").yellow());
    for record in &result.evaluations {
        let _ = writeln!(out, "\n  {}", style(record.metric.label()).green());
        let _ = writeln!(out, "    {} {}", style("Thoughts:").blue(), record.thoughts);
        let _ = writeln!(
            out,
            "    {} {}",
            style("Stars:").magenta(),
            record.rating_text()
        );
        if record.rating.is_some() && !record.in_range {
            let _ = writeln!(
                out,
                "    {}",
                style("(rating outside the rubric's scale)").red()
            );
        }
    }

    let _ = writeln!(out, "\n{}", style("Summary:").yellow());
    out.push_str(&render_summary(result));
    let _ = writeln!(out, "\n{}", style(&rule).cyan());
    out
}

/// `Metric: N stars` lines
pub fn render_summary(result: &QuestionEvaluation) -> String {
    let mut out = String::new();
    for record in &result.evaluations {
        let _ = writeln!(
            out,
            "  {} {} stars",
            style(format!("{}:", record.metric.label())).green(),
            record.rating_text()
        );
    }
    out
}

/// Averages per metric over every question whose rating is on the metric's scale
pub fn render_overall(results: &[QuestionEvaluation]) -> String {
    let mut out = String::new();
    let metrics: Vec<_> = results
        .first()
        .map(|r| r.evaluations.iter().map(|e| e.metric).collect())
        .unwrap_or_default();

    let _ = writeln!(
        out,
        "\n{} {} questions",
        style("Overall:").yellow().bold(),
        results.len()
    );
    for metric in metrics {
        let stars: Vec<u8> = results
            .iter()
            .flat_map(|r| r.evaluations.iter())
            .filter(|e| e.metric == metric && e.in_range)
            .filter_map(|e| e.stars)
            .collect();
        if stars.is_empty() {
            let _ = writeln!(out, "  {} N/A", style(format!("{}:", metric.label())).green());
            continue;
        }
        let mean = stars.iter().map(|s| *s as f64).sum::<f64>() / stars.len() as f64;
        let _ = writeln!(
            out,
            "  {} {:.2} stars ({} rated)",
            style(format!("{}:", metric.label())).green(),
            mean,
            stars.len()
        );
    }
    out
}
