//! Standalone HTML page for a drift report

use std::path::Path;
use stratum_core::{DriftReport, FeatureDrift, HistogramBin, Severity};

/// Render the report as a self-contained HTML page
pub fn render_dashboard(report: &DriftReport, reference_name: &str, current_name: &str) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Data Drift Report</title>\n");
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n");

    html.push_str("<h1>Data Drift Report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Version {} &middot; {}</p>\n",
        report.version,
        escape(&report.timestamp)
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Reference: {} ({} rows) &middot; Current: {} ({} rows)</p>\n",
        escape(reference_name),
        report.reference_rows,
        escape(current_name),
        report.current_rows
    ));

    let summary = &report.summary;
    html.push_str("<h2>Summary</h2>\n<ul>\n");
    html.push_str(&format!("<li>Features: {}</li>\n", summary.n_features));
    html.push_str(&format!(
        "<li>Drifted features: {} ({:.1}%)</li>\n",
        summary.n_drifted_features,
        summary.share_drifted_features * 100.0
    ));
    html.push_str(&format!("<li>p-value threshold: {}</li>\n", summary.threshold));
    html.push_str("</ul>\n");

    if summary.dataset_drift {
        html.push_str("<p class=\"status drift\">Dataset drift detected</p>\n");
    } else {
        html.push_str("<p class=\"status ok\">No dataset drift</p>\n");
    }

    html.push_str("<h2>Features</h2>\n<table>\n");
    html.push_str(
        "<tr><th>Feature</th><th>Type</th><th>Test</th><th>Statistic</th><th>p-value</th><th>Drift</th><th>Reference</th><th>Current</th></tr>\n",
    );
    for feature in &report.features {
        feature_row(&mut html, feature);
    }
    html.push_str("</table>\n");

    if !report.diagnostics.is_empty() {
        html.push_str("<h2>Diagnostics</h2>\n<ul>\n");
        for diag in &report.diagnostics {
            let class = match diag.severity {
                Severity::Error => "error",
                Severity::Warn => "warn",
                Severity::Info => "info",
            };
            html.push_str(&format!(
                "<li class=\"{}\"><code>{}</code> {}</li>\n",
                class,
                diag.code,
                escape(&diag.message)
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Render and write the dashboard, creating parent directories
pub fn save_dashboard(
    report: &DriftReport,
    reference_name: &str,
    current_name: &str,
    path: &Path,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_dashboard(report, reference_name, current_name))
}

fn feature_row(html: &mut String, feature: &FeatureDrift) {
    let statistic = feature
        .statistic
        .map(|s| format!("{:.4}", s))
        .unwrap_or_else(|| "&infin;".to_string());
    let (drift_class, drift_label) = if feature.drift_detected {
        ("drift", "Detected")
    } else {
        ("ok", "Not detected")
    };

    html.push_str(&format!(
        "<tr><td>{}</td><td>{:?}</td><td>{}</td><td>{}</td><td>{:.4}</td><td class=\"{}\">{}</td><td>{}</td><td>{}</td></tr>\n",
        escape(&feature.name),
        feature.feature_type,
        feature.stattest,
        statistic,
        feature.p_value,
        drift_class,
        drift_label,
        histogram(&feature.reference_histogram),
        histogram(&feature.current_histogram),
    ));
}

/// Inline bar chart, one bar per bin scaled to the tallest bin
fn histogram(bins: &[HistogramBin]) -> String {
    let max = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let mut out = String::from("<div class=\"hist\">");
    for bin in bins {
        let height = (bin.count * 40) / max;
        out.push_str(&format!(
            "<span style=\"height:{}px\" title=\"{}: {}\"></span>",
            height.max(1),
            escape(&bin.label),
            bin.count
        ));
    }
    out.push_str("</div>");
    out
}

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "<style>
body { font-family: sans-serif; margin: 2em; color: #222; }
.meta { color: #666; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ddd; padding: 4px 8px; text-align: left; }
.status { font-weight: bold; }
.drift { color: #b00020; }
.ok { color: #1b5e20; }
.error { color: #b00020; }
.warn { color: #a65d00; }
.hist { display: flex; align-items: flex-end; height: 40px; gap: 1px; }
.hist span { display: inline-block; width: 6px; background: #4a76a8; }
</style>
";
