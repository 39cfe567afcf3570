//! Markdown summary of the job tree, one nested `<ul>` per job.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use omni_pipeline::JobReport;

const INDENT: &str = "  ";
const PADDING_STEP: usize = 4;

pub(crate) fn summary_file_name(report: &JobReport) -> String {
    format!(
        "JenkinsJob_{}_{}.md",
        report.name,
        report.execution_number.unwrap_or_default()
    )
}

pub(crate) fn render_summary(report: &JobReport) -> String {
    let mut out = String::new();
    render_node(&mut out, report, "", 0);
    out
}

fn render_node(out: &mut String, node: &JobReport, indent: &str, padding: usize) {
    let _ = writeln!(out, "{indent}<ul style=\"padding-left:{padding}\">");
    let number = node
        .execution_number
        .map_or_else(|| "?".to_string(), |number| number.to_string());
    let _ = writeln!(
        out,
        "{indent}[{} #{number}]({}) {}<br>",
        node.name,
        node.url.as_deref().unwrap_or_default(),
        node.result
    );
    let child_indent = format!("{indent}{INDENT}");
    for child in &node.children {
        render_node(out, child, &child_indent, padding + PADDING_STEP);
    }
    let _ = writeln!(out, "{indent}</ul>");
}

/// Write the summary into `dir`; returns the file path.
pub(crate) fn write_summary(dir: &Path, report: &JobReport) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(summary_file_name(report));
    std::fs::write(&path, render_summary(report))?;
    Ok(path)
}
