//! Result files: `test-results.json` and a static HTML report

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::E2eResult;
use crate::runner::{TestCase, TestResult, TestStatus, TestSuiteResult};

/// Write `test-results.json` under `output_dir`
pub fn write_results(output_dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

/// Write `report/index.html` under `output_dir`
pub fn write_html_report(output_dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    let dir = output_dir.join("report");
    std::fs::create_dir_all(&dir)?;

    let path = dir.join("index.html");
    std::fs::write(&path, render_html(output_dir, results))?;

    info!("HTML report written to: {}", path.display());
    Ok(path)
}

/// One line per selected case, for `--list`
pub fn list_lines(cases: &[TestCase]) -> Vec<String> {
    cases
        .iter()
        .map(|c| format!("[{}] {}", c.label(), c.full_name()))
        .collect()
}

fn render_html(output_dir: &Path, suite: &TestSuiteResult) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>E2E report</title>\n<style>{}</style>\n</head>\n<body>\n<main>\n\
         <h1>E2E report</h1>\n<p>{} &middot; started {} &middot; {} ms</p>\n\
         <p class=\"summary\">{} total, {} passed, {} flaky, {} failed</p>\n",
        STYLE,
        escape(&suite.base_url),
        suite.started_at.to_rfc3339(),
        suite.duration_ms,
        suite.total,
        suite.passed,
        suite.flaky,
        suite.failed,
    );

    html.push_str(
        "<table>\n<thead><tr><th scope=\"col\">Status</th><th scope=\"col\">Test</th>\
         <th scope=\"col\">Project</th><th scope=\"col\">Viewport</th><th scope=\"col\">Duration</th>\
         <th scope=\"col\">Details</th></tr></thead>\n<tbody>\n",
    );
    // Failures first
    let mut ordered: Vec<&TestResult> = suite.results.iter().collect();
    ordered.sort_by_key(|r| match r.status {
        TestStatus::Failed => 0,
        TestStatus::Flaky => 1,
        TestStatus::Passed => 2,
    });
    for result in ordered {
        render_row(&mut html, output_dir, result);
    }
    html.push_str("</tbody>\n</table>\n</main>\n</body>\n</html>\n");
    html
}

fn render_row(html: &mut String, output_dir: &Path, result: &TestResult) {
    let status = match result.status {
        TestStatus::Passed => "passed",
        TestStatus::Flaky => "flaky",
        TestStatus::Failed => "failed",
    };
    let _ = write!(
        html,
        "<tr class=\"{status}\"><td>{status}</td><td>{} › {}</td><td>{}</td><td>{}</td><td>{} ms</td><td>",
        escape(&result.group),
        escape(&result.name),
        result.project.map(|p| p.as_str()).unwrap_or("-"),
        escape(&result.viewport),
        result.duration_ms,
    );

    if let (Some(error), Some(category)) = (&result.error, result.category) {
        let _ = write!(
            html,
            "<span class=\"category\">{}</span> <pre>{}</pre>",
            category.as_str(),
            escape(error)
        );
    }
    for attempt in result.attempts.iter().filter(|a| !a.artifacts.is_empty()) {
        let _ = write!(html, "<p>attempt {}:", attempt.attempt);
        for artifact in &attempt.artifacts {
            // Links are relative to report/
            let rel = artifact.strip_prefix(output_dir).unwrap_or(artifact);
            let name = artifact
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let _ = write!(
                html,
                " <a href=\"../{}\">{}</a>",
                escape(&rel.to_string_lossy()),
                escape(&name)
            );
        }
        html.push_str("</p>");
    }
    html.push_str("</td></tr>\n");
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;color:#1b1b1b}\
table{border-collapse:collapse;width:100%}th,td{border:1px solid #ccc;padding:.4rem;text-align:left;vertical-align:top}\
tr.failed td:first-child{color:#a00000}tr.flaky td:first-child{color:#7a5200}tr.passed td:first-child{color:#0a6b0a}\
pre{white-space:pre-wrap;margin:.3rem 0}.category{font-weight:600}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::model::Project;
    use crate::runner::AttemptResult;
    use chrono::Utc;

    fn suite(output_dir: &Path) -> TestSuiteResult {
        TestSuiteResult {
            started_at: Utc::now(),
            base_url: "http://localhost:4000/".to_string(),
            total: 2,
            passed: 1,
            flaky: 0,
            failed: 1,
            duration_ms: 1234,
            results: vec![
                TestResult {
                    name: "sidebar is visible".into(),
                    group: "navigation".into(),
                    project: Some(Project::Mobile),
                    viewport: "mobile".into(),
                    status: TestStatus::Passed,
                    duration_ms: 200,
                    attempts: Vec::new(),
                    error: None,
                    category: None,
                },
                TestResult {
                    name: "form <labels>".into(),
                    group: "a11y form".into(),
                    project: None,
                    viewport: "desktop".into(),
                    status: TestStatus::Failed,
                    duration_ms: 900,
                    attempts: vec![AttemptResult {
                        attempt: 1,
                        duration_ms: 900,
                        error: Some("1 accessibility violation(s): label (1 nodes)".into()),
                        category: Some(FailureKind::Accessibility),
                        artifacts: vec![output_dir.join("a11y-form-form-labels-desktop/attempt-1/trace.json")],
                        teardown_errors: Vec::new(),
                    }],
                    error: Some("1 accessibility violation(s): label (1 nodes)".into()),
                    category: Some(FailureKind::Accessibility),
                },
            ],
        }
    }

    #[test]
    fn test_write_results_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_results(dir.path(), &suite(dir.path())).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["results"][1]["status"], "failed");
        assert_eq!(json["results"][1]["category"], "accessibility");
        assert_eq!(json["results"][0]["project"], "mobile");
        assert!(json["results"][1]["project"].is_null());
    }

    #[test]
    fn test_html_report_escapes_and_links_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_html_report(dir.path(), &suite(dir.path())).unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("form &lt;labels&gt;"));
        assert!(html.contains("<td>mobile</td><td>mobile</td>"));
        assert!(html.contains("href=\"../a11y-form-form-labels-desktop/attempt-1/trace.json\""));
        assert!(html.find("form &lt;labels&gt;").unwrap() < html.find("sidebar is visible").unwrap());
    }
}
