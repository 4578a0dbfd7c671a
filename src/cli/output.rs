use std::fmt::Write as FmtWrite;
use std::path::PathBuf;

use crate::models::{ExtractionJob, FileStatus, OutputFormat, RunReport};

pub trait Formatter {
    fn format_run_report(&self, report: &RunReport) -> String;
    fn format_plan(&self, jobs: &[ExtractionJob]) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub input_dir: PathBuf,
    pub input_exists: bool,
    pub pending_images: u64,
    pub output_dir: PathBuf,
    pub outputs_written: u64,
    pub previous_failures: u64,
    pub global_config: Option<PathBuf>,
    pub project_config: Option<PathBuf>,
    pub connection: Option<ConnectionInfo>,
}

/// Result of an explicit reachability check against the model endpoint.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub ok: bool,
    pub detail: String,
}

fn run_title(report: &RunReport) -> &'static str {
    if report.interrupted {
        "Extraction Interrupted"
    } else {
        "Extraction Complete"
    }
}

fn status_label(status: FileStatus) -> &'static str {
    match status {
        FileStatus::Success => "OK",
        FileStatus::Failed => "FAILED",
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        let mut output = String::new();
        let title = run_title(report);
        writeln!(output, "{title}").unwrap();
        writeln!(output, "{}", "-".repeat(title.len())).unwrap();
        writeln!(output, "Images found: {}", report.files_found).unwrap();
        writeln!(output, "Succeeded:    {}", report.succeeded).unwrap();
        writeln!(output, "Failed:       {}", report.failed).unwrap();
        writeln!(output, "Duration:     {}ms", report.duration_ms).unwrap();

        let failures: Vec<_> = report.failures().collect();
        if !failures.is_empty() {
            writeln!(output).unwrap();
            writeln!(output, "Failures:").unwrap();
            for file in failures {
                writeln!(
                    output,
                    "  {}: {}",
                    file.input.display(),
                    file.error.as_deref().unwrap_or("unknown error")
                )
                .unwrap();
            }
        }
        output
    }

    fn format_plan(&self, jobs: &[ExtractionJob]) -> String {
        if jobs.is_empty() {
            return "No images found.\n".to_string();
        }

        let mut output = String::new();
        writeln!(output, "{} image(s):", jobs.len()).unwrap();
        for job in jobs {
            writeln!(
                output,
                "  {} -> {}",
                job.input.display(),
                job.output.display()
            )
            .unwrap();
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        writeln!(output, "Model:         {}", status.model).unwrap();
        writeln!(output, "  Endpoint:    {}", status.endpoint).unwrap();
        match status.api_key {
            Some(ref key) => writeln!(output, "  API key:     {} [SET]", key).unwrap(),
            None => writeln!(output, "  API key:     [MISSING]").unwrap(),
        }
        if let Some(ref conn) = status.connection {
            let label = if conn.ok { "[CONNECTED]" } else { "[UNREACHABLE]" };
            writeln!(output, "  Connection:  {} {}", label, conn.detail).unwrap();
        }
        writeln!(output).unwrap();

        let input_label = if status.input_exists {
            "[FOUND]"
        } else {
            "[MISSING]"
        };
        writeln!(
            output,
            "Input:         {} {}",
            status.input_dir.display(),
            input_label
        )
        .unwrap();
        writeln!(output, "  Images:      {}", status.pending_images).unwrap();
        writeln!(output, "Output:        {}", status.output_dir.display()).unwrap();
        writeln!(output, "  Written:     {}", status.outputs_written).unwrap();
        if status.previous_failures > 0 {
            writeln!(output, "  Errors:      {}", status.previous_failures).unwrap();
        }
        writeln!(output).unwrap();

        if let Some(ref path) = status.project_config {
            writeln!(output, "Project config: {}", path.display()).unwrap();
        }
        if let Some(ref path) = status.global_config {
            writeln!(output, "Global config:  {}", path.display()).unwrap();
        }

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &serde_json::Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

impl Formatter for JsonFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        match serde_json::to_value(report) {
            Ok(value) => self.render(&value),
            Err(e) => format!("{{\"error\": \"{}\"}}", e),
        }
    }

    fn format_plan(&self, jobs: &[ExtractionJob]) -> String {
        let json = serde_json::json!({ "count": jobs.len(), "images": jobs });
        self.render(&json)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let connection = status.connection.as_ref().map(|c| {
            serde_json::json!({
                "ok": c.ok,
                "detail": c.detail,
            })
        });

        let json = serde_json::json!({
            "gemini": {
                "model": status.model,
                "endpoint": status.endpoint,
                "api_key_set": status.api_key.is_some(),
                "connection": connection,
            },
            "input": {
                "dir": status.input_dir,
                "exists": status.input_exists,
                "images": status.pending_images,
            },
            "output": {
                "dir": status.output_dir,
                "written": status.outputs_written,
                "errors": status.previous_failures,
            },
            "config": {
                "project": status.project_config,
                "global": status.global_config,
            }
        });

        self.render(&json)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        let mut output = String::new();
        writeln!(output, "## {}\n", run_title(report)).unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Images found | {} |", report.files_found).unwrap();
        writeln!(output, "| Succeeded | {} |", report.succeeded).unwrap();
        writeln!(output, "| Failed | {} |", report.failed).unwrap();
        writeln!(output, "| Duration | {}ms |", report.duration_ms).unwrap();

        if !report.files.is_empty() {
            writeln!(output, "\n### Files\n").unwrap();
            writeln!(output, "| Image | Output | Status |").unwrap();
            writeln!(output, "|-------|--------|--------|").unwrap();
            for file in &report.files {
                writeln!(
                    output,
                    "| `{}` | `{}` | {} |",
                    file.input.display(),
                    file.output.display(),
                    status_label(file.status)
                )
                .unwrap();
            }
        }
        output
    }

    fn format_plan(&self, jobs: &[ExtractionJob]) -> String {
        if jobs.is_empty() {
            return "## Images\n\n*No images found.*\n".to_string();
        }

        let mut output = String::new();
        writeln!(output, "## Images ({})\n", jobs.len()).unwrap();
        writeln!(output, "| Image | Output |").unwrap();
        writeln!(output, "|-------|--------|").unwrap();
        for job in jobs {
            writeln!(
                output,
                "| `{}` | `{}` |",
                job.input.display(),
                job.output.display()
            )
            .unwrap();
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();

        let key_status = if status.api_key.is_some() { "✅" } else { "❌" };
        writeln!(output, "### Gemini {}\n", key_status).unwrap();
        writeln!(output, "- **Model:** {}", status.model).unwrap();
        writeln!(output, "- **Endpoint:** `{}`", status.endpoint).unwrap();
        if let Some(ref key) = status.api_key {
            writeln!(output, "- **API key:** `{}`", key).unwrap();
        }
        if let Some(ref conn) = status.connection {
            let mark = if conn.ok { "✅" } else { "❌" };
            writeln!(output, "- **Connection:** {} {}", mark, conn.detail).unwrap();
        }
        writeln!(output).unwrap();

        let input_status = if status.input_exists { "✅" } else { "❌" };
        writeln!(output, "### Directories {}\n", input_status).unwrap();
        writeln!(output, "- **Input:** `{}`", status.input_dir.display()).unwrap();
        writeln!(output, "- **Images:** {}", status.pending_images).unwrap();
        writeln!(output, "- **Output:** `{}`", status.output_dir.display()).unwrap();
        writeln!(output, "- **Written:** {}", status.outputs_written).unwrap();
        writeln!(output, "- **Errors:** {}", status.previous_failures).unwrap();

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileReport;

    fn sample_report() -> RunReport {
        let mut report = RunReport::new(2);
        report.record(FileReport {
            input: PathBuf::from("images/q1.png"),
            output: PathBuf::from("extracted/q1.txt"),
            status: FileStatus::Success,
            error: None,
            chars: 120,
            duration_ms: 800,
        });
        report.record(FileReport {
            input: PathBuf::from("images/q2.png"),
            output: PathBuf::from("extracted/q2.txt"),
            status: FileStatus::Failed,
            error: Some("request timed out".to_string()),
            chars: 0,
            duration_ms: 120_000,
        });
        report
    }

    #[test]
    fn test_text_report_lists_failures() {
        let text = TextFormatter.format_run_report(&sample_report());
        assert!(text.contains("Succeeded:    1"));
        assert!(text.contains("images/q2.png: request timed out"));
        assert!(!text.contains("images/q1.png:"));
    }

    #[test]
    fn test_json_report_round_trips_counts() {
        let json = JsonFormatter::new(false).format_run_report(&sample_report());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["succeeded"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["files"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_markdown_report_table() {
        let md = MarkdownFormatter.format_run_report(&sample_report());
        assert!(md.contains("| `images/q2.png` | `extracted/q2.txt` | FAILED |"));
    }

    #[test]
    fn test_interrupted_report_title() {
        let mut report = sample_report();
        report.interrupted = true;
        let text = TextFormatter.format_run_report(&report);
        assert!(text.starts_with("Extraction Interrupted\n----------------------\n"));
        let md = MarkdownFormatter.format_run_report(&report);
        assert!(md.starts_with("## Extraction Interrupted"));
        let json = JsonFormatter::new(false).format_run_report(&report);
        assert!(json.contains("\"interrupted\":true"));
    }

    #[test]
    fn test_empty_plan() {
        assert_eq!(TextFormatter.format_plan(&[]), "No images found.\n");
        let json = JsonFormatter::new(false).format_plan(&[]);
        assert!(json.contains("\"count\":0"));
    }

    #[test]
    fn test_status_hides_key_in_json() {
        let status = StatusInfo {
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://example.invalid".to_string(),
            api_key: Some("********abcd".to_string()),
            input_dir: PathBuf::from("images"),
            input_exists: true,
            pending_images: 3,
            output_dir: PathBuf::from("extracted"),
            outputs_written: 1,
            previous_failures: 0,
            global_config: None,
            project_config: None,
            connection: None,
        };
        let json = JsonFormatter::new(false).format_status(&status);
        assert!(json.contains("\"api_key_set\":true"));
        assert!(!json.contains("abcd"));

        let text = TextFormatter.format_status(&status);
        assert!(text.contains("********abcd [SET]"));
    }
}
