//! Summary - Tạo báo cáo text sau upload/download.
//!
//! Khi bật show_summary, một file syncSummary.txt được ghi vào user
//! folder để user xem lại những gì đã được sync.

use crate::extensions::ExtensionRecord;
use crate::sync::download::DownloadReport;
use crate::sync::upload::UploadOutcome;
use anyhow::Result;
use chrono::Utc;
use std::path::Path;

fn header(title: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", title));
    out.push_str(&format!("Generated at: {}\n", Utc::now().to_rfc3339()));
    out.push_str(&"-".repeat(60));
    out.push('\n');
    out
}

fn extension_lines(records: &[ExtensionRecord]) -> String {
    records
        .iter()
        .map(|r| format!("  - {} ({})\n", r.full_id(), r.version))
        .collect()
}

/// Render báo cáo upload
pub fn render_upload_summary(outcome: &UploadOutcome) -> String {
    let mut out = header("settingsync - Upload Summary");

    out.push_str(&format!("Gist ID: {}\n", outcome.gist_id));
    if outcome.created_new_gist {
        out.push_str("A new gist was created for this upload.\n");
    }
    if outcome.public_gist {
        out.push_str("The gist is PUBLIC - anyone with the ID can download it.\n");
    }

    out.push_str(&format!(
        "\nUploaded files ({}):\n",
        outcome.uploaded_files.len()
    ));
    for name in &outcome.uploaded_files {
        out.push_str(&format!("  - {}\n", name));
    }

    out.push_str(&format!(
        "\nExtensions in manifest ({}):\n",
        outcome.extensions.len()
    ));
    out.push_str(&extension_lines(&outcome.extensions));

    out
}

/// Render báo cáo download
pub fn render_download_summary(report: &DownloadReport) -> String {
    let mut out = header("settingsync - Download Summary");

    out.push_str(&format!(
        "Files written ({}):\n",
        report.files_written.len()
    ));
    for name in &report.files_written {
        out.push_str(&format!("  - {}\n", name));
    }

    out.push_str(&format!(
        "\nExtensions installed ({}):\n",
        report.installed.len()
    ));
    out.push_str(&extension_lines(&report.installed));

    out.push_str(&format!(
        "\nExtensions removed ({}):\n",
        report.removed.len()
    ));
    out.push_str(&extension_lines(&report.removed));

    if report.overrides_applied > 0 {
        out.push_str(&format!(
            "\nSetting overrides applied: {}\n",
            report.overrides_applied
        ));
    }

    if !report.failures.is_empty() {
        out.push_str(&format!("\nFailures ({}):\n", report.failures.len()));
        for failure in &report.failures {
            out.push_str(&format!("  - {}: {}\n", failure.item, failure.reason));
        }
    }

    out
}

/// Ghi summary ra file
pub fn write_summary(path: &Path, content: &str) -> Result<()> {
    crate::files::write_file(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ItemFailure;

    #[test]
    fn test_download_summary_lists_failures() {
        let report = DownloadReport {
            files_written: vec!["settings.json".to_string()],
            installed: vec![ExtensionRecord::new("pub", "tool", "1.0")],
            removed: Vec::new(),
            failures: vec![ItemFailure {
                item: "install pub.other".to_string(),
                reason: "network error".to_string(),
            }],
            overrides_applied: 2,
        };

        let summary = render_download_summary(&report);
        assert!(summary.contains("settings.json"));
        assert!(summary.contains("pub.tool"));
        assert!(summary.contains("install pub.other"));
        assert!(summary.contains("Setting overrides applied: 2"));
    }
}
