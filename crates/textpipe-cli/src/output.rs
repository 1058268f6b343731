use std::path::{Path, PathBuf};

use textpipe_core::budget::BudgetLevel;
use textpipe_core::{BudgetEvaluation, Notification, NotificationSink, ResultArtifact, Severity};
use tracing::info;

/// Prints notifications to stderr so stdout only carries results.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl NotificationSink for StderrSink {
    fn notify(&self, notification: Notification) {
        eprintln!("{}", render_notification(&notification));
    }
}

pub fn render_notification(n: &Notification) -> String {
    let tag = match n.severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    };
    format!("[{tag}] {}: {}", n.title, n.description)
}

pub fn render_budget(budget: &BudgetEvaluation) -> String {
    let level = match budget.level() {
        BudgetLevel::Normal => "ok",
        BudgetLevel::Warning => "approaching limit",
        BudgetLevel::Severe => "near limit",
        BudgetLevel::Exceeded => "over limit",
    };
    format!("{} / {} tokens ({level})", budget.count, budget.ceiling)
}

/// Writes the artifact into `dir` and returns the full path.
pub fn write_artifact(dir: &Path, artifact: &ResultArtifact) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.contents)?;
    info!(event = "cli.artifact_written", domain = "cli", path = %path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use textpipe_core::BudgetPolicy;

    #[test]
    fn renders_levels() {
        let policy = BudgetPolicy::with_ceiling(100);
        assert_eq!(render_budget(&policy.evaluate_count(10)), "10 / 100 tokens (ok)");
        assert_eq!(
            render_budget(&policy.evaluate_count(85)),
            "85 / 100 tokens (approaching limit)"
        );
        assert_eq!(
            render_budget(&policy.evaluate_count(101)),
            "101 / 100 tokens (over limit)"
        );
    }

    #[test]
    fn renders_notification_with_severity_tag() {
        let n = Notification::error("No Content", "Please enter some text.");
        assert_eq!(render_notification(&n), "[error] No Content: Please enter some text.");
    }

    #[test]
    fn writes_artifact_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ResultArtifact {
            file_name: "azure-openai-result-2026-01-02.txt".into(),
            contents: "Hi there\n".into(),
        };
        let path = write_artifact(&dir.path().join("out"), &artifact).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Hi there\n");
    }
}
