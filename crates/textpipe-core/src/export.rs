use chrono::{NaiveDate, Utc};

/// A result packaged for download as a plain-text file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultArtifact {
    pub file_name: String,
    pub contents: String,
}

impl ResultArtifact {
    /// Artifact named after today's UTC date.
    pub fn today(contents: impl Into<String>) -> Self {
        Self::dated(Utc::now().date_naive(), contents)
    }

    pub fn dated(date: NaiveDate, contents: impl Into<String>) -> Self {
        Self {
            file_name: artifact_file_name(date),
            contents: contents.into(),
        }
    }
}

/// `azure-openai-result-YYYY-MM-DD.txt`
pub fn artifact_file_name(date: NaiveDate) -> String {
    format!("azure-openai-result-{}.txt", date.format("%Y-%m-%d"))
}
