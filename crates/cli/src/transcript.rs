//! Markdown transcripts of chat sessions.

use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use verirag_core::{AppError, AppResult};
use verirag_workflow::WorkflowState;

#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub timestamp: DateTime<Local>,
    pub question: String,
    pub answer: String,
    pub confidence: String,
    pub sources: Vec<String>,
    pub retries: u32,
}

impl TranscriptEntry {
    pub fn from_state(state: &WorkflowState) -> Self {
        Self {
            timestamp: Local::now(),
            question: state.original_question.clone(),
            answer: state.final_answer.clone(),
            confidence: state
                .confidence
                .map(|c| c.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            sources: state.sources.clone(),
            retries: state.retry_count,
        }
    }
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn render(&self, generated_at: DateTime<Local>) -> String {
        let mut out = String::new();
        out.push_str("# Verirag Chat Transcript\n\n");
        let _ = writeln!(out, "**Generated:** {}\n", generated_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "**Total Questions:** {}\n", self.entries.len());
        out.push_str("---\n\n");

        for (i, entry) in self.entries.iter().enumerate() {
            let _ = writeln!(out, "## Question {}\n", i + 1);
            let _ = writeln!(out, "**Time:** {}\n", entry.timestamp.to_rfc3339());
            let _ = writeln!(out, "**Question:** {}\n", entry.question);
            let _ = writeln!(out, "**Answer:**\n\n{}\n", entry.answer);
            let _ = writeln!(out, "**Confidence:** {}", entry.confidence);
            let _ = writeln!(out, "**Retries:** {}", entry.retries);
            if !entry.sources.is_empty() {
                let _ = writeln!(out, "**Sources:** {}", entry.sources.join(", "));
            }
            out.push_str("\n---\n\n");
        }
        out
    }

    /// Write the transcript to a timestamped file in `dir`.
    pub fn save(&self, dir: &Path) -> AppResult<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create {}: {}", dir.display(), e),
            ))
        })?;

        let now = Local::now();
        let path = dir.join(format!("chat_transcript_{}.md", now.format("%Y%m%d_%H%M%S")));
        std::fs::write(&path, self.render(now))?;

        tracing::info!(path = %path.display(), entries = self.entries.len(), "Saved transcript");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verirag_workflow::Confidence;

    fn entry() -> TranscriptEntry {
        let mut state = WorkflowState::new("What grew?", vec![], 2);
        state.final_answer = "Revenue grew.".to_string();
        state.confidence = Some(Confidence::High);
        state.sources = vec!["report.md".to_string()];
        TranscriptEntry::from_state(&state)
    }

    #[test]
    fn test_render_lists_entries() {
        let mut transcript = Transcript::default();
        transcript.push(entry());
        transcript.push(entry());

        let text = transcript.render(Local::now());
        assert!(text.starts_with("# Verirag Chat Transcript"));
        assert!(text.contains("**Total Questions:** 2"));
        assert!(text.contains("## Question 2"));
        assert!(text.contains("**Question:** What grew?"));
        assert!(text.contains("**Sources:** report.md"));
        assert!(text.contains("**Confidence:** High"));
    }

    #[test]
    fn test_save_writes_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut transcript = Transcript::default();
        transcript.push(entry());

        let path = transcript.save(&temp.path().join("transcripts")).unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("Revenue grew."));
    }
}
