use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The transcription result for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFragment {
    /// Which chunk this fragment belongs to (0-based)
    pub chunk_index: usize,
    pub outcome: FragmentOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// Text returned by the transcription service
    Text(String),
    /// The chunk could not be transcribed; the transcript gets a gap marker
    Failed { reason: String },
}

impl TranscriptFragment {
    pub fn text(chunk_index: usize, text: impl Into<String>) -> Self {
        Self {
            chunk_index,
            outcome: FragmentOutcome::Text(text.into()),
        }
    }

    pub fn failed(chunk_index: usize, reason: impl Into<String>) -> Self {
        Self {
            chunk_index,
            outcome: FragmentOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, FragmentOutcome::Failed { .. })
    }
}

/// Aggregate outcome of transcribing all chunks of a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptStatus {
    /// Every chunk produced text
    Complete,
    /// Some chunks failed; their indices are listed in ascending order
    PartialFailure { failed_indices: Vec<usize> },
    /// No chunk produced text
    TotalFailure,
}

/// An assembled transcript, ordered by chunk index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub fragments: Vec<TranscriptFragment>,
    pub status: TranscriptStatus,
}

impl Transcript {
    /// Build a transcript from per-chunk fragments, sorting them into chunk
    /// order and computing the aggregate status.
    pub fn from_fragments(mut fragments: Vec<TranscriptFragment>) -> Self {
        fragments.sort_by_key(|f| f.chunk_index);

        let failed_indices: Vec<usize> = fragments
            .iter()
            .filter(|f| f.is_failed())
            .map(|f| f.chunk_index)
            .collect();

        let status = if fragments.is_empty() || failed_indices.len() == fragments.len() {
            TranscriptStatus::TotalFailure
        } else if failed_indices.is_empty() {
            TranscriptStatus::Complete
        } else {
            TranscriptStatus::PartialFailure { failed_indices }
        };

        Self { fragments, status }
    }

    /// Transcript text with gap markers where chunks failed.
    pub fn body(&self) -> String {
        let parts: Vec<String> = self
            .fragments
            .iter()
            .map(|fragment| match &fragment.outcome {
                FragmentOutcome::Text(text) => text.clone(),
                FragmentOutcome::Failed { reason } => {
                    format!(
                        "[segment {} could not be transcribed: {}]",
                        fragment.chunk_index + 1,
                        reason
                    )
                }
            })
            .collect();

        parts.join("\n\n")
    }

    /// Characters of successfully transcribed text (markers excluded).
    pub fn character_count(&self) -> usize {
        self.fragments
            .iter()
            .map(|fragment| match &fragment.outcome {
                FragmentOutcome::Text(text) => text.chars().count(),
                FragmentOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    /// Render the full transcript file: header, separator, body.
    pub fn render(&self, recording_name: &str, duration_seconds: f64) -> String {
        let mut out = String::new();
        out.push_str(&format!("Recording: {recording_name}\n"));
        out.push_str(&format!(
            "Date: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("Duration: {}\n", format_hms(duration_seconds)));
        out.push_str(&"=".repeat(50));
        out.push_str("\n\n");
        out.push_str(&self.body());
        out.push('\n');
        out
    }

    /// Write the transcript as `<recording_name>.txt` and return its path.
    ///
    /// Partial failures still get written; the gaps are marked in the body.
    pub fn write(
        &self,
        transcripts_dir: &Path,
        recording_name: &str,
        duration_seconds: f64,
    ) -> Result<PathBuf> {
        fs::create_dir_all(transcripts_dir).context("Failed to create transcripts directory")?;

        let path = transcripts_dir.join(format!("{recording_name}.txt"));
        fs::write(&path, self.render(recording_name, duration_seconds))
            .with_context(|| format!("Failed to write transcript: {:?}", path))?;

        info!(
            "Transcript saved: {} ({} characters)",
            path.display(),
            self.character_count()
        );

        Ok(path)
    }
}

fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_successful_fragments_give_complete_status() {
        let transcript = Transcript::from_fragments(vec![
            TranscriptFragment::text(0, "first"),
            TranscriptFragment::text(1, "second"),
        ]);
        assert_eq!(transcript.status, TranscriptStatus::Complete);
        assert_eq!(transcript.body(), "first\n\nsecond");
    }

    #[test]
    fn fragments_are_sorted_into_chunk_order() {
        let transcript = Transcript::from_fragments(vec![
            TranscriptFragment::text(2, "third"),
            TranscriptFragment::text(0, "first"),
            TranscriptFragment::text(1, "second"),
        ]);
        assert_eq!(transcript.body(), "first\n\nsecond\n\nthird");
    }

    #[test]
    fn failed_fragments_become_gap_markers() {
        let transcript = Transcript::from_fragments(vec![
            TranscriptFragment::text(0, "before"),
            TranscriptFragment::failed(1, "rate limit exceeded"),
            TranscriptFragment::text(2, "after"),
        ]);

        assert_eq!(
            transcript.status,
            TranscriptStatus::PartialFailure {
                failed_indices: vec![1]
            }
        );
        assert_eq!(
            transcript.body(),
            "before\n\n[segment 2 could not be transcribed: rate limit exceeded]\n\nafter"
        );
    }

    #[test]
    fn all_failed_fragments_give_total_failure() {
        let transcript = Transcript::from_fragments(vec![
            TranscriptFragment::failed(0, "boom"),
            TranscriptFragment::failed(1, "boom"),
        ]);
        assert_eq!(transcript.status, TranscriptStatus::TotalFailure);
    }

    #[test]
    fn no_fragments_is_total_failure() {
        let transcript = Transcript::from_fragments(Vec::new());
        assert_eq!(transcript.status, TranscriptStatus::TotalFailure);
    }

    #[test]
    fn character_count_excludes_markers() {
        let transcript = Transcript::from_fragments(vec![
            TranscriptFragment::text(0, "hello"),
            TranscriptFragment::failed(1, "boom"),
        ]);
        assert_eq!(transcript.character_count(), 5);
    }

    #[test]
    fn render_includes_header_and_separator() {
        let transcript = Transcript::from_fragments(vec![TranscriptFragment::text(0, "hello")]);
        let rendered = transcript.render("recording_20260101_120000", 185.0);

        assert!(rendered.starts_with("Recording: recording_20260101_120000\n"));
        assert!(rendered.contains("Duration: 00:03:05\n"));
        assert!(rendered.contains(&"=".repeat(50)));
        assert!(rendered.ends_with("hello\n"));
    }

    #[test]
    fn hms_formatting() {
        assert_eq!(format_hms(0.0), "00:00:00");
        assert_eq!(format_hms(65.4), "00:01:05");
        assert_eq!(format_hms(3725.0), "01:02:05");
    }
}
