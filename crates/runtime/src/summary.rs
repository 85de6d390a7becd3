//! Session summary reports and their plain-text export.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeDelta, Utc};
use tracing::{debug, warn};

use threadbot_core::ToolKind;
use threadbot_llm::{ChatMessage, ChatModel};

use crate::thread::Thread;

pub const SUMMARY_PROMPT: &str =
    "Summarize the conversation in 3–5 sentences. Keep it concise and clear.";

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub thread_id: String,
    pub generated_at: DateTime<Local>,
    pub duration: TimeDelta,
    pub message_count: usize,
    pub digest: String,
    /// Every tool, zero counts included, in tool order.
    pub tool_usage: Vec<(ToolKind, u64)>,
    pub tokens_used: u64,
}

impl SummaryReport {
    /// Snapshot `thread` at `now` with an already-obtained digest.
    pub fn build(thread: &Thread, digest: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            thread_id: thread.id().to_string(),
            generated_at: now.with_timezone(&Local),
            duration: now - thread.created_at(),
            message_count: thread.messages().len(),
            digest: digest.into(),
            tool_usage: thread
                .tool_usage()
                .iter()
                .map(|(kind, count)| (*kind, *count))
                .collect(),
            tokens_used: thread.tokens_used(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("Session Summary - {}\n", self.thread_id);
        out.push_str(&format!(
            "Date: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("Duration: {}\n", format_duration(self.duration)));
        out.push_str(&format!("Messages: {}\n\n", self.message_count));
        out.push_str(&format!("Conversation Summary:\n{}\n\n", self.digest));
        out.push_str("Tool Usage:\n");
        for (kind, count) in &self.tool_usage {
            out.push_str(&format!("- {kind}: {count} times\n"));
        }
        out.push_str(&format!("\nTokens Used: {}\n", self.tokens_used));
        out
    }

    pub fn file_name(&self) -> String {
        format!("{}_summary.txt", self.thread_id)
    }

    /// Write the rendered report into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let path = dir.join(self.file_name());
        fs::write(&path, self.render()).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

/// `H:MM:SS`, sub-second part dropped, hours unbounded.
pub fn format_duration(duration: TimeDelta) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Ask the model for a digest of `thread`, charge its tokens, then snapshot.
pub async fn summarize(thread: &mut Thread, model: &dyn ChatModel) -> SummaryReport {
    let messages = [
        ChatMessage::system(SUMMARY_PROMPT),
        ChatMessage::user(thread.transcript()),
    ];
    let digest = match model.complete(&messages).await {
        Ok(completion) => {
            thread.add_tokens(completion.total_tokens);
            debug!(thread = thread.id(), tokens = completion.total_tokens, "summary digest received");
            completion.content.trim().to_string()
        }
        Err(err) => {
            warn!(?err, thread = thread.id(), "summary digest failed");
            format!("(summary unavailable: {err})")
        }
    };
    SummaryReport::build(thread, digest, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use threadbot_core::Message;

    use crate::testing::ScriptedModel;

    fn sample_thread() -> Thread {
        let mut thread = Thread::new("thread-3");
        thread.push(Message::user("what's 2+2"));
        thread.push(Message::assistant("4"));
        thread.record_tool_use(ToolKind::Calculator);
        thread.add_tokens(120);
        thread
    }

    #[test]
    fn format_duration_truncates_and_pads() {
        assert_eq!(format_duration(TimeDelta::milliseconds(999)), "0:00:00");
        assert_eq!(format_duration(TimeDelta::seconds(65)), "0:01:05");
        assert_eq!(format_duration(TimeDelta::seconds(3 * 3600 + 7)), "3:00:07");
        assert_eq!(format_duration(TimeDelta::hours(27)), "27:00:00");
        assert_eq!(format_duration(TimeDelta::seconds(-5)), "0:00:00");
    }

    #[test]
    fn render_matches_template() {
        let report = SummaryReport {
            thread_id: "thread-1".to_string(),
            generated_at: Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            duration: TimeDelta::seconds(125),
            message_count: 4,
            digest: "The user asked for a sum.".to_string(),
            tool_usage: vec![
                (ToolKind::Calculator, 1),
                (ToolKind::Weather, 0),
                (ToolKind::News, 2),
            ],
            tokens_used: 321,
        };
        assert_eq!(
            report.render(),
            "Session Summary - thread-1\n\
             Date: 2024-05-01 09:30:00\n\
             Duration: 0:02:05\n\
             Messages: 4\n\
             \n\
             Conversation Summary:\n\
             The user asked for a sum.\n\
             \n\
             Tool Usage:\n\
             - calculator: 1 times\n\
             - weather: 0 times\n\
             - news: 2 times\n\
             \n\
             Tokens Used: 321\n"
        );
        assert_eq!(report.file_name(), "thread-1_summary.txt");
    }

    #[test]
    fn build_snapshots_thread_state() {
        let mut thread = sample_thread();
        thread.backdate(TimeDelta::seconds(90));
        let report = SummaryReport::build(&thread, "digest", Utc::now());

        assert_eq!(report.thread_id, "thread-3");
        assert_eq!(report.message_count, 2);
        assert_eq!(report.tokens_used, 120);
        assert_eq!(
            report.tool_usage,
            vec![
                (ToolKind::Calculator, 1),
                (ToolKind::Weather, 0),
                (ToolKind::News, 0)
            ]
        );
        assert!(format_duration(report.duration).starts_with("0:01:3"));
    }

    #[tokio::test]
    async fn summarize_charges_its_own_tokens() {
        let model = ScriptedModel::new();
        model.reply("  A short digest.  ", 40);
        let mut thread = sample_thread();

        let report = summarize(&mut thread, &model).await;
        assert_eq!(report.digest, "A short digest.");
        assert_eq!(report.tokens_used, 160);
        assert_eq!(thread.tokens_used(), 160);

        let calls = model.calls();
        assert_eq!(calls[0][0], ChatMessage::system(SUMMARY_PROMPT));
        assert_eq!(calls[0][1].content, "user: what's 2+2\nassistant: 4");
    }

    #[tokio::test]
    async fn summarizing_twice_only_moves_tokens() {
        let model = ScriptedModel::new();
        model.reply("first", 30).reply("second", 25);
        let mut thread = sample_thread();

        let first = summarize(&mut thread, &model).await;
        let second = summarize(&mut thread, &model).await;

        assert_eq!(first.message_count, second.message_count);
        assert_eq!(first.tool_usage, second.tool_usage);
        assert_eq!(first.thread_id, second.thread_id);
        assert_eq!(second.tokens_used, first.tokens_used + 25);
    }

    #[tokio::test]
    async fn failed_digest_still_reports() {
        let model = ScriptedModel::new();
        model.fail("timeout");
        let mut thread = sample_thread();

        let report = summarize(&mut thread, &model).await;
        assert!(report.digest.contains("summary unavailable"));
        assert_eq!(report.tokens_used, 120);
    }

    #[test]
    fn write_to_creates_named_file() {
        let dir = TempDir::new().unwrap();
        let report = SummaryReport::build(&sample_thread(), "digest", Utc::now());

        let path = report.write_to(&dir.path().join("exports")).unwrap();
        assert!(path.ends_with("thread-3_summary.txt"));
        let written = fs::read_to_string(path).unwrap();
        assert_eq!(written, report.render());
    }
}
