use serde::{Deserialize, Serialize};

use crate::ToolKind;

/// A line typed into the chat session, either a slash command or a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    NewThread,
    ListThreads,
    Switch(String),
    Approve,
    Deny,
    Pending,
    Summary,
    Export(Option<String>),
    Tools,
    /// `/key <tool> <value>`: replace a tool's API key for this session.
    SetKey { kind: ToolKind, key: String },
    Help,
    Exit,
    Message(String),
    Unknown(String),
}

impl Command {
    /// Parse one trimmed input line.  Returns `None` for blank input.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if !line.starts_with('/') {
            return Some(Self::Message(line.to_string()));
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let command = match head {
            "/new" => Self::NewThread,
            "/threads" => Self::ListThreads,
            "/switch" if !rest.is_empty() => Self::Switch(rest.to_string()),
            "/approve" | "/y" => Self::Approve,
            "/deny" | "/n" => Self::Deny,
            "/pending" => Self::Pending,
            "/summary" => Self::Summary,
            "/export" => Self::Export((!rest.is_empty()).then(|| rest.to_string())),
            "/tools" => Self::Tools,
            "/key" => match rest.split_once(char::is_whitespace) {
                Some((tool, key)) if !key.trim().is_empty() => match ToolKind::from_name(tool) {
                    Some(kind) => Self::SetKey {
                        kind,
                        key: key.trim().to_string(),
                    },
                    None => Self::Unknown(line.to_string()),
                },
                _ => Self::Unknown(line.to_string()),
            },
            "/help" => Self::Help,
            "/exit" | "/quit" => Self::Exit,
            _ => Self::Unknown(line.to_string()),
        };
        Some(command)
    }
}

pub const HELP_LINES: &[&str] = &[
    "/new               start a new thread and switch to it",
    "/threads           list threads",
    "/switch <id>       make another thread active",
    "/approve, /y       run the proposed tool",
    "/deny, /n          reject the proposed tool",
    "/pending           show the proposal awaiting a decision",
    "/summary           print a session summary for the active thread",
    "/export [dir]      write {thread-id}_summary.txt",
    "/tools             list available tools",
    "/key <tool> <key>  set the weather or news API key for this session",
    "/help",
    "/exit",
];
