use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;

use threadbot_core::commands::{Command, HELP_LINES};
use threadbot_core::{PendingAction, describe_args};
use threadbot_runtime::gate::proposal_text;
use threadbot_runtime::{Reply, Resolution, Session};

pub(crate) async fn run_line_session(session: &mut Session, export_dir: &Path) -> Result<()> {
    println!("threadbot is online. Type /help for commands.");
    print_prompt(session)?;

    let stdin = io::stdin();
    loop {
        let mut line = String::new();
        let bytes = stdin.read_line(&mut line)?;
        if bytes == 0 {
            println!("session closed");
            break;
        }

        let Some(command) = Command::parse(&line) else {
            print_prompt(session)?;
            continue;
        };

        match command {
            Command::Exit => {
                println!("session closed");
                break;
            }
            Command::Help => {
                for line in HELP_LINES {
                    println!("{line}");
                }
            }
            Command::NewThread => {
                let id = session.new_thread();
                println!("started {id}");
            }
            Command::ListThreads => {
                let active = session.active().map(|t| t.id().to_string());
                for thread in session.store().list() {
                    let marker = if active.as_deref() == Some(thread.id()) { "*" } else { " " };
                    let waiting = if thread.pending().is_some() { "  (awaiting approval)" } else { "" };
                    println!(
                        "{marker} {}  {} messages{waiting}",
                        thread.id(),
                        thread.messages().len()
                    );
                }
            }
            Command::Switch(id) => match session.switch(&id) {
                Ok(()) => {
                    println!("switched to {id}");
                    if let Some(pending) = session.active().and_then(|t| t.pending()) {
                        println!("{}", pending_line(pending));
                    }
                }
                Err(err) => eprintln!("{err}"),
            },
            Command::Approve => match session.approve().await {
                Ok(resolution) => println!("{}", resolution_text(resolution.as_ref())),
                Err(err) => eprintln!("{err}"),
            },
            Command::Deny => match session.deny() {
                Ok(resolution) => println!("{}", resolution_text(resolution.as_ref())),
                Err(err) => eprintln!("{err}"),
            },
            Command::Pending => match session.active().and_then(|t| t.pending()) {
                Some(pending) => println!("{}", pending_line(pending)),
                None => println!("nothing is waiting for approval"),
            },
            Command::Summary => match session.summarize().await {
                Ok(report) => print!("{}", report.render()),
                Err(err) => eprintln!("{err}"),
            },
            Command::Export(dir) => {
                let dir = dir.map(PathBuf::from).unwrap_or_else(|| export_dir.to_path_buf());
                match session.export_summary(&dir).await {
                    Ok((_, path)) => println!("summary written to {}", path.display()),
                    Err(err) => eprintln!("export failed: {err:#}"),
                }
            }
            Command::Tools => {
                for spec in session.tool_specs() {
                    println!("{:<12} {}", spec.kind, spec.description);
                }
            }
            Command::SetKey { kind, key } => match session.set_credential(kind, &key) {
                Ok(()) => println!("{kind} API key updated for this session"),
                Err(err) => eprintln!("{err}"),
            },
            Command::Message(text) => match session.submit(&text).await {
                Ok(reply) => println!("{}", reply_text(&reply)),
                Err(err) => eprintln!("{err}"),
            },
            Command::Unknown(raw) => println!("unknown command: {raw} (try /help)"),
        }

        print_prompt(session)?;
    }

    Ok(())
}

fn print_prompt(session: &Session) -> Result<()> {
    let id = session.active().map(|t| t.id()).unwrap_or("-");
    print!("[{id}] > ");
    io::stdout().flush()?;
    Ok(())
}

fn reply_text(reply: &Reply) -> String {
    match reply {
        Reply::Answer(text) => text.clone(),
        Reply::Proposal(action) => format!("{} (/approve or /deny)", proposal_text(action)),
        Reply::AwaitingDecision(action) => format!(
            "{}\nApprove or deny it before sending a new message.",
            pending_line(action)
        ),
    }
}

fn resolution_text(resolution: Option<&Resolution>) -> String {
    match resolution {
        Some(resolution) => resolution.message.clone(),
        None => "nothing is waiting for approval".to_string(),
    }
}

fn pending_line(action: &PendingAction) -> String {
    format!(
        "pending: {} with `{}`",
        action.kind,
        describe_args(&action.arguments)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadbot_core::{ToolArgs, ToolKind};
    use threadbot_runtime::ResolutionStatus;

    fn weather(city: &str) -> PendingAction {
        let mut args = ToolArgs::new();
        args.insert("city".to_string(), city.to_string());
        PendingAction::new(ToolKind::Weather, args)
    }

    #[test]
    fn proposal_reply_mentions_both_commands() {
        let text = reply_text(&Reply::Proposal(weather("Paris")));
        assert!(text.starts_with("I think I should use **weather** with `city=\"Paris\"`."));
        assert!(text.contains("/approve"));
        assert!(text.contains("/deny"));
    }

    #[test]
    fn awaiting_reply_names_the_open_proposal() {
        let text = reply_text(&Reply::AwaitingDecision(weather("Oslo")));
        assert!(text.starts_with("pending: weather with `city=\"Oslo\"`"));
    }

    #[test]
    fn resolution_without_pending_is_explained() {
        assert_eq!(resolution_text(None), "nothing is waiting for approval");
        let done = Resolution {
            kind: ToolKind::Calculator,
            status: ResolutionStatus::Completed,
            message: "4".to_string(),
        };
        assert_eq!(resolution_text(Some(&done)), "4");
    }
}
