//! Interactive loop between a [`Channel`] and a [`RagSession`].

use std::fmt::Write as _;
use std::path::Path;

use crate::channel::{Channel, ChannelError};
use crate::session::RagSession;

pub const HELP_TEXT: &str = "\
Commands:
  /web on|off    enable or disable web search
  /history       show the conversation so far
  /load <path>   load a new report (clears the conversation)
  /help          show this help
  exit, quit     leave the chat
Anything else is sent as a question about the report.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command<'a> {
    Web(Option<bool>),
    History,
    Load(&'a str),
    Help,
    Exit,
    Question(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Command::Exit;
    }
    let (word, arg) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, a)| (w, a.trim()));
    match word {
        "/web" => Command::Web(match arg {
            "on" => Some(true),
            "off" => Some(false),
            _ => None,
        }),
        "/history" if arg.is_empty() => Command::History,
        "/load" => Command::Load(arg),
        "/help" if arg.is_empty() => Command::Help,
        _ => Command::Question(line),
    }
}

fn render_history(session: &RagSession) -> String {
    if session.history().is_empty() {
        return "(no messages yet)".to_owned();
    }
    let mut out = String::new();
    for turn in session.history() {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "{}: {}", turn.role, turn.content);
    }
    out
}

/// Drive `session` from `channel` until the user quits or input ends.
///
/// # Errors
///
/// Returns an error if the channel fails.
pub async fn run_chat<C: Channel>(
    session: &mut RagSession,
    channel: &mut C,
) -> Result<(), ChannelError> {
    while let Some(message) = channel.recv().await? {
        let command = parse_command(&message.text);
        tracing::debug!(?command, "chat input");
        match command {
            Command::Exit => break,
            Command::Question("") => {}
            Command::Question(question) => {
                let outcome = session.query(question).await;
                channel.send(&outcome.to_string()).await?;
            }
            Command::Web(Some(enabled)) => {
                session.update_tools(enabled);
                let state = if enabled { "enabled" } else { "disabled" };
                channel.send(&format!("Web search {state}.")).await?;
            }
            Command::Web(None) => {
                let state = if session.web_search_enabled() { "on" } else { "off" };
                channel
                    .send(&format!("Web search is {state}. Usage: /web on|off"))
                    .await?;
            }
            Command::History => channel.send(&render_history(session)).await?,
            Command::Load("") => channel.send("Usage: /load <path>").await?,
            Command::Load(path) => {
                let reply = match session.ingest_file(Path::new(path)).await {
                    Ok(chunks) => format!("Report loaded ({chunks} chunks). Conversation cleared."),
                    Err(e) => format!("Failed to process report: {e}"),
                };
                channel.send(&reply).await?;
            }
            Command::Help => channel.send(HELP_TEXT).await?,
        }
    }
    Ok(())
}
