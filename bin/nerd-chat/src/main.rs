//! nerd-chat – talk to a running nerd-server from the terminal.
//!
//! Drives the relay exactly like the browser widget: images are uploaded
//! first and referenced by URL, the whole history is posted on every turn,
//! and failures show up inline as assistant messages.

mod client;

use std::path::PathBuf;

use clap::Parser;
use nerd_core::ChatSession;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::client::{RelayClient, reply_extras, reply_text};

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are Nerd, a floating web guide. Answer concisely in Persian. Keep replies short and actionable.";

#[derive(Debug, Parser)]
#[command(name = "nerd-chat", version, about = "Terminal client for the Nerd Agent relay")]
struct Args {
    /// Base URL of the relay.
    #[arg(long, env = "NERD_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Model to request instead of the server default.
    #[arg(long)]
    model: Option<String>,

    /// System prompt that opens the session.
    #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT)]
    system: String,

    /// Image to attach to the first message.
    #[arg(long)]
    image: Option<PathBuf>,
}

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Say(String),
    Image(PathBuf),
    Clear,
    Health,
    Quit,
    Empty,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line.split_once(char::is_whitespace).unwrap_or((line, "")) {
        ("", _) => Command::Empty,
        ("/quit" | "/exit", _) => Command::Quit,
        ("/clear", _) => Command::Clear,
        ("/health", _) => Command::Health,
        ("/image", path) if !path.trim().is_empty() => Command::Image(PathBuf::from(path.trim())),
        _ => Command::Say(line.to_owned()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = RelayClient::new(&args.server);
    let mut session = ChatSession::new(&args.system);
    let mut pending_image: Option<String> = None;

    if let Some(path) = &args.image {
        pending_image = Some(client.upload_file(path).await?.url);
    }

    println!("nerd-chat → {}  (/image <path>, /clear, /health, /quit)", client.base_url());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Clear => {
                session.clear();
                pending_image = None;
                println!("(history cleared)");
            }
            Command::Health => match client.health().await {
                Ok(h) => println!(
                    "ok={} model={} version={}",
                    h.ok,
                    h.model,
                    h.version.as_deref().unwrap_or("?")
                ),
                Err(e) => println!("health check failed: {e}"),
            },
            Command::Image(path) => match client.upload_file(&path).await {
                Ok(uploaded) => {
                    debug!(id = %uploaded.id, "image uploaded");
                    println!("(image attached to next message)");
                    pending_image = Some(uploaded.url);
                }
                Err(e) => println!("upload failed: {e}"),
            },
            Command::Say(text) => {
                session.push_user(text, pending_image.take());
                match client.chat(session.messages(), args.model.as_deref()).await {
                    Ok(reply) => {
                        println!("{}", reply_text(&reply));
                        if let Some(extra) = reply_extras(&reply) {
                            println!("{}", serde_json::to_string_pretty(extra)?);
                        }
                        session.push_assistant(reply_text(&reply));
                    }
                    Err(e) => {
                        println!("Error: {e}");
                        session.push_error(e);
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_plain_text() {
        assert_eq!(parse_command("  "), Command::Empty);
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("/clear"), Command::Clear);
        assert_eq!(parse_command("/health"), Command::Health);
        assert_eq!(parse_command("/image ./shot.png"), Command::Image(PathBuf::from("./shot.png")));
        assert_eq!(parse_command("/image"), Command::Say("/image".into()));
        assert_eq!(parse_command("hello there"), Command::Say("hello there".into()));
    }

    #[test]
    fn args_have_widget_defaults() {
        let args = Args::parse_from(["nerd-chat"]);
        assert_eq!(args.system, DEFAULT_SYSTEM_PROMPT);
        assert!(args.model.is_none());
    }
}
