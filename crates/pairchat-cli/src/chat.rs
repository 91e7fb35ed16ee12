//! Interactive chat loop.

use anyhow::{Result, bail};
use pairchat_api::{ApiClient, ChatSessionRecord};
use pairchat_client::AuthShell;
use pairchat_core::{FinishedSession, Status};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::render::Renderer;

/// What a line typed at the prompt asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    /// Send as chat text.
    Say(&'a str),
    /// End the current pairing session.
    End,
    /// Leave the chat.
    Quit,
    /// Nothing to do.
    Blank,
}

impl<'a> Input<'a> {
    /// Classify one input line.
    pub fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => Self::Blank,
            "/end" => Self::End,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Say(line.trim_end_matches(['\r', '\n'])),
        }
    }
}

/// Options for [`run`].
pub struct ChatOptions {
    /// Store each finished conversation with the server.
    pub save: bool,
}

/// Run the chat until `/quit`, end of input, or a lost connection.
pub async fn run(shell: &mut AuthShell, api: &ApiClient, opts: &ChatOptions) -> Result<()> {
    let mut finished = shell.client().finished_sessions();
    if !shell.restore().await {
        bail!("not logged in; run `pairchat login <username>` first");
    }
    let username = shell.username();

    let mut rx = shell.client().subscribe();
    let mut renderer = Renderer::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let initial = rx.borrow_and_update().clone();
    print_lines(renderer.update(&initial));
    if initial.status() == Status::Disconnected {
        bail!("could not connect to {}", shell.client().config().ws_url);
    }
    println!("type a message and press enter; /end ends the session, /quit leaves");

    loop {
        tokio::select! {
            // A finished session is published before the state that ended it.
            biased;

            done = finished.recv() => match done {
                Ok(done) => {
                    print_lines(renderer.finish(&done));
                    finish_session(api, shell, username.as_deref(), &done, opts).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "missed finished sessions");
                }
                Err(RecvError::Closed) => break,
            },
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                print_lines(renderer.update(&state));
                if state.status() == Status::Disconnected {
                    println!("connection closed");
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Input::parse(&line) {
                    Input::Blank => {}
                    Input::Quit => break,
                    Input::End => {
                        if !shell.client().end_session() {
                            println!("not in a chat session");
                        }
                    }
                    Input::Say(text) => {
                        if !shell.client().send_chat(text) {
                            println!("not paired yet; message not sent");
                        }
                    }
                }
            }
        }
    }

    shell.client_mut().stop().await;
    while let Ok(done) = finished.try_recv() {
        print_lines(renderer.finish(&done));
        finish_session(api, shell, username.as_deref(), &done, opts).await;
    }
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

/// Record for storing a finished conversation.
fn session_record(username: Option<&str>, done: &FinishedSession) -> ChatSessionRecord {
    ChatSessionRecord {
        session_id: done.session.session_id.clone(),
        user1: username.unwrap_or("me").to_owned(),
        user2: done.session.partner.clone(),
        is_ai: false,
        messages: done.transcript.entries().to_vec(),
        created_at: chrono::Utc::now().naive_utc(),
    }
}

/// Offer a rating hint and optionally store the finished conversation.
async fn finish_session(
    api: &ApiClient,
    shell: &AuthShell,
    username: Option<&str>,
    done: &FinishedSession,
    opts: &ChatOptions,
) {
    println!(
        "rate this conversation with: pairchat rate {} <1-5> --human|--ai",
        done.session.session_id
    );
    if !opts.save {
        return;
    }
    let Some(credential) = shell.credential() else {
        return;
    };

    let record = session_record(username, done);
    match api.create_chat_session(&credential, &record).await {
        Ok(created) => println!("saved conversation as {}", created.session_id),
        Err(error) => warn!(%error, "failed to save conversation"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Input::parse("/end"), Input::End);
        assert_eq!(Input::parse("  /quit "), Input::Quit);
        assert_eq!(Input::parse("/exit"), Input::Quit);
        assert_eq!(Input::parse("   "), Input::Blank);
    }

    #[test]
    fn other_lines_are_chat_text() {
        assert_eq!(Input::parse("hello there"), Input::Say("hello there"));
        assert_eq!(Input::parse("/shrug"), Input::Say("/shrug"));
        assert_eq!(Input::parse("  indented\r"), Input::Say("  indented"));
    }

    #[test]
    fn record_keeps_messages_from_a_session_replaced_in_one_step() {
        use pairchat_core::{ClientEvent, InboundFrame, SessionState};

        let frame = |json: &str| ClientEvent::Frame(InboundFrame::decode(json).unwrap());
        let mut state = SessionState::new();
        let _ = state.apply(ClientEvent::Opened);
        let _ = state.apply(frame(r#"{"type":"session_start","session_id":"s1","partner":"bob"}"#));
        let _ = state.apply(frame(r#"{"type":"chat_message","user":"bob","message":"hi"}"#));
        let _ = state.apply(frame(r#"{"type":"chat_message","user":"me","message":"bye"}"#));

        // The next pairing arrives without a separate end.
        let (_, done) =
            state.advance(frame(r#"{"type":"session_start","session_id":"s2","partner":"carol"}"#));
        let record = session_record(Some("alice"), &done.unwrap());

        assert_eq!(record.session_id, "s1");
        assert_eq!(record.user1, "alice");
        assert_eq!(record.user2, "bob");
        let texts: Vec<_> = record.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["hi", "bye"]);
    }
}
