//! Terminal rendering of session state.
//!
//! Only reads [`SessionState`]; it never drives the state machine.

use std::collections::HashMap;

use pairchat_core::{FinishedSession, SessionState, Status, TranscriptEntry};

/// One-line summary of the current status.
pub fn status_line(state: &SessionState) -> String {
    match (state.status(), state.pairing_session()) {
        (Status::Connected, Some(session)) => format!(
            "[connected] chatting with {} (session {})",
            session.partner, session.session_id
        ),
        (Status::AwaitingPartner, _) => "[awaiting-partner] waiting for a partner...".into(),
        (Status::Ended, _) => "[ended] the chat session has ended".into(),
        (status, _) => format!("[{status}]"),
    }
}

/// A transcript line.
pub fn entry_line(entry: &TranscriptEntry) -> String {
    format!("{}: {}", entry.author, entry.text)
}

/// Turns successive state snapshots into the lines that are new since the
/// last snapshot.
///
/// Snapshots may skip intermediate states, so lines are counted per session
/// id. [`finish`](Self::finish) prints whatever a snapshot never showed
/// before a session ended.
#[derive(Debug, Default)]
pub struct Renderer {
    last_status: Option<Status>,
    last_session: Option<String>,
    printed: HashMap<String, usize>,
}

impl Renderer {
    /// Lines to print for `state`.
    pub fn update(&mut self, state: &SessionState) -> Vec<String> {
        let mut lines = Vec::new();

        let session = state.session_id().map(|id| id.as_str().to_owned());
        if self.last_status != Some(state.status()) || self.last_session != session {
            lines.push(status_line(state));
            self.last_status = Some(state.status());
            self.last_session.clone_from(&session);
        }

        if let Some(id) = session {
            let entries = state.transcript().entries();
            let printed = self.printed.entry(id).or_default();
            let from = (*printed).min(entries.len());
            lines.extend(entries[from..].iter().map(entry_line));
            *printed = entries.len();
        }

        lines
    }

    /// Lines of `finished` not yet printed. A session no snapshot ever showed
    /// gets its header too.
    pub fn finish(&mut self, finished: &FinishedSession) -> Vec<String> {
        let id = finished.session.session_id.as_str();
        let entries = finished.transcript.entries();
        let mut lines = Vec::new();

        let from = match self.printed.remove(id) {
            Some(printed) => printed.min(entries.len()),
            None => {
                lines.push(format!(
                    "[connected] chatting with {} (session {id})",
                    finished.session.partner
                ));
                0
            }
        };
        lines.extend(entries[from..].iter().map(entry_line));
        lines
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
