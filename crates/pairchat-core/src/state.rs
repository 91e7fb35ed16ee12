//! Client-side session state machine.
//!
//! [`SessionState`] is a deterministic reduction over [`ClientEvent`]s. The
//! transport layer feeds it inbound frames and connection lifecycle signals;
//! local actions read it to build [`OutboundFrame`]s. [`Status`] is never
//! stored, it is computed from liveness and pairing phase.
//!
//! ```text
//!             session_start                 session_end
//!   Waiting ───────────────▶ Paired ───────────────────────▶ Ended
//!      ▲                      │  ▲                             │
//!      │                      │  └──── session_start ──────────┘
//!      └──── closed (any) ────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ids::SessionId;
use crate::protocol::{InboundFrame, OutboundFrame};

/// Liveness of the underlying connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    /// Connect in flight.
    #[default]
    Connecting,
    /// Handshake complete; frames may flow.
    Open,
    /// Closed by either side or never established. Terminal for a connection.
    Closed,
}

/// A matched two-party conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingSession {
    /// Server-assigned identifier.
    pub session_id: SessionId,
    /// Display name of the other party.
    pub partner: String,
}

/// Pairing phase. `Waiting` and `Ended` both mean "no pairing session"; they
/// differ only in whether a session has ended on this connection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum Pairing {
    /// Waiting for the server to assign a partner.
    #[default]
    Waiting,
    /// Matched.
    Paired(PairingSession),
    /// The last pairing session ended.
    Ended,
}

/// One chat line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Who wrote it.
    pub author: String,
    /// What they wrote.
    pub text: String,
}

/// Append-only chat log for the current pairing session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<TranscriptEntry>);

impl Transcript {
    /// Entries in delivery order.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.0
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, author: String, text: String) {
        self.0.push(TranscriptEntry { author, text });
    }
}

/// A pairing session that has just ended, with its full transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedSession {
    /// The session that ended.
    pub session: PairingSession,
    /// Everything said in it, in delivery order.
    pub transcript: Transcript,
}

/// Display status derived from liveness and pairing phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Connected (or connecting) and waiting for a partner.
    AwaitingPartner,
    /// Paired with a partner.
    Connected,
    /// The last pairing session ended.
    Ended,
    /// No live connection.
    Disconnected,
}

impl Status {
    /// Stable label for display.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingPartner => "awaiting-partner",
            Self::Connected => "connected",
            Self::Ended => "ended",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// The connection handshake completed.
    Opened,
    /// A decoded inbound frame.
    Frame(InboundFrame),
    /// The connection closed, failed, or was stopped locally.
    Closed,
}

/// Why an event left the state unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ignored {
    /// The frame could not be decoded.
    Malformed,
    /// A paired-only frame arrived with no pairing session.
    NotPaired,
    /// The frame named a session other than the current one.
    StaleSession,
    /// The connection is already closed.
    Closed,
}

/// Outcome of applying one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The state changed.
    Applied,
    /// The event was discarded.
    Ignored(Ignored),
}

impl Transition {
    /// Whether the state changed.
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Client view of one connection's pairing activity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    liveness: Liveness,
    pairing: Pairing,
    transcript: Transcript,
}

impl SessionState {
    /// Initial state: connecting, waiting for a partner, empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Display status. Pure function of liveness and pairing phase.
    pub fn status(&self) -> Status {
        match (self.liveness, &self.pairing) {
            (Liveness::Closed, _) => Status::Disconnected,
            (_, Pairing::Waiting) => Status::AwaitingPartner,
            (_, Pairing::Paired(_)) => Status::Connected,
            (_, Pairing::Ended) => Status::Ended,
        }
    }

    /// Connection liveness.
    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    /// Pairing phase.
    pub fn pairing(&self) -> &Pairing {
        &self.pairing
    }

    /// The current pairing session, if matched.
    pub fn pairing_session(&self) -> Option<&PairingSession> {
        match &self.pairing {
            Pairing::Paired(session) => Some(session),
            Pairing::Waiting | Pairing::Ended => None,
        }
    }

    /// Current partner name, if matched.
    pub fn partner(&self) -> Option<&str> {
        self.pairing_session().map(|s| s.partner.as_str())
    }

    /// Current session identifier, if matched.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.pairing_session().map(|s| &s.session_id)
    }

    /// Transcript of the current pairing session.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Whether local chat actions are currently valid.
    pub fn can_send(&self) -> bool {
        self.liveness == Liveness::Open && self.pairing_session().is_some()
    }

    /// Build a chat frame for `text`, or `None` when sending is not valid.
    pub fn chat_frame(&self, text: &str) -> Option<OutboundFrame> {
        if !self.can_send() {
            return None;
        }
        let session_id = self.session_id()?.clone();
        Some(OutboundFrame::ChatMessage {
            session_id,
            content: text.to_owned(),
        })
    }

    /// Build an end-session frame, or `None` when not valid.
    ///
    /// The pairing session is not cleared here; the server's `session_end`
    /// is the authoritative end.
    pub fn end_frame(&self) -> Option<OutboundFrame> {
        if !self.can_send() {
            return None;
        }
        let session_id = self.session_id()?.clone();
        Some(OutboundFrame::EndSession { session_id })
    }

    /// Decode a raw text frame and apply it. Undecodable frames are logged
    /// and leave the state unchanged.
    pub fn apply_text(&mut self, text: &str) -> Transition {
        self.advance_text(text).0
    }

    /// Apply one event.
    pub fn apply(&mut self, event: ClientEvent) -> Transition {
        self.advance(event).0
    }

    /// [`apply_text`](Self::apply_text), also returning the pairing session
    /// the frame ended, if any.
    pub fn advance_text(&mut self, text: &str) -> (Transition, Option<FinishedSession>) {
        match InboundFrame::decode(text) {
            Ok(frame) => self.advance(ClientEvent::Frame(frame)),
            Err(error) => {
                warn!(%error, len = text.len(), "discarding malformed frame");
                (Transition::Ignored(Ignored::Malformed), None)
            }
        }
    }

    /// [`apply`](Self::apply), also returning the pairing session the event
    /// ended, if any. A session ends on `session_end`, on a new
    /// `session_start`, or when the connection closes.
    pub fn advance(&mut self, event: ClientEvent) -> (Transition, Option<FinishedSession>) {
        if self.liveness == Liveness::Closed {
            debug!(?event, "event after close ignored");
            return (Transition::Ignored(Ignored::Closed), None);
        }

        match event {
            ClientEvent::Opened => {
                self.liveness = Liveness::Open;
                (Transition::Applied, None)
            }
            ClientEvent::Closed => {
                self.liveness = Liveness::Closed;
                (Transition::Applied, self.finish(Pairing::Waiting))
            }
            ClientEvent::Frame(frame) => self.apply_frame(frame),
        }
    }

    fn apply_frame(&mut self, frame: InboundFrame) -> (Transition, Option<FinishedSession>) {
        match frame {
            InboundFrame::SessionStart {
                session_id,
                partner,
            } => {
                info!(%session_id, %partner, "paired");
                let finished = self.finish(Pairing::Paired(PairingSession {
                    session_id,
                    partner,
                }));
                (Transition::Applied, finished)
            }
            InboundFrame::ChatMessage {
                user,
                message,
                session_id,
            } => {
                if let Some(ignored) = self.check_session(session_id.as_ref()) {
                    debug!(?ignored, %user, "chat message dropped");
                    return (Transition::Ignored(ignored), None);
                }
                self.transcript.push(user, message);
                (Transition::Applied, None)
            }
            InboundFrame::SessionEnd { session_id } => {
                if let Some(ignored) = self.check_session(session_id.as_ref()) {
                    debug!(?ignored, "session end dropped");
                    return (Transition::Ignored(ignored), None);
                }
                info!("pairing session ended");
                (Transition::Applied, self.finish(Pairing::Ended))
            }
        }
    }

    /// Move to `next`, clearing the transcript and handing back the session
    /// it belonged to.
    fn finish(&mut self, next: Pairing) -> Option<FinishedSession> {
        let transcript = std::mem::take(&mut self.transcript);
        match std::mem::replace(&mut self.pairing, next) {
            Pairing::Paired(session) => Some(FinishedSession {
                session,
                transcript,
            }),
            Pairing::Waiting | Pairing::Ended => None,
        }
    }

    /// A paired-only frame is accepted when paired and, if it names a
    /// session, that session is the current one.
    fn check_session(&self, named: Option<&SessionId>) -> Option<Ignored> {
        let Some(current) = self.session_id() else {
            return Some(Ignored::NotPaired);
        };
        match named {
            Some(id) if id != current => Some(Ignored::StaleSession),
            _ => None,
        }
    }
}

/// Pure reducer form of [`SessionState::apply`].
pub fn reduce(mut state: SessionState, event: ClientEvent) -> SessionState {
    let _ = state.apply(event);
    state
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::capture_logs;
    use assert_matches::assert_matches;

    fn start(id: &str, partner: &str) -> ClientEvent {
        ClientEvent::Frame(InboundFrame::SessionStart {
            session_id: SessionId::from(id),
            partner: partner.into(),
        })
    }

    fn chat(user: &str, message: &str) -> ClientEvent {
        ClientEvent::Frame(InboundFrame::ChatMessage {
            user: user.into(),
            message: message.into(),
            session_id: None,
        })
    }

    fn chat_in(id: &str, user: &str, message: &str) -> ClientEvent {
        ClientEvent::Frame(InboundFrame::ChatMessage {
            user: user.into(),
            message: message.into(),
            session_id: Some(SessionId::from(id)),
        })
    }

    fn end() -> ClientEvent {
        ClientEvent::Frame(InboundFrame::SessionEnd { session_id: None })
    }

    fn open() -> SessionState {
        reduce(SessionState::new(), ClientEvent::Opened)
    }

    fn texts(state: &SessionState) -> Vec<(&str, &str)> {
        state
            .transcript()
            .entries()
            .iter()
            .map(|e| (e.author.as_str(), e.text.as_str()))
            .collect()
    }

    #[test]
    fn initial_state_awaits_partner() {
        let state = SessionState::new();
        assert_eq!(state.status(), Status::AwaitingPartner);
        assert_eq!(state.liveness(), Liveness::Connecting);
        assert!(state.pairing_session().is_none());
        assert!(state.transcript().is_empty());
        assert!(!state.can_send());
    }

    #[test]
    fn full_pairing_scenario() {
        let mut state = open();

        assert!(state.apply(start("s1", "bob")).is_applied());
        assert_eq!(state.status(), Status::Connected);
        assert_eq!(state.partner(), Some("bob"));

        assert!(state.apply(chat("bob", "hi")).is_applied());
        assert_eq!(texts(&state), vec![("bob", "hi")]);

        let frame = state.end_frame().unwrap();
        assert_eq!(
            frame,
            OutboundFrame::EndSession {
                session_id: SessionId::from("s1")
            }
        );
        // Requesting an end does not touch local state.
        assert_eq!(texts(&state), vec![("bob", "hi")]);
        assert_eq!(state.status(), Status::Connected);

        assert!(state.apply(end()).is_applied());
        assert!(state.transcript().is_empty());
        assert!(state.pairing_session().is_none());
        assert_eq!(state.status(), Status::Ended);
    }

    #[test]
    fn transcript_keeps_only_paired_messages_in_order() {
        let mut state = open();
        let _ = state.apply(chat("ghost", "before pairing"));
        let _ = state.apply(start("s1", "bob"));
        let _ = state.apply(chat("bob", "one"));
        let _ = state.apply(chat("alice", "two"));
        let _ = state.apply(chat("bob", "three"));
        assert_eq!(
            texts(&state),
            vec![("bob", "one"), ("alice", "two"), ("bob", "three")]
        );

        let _ = state.apply(end());
        let _ = state.apply(chat("bob", "after end"));
        assert!(state.transcript().is_empty());
    }

    #[test]
    fn chat_while_idle_is_ignored() {
        let mut state = open();
        assert_eq!(
            state.apply(chat("bob", "hi")),
            Transition::Ignored(Ignored::NotPaired)
        );
        assert!(state.transcript().is_empty());
    }

    #[test]
    fn session_end_while_idle_is_ignored() {
        let mut state = open();
        assert_eq!(state.apply(end()), Transition::Ignored(Ignored::NotPaired));
        assert_eq!(state.status(), Status::AwaitingPartner);
    }

    #[test]
    fn new_pairing_replaces_session_and_clears_transcript() {
        let mut state = open();
        let _ = state.apply(start("s1", "bob"));
        let _ = state.apply(chat("bob", "hi"));
        let _ = state.apply(start("s2", "carol"));
        assert_eq!(state.partner(), Some("carol"));
        assert_eq!(state.session_id().map(SessionId::as_str), Some("s2"));
        assert!(state.transcript().is_empty());
    }

    #[test]
    fn re_pairing_after_end() {
        let mut state = open();
        let _ = state.apply(start("s1", "bob"));
        let _ = state.apply(end());
        assert_eq!(state.status(), Status::Ended);
        let _ = state.apply(start("s2", "dave"));
        assert_eq!(state.status(), Status::Connected);
        assert_eq!(state.partner(), Some("dave"));
    }

    #[test]
    fn stale_session_frames_are_ignored() {
        let mut state = open();
        let _ = state.apply(start("s2", "bob"));
        assert_eq!(
            state.apply(chat_in("s1", "bob", "late")),
            Transition::Ignored(Ignored::StaleSession)
        );
        let stale_end = ClientEvent::Frame(InboundFrame::SessionEnd {
            session_id: Some(SessionId::from("s1")),
        });
        assert_eq!(
            state.apply(stale_end),
            Transition::Ignored(Ignored::StaleSession)
        );
        assert_eq!(state.status(), Status::Connected);

        assert!(state.apply(chat_in("s2", "bob", "fresh")).is_applied());
        assert_eq!(texts(&state), vec![("bob", "fresh")]);
    }

    #[test]
    fn close_while_paired_disconnects() {
        let mut state = open();
        let _ = state.apply(start("s1", "bob"));
        let _ = state.apply(chat("bob", "hi"));
        assert!(state.apply(ClientEvent::Closed).is_applied());
        assert_eq!(state.status(), Status::Disconnected);
        assert!(state.pairing_session().is_none());
        assert!(state.transcript().is_empty());
    }

    #[test]
    fn close_before_open_disconnects() {
        let state = reduce(SessionState::new(), ClientEvent::Closed);
        assert_eq!(state.status(), Status::Disconnected);
    }

    #[test]
    fn events_after_close_are_ignored() {
        let mut state = reduce(open(), ClientEvent::Closed);
        assert_eq!(
            state.apply(start("s1", "bob")),
            Transition::Ignored(Ignored::Closed)
        );
        assert_eq!(
            state.apply(ClientEvent::Opened),
            Transition::Ignored(Ignored::Closed)
        );
        assert_eq!(state.status(), Status::Disconnected);
    }

    #[test]
    fn no_outbound_frame_without_pairing() {
        let state = open();
        assert!(state.chat_frame("hi").is_none());
        assert!(state.end_frame().is_none());
    }

    #[test]
    fn no_outbound_frame_before_open() {
        let state = reduce(SessionState::new(), start("s1", "bob"));
        assert_eq!(state.status(), Status::Connected);
        assert!(state.chat_frame("hi").is_none());
    }

    #[test]
    fn chat_frame_carries_session_id() {
        let state = reduce(open(), start("s1", "bob"));
        assert_matches!(
            state.chat_frame("hello"),
            Some(OutboundFrame::ChatMessage { ref session_id, ref content })
                if session_id == "s1" && content == "hello"
        );
    }

    #[test]
    fn malformed_text_is_logged_and_ignored() {
        let (logs, _guard) = capture_logs();
        let mut state = reduce(open(), start("s1", "bob"));
        let before = state.clone();

        assert_eq!(
            state.apply_text("{not json"),
            Transition::Ignored(Ignored::Malformed)
        );
        assert_eq!(
            state.apply_text(r#"{"type":"presence","user":"bob"}"#),
            Transition::Ignored(Ignored::Malformed)
        );
        assert_eq!(state, before);
        assert_eq!(logs.count_at_level(tracing::Level::WARN), 2);
        assert!(logs.has_message("discarding malformed frame"));
    }

    #[test]
    fn apply_text_decodes_valid_frames() {
        let mut state = open();
        let t = state.apply_text(r#"{"type":"session_start","session_id":"s1","partner":"bob"}"#);
        assert!(t.is_applied());
        assert_eq!(state.partner(), Some("bob"));
    }

    #[test]
    fn status_labels() {
        assert_eq!(Status::AwaitingPartner.to_string(), "awaiting-partner");
        assert_eq!(Status::Connected.as_str(), "connected");
        assert_eq!(
            serde_json::to_string(&Status::Disconnected).unwrap(),
            "\"disconnected\""
        );
    }

    #[test]
    fn status_is_derived_for_every_combination() {
        let session = PairingSession {
            session_id: SessionId::from("s1"),
            partner: "bob".into(),
        };
        let cases = [
            (Liveness::Connecting, Pairing::Waiting, Status::AwaitingPartner),
            (Liveness::Open, Pairing::Waiting, Status::AwaitingPartner),
            (Liveness::Open, Pairing::Paired(session.clone()), Status::Connected),
            (Liveness::Open, Pairing::Ended, Status::Ended),
            (Liveness::Closed, Pairing::Paired(session), Status::Disconnected),
            (Liveness::Closed, Pairing::Ended, Status::Disconnected),
        ];
        for (liveness, pairing, expected) in cases {
            let state = SessionState {
                liveness,
                pairing,
                transcript: Transcript::default(),
            };
            assert_eq!(state.status(), expected);
        }
    }

    #[test]
    fn session_end_hands_back_full_transcript() {
        let mut state = open();
        let _ = state.apply(start("s1", "bob"));
        let _ = state.apply(chat("bob", "hi"));
        let _ = state.apply(chat("me", "last words"));

        let (t, finished) = state.advance(end());
        assert!(t.is_applied());
        let finished = finished.unwrap();
        assert_eq!(finished.session.session_id, "s1");
        assert_eq!(finished.session.partner, "bob");
        assert_eq!(finished.transcript.len(), 2);
        assert_eq!(finished.transcript.entries()[1].text, "last words");
        assert!(state.transcript().is_empty());
    }

    #[test]
    fn new_pairing_finishes_the_previous_one() {
        let mut state = open();
        let _ = state.apply(start("s1", "bob"));
        let _ = state.apply(chat("bob", "hi"));

        let (_, finished) = state.advance(start("s2", "carol"));
        let finished = finished.unwrap();
        assert_eq!(finished.session.session_id, "s1");
        assert_eq!(finished.transcript.len(), 1);
        assert_eq!(state.session_id().map(SessionId::as_str), Some("s2"));
    }

    #[test]
    fn close_while_paired_finishes_the_session() {
        let mut state = open();
        let _ = state.apply(start("s1", "bob"));
        let (_, finished) = state.advance(ClientEvent::Closed);
        assert_eq!(finished.unwrap().session.partner, "bob");
    }

    #[test]
    fn nothing_finishes_without_a_pairing() {
        let mut state = open();
        assert!(state.advance(end()).1.is_none());
        assert!(state.advance(chat("bob", "hi")).1.is_none());
        assert!(state.advance_text("garbage").1.is_none());
        assert!(state.advance(ClientEvent::Closed).1.is_none());

        let mut ended = open();
        let _ = ended.apply(start("s1", "bob"));
        let _ = ended.apply(end());
        assert!(ended.advance(ClientEvent::Closed).1.is_none());
    }
}
