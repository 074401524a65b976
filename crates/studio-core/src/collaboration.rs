//! Collaboration session state for one participant.
//!
//! The manager never talks to the network itself. Outgoing traffic is
//! queued as [`ChannelCommand`]s for the host to hand to its transport, and
//! incoming payloads are fed back through [`CollaborationManager::handle_message`].
//! Canvas sync is last-write-wins at whole-scene granularity: every
//! accepted canvas message replaces the receiver's active page.

use crate::scene::SceneSnapshot;
use crate::sync::{
    CanvasMessage, ChannelCommand, ChatMessage, Feed, Participant, PresenceState, SessionCode,
    SyncError, SyncEvent, SyncResult,
};
use chrono::Utc;
use serde::Serialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Accent colors handed out to participants.
const PARTICIPANT_COLORS: [&str; 8] = [
    "#e03131", "#2f9e44", "#1971c2", "#f08c00", "#9c36b5", "#0c8599", "#e8590c", "#6741d9",
];

/// Default minimum gap between canvas broadcasts.
pub const DEFAULT_BROADCAST_THROTTLE: Duration = Duration::from_millis(100);

fn color_for(id: Uuid) -> &'static str {
    let sum: usize = id.as_bytes().iter().map(|b| *b as usize).sum();
    PARTICIPANT_COLORS[sum % PARTICIPANT_COLORS.len()]
}

#[derive(Debug, Clone)]
struct ActiveSession {
    code: SessionCode,
    participants: Vec<Participant>,
    chat_log: Vec<ChatMessage>,
}

pub struct CollaborationManager {
    local: Participant,
    session: Option<ActiveSession>,
    outgoing: Vec<ChannelCommand>,
    throttle: Duration,
    last_canvas_broadcast: Option<Instant>,
    /// Latest snapshot held back by the throttle.
    pending_canvas: Option<SceneSnapshot>,
}

impl CollaborationManager {
    pub fn new(display_name: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            local: Participant {
                id,
                name: display_name.into(),
                color: color_for(id).to_string(),
                last_seen: Utc::now(),
            },
            session: None,
            outgoing: Vec::new(),
            throttle: DEFAULT_BROADCAST_THROTTLE,
            last_canvas_broadcast: None,
            pending_canvas: None,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn local_participant(&self) -> &Participant {
        &self.local
    }

    pub fn local_id(&self) -> Uuid {
        self.local.id
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.local.name = name.into();
        self.announce_presence();
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_code(&self) -> Option<&SessionCode> {
        self.session.as_ref().map(|s| &s.code)
    }

    pub fn participants(&self) -> &[Participant] {
        self.session
            .as_ref()
            .map_or(&[][..], |s| s.participants.as_slice())
    }

    pub fn chat_log(&self) -> &[ChatMessage] {
        self.session
            .as_ref()
            .map_or(&[][..], |s| s.chat_log.as_slice())
    }

    // --- Session lifecycle ---

    /// Open a session under a fresh code.
    pub fn start_session(&mut self) -> SessionCode {
        let code = SessionCode::generate();
        self.enter(code.clone());
        log::info!("Started collaboration session {}", code);
        code
    }

    /// Join an existing session. The code is validated before anything
    /// changes.
    pub fn join_session(&mut self, code: &str) -> SyncResult<SessionCode> {
        let code = SessionCode::parse(code)?;
        self.enter(code.clone());
        log::info!("Joined collaboration session {}", code);
        Ok(code)
    }

    fn enter(&mut self, code: SessionCode) {
        self.end_session();
        for feed in Feed::ALL {
            self.outgoing.push(ChannelCommand::Subscribe {
                topic: code.topic(feed),
            });
        }
        self.session = Some(ActiveSession {
            code,
            participants: vec![self.local.clone()],
            chat_log: Vec::new(),
        });
        self.announce_presence();
    }

    /// Release all feeds and forget session state. Safe to call repeatedly.
    pub fn end_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.outgoing.push(ChannelCommand::Untrack {
            topic: session.code.topic(Feed::Presence),
        });
        for feed in Feed::ALL {
            self.outgoing.push(ChannelCommand::Unsubscribe {
                topic: session.code.topic(feed),
            });
        }
        self.last_canvas_broadcast = None;
        self.pending_canvas = None;
        log::info!("Left collaboration session {}", session.code);
    }

    /// Re-announce presence with a fresh `last_seen`.
    pub fn announce_presence(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        self.local.last_seen = Utc::now();
        self.outgoing.push(ChannelCommand::Track {
            topic: session.code.topic(Feed::Presence),
            presence: self.local.clone(),
        });
    }

    // --- Outgoing ---

    /// Broadcast the active page, at most once per throttle window.
    ///
    /// A snapshot that arrives inside the window is held and sent by a
    /// later [`CollaborationManager::flush`], replacing any older held one.
    /// Returns whether a message was queued now.
    pub fn broadcast_canvas(&mut self, snapshot: SceneSnapshot, now: Instant) -> bool {
        if self.session.is_none() {
            return false;
        }
        if self.throttle_open(now) {
            self.publish_canvas(snapshot, now)
        } else {
            log::debug!("Canvas broadcast throttled");
            self.pending_canvas = Some(snapshot);
            false
        }
    }

    /// Send the held snapshot once the throttle window has passed.
    pub fn flush(&mut self, now: Instant) -> bool {
        if self.pending_canvas.is_none() || !self.throttle_open(now) {
            return false;
        }
        match self.pending_canvas.take() {
            Some(snapshot) => self.publish_canvas(snapshot, now),
            None => false,
        }
    }

    /// Drop a held snapshot without sending it. Used when a remote canvas
    /// supersedes local state.
    pub fn discard_pending(&mut self) -> bool {
        let discarded = self.pending_canvas.take().is_some();
        if discarded {
            log::debug!("Discarded held canvas broadcast");
        }
        discarded
    }

    pub fn has_pending_canvas(&self) -> bool {
        self.pending_canvas.is_some()
    }

    fn throttle_open(&self, now: Instant) -> bool {
        self.last_canvas_broadcast
            .is_none_or(|last| now.saturating_duration_since(last) >= self.throttle)
    }

    fn publish_canvas(&mut self, snapshot: SceneSnapshot, now: Instant) -> bool {
        let message = CanvasMessage {
            sender_id: self.local.id,
            scene_snapshot: snapshot,
        };
        if self.publish(Feed::Canvas, &message) {
            self.last_canvas_broadcast = Some(now);
            self.pending_canvas = None;
            true
        } else {
            false
        }
    }

    /// Post a chat message. It lands in the local log immediately.
    pub fn send_chat(&mut self, text: &str) -> SyncResult<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SyncError::EmptyMessage);
        }
        let code = self.session.as_ref().ok_or(SyncError::NoSession)?.code.clone();
        let message = ChatMessage {
            id: Uuid::new_v4(),
            session_code: code,
            user: self.local.name.clone(),
            message: text.to_string(),
            timestamp: Utc::now(),
            color: self.local.color.clone(),
            sender_id: Some(self.local.id),
        };
        if let Some(session) = &mut self.session {
            session.chat_log.push(message.clone());
        }
        self.publish(Feed::Chat, &message);
        Ok(message)
    }

    fn publish<T: Serialize>(&mut self, feed: Feed, message: &T) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        match serde_json::to_string(message) {
            Ok(payload) => {
                self.outgoing.push(ChannelCommand::Publish {
                    topic: session.code.topic(feed),
                    payload,
                });
                true
            }
            Err(e) => {
                log::warn!("Failed to encode {} message: {}", feed, e);
                false
            }
        }
    }

    /// Drain queued transport commands.
    pub fn take_outgoing(&mut self) -> Vec<ChannelCommand> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    // --- Incoming ---

    /// Interpret a payload delivered on `topic`.
    ///
    /// Malformed payloads and traffic for other sessions are logged and
    /// dropped; they never disturb local state.
    pub fn handle_message(&mut self, topic: &str, payload: &str) -> Option<SyncEvent> {
        match self.decode(topic, payload) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Ignoring collaboration message on {}: {}", topic, e);
                None
            }
        }
    }

    fn decode(&mut self, topic: &str, payload: &str) -> SyncResult<Option<SyncEvent>> {
        let (code, feed) = Feed::from_topic(topic)?;
        let local_id = self.local.id;
        let session = self.session.as_mut().ok_or(SyncError::NoSession)?;
        if session.code != code {
            return Err(SyncError::UnknownTopic(topic.to_string()));
        }
        let malformed = |source| SyncError::Malformed { feed, source };

        match feed {
            Feed::Canvas => {
                let message: CanvasMessage = serde_json::from_str(payload).map_err(malformed)?;
                if message.sender_id == local_id {
                    return Ok(None);
                }
                Ok(Some(SyncEvent::CanvasReplaced {
                    from: message.sender_id,
                    snapshot: message.scene_snapshot,
                }))
            }
            Feed::Chat => {
                let message: ChatMessage = serde_json::from_str(payload).map_err(malformed)?;
                let duplicate = message.sender_id == Some(local_id)
                    || session.chat_log.iter().any(|m| m.id == message.id);
                if duplicate {
                    return Ok(None);
                }
                session.chat_log.push(message.clone());
                Ok(Some(SyncEvent::ChatReceived(message)))
            }
            Feed::Presence => {
                let state: PresenceState = serde_json::from_str(payload).map_err(malformed)?;
                session.participants = state.participants.clone();
                Ok(Some(SyncEvent::PresenceChanged(state.participants)))
            }
        }
    }
}

impl Default for CollaborationManager {
    fn default() -> Self {
        Self::new("Guest")
    }
}
