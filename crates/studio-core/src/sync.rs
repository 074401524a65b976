//! Wire protocol for collaboration sessions.
//!
//! A session is a namespace of three pub/sub feeds (presence, chat and
//! canvas) keyed by a short shareable code. The transport is external; this
//! module only defines what travels over it, plus [`LocalHub`], an
//! in-process broker with the same delivery rules.

use crate::scene::SceneSnapshot;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

const CODE_LEN: usize = 6;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TOPIC_PREFIX: &str = "studio";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid session code: {0:?}")]
    InvalidCode(String),
    #[error("not in a session")]
    NoSession,
    #[error("empty chat message")]
    EmptyMessage,
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
    #[error("malformed {feed} message: {source}")]
    Malformed {
        feed: Feed,
        #[source]
        source: serde_json::Error,
    },
    #[error("client is not subscribed to {0}")]
    NotSubscribed(String),
    #[error("unknown client")]
    UnknownClient,
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Six uppercase alphanumeric characters.
///
/// Codes are generated client-side; collisions are not detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionCode(String);

impl SessionCode {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..CODE_LEN)
            .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
            .collect();
        Self(code)
    }

    /// Accepts user input in any case, ignoring surrounding whitespace.
    pub fn parse(input: &str) -> SyncResult<Self> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == CODE_LEN && code.bytes().all(|b| CODE_CHARSET.contains(&b));
        if valid {
            Ok(Self(code))
        } else {
            Err(SyncError::InvalidCode(input.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn topic(&self, feed: Feed) -> String {
        format!("{}:{}:{}", TOPIC_PREFIX, self.0, feed)
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionCode {
    type Error = SyncError;

    fn try_from(value: String) -> SyncResult<Self> {
        Self::parse(&value)
    }
}

impl From<SessionCode> for String {
    fn from(code: SessionCode) -> Self {
        code.0
    }
}

/// The three logical channels of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Presence,
    Chat,
    Canvas,
}

impl Feed {
    pub const ALL: [Feed; 3] = [Feed::Presence, Feed::Chat, Feed::Canvas];

    fn name(self) -> &'static str {
        match self {
            Feed::Presence => "presence",
            Feed::Chat => "chat",
            Feed::Canvas => "canvas",
        }
    }

    /// Split a topic into its session code and feed.
    pub fn from_topic(topic: &str) -> SyncResult<(SessionCode, Feed)> {
        let unknown = || SyncError::UnknownTopic(topic.to_string());
        let mut parts = topic.splitn(3, ':');
        if parts.next() != Some(TOPIC_PREFIX) {
            return Err(unknown());
        }
        let code = parts
            .next()
            .and_then(|c| SessionCode::parse(c).ok())
            .ok_or_else(unknown)?;
        let feed = match parts.next() {
            Some("presence") => Feed::Presence,
            Some("chat") => Feed::Chat,
            Some("canvas") => Feed::Canvas,
            _ => return Err(unknown()),
        };
        Ok((code, feed))
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A participant's announced identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    /// `#rrggbb` accent color.
    pub color: String,
    pub last_seen: DateTime<Utc>,
}

/// Full participant list, as delivered on every presence change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceState {
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_code: SessionCode,
    /// Display name of the author.
    pub user: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub color: String,
    /// Author id, used to drop echoes of our own messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Uuid>,
}

/// Entire scene of the sender's active page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasMessage {
    pub sender_id: Uuid,
    pub scene_snapshot: SceneSnapshot,
}

/// Requests a client hands to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelCommand {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    /// Deliver `payload` (JSON) to every other subscriber of `topic`.
    Publish { topic: String, payload: String },
    /// Register presence; the transport answers every subscriber with the
    /// full [`PresenceState`].
    Track { topic: String, presence: Participant },
    Untrack { topic: String },
}

/// What an incoming message means for the local editor.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Replace the active page's scene wholesale.
    CanvasReplaced { from: Uuid, snapshot: SceneSnapshot },
    ChatReceived(ChatMessage),
    PresenceChanged(Vec<Participant>),
}

/// Handle for a client connected to a [`LocalHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

#[derive(Debug, Default)]
struct HubClient {
    subscriptions: HashSet<String>,
    inbox: VecDeque<(String, String)>,
}

/// In-process broker with the delivery rules of the hosted channel service.
///
/// Publishes go to every subscriber except the sender. Presence changes
/// fan out the full state to every subscriber, sender included.
#[derive(Debug, Default)]
pub struct LocalHub {
    next_id: u64,
    clients: HashMap<ClientId, HubClient>,
    presence: HashMap<String, BTreeMap<ClientId, Participant>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self) -> ClientId {
        self.next_id += 1;
        let id = ClientId(self.next_id);
        self.clients.insert(id, HubClient::default());
        id
    }

    /// Drop a client, releasing its presence everywhere.
    pub fn disconnect(&mut self, client: ClientId) {
        let tracked: Vec<String> = self
            .presence
            .iter()
            .filter(|(_, members)| members.contains_key(&client))
            .map(|(topic, _)| topic.clone())
            .collect();
        for topic in tracked {
            self.untrack(client, &topic);
        }
        self.clients.remove(&client);
    }

    pub fn execute(&mut self, client: ClientId, command: ChannelCommand) -> SyncResult<()> {
        let state = self.clients.get_mut(&client).ok_or(SyncError::UnknownClient)?;
        match command {
            ChannelCommand::Subscribe { topic } => {
                state.subscriptions.insert(topic);
            }
            ChannelCommand::Unsubscribe { topic } => {
                state.subscriptions.remove(&topic);
            }
            ChannelCommand::Publish { topic, payload } => {
                if !state.subscriptions.contains(&topic) {
                    return Err(SyncError::NotSubscribed(topic));
                }
                for (id, other) in self.clients.iter_mut() {
                    if *id != client && other.subscriptions.contains(&topic) {
                        other.inbox.push_back((topic.clone(), payload.clone()));
                    }
                }
            }
            ChannelCommand::Track { topic, presence } => {
                if !state.subscriptions.contains(&topic) {
                    return Err(SyncError::NotSubscribed(topic));
                }
                self.presence
                    .entry(topic.clone())
                    .or_default()
                    .insert(client, presence);
                self.broadcast_presence(&topic);
            }
            ChannelCommand::Untrack { topic } => self.untrack(client, &topic),
        }
        Ok(())
    }

    /// Run a batch, logging and skipping commands that fail.
    pub fn execute_all(&mut self, client: ClientId, commands: Vec<ChannelCommand>) {
        for command in commands {
            if let Err(e) = self.execute(client, command) {
                log::warn!("Dropped channel command: {}", e);
            }
        }
    }

    /// Take everything delivered to `client` so far, oldest first.
    pub fn drain(&mut self, client: ClientId) -> Vec<(String, String)> {
        self.clients
            .get_mut(&client)
            .map(|c| c.inbox.drain(..).collect())
            .unwrap_or_default()
    }

    fn untrack(&mut self, client: ClientId, topic: &str) {
        let removed = self
            .presence
            .get_mut(topic)
            .is_some_and(|members| members.remove(&client).is_some());
        if removed {
            self.broadcast_presence(topic);
        }
    }

    fn broadcast_presence(&mut self, topic: &str) {
        let state = PresenceState {
            participants: self
                .presence
                .get(topic)
                .map(|members| members.values().cloned().collect())
                .unwrap_or_default(),
        };
        let payload = match serde_json::to_string(&state) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Failed to encode presence state: {}", e);
                return;
            }
        };
        for other in self.clients.values_mut() {
            if other.subscriptions.contains(topic) {
                other.inbox.push_back((topic.to_string(), payload.clone()));
            }
        }
    }
}
