use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved id of the hangman bot. Special users live above the range
/// handed out by the user id counter.
pub const HANGMAN_BOT_ID: u64 = 100_000;
pub const DELETED_USER_ID: u64 = 100_001;

/// Permission id of an ordinary workspace member.
pub const PERMISSION_MEMBER: u8 = 2;

/// Name of a record collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    User,
    Channel,
    Message,
    PendingMessage,
    ValidToken,
    ResetCode,
    SpecialUser,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::User,
        Kind::Channel,
        Kind::Message,
        Kind::PendingMessage,
        Kind::ValidToken,
        Kind::ResetCode,
        Kind::SpecialUser,
    ];

    /// The counter this kind draws ids from. A pending message keeps its id
    /// when it is committed, so both message kinds share one counter.
    pub fn id_space(self) -> Kind {
        match self {
            Kind::PendingMessage => Kind::Message,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::User => "user",
            Kind::Channel => "channel",
            Kind::Message => "message",
            Kind::PendingMessage => "pending-message",
            Kind::ValidToken => "valid-token",
            Kind::ResetCode => "reset-code",
            Kind::SpecialUser => "special-user",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub email: String,
    pub name_first: String,
    pub name_last: String,
    pub handle: String,
    pub password_hash: String,
    pub permission_id: u8,
    pub profile_img_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: u64,
    pub name: String,
    pub is_public: bool,
    pub owners: Vec<u64>,
    pub members: Vec<u64>,
    /// Committed message ids in send order.
    pub messages: Vec<u64>,
    /// Close time of the active standup; `None` when no standup is running.
    pub standup_time: Option<DateTime<Utc>>,
    pub standup_creator: Option<u64>,
    pub standup_buffer: String,
}

impl ChannelRecord {
    pub fn new(id: u64, name: impl Into<String>, is_public: bool, creator: u64) -> Self {
        Self {
            id,
            name: name.into(),
            is_public,
            owners: vec![creator],
            members: vec![creator],
            messages: Vec::new(),
            standup_time: None,
            standup_creator: None,
            standup_buffer: String::new(),
        }
    }

    pub fn has_standup(&self) -> bool {
        self.standup_time.is_some()
    }

    /// Reset the standup fields to the inactive state.
    pub fn clear_standup(&mut self) {
        self.standup_time = None;
        self.standup_creator = None;
        self.standup_buffer.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct React {
    pub react_id: u32,
    pub user_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: u64,
    pub sender_id: u64,
    pub channel_id: u64,
    pub contents: String,
    /// Send time. For a pending message this is also its fire time.
    pub time_created: DateTime<Utc>,
    pub is_pinned: bool,
    pub reacts: Vec<React>,
}

impl MessageRecord {
    pub fn new(
        id: u64,
        sender_id: u64,
        channel_id: u64,
        contents: impl Into<String>,
        time_created: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sender_id,
            channel_id,
            contents: contents.into(),
            time_created,
            is_pinned: false,
            reacts: Vec::new(),
        }
    }
}

/// A live session. Only the SHA-256 of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: u64,
    pub user_id: u64,
    pub token_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetCodeRecord {
    pub id: u64,
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialUserRecord {
    pub id: u64,
    pub handle: String,
    pub name_first: String,
    pub name_last: String,
}

/// One entry of a collection, tagged with the kind it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum Record {
    User(UserRecord),
    Channel(ChannelRecord),
    Message(MessageRecord),
    PendingMessage(MessageRecord),
    ValidToken(TokenRecord),
    ResetCode(ResetCodeRecord),
    SpecialUser(SpecialUserRecord),
}

impl Record {
    pub fn kind(&self) -> Kind {
        match self {
            Self::User(_) => Kind::User,
            Self::Channel(_) => Kind::Channel,
            Self::Message(_) => Kind::Message,
            Self::PendingMessage(_) => Kind::PendingMessage,
            Self::ValidToken(_) => Kind::ValidToken,
            Self::ResetCode(_) => Kind::ResetCode,
            Self::SpecialUser(_) => Kind::SpecialUser,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Self::User(r) => r.id,
            Self::Channel(r) => r.id,
            Self::Message(r) | Self::PendingMessage(r) => r.id,
            Self::ValidToken(r) => r.id,
            Self::ResetCode(r) => r.id,
            Self::SpecialUser(r) => r.id,
        }
    }

    pub fn as_user(&self) -> Option<&UserRecord> {
        match self {
            Self::User(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&ChannelRecord> {
        match self {
            Self::Channel(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_channel_mut(&mut self) -> Option<&mut ChannelRecord> {
        match self {
            Self::Channel(r) => Some(r),
            _ => None,
        }
    }

    /// The message payload of either a committed or a pending message.
    pub fn as_message(&self) -> Option<&MessageRecord> {
        match self {
            Self::Message(r) | Self::PendingMessage(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&TokenRecord> {
        match self {
            Self::ValidToken(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_reset_code(&self) -> Option<&ResetCodeRecord> {
        match self {
            Self::ResetCode(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_channel(self) -> Option<ChannelRecord> {
        match self {
            Self::Channel(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_message(self) -> Option<MessageRecord> {
        match self {
            Self::Message(r) | Self::PendingMessage(r) => Some(r),
            _ => None,
        }
    }
}
