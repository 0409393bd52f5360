use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use memento_core::directory::{SortFields, SortKey};
use memento_core::feed::LikeState;
use memento_core::reactions::ReactionMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

// -- Directory --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    #[default]
    Student,
    Alumni,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub full_name: Option<String>,
    pub student_id: Option<String>,
    pub batch: Option<String>,
    pub standing: Standing,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub hometown: Option<String>,
    pub current_city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub facebook: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub instagram: Option<String>,
}

/// One row of the directory. Every field is optional; a fresh account has
/// an all-empty record until the owner fills in their profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub id: Uuid,
    #[serde(default)]
    pub identity: Identity,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub contact: Contact,
}

impl DirectoryRecord {
    pub fn empty(id: Uuid) -> Self {
        Self {
            id,
            identity: Identity::default(),
            location: Location::default(),
            contact: Contact::default(),
        }
    }
}

impl SortFields for DirectoryRecord {
    fn sort_value(&self, key: SortKey) -> Option<&str> {
        match key {
            SortKey::Name => self.identity.full_name.as_deref(),
            SortKey::StudentId => self.identity.student_id.as_deref(),
            SortKey::Batch => self.identity.batch.as_deref(),
            SortKey::Hometown => self.location.hometown.as_deref(),
            SortKey::Email => self.contact.email.as_deref(),
        }
    }
}

// -- Chat --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub deleted: bool,
    pub edited: bool,
    #[serde(default)]
    pub reactions: ReactionMap,
}

// -- Moments --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
}

impl Moment {
    /// Counter state as seen by a viewer who has not voted this session.
    pub fn like_state(&self) -> LikeState {
        LikeState::new(self.like_count, self.dislike_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub moment_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// -- Notifications --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Comment,
    Reaction,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Reaction => "reaction",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "comment" => Some(Self::Comment),
            "reaction" => Some(Self::Reaction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub text: String,
    /// Message or moment the notification points at.
    pub link_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use memento_core::directory::{SortConfig, project};

    #[test]
    fn partial_records_deserialize() {
        let id = Uuid::new_v4();
        let json = serde_json::json!({
            "id": id,
            "identity": { "full_name": "Ada" },
        });
        let record: DirectoryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.identity.full_name.as_deref(), Some("Ada"));
        assert_eq!(record.identity.standing, Standing::Student);
        assert_eq!(record.location, Location::default());
        assert_eq!(record.sort_value(SortKey::Hometown), None);
    }

    #[test]
    fn directory_sorts_by_nested_fields() {
        let mut bob = DirectoryRecord::empty(Uuid::new_v4());
        bob.identity.full_name = Some("Bob".into());
        let mut alice = DirectoryRecord::empty(Uuid::new_v4());
        alice.identity.full_name = Some("Alice".into());

        let records = vec![bob.clone(), alice.clone()];
        let config = SortConfig::default().request_sort(SortKey::Name);
        assert_eq!(project(&records, config), vec![alice.clone(), bob.clone()]);

        let config = config.request_sort(SortKey::Name);
        assert_eq!(project(&records, config), vec![bob, alice]);
    }
}
