//! Core data models for scribe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// USER TYPES
// =============================================================================

/// A registered user as stored, including the password hash.
///
/// Never serialized to clients; use [`UserProfile`] for that.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_picture_url: String,
    /// PHC-format password hash.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public view of this user.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            profile_picture_url: self.profile_picture_url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Client-facing view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_picture_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SESSION TYPES
// =============================================================================

/// Server-side session record.
///
/// Its existence is what keeps an issued token valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A note with its attachments and collaborator set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    /// Creator; set at creation and never reassigned.
    pub owner_id: Uuid,
    pub title: String,
    /// Free-text body (`note` on the wire).
    #[serde(rename = "note")]
    pub body: String,
    /// Attachment URLs in upload order.
    pub files: Vec<String>,
    /// Users with edit rights; never contains `owner_id`.
    pub collaborators: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Whether `user_id` created this note.
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Whether `user_id` is in the collaborator set.
    pub fn is_collaborator(&self, user_id: Uuid) -> bool {
        self.collaborators.contains(&user_id)
    }

    /// Owner and collaborators may edit.
    pub fn can_edit(&self, user_id: Uuid) -> bool {
        self.is_owner(user_id) || self.is_collaborator(user_id)
    }
}

// =============================================================================
// MEDIA TYPES
// =============================================================================

/// A file received in a multipart request, held in memory until uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Multipart field the file arrived under.
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        field: impl Into<String>,
        file_name: Option<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            field: field.into(),
            file_name,
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}
