//! Core traits for scribe abstractions.
//!
//! These traits define the interfaces that storage and media backends
//! must satisfy. Business logic depends only on these, never on sqlx or on
//! a particular upload service.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// USER REPOSITORY TRAITS
// =============================================================================

/// Request for creating a new user.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub profile_picture_url: String,
    pub password_hash: String,
}

/// Repository for user credentials and profiles.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// Fails with `Error::Conflict` if the email is already registered.
    async fn create(&self, req: CreateUserRequest) -> Result<User>;

    /// Fetch a user by ID.
    async fn get(&self, id: Uuid) -> Result<Option<User>>;

    /// Fetch a user by (normalized) email.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Check if an email is already registered.
    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Return the subset of `ids` that belong to existing users.
    async fn existing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>>;
}

// =============================================================================
// SESSION REPOSITORY TRAITS
// =============================================================================

/// Repository for server-side session records.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a session row for the user.
    async fn create(&self, user_id: Uuid) -> Result<Session>;

    /// Check that session `id` exists and belongs to `user_id`.
    async fn exists(&self, id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Delete every session of the user. Returns the number removed.
    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64>;
}

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Request for creating a new note.
#[derive(Debug, Clone)]
pub struct CreateNoteRequest {
    pub owner_id: Uuid,
    pub title: String,
    pub body: String,
    pub files: Vec<String>,
    /// Already resolved to existing users, without the owner.
    pub collaborators: Vec<Uuid>,
}

/// Whole-field overwrite of a note's content.
#[derive(Debug, Clone)]
pub struct UpdateNoteContentRequest {
    pub title: String,
    pub body: String,
    pub files: Vec<String>,
}

/// Repository for notes and their collaborator sets.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a note together with its collaborator rows.
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note>;

    /// Fetch a note by ID.
    async fn fetch(&self, id: Uuid) -> Result<Option<Note>>;

    /// All notes owned by the user or shared with them, without duplicates,
    /// most recently updated first.
    async fn list_visible_to(&self, user_id: Uuid) -> Result<Vec<Note>>;

    /// Overwrite title, body and attachment list.
    ///
    /// Fails with `Error::NotFound` if the note no longer exists.
    async fn update_content(&self, id: Uuid, req: UpdateNoteContentRequest) -> Result<Note>;

    /// Permanently delete a note. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Add a collaborator row. Returns false if it was already present.
    async fn add_collaborator(&self, note_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Remove a collaborator row. Returns false if it was not present.
    async fn remove_collaborator(&self, note_id: Uuid, user_id: Uuid) -> Result<bool>;
}

// =============================================================================
// MEDIA STORE TRAITS
// =============================================================================

/// Object storage for uploaded media.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store the file and return its externally reachable secure URL.
    async fn upload(&self, file: &UploadedFile) -> Result<String>;

    /// Remove a previously uploaded object.
    ///
    /// Unknown URLs are not an error.
    async fn discard(&self, url: &str) -> Result<()>;
}
