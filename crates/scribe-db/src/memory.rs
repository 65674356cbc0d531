//! In-memory repositories and media store.
//!
//! Same contracts as the PostgreSQL repositories, including the duplicate
//! email conflict and the deduplicated visibility listing. Used by service
//! and HTTP tests, and for running the API without a database.
//!
//! ```rust
//! use scribe_db::memory::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let db = store.database();
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use scribe_core::{
    CreateNoteRequest, CreateUserRequest, Error, MediaStore, Note, NoteRepository, Result,
    Session, SessionRepository, UpdateNoteContentRequest, UploadedFile, User, UserRepository,
};

use crate::users::DUPLICATE_EMAIL;

/// Strictly increasing timestamps, so ordering by `updated_at` is total even
/// when two writes land in the same clock tick.
#[derive(Default)]
struct Clock {
    last: std::sync::Mutex<Option<DateTime<Utc>>>,
}

impl Clock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Ok(mut last) = self.last.lock() {
            if let Some(prev) = *last {
                if now <= prev {
                    now = prev + chrono::Duration::microseconds(1);
                }
            }
            *last = Some(now);
        }
        now
    }
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, req: CreateUserRequest) -> Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == req.email) {
            return Err(Error::Conflict(DUPLICATE_EMAIL.into()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            name: req.name,
            email: req.email,
            profile_picture_url: req.profile_picture_url,
            password_hash: req.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.users.read().await.values().any(|u| u.email == email))
    }

    async fn existing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let users = self.users.read().await;
        Ok(ids.iter().copied().filter(|id| users.contains_key(id)).collect())
    }
}

// =============================================================================
// SESSIONS
// =============================================================================

#[derive(Clone, Default)]
pub struct MemorySessionRepository {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live sessions of one user.
    pub async fn count_for_user(&self, user_id: Uuid) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, user_id: Uuid) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::now_v7(),
            user_id,
            created_at: now,
            updated_at: now,
        };
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn exists(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&id)
            .is_some_and(|s| s.user_id == user_id))
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }
}

// =============================================================================
// NOTES
// =============================================================================

#[derive(Clone, Default)]
pub struct MemoryNoteRepository {
    notes: Arc<RwLock<HashMap<Uuid, Note>>>,
    clock: Arc<Clock>,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note> {
        let now = self.clock.now();
        let mut collaborators: Vec<Uuid> = Vec::new();
        for c in req.collaborators {
            if c != req.owner_id && !collaborators.contains(&c) {
                collaborators.push(c);
            }
        }
        let note = Note {
            id: Uuid::now_v7(),
            owner_id: req.owner_id,
            title: req.title,
            body: req.body,
            files: req.files,
            collaborators,
            created_at: now,
            updated_at: now,
        };
        self.notes.write().await.insert(note.id, note.clone());
        Ok(note)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Note>> {
        Ok(self.notes.read().await.get(&id).cloned())
    }

    async fn list_visible_to(&self, user_id: Uuid) -> Result<Vec<Note>> {
        let mut visible: Vec<Note> = self
            .notes
            .read()
            .await
            .values()
            .filter(|n| n.can_edit(user_id))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(visible)
    }

    async fn update_content(&self, id: Uuid, req: UpdateNoteContentRequest) -> Result<Note> {
        let now = self.clock.now();
        let mut notes = self.notes.write().await;
        let note = notes
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Note not found with this id.".into()))?;
        note.title = req.title;
        note.body = req.body;
        note.files = req.files;
        note.updated_at = now;
        Ok(note.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.notes.write().await.remove(&id).is_some())
    }

    async fn add_collaborator(&self, note_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut notes = self.notes.write().await;
        let note = notes
            .get_mut(&note_id)
            .ok_or_else(|| Error::NotFound("Note not found with this id.".into()))?;
        if note.collaborators.contains(&user_id) {
            return Ok(false);
        }
        note.collaborators.push(user_id);
        Ok(true)
    }

    async fn remove_collaborator(&self, note_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut notes = self.notes.write().await;
        let note = notes
            .get_mut(&note_id)
            .ok_or_else(|| Error::NotFound("Note not found with this id.".into()))?;
        let before = note.collaborators.len();
        note.collaborators.retain(|c| *c != user_id);
        Ok(note.collaborators.len() != before)
    }
}

// =============================================================================
// MEDIA
// =============================================================================

/// In-memory media store with optional injected upload failures.
#[derive(Clone, Default)]
pub struct MemoryMediaStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    uploads: Arc<AtomicUsize>,
    /// Uploads numbered at or beyond this (0-based) fail.
    fail_from: Option<usize>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the first `n` uploads succeed and fail every later one.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_from = Some(n);
        self
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.objects.read().await.contains_key(url)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Total upload attempts, failed ones included.
    pub fn upload_attempts(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, file: &UploadedFile) -> Result<String> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_from.is_some_and(|limit| n >= limit) {
            return Err(Error::Storage("injected upload failure".into()));
        }
        let url = format!(
            "https://media.test/{}.{}",
            Uuid::now_v7(),
            crate::media::extension_for(&file.content_type)
        );
        self.objects
            .write()
            .await
            .insert(url.clone(), file.data.clone());
        Ok(url)
    }

    async fn discard(&self, url: &str) -> Result<()> {
        self.objects.write().await.remove(url);
        Ok(())
    }
}

// =============================================================================
// BUNDLE
// =============================================================================

/// Handles to one set of in-memory repositories.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub users: MemoryUserRepository,
    pub sessions: MemorySessionRepository,
    pub notes: MemoryNoteRepository,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object view sharing the same underlying maps.
    pub fn database(&self) -> crate::Repositories {
        crate::Repositories {
            users: Arc::new(self.users.clone()),
            sessions: Arc::new(self.sessions.clone()),
            notes: Arc::new(self.notes.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_req(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "Ann".into(),
            email: email.into(),
            profile_picture_url: "https://img/default.jpg".into(),
            password_hash: "$argon2id$x".into(),
        }
    }

    fn note_req(owner: Uuid, collaborators: Vec<Uuid>) -> CreateNoteRequest {
        CreateNoteRequest {
            owner_id: owner,
            title: "T".into(),
            body: "body".into(),
            files: vec![],
            collaborators,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = MemoryUserRepository::new();
        repo.create(user_req("ann@x.com")).await.unwrap();
        let err = repo.create(user_req("ann@x.com")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn test_existing_ids_filters_unknown() {
        let repo = MemoryUserRepository::new();
        let a = repo.create(user_req("a@x.com")).await.unwrap();
        let ghost = Uuid::new_v4();
        assert_eq!(repo.existing_ids(&[a.id, ghost]).await.unwrap(), vec![a.id]);
    }

    #[tokio::test]
    async fn test_sessions_bound_to_user() {
        let repo = MemorySessionRepository::new();
        let user = Uuid::new_v4();
        let s = repo.create(user).await.unwrap();
        assert!(repo.exists(s.id, user).await.unwrap());
        assert!(!repo.exists(s.id, Uuid::new_v4()).await.unwrap());

        repo.create(user).await.unwrap();
        assert_eq!(repo.delete_for_user(user).await.unwrap(), 2);
        assert!(!repo.exists(s.id, user).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_drops_owner_from_collaborators() {
        let repo = MemoryNoteRepository::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let note = repo
            .insert(note_req(owner, vec![owner, other, other]))
            .await
            .unwrap();
        assert_eq!(note.collaborators, vec![other]);
    }

    #[tokio::test]
    async fn test_list_visible_to_is_union_newest_first() {
        let repo = MemoryNoteRepository::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let own = repo.insert(note_req(a, vec![])).await.unwrap();
        let shared = repo.insert(note_req(b, vec![a])).await.unwrap();
        repo.insert(note_req(b, vec![])).await.unwrap();

        let visible = repo.list_visible_to(a).await.unwrap();
        let ids: Vec<Uuid> = visible.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![shared.id, own.id]);
    }

    #[tokio::test]
    async fn test_collaborator_add_remove_report_change() {
        let repo = MemoryNoteRepository::new();
        let owner = Uuid::new_v4();
        let c = Uuid::new_v4();
        let note = repo.insert(note_req(owner, vec![])).await.unwrap();

        assert!(repo.add_collaborator(note.id, c).await.unwrap());
        assert!(!repo.add_collaborator(note.id, c).await.unwrap());
        assert!(repo.remove_collaborator(note.id, c).await.unwrap());
        assert!(!repo.remove_collaborator(note.id, c).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_note() {
        let repo = MemoryNoteRepository::new();
        let err = repo
            .update_content(
                Uuid::new_v4(),
                UpdateNoteContentRequest {
                    title: "T".into(),
                    body: "b".into(),
                    files: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_media_failure_injection() {
        let store = MemoryMediaStore::new().failing_after(1);
        let f = UploadedFile::new("files", None, "image/png", vec![1]);
        let url = store.upload(&f).await.unwrap();
        assert!(store.contains(&url).await);
        assert!(store.upload(&f).await.is_err());
        assert_eq!(store.upload_attempts(), 2);

        store.discard(&url).await.unwrap();
        assert!(store.is_empty().await);
    }
}
