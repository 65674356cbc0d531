//! Note mutation engine.
//!
//! Authorization rules:
//!
//! | Operation | Owner | Collaborator | Other |
//! |-----------|-------|--------------|-------|
//! | list      | yes   | yes          | no    |
//! | update    | yes   | yes          | 403   |
//! | delete    | yes   | 403          | 403   |
//! | add/remove collaborator | yes | 403 | 403 |
//!
//! Writes follow validate → resolve → authorise → upload → persist. Uploads
//! are rolled back if the write fails.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use scribe_core::validation::{
    validate_collaborator, validate_create_note, validate_update_note, CollaboratorForm,
    CreateNoteForm, UpdateNoteForm,
};
use scribe_core::{
    CreateNoteRequest, Error, MediaStore, Note, NoteRepository, Result,
    UpdateNoteContentRequest, UserRepository, ValidationErrors,
};

use super::media::{discard_all, upload_all};

pub const NOTE_NOT_FOUND: &str = "Note not found with this id.";
pub const NO_NOTE_WITH_ID: &str = "No note found with this id.";
pub const NO_USER_WITH_ID: &str = "No user found with this id.";
pub const NOT_AUTHORIZED_UPDATE: &str = "You are not authorized to update this note.";
pub const NOT_AUTHORIZED_DELETE: &str = "You are not authorized to delete this note.";
pub const NOT_AUTHORIZED_COLLABORATORS: &str =
    "You are not authorized to manage collaborators of this note.";
pub const NO_CHANGES: &str = "No changes found to update.";
pub const SELF_AS_COLLABORATOR: &str = "Can not add yourself as a collaborator.";
pub const SELF_CHANGE: &str = "Can not make changes of yourself.";
pub const ALREADY_COLLABORATOR: &str = "This user is already a collaborator.";
pub const NOT_A_COLLABORATOR: &str = "This user is not a collaborator.";

pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaStore>,
}

impl NoteService {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            notes,
            users,
            media,
        }
    }

    /// Create a note owned by `caller`.
    pub async fn create(&self, caller: Uuid, form: CreateNoteForm) -> Result<Note> {
        let start = Instant::now();
        let valid = validate_create_note(form)?;

        if valid.collaborators.contains(&caller) {
            return Err(Error::Conflict(SELF_AS_COLLABORATOR.to_string()));
        }

        if !valid.collaborators.is_empty() {
            let existing = self.users.existing_ids(&valid.collaborators).await?;
            let invalid: Vec<String> = valid
                .collaborators
                .iter()
                .filter(|id| !existing.contains(id))
                .map(|id| id.to_string())
                .collect();
            if !invalid.is_empty() {
                debug!(
                    subsystem = "api",
                    op = "create_note",
                    result_count = invalid.len(),
                    "Unresolved collaborator ids"
                );
                return Err(Error::Conflict(format!(
                    "Invalid collaborator ID(s): {}",
                    invalid.join(", ")
                )));
            }
        }

        let urls = upload_all(&self.media, &valid.files).await?;

        let note = match self
            .notes
            .insert(CreateNoteRequest {
                owner_id: caller,
                title: valid.title,
                body: valid.body,
                files: urls.clone(),
                collaborators: valid.collaborators,
            })
            .await
        {
            Ok(note) => note,
            Err(e) => {
                discard_all(&self.media, &urls).await;
                return Err(e);
            }
        };

        info!(
            subsystem = "api",
            op = "create_note",
            user_id = %caller,
            note_id = %note.id,
            file_count = note.files.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Note created"
        );
        Ok(note)
    }

    /// Every note the caller owns or collaborates on.
    pub async fn list(&self, caller: Uuid) -> Result<Vec<Note>> {
        let notes = self.notes.list_visible_to(caller).await?;
        debug!(
            subsystem = "api",
            op = "list_notes",
            user_id = %caller,
            result_count = notes.len(),
            "Listed notes"
        );
        Ok(notes)
    }

    /// Overwrite title and body, keep the retained attachments and append
    /// new uploads.
    ///
    /// A request that would change nothing and carries no new files is a
    /// conflict.
    pub async fn update(&self, caller: Uuid, note_id: Uuid, form: UpdateNoteForm) -> Result<Note> {
        let start = Instant::now();
        let valid = validate_update_note(form)?;

        let note = self
            .notes
            .fetch(note_id)
            .await?
            .ok_or_else(|| Error::NotFound(NOTE_NOT_FOUND.to_string()))?;

        if !note.can_edit(caller) {
            warn!(
                subsystem = "api",
                op = "update_note",
                user_id = %caller,
                note_id = %note_id,
                "Update refused"
            );
            return Err(Error::Forbidden(NOT_AUTHORIZED_UPDATE.to_string()));
        }

        let retained = match valid.retained {
            None => note.files.clone(),
            Some(urls) => {
                if urls.iter().any(|u| !note.files.contains(u)) {
                    let mut errors = ValidationErrors::new();
                    errors.push("files_urls", "Not an attachment of this note.");
                    return Err(errors.into());
                }
                let mut seen = HashSet::new();
                if !urls.iter().all(|u| seen.insert(u)) {
                    let mut errors = ValidationErrors::new();
                    errors.push("files_urls", "Attachment listed more than once.");
                    return Err(errors.into());
                }
                urls
            }
        };

        if valid.title == note.title
            && valid.body == note.body
            && retained == note.files
            && valid.files.is_empty()
        {
            return Err(Error::Conflict(NO_CHANGES.to_string()));
        }

        let uploaded = upload_all(&self.media, &valid.files).await?;
        let mut files = retained;
        files.extend(uploaded.iter().cloned());

        let updated = match self
            .notes
            .update_content(
                note_id,
                UpdateNoteContentRequest {
                    title: valid.title,
                    body: valid.body,
                    files,
                },
            )
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                discard_all(&self.media, &uploaded).await;
                return Err(e);
            }
        };

        let dropped: Vec<String> = note
            .files
            .into_iter()
            .filter(|u| !updated.files.contains(u))
            .collect();
        discard_all(&self.media, &dropped).await;

        info!(
            subsystem = "api",
            op = "update_note",
            user_id = %caller,
            note_id = %note_id,
            file_count = uploaded.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Note updated"
        );
        Ok(updated)
    }

    /// Permanently delete a note. Owner only.
    pub async fn delete(&self, caller: Uuid, note_id: Uuid) -> Result<()> {
        let note = self
            .notes
            .fetch(note_id)
            .await?
            .ok_or_else(|| Error::NotFound(NOTE_NOT_FOUND.to_string()))?;

        if !note.is_owner(caller) {
            warn!(
                subsystem = "api",
                op = "delete_note",
                user_id = %caller,
                note_id = %note_id,
                "Delete refused"
            );
            return Err(Error::Forbidden(NOT_AUTHORIZED_DELETE.to_string()));
        }

        if !self.notes.delete(note_id).await? {
            return Err(Error::NotFound(NOTE_NOT_FOUND.to_string()));
        }
        discard_all(&self.media, &note.files).await;

        info!(
            subsystem = "api",
            op = "delete_note",
            user_id = %caller,
            note_id = %note_id,
            "Note deleted"
        );
        Ok(())
    }

    pub async fn add_collaborator(
        &self,
        caller: Uuid,
        note_id: Uuid,
        form: CollaboratorForm,
    ) -> Result<Note> {
        let (note, target) = self.collaborator_target(caller, note_id, form).await?;

        if note.is_collaborator(target) || !self.notes.add_collaborator(note_id, target).await? {
            return Err(Error::Conflict(ALREADY_COLLABORATOR.to_string()));
        }

        info!(
            subsystem = "api",
            op = "add_collaborator",
            user_id = %caller,
            note_id = %note_id,
            collaborator_id = %target,
            "Collaborator added"
        );
        self.refetch(note_id).await
    }

    pub async fn remove_collaborator(
        &self,
        caller: Uuid,
        note_id: Uuid,
        form: CollaboratorForm,
    ) -> Result<Note> {
        let (note, target) = self.collaborator_target(caller, note_id, form).await?;

        if !note.is_collaborator(target) || !self.notes.remove_collaborator(note_id, target).await?
        {
            return Err(Error::Conflict(NOT_A_COLLABORATOR.to_string()));
        }

        info!(
            subsystem = "api",
            op = "remove_collaborator",
            user_id = %caller,
            note_id = %note_id,
            collaborator_id = %target,
            "Collaborator removed"
        );
        self.refetch(note_id).await
    }

    /// Shared checks for collaborator mutations: the note exists, the caller
    /// owns it, the target exists and is not the caller.
    async fn collaborator_target(
        &self,
        caller: Uuid,
        note_id: Uuid,
        form: CollaboratorForm,
    ) -> Result<(Note, Uuid)> {
        let target = validate_collaborator(form)?;

        let note = self
            .notes
            .fetch(note_id)
            .await?
            .ok_or_else(|| Error::NotFound(NO_NOTE_WITH_ID.to_string()))?;

        if !note.is_owner(caller) {
            warn!(
                subsystem = "api",
                op = "manage_collaborators",
                user_id = %caller,
                note_id = %note_id,
                "Collaborator change refused"
            );
            return Err(Error::Forbidden(NOT_AUTHORIZED_COLLABORATORS.to_string()));
        }

        if self.users.get(target).await?.is_none() {
            return Err(Error::NotFound(NO_USER_WITH_ID.to_string()));
        }

        if target == caller {
            return Err(Error::Conflict(SELF_CHANGE.to_string()));
        }

        Ok((note, target))
    }

    async fn refetch(&self, note_id: Uuid) -> Result<Note> {
        self.notes
            .fetch(note_id)
            .await?
            .ok_or_else(|| Error::NotFound(NO_NOTE_WITH_ID.to_string()))
    }
}
