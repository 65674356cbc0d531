//! Note handlers.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde_json::json;

use scribe_core::validation::{
    validate_collaborator, validate_note_id, validate_update_note, CollaboratorForm,
};
use scribe_core::{Note, ValidationErrors};
use uuid::Uuid;

use super::form::FormParts;
use crate::auth::RequireUser;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::AppState;

/// `POST /notes/` (multipart: title, note, files[], collaborators[]).
pub async fn create_note(
    State(state): State<AppState>,
    auth: RequireUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<Note>, ApiError> {
    let form = FormParts::read(multipart?).await?.into_create_note_form();
    let note = state.notes.create(auth.user_id, form).await?;
    Ok(ApiResponse::ok("Note has been created successfully.", note))
}

/// `GET /notes/getnotes/`
pub async fn list_notes(
    State(state): State<AppState>,
    auth: RequireUser,
) -> Result<ApiResponse<Vec<Note>>, ApiError> {
    let notes = state.notes.list(auth.user_id).await?;
    Ok(ApiResponse::ok("Notes have been fetched.", notes))
}

/// `PUT /notes/{id}/` (multipart: title, note, files_urls[], files[]).
pub async fn update_note(
    State(state): State<AppState>,
    auth: RequireUser,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<Note>, ApiError> {
    let note_id = validate_note_id(&id);
    let form = match multipart {
        Ok(multipart) => FormParts::read(multipart)
            .await
            .map(FormParts::into_update_note_form),
        Err(rejection) => Err(rejection.into()),
    };
    let (note_id, form) = match (note_id, form) {
        (Ok(note_id), Ok(form)) => (note_id, form),
        (Ok(_), Err(err)) => return Err(err),
        (Err(path), body) => {
            let body = body.and_then(|form| {
                validate_update_note(form)
                    .map(drop)
                    .map_err(ApiError::from)
            });
            return Err(with_body_errors(path, body));
        }
    };
    let note = state.notes.update(auth.user_id, note_id, form).await?;
    Ok(ApiResponse::ok("Note has been updated.", note))
}

/// `DELETE /notes/{id}/`
pub async fn delete_note(
    State(state): State<AppState>,
    auth: RequireUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let note_id = validate_note_id(&id)?;
    state.notes.delete(auth.user_id, note_id).await?;
    Ok(ApiResponse::ok("Note has been deleted.", json!({ "id": note_id })))
}

/// `POST /notes/collaborators/{id}/` (JSON: collaborator_id).
pub async fn add_collaborator(
    State(state): State<AppState>,
    auth: RequireUser,
    Path(id): Path<String>,
    body: Result<Json<CollaboratorForm>, JsonRejection>,
) -> Result<ApiResponse<Note>, ApiError> {
    let (note_id, form) = collaborator_request(&id, body)?;
    let note = state
        .notes
        .add_collaborator(auth.user_id, note_id, form)
        .await?;
    Ok(ApiResponse::ok("This user has been added as a collaborator.", note))
}

/// `DELETE /notes/collaborators/{id}/` (JSON: collaborator_id).
pub async fn remove_collaborator(
    State(state): State<AppState>,
    auth: RequireUser,
    Path(id): Path<String>,
    body: Result<Json<CollaboratorForm>, JsonRejection>,
) -> Result<ApiResponse<Note>, ApiError> {
    let (note_id, form) = collaborator_request(&id, body)?;
    let note = state
        .notes
        .remove_collaborator(auth.user_id, note_id, form)
        .await?;
    Ok(ApiResponse::ok(
        "This user has been removed as a collaborator.",
        note,
    ))
}

/// Path id and JSON body; a bad id is reported together with any body violations.
fn collaborator_request(
    id: &str,
    body: Result<Json<CollaboratorForm>, JsonRejection>,
) -> Result<(Uuid, CollaboratorForm), ApiError> {
    match (validate_note_id(id), body) {
        (Ok(note_id), Ok(Json(form))) => Ok((note_id, form)),
        (Ok(_), Err(rejection)) => Err(rejection.into()),
        (Err(path), body) => {
            let body = body
                .map_err(ApiError::from)
                .and_then(|Json(form)| {
                    validate_collaborator(form)
                        .map(drop)
                        .map_err(ApiError::from)
                });
            Err(with_body_errors(path, body))
        }
    }
}

fn with_body_errors(mut path: ValidationErrors, body: Result<(), ApiError>) -> ApiError {
    if let Err(ApiError::Validation(more)) = body {
        path.absorb(more);
    }
    ApiError::Validation(path)
}
