//! Request validation layer.
//!
//! One pure function per inbound request shape. Each takes the loosely typed
//! form as decoded from the wire and returns either a validated value or the
//! complete list of field violations. Nothing here performs I/O, so a request
//! that fails validation never reaches storage or the upload service.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::defaults::{
    ATTACHMENT_CONTENT_TYPES, ATTACHMENT_MAX_BYTES, EMAIL_MAX_LEN, NAME_MAX_LEN,
    PASSWORD_MAX_LEN, PASSWORD_MIN_LEN, PROFILE_IMAGE_CONTENT_TYPES, PROFILE_IMAGE_MAX_BYTES,
    TITLE_MAX_LEN,
};
use crate::models::UploadedFile;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex is valid")
});

// =============================================================================
// VIOLATIONS
// =============================================================================

/// A single violated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every violation found in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldViolation>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldViolation::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    /// Whether any violation concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }

    /// Append every violation from `other`.
    pub fn absorb(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    /// `Ok(value)` when no violation was recorded.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl From<Vec<FieldViolation>> for ValidationErrors {
    fn from(v: Vec<FieldViolation>) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

// =============================================================================
// FIELD RULES
// =============================================================================

fn require_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    max_chars: Option<usize>,
    allow_blank: bool,
) -> String {
    let Some(value) = value else {
        errors.push(field, "Field required.");
        return String::new();
    };
    if !allow_blank && value.trim().is_empty() {
        errors.push(field, "Must not be blank.");
    }
    if let Some(max) = max_chars {
        if value.chars().count() > max {
            errors.push(field, format!("Must be at most {} characters.", max));
        }
    }
    value
}

fn require_email(errors: &mut ValidationErrors, value: Option<String>) -> String {
    let Some(raw) = value else {
        errors.push("email", "Field required.");
        return String::new();
    };
    let email = normalize_email(&raw);
    if email.chars().count() > EMAIL_MAX_LEN {
        errors.push(
            "email",
            format!("Must be at most {} characters.", EMAIL_MAX_LEN),
        );
    } else if !EMAIL_RE.is_match(&email) {
        errors.push("email", "Not a valid email address.");
    }
    email
}

/// Canonical form used for storage and lookup.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Declared MIME type without parameters, or the sniffed type when the
/// client sent none.
fn effective_content_type(file: &UploadedFile) -> String {
    let declared = file
        .content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if declared.is_empty() || declared == "application/octet-stream" {
        if let Some(kind) = infer::get(&file.data) {
            return kind.mime_type().to_string();
        }
    }
    declared
}

fn check_file(
    errors: &mut ValidationErrors,
    field: &str,
    file: &UploadedFile,
    allowed: &[&str],
    max_bytes: usize,
    type_message: &str,
) {
    let content_type = effective_content_type(file);
    if !allowed.contains(&content_type.as_str()) {
        errors.push(field, type_message);
    }
    if file.size() > max_bytes {
        errors.push(
            field,
            format!("File too large (max {}MB).", max_bytes / (1024 * 1024)),
        );
    }
}

fn check_attachments(errors: &mut ValidationErrors, files: &mut [UploadedFile]) {
    for (i, file) in files.iter_mut().enumerate() {
        let field = format!("files[{}]", i);
        check_file(
            errors,
            &field,
            file,
            ATTACHMENT_CONTENT_TYPES,
            ATTACHMENT_MAX_BYTES,
            "Not a valid file type.",
        );
        file.content_type = effective_content_type(file);
    }
}

fn parse_uuid(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(field, "Not a valid UUID.");
            None
        }
    }
}

// =============================================================================
// REGISTRATION & LOGIN
// =============================================================================

/// Registration form as decoded from multipart.
#[derive(Debug, Default)]
pub struct RegisterForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile_picture: Option<UploadedFile>,
}

#[derive(Debug)]
pub struct ValidRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub profile_picture: Option<UploadedFile>,
}

pub fn validate_registration(form: RegisterForm) -> Result<ValidRegistration, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = require_text(&mut errors, "name", form.name, Some(NAME_MAX_LEN), false);
    let email = require_email(&mut errors, form.email);
    let password = require_password(&mut errors, form.password);

    let mut profile_picture = form.profile_picture;
    if let Some(file) = profile_picture.as_mut() {
        check_file(
            &mut errors,
            "profile_picture",
            file,
            PROFILE_IMAGE_CONTENT_TYPES,
            PROFILE_IMAGE_MAX_BYTES,
            "Only JPEG and PNG images are allowed.",
        );
        file.content_type = effective_content_type(file);
    }

    errors.finish(|| ValidRegistration {
        name: name.trim().to_string(),
        email,
        password,
        profile_picture,
    })
}

fn require_password(errors: &mut ValidationErrors, value: Option<String>) -> String {
    let Some(password) = value else {
        errors.push("password", "Field required.");
        return String::new();
    };
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        errors.push(
            "password",
            format!("Must be at least {} characters.", PASSWORD_MIN_LEN),
        );
    } else if len > PASSWORD_MAX_LEN {
        errors.push(
            "password",
            format!("Must be at most {} characters.", PASSWORD_MAX_LEN),
        );
    }
    password
}

/// Login body.
#[derive(Debug, Default, serde::Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct ValidLogin {
    pub email: String,
    pub password: String,
}

/// Login only checks presence and email shape; password rules are not
/// disclosed at login time.
pub fn validate_login(form: LoginForm) -> Result<ValidLogin, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let email = require_email(&mut errors, form.email);
    let password = require_text(&mut errors, "password", form.password, None, false);
    errors.finish(|| ValidLogin { email, password })
}

/// Lookup-by-email query.
#[derive(Debug, Default, serde::Deserialize)]
pub struct EmailLookupForm {
    pub email: Option<String>,
}

pub fn validate_email_lookup(form: EmailLookupForm) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let email = require_email(&mut errors, form.email);
    errors.finish(|| email)
}

// =============================================================================
// NOTES
// =============================================================================

/// Note creation form as decoded from multipart.
#[derive(Debug, Default)]
pub struct CreateNoteForm {
    pub title: Option<String>,
    pub note: Option<String>,
    pub files: Vec<UploadedFile>,
    pub collaborators: Vec<String>,
}

#[derive(Debug)]
pub struct ValidCreateNote {
    pub title: String,
    pub body: String,
    pub files: Vec<UploadedFile>,
    /// Parsed and de-duplicated, in submission order.
    pub collaborators: Vec<Uuid>,
}

pub fn validate_create_note(form: CreateNoteForm) -> Result<ValidCreateNote, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = require_text(&mut errors, "title", form.title, Some(TITLE_MAX_LEN), false);
    let body = require_text(&mut errors, "note", form.note, None, true);

    let mut files = form.files;
    check_attachments(&mut errors, &mut files);

    let mut collaborators: Vec<Uuid> = Vec::new();
    for (i, raw) in form.collaborators.iter().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        if let Some(id) = parse_uuid(&mut errors, &format!("collaborators[{}]", i), raw) {
            if !collaborators.contains(&id) {
                collaborators.push(id);
            }
        }
    }

    errors.finish(|| ValidCreateNote {
        title,
        body,
        files,
        collaborators,
    })
}

/// Note update form as decoded from multipart.
#[derive(Debug, Default)]
pub struct UpdateNoteForm {
    pub title: Option<String>,
    pub note: Option<String>,
    /// `None` when the field was absent from the request.
    pub files_urls: Option<Vec<String>>,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug)]
pub struct ValidUpdateNote {
    pub title: String,
    pub body: String,
    /// Retained attachment URLs; `None` keeps every current attachment.
    pub retained: Option<Vec<String>>,
    pub files: Vec<UploadedFile>,
}

pub fn validate_update_note(form: UpdateNoteForm) -> Result<ValidUpdateNote, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = require_text(&mut errors, "title", form.title, Some(TITLE_MAX_LEN), false);
    let body = require_text(&mut errors, "note", form.note, None, true);

    let mut files = form.files;
    check_attachments(&mut errors, &mut files);

    // An empty value is how a client says "keep none".
    let retained = form.files_urls.map(|urls| {
        urls.into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect::<Vec<_>>()
    });

    errors.finish(|| ValidUpdateNote {
        title,
        body,
        retained,
        files,
    })
}

/// Collaborator add/remove body.
#[derive(Debug, Default, serde::Deserialize)]
pub struct CollaboratorForm {
    pub collaborator_id: Option<String>,
}

pub fn validate_collaborator(form: CollaboratorForm) -> Result<Uuid, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let id = match form.collaborator_id {
        Some(raw) => parse_uuid(&mut errors, "collaborator_id", &raw),
        None => {
            errors.push("collaborator_id", "Field required.");
            None
        }
    };
    match id {
        Some(id) if errors.is_empty() => Ok(id),
        _ => Err(errors),
    }
}

/// Path segment naming a note.
pub fn validate_note_id(raw: &str) -> Result<Uuid, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    match parse_uuid(&mut errors, "note_id", raw) {
        Some(id) => Ok(id),
        None => Err(errors),
    }
}
