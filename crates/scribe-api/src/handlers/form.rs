//! Multipart decoding into the validation layer's form types.
//!
//! Repeated fields may be sent as `name` or `name[]`. A part counts as a
//! file when it carries a filename; empty file parts are dropped, as are
//! text parts sent under a file field.

use std::collections::HashMap;

use axum::extract::Multipart;

use scribe_core::validation::{CreateNoteForm, RegisterForm, UpdateNoteForm};
use scribe_core::UploadedFile;

use crate::error::ApiError;

/// Every part of a multipart body, grouped by field name.
#[derive(Debug, Default)]
pub struct FormParts {
    text: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl FormParts {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut parts = FormParts::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(normalize_name) else {
                continue;
            };

            if let Some(file_name) = field.file_name().map(|s| s.to_string()) {
                let content_type = field.content_type().unwrap_or("").to_string();
                let data = field.bytes().await?;
                if data.is_empty() {
                    continue;
                }
                parts
                    .files
                    .entry(name.clone())
                    .or_default()
                    .push(UploadedFile::new(
                        name,
                        Some(file_name),
                        content_type,
                        data.to_vec(),
                    ));
            } else {
                let value = field.text().await?;
                parts.text.entry(name).or_default().push(value);
            }
        }

        Ok(parts)
    }

    /// First value of a text field.
    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.text
            .remove(name)
            .and_then(|values| values.into_iter().next())
    }

    /// All values of a repeated text field; `None` when the field is absent.
    pub fn take_all(&mut self, name: &str) -> Option<Vec<String>> {
        self.text.remove(name)
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        self.files.remove(name).unwrap_or_default()
    }

    pub fn into_register_form(mut self) -> RegisterForm {
        RegisterForm {
            name: self.take_text("name"),
            email: self.take_text("email"),
            password: self.take_text("password"),
            profile_picture: self.take_files("profile_picture").into_iter().next(),
        }
    }

    pub fn into_create_note_form(mut self) -> CreateNoteForm {
        CreateNoteForm {
            title: self.take_text("title"),
            note: self.take_text("note"),
            files: self.take_files("files"),
            collaborators: self.take_all("collaborators").unwrap_or_default(),
        }
    }

    pub fn into_update_note_form(mut self) -> UpdateNoteForm {
        UpdateNoteForm {
            title: self.take_text("title"),
            note: self.take_text("note"),
            files_urls: self.take_all("files_urls"),
            files: self.take_files("files"),
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.strip_suffix("[]").unwrap_or(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(text: &[(&str, &str)], files: Vec<UploadedFile>) -> FormParts {
        let mut p = FormParts::default();
        for (k, v) in text {
            p.text.entry(k.to_string()).or_default().push(v.to_string());
        }
        for f in files {
            p.files.entry(f.field.clone()).or_default().push(f);
        }
        p
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("files[]"), "files");
        assert_eq!(normalize_name("files"), "files");
    }

    #[test]
    fn test_update_form_distinguishes_absent_urls() {
        let form = parts(&[("title", "T"), ("note", "b")], vec![]).into_update_note_form();
        assert!(form.files_urls.is_none());

        let form = parts(&[("title", "T"), ("files_urls", "")], vec![]).into_update_note_form();
        assert_eq!(form.files_urls, Some(vec![String::new()]));
        assert!(form.note.is_none());
    }

    #[test]
    fn test_create_form_collects_repeated_fields() {
        let files = vec![
            UploadedFile::new("files", Some("a.png".into()), "image/png", vec![1]),
            UploadedFile::new("files", Some("b.png".into()), "image/png", vec![2]),
        ];
        let form = parts(
            &[("title", "T"), ("collaborators", "a"), ("collaborators", "b")],
            files,
        )
        .into_create_note_form();
        assert_eq!(form.files.len(), 2);
        assert_eq!(form.collaborators, vec!["a", "b"]);
    }

    #[test]
    fn test_register_form_takes_first_picture() {
        let files = vec![UploadedFile::new(
            "profile_picture",
            Some("me.jpg".into()),
            "image/jpeg",
            vec![1],
        )];
        let form = parts(&[("name", "Ann")], files).into_register_form();
        assert_eq!(form.name.as_deref(), Some("Ann"));
        assert!(form.profile_picture.is_some());
        assert!(form.email.is_none());
    }
}
