//! Centralized default constants for the scribe service.
//!
//! Validation limits, media allow-lists and session defaults live here so the
//! validation layer, the HTTP layer and the storage layer agree on them.

// =============================================================================
// USERS
// =============================================================================

/// Maximum characters in a user's display name.
pub const NAME_MAX_LEN: usize = 50;

/// Maximum characters in an email address (RFC 5321 path limit).
pub const EMAIL_MAX_LEN: usize = 254;

/// Minimum characters in a password.
pub const PASSWORD_MIN_LEN: usize = 6;

/// Maximum characters in a password (bounds hashing cost).
pub const PASSWORD_MAX_LEN: usize = 128;

/// Profile picture used when a user registers without uploading one.
pub const DEFAULT_PROFILE_PICTURE_URL: &str =
    "https://images.ctfassets.net/h6goo9gw1hh6/2sNZtFAWOdP1lmQ33VwRN3/24e953b920a9cd0ff2e1d587742a2472/1-intro-photo-final.jpg?w=1200&h=992&fl=progressive&q=70&fm=jpg";

/// Maximum profile picture size: 5 MiB.
pub const PROFILE_IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Content types accepted for profile pictures.
pub const PROFILE_IMAGE_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

// =============================================================================
// NOTES
// =============================================================================

/// Maximum characters in a note title.
pub const TITLE_MAX_LEN: usize = 300;

/// Maximum size of a single note attachment: 25 MiB.
pub const ATTACHMENT_MAX_BYTES: usize = 25 * 1024 * 1024;

/// Content types accepted for note attachments (images, video, audio).
pub const ATTACHMENT_CONTENT_TYPES: &[&str] = &[
    // Images
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/bmp",
    "image/svg+xml",
    // Videos
    "video/mp4",
    "video/webm",
    "video/ogg",
    "video/3gpp",
    "video/3gpp2",
    "video/x-msvideo",
    "video/x-matroska",
    "video/quicktime",
    // Audio
    "audio/mpeg",
    "audio/ogg",
    "audio/wav",
    "audio/webm",
    "audio/aac",
    "audio/mp4",
    "audio/3gpp",
    "audio/3gpp2",
    "audio/x-ms-wma",
];

// =============================================================================
// SESSIONS
// =============================================================================

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Default session lifetime in hours (7 days).
pub const SESSION_TTL_HOURS: i64 = 168;

/// Minimum accepted length of the token signing secret, in bytes.
pub const SESSION_SECRET_MIN_LEN: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_types_are_media_only() {
        for ct in ATTACHMENT_CONTENT_TYPES {
            assert!(
                ct.starts_with("image/") || ct.starts_with("video/") || ct.starts_with("audio/"),
                "unexpected attachment type {}",
                ct
            );
        }
    }

    #[test]
    fn test_profile_types_subset_of_attachment_types() {
        for ct in PROFILE_IMAGE_CONTENT_TYPES {
            assert!(ATTACHMENT_CONTENT_TYPES.contains(ct));
        }
    }

    #[test]
    fn test_size_ceilings() {
        assert_eq!(ATTACHMENT_MAX_BYTES, 26_214_400);
        assert_eq!(PROFILE_IMAGE_MAX_BYTES, 5_242_880);
    }
}
