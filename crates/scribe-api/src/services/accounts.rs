//! Registration, login, lookup and logout.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use scribe_core::defaults::DEFAULT_PROFILE_PICTURE_URL;
use scribe_core::validation::{
    validate_email_lookup, validate_login, validate_registration, EmailLookupForm, LoginForm,
    RegisterForm,
};
use scribe_core::{CreateUserRequest, Error, MediaStore, Result, UserProfile, UserRepository};
use scribe_db::users::DUPLICATE_EMAIL;

use super::media::{discard_all, upload_all};
use crate::session::{IssuedSession, SessionManager};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";
pub const USER_NOT_FOUND_BY_EMAIL: &str = "User not found with this email.";

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaStore>,
    sessions: Arc<SessionManager>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaStore>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            users,
            media,
            sessions,
        }
    }

    /// Create an account. Duplicate emails are rejected before any upload.
    pub async fn register(&self, form: RegisterForm) -> Result<UserProfile> {
        let valid = validate_registration(form)?;

        if self.users.email_exists(&valid.email).await? {
            debug!(subsystem = "api", op = "register", "Email already registered");
            return Err(Error::Conflict(DUPLICATE_EMAIL.to_string()));
        }

        let password = valid.password;
        let password_hash =
            tokio::task::spawn_blocking(move || scribe_crypto::hash_password(&password))
                .await
                .map_err(|e| Error::Internal(format!("hashing task failed: {}", e)))?
                .map_err(|e| Error::Crypto(e.to_string()))?;

        let uploaded = match &valid.profile_picture {
            Some(picture) => upload_all(&self.media, std::slice::from_ref(picture)).await?,
            None => Vec::new(),
        };
        let profile_picture_url = uploaded
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_PROFILE_PICTURE_URL.to_string());

        let user = match self
            .users
            .create(CreateUserRequest {
                name: valid.name,
                email: valid.email,
                profile_picture_url,
                password_hash,
            })
            .await
        {
            Ok(user) => user,
            Err(e) => {
                discard_all(&self.media, &uploaded).await;
                return Err(e);
            }
        };

        info!(
            subsystem = "api",
            op = "register",
            user_id = %user.id,
            "User registered"
        );
        Ok(user.profile())
    }

    /// Check credentials and open a session.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, form: LoginForm) -> Result<(UserProfile, IssuedSession)> {
        let valid = validate_login(form)?;
        let user = self.users.get_by_email(&valid.email).await?;

        let password = valid.password;
        let (user, verified) = match user {
            Some(user) => {
                let hash = user.password_hash.clone();
                let verified = tokio::task::spawn_blocking(move || {
                    scribe_crypto::verify_password(&password, &hash)
                })
                .await
                .map_err(|e| Error::Internal(format!("verify task failed: {}", e)))?
                .map_err(|e| Error::Crypto(e.to_string()))?;
                (Some(user), verified)
            }
            None => {
                tokio::task::spawn_blocking(move || scribe_crypto::dummy_verify(&password))
                    .await
                    .map_err(|e| Error::Internal(format!("verify task failed: {}", e)))?;
                (None, false)
            }
        };

        let user = match user {
            Some(user) if verified => user,
            _ => {
                warn!(subsystem = "api", op = "login", "Login rejected");
                return Err(Error::Unauthenticated(INVALID_CREDENTIALS.to_string()));
            }
        };

        let session = self.sessions.issue(user.id).await?;
        info!(
            subsystem = "api",
            op = "login",
            user_id = %user.id,
            session_id = %session.session_id,
            "User logged in"
        );
        Ok((user.profile(), session))
    }

    pub async fn lookup(&self, form: EmailLookupForm) -> Result<UserProfile> {
        let email = validate_email_lookup(form)?;
        self.users
            .get_by_email(&email)
            .await?
            .map(|u| u.profile())
            .ok_or_else(|| Error::NotFound(USER_NOT_FOUND_BY_EMAIL.to_string()))
    }

    /// Revoke every session of the user.
    pub async fn logout(&self, user_id: Uuid) -> Result<()> {
        self.sessions.revoke(user_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use scribe_core::UploadedFile;
    use scribe_crypto::SigningKey;
    use scribe_db::memory::{MemoryMediaStore, MemoryStore};

    struct Fixture {
        store: MemoryStore,
        media: MemoryMediaStore,
        sessions: Arc<SessionManager>,
        service: AccountService,
    }

    fn fixture_with_media(media: MemoryMediaStore) -> Fixture {
        let store = MemoryStore::new();
        let repos = store.database();
        let sessions = Arc::new(SessionManager::new(
            SigningKey::generate(32),
            repos.sessions.clone(),
            Duration::hours(1),
        ));
        let service = AccountService::new(repos.users, Arc::new(media.clone()), sessions.clone());
        Fixture {
            store,
            media,
            sessions,
            service,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_media(MemoryMediaStore::new())
    }

    fn ann() -> RegisterForm {
        RegisterForm {
            name: Some("Ann".into()),
            email: Some("ann@x.com".into()),
            password: Some("secret1".into()),
            profile_picture: None,
        }
    }

    fn login_form(email: &str, password: &str) -> LoginForm {
        LoginForm {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[tokio::test]
    async fn test_register_uses_default_picture() {
        let f = fixture();
        let profile = f.service.register(ann()).await.unwrap();
        assert_eq!(profile.email, "ann@x.com");
        assert_eq!(profile.profile_picture_url, DEFAULT_PROFILE_PICTURE_URL);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict_and_skips_upload() {
        let f = fixture();
        f.service.register(ann()).await.unwrap();

        let mut again = ann();
        again.email = Some("ANN@x.com".into());
        again.profile_picture = Some(UploadedFile::new(
            "profile_picture",
            Some("me.png".into()),
            "image/png",
            PNG.to_vec(),
        ));
        let err = f.service.register(again).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(ref m) if m == DUPLICATE_EMAIL));
        assert_eq!(f.store.users.count().await, 1);
        assert_eq!(f.media.upload_attempts(), 0);
    }

    #[tokio::test]
    async fn test_register_stores_uploaded_picture() {
        let f = fixture();
        let mut form = ann();
        form.profile_picture = Some(UploadedFile::new(
            "profile_picture",
            Some("me.png".into()),
            "image/png",
            PNG.to_vec(),
        ));
        let profile = f.service.register(form).await.unwrap();
        assert!(f.media.contains(&profile.profile_picture_url).await);
    }

    #[tokio::test]
    async fn test_register_upload_failure_creates_nothing() {
        let f = fixture_with_media(MemoryMediaStore::new().failing_after(0));
        let mut form = ann();
        form.profile_picture = Some(UploadedFile::new(
            "profile_picture",
            None,
            "image/png",
            PNG.to_vec(),
        ));
        let err = f.service.register(form).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(f.store.users.count().await, 0);
    }

    #[tokio::test]
    async fn test_login_does_not_distinguish_failures() {
        let f = fixture();
        f.service.register(ann()).await.unwrap();

        let wrong_password = f
            .service
            .login(login_form("ann@x.com", "nope12"))
            .await
            .unwrap_err();
        let unknown_email = f
            .service
            .login(login_form("bob@x.com", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, Error::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_login_then_logout_revokes_token() {
        let f = fixture();
        f.service.register(ann()).await.unwrap();

        let (profile, session) = f
            .service
            .login(login_form(" Ann@X.com ", "secret1"))
            .await
            .unwrap();
        assert_eq!(
            f.sessions.resolve(&session.token).await.unwrap().user_id,
            profile.id
        );

        f.service.logout(profile.id).await.unwrap();
        assert!(f.sessions.resolve(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn test_lookup() {
        let f = fixture();
        let created = f.service.register(ann()).await.unwrap();

        let found = f
            .service
            .lookup(EmailLookupForm {
                email: Some("ann@x.com".into()),
            })
            .await
            .unwrap();
        assert_eq!(found.id, created.id);

        let missing = f
            .service
            .lookup(EmailLookupForm {
                email: Some("zed@x.com".into()),
            })
            .await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        let invalid = f.service.lookup(EmailLookupForm { email: None }).await;
        assert!(matches!(invalid, Err(Error::Validation(_))));
    }
}
