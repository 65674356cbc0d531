//! PostgreSQL repository tests. Require a running database:
//! `cargo test -p scribe-db -- --ignored`

use scribe_db::test_fixtures::{connect_migrated, unique_email};
use scribe_db::{
    CreateNoteRequest, CreateUserRequest, Database, Error, NoteRepository, SessionRepository,
    UpdateNoteContentRequest, User, UserRepository,
};
use uuid::Uuid;

async fn setup() -> Database {
    connect_migrated()
        .await
        .expect("Failed to connect to test database")
}

async fn create_user(db: &Database, prefix: &str) -> User {
    db.users
        .create(CreateUserRequest {
            name: "Test".to_string(),
            email: unique_email(prefix),
            profile_picture_url: "https://img/default.jpg".to_string(),
            password_hash: "$argon2id$v=19$placeholder".to_string(),
        })
        .await
        .expect("Failed to create user")
}

fn note_req(owner: Uuid, collaborators: Vec<Uuid>) -> CreateNoteRequest {
    CreateNoteRequest {
        owner_id: owner,
        title: "T".to_string(),
        body: "body".to_string(),
        files: vec!["https://media.test/a.png".to_string()],
        collaborators,
    }
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_is_conflict() {
    let db = setup().await;
    let user = create_user(&db, "dup").await;

    let err = db
        .users
        .create(CreateUserRequest {
            name: "Other".to_string(),
            email: user.email.clone(),
            profile_picture_url: "https://img/default.jpg".to_string(),
            password_hash: "$argon2id$x".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert!(db.users.email_exists(&user.email).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_session_exists_requires_matching_user() {
    let db = setup().await;
    let user = create_user(&db, "sess").await;
    let other = create_user(&db, "sess-other").await;

    let session = db.sessions.create(user.id).await.unwrap();
    assert!(db.sessions.exists(session.id, user.id).await.unwrap());
    assert!(!db.sessions.exists(session.id, other.id).await.unwrap());

    assert_eq!(db.sessions.delete_for_user(user.id).await.unwrap(), 1);
    assert!(!db.sessions.exists(session.id, user.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_note_roundtrip_with_collaborators() {
    let db = setup().await;
    let owner = create_user(&db, "owner").await;
    let collab = create_user(&db, "collab").await;

    let note = db
        .notes
        .insert(note_req(owner.id, vec![collab.id]))
        .await
        .unwrap();
    let fetched = db.notes.fetch(note.id).await.unwrap().unwrap();
    assert_eq!(fetched.collaborators, vec![collab.id]);
    assert_eq!(fetched.files, note.files);

    let updated = db
        .notes
        .update_content(
            note.id,
            UpdateNoteContentRequest {
                title: "T2".to_string(),
                body: "body2".to_string(),
                files: vec![],
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "T2");
    assert!(updated.files.is_empty());
    assert_eq!(updated.collaborators, vec![collab.id]);
}

#[tokio::test]
#[ignore]
async fn test_list_visible_to_has_no_duplicates() {
    let db = setup().await;
    let a = create_user(&db, "vis-a").await;
    let b = create_user(&db, "vis-b").await;
    let c = create_user(&db, "vis-c").await;

    let own = db.notes.insert(note_req(a.id, vec![b.id])).await.unwrap();
    let shared = db
        .notes
        .insert(note_req(b.id, vec![a.id, c.id]))
        .await
        .unwrap();
    db.notes.insert(note_req(c.id, vec![])).await.unwrap();

    let visible = db.notes.list_visible_to(a.id).await.unwrap();
    let mut ids: Vec<Uuid> = visible.iter().map(|n| n.id).collect();
    ids.sort();
    let mut expected = vec![own.id, shared.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
#[ignore]
async fn test_collaborator_mutations_and_cascade() {
    let db = setup().await;
    let owner = create_user(&db, "casc-owner").await;
    let collab = create_user(&db, "casc-collab").await;

    let note = db.notes.insert(note_req(owner.id, vec![])).await.unwrap();
    assert!(db.notes.add_collaborator(note.id, collab.id).await.unwrap());
    assert!(!db.notes.add_collaborator(note.id, collab.id).await.unwrap());
    assert!(db.notes.remove_collaborator(note.id, collab.id).await.unwrap());
    assert!(!db.notes.remove_collaborator(note.id, collab.id).await.unwrap());

    sqlx::query("DELETE FROM app_user WHERE id = $1")
        .bind(owner.id)
        .execute(db.pool())
        .await
        .unwrap();
    assert!(db.notes.fetch(note.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_delete_reports_absence() {
    let db = setup().await;
    let owner = create_user(&db, "del").await;
    let note = db.notes.insert(note_req(owner.id, vec![])).await.unwrap();

    assert!(db.notes.delete(note.id).await.unwrap());
    assert!(!db.notes.delete(note.id).await.unwrap());
}
