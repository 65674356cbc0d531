//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use scribe_core::{
    CreateNoteRequest, Error, Note, NoteRepository, Result, UpdateNoteContentRequest,
};

/// Note columns plus the aggregated collaborator list, in insertion order.
const NOTE_SELECT: &str = r#"
    SELECT n.id, n.owner_id, n.title, n.body, n.files, n.created_at, n.updated_at,
           COALESCE(
               array_agg(c.user_id ORDER BY c.added_at, c.user_id)
                   FILTER (WHERE c.user_id IS NOT NULL),
               '{}'::uuid[]
           ) AS collaborators
    FROM note n
    LEFT JOIN note_collaborator c ON c.note_id = n.id
"#;

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_note(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        body: row.get("body"),
        files: row.get("files"),
        collaborators: row.get("collaborators"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let collaborators: Vec<Uuid> = req
            .collaborators
            .iter()
            .copied()
            .filter(|c| *c != req.owner_id)
            .collect();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO note (id, owner_id, title, body, files, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(req.owner_id)
        .bind(&req.title)
        .bind(&req.body)
        .bind(&req.files)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if !collaborators.is_empty() {
            sqlx::query(
                "INSERT INTO note_collaborator (note_id, user_id, added_at)
                 SELECT $1, u, $3 FROM unnest($2::uuid[]) AS u
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(&collaborators)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "notes",
            op = "insert",
            note_id = %id,
            file_count = req.files.len(),
            "Note inserted"
        );

        Ok(Note {
            id,
            owner_id: req.owner_id,
            title: req.title,
            body: req.body,
            files: req.files,
            collaborators,
            created_at: now,
            updated_at: now,
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Note>> {
        let row = sqlx::query(&format!("{NOTE_SELECT} WHERE n.id = $1 GROUP BY n.id"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(row_to_note))
    }

    async fn list_visible_to(&self, user_id: Uuid) -> Result<Vec<Note>> {
        // GROUP BY n.id keeps each note once even when the user matches both
        // the owner and the collaborator branch.
        let rows = sqlx::query(&format!(
            "{NOTE_SELECT}
             WHERE n.owner_id = $1
                OR EXISTS (
                    SELECT 1 FROM note_collaborator x
                    WHERE x.note_id = n.id AND x.user_id = $1
                )
             GROUP BY n.id
             ORDER BY n.updated_at DESC, n.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "notes",
            op = "list_visible_to",
            user_id = %user_id,
            result_count = rows.len(),
            "Listed visible notes"
        );
        Ok(rows.iter().map(row_to_note).collect())
    }

    async fn update_content(&self, id: Uuid, req: UpdateNoteContentRequest) -> Result<Note> {
        let result = sqlx::query(
            "UPDATE note SET title = $2, body = $3, files = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.body)
        .bind(&req.files)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Note not found with this id.".into()));
        }

        self.fetch(id)
            .await?
            .ok_or_else(|| Error::NotFound("Note not found with this id.".into()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_collaborator(&self, note_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO note_collaborator (note_id, user_id, added_at)
             VALUES ($1, $2, $3)
             ON CONFLICT DO NOTHING",
        )
        .bind(note_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_collaborator(&self, note_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM note_collaborator WHERE note_id = $1 AND user_id = $2")
                .bind(note_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
