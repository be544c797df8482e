use chrono::Utc;
use iris_core::{
    models::{FilePatch, IngestedFile, NewIngestedFile},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::FileRegistry;

const FILE_COLUMNS: &str = "id, filename, original_name, file_type, file_size, mime_type, \
     storage_path, story_id, extracted_text, transcription, created_at, updated_at";

/// Repository for ingested file rows
#[derive(Clone)]
pub struct PostgresFileRepository {
    pool: PgPool,
}

impl PostgresFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FileRegistry for PostgresFileRepository {
    #[tracing::instrument(skip(self, new_file), fields(db.table = "files", db.operation = "insert", story_id = %new_file.story_id))]
    async fn create(&self, new_file: NewIngestedFile) -> Result<IngestedFile, AppError> {
        let now = Utc::now();
        let query = format!(
            r#"
            INSERT INTO files (
                id, filename, original_name, file_type, file_size, mime_type,
                storage_path, story_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {}
            "#,
            FILE_COLUMNS
        );

        let file = sqlx::query_as::<Postgres, IngestedFile>(&query)
            .bind(Uuid::new_v4())
            .bind(&new_file.filename)
            .bind(&new_file.original_name)
            .bind(new_file.file_type)
            .bind(new_file.file_size)
            .bind(&new_file.mime_type)
            .bind(&new_file.storage_path)
            .bind(new_file.story_id)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(file)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<IngestedFile>, AppError> {
        let query = format!("SELECT {} FROM files WHERE id = $1", FILE_COLUMNS);
        let file = sqlx::query_as::<Postgres, IngestedFile>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(file)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn list_by_story(&self, story_id: Uuid) -> Result<Vec<IngestedFile>, AppError> {
        let query = format!(
            "SELECT {} FROM files WHERE story_id = $1 ORDER BY created_at DESC, id DESC",
            FILE_COLUMNS
        );
        let files = sqlx::query_as::<Postgres, IngestedFile>(&query)
            .bind(story_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(files)
    }

    #[tracing::instrument(skip(self, patch), fields(db.table = "files", db.operation = "update", db.record_id = %id))]
    async fn update(&self, id: Uuid, patch: &FilePatch) -> Result<Option<IngestedFile>, AppError> {
        if patch.is_empty() {
            return self.get(id).await;
        }

        // COALESCE keeps absent fields; an empty string is a value, not an absence.
        let query = format!(
            r#"
            UPDATE files
            SET filename = COALESCE($2, filename),
                extracted_text = COALESCE($3, extracted_text),
                transcription = COALESCE($4, transcription),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            FILE_COLUMNS
        );

        let file = sqlx::query_as::<Postgres, IngestedFile>(&query)
            .bind(id)
            .bind(patch.filename.as_deref())
            .bind(patch.extracted_text.as_deref())
            .bind(patch.transcription.as_deref())
            .fetch_optional(&self.pool)
            .await?;

        Ok(file)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
