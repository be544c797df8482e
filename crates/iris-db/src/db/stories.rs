use iris_core::{models::StorySummary, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::StoryDirectory;

/// Story lookups against the shared `stories` table.
#[derive(Clone)]
pub struct PostgresStoryRepository {
    pool: PgPool,
}

impl PostgresStoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StoryDirectory for PostgresStoryRepository {
    #[tracing::instrument(skip(self), fields(db.table = "stories", db.operation = "select", db.record_id = %story_id))]
    async fn find(&self, story_id: Uuid) -> Result<Option<StorySummary>, AppError> {
        let story = sqlx::query_as::<Postgres, StorySummary>(
            "SELECT id, title FROM stories WHERE id = $1",
        )
        .bind(story_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(story)
    }
}
