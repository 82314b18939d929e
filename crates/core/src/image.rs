use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::Postgres;

use bragger_common::get_current_timestamp;
use bragger_database::{SqlxCrud, SqlxFilterQuery, SqlxSchema};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AchievementImage {
    pub id: Uuid,
    pub achievement_id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub created_at: i64,
}

impl AchievementImage {
    pub fn new(
        achievement_id: Uuid,
        filename: impl Into<String>,
        original_name: impl Into<String>,
        file_path: impl Into<String>,
        file_size: i64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            achievement_id,
            filename: filename.into(),
            original_name: original_name.into(),
            file_path: file_path.into(),
            file_size,
            mime_type: mime_type.into(),
            created_at: get_current_timestamp(),
        }
    }
}

impl SqlxSchema for AchievementImage {
    type Id = Uuid;
    type Row = Self;

    const TABLE_NAME: &'static str = "achievement_images";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "achievement_id",
        "filename",
        "original_name",
        "file_path",
        "file_size",
        "mime_type",
        "created_at",
    ];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS \"idx_achievement_images_achievement\" ON \"achievement_images\" (\"achievement_id\")",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn from_row(row: Self::Row) -> Self {
        row
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS "achievement_images" (
            "id" UUID PRIMARY KEY,
            "achievement_id" UUID NOT NULL REFERENCES "achievements"("id") ON DELETE CASCADE,
            "filename" TEXT NOT NULL UNIQUE,
            "original_name" TEXT NOT NULL,
            "file_path" TEXT NOT NULL,
            "file_size" BIGINT NOT NULL,
            "mime_type" TEXT NOT NULL,
            "created_at" BIGINT NOT NULL
        );
        "#
        .to_string()
    }
}

impl SqlxCrud for AchievementImage {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.id)
            .bind(self.achievement_id)
            .bind(self.filename.clone())
            .bind(self.original_name.clone())
            .bind(self.file_path.clone())
            .bind(self.file_size)
            .bind(self.mime_type.clone())
            .bind(self.created_at)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.achievement_id)
            .bind(self.filename.clone())
            .bind(self.original_name.clone())
            .bind(self.file_path.clone())
            .bind(self.file_size)
            .bind(self.mime_type.clone())
            .bind(self.created_at)
            .bind(self.id)
    }
}

impl SqlxFilterQuery for AchievementImage {}
