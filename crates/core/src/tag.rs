use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::Postgres;

use bragger_common::get_current_timestamp;
use bragger_database::{SqlxCrud, SqlxFilterQuery, SqlxSchema};

/// Tag names are stored lowercase; uniqueness is therefore case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at: i64,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: get_current_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagWithStats {
    #[serde(flatten)]
    pub tag: Tag,
    pub usage_count: i64,
}

impl SqlxSchema for Tag {
    type Id = Uuid;
    type Row = Self;

    const TABLE_NAME: &'static str = "tags";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "name", "created_at"];
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn from_row(row: Self::Row) -> Self {
        row
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS "tags" (
            "id" UUID PRIMARY KEY,
            "name" TEXT NOT NULL UNIQUE,
            "created_at" BIGINT NOT NULL
        );
        "#
        .to_string()
    }
}

impl SqlxCrud for Tag {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.id)
            .bind(self.name.clone())
            .bind(self.created_at)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.name.clone())
            .bind(self.created_at)
            .bind(self.id)
    }
}

impl SqlxFilterQuery for Tag {}

/// Join row linking an achievement to a tag.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AchievementTag {
    pub id: Uuid,
    pub achievement_id: Uuid,
    pub tag_id: Uuid,
}

impl AchievementTag {
    pub fn new(achievement_id: Uuid, tag_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            achievement_id,
            tag_id,
        }
    }
}

impl SqlxSchema for AchievementTag {
    type Id = Uuid;
    type Row = Self;

    const TABLE_NAME: &'static str = "achievement_tags";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "achievement_id", "tag_id"];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE UNIQUE INDEX IF NOT EXISTS \"idx_achievement_tags_pair\" ON \"achievement_tags\" (\"achievement_id\", \"tag_id\")",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn from_row(row: Self::Row) -> Self {
        row
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS "achievement_tags" (
            "id" UUID PRIMARY KEY,
            "achievement_id" UUID NOT NULL REFERENCES "achievements"("id") ON DELETE CASCADE,
            "tag_id" UUID NOT NULL REFERENCES "tags"("id")
        );
        "#
        .to_string()
    }
}

impl SqlxCrud for AchievementTag {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.id)
            .bind(self.achievement_id)
            .bind(self.tag_id)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query.bind(self.achievement_id).bind(self.tag_id).bind(self.id)
    }
}

impl SqlxFilterQuery for AchievementTag {}
