use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::Postgres;

use bragger_common::get_current_timestamp;
use bragger_database::{SqlxCrud, SqlxFilterQuery, SqlxSchema};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub created_at: i64,
}

impl Category {
    pub fn new(name: impl Into<String>, color: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color,
            created_at: get_current_timestamp(),
        }
    }
}

/// Listing shape for `?includeStats=true`: the category plus the number of
/// achievements referencing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithStats {
    #[serde(flatten)]
    pub category: Category,
    pub achievement_count: i64,
}

impl SqlxSchema for Category {
    type Id = Uuid;
    type Row = Self;

    const TABLE_NAME: &'static str = "categories";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "name", "color", "created_at"];
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn from_row(row: Self::Row) -> Self {
        row
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS "categories" (
            "id" UUID PRIMARY KEY,
            "name" TEXT NOT NULL UNIQUE,
            "color" TEXT,
            "created_at" BIGINT NOT NULL
        );
        "#
        .to_string()
    }
}

impl SqlxCrud for Category {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.id)
            .bind(self.name.clone())
            .bind(self.color.clone())
            .bind(self.created_at)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.name.clone())
            .bind(self.color.clone())
            .bind(self.created_at)
            .bind(self.id)
    }
}

impl SqlxFilterQuery for Category {}
