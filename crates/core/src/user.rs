use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::Postgres;

use bragger_common::get_current_timestamp;
use bragger_database::{SqlxCrud, SqlxFilterQuery, SqlxSchema};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = get_current_timestamp();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            password_hash: password_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl SqlxSchema for User {
    type Id = Uuid;
    type Row = Self;

    const TABLE_NAME: &'static str = "users";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "email",
        "name",
        "password_hash",
        "created_at",
        "updated_at",
    ];
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn from_row(row: Self::Row) -> Self {
        row
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS "users" (
            "id" UUID PRIMARY KEY,
            "email" TEXT NOT NULL UNIQUE,
            "name" TEXT NOT NULL,
            "password_hash" TEXT NOT NULL,
            "created_at" BIGINT NOT NULL,
            "updated_at" BIGINT NOT NULL
        );
        "#
        .to_string()
    }
}

impl SqlxCrud for User {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.id)
            .bind(self.email.clone())
            .bind(self.name.clone())
            .bind(self.password_hash.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.email.clone())
            .bind(self.name.clone())
            .bind(self.password_hash.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.id)
    }
}

impl SqlxFilterQuery for User {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_never_serialized() {
        let user = User::new("a@b.c", "Ada", "bcrypt-hash");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@b.c");
    }
}
