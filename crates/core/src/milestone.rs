use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::Postgres;

use bragger_common::get_current_timestamp;
use bragger_database::{SqlxCrud, SqlxFilterQuery, SqlxSchema};

/// `completed_at` is the only stored completion state; the boolean the API
/// exposes is derived from it (see [`MilestoneView`]).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: Uuid,
    pub achievement_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<i64>,
    pub completed_at: Option<i64>,
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Milestone {
    pub fn new(
        achievement_id: Uuid,
        user_id: Uuid,
        title: impl Into<String>,
        description: Option<String>,
        due_date: Option<i64>,
        order: i64,
    ) -> Self {
        let now = get_current_timestamp();
        Self {
            id: Uuid::new_v4(),
            achievement_id,
            user_id,
            title: title.into(),
            description,
            due_date,
            completed_at: None,
            order,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Wire shape of a milestone: the stored row plus the derived completion flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneView {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub is_completed: bool,
}

impl From<Milestone> for MilestoneView {
    fn from(milestone: Milestone) -> Self {
        let is_completed = milestone.completed_at.is_some();
        Self {
            milestone,
            is_completed,
        }
    }
}

impl SqlxSchema for Milestone {
    type Id = Uuid;
    type Row = Self;

    const TABLE_NAME: &'static str = "milestones";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "achievement_id",
        "user_id",
        "title",
        "description",
        "due_date",
        "completed_at",
        "order",
        "created_at",
        "updated_at",
    ];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS \"idx_milestones_achievement\" ON \"milestones\" (\"achievement_id\")",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn from_row(row: Self::Row) -> Self {
        row
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS "milestones" (
            "id" UUID PRIMARY KEY,
            "achievement_id" UUID NOT NULL REFERENCES "achievements"("id") ON DELETE CASCADE,
            "user_id" UUID NOT NULL REFERENCES "users"("id"),
            "title" TEXT NOT NULL,
            "description" TEXT,
            "due_date" BIGINT,
            "completed_at" BIGINT,
            "order" BIGINT NOT NULL DEFAULT 0,
            "created_at" BIGINT NOT NULL,
            "updated_at" BIGINT NOT NULL
        );
        "#
        .to_string()
    }
}

impl SqlxCrud for Milestone {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.id)
            .bind(self.achievement_id)
            .bind(self.user_id)
            .bind(self.title.clone())
            .bind(self.description.clone())
            .bind(self.due_date)
            .bind(self.completed_at)
            .bind(self.order)
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.achievement_id)
            .bind(self.user_id)
            .bind(self.title.clone())
            .bind(self.description.clone())
            .bind(self.due_date)
            .bind(self.completed_at)
            .bind(self.order)
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.id)
    }
}

impl SqlxFilterQuery for Milestone {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_flag_derives_from_completed_at() {
        let mut milestone = Milestone::new(Uuid::new_v4(), Uuid::new_v4(), "ship", None, None, 0);
        let view = MilestoneView::from(milestone.clone());
        assert!(!view.is_completed);

        milestone.completed_at = Some(1_700_000_000);
        let view = MilestoneView::from(milestone);
        assert!(view.is_completed);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["isCompleted"], true);
        assert_eq!(json["completedAt"], 1_700_000_000i64);
    }
}
