use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::Postgres;

use bragger_database::{QueryCriteria, SqlxCrud, SqlxFilterQuery, SqlxSchema};

use crate::{AchievementImage, Category, MilestoneView, Tag};

/// Maturity of an achievement. Stored as lowercase text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementStatus {
    #[default]
    Idea,
    Concept,
    Usable,
    Complete,
}

impl AchievementStatus {
    pub const ALL: &'static [AchievementStatus] = &[
        AchievementStatus::Idea,
        AchievementStatus::Concept,
        AchievementStatus::Usable,
        AchievementStatus::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementStatus::Idea => "idea",
            AchievementStatus::Concept => "concept",
            AchievementStatus::Usable => "usable",
            AchievementStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for AchievementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idea" => Ok(AchievementStatus::Idea),
            "concept" => Ok(AchievementStatus::Concept),
            "usable" => Ok(AchievementStatus::Usable),
            "complete" => Ok(AchievementStatus::Complete),
            other => Err(anyhow!("unknown achievement status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: i64,
    pub end_date: Option<i64>,
    pub duration_hours: Option<f64>,
    pub category_id: Uuid,
    pub impact: Option<String>,
    pub skills_used: Vec<String>,
    pub team_size: Option<i64>,
    pub status: AchievementStatus,
    pub github_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Intermediate fetch type: `status` travels as text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AchievementRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: i64,
    pub end_date: Option<i64>,
    pub duration_hours: Option<f64>,
    pub category_id: Uuid,
    pub impact: Option<String>,
    pub skills_used: Vec<String>,
    pub team_size: Option<i64>,
    pub status: String,
    pub github_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// The achievement joined with everything the API returns alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementWithRelations {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub category: Category,
    pub tags: Vec<Tag>,
    pub images: Vec<AchievementImage>,
    pub milestones: Vec<MilestoneView>,
}

impl Achievement {
    pub async fn fetch_category<'e, E>(&self, executor: E) -> Result<Option<Category>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres> + Send,
    {
        Category::find_one_by_criteria(
            QueryCriteria::new().add_valued_filter("id", "=", self.category_id),
            executor,
        )
        .await
    }
}

impl SqlxSchema for Achievement {
    type Id = Uuid;
    type Row = AchievementRow;

    const TABLE_NAME: &'static str = "achievements";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "title",
        "description",
        "start_date",
        "end_date",
        "duration_hours",
        "category_id",
        "impact",
        "skills_used",
        "team_size",
        "status",
        "github_url",
        "created_at",
        "updated_at",
    ];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS \"idx_achievements_user\" ON \"achievements\" (\"user_id\")",
        "CREATE INDEX IF NOT EXISTS \"idx_achievements_category\" ON \"achievements\" (\"category_id\")",
        "CREATE INDEX IF NOT EXISTS \"idx_achievements_start_date\" ON \"achievements\" (\"start_date\")",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn from_row(row: Self::Row) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            duration_hours: row.duration_hours,
            category_id: row.category_id,
            impact: row.impact,
            skills_used: row.skills_used,
            team_size: row.team_size,
            status: row.status.parse().unwrap_or_default(),
            github_url: row.github_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn create_table_sql() -> String {
        r#"
        CREATE TABLE IF NOT EXISTS "achievements" (
            "id" UUID PRIMARY KEY,
            "user_id" UUID NOT NULL REFERENCES "users"("id"),
            "title" TEXT NOT NULL,
            "description" TEXT NOT NULL,
            "start_date" BIGINT NOT NULL,
            "end_date" BIGINT,
            "duration_hours" DOUBLE PRECISION,
            "category_id" UUID NOT NULL REFERENCES "categories"("id"),
            "impact" TEXT,
            "skills_used" TEXT[] NOT NULL DEFAULT '{}',
            "team_size" BIGINT,
            "status" TEXT NOT NULL,
            "github_url" TEXT,
            "created_at" BIGINT NOT NULL,
            "updated_at" BIGINT NOT NULL
        );
        "#
        .to_string()
    }
}

impl SqlxCrud for Achievement {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.id)
            .bind(self.user_id)
            .bind(self.title.clone())
            .bind(self.description.clone())
            .bind(self.start_date)
            .bind(self.end_date)
            .bind(self.duration_hours)
            .bind(self.category_id)
            .bind(self.impact.clone())
            .bind(self.skills_used.clone())
            .bind(self.team_size)
            .bind(self.status.to_string())
            .bind(self.github_url.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments> {
        query
            .bind(self.user_id)
            .bind(self.title.clone())
            .bind(self.description.clone())
            .bind(self.start_date)
            .bind(self.end_date)
            .bind(self.duration_hours)
            .bind(self.category_id)
            .bind(self.impact.clone())
            .bind(self.skills_used.clone())
            .bind(self.team_size)
            .bind(self.status.to_string())
            .bind(self.github_url.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.id)
    }
}

impl SqlxFilterQuery for Achievement {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_roundtrip() {
        for status in AchievementStatus::ALL {
            let parsed: AchievementStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, *status);
        }
        assert!("high".parse::<AchievementStatus>().is_err());
        assert!("Idea".parse::<AchievementStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(AchievementStatus::Usable).unwrap();
        assert_eq!(json, "usable");
    }

    fn sample() -> Achievement {
        Achievement {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Shipped the importer".into(),
            description: "Two weeks of parser work".into(),
            start_date: 1_706_745_600,
            end_date: None,
            duration_hours: Some(40.0),
            category_id: Uuid::new_v4(),
            impact: None,
            skills_used: vec!["rust".into()],
            team_size: None,
            status: AchievementStatus::Complete,
            github_url: None,
            created_at: 1_706_745_600,
            updated_at: 1_706_745_600,
        }
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("startDate").is_some());
        assert!(json.get("categoryId").is_some());
        assert!(json.get("skillsUsed").is_some());
        assert!(json.get("start_date").is_none());
    }
}
