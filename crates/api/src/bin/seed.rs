use anyhow::Result;

use bragger_api::setup_tracing;
use bragger_clients::PostgresClient;
use bragger_common::ModuleClient;
use bragger_core::{Category, Tag};
use bragger_database::{QueryCriteria, SqlxCrud, SqlxFilterQuery};

const CATEGORIES: &[(&str, &str)] = &[
    ("Development", "#3b82f6"),
    ("Leadership", "#10b981"),
    ("Innovation", "#f59e0b"),
    ("Problem Solving", "#ef4444"),
];

const TAGS: &[&str] = &["react", "typescript", "leadership", "performance", "security"];

/// Idempotently inserts the demo categories and tags.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let db = PostgresClient::setup_connection().await;
    let pool: &sqlx::PgPool = db.get_client();

    let mut created = 0;
    for (name, color) in CATEGORIES {
        let existing = Category::find_one_by_criteria(
            QueryCriteria::new().add_valued_filter("name", "=", name.to_string()),
            pool,
        )
        .await?;
        if existing.is_none() {
            Category::new(*name, Some(color.to_string()))
                .create(pool)
                .await?;
            created += 1;
        }
    }
    tracing::info!("Seeded {created} categories");

    let mut created = 0;
    for name in TAGS {
        let existing = Tag::find_one_by_criteria(
            QueryCriteria::new().add_valued_filter("name", "=", name.to_string()),
            pool,
        )
        .await?;
        if existing.is_none() {
            Tag::new(*name).create(pool).await?;
            created += 1;
        }
    }
    tracing::info!("Seeded {created} tags");

    Ok(())
}
