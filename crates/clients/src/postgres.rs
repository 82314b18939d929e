use std::sync::Arc;

use bragger_common::define_module_client;
use bragger_database::init_database;
use sqlx::PgPool;

init_database!(
    models: [
        bragger_core::User,
        bragger_core::Category,
        bragger_core::Tag,
        bragger_core::Achievement,
        bragger_core::AchievementTag,
        bragger_core::AchievementImage,
        bragger_core::Milestone,
    ]
);

define_module_client! {
    (struct PostgresClient, "postgres")
    client_type: Arc<&'static PgPool>,
    env: ["DATABASE_URL"],
    setup: async {
        Arc::new(connect(false, true).await)
    }
}
