//! Service-layer tests against a live PostgreSQL. Run them with a
//! `DATABASE_URL` pointing at a disposable database:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/bragger_test cargo test -p bragger-core -- --ignored
//! ```

use sqlx::types::Uuid;
use sqlx::PgPool;

use bragger_core::services::achievements::{
    self, AchievementFilters, CreateAchievementDto, UpdateAchievementDto,
};
use bragger_core::services::categories::{self, CreateCategoryDto};
use bragger_core::services::milestones::{self, CreateMilestoneDto, UpdateMilestoneDto};
use bragger_core::services::tags::{self, CreateTagDto};
use bragger_core::{
    Achievement, AchievementImage, AchievementTag, Category, Milestone, ServiceError, Tag, User,
};
use bragger_database::{init_database, QueryCriteria, SqlxCrud, SqlxFilterQuery};

init_database!(
    models: [User, Category, Tag, Achievement, AchievementTag, AchievementImage, Milestone]
);

async fn test_pool() -> &'static PgPool {
    dotenv::dotenv().ok();
    connect(false, true).await
}

async fn seed_user(pool: &PgPool) -> User {
    User::new(
        format!("user-{}@example.com", Uuid::new_v4()),
        "Test User",
        "not-a-real-hash",
    )
    .create(pool)
    .await
    .expect("user insert")
}

async fn seed_category(pool: &PgPool) -> Category {
    categories::create(
        pool,
        CreateCategoryDto {
            name: format!("Category {}", Uuid::new_v4()),
            color: Some("#3b82f6".into()),
        },
    )
    .await
    .expect("category insert")
}

fn unique_tag(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

fn achievement_dto(category_id: Uuid, tags: Vec<String>) -> CreateAchievementDto {
    CreateAchievementDto {
        title: "Shipped something".into(),
        description: "It works".into(),
        start_date: "2024-01-01".into(),
        category_id: category_id.to_string(),
        status: "complete".into(),
        tags,
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn create_reconciles_tags_without_duplicates() {
    let pool = test_pool().await;
    let user = seed_user(pool).await;
    let category = seed_category(pool).await;

    let existing = unique_tag("existing");
    let fresh = unique_tag("fresh");
    tags::create(
        pool,
        CreateTagDto {
            name: existing.clone(),
        },
    )
    .await
    .unwrap();

    // Mixed case plus a duplicate entry; both collapse onto one row each.
    let created = achievements::create(
        pool,
        user.id,
        achievement_dto(
            category.id,
            vec![existing.to_uppercase(), fresh.clone(), existing.clone()],
        ),
    )
    .await
    .unwrap();

    let mut names: Vec<String> = created.tags.iter().map(|t| t.name.clone()).collect();
    names.sort();
    let mut expected = vec![existing.clone(), fresh.clone()];
    expected.sort();
    assert_eq!(names, expected);

    let rows = Tag::count_by_criteria(
        QueryCriteria::new().add_valued_filter("name", "=", existing.clone()),
        pool,
    )
    .await
    .unwrap();
    assert_eq!(rows, 1, "no duplicate row for a pre-existing tag");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn listing_respects_page_size_and_total_pages() {
    let pool = test_pool().await;
    let user = seed_user(pool).await;
    let category = seed_category(pool).await;

    for i in 0..12 {
        let mut dto = achievement_dto(category.id, Vec::new());
        dto.title = format!("Achievement {i}");
        achievements::create(pool, user.id, dto).await.unwrap();
    }

    let filters = AchievementFilters {
        page: Some(1),
        page_size: Some(5),
        user_id: Some(user.id),
        ..Default::default()
    };
    let page = achievements::find_all(pool, &filters).await.unwrap();

    assert_eq!(page.data.len(), 5);
    assert_eq!(page.total, 12);
    assert_eq!(page.total_pages, 3);

    let filters = AchievementFilters {
        page: Some(3),
        page_size: Some(5),
        user_id: Some(user.id),
        ..Default::default()
    };
    let last = achievements::find_all(pool, &filters).await.unwrap();
    assert_eq!(last.data.len(), 2);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn category_in_use_cannot_be_deleted() {
    let pool = test_pool().await;
    let user = seed_user(pool).await;
    let category = seed_category(pool).await;

    achievements::create(pool, user.id, achievement_dto(category.id, Vec::new()))
        .await
        .unwrap();

    let err = categories::delete(pool, category.id).await.unwrap_err();
    match err {
        ServiceError::Conflict(message) => {
            assert_eq!(message, "Cannot delete category that is in use by achievements")
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    assert!(categories::find_by_id(pool, category.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn updating_tags_replaces_the_whole_link_set() {
    let pool = test_pool().await;
    let user = seed_user(pool).await;
    let category = seed_category(pool).await;

    let keep = unique_tag("keep");
    let dropped = unique_tag("drop");
    let add = unique_tag("add");

    let created = achievements::create(
        pool,
        user.id,
        achievement_dto(category.id, vec![keep.clone(), dropped.clone()]),
    )
    .await
    .unwrap();

    let updated = achievements::update(
        pool,
        created.achievement.id,
        user.id,
        UpdateAchievementDto {
            tags: Some(vec![keep.clone(), add.clone()]),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let mut names: Vec<String> = updated.tags.iter().map(|t| t.name.clone()).collect();
    names.sort();
    let mut expected = vec![keep, add];
    expected.sort();
    assert_eq!(names, expected);

    let links = AchievementTag::count_by_criteria(
        QueryCriteria::new().add_valued_filter("achievement_id", "=", created.achievement.id),
        pool,
    )
    .await
    .unwrap();
    assert_eq!(links, 2);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn tag_uniqueness_is_case_insensitive() {
    let pool = test_pool().await;

    let name = unique_tag("react");
    tags::create(pool, CreateTagDto { name: name.clone() })
        .await
        .unwrap();

    let err = tags::create(
        pool,
        CreateTagDto {
            name: name.to_uppercase(),
        },
    )
    .await
    .unwrap_err();
    match err {
        ServiceError::Conflict(message) => assert_eq!(message, "Tag name already exists"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn duplicate_category_name_is_rejected() {
    let pool = test_pool().await;

    let name = format!("Development {}", Uuid::new_v4());
    let created = categories::create(
        pool,
        CreateCategoryDto {
            name: name.clone(),
            color: Some("#3b82f6".into()),
        },
    )
    .await
    .unwrap();
    assert!(!created.id.is_nil());
    assert!(created.created_at > 0);

    let err = categories::create(
        pool,
        CreateCategoryDto {
            name,
            color: Some("#3b82f6".into()),
        },
    )
    .await
    .unwrap_err();
    match err {
        ServiceError::Conflict(message) => assert_eq!(message, "Category name already exists"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn tags_filter_matches_any_of_the_names() {
    let pool = test_pool().await;
    let user = seed_user(pool).await;
    let category = seed_category(pool).await;

    let tag1 = unique_tag("tag1");
    let tag2 = unique_tag("tag2");

    let first = achievements::create(
        pool,
        user.id,
        achievement_dto(category.id, vec![tag1.clone()]),
    )
    .await
    .unwrap();
    let second = achievements::create(
        pool,
        user.id,
        achievement_dto(category.id, vec![tag2.clone()]),
    )
    .await
    .unwrap();
    achievements::create(pool, user.id, achievement_dto(category.id, Vec::new()))
        .await
        .unwrap();

    let filters = AchievementFilters {
        tags: vec![tag1, tag2],
        user_id: Some(user.id),
        ..Default::default()
    };
    let page = achievements::find_all(pool, &filters).await.unwrap();

    let mut ids: Vec<Uuid> = page.data.iter().map(|a| a.achievement.id).collect();
    ids.sort();
    let mut expected = vec![first.achievement.id, second.achievement.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn milestone_completion_tracks_is_completed() {
    let pool = test_pool().await;
    let user = seed_user(pool).await;
    let category = seed_category(pool).await;
    let achievement = achievements::create(pool, user.id, achievement_dto(category.id, Vec::new()))
        .await
        .unwrap();

    let milestone = milestones::create(
        pool,
        achievement.achievement.id,
        user.id,
        CreateMilestoneDto {
            title: "First draft".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(!milestone.is_completed);

    let completed = milestones::update(
        pool,
        milestone.milestone.id,
        user.id,
        UpdateMilestoneDto {
            is_completed: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(completed.is_completed);
    assert!(completed.milestone.completed_at.is_some());

    let reopened = milestones::update(
        pool,
        milestone.milestone.id,
        user.id,
        UpdateMilestoneDto {
            is_completed: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(!reopened.is_completed);
    assert!(reopened.milestone.completed_at.is_none());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn achievements_are_scoped_to_their_owner() {
    let pool = test_pool().await;
    let owner = seed_user(pool).await;
    let stranger = seed_user(pool).await;
    let category = seed_category(pool).await;

    let created = achievements::create(pool, owner.id, achievement_dto(category.id, Vec::new()))
        .await
        .unwrap();

    assert!(
        achievements::find_by_id(pool, created.achievement.id, stranger.id)
            .await
            .unwrap()
            .is_none()
    );

    let err = achievements::delete(pool, created.achievement.id, stranger.id)
        .await
        .unwrap_err();
    match err {
        ServiceError::NotFound(message) => assert_eq!(message, "Achievement not found"),
        other => panic!("expected not-found, got {other:?}"),
    }

    assert!(
        achievements::find_by_id(pool, created.achievement.id, owner.id)
            .await
            .unwrap()
            .is_some()
    );
}
