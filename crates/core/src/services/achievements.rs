use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use sqlx::{PgPool, Postgres, Transaction};

use bragger_common::get_current_timestamp;
use bragger_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery};

use crate::{
    Achievement, AchievementImage, AchievementStatus, AchievementTag, AchievementWithRelations,
    Category, Milestone, MilestoneView, ServiceError, ServiceResult, Tag,
};

use super::{page_window, parse_date, Paginated};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAchievementDto {
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub duration_hours: Option<f64>,
    pub category_id: String,
    pub impact: Option<String>,
    pub skills_used: Vec<String>,
    pub team_size: Option<i64>,
    pub status: String,
    pub github_url: Option<String>,
    pub tags: Vec<String>,
}

/// Partial update: absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAchievementDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub duration_hours: Option<f64>,
    pub category_id: Option<String>,
    pub impact: Option<String>,
    pub skills_used: Option<Vec<String>>,
    pub team_size: Option<i64>,
    pub status: Option<String>,
    pub github_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AchievementFilters {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub tags: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Owner scoping, set by the caller from the authenticated user.
    #[serde(skip)]
    pub user_id: Option<Uuid>,
}

const TAGS_SUBQUERY: &str = "SELECT \"achievement_id\" FROM \"achievement_tags\" WHERE \"tag_id\" IN (SELECT \"id\" FROM \"tags\" WHERE \"name\" = ANY($?))";

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    dto: CreateAchievementDto,
) -> ServiceResult<AchievementWithRelations> {
    let parsed = validate_create(&dto)?;

    let mut tx = pool.begin().await?;

    let category_id = Uuid::parse_str(dto.category_id.trim()).unwrap_or(Uuid::nil());
    let category = Category::find_by_id(category_id, &mut *tx)
        .await?
        .ok_or_else(|| ServiceError::not_found("Category not found"))?;

    let tags = reconcile_tags(&mut tx, &dto.tags).await?;

    let now = get_current_timestamp();
    let achievement = Achievement {
        id: Uuid::new_v4(),
        user_id,
        title: dto.title,
        description: dto.description,
        start_date: parsed.start_date,
        end_date: parsed.end_date,
        duration_hours: dto.duration_hours,
        category_id,
        impact: dto.impact,
        skills_used: dto.skills_used,
        team_size: dto.team_size,
        status: parsed.status,
        github_url: dto.github_url,
        created_at: now,
        updated_at: now,
    };
    let achievement = achievement.create(&mut *tx).await?;

    for tag in &tags {
        AchievementTag::new(achievement.id, tag.id)
            .create(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(AchievementWithRelations {
        achievement,
        category,
        tags,
        images: Vec::new(),
        milestones: Vec::new(),
    })
}

pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> ServiceResult<Option<AchievementWithRelations>> {
    let achievement = Achievement::find_one_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("id", "=", id)
            .add_valued_filter("user_id", "=", user_id),
        pool,
    )
    .await?;

    match achievement {
        Some(achievement) => Ok(load_relations(pool, vec![achievement]).await?.pop()),
        None => Ok(None),
    }
}

pub async fn find_all(
    pool: &PgPool,
    filters: &AchievementFilters,
) -> ServiceResult<Paginated<AchievementWithRelations>> {
    let parsed = parse_filters(filters)?;
    let (page, page_size, offset) = page_window(filters.page, filters.page_size);

    let total = Achievement::count_by_criteria(build_criteria(filters, &parsed), pool).await?;

    let mut criteria = build_criteria(filters, &parsed);
    criteria = match parsed.order {
        Some((column, direction)) => criteria.order_by(column, direction),
        None => criteria.order_by("created_at", OrderDirection::Desc),
    };
    let achievements =
        Achievement::find_by_criteria(criteria.limit(page_size).offset(offset), pool).await?;

    let data = load_relations(pool, achievements).await?;
    Ok(Paginated::new(data, total, page, page_size))
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    dto: UpdateAchievementDto,
) -> ServiceResult<AchievementWithRelations> {
    let parsed = validate_update(&dto)?;

    let mut tx = pool.begin().await?;

    let mut achievement = Achievement::find_one_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("id", "=", id)
            .add_valued_filter("user_id", "=", user_id),
        &mut *tx,
    )
    .await?
    .ok_or_else(|| ServiceError::not_found("Achievement not found"))?;

    if let Some(raw) = dto.category_id.as_deref() {
        let new_category_id = Uuid::parse_str(raw.trim()).unwrap_or(Uuid::nil());
        if new_category_id != achievement.category_id {
            Category::find_by_id(new_category_id, &mut *tx)
                .await?
                .ok_or_else(|| ServiceError::not_found("Category not found"))?;
        }
        achievement.category_id = new_category_id;
    }

    if let Some(title) = dto.title {
        achievement.title = title;
    }
    if let Some(description) = dto.description {
        achievement.description = description;
    }
    if let Some(start_date) = parsed.start_date {
        achievement.start_date = start_date;
    }
    if let Some(end_date) = parsed.end_date {
        achievement.end_date = Some(end_date);
    }
    if let Some(duration_hours) = dto.duration_hours {
        achievement.duration_hours = Some(duration_hours);
    }
    if let Some(impact) = dto.impact {
        achievement.impact = Some(impact);
    }
    if let Some(skills_used) = dto.skills_used {
        achievement.skills_used = skills_used;
    }
    if let Some(team_size) = dto.team_size {
        achievement.team_size = Some(team_size);
    }
    if let Some(status) = parsed.status {
        achievement.status = status;
    }
    if let Some(github_url) = dto.github_url {
        achievement.github_url = Some(github_url);
    }

    // A supplied tag list replaces the whole link set.
    if let Some(names) = &dto.tags {
        AchievementTag::delete_by_criteria(
            QueryCriteria::new().add_valued_filter("achievement_id", "=", achievement.id),
            &mut *tx,
        )
        .await?;
        let tags = reconcile_tags(&mut tx, names).await?;
        for tag in &tags {
            AchievementTag::new(achievement.id, tag.id)
                .create(&mut *tx)
                .await?;
        }
    }

    achievement.updated_at = get_current_timestamp();
    let achievement = achievement.update(&mut *tx).await?;

    tx.commit().await?;

    load_relations(pool, vec![achievement])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found("Achievement not found"))
}

pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> ServiceResult<()> {
    let achievement = Achievement::find_one_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("id", "=", id)
            .add_valued_filter("user_id", "=", user_id),
        pool,
    )
    .await?
    .ok_or_else(|| ServiceError::not_found("Achievement not found"))?;

    achievement.delete(pool).await?;
    Ok(())
}

/// Lowercases, trims and de-duplicates a requested tag-name list, preserving
/// first-seen order.
pub(crate) fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }
    out
}

/// Resolves tag names to rows: finds the ones that exist, inserts the rest.
/// Runs on the caller's transaction so a failure later in the same unit of
/// work rolls the new tags back too.
async fn reconcile_tags(
    tx: &mut Transaction<'_, Postgres>,
    names: &[String],
) -> ServiceResult<Vec<Tag>> {
    let normalized = normalize_tag_names(names);
    if normalized.is_empty() {
        return Ok(Vec::new());
    }

    let existing = Tag::find_by_criteria(
        QueryCriteria::new().add_valued_filter("name", "= ANY($?)", normalized.clone()),
        &mut **tx,
    )
    .await?;

    let existing_names: HashSet<String> = existing.iter().map(|t| t.name.clone()).collect();
    let mut all = existing;
    for name in normalized
        .into_iter()
        .filter(|n| !existing_names.contains(n))
    {
        all.push(Tag::new(name).create(&mut **tx).await?);
    }
    Ok(all)
}

async fn load_relations(
    pool: &PgPool,
    achievements: Vec<Achievement>,
) -> ServiceResult<Vec<AchievementWithRelations>> {
    if achievements.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = achievements.iter().map(|a| a.id).collect();
    let category_ids: Vec<Uuid> = achievements.iter().map(|a| a.category_id).collect();

    let categories = Category::find_by_criteria(
        QueryCriteria::new().add_valued_filter("id", "= ANY($?)", category_ids),
        pool,
    )
    .await?;
    let categories: HashMap<Uuid, Category> =
        categories.into_iter().map(|c| (c.id, c)).collect();

    let links = AchievementTag::find_by_criteria(
        QueryCriteria::new().add_valued_filter("achievement_id", "= ANY($?)", ids.clone()),
        pool,
    )
    .await?;

    let tag_ids: Vec<Uuid> = links.iter().map(|l| l.tag_id).collect();
    let tags_by_id: HashMap<Uuid, Tag> = if tag_ids.is_empty() {
        HashMap::new()
    } else {
        Tag::find_by_criteria(
            QueryCriteria::new().add_valued_filter("id", "= ANY($?)", tag_ids),
            pool,
        )
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect()
    };

    let images = AchievementImage::find_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("achievement_id", "= ANY($?)", ids.clone())
            .order_by("created_at", OrderDirection::Asc),
        pool,
    )
    .await?;

    let milestones = Milestone::find_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("achievement_id", "= ANY($?)", ids)
            .order_by("order", OrderDirection::Asc)
            .order_by("created_at", OrderDirection::Asc),
        pool,
    )
    .await?;

    let mut result = Vec::with_capacity(achievements.len());
    for achievement in achievements {
        let category = categories
            .get(&achievement.category_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("Category not found"))?;
        let tags = links
            .iter()
            .filter(|l| l.achievement_id == achievement.id)
            .filter_map(|l| tags_by_id.get(&l.tag_id).cloned())
            .collect();
        let images = images
            .iter()
            .filter(|i| i.achievement_id == achievement.id)
            .cloned()
            .collect();
        let milestones = milestones
            .iter()
            .filter(|m| m.achievement_id == achievement.id)
            .cloned()
            .map(MilestoneView::from)
            .collect();
        result.push(AchievementWithRelations {
            achievement,
            category,
            tags,
            images,
            milestones,
        });
    }
    Ok(result)
}

#[derive(Debug)]
struct ValidatedCreate {
    start_date: i64,
    end_date: Option<i64>,
    status: AchievementStatus,
}

fn validate_create(dto: &CreateAchievementDto) -> ServiceResult<ValidatedCreate> {
    if dto.title.trim().is_empty() {
        return Err(ServiceError::validation("Title is required"));
    }
    if dto.description.trim().is_empty() {
        return Err(ServiceError::validation("Description is required"));
    }
    if dto.start_date.trim().is_empty() {
        return Err(ServiceError::validation("Start date is required"));
    }
    let start_date = parse_date(&dto.start_date, "start date")?;

    let end_date = match dto.end_date.as_deref() {
        Some(raw) => {
            let end_date = parse_date(raw, "end date")?;
            if end_date <= start_date {
                return Err(ServiceError::validation("End date must be after start date"));
            }
            Some(end_date)
        }
        None => None,
    };

    if dto.category_id.trim().is_empty() {
        return Err(ServiceError::validation("Category ID is required"));
    }

    let status = dto
        .status
        .parse::<AchievementStatus>()
        .map_err(|_| ServiceError::validation("Invalid status value"))?;

    if let Some(duration_hours) = dto.duration_hours {
        if duration_hours < 0.0 {
            return Err(ServiceError::validation(
                "Duration hours must be non-negative",
            ));
        }
    }
    if let Some(team_size) = dto.team_size {
        if team_size < 1 {
            return Err(ServiceError::validation("Team size must be at least 1"));
        }
    }

    Ok(ValidatedCreate {
        start_date,
        end_date,
        status,
    })
}

#[derive(Default, Debug)]
struct ValidatedUpdate {
    start_date: Option<i64>,
    end_date: Option<i64>,
    status: Option<AchievementStatus>,
}

fn validate_update(dto: &UpdateAchievementDto) -> ServiceResult<ValidatedUpdate> {
    if let Some(title) = &dto.title {
        if title.trim().is_empty() {
            return Err(ServiceError::validation("Title cannot be empty"));
        }
    }
    if let Some(description) = &dto.description {
        if description.trim().is_empty() {
            return Err(ServiceError::validation("Description cannot be empty"));
        }
    }

    let start_date = match dto.start_date.as_deref() {
        Some(raw) => Some(parse_date(raw, "start date")?),
        None => None,
    };
    let end_date = match dto.end_date.as_deref() {
        Some(raw) => Some(parse_date(raw, "end date")?),
        None => None,
    };
    if let (Some(start_date), Some(end_date)) = (start_date, end_date) {
        if end_date <= start_date {
            return Err(ServiceError::validation("End date must be after start date"));
        }
    }

    if let Some(category_id) = &dto.category_id {
        if category_id.trim().is_empty() {
            return Err(ServiceError::validation("Category ID cannot be empty"));
        }
    }

    let status = match dto.status.as_deref() {
        Some(raw) => Some(
            raw.parse::<AchievementStatus>()
                .map_err(|_| ServiceError::validation("Invalid status value"))?,
        ),
        None => None,
    };

    if let Some(duration_hours) = dto.duration_hours {
        if duration_hours < 0.0 {
            return Err(ServiceError::validation(
                "Duration hours must be non-negative",
            ));
        }
    }
    if let Some(team_size) = dto.team_size {
        if team_size < 1 {
            return Err(ServiceError::validation("Team size must be at least 1"));
        }
    }

    Ok(ValidatedUpdate {
        start_date,
        end_date,
        status,
    })
}

#[derive(Debug)]
struct ParsedFilters {
    category_id: Option<Uuid>,
    tag_names: Vec<String>,
    start_date: Option<i64>,
    end_date: Option<i64>,
    status: Option<AchievementStatus>,
    order: Option<(&'static str, OrderDirection)>,
}

fn parse_filters(filters: &AchievementFilters) -> ServiceResult<ParsedFilters> {
    // An unparseable category id can never match a row; keep the listing
    // lenient and let it produce an empty page via the nil-uuid predicate.
    let category_id = filters
        .category_id
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| Uuid::parse_str(raw).unwrap_or(Uuid::nil()));

    let start_date = match filters.start_date.as_deref() {
        Some(raw) => Some(parse_date(raw, "start date")?),
        None => None,
    };
    let end_date = match filters.end_date.as_deref() {
        Some(raw) => Some(parse_date(raw, "end date")?),
        None => None,
    };

    let status = match filters.status.as_deref() {
        Some(raw) => Some(
            raw.parse::<AchievementStatus>()
                .map_err(|_| ServiceError::validation("Invalid status value"))?,
        ),
        None => None,
    };

    let order = match (filters.sort_by.as_deref(), filters.sort_order.as_deref()) {
        (Some(sort_by), Some(sort_order)) => {
            Some((sort_column(sort_by)?, sort_direction(sort_order)?))
        }
        _ => None,
    };

    Ok(ParsedFilters {
        category_id,
        tag_names: normalize_tag_names(&filters.tags),
        start_date,
        end_date,
        status,
        order,
    })
}

fn build_criteria(filters: &AchievementFilters, parsed: &ParsedFilters) -> QueryCriteria {
    let mut criteria = QueryCriteria::new();

    if let Some(user_id) = filters.user_id {
        criteria = criteria.add_valued_filter("user_id", "=", user_id);
    }
    if let Some(search) = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        criteria =
            criteria.add_any_column_filter(&["title", "description"], "ILIKE", format!("%{search}%"));
    }
    if let Some(category_id) = parsed.category_id {
        criteria = criteria.add_valued_filter("category_id", "=", category_id);
    }
    if !parsed.tag_names.is_empty() {
        criteria =
            criteria.add_subquery_filter("id", "IN", TAGS_SUBQUERY, parsed.tag_names.clone());
    }
    if let Some(start_date) = parsed.start_date {
        criteria = criteria.add_valued_filter("start_date", ">=", start_date);
    }
    if let Some(end_date) = parsed.end_date {
        criteria = criteria.add_valued_filter("start_date", "<=", end_date);
    }
    if let Some(status) = parsed.status {
        criteria = criteria.add_valued_filter("status", "=", status.to_string());
    }

    criteria
}

fn sort_column(sort_by: &str) -> ServiceResult<&'static str> {
    match sort_by {
        "title" => Ok("title"),
        "startDate" => Ok("start_date"),
        "endDate" => Ok("end_date"),
        "createdAt" => Ok("created_at"),
        "status" => Ok("status"),
        _ => Err(ServiceError::validation("Invalid sort field")),
    }
}

fn sort_direction(sort_order: &str) -> ServiceResult<OrderDirection> {
    match sort_order {
        "asc" => Ok(OrderDirection::Asc),
        "desc" => Ok(OrderDirection::Desc),
        _ => Err(ServiceError::validation("Invalid sort order")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_dto() -> CreateAchievementDto {
        CreateAchievementDto {
            title: "Shipped the importer".into(),
            description: "Parser rework".into(),
            start_date: "2024-01-01".into(),
            category_id: Uuid::new_v4().to_string(),
            status: "complete".into(),
            ..Default::default()
        }
    }

    fn validation_message(result: ServiceResult<ValidatedCreate>) -> String {
        match result.unwrap_err() {
            ServiceError::Validation(message) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_requires_title_description_start_date() {
        let mut dto = valid_dto();
        dto.title = "   ".into();
        assert_eq!(validation_message(validate_create(&dto)), "Title is required");

        let mut dto = valid_dto();
        dto.description = String::new();
        assert_eq!(
            validation_message(validate_create(&dto)),
            "Description is required"
        );

        let mut dto = valid_dto();
        dto.start_date = String::new();
        assert_eq!(
            validation_message(validate_create(&dto)),
            "Start date is required"
        );
    }

    #[test]
    fn create_rejects_malformed_dates() {
        let mut dto = valid_dto();
        dto.start_date = "yesterday".into();
        assert_eq!(
            validation_message(validate_create(&dto)),
            "Invalid start date format"
        );

        let mut dto = valid_dto();
        dto.end_date = Some("tomorrow".into());
        assert_eq!(
            validation_message(validate_create(&dto)),
            "Invalid end date format"
        );
    }

    #[test]
    fn create_rejects_end_before_start() {
        let mut dto = valid_dto();
        dto.start_date = "2024-02-01".into();
        dto.end_date = Some("2024-01-01".into());
        assert_eq!(
            validation_message(validate_create(&dto)),
            "End date must be after start date"
        );

        // Equal dates are rejected too: "after" is strict.
        let mut dto = valid_dto();
        dto.start_date = "2024-02-01".into();
        dto.end_date = Some("2024-02-01".into());
        assert_eq!(
            validation_message(validate_create(&dto)),
            "End date must be after start date"
        );
    }

    #[test]
    fn create_rejects_bad_status_and_ranges() {
        let mut dto = valid_dto();
        dto.status = "high".into();
        assert_eq!(
            validation_message(validate_create(&dto)),
            "Invalid status value"
        );

        let mut dto = valid_dto();
        dto.duration_hours = Some(-1.0);
        assert_eq!(
            validation_message(validate_create(&dto)),
            "Duration hours must be non-negative"
        );

        let mut dto = valid_dto();
        dto.team_size = Some(0);
        assert_eq!(
            validation_message(validate_create(&dto)),
            "Team size must be at least 1"
        );
    }

    #[test]
    fn update_messages_use_cannot_be_empty() {
        let dto = UpdateAchievementDto {
            title: Some("  ".into()),
            ..Default::default()
        };
        match validate_update(&dto).unwrap_err() {
            ServiceError::Validation(message) => assert_eq!(message, "Title cannot be empty"),
            other => panic!("unexpected {other:?}"),
        }

        let dto = UpdateAchievementDto {
            category_id: Some(String::new()),
            ..Default::default()
        };
        match validate_update(&dto).unwrap_err() {
            ServiceError::Validation(message) => {
                assert_eq!(message, "Category ID cannot be empty")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn update_accepts_partial_payloads() {
        let dto = UpdateAchievementDto::default();
        assert!(validate_update(&dto).is_ok());

        let dto = UpdateAchievementDto {
            status: Some("usable".into()),
            ..Default::default()
        };
        let parsed = validate_update(&dto).unwrap();
        assert_eq!(parsed.status, Some(AchievementStatus::Usable));
    }

    #[test]
    fn tag_names_are_normalized_and_deduped() {
        let names = vec![
            "React".to_string(),
            "  react ".to_string(),
            "TypeScript".to_string(),
            "".to_string(),
        ];
        assert_eq!(normalize_tag_names(&names), vec!["react", "typescript"]);
    }

    #[test]
    fn sort_fields_are_whitelisted() {
        assert_eq!(sort_column("startDate").unwrap(), "start_date");
        assert_eq!(sort_column("createdAt").unwrap(), "created_at");
        assert!(sort_column("priority").is_err());
        assert!(sort_column("user_id; DROP TABLE").is_err());
        assert!(sort_direction("desc").is_ok());
        assert!(sort_direction("sideways").is_err());
    }

    #[test]
    fn filters_build_expected_predicates() {
        let filters = AchievementFilters {
            search: Some("rust".into()),
            tags: vec!["Tag1".into(), "tag2".into()],
            status: Some("idea".into()),
            user_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let parsed = parse_filters(&filters).unwrap();
        assert_eq!(parsed.tag_names, vec!["tag1", "tag2"]);
        let criteria = build_criteria(&filters, &parsed);
        // user scoping + search + tags + status
        assert_eq!(criteria.conditions.len(), 4);
    }

    #[test]
    fn unknown_status_filter_is_a_validation_error() {
        let filters = AchievementFilters {
            status: Some("urgent".into()),
            ..Default::default()
        };
        assert!(matches!(
            parse_filters(&filters).unwrap_err(),
            ServiceError::Validation(_)
        ));
    }
}
