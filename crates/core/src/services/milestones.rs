use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use sqlx::PgPool;

use bragger_common::get_current_timestamp;
use bragger_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery};

use crate::{Achievement, Milestone, MilestoneView, ServiceError, ServiceResult};

use super::parse_date;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateMilestoneDto {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub order: Option<i64>,
}

/// Partial update. Completion is driven by `isCompleted` alone:
/// true stamps `completed_at` with the current time, false clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateMilestoneDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub order: Option<i64>,
    pub is_completed: Option<bool>,
}

/// Lists an achievement's milestones, "order" first, creation time second.
pub async fn list(
    pool: &PgPool,
    achievement_id: Uuid,
    user_id: Uuid,
) -> ServiceResult<Vec<MilestoneView>> {
    ensure_achievement(pool, achievement_id, user_id).await?;

    let milestones = Milestone::find_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("achievement_id", "=", achievement_id)
            .add_valued_filter("user_id", "=", user_id)
            .order_by("order", OrderDirection::Asc)
            .order_by("created_at", OrderDirection::Asc),
        pool,
    )
    .await?;

    Ok(milestones.into_iter().map(MilestoneView::from).collect())
}

pub async fn create(
    pool: &PgPool,
    achievement_id: Uuid,
    user_id: Uuid,
    dto: CreateMilestoneDto,
) -> ServiceResult<MilestoneView> {
    ensure_achievement(pool, achievement_id, user_id).await?;

    if dto.title.trim().is_empty() {
        return Err(ServiceError::validation("Title is required"));
    }
    let due_date = match dto.due_date.as_deref() {
        Some(raw) => Some(parse_date(raw, "due date")?),
        None => None,
    };

    let milestone = Milestone::new(
        achievement_id,
        user_id,
        dto.title,
        dto.description,
        due_date,
        dto.order.unwrap_or(0),
    )
    .create(pool)
    .await?;

    Ok(MilestoneView::from(milestone))
}

pub async fn update(
    pool: &PgPool,
    milestone_id: Uuid,
    user_id: Uuid,
    dto: UpdateMilestoneDto,
) -> ServiceResult<MilestoneView> {
    if let Some(title) = &dto.title {
        if title.trim().is_empty() {
            return Err(ServiceError::validation("Title cannot be empty"));
        }
    }
    let due_date = match dto.due_date.as_deref() {
        Some(raw) => Some(parse_date(raw, "due date")?),
        None => None,
    };

    let mut milestone = Milestone::find_one_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("id", "=", milestone_id)
            .add_valued_filter("user_id", "=", user_id),
        pool,
    )
    .await?
    .ok_or_else(|| ServiceError::not_found("Milestone not found"))?;

    if let Some(title) = dto.title {
        milestone.title = title;
    }
    if let Some(description) = dto.description {
        milestone.description = Some(description);
    }
    if let Some(due_date) = due_date {
        milestone.due_date = Some(due_date);
    }
    if let Some(order) = dto.order {
        milestone.order = order;
    }
    if let Some(is_completed) = dto.is_completed {
        milestone.completed_at = if is_completed {
            Some(get_current_timestamp())
        } else {
            None
        };
    }

    milestone.updated_at = get_current_timestamp();
    let milestone = milestone.update(pool).await?;

    Ok(MilestoneView::from(milestone))
}

pub async fn delete(pool: &PgPool, milestone_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
    let deleted = Milestone::delete_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("id", "=", milestone_id)
            .add_valued_filter("user_id", "=", user_id),
        pool,
    )
    .await?;

    if deleted == 0 {
        return Err(ServiceError::not_found("Milestone not found"));
    }
    Ok(())
}

/// The owning achievement gates every milestone operation.
async fn ensure_achievement(
    pool: &PgPool,
    achievement_id: Uuid,
    user_id: Uuid,
) -> ServiceResult<Achievement> {
    Achievement::find_one_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("id", "=", achievement_id)
            .add_valued_filter("user_id", "=", user_id),
        pool,
    )
    .await?
    .ok_or_else(|| ServiceError::not_found("Achievement not found"))
}
