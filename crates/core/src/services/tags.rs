use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use sqlx::PgPool;

use bragger_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery};

use crate::{AchievementTag, ServiceError, ServiceResult, Tag, TagWithStats};

use super::{page_window, Paginated};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTagDto {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTagDto {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagFilters {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn create(pool: &PgPool, dto: CreateTagDto) -> ServiceResult<Tag> {
    if dto.name.trim().is_empty() {
        return Err(ServiceError::validation("Tag name is required"));
    }

    // Lowercase before storage; uniqueness is therefore case-insensitive.
    let normalized = dto.name.to_lowercase();

    let existing = Tag::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("name", "=", normalized.clone()),
        pool,
    )
    .await?;
    if existing.is_some() {
        return Err(ServiceError::conflict("Tag name already exists"));
    }

    Ok(Tag::new(normalized).create(pool).await?)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> ServiceResult<Option<Tag>> {
    Ok(Tag::find_by_id(id, pool).await?)
}

pub async fn find_all(pool: &PgPool, filters: &TagFilters) -> ServiceResult<Paginated<Tag>> {
    let (page, page_size, offset) = page_window(filters.page, filters.page_size);

    let total = Tag::count_by_criteria(search_criteria(filters), pool).await?;
    let data = Tag::find_by_criteria(
        search_criteria(filters)
            .order_by("name", OrderDirection::Asc)
            .limit(page_size)
            .offset(offset),
        pool,
    )
    .await?;

    Ok(Paginated::new(data, total, page, page_size))
}

/// Listing variant joining each tag's usage count across achievements.
pub async fn find_all_with_stats(
    pool: &PgPool,
    filters: &TagFilters,
) -> ServiceResult<Paginated<TagWithStats>> {
    let (page, page_size, offset) = page_window(filters.page, filters.page_size);

    let total = Tag::count_by_criteria(search_criteria(filters), pool).await?;

    let search = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut sql = String::from(
        "SELECT t.\"id\", t.\"name\", t.\"created_at\", \
         COUNT(at.\"id\") AS \"usage_count\" \
         FROM \"tags\" t \
         LEFT JOIN \"achievement_tags\" at ON at.\"tag_id\" = t.\"id\"",
    );
    if search.is_some() {
        sql.push_str(" WHERE t.\"name\" ILIKE $3");
    }
    sql.push_str(
        " GROUP BY t.\"id\", t.\"name\", t.\"created_at\" \
         ORDER BY t.\"name\" ASC LIMIT $1 OFFSET $2",
    );

    let query = sqlx::query_as::<_, TagStatsRow>(&sql)
        .bind(page_size)
        .bind(offset);
    let rows = match search {
        Some(search) => query.bind(format!("%{search}%")),
        None => query,
    }
    .fetch_all(pool)
    .await?;

    let data = rows.into_iter().map(TagStatsRow::into_stats).collect();
    Ok(Paginated::new(data, total, page, page_size))
}

pub async fn update(pool: &PgPool, id: Uuid, dto: UpdateTagDto) -> ServiceResult<Tag> {
    if let Some(name) = &dto.name {
        if name.trim().is_empty() {
            return Err(ServiceError::validation("Tag name cannot be empty"));
        }
    }

    let mut tag = Tag::find_by_id(id, pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Tag not found"))?;

    if let Some(name) = dto.name {
        let normalized = name.to_lowercase();
        if normalized != tag.name {
            let conflicting = Tag::find_one_by_criteria(
                QueryCriteria::new().add_valued_filter("name", "=", normalized.clone()),
                pool,
            )
            .await?;
            if conflicting.is_some() {
                return Err(ServiceError::conflict("Tag name already exists"));
            }
        }
        tag.name = normalized;
    }

    Ok(tag.update(pool).await?)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> ServiceResult<()> {
    let tag = Tag::find_by_id(id, pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Tag not found"))?;

    let dependents = AchievementTag::count_by_criteria(
        QueryCriteria::new().add_valued_filter("tag_id", "=", id),
        pool,
    )
    .await?;
    if dependents > 0 {
        return Err(ServiceError::conflict(
            "Cannot delete tag that is in use by achievements",
        ));
    }

    tag.delete(pool).await?;
    Ok(())
}

/// Finds tags matching any of the given names (lowercase-normalized).
pub async fn find_by_names(pool: &PgPool, names: &[String]) -> ServiceResult<Vec<Tag>> {
    let normalized = super::achievements::normalize_tag_names(names);
    if normalized.is_empty() {
        return Ok(Vec::new());
    }
    Ok(Tag::find_by_criteria(
        QueryCriteria::new().add_valued_filter("name", "= ANY($?)", normalized),
        pool,
    )
    .await?)
}

fn search_criteria(filters: &TagFilters) -> QueryCriteria {
    let mut criteria = QueryCriteria::new();
    if let Some(search) = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        criteria = criteria.add_valued_filter("name", "ILIKE", format!("%{search}%"));
    }
    criteria
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct TagStatsRow {
    id: Uuid,
    name: String,
    created_at: i64,
    usage_count: i64,
}

impl TagStatsRow {
    fn into_stats(self) -> TagWithStats {
        TagWithStats {
            tag: Tag {
                id: self.id,
                name: self.name,
                created_at: self.created_at,
            },
            usage_count: self.usage_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_row_flattens_into_wire_shape() {
        let row = TagStatsRow {
            id: Uuid::new_v4(),
            name: "react".into(),
            created_at: 1_700_000_000,
            usage_count: 5,
        };
        let json = serde_json::to_value(row.into_stats()).unwrap();
        assert_eq!(json["name"], "react");
        assert_eq!(json["usageCount"], 5);
    }
}
