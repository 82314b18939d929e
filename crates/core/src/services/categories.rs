use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use sqlx::PgPool;

use bragger_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery};

use crate::{Achievement, Category, CategoryWithStats, ServiceError, ServiceResult};

use super::{page_window, Paginated};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateCategoryDto {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateCategoryDto {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryFilters {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn create(pool: &PgPool, dto: CreateCategoryDto) -> ServiceResult<Category> {
    validate_create(&dto)?;

    let existing = Category::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("name", "=", dto.name.clone()),
        pool,
    )
    .await?;
    if existing.is_some() {
        return Err(ServiceError::conflict("Category name already exists"));
    }

    Ok(Category::new(dto.name, dto.color).create(pool).await?)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> ServiceResult<Option<Category>> {
    Ok(Category::find_by_id(id, pool).await?)
}

pub async fn find_all(
    pool: &PgPool,
    filters: &CategoryFilters,
) -> ServiceResult<Paginated<Category>> {
    let (page, page_size, offset) = page_window(filters.page, filters.page_size);

    let total = Category::count_by_criteria(search_criteria(filters), pool).await?;
    let data = Category::find_by_criteria(
        search_criteria(filters)
            .order_by("name", OrderDirection::Asc)
            .limit(page_size)
            .offset(offset),
        pool,
    )
    .await?;

    Ok(Paginated::new(data, total, page, page_size))
}

/// Listing variant joining the per-category achievement count.
pub async fn find_all_with_stats(
    pool: &PgPool,
    filters: &CategoryFilters,
) -> ServiceResult<Paginated<CategoryWithStats>> {
    let (page, page_size, offset) = page_window(filters.page, filters.page_size);

    let total = Category::count_by_criteria(search_criteria(filters), pool).await?;

    let search = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut sql = String::from(
        "SELECT c.\"id\", c.\"name\", c.\"color\", c.\"created_at\", \
         COUNT(a.\"id\") AS \"achievement_count\" \
         FROM \"categories\" c \
         LEFT JOIN \"achievements\" a ON a.\"category_id\" = c.\"id\"",
    );
    if search.is_some() {
        sql.push_str(" WHERE c.\"name\" ILIKE $3");
    }
    sql.push_str(
        " GROUP BY c.\"id\", c.\"name\", c.\"color\", c.\"created_at\" \
         ORDER BY c.\"name\" ASC LIMIT $1 OFFSET $2",
    );

    let query = sqlx::query_as::<_, CategoryStatsRow>(&sql)
        .bind(page_size)
        .bind(offset);
    let rows = match search {
        Some(search) => query.bind(format!("%{search}%")),
        None => query,
    }
    .fetch_all(pool)
    .await?;

    let data = rows.into_iter().map(CategoryStatsRow::into_stats).collect();
    Ok(Paginated::new(data, total, page, page_size))
}

pub async fn update(pool: &PgPool, id: Uuid, dto: UpdateCategoryDto) -> ServiceResult<Category> {
    validate_update(&dto)?;

    let mut category = Category::find_by_id(id, pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Category not found"))?;

    if let Some(name) = dto.name {
        if name != category.name {
            let conflicting = Category::find_one_by_criteria(
                QueryCriteria::new().add_valued_filter("name", "=", name.clone()),
                pool,
            )
            .await?;
            if conflicting.is_some() {
                return Err(ServiceError::conflict("Category name already exists"));
            }
        }
        category.name = name;
    }
    if let Some(color) = dto.color {
        category.color = Some(color);
    }

    Ok(category.update(pool).await?)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> ServiceResult<()> {
    let category = Category::find_by_id(id, pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Category not found"))?;

    let dependents = Achievement::count_by_criteria(
        QueryCriteria::new().add_valued_filter("category_id", "=", id),
        pool,
    )
    .await?;
    if dependents > 0 {
        return Err(ServiceError::conflict(
            "Cannot delete category that is in use by achievements",
        ));
    }

    category.delete(pool).await?;
    Ok(())
}

fn search_criteria(filters: &CategoryFilters) -> QueryCriteria {
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

fn validate_create(dto: &CreateCategoryDto) -> ServiceResult<()> {
    if dto.name.trim().is_empty() {
        return Err(ServiceError::validation("Category name is required"));
    }
    if let Some(color) = &dto.color {
        if !is_valid_color(color) {
            return Err(ServiceError::validation("Invalid color format"));
        }
    }
    Ok(())
}

fn validate_update(dto: &UpdateCategoryDto) -> ServiceResult<()> {
    if let Some(name) = &dto.name {
        if name.trim().is_empty() {
            return Err(ServiceError::validation("Category name cannot be empty"));
        }
    }
    if let Some(color) = &dto.color {
        if !is_valid_color(color) {
            return Err(ServiceError::validation("Invalid color format"));
        }
    }
    Ok(())
}

/// Hex color of the shape `#RRGGBB`.
fn is_valid_color(color: &str) -> bool {
    let bytes = color.as_bytes();
    bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(u8::is_ascii_hexdigit)
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CategoryStatsRow {
    id: Uuid,
    name: String,
    color: Option<String>,
    created_at: i64,
    achievement_count: i64,
}

impl CategoryStatsRow {
    fn into_stats(self) -> CategoryWithStats {
        CategoryWithStats {
            category: Category {
                id: self.id,
                name: self.name,
                color: self.color,
                created_at: self.created_at,
            },
            achievement_count: self.achievement_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_six_digit_hex_colors_only() {
        assert!(is_valid_color("#3b82f6"));
        assert!(is_valid_color("#FFFFFF"));
        assert!(!is_valid_color("3b82f6"));
        assert!(!is_valid_color("#3b82f"));
        assert!(!is_valid_color("#3b82f61"));
        assert!(!is_valid_color("#3b82fg"));
    }

    #[test]
    fn create_validation_messages() {
        let dto = CreateCategoryDto {
            name: " ".into(),
            color: None,
        };
        assert_eq!(
            validate_create(&dto).unwrap_err().to_string(),
            "Category name is required"
        );

        let dto = CreateCategoryDto {
            name: "Development".into(),
            color: Some("blue".into()),
        };
        assert_eq!(
            validate_create(&dto).unwrap_err().to_string(),
            "Invalid color format"
        );
    }

    #[test]
    fn update_validation_messages() {
        let dto = UpdateCategoryDto {
            name: Some(String::new()),
            color: None,
        };
        assert_eq!(
            validate_update(&dto).unwrap_err().to_string(),
            "Category name cannot be empty"
        );

        let dto = UpdateCategoryDto {
            name: None,
            color: None,
        };
        assert!(validate_update(&dto).is_ok());
    }

    #[test]
    fn stats_row_flattens_into_wire_shape() {
        let row = CategoryStatsRow {
            id: Uuid::new_v4(),
            name: "Development".into(),
            color: Some("#3b82f6".into()),
            created_at: 1_700_000_000,
            achievement_count: 4,
        };
        let json = serde_json::to_value(row.into_stats()).unwrap();
        assert_eq!(json["name"], "Development");
        assert_eq!(json["achievementCount"], 4);
        assert_eq!(json["createdAt"], 1_700_000_000i64);
    }
}
