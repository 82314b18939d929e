use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use sqlx::PgPool;

use bragger_database::{QueryCriteria, SqlxCrud, SqlxFilterQuery};

use crate::{Achievement, AchievementImage, ServiceError, ServiceResult};

/// A file already written to disk, ready to be recorded against an
/// achievement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewImageFile {
    pub filename: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
}

/// Records uploaded files against an owned achievement.
pub async fn attach(
    pool: &PgPool,
    achievement_id: Uuid,
    user_id: Uuid,
    files: Vec<NewImageFile>,
) -> ServiceResult<Vec<AchievementImage>> {
    Achievement::find_one_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("id", "=", achievement_id)
            .add_valued_filter("user_id", "=", user_id),
        pool,
    )
    .await?
    .ok_or_else(|| ServiceError::not_found("Achievement not found"))?;

    let mut images = Vec::with_capacity(files.len());
    for file in files {
        let image = AchievementImage::new(
            achievement_id,
            file.filename,
            file.original_name,
            file.file_path,
            file.file_size,
            file.mime_type,
        )
        .create(pool)
        .await?;
        images.push(image);
    }
    Ok(images)
}

pub async fn find_by_filename(
    pool: &PgPool,
    filename: &str,
) -> ServiceResult<Option<AchievementImage>> {
    Ok(AchievementImage::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("filename", "=", filename.to_string()),
        pool,
    )
    .await?)
}

/// Removes the row and hands the caller the deleted record so the file on
/// disk can be unlinked as well.
pub async fn delete(pool: &PgPool, id: Uuid) -> ServiceResult<AchievementImage> {
    let image = AchievementImage::find_by_id(id, pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Image not found"))?;

    image.clone().delete(pool).await?;
    Ok(image)
}
