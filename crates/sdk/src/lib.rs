//! Typed client for the Bragger REST API.
//!
//! Wraps `reqwest` with bearer-token injection, query-string building from
//! the same filter structs the server parses, and non-2xx responses surfaced
//! as [`ClientError::Api`] with the parsed error body attached.

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use bragger_core::services::achievements::{
    AchievementFilters, CreateAchievementDto, UpdateAchievementDto,
};
use bragger_core::services::categories::{CategoryFilters, CreateCategoryDto, UpdateCategoryDto};
use bragger_core::services::milestones::{CreateMilestoneDto, UpdateMilestoneDto};
use bragger_core::services::tags::{CreateTagDto, TagFilters, UpdateTagDto};
use bragger_core::services::Paginated;
use bragger_core::{
    AchievementImage, AchievementWithRelations, Category, CategoryWithStats, MilestoneView, Tag,
    TagWithStats, User,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Deserialize)]
struct Envelope<T> {
    #[allow(dead_code)]
    success: bool,
    #[allow(dead_code)]
    message: Option<String>,
    data: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct Bragger {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl Bragger {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Returns a client that sends the given bearer token on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    // --- auth ---

    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<AuthPayload, ClientError> {
        self.send(self.request(Method::POST, "/api/auth/register").json(&json!({
            "email": email,
            "name": name,
            "password": password,
        })))
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ClientError> {
        self.send(self.request(Method::POST, "/api/auth/login").json(&json!({
            "email": email,
            "password": password,
        })))
        .await
    }

    pub async fn profile(&self) -> Result<User, ClientError> {
        self.send(self.request(Method::GET, "/api/auth/profile"))
            .await
    }

    // --- achievements ---

    pub async fn list_achievements(
        &self,
        filters: &AchievementFilters,
    ) -> Result<Paginated<AchievementWithRelations>, ClientError> {
        let query = achievement_query_pairs(filters);
        self.send(
            self.request(Method::GET, "/api/achievements")
                .query(&query),
        )
        .await
    }

    pub async fn get_achievement(
        &self,
        id: Uuid,
    ) -> Result<AchievementWithRelations, ClientError> {
        self.send(self.request(Method::GET, &format!("/api/achievements/{id}")))
            .await
    }

    pub async fn create_achievement(
        &self,
        dto: &CreateAchievementDto,
    ) -> Result<AchievementWithRelations, ClientError> {
        self.send(self.request(Method::POST, "/api/achievements").json(dto))
            .await
    }

    pub async fn update_achievement(
        &self,
        id: Uuid,
        dto: &UpdateAchievementDto,
    ) -> Result<AchievementWithRelations, ClientError> {
        self.send(
            self.request(Method::PUT, &format!("/api/achievements/{id}"))
                .json(dto),
        )
        .await
    }

    pub async fn delete_achievement(&self, id: Uuid) -> Result<(), ClientError> {
        self.send::<serde_json::Value>(
            self.request(Method::DELETE, &format!("/api/achievements/{id}")),
        )
        .await
        .map(|_| ())
    }

    // --- categories ---

    pub async fn list_categories(
        &self,
        filters: &CategoryFilters,
    ) -> Result<Paginated<Category>, ClientError> {
        self.send(
            self.request(Method::GET, "/api/categories")
                .query(&listing_query_pairs(&filters.search, filters.page, filters.page_size)),
        )
        .await
    }

    pub async fn list_categories_with_stats(
        &self,
        filters: &CategoryFilters,
    ) -> Result<Paginated<CategoryWithStats>, ClientError> {
        let mut query = listing_query_pairs(&filters.search, filters.page, filters.page_size);
        query.push(("includeStats", "true".to_string()));
        self.send(self.request(Method::GET, "/api/categories").query(&query))
            .await
    }

    pub async fn get_category(&self, id: Uuid) -> Result<Category, ClientError> {
        self.send(self.request(Method::GET, &format!("/api/categories/{id}")))
            .await
    }

    pub async fn create_category(&self, dto: &CreateCategoryDto) -> Result<Category, ClientError> {
        self.send(self.request(Method::POST, "/api/categories").json(dto))
            .await
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        dto: &UpdateCategoryDto,
    ) -> Result<Category, ClientError> {
        self.send(
            self.request(Method::PUT, &format!("/api/categories/{id}"))
                .json(dto),
        )
        .await
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), ClientError> {
        self.send::<serde_json::Value>(
            self.request(Method::DELETE, &format!("/api/categories/{id}")),
        )
        .await
        .map(|_| ())
    }

    // --- tags ---

    pub async fn list_tags(&self, filters: &TagFilters) -> Result<Paginated<Tag>, ClientError> {
        self.send(
            self.request(Method::GET, "/api/tags")
                .query(&listing_query_pairs(&filters.search, filters.page, filters.page_size)),
        )
        .await
    }

    pub async fn list_tags_with_stats(
        &self,
        filters: &TagFilters,
    ) -> Result<Paginated<TagWithStats>, ClientError> {
        let mut query = listing_query_pairs(&filters.search, filters.page, filters.page_size);
        query.push(("includeStats", "true".to_string()));
        self.send(self.request(Method::GET, "/api/tags").query(&query))
            .await
    }

    pub async fn get_tag(&self, id: Uuid) -> Result<Tag, ClientError> {
        self.send(self.request(Method::GET, &format!("/api/tags/{id}")))
            .await
    }

    pub async fn create_tag(&self, dto: &CreateTagDto) -> Result<Tag, ClientError> {
        self.send(self.request(Method::POST, "/api/tags").json(dto))
            .await
    }

    pub async fn update_tag(&self, id: Uuid, dto: &UpdateTagDto) -> Result<Tag, ClientError> {
        self.send(self.request(Method::PUT, &format!("/api/tags/{id}")).json(dto))
            .await
    }

    pub async fn delete_tag(&self, id: Uuid) -> Result<(), ClientError> {
        self.send::<serde_json::Value>(self.request(Method::DELETE, &format!("/api/tags/{id}")))
            .await
            .map(|_| ())
    }

    // --- milestones ---

    pub async fn list_milestones(
        &self,
        achievement_id: Uuid,
    ) -> Result<Vec<MilestoneView>, ClientError> {
        self.send(self.request(
            Method::GET,
            &format!("/api/achievements/{achievement_id}/milestones"),
        ))
        .await
    }

    pub async fn create_milestone(
        &self,
        achievement_id: Uuid,
        dto: &CreateMilestoneDto,
    ) -> Result<MilestoneView, ClientError> {
        self.send(
            self.request(
                Method::POST,
                &format!("/api/achievements/{achievement_id}/milestones"),
            )
            .json(dto),
        )
        .await
    }

    pub async fn update_milestone(
        &self,
        achievement_id: Uuid,
        milestone_id: Uuid,
        dto: &UpdateMilestoneDto,
    ) -> Result<MilestoneView, ClientError> {
        self.send(
            self.request(
                Method::PUT,
                &format!("/api/achievements/{achievement_id}/milestones/{milestone_id}"),
            )
            .json(dto),
        )
        .await
    }

    pub async fn delete_milestone(
        &self,
        achievement_id: Uuid,
        milestone_id: Uuid,
    ) -> Result<(), ClientError> {
        self.send::<serde_json::Value>(self.request(
            Method::DELETE,
            &format!("/api/achievements/{achievement_id}/milestones/{milestone_id}"),
        ))
        .await
        .map(|_| ())
    }

    // --- images ---

    pub async fn delete_image(&self, id: Uuid) -> Result<(), ClientError> {
        self.send::<serde_json::Value>(self.request(Method::DELETE, &format!("/api/images/{id}")))
            .await
            .map(|_| ())
    }

    pub async fn download_image(&self, filename: &str) -> Result<Vec<u8>, ClientError> {
        let response = self
            .request(Method::GET, &format!("/api/images/{filename}"))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.api_error(status, response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Uploads image files against an achievement via multipart form data.
    pub async fn upload_images(
        &self,
        achievement_id: Uuid,
        files: Vec<(String, String, Vec<u8>)>,
    ) -> Result<Vec<AchievementImage>, ClientError> {
        let mut form = reqwest::multipart::Form::new();
        for (filename, mime_type, data) in files {
            let part = reqwest::multipart::Part::bytes(data)
                .file_name(filename)
                .mime_str(&mime_type)
                .map_err(|e| ClientError::Malformed(e.to_string()))?;
            form = form.part("images", part);
        }
        self.send(
            self.request(
                Method::POST,
                &format!("/api/achievements/{achievement_id}/images"),
            )
            .multipart(form),
        )
        .await
    }

    // --- misc ---

    /// The health probe replies without the response envelope.
    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let response = self.request(Method::GET, "/health").send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.api_error(status, response).await);
        }
        Ok(response.json().await?)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.api_error(status, response).await);
        }

        let body = response.json::<Envelope<T>>().await?;
        if let Some(error) = body.error {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error,
            });
        }
        body.data
            .ok_or_else(|| ClientError::Malformed("missing data field".to_string()))
    }

    async fn api_error(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ClientError {
        let message = response
            .json::<Envelope<serde_json::Value>>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Builds the query pairs for the achievement listing, repeating the `tags`
/// key the way the server expects.
pub fn achievement_query_pairs(filters: &AchievementFilters) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(search) = &filters.search {
        pairs.push(("search", search.clone()));
    }
    if let Some(category_id) = &filters.category_id {
        pairs.push(("categoryId", category_id.clone()));
    }
    for tag in &filters.tags {
        pairs.push(("tags", tag.clone()));
    }
    if let Some(start_date) = &filters.start_date {
        pairs.push(("startDate", start_date.clone()));
    }
    if let Some(end_date) = &filters.end_date {
        pairs.push(("endDate", end_date.clone()));
    }
    if let Some(status) = &filters.status {
        pairs.push(("status", status.clone()));
    }
    if let Some(sort_by) = &filters.sort_by {
        pairs.push(("sortBy", sort_by.clone()));
    }
    if let Some(sort_order) = &filters.sort_order {
        pairs.push(("sortOrder", sort_order.clone()));
    }
    if let Some(page) = filters.page {
        pairs.push(("page", page.to_string()));
    }
    if let Some(page_size) = filters.page_size {
        pairs.push(("pageSize", page_size.to_string()));
    }
    pairs
}

fn listing_query_pairs(
    search: &Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(search) = search {
        pairs.push(("search", search.clone()));
    }
    if let Some(page) = page {
        pairs.push(("page", page.to_string()));
    }
    if let Some(page_size) = page_size {
        pairs.push(("pageSize", page_size.to_string()));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_the_tags_key() {
        let filters = AchievementFilters {
            search: Some("rust".into()),
            tags: vec!["tag1".into(), "tag2".into()],
            page: Some(2),
            page_size: Some(5),
            ..Default::default()
        };
        let pairs = achievement_query_pairs(&filters);
        assert_eq!(
            pairs,
            vec![
                ("search", "rust".to_string()),
                ("tags", "tag1".to_string()),
                ("tags", "tag2".to_string()),
                ("page", "2".to_string()),
                ("pageSize", "5".to_string()),
            ]
        );
    }

    #[test]
    fn skips_absent_filters() {
        assert!(achievement_query_pairs(&AchievementFilters::default()).is_empty());
    }

    #[test]
    fn envelope_parses_success_and_error_bodies() {
        let success: Envelope<Vec<i32>> = serde_json::from_str(
            r#"{"success": true, "message": "ok", "data": [1, 2, 3]}"#,
        )
        .unwrap();
        assert_eq!(success.data, Some(vec![1, 2, 3]));

        let failure: Envelope<Vec<i32>> =
            serde_json::from_str(r#"{"success": false, "error": "Tag not found"}"#).unwrap();
        assert_eq!(failure.error.as_deref(), Some("Tag not found"));
        assert!(failure.data.is_none());
    }
}
