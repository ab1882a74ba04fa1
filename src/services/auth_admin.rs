use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(thiserror::Error, Debug)]
pub enum AuthAdminError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Auth API error: {status} - {message}")]
    ApiError { status: StatusCode, message: String },

    #[error("Auth user not found: {0}")]
    UserNotFound(Uuid),
}

/// A user record from the Supabase Auth admin API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUser {
    pub fn full_name(&self) -> String {
        self.user_metadata
            .get("full_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct UserListResponse {
    #[serde(default)]
    users: Vec<AuthUser>,
}

#[derive(Debug, Serialize)]
struct CreateUserRequest<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
}

/// Client for the `/auth/v1/admin` endpoints, authenticated with the
/// service role key.
#[derive(Clone)]
pub struct AuthAdminClient {
    client: Client,
    base_url: String,
    service_key: Secret<String>,
    page_size: usize,
}

impl AuthAdminClient {
    pub fn new(base_url: &str, service_key: Secret<String>) -> Result<Self, AuthAdminError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_key.expose_secret();
        request
            .header("apikey", key.as_str())
            .header("Authorization", format!("Bearer {}", key))
    }

    /// Fetches one page of users (pages start at 1)
    #[tracing::instrument(skip(self))]
    pub async fn list_users_page(&self, page: usize) -> Result<Vec<AuthUser>, AuthAdminError> {
        let response = self
            .authorized(self.client.get(self.users_url()))
            .query(&[("page", page), ("per_page", self.page_size)])
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let body: UserListResponse = response.json().await?;
        Ok(body.users)
    }

    /// Walks every page until a short or empty page comes back
    pub async fn list_all_users(&self) -> Result<Vec<AuthUser>, AuthAdminError> {
        let mut users = Vec::new();
        let mut page = 1;

        loop {
            let batch = self.list_users_page(page).await?;
            let batch_len = batch.len();
            users.extend(batch);

            tracing::debug!(page, batch_len, total = users.len(), "Fetched auth users page");

            if batch_len < self.page_size {
                break;
            }
            page += 1;
        }

        tracing::info!(total = users.len(), "Loaded auth users");
        Ok(users)
    }

    /// Maps user IDs to their email addresses
    pub async fn email_directory(&self) -> Result<HashMap<Uuid, String>, AuthAdminError> {
        let users = self.list_all_users().await?;
        Ok(users
            .into_iter()
            .filter_map(|user| user.email.map(|email| (user.id, email)))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<AuthUser, AuthAdminError> {
        let response = self
            .authorized(self.client.get(format!("{}/{}", self.users_url(), user_id)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AuthAdminError::UserNotFound(user_id));
        }

        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }

    /// Creates a user with a pre-confirmed email address
    #[tracing::instrument(skip(self, password))]
    pub async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, AuthAdminError> {
        let response = self
            .authorized(self.client.post(self.users_url()))
            .json(&CreateUserRequest {
                email,
                password,
                email_confirm: true,
            })
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let user: AuthUser = response.json().await?;

        tracing::info!(user_id = %user.id, "Created auth user");
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthAdminError> {
        let response = self
            .authorized(self.client.delete(format!("{}/{}", self.users_url(), user_id)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AuthAdminError::UserNotFound(user_id));
        }

        error_for_status(response).await?;
        Ok(())
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, AuthAdminError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    tracing::error!(status = %status, error = %message, "Auth admin request failed");

    Err(AuthAdminError::ApiError { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AuthAdminClient {
        AuthAdminClient::new(&server.uri(), Secret::new("service-key".to_string())).unwrap()
    }

    fn user(id: Uuid, email: &str) -> serde_json::Value {
        json!({
            "id": id,
            "email": email,
            "user_metadata": { "full_name": "Test User" }
        })
    }

    #[tokio::test]
    async fn test_list_all_users_follows_pages() {
        let server = MockServer::start().await;
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        Mock::given(method("GET"))
            .and(path("/auth/v1/admin/users"))
            .and(query_param("page", "1"))
            .and(header("apikey", "service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [user(a, "a@example.com"), user(b, "b@example.com")]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/admin/users"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [user(c, "c@example.com")]
            })))
            .mount(&server)
            .await;

        let users = client(&server).with_page_size(2).list_all_users().await.unwrap();
        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_email_directory_skips_users_without_email() {
        let server = MockServer::start().await;
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        Mock::given(method("GET"))
            .and(path("/auth/v1/admin/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [user(a, "a@example.com"), { "id": b, "email": null }]
            })))
            .mount(&server)
            .await;

        let directory = client(&server).email_directory().await.unwrap();
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get(&a).map(String::as_str), Some("a@example.com"));
    }

    #[tokio::test]
    async fn test_create_user_confirms_email() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/auth/v1/admin/users"))
            .and(header("Authorization", "Bearer service-key"))
            .and(body_partial_json(json!({
                "email": "new@example.com",
                "email_confirm": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(user(id, "new@example.com")))
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server)
            .create_user("new@example.com", "s3cretpass")
            .await
            .unwrap();
        assert_eq!(created.id, id);
        assert_eq!(created.full_name(), "Test User");
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path(format!("/auth/v1/admin/users/{}", id)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).get_user(id).await.unwrap_err();
        assert!(matches!(err, AuthAdminError::UserNotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_delete_user_surfaces_api_errors() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("DELETE"))
            .and(path(format!("/auth/v1/admin/users/{}", id)))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server).delete_user(id).await.unwrap_err();
        match err {
            AuthAdminError::ApiError { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
