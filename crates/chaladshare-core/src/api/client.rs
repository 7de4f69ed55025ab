//! API client for communicating with the chaladshare REST API.
//!
//! This module provides the `ApiClient` struct for logging in and for the
//! social endpoints the friends controller consumes.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionData;
use crate::models::{FriendsPage, Profile, RequestId, RequestsPage, SubjectId};

use super::{ApiError, SocialApi};

// ============================================================================
// Constants
// ============================================================================

/// Default base URL, matching a locally running service.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: LoginUser,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    id: SubjectId,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

/// API client for the chaladshare service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    cookie: Option<header::HeaderValue>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the session cookie (`name=value`) sent with every request
    pub fn set_session_cookie(&mut self, cookie: &str) -> Result<()> {
        let value = header::HeaderValue::from_str(cookie)
            .context("Session cookie contains invalid header characters")?;
        self.cookie = Some(value);
        Ok(())
    }

    pub fn clear_session(&mut self) {
        self.cookie = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in and return session data carrying the issued cookie
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<SessionData> {
        let url = self.url("/auth/login");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&LoginRequest { email, password })
            .send()
            .await
            .context("Failed to send login request")?;

        let response = Self::check_response(response).await?;

        let cookie = Self::session_cookie_from(response.headers())
            .ok_or_else(|| anyhow::anyhow!("Login succeeded but no session cookie was issued"))?;

        let login: LoginResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        Ok(SessionData {
            cookie,
            user_id: login.user.id,
            email: login.user.email.unwrap_or_else(|| email.to_string()),
            username: login.user.username,
            created_at: Utc::now(),
        })
    }

    /// End the session on the server. The local cookie is dropped either way.
    pub async fn logout(&mut self) -> Result<()> {
        let url = self.url("/auth/logout");
        let result = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .send()
            .await
            .context("Failed to send logout request");
        self.cookie = None;

        Self::check_response(result?).await?;
        Ok(())
    }

    /// Take the first `name=value` pair out of the response's Set-Cookie headers
    fn session_cookie_from(headers: &header::HeaderMap) -> Option<String> {
        headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| raw.split(';').next())
            .map(str::trim)
            .find(|pair| {
                pair.split_once('=')
                    .map(|(name, value)| !name.is_empty() && !value.is_empty())
                    .unwrap_or(false)
            })
            .map(str::to_string)
    }

    fn auth_headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref cookie) = self.cookie {
            headers.insert(header::COOKIE, cookie.clone());
        }
        headers
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %ApiError::truncate_body(&body), "Request failed");
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers())
            .query(query)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(url = %url, error = %e, "Failed to parse JSON response");
            ApiError::InvalidResponse(format!("{}: {}", path, e))
        })
    }

    /// Send a request whose response body carries nothing the client needs
    async fn send_without_body(&self, method: Method, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        let response = self
            .client
            .request(method, &url)
            .headers(self.auth_headers())
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }
}

#[async_trait]
impl SocialApi for ApiClient {
    async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        self.get("/profile", &[]).await
    }

    async fn list_friends(
        &self,
        owner: SubjectId,
        search: &str,
        page: u32,
        size: u32,
    ) -> Result<FriendsPage, ApiError> {
        let path = format!("/social/friends/{}", owner);
        let query = [
            ("search", search.to_string()),
            ("page", page.to_string()),
            ("size", size.to_string()),
        ];
        let page: FriendsPage = self.get(&path, &query).await?;
        debug!(owner = %owner, count = page.items.len(), total = page.total, "Friends page fetched");
        Ok(page)
    }

    async fn unfriend(&self, target: SubjectId) -> Result<(), ApiError> {
        self.send_without_body(Method::DELETE, &format!("/social/friends/{}", target))
            .await
    }

    async fn list_incoming_requests(&self, page: u32, size: u32) -> Result<RequestsPage, ApiError> {
        let query = [("page", page.to_string()), ("size", size.to_string())];
        let page: RequestsPage = self.get("/social/requests/incoming", &query).await?;
        debug!(count = page.items.len(), "Incoming requests fetched");
        Ok(page)
    }

    async fn accept_request(&self, request_id: RequestId) -> Result<(), ApiError> {
        self.send_without_body(Method::POST, &format!("/social/requests/{}/accept", request_id))
            .await
    }

    async fn decline_request(&self, request_id: RequestId) -> Result<(), ApiError> {
        self.send_without_body(Method::POST, &format!("/social/requests/{}/decline", request_id))
            .await
    }
}
