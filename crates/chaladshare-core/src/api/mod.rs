//! REST API client module for the chaladshare service.
//!
//! This module provides the `ApiClient` for communicating with the
//! service's social endpoints, and the `SocialApi` trait that the friends
//! controller uses as its only view of the remote connection graph.
//!
//! The service authenticates with a session cookie obtained from
//! `POST /auth/login`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

use async_trait::async_trait;

use crate::models::{FriendsPage, Profile, RequestId, RequestsPage, SubjectId};

/// Remote operations consumed by the friends controller.
///
/// Implemented by `ApiClient` over HTTP; tests substitute an in-memory service.
#[async_trait]
pub trait SocialApi: Send + Sync {
    /// `GET /profile`
    async fn fetch_profile(&self) -> Result<Profile, ApiError>;

    /// `GET /social/friends/{owner}?search=&page=&size=`
    async fn list_friends(
        &self,
        owner: SubjectId,
        search: &str,
        page: u32,
        size: u32,
    ) -> Result<FriendsPage, ApiError>;

    /// `DELETE /social/friends/{target}`
    async fn unfriend(&self, target: SubjectId) -> Result<(), ApiError>;

    /// `GET /social/requests/incoming?page=&size=`
    async fn list_incoming_requests(&self, page: u32, size: u32) -> Result<RequestsPage, ApiError>;

    /// `POST /social/requests/{id}/accept`
    async fn accept_request(&self, request_id: RequestId) -> Result<(), ApiError>;

    /// `POST /social/requests/{id}/decline`
    async fn decline_request(&self, request_id: RequestId) -> Result<(), ApiError>;
}
