//! Core library for chaladshare.
//!
//! Provides the API client, data models, the friends controller and its
//! caches, authentication, configuration and localized messages shared by
//! the chaladshare front ends.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod friends;
pub mod messages;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, SocialApi};
pub use config::Config;
pub use friends::{ControllerSettings, FailurePolicy, TabCoordinator, View};
