//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `Session`: cookie-based session persistence with expiry
//! - `CredentialStore`: secure OS-level credential storage via keyring
//!
//! Sessions are persisted to disk and treated as expired after 60 minutes.
//! The friends controller never logs in itself; a 401 from any social
//! endpoint is reported upward so the front end can re-authenticate.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
