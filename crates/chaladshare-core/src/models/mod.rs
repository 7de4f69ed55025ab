//! Data models for the social-connection service.
//!
//! This module contains the wire and domain types exchanged with the
//! remote service:
//!
//! - `ConnectionEntry`, `FriendsPage`: confirmed connections ("friends")
//! - `IncomingRequest`, `RequestsPage`: pending incoming friend requests
//! - `Profile`: the caller's own identity
//! - `SubjectId`, `RequestId`: strong identifiers over the service's integer ids

pub mod connection;
pub mod profile;
pub mod request;

pub use connection::{ConnectionEntry, FriendsPage, SubjectId};
pub use profile::Profile;
pub use request::{IncomingRequest, RequestId, RequestsPage};

use serde::{Deserialize, Deserializer};

/// Treat an explicit JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
