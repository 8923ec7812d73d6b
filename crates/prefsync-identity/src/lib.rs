//! Prefsync Identity - who the current user is
//!
//! The host environment supplies the user either through its context or
//! through an identity token. [`IdentityResolver`] tries both, bounding the
//! token request with a timeout, and yields an [`Identity`] whose user id
//! keys the preference record.

#![warn(missing_docs)]

pub mod host;
pub mod resolver;
pub mod token;

pub use host::{HostContext, HostEnvironment, HostError};
pub use resolver::{Identity, IdentityResolver, DEFAULT_SUBJECT_CLAIM, DEFAULT_TOKEN_TIMEOUT};
pub use token::{decode_claims, subject_claim};
