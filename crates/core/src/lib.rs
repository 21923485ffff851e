//! `lorecraft-core`: shared domain primitives.
//!
//! Identifiers and the domain error model only; no IO, no crypto.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{CampaignId, UserId};
