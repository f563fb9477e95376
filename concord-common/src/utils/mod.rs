//! utils.rs
//!
//! Common types shared across the Concord crates.
//!
//! This module provides cluster member identities and their
//! trait integrations and conversion helpers.

pub mod member_id;
pub use member_id::MemberId;
