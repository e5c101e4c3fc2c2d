//! Core types shared across the Rewind crates
//!
//! This crate provides foundational types used by the core engine, the
//! logging facility and the persistence layer:
//!
//! - **Owner identity**: `OwnerKey`, the polymorphic back-reference from a
//!   snapshot to the record that produced it
//! - **Schema constants**: canonical structured-logging field keys and event names

pub mod owner;
pub mod schema;

pub use owner::OwnerKey;
