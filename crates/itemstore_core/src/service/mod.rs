//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and reconciler calls into use-case level APIs.
//! - Keep HTTP/CLI layers decoupled from storage details.

pub mod item_service;
