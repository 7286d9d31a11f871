//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store and platform ports into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod journal_service;
pub mod reminder_service;
