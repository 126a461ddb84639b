//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls for operations that are not form-driven.
//! - Keep CLI/host layers decoupled from storage details.

pub mod account_service;
pub mod invite_service;
pub mod password;
