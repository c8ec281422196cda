//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and auth plumbing.

pub mod auth;
pub mod crypto;
pub mod event;
pub mod file;
pub mod storage;
pub mod token;
pub mod user;
