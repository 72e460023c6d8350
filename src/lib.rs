//! taskdesk - team task tracking library
//!
//! This library provides the core functionality for the taskdesk CLI.
//!
//! # Core Concepts
//!
//! - **User Directory**: profiles `{id, name, email, role}` keyed by principal
//! - **Task Store**: tasks with status, assignee, deadline and notes
//! - **Access guard**: `Allowed` or `RedirectTo(route)` per role
//! - **Session**: auth state subscribed on startup, released on shutdown
//!
//! # Module Organization
//!
//! - `access`: Role-gated routing
//! - `app`: Per-process application context
//! - `backend`: Identity provider and document store traits, local backend
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskdesk.toml`
//! - `error`: Error types and result aliases
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON output envelopes
//! - `session`: Auth state tracking
//! - `stats`: Task count aggregation
//! - `storage`: Data directory layout and JSON helpers
//! - `task`: Task store
//! - `user`: User directory

pub mod access;
pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod session;
pub mod stats;
pub mod storage;
pub mod task;
pub mod user;

pub use error::{Error, Result};
