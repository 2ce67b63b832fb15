//! dynres - user-defined trigger/response pairs for chat sessions

pub mod app;
pub mod assets;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod index;
pub mod respondent;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod template;
