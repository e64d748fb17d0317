// Public API
pub mod cli;
pub mod commands;

// Core domain types
mod api;
mod config;
mod kv;
mod tail;
mod ui;

// Re-export main types
pub use api::{ApiClient, ScriptBinding};
pub use config::{
    Binding, BindingContext, Config, ConfigError, Credentials, Profile, ProfileOverrides, Script,
};
pub use kv::{ApiKvNamespace, KvNamespace};
