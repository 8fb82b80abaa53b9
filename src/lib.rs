//! WeChat Notification Library
//!
//! This library provides tools to:
//! - Parse plain-text notifications (header block + description) from stdin
//! - Build custom (text) and template messages for the Official Account API
//! - Fetch access tokens and deliver messages to individual OPENIDs
//! - Load credentials from config.yml, `.env` and environment variables

pub mod config;
pub mod error;
pub mod input;
pub mod message;
pub mod wechat;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use input::Input;
pub use message::{Message, TemplateOptions};
pub use wechat::{AccessToken, ProviderResponse, WechatClient};

pub mod commands;
