//! Core types shared by every command: configuration and the retry policy.

mod config;
mod retry;

pub use config::{
    Config, GitHubConfig, IndexConfig, RetryConfig, ShortenerConfig, LOCAL_CONFIG_FILE,
};
pub use retry::{retry, Attempt, RetryError, RetryPolicy, RetryResult};
