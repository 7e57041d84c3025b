pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod query;
pub mod scheduler;
pub mod storage;
pub mod web;

pub use config::Config;
pub use error::{Error, Result};
