//! Core translation engine module

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod history;
pub mod models;
pub mod provider;
pub mod quota;
pub mod rate_limiter;
pub mod schedule;
