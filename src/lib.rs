pub mod analytics;
pub mod calendar;
pub mod config;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod records;
pub mod services;
pub mod sync;
pub mod term;
