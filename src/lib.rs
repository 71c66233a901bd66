pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod domain;
pub mod health;
pub mod messaging;
pub mod metrics;
pub mod notifier;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod utils;
pub mod worker;
