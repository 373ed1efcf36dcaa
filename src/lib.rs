pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod store;
pub mod terminal;
