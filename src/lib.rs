pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod middleware;
pub mod services;
