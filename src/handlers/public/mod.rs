pub mod ai;
pub mod auth;
