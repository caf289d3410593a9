pub mod agents;
pub mod assignments;
pub mod auth;
pub mod backup;
pub mod billing;
pub mod settings;
pub mod transactions;
