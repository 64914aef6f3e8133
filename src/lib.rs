// src/lib.rs
pub mod api;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod session;
pub mod store;
pub mod types;

pub use config::DashboardConfig;
pub use dashboard::Dashboard;
pub use errors::DashboardError;
