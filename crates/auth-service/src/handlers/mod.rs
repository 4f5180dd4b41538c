//! HTTP request handlers.

pub mod auth_handler;
pub mod health;
pub mod metrics;
pub mod user_handler;

pub use auth_handler::{login, refresh_token};
pub use health::health_check;
pub use metrics::metrics_handler;
pub use user_handler::{delete_user, get_user, logout};
