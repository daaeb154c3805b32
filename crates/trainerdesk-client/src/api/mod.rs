//! API endpoint implementations.

mod health;
mod tasks;

pub use health::HealthApi;
pub use tasks::TasksApi;
