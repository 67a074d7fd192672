pub mod api;
pub mod config;
pub mod dispatcher;

pub use api::{ApiError, StudioApi};
pub use config::RemoteConfig;
pub use dispatcher::{Dispatcher, Outcomes, drain_outcomes};
