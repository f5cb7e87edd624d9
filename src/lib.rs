//! Daily drying and strong-wind risk classification for one observation point.
//!
//! A run combines the regional meteorological alert feed with the station's
//! recent daily rainfall, classifies the day and records the outcome:
//! - [`feed`] fetches the alert feed and extracts the drying/wind flags
//! - [`rainfall`] sums the station's precipitation over rolling windows
//! - [`judge`] maps totals and flags to a risk level
//! - [`store`] overwrites the snapshot and appends to the history log
//! - [`pipeline`] runs the above in order for one reference date
//!
//! [`routes`] serves the latest outputs read-only over HTTP.

pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod judge;
pub mod models;
pub mod pipeline;
pub mod rainfall;
pub mod routes;
pub mod store;

pub use config::Config;
pub use error::PipelineError;
pub use models::{AlertFlags, RiskAssessment, RiskLevel, Snapshot};
pub use pipeline::Runner;
