//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Submission, progress polling, job listing and cancellation
//! - [`system`] - Health, capabilities, config, events, OpenAPI, shutdown

use serde::{Deserialize, Serialize};

mod jobs;
mod system;

pub use jobs::*;
pub use system::*;

/// Query parameters for GET /info
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams, utoipa::ToSchema)]
pub struct InfoQuery {
    /// Media URL to look up
    #[serde(default)]
    pub url: String,
}
