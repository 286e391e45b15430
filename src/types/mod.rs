//! Domain newtypes shared across the crate.

use thiserror::Error;

mod domain_types;
mod ids;
mod post;

pub use domain_types::*;
pub use ids::*;
pub use post::*;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid Notion ID format: {0}")]
    InvalidId(String),

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid API key format: {reason}")]
    InvalidApiKey { reason: String },

    #[error("Invalid character limit range: min {min} must be positive and not exceed max {max}")]
    InvalidCharLimit { min: usize, max: usize },
}
