//! Client for the external text-inference service.
//!
//! The service is treated as untrusted and occasionally unavailable: every
//! call has a timeout, replies are never assumed to be well-formed, and all
//! failures are typed so the pipeline can absorb them per unit.

pub mod types;
pub mod http;

pub use types::InferenceClient;
pub use http::{HttpInferenceClient, MockInferenceClient};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("inference service is not reachable at {0}")]
    Connection(String),

    #[error("inference service returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("inference request timed out after {0}s")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed inference reply: {0}")]
    ResponseParsing(String),
}
