//! Error taxonomy for graph compilation and execution.
//!
//! Every expected failure mode maps onto one of four classes: configuration
//! errors surface from `Operator::initialize`, resolution errors from the
//! opset registry at compile time, shape errors from shape inference or
//! kernel execution, and graph errors from structural problems such as
//! cycles. None of these are retried; they propagate to the caller of
//! compilation or inference. Panics are reserved for violated internal
//! contracts, never for malformed models or inputs.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed attributes, detected when an operator is
    /// initialized.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No operator implementation matches a node's op type, domain and the
    /// graph's declared opset versions.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// Incompatible shapes or element types discovered during shape
    /// inference or kernel execution.
    #[error("shape error: {0}")]
    Shape(String),

    /// Structural graph problems: cycles, dangling value references,
    /// duplicate producers.
    #[error("graph error: {0}")]
    Graph(String),
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Error::Resolution(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Error::Shape(msg.into())
    }

    pub fn graph(msg: impl Into<String>) -> Self {
        Error::Graph(msg.into())
    }
}
