//! Typed error taxonomy for the execution engine.
//!
//! Every failure that crosses a component boundary is classified here.
//! Market-signal failures never reach this enum; the market gateway
//! absorbs them into fallback constants (warn-logged).
//!
//! Author: AI-Generated
//! Created: 2026-08-03

use std::fmt;
use thiserror::Error;

/// Failure taxonomy for aggregator quote/swap calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteErrorKind {
    InvalidParams,
    Auth,
    RateLimited,
    RouteNotFound,
    Server,
    Timeout,
    Network,
}

impl fmt::Display for QuoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QuoteErrorKind::InvalidParams => write!(f, "invalid_params"),
            QuoteErrorKind::Auth => write!(f, "auth"),
            QuoteErrorKind::RateLimited => write!(f, "rate_limited"),
            QuoteErrorKind::RouteNotFound => write!(f, "route_not_found"),
            QuoteErrorKind::Server => write!(f, "server"),
            QuoteErrorKind::Timeout => write!(f, "timeout"),
            QuoteErrorKind::Network => write!(f, "network"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad request shape, out-of-range numeric field, unsupported chain.
    /// Surfaced immediately, never retried.
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("quote gateway error ({kind}): {message}")]
    Quote { kind: QuoteErrorKind, message: String },

    #[error("relay gateway error: {0}")]
    Relay(String),

    #[error("swap submission failed: {0}")]
    Submission(String),

    /// The pipeline concluded CANCEL. User-actionable: names the dominant
    /// risk factor and how to mitigate it, never just "failed".
    #[error("swap rejected by risk analysis: {reason} (mitigation: {mitigation})")]
    RiskRejection { reason: String, mitigation: String },

    /// The pipeline concluded WAIT; nothing was submitted.
    #[error("execution deferred: {0}")]
    Deferred(String),

    #[error("bundle retries exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    #[error("deadline expired while {context}")]
    TimeoutExpired { context: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for errors the bundle orchestrator may retry. Validation and
    /// risk rejections are final by definition.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Relay(_)
                | EngineError::Submission(_)
                | EngineError::Quote {
                    kind: QuoteErrorKind::RateLimited
                        | QuoteErrorKind::Server
                        | QuoteErrorKind::Timeout
                        | QuoteErrorKind::Network,
                    ..
                }
        )
    }
}
