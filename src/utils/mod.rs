//! # Utility Modules
//!
//! Supporting utilities for identifiers, logging, and metrics.
//!
//! ## Components
//! - **Identifier**: Random game codes
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe observability counters

pub mod identifier;
pub mod logging;
pub mod metrics;
