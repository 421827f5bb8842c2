//! Logging utilities for neura-ai
//!
//! Re-exports tracing macros with log_* naming convention for consistency.
//! The host installs the subscriber; this crate only emits events.

pub use tracing::{
    debug as log_debug,
    error as log_error,
    info as log_info,
    warn as log_warn,
};
