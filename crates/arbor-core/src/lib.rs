//! Core infrastructure for arbor.
//!
//! This crate provides the pieces shared by every arbor crate:
//!
//! - **Signal/Slot System**: Synchronous, type-safe event notification
//! - **Logging**: `tracing` targets, performance spans and the warn-once
//!   logger service used to report non-fatal misuse
//!
//! # Signal/Slot Example
//!
//! ```
//! use arbor_core::Signal;
//!
//! let selection_changed = Signal::<String>::new();
//!
//! let conn_id = selection_changed.connect(|source| {
//!     println!("selection changed by {}", source);
//! });
//!
//! selection_changed.emit("api".to_string());
//! selection_changed.disconnect(conn_id);
//! ```
//!
//! # Warn-Once Example
//!
//! ```
//! use arbor_core::WarnOnce;
//!
//! let logger = WarnOnce::new();
//! assert!(logger.warn_once("missing-row-id", "row id callback returned nothing"));
//! assert!(!logger.warn_once("missing-row-id", "row id callback returned nothing"));
//! ```

pub mod logging;
pub mod signal;

pub use logging::{PerfSpan, WarnOnce};
pub use signal::{ConnectionId, Signal};
