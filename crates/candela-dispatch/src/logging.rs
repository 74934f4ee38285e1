//! Logging facilities for Candela dispatch.
//!
//! The crate instruments itself with the `tracing` crate. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! use tracing_subscriber;
//!
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Dispatch events (connect, disconnect, emit, flush) are emitted at `trace`
//! level under the targets below.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Whole-crate target.
    pub const DISPATCH: &str = "candela_dispatch";
    /// Signal emission, connection and queue activity.
    pub const SIGNAL: &str = "candela_dispatch::signal";
}
