//! Logging facilities for Trellis.
//!
//! Trellis uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "trellis_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "trellis_core::signal";
    /// Tree model target.
    pub const TREE: &str = "trellis::model::tree";
    /// Paged collection model target.
    pub const PAGED: &str = "trellis::model::paged";
    /// Expression engine target.
    pub const EXPR: &str = "trellis::expr";
}
