//! Tracing targets and span names used by the patch engine.
//!
//! The crate only emits `tracing` events; installing a subscriber is left to
//! the application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_restyle::patch=debug")
//!     .init();
//! ```

/// Span names used throughout the crate.
pub mod span_names {
    /// One `EditSession::edit_property` call, precheck and patch included.
    pub const EDIT: &str = "horizon_restyle::edit";
    /// Loading a stylesheet into a session.
    pub const ATTACH: &str = "horizon_restyle::attach";
}

/// Target names for log filtering.
pub mod targets {
    /// Declaration block parser.
    pub const PARSER: &str = "horizon_restyle::parser";
    /// Rule registry loading.
    pub const REGISTRY: &str = "horizon_restyle::registry";
    /// Override bookkeeping and live host mutation.
    pub const PATCH: &str = "horizon_restyle::patch";
    /// Precheck probe.
    pub const PROBE: &str = "horizon_restyle::probe";
    /// In-memory host.
    pub const HOST: &str = "horizon_restyle::host";
    /// Session controller and change notification.
    pub const SESSION: &str = "horizon_restyle::session";
}
