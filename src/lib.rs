// Main library module for Eye - a configuration lookup service for
// monitoring fleets. External agents register monitoring configurations
// and look them up to drive alarm evaluation; every configuration keeps
// its full revision history as non-overlapping validity intervals.

// Module declarations
pub mod api; // External wire result models
pub mod console; // HTTP handlers and protocol renderer
pub mod core; // Internal request/result envelope
pub mod entity; // Database entities
pub mod error; // Error handling and types
pub mod middleware; // HTTP middleware
pub mod model; // Data models and validity algebra
pub mod service; // Configuration store and write state machine
