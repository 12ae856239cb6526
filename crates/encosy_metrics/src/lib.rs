//! Encosy Metrics - Counters for observing hot paths
//!
//! Provides zero-cost abstractions for metrics collection that completely
//! vanish in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use encosy_metrics::Counter;
//!
//! static LOOKUPS: Counter = Counter::new();
//! LOOKUPS.increment();
//! println!("lookups: {}", LOOKUPS.get());
//! ```
//!
//! In production builds (without `metrics` feature), all instrumentation
//! is compiled out to zero overhead and every read returns zero.

#[cfg(feature = "metrics")]
mod counter;

#[cfg(feature = "metrics")]
pub use counter::Counter;

/// Whether counters in this build record anything.
pub const ENABLED: bool = cfg!(feature = "metrics");

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub const fn new() -> Self { Self }
    pub fn increment(&self) {}
    pub fn add(&self, _value: u64) {}
    pub fn get(&self) -> u64 { 0 }
    pub fn reset(&self) {}
}
