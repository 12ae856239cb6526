//! Encosy Core
//!
//! Value plumbing shared by the binding and messaging layers:
//! - `Variant`: a tagged, fixed-size container for arbitrary typed values
//! - Per-type converters and the registry that resolves them
//! - Process-stable type tags

pub mod variant;

pub use glam;
pub use variant::{ConverterRegistry, TypeTag, Union, Variant, VariantError, VariantValue};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
