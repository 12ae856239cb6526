//! Tagged value container and its converter machinery.
//!
//! A [`Variant`] carries one value of any `Clone + Send + Sync` type together
//! with the [`TypeTag`] of that type. Small plain-old-data payloads (primitives, math
//! vectors, colours) live in a fixed inline buffer and never touch the heap;
//! anything else is kept behind a shared pointer.
//!
//! The typed side of the conversion lives in [`Converter`] implementations,
//! resolved once per type by a [`ConverterRegistry`]. Binding loops that
//! convert the same type every frame hold a [`CachedConverter`] instead of
//! going back to the registry.
//!
//! ```ignore
//! use encosy_core::variant::{ConverterRegistry, Variant};
//!
//! let registry = ConverterRegistry::new();
//! let variant = registry.pack(42_i32)?;
//! assert_eq!(registry.try_unpack::<i32>(&variant), Some(42));
//! assert_eq!(registry.try_unpack::<f32>(&variant), None);
//! assert_eq!(registry.stringify(&variant), "42");
//! ```

mod cached;
mod converter;
mod error;
mod registry;
mod storage;
mod tag;
mod value;

pub use cached::CachedConverter;
pub use converter::{
    render_debug, render_display, render_type_name, BoxedConverter, Converter, FnConverter,
    InlineConverter, ReprConverter, SharedConverter,
};
pub use error::VariantError;
pub use registry::{ConverterRegistry, RegistryStats};
pub use storage::{StorageKind, Variant, INLINE_CAPACITY};
pub use tag::{TypeMeta, TypeTag, TypeTagRegistry};
pub use value::{inline_or_boxed, VariantValue};

/// Older name for [`Variant`]; both spellings are the same type.
pub type Union = Variant;
