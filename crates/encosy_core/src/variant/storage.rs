// storage.rs - The Variant value type
//
// Inline payloads are raw bytes copied out of a `Pod` value; boxed payloads
// are shared pointers. Cloning a variant never deep-copies a boxed value.

use crate::variant::{ConverterRegistry, TypeTag, VariantError};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Bytes available for inline payloads.
///
/// Sized for a `Vec4`, `Quat` or `u128`.
pub const INLINE_CAPACITY: usize = 16;

/// Where a variant keeps its payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Empty,
    Inline,
    Boxed,
}

#[derive(Clone, Default)]
enum Storage {
    #[default]
    Empty,
    Inline([u8; INLINE_CAPACITY]),
    Boxed(Arc<dyn Any + Send + Sync>),
}

/// Tagged, fixed-size value container.
///
/// Use [`ConverterRegistry::pack`] (or [`Variant::new`] for the global
/// registry) to build one; the raw constructors exist for custom converters.
#[derive(Clone, Default)]
pub struct Variant {
    tag: TypeTag,
    storage: Storage,
}

impl Variant {
    /// Variant holding nothing.
    pub const EMPTY: Variant = Variant {
        tag: TypeTag::NONE,
        storage: Storage::Empty,
    };

    /// Pack `value` with the global registry.
    pub fn new<T: Any + Clone + Send + Sync>(value: T) -> Result<Self, VariantError> {
        ConverterRegistry::global().pack(value)
    }

    /// Build a variant from an inline payload.
    ///
    /// Bytes past the payload's size must be zero so identical values
    /// produce identical buffers.
    #[inline]
    pub fn with_inline(tag: TypeTag, bytes: [u8; INLINE_CAPACITY]) -> Self {
        Self {
            tag,
            storage: Storage::Inline(bytes),
        }
    }

    /// Build a variant around a shared payload.
    #[inline]
    pub fn with_boxed(tag: TypeTag, value: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            tag,
            storage: Storage::Boxed(value),
        }
    }

    #[inline]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self.storage, Storage::Empty)
    }

    /// Whether this variant was packed from a `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        !self.is_empty() && self.tag == TypeTag::of::<T>()
    }

    pub fn storage_kind(&self) -> StorageKind {
        match self.storage {
            Storage::Empty => StorageKind::Empty,
            Storage::Inline(_) => StorageKind::Inline,
            Storage::Boxed(_) => StorageKind::Boxed,
        }
    }

    #[inline]
    pub fn inline_bytes(&self) -> Option<&[u8; INLINE_CAPACITY]> {
        match &self.storage {
            Storage::Inline(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[inline]
    pub fn boxed_ref(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        match &self.storage {
            Storage::Boxed(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the boxed payload as a `T` without copying it.
    ///
    /// `None` on a type mismatch and for inline payloads, which are cheap to
    /// copy out with [`try_get`](Self::try_get). A value packed by
    /// `SharedConverter` is stored as the `U` behind its `Arc<U>`, so it has
    /// no `Arc<U>` to borrow.
    #[inline]
    pub fn try_ref<T: Any>(&self) -> Option<&T> {
        if self.tag != TypeTag::of::<T>() {
            return None;
        }
        self.boxed_ref()?.downcast_ref::<T>()
    }

    /// Unpack through the global registry; `None` on type mismatch.
    pub fn try_get<T: Any + Clone + Send + Sync>(&self) -> Option<T> {
        ConverterRegistry::global().try_unpack(self)
    }

    /// Unpack through the global registry, failing with
    /// [`VariantError::InvalidCast`] on type mismatch.
    pub fn get<T: Any + Clone + Send + Sync>(&self) -> Result<T, VariantError> {
        ConverterRegistry::global().unpack(self)
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("tag", &format_args!("{}", self.tag))
            .field("storage", &self.storage_kind())
            .finish()
    }
}

/// Renders through the global registry's converter for the stored type.
impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&ConverterRegistry::global().stringify(self))
    }
}
