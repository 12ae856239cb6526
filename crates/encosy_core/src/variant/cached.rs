// cached.rs - Memoized converter handle
//
// The handle owns its `OnceCell`, so the single lookup is per handle, not per
// type: a handle rebuilt on every call goes back to the registry every time.

use crate::variant::{Converter, ConverterRegistry, TypeTag, Variant, VariantError};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::sync::Arc;

/// Converter handle that resolves against its registry at most once.
///
/// Binding loops that convert the same type every frame keep one of these
/// around; after the first successful `get` every call is a field read. A
/// failed resolution is not cached, since the converter may be registered
/// later; the registry reports it only once.
pub struct CachedConverter<'r, T: 'static> {
    registry: &'r ConverterRegistry,
    tag: TypeTag,
    converter: OnceCell<Arc<dyn Converter<T>>>,
}

impl<T: Any + Clone + Send + Sync> CachedConverter<'static, T> {
    /// Accessor bound to [`ConverterRegistry::global`].
    ///
    /// Store the returned handle (in a field or a `Lazy` static) and reuse it.
    /// Each call starts unresolved, so `CachedConverter::<T>::global().pack(x)`
    /// written inline performs a registry lookup every time.
    pub fn global() -> Self {
        Self::new(ConverterRegistry::global())
    }
}

impl<'r, T: Any + Clone + Send + Sync> CachedConverter<'r, T> {
    pub fn new(registry: &'r ConverterRegistry) -> Self {
        Self {
            registry,
            tag: TypeTag::of::<T>(),
            converter: OnceCell::new(),
        }
    }

    #[inline]
    pub fn get(&self) -> Result<&Arc<dyn Converter<T>>, VariantError> {
        self.converter
            .get_or_try_init(|| self.registry.get_converter::<T>())
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.converter.get().is_some()
    }

    #[inline]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn pack(&self, value: T) -> Result<Variant, VariantError> {
        Ok(self.get()?.pack(value))
    }

    pub fn try_unpack(&self, variant: &Variant) -> Option<T> {
        if variant.tag() != self.tag {
            return None;
        }
        self.get().ok()?.try_unpack(variant)
    }

    /// Borrow a boxed `T` in place. Needs no converter, so it never
    /// resolves the handle.
    pub fn try_ref<'v>(&self, variant: &'v Variant) -> Option<&'v T> {
        variant.try_ref::<T>()
    }

    pub fn unpack(&self, variant: &Variant) -> Result<T, VariantError> {
        if variant.tag() != self.tag {
            return Err(VariantError::InvalidCast {
                expected: self.tag,
                found: variant.tag(),
            });
        }
        self.get()?.unpack(variant)
    }

    pub fn stringify(&self, variant: &Variant) -> Result<String, VariantError> {
        Ok(self.get()?.stringify(variant))
    }
}
