// registry.rs - Converter lookup per type
//
// Entries are keyed by type tag and never replaced or removed. Resolution
// builds the converter outside the map lock and then inserts it only if the
// slot is still vacant, so racing first uses agree on one instance.

use crate::variant::value::declare_builtins;
use crate::variant::{
    render_type_name, BoxedConverter, CachedConverter, Converter, FnConverter, TypeTag, Variant,
    VariantError, VariantValue,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use encosy_metrics::Counter;
use once_cell::sync::Lazy;
use std::any::{type_name, Any};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Type-erased view used to render variants whose type the caller does not know.
trait ErasedConverter: Send + Sync {
    fn stringify(&self, variant: &Variant) -> String;
}

struct Erased<T: 'static>(Arc<dyn Converter<T>>);

impl<T: 'static> ErasedConverter for Erased<T> {
    fn stringify(&self, variant: &Variant) -> String {
        self.0.stringify(variant)
    }
}

struct Slot {
    /// Holds an `Arc<dyn Converter<T>>` for the slot's type.
    typed: Box<dyn Any + Send + Sync>,
    erased: Arc<dyn ErasedConverter>,
    type_name: &'static str,
}

impl Slot {
    fn new<T: 'static>(converter: Arc<dyn Converter<T>>) -> Self {
        Self {
            typed: Box::new(Arc::clone(&converter)),
            erased: Arc::new(Erased(converter)),
            type_name: type_name::<T>(),
        }
    }

    fn typed<T: 'static>(&self) -> Result<Arc<dyn Converter<T>>, VariantError> {
        self.typed
            .downcast_ref::<Arc<dyn Converter<T>>>()
            .cloned()
            .ok_or(VariantError::ConversionUnsupported {
                type_name: type_name::<T>(),
            })
    }
}

/// Snapshot of registry traffic. All zero unless the `metrics` feature is on.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Calls to `get_converter`, cached or not.
    pub lookups: u64,
    /// Converters built and inserted on first use.
    pub resolutions: u64,
    /// Types declared `registered` that were used before a converter arrived.
    /// Counted once per type.
    pub failures: u64,
}

#[derive(Default)]
struct Stats {
    lookups: Counter,
    resolutions: Counter,
    failures: Counter,
}

/// Registry used by the convenience API on [`Variant`].
static GLOBAL: Lazy<ConverterRegistry> = Lazy::new(ConverterRegistry::new);

/// Append-only mapping from type tags to converters.
///
/// Every registry starts with the built-in converters (primitives, strings,
/// `glam` vectors). Any other type gets a boxed converter on first use unless
/// [`declare`](Self::declare) or [`register`](Self::register) installed one
/// before that.
///
/// Build one per context that needs isolation (tests, tools); everything
/// else shares [`ConverterRegistry::global`].
pub struct ConverterRegistry {
    slots: DashMap<TypeTag, Slot>,
    /// Declared types that have no converter yet, with whether their first
    /// failed use was already reported.
    awaiting: DashMap<TypeTag, AtomicBool>,
    stats: Stats,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        let registry = Self {
            slots: DashMap::new(),
            awaiting: DashMap::new(),
            stats: Stats::default(),
        };
        declare_builtins(&registry);
        registry
    }

    /// Process-wide registry, created on first access.
    pub fn global() -> &'static ConverterRegistry {
        &GLOBAL
    }

    /// Resolve the converter for `T`, building a boxed one on first use.
    ///
    /// Returns the same `Arc` on every call. Only a type declared
    /// `registered` can fail here; that failure leaves the registry
    /// untouched, is reported once, and is retried on the next call.
    pub fn get_converter<T: Any + Clone + Send + Sync>(
        &self,
    ) -> Result<Arc<dyn Converter<T>>, VariantError> {
        self.stats.lookups.increment();
        let tag = TypeTag::of::<T>();
        if let Some(slot) = self.slots.get(&tag) {
            return slot.typed::<T>();
        }

        if let Some(reported) = self.awaiting.get(&tag) {
            if !reported.swap(true, Ordering::Relaxed) {
                self.stats.failures.increment();
                tracing::warn!(type_name = type_name::<T>(), "declared type used before its converter was registered");
            }
            return Err(VariantError::ConversionUnsupported {
                type_name: type_name::<T>(),
            });
        }

        let converter: Arc<dyn Converter<T>> =
            Arc::new(BoxedConverter::<T>::new(render_type_name::<T>));

        match self.slots.entry(tag) {
            Entry::Occupied(occupied) => occupied.get().typed::<T>(),
            Entry::Vacant(vacant) => {
                self.stats.resolutions.increment();
                tracing::debug!(tag = tag.raw(), type_name = type_name::<T>(), "resolved boxed converter");
                vacant.insert(Slot::new(Arc::clone(&converter)));
                Ok(converter)
            }
        }
    }

    /// Install the converter `T` declares through [`VariantValue`].
    ///
    /// A type declared `registered` has no converter of its own: using it
    /// fails with [`VariantError::ConversionUnsupported`] until
    /// [`register`](Self::register) supplies one. Like `register`, this must
    /// happen before `T` is first resolved.
    pub fn declare<T: VariantValue>(&self) -> Result<(), VariantError> {
        match T::default_converter() {
            Ok(converter) => self.register::<T>(converter),
            Err(VariantError::ConversionUnsupported { .. }) => {
                let tag = TypeTag::of::<T>();
                if self.slots.contains_key(&tag) {
                    return Err(VariantError::ConverterAlreadyRegistered {
                        type_name: type_name::<T>(),
                    });
                }
                tracing::debug!(tag = tag.raw(), type_name = type_name::<T>(), "awaiting registered converter");
                self.awaiting.entry(tag).or_insert_with(|| AtomicBool::new(false));
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Install a custom converter for `T`.
    ///
    /// Must happen before `T` is first resolved; an existing entry is never
    /// replaced.
    pub fn register<T: Any + Clone + Send + Sync>(
        &self,
        converter: Arc<dyn Converter<T>>,
    ) -> Result<(), VariantError> {
        let tag = TypeTag::of::<T>();
        match self.slots.entry(tag) {
            Entry::Occupied(_) => {
                tracing::warn!(type_name = type_name::<T>(), "converter already registered");
                return Err(VariantError::ConverterAlreadyRegistered {
                    type_name: type_name::<T>(),
                });
            }
            Entry::Vacant(vacant) => {
                tracing::trace!(tag = tag.raw(), type_name = type_name::<T>(), "registered converter");
                vacant.insert(Slot::new(converter));
            }
        }
        self.awaiting.remove(&tag);
        Ok(())
    }

    /// Install a converter assembled from plain functions.
    pub fn register_fns<T: Any + Clone + Send + Sync>(
        &self,
        pack: fn(T) -> Variant,
        try_unpack: fn(&Variant) -> Option<T>,
        stringify: fn(&Variant) -> String,
    ) -> Result<(), VariantError> {
        self.register::<T>(Arc::new(FnConverter::new(pack, try_unpack, stringify)))
    }

    pub fn pack<T: Any + Clone + Send + Sync>(&self, value: T) -> Result<Variant, VariantError> {
        Ok(self.get_converter::<T>()?.pack(value))
    }

    /// `None` when the variant does not hold a `T`. The tag is compared
    /// before any converter lookup.
    pub fn try_unpack<T: Any + Clone + Send + Sync>(&self, variant: &Variant) -> Option<T> {
        if variant.tag() != TypeTag::of::<T>() {
            return None;
        }
        self.get_converter::<T>().ok()?.try_unpack(variant)
    }

    pub fn unpack<T: Any + Clone + Send + Sync>(&self, variant: &Variant) -> Result<T, VariantError> {
        let expected = TypeTag::of::<T>();
        if variant.tag() != expected {
            return Err(VariantError::InvalidCast {
                expected,
                found: variant.tag(),
            });
        }
        self.get_converter::<T>()?.unpack(variant)
    }

    /// Borrow a boxed `T` without copying it. See [`Variant::try_ref`].
    pub fn try_ref<'v, T: Any>(&self, variant: &'v Variant) -> Option<&'v T> {
        variant.try_ref::<T>()
    }

    /// Render any variant packed through this registry.
    pub fn stringify(&self, variant: &Variant) -> String {
        if variant.is_empty() {
            return "<none>".to_string();
        }
        // Release the shard before running converter code.
        let erased = self
            .slots
            .get(&variant.tag())
            .map(|slot| Arc::clone(&slot.erased));
        match erased {
            Some(erased) => erased.stringify(variant),
            None => format!("<{}>", variant.tag()),
        }
    }

    /// Memoizing accessor for hot paths that convert `T` repeatedly.
    pub fn cached<T: Any + Clone + Send + Sync>(&self) -> CachedConverter<'_, T> {
        CachedConverter::new(self)
    }

    /// Whether `T` already has a converter.
    pub fn contains<T: 'static>(&self) -> bool {
        self.slots.contains_key(&TypeTag::of::<T>())
    }

    /// Name of the type registered under `tag`, if any.
    pub fn type_name_of(&self, tag: TypeTag) -> Option<&'static str> {
        self.slots.get(&tag).map(|slot| slot.type_name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            lookups: self.stats.lookups.get(),
            resolutions: self.stats.resolutions.get(),
            failures: self.stats.failures.get(),
        }
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::{render_debug, StorageKind, INLINE_CAPACITY};

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Handle(u32);
    crate::variant_value!(registered Handle);

    #[derive(Clone, Debug, PartialEq)]
    struct Tint(u8);

    #[derive(Clone, Debug, PartialEq)]
    struct Label(String);

    fn pack_handle(value: Handle) -> Variant {
        let mut bytes = [0u8; INLINE_CAPACITY];
        bytes[..4].copy_from_slice(&value.0.to_le_bytes());
        Variant::with_inline(TypeTag::of::<Handle>(), bytes)
    }

    fn unpack_handle(variant: &Variant) -> Option<Handle> {
        let bytes = variant.inline_bytes()?;
        let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Some(Handle(raw))
    }

    fn show_handle(variant: &Variant) -> String {
        match unpack_handle(variant) {
            Some(handle) => format!("#{}", handle.0),
            None => "#?".to_string(),
        }
    }

    #[test]
    fn test_get_converter_is_reference_stable() {
        let registry = ConverterRegistry::new();
        let builtins = registry.len();
        let first = registry.get_converter::<Label>().unwrap();

        for _ in 0..10 {
            let again = registry.get_converter::<Label>().unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert_eq!(registry.len(), builtins + 1);

        let ints = registry.get_converter::<i32>().unwrap();
        assert!(Arc::ptr_eq(&ints, &registry.get_converter::<i32>().unwrap()));
    }

    #[test]
    fn test_round_trip_and_type_safety() {
        let registry = ConverterRegistry::new();
        let variant = registry.pack(42_i32).unwrap();

        assert_eq!(registry.try_unpack::<i32>(&variant), Some(42));
        assert_eq!(registry.try_unpack::<f32>(&variant), None);
        assert_eq!(registry.try_unpack::<u32>(&variant), None);
        assert_eq!(registry.stringify(&variant), "42");
        assert!(matches!(
            registry.unpack::<String>(&variant),
            Err(VariantError::InvalidCast { .. })
        ));
    }

    #[test]
    fn test_try_unpack_mismatch_skips_lookup() {
        let registry = ConverterRegistry::new();
        let variant = registry.pack(1_u8).unwrap();

        assert_eq!(registry.try_unpack::<Label>(&variant), None);
        assert!(!registry.contains::<Label>());
    }

    #[test]
    fn test_undeclared_type_falls_back_to_boxed() {
        let registry = ConverterRegistry::new();
        let label = Label("gate".to_string());
        let variant = registry.pack(label.clone()).unwrap();

        assert_eq!(variant.storage_kind(), StorageKind::Boxed);
        assert_eq!(registry.unpack::<Label>(&variant), Ok(label));
        assert_eq!(registry.stringify(&variant), std::any::type_name::<Label>());
        assert_eq!(registry.stats().failures, 0);
    }

    #[test]
    fn test_registered_type_needs_a_converter() {
        let registry = ConverterRegistry::new();
        registry.declare::<Handle>().unwrap();

        let err = registry.pack(Handle(3)).unwrap_err();
        assert_eq!(
            err,
            VariantError::ConversionUnsupported {
                type_name: std::any::type_name::<Handle>(),
            }
        );
        assert!(!registry.contains::<Handle>());

        registry
            .register_fns::<Handle>(pack_handle, unpack_handle, show_handle)
            .unwrap();
        let variant = registry.pack(Handle(3)).unwrap();

        assert_eq!(variant.storage_kind(), StorageKind::Inline);
        assert_eq!(registry.unpack::<Handle>(&variant), Ok(Handle(3)));
        assert_eq!(registry.stringify(&variant), "#3");
    }

    #[test]
    fn test_undeclared_registered_type_still_packs() {
        let registry = ConverterRegistry::new();
        let variant = registry.pack(Handle(8)).unwrap();

        assert_eq!(variant.storage_kind(), StorageKind::Boxed);
        assert_eq!(registry.try_unpack::<Handle>(&variant), Some(Handle(8)));
    }

    #[test]
    fn test_failed_resolution_does_not_block_other_types() {
        let registry = ConverterRegistry::new();
        registry.declare::<Handle>().unwrap();
        let before = registry.len();

        assert!(registry.get_converter::<Handle>().is_err());
        assert!(registry.get_converter::<Handle>().is_err());
        assert!(registry.get_converter::<Tint>().is_ok());
        assert_eq!(registry.len(), before + 1);
    }

    #[test]
    fn test_register_custom_converter() {
        let registry = ConverterRegistry::new();
        registry
            .register::<Tint>(Arc::new(BoxedConverter::<Tint>::new(render_debug::<Tint>)))
            .unwrap();

        let variant = registry.pack(Tint(200)).unwrap();
        assert_eq!(registry.stringify(&variant), "Tint(200)");
    }

    #[test]
    fn test_register_after_resolution_is_rejected() {
        let registry = ConverterRegistry::new();
        let resolved = registry.get_converter::<Label>().unwrap();

        let err = registry
            .register::<Label>(Arc::new(BoxedConverter::<Label>::new(render_debug::<Label>)))
            .unwrap_err();
        assert!(matches!(err, VariantError::ConverterAlreadyRegistered { .. }));

        // The original entry is untouched.
        let again = registry.get_converter::<Label>().unwrap();
        assert!(Arc::ptr_eq(&resolved, &again));
    }

    #[test]
    fn test_builtins_cannot_be_replaced() {
        let registry = ConverterRegistry::new();
        let err = registry
            .register::<i32>(Arc::new(BoxedConverter::<i32>::new(render_debug::<i32>)))
            .unwrap_err();

        assert!(matches!(err, VariantError::ConverterAlreadyRegistered { .. }));
        assert_eq!(registry.pack(5_i32).unwrap().storage_kind(), StorageKind::Inline);
    }

    #[test]
    fn test_try_ref_borrows_boxed_payload() {
        let registry = ConverterRegistry::new();
        let variant = registry.pack(Label("north".to_string())).unwrap();

        let first = registry.try_ref::<Label>(&variant).unwrap();
        let second = registry.try_ref::<Label>(&variant).unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.0, "north");
        assert!(registry.try_ref::<Tint>(&variant).is_none());
    }

    #[test]
    fn test_stringify_unknown_and_empty() {
        let registry = ConverterRegistry::new();
        let foreign = ConverterRegistry::new().pack(Tint(1)).unwrap();

        assert_eq!(
            registry.stringify(&foreign),
            format!("<{}>", std::any::type_name::<Tint>())
        );
        assert_eq!(registry.stringify(&Variant::default()), "<none>");
    }

    #[test]
    fn test_type_name_of() {
        let registry = ConverterRegistry::new();
        let variant = registry.pack(0.5_f32).unwrap();
        assert_eq!(registry.type_name_of(variant.tag()), Some("f32"));
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_stats_count_lookups() {
        let registry = ConverterRegistry::new();
        registry.pack(Label("a".to_string())).unwrap();
        registry.pack(Label("b".to_string())).unwrap();
        registry.pack(1_i16).unwrap();

        let stats = registry.stats();
        assert_eq!(stats.lookups, 3);
        assert_eq!(stats.resolutions, 1);
        assert_eq!(stats.failures, 0);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_missing_converter_is_reported_once() {
        let registry = ConverterRegistry::new();
        registry.declare::<Handle>().unwrap();

        for frame in 0..5 {
            assert!(registry.pack(Handle(frame)).is_err());
        }

        let stats = registry.stats();
        assert_eq!(stats.lookups, 5);
        assert_eq!(stats.failures, 1);
    }
}
