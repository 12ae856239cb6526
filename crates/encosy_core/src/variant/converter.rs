// converter.rs - Typed pack/unpack strategies
//
// One converter instance exists per concrete type. Each implementation checks
// the variant's tag before touching the payload, so a mismatch is always a
// cheap `None`.

use crate::variant::{TypeTag, Variant, VariantError, INLINE_CAPACITY};
use bytemuck::Pod;
use std::any::{type_name, Any};
use std::fmt::{Debug, Display};
use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::Arc;

/// Strategy that moves values of `T` in and out of a [`Variant`].
pub trait Converter<T: 'static>: Send + Sync {
    fn pack(&self, value: T) -> Variant;

    /// Returns `None` when the variant does not hold a `T`.
    fn try_unpack(&self, variant: &Variant) -> Option<T>;

    /// Render the stored value without handing it to the caller.
    fn stringify(&self, variant: &Variant) -> String;

    fn unpack(&self, variant: &Variant) -> Result<T, VariantError> {
        let expected = TypeTag::of::<T>();
        if variant.tag() != expected {
            return Err(VariantError::InvalidCast {
                expected,
                found: variant.tag(),
            });
        }
        self.try_unpack(variant)
            .ok_or(VariantError::CorruptPayload {
                type_name: type_name::<T>(),
            })
    }
}

pub fn render_display<T: Display>(value: &T) -> String {
    value.to_string()
}

pub fn render_debug<T: Debug>(value: &T) -> String {
    format!("{value:?}")
}

/// Fallback rendering for types with no textual form: the type's name.
pub fn render_type_name<T>(_value: &T) -> String {
    type_name::<T>().to_string()
}

fn describe_miss<T>(variant: &Variant) -> String {
    format!("<{} is not {}>", variant.tag(), type_name::<T>())
}

/// Copies `Pod` payloads into the variant's inline buffer.
pub struct InlineConverter<T> {
    tag: TypeTag,
    render: fn(&T) -> String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Pod> InlineConverter<T> {
    /// Fails with [`VariantError::ConversionUnsupported`] when `T` does not
    /// fit in [`INLINE_CAPACITY`] bytes.
    pub fn new(render: fn(&T) -> String) -> Result<Self, VariantError> {
        if !Self::fits() {
            return Err(VariantError::ConversionUnsupported {
                type_name: type_name::<T>(),
            });
        }
        Ok(Self {
            tag: TypeTag::of::<T>(),
            render,
            _marker: PhantomData,
        })
    }

    #[inline]
    pub fn fits() -> bool {
        size_of::<T>() <= INLINE_CAPACITY
    }
}

impl<T: Pod> Converter<T> for InlineConverter<T> {
    fn pack(&self, value: T) -> Variant {
        let mut bytes = [0u8; INLINE_CAPACITY];
        bytes[..size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
        Variant::with_inline(self.tag, bytes)
    }

    fn try_unpack(&self, variant: &Variant) -> Option<T> {
        if variant.tag() != self.tag {
            return None;
        }
        let bytes = variant.inline_bytes()?;
        Some(bytemuck::pod_read_unaligned(&bytes[..size_of::<T>()]))
    }

    fn stringify(&self, variant: &Variant) -> String {
        match self.try_unpack(variant) {
            Some(value) => (self.render)(&value),
            None => describe_miss::<T>(variant),
        }
    }
}

/// Stores `T` inline through a `Pod` representation `R`.
///
/// Used for types with invalid bit patterns (`bool`, `char`) that cannot be
/// `Pod` themselves. `from_repr` rejects representations that do not decode.
pub struct ReprConverter<T, R> {
    inner: InlineConverter<R>,
    tag: TypeTag,
    to_repr: fn(T) -> R,
    from_repr: fn(R) -> Option<T>,
    render: fn(&T) -> String,
}

impl<T: 'static, R: Pod> ReprConverter<T, R> {
    pub fn new(
        to_repr: fn(T) -> R,
        from_repr: fn(R) -> Option<T>,
        render: fn(&T) -> String,
    ) -> Result<Self, VariantError> {
        let inner = InlineConverter::<R>::new(render_type_name::<R>).map_err(|_| {
            VariantError::ConversionUnsupported {
                type_name: type_name::<T>(),
            }
        })?;
        Ok(Self {
            inner,
            tag: TypeTag::of::<T>(),
            to_repr,
            from_repr,
            render,
        })
    }
}

impl<T: 'static, R: Pod> Converter<T> for ReprConverter<T, R> {
    fn pack(&self, value: T) -> Variant {
        let carrier = self.inner.pack((self.to_repr)(value));
        let bytes = carrier.inline_bytes().copied().unwrap_or([0u8; INLINE_CAPACITY]);
        Variant::with_inline(self.tag, bytes)
    }

    fn try_unpack(&self, variant: &Variant) -> Option<T> {
        if variant.tag() != self.tag {
            return None;
        }
        let bytes = variant.inline_bytes()?;
        let repr: R = bytemuck::pod_read_unaligned(&bytes[..size_of::<R>()]);
        (self.from_repr)(repr)
    }

    fn stringify(&self, variant: &Variant) -> String {
        match self.try_unpack(variant) {
            Some(value) => (self.render)(&value),
            None => describe_miss::<T>(variant),
        }
    }
}

/// Keeps `T` behind a shared pointer; unpacking clones the value out.
///
/// Callers that only read the value borrow it with [`Variant::try_ref`].
pub struct BoxedConverter<T> {
    tag: TypeTag,
    render: fn(&T) -> String,
}

impl<T: Any + Clone + Send + Sync> BoxedConverter<T> {
    pub fn new(render: fn(&T) -> String) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            render,
        }
    }

    fn peek<'v>(&self, variant: &'v Variant) -> Option<&'v T> {
        if variant.tag() != self.tag {
            return None;
        }
        variant.boxed_ref()?.downcast_ref::<T>()
    }
}

impl<T: Any + Clone + Send + Sync> Converter<T> for BoxedConverter<T> {
    fn pack(&self, value: T) -> Variant {
        Variant::with_boxed(self.tag, Arc::new(value))
    }

    fn try_unpack(&self, variant: &Variant) -> Option<T> {
        self.peek(variant).cloned()
    }

    fn stringify(&self, variant: &Variant) -> String {
        match self.peek(variant) {
            Some(value) => (self.render)(value),
            None => describe_miss::<T>(variant),
        }
    }
}

/// Stores an `Arc<U>` as the variant's boxed slot itself.
///
/// Unpacking hands back a pointer-equal `Arc`, never a copy of `U`.
pub struct SharedConverter<U> {
    tag: TypeTag,
    render: fn(&U) -> String,
}

impl<U: Any + Send + Sync> SharedConverter<U> {
    pub fn new(render: fn(&U) -> String) -> Self {
        Self {
            tag: TypeTag::of::<Arc<U>>(),
            render,
        }
    }
}

impl<U: Any + Send + Sync> Converter<Arc<U>> for SharedConverter<U> {
    fn pack(&self, value: Arc<U>) -> Variant {
        Variant::with_boxed(self.tag, value)
    }

    fn try_unpack(&self, variant: &Variant) -> Option<Arc<U>> {
        if variant.tag() != self.tag {
            return None;
        }
        Arc::clone(variant.boxed_ref()?).downcast::<U>().ok()
    }

    fn stringify(&self, variant: &Variant) -> String {
        if variant.tag() != self.tag {
            return describe_miss::<Arc<U>>(variant);
        }
        match variant.boxed_ref().and_then(|value| value.downcast_ref::<U>()) {
            Some(value) => (self.render)(value),
            None => describe_miss::<Arc<U>>(variant),
        }
    }
}

/// Converter assembled from plain functions.
///
/// This is the shape generated converter code registers: the functions own
/// the payload layout, the wrapper owns the tag check.
pub struct FnConverter<T> {
    tag: TypeTag,
    pack: fn(T) -> Variant,
    try_unpack: fn(&Variant) -> Option<T>,
    stringify: fn(&Variant) -> String,
}

impl<T: 'static> FnConverter<T> {
    pub fn new(
        pack: fn(T) -> Variant,
        try_unpack: fn(&Variant) -> Option<T>,
        stringify: fn(&Variant) -> String,
    ) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            pack,
            try_unpack,
            stringify,
        }
    }
}

impl<T: 'static> Converter<T> for FnConverter<T> {
    fn pack(&self, value: T) -> Variant {
        let variant = (self.pack)(value);
        debug_assert_eq!(
            variant.tag(),
            self.tag,
            "pack function for {} produced a foreign tag",
            type_name::<T>()
        );
        variant
    }

    fn try_unpack(&self, variant: &Variant) -> Option<T> {
        if variant.tag() != self.tag {
            return None;
        }
        (self.try_unpack)(variant)
    }

    fn stringify(&self, variant: &Variant) -> String {
        if variant.tag() != self.tag {
            return describe_miss::<T>(variant);
        }
        (self.stringify)(variant)
    }
}
