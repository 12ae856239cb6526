// value.rs - Declared converters per type
//
// Any `Clone + Send + Sync` type packs without ceremony: an unknown type gets
// a boxed converter on first use. `VariantValue` is the static replacement
// for attribute-driven converter generation; a type opts in once, either by
// hand or through `variant_value!`, and `ConverterRegistry::declare` installs
// what it asks for.

use crate::variant::{
    render_display, render_type_name, BoxedConverter, Converter, ConverterRegistry,
    InlineConverter, ReprConverter, SharedConverter, VariantError,
};
use bytemuck::Pod;
use std::any::{type_name, Any};
use std::sync::Arc;

/// A type that declares how it travels inside a
/// [`Variant`](crate::variant::Variant).
///
/// Declaring is optional. The default converter is the same boxed one an
/// undeclared type falls back to; implementations override it to store the
/// value inline or to demand a registered converter.
pub trait VariantValue: Any + Clone + Send + Sync {
    fn default_converter() -> Result<Arc<dyn Converter<Self>>, VariantError> {
        Ok(Arc::new(BoxedConverter::<Self>::new(render_type_name::<Self>)))
    }
}

/// Inline converter for `T`, or a boxed one when `T` is too large.
pub fn inline_or_boxed<T: Pod + Send + Sync>(render: fn(&T) -> String) -> Arc<dyn Converter<T>> {
    match InlineConverter::<T>::new(render) {
        Ok(converter) => Arc::new(converter),
        Err(_) => {
            tracing::debug!(
                type_name = type_name::<T>(),
                size = std::mem::size_of::<T>(),
                "payload exceeds inline capacity, storing boxed"
            );
            Arc::new(BoxedConverter::<T>::new(render))
        }
    }
}

/// Declare how types travel inside a variant.
///
/// - `inline` / `inline_debug`: `Pod` types copied into the inline buffer,
///   rendered with `Display` / `Debug`. Types larger than the buffer fall
///   back to boxed storage.
/// - `boxed` / `boxed_debug`: cloned into a shared box.
/// - `registered`: no default; once declared, packing fails with
///   `VariantError::ConversionUnsupported` until a converter is registered.
///
/// The declaration takes effect in a registry once
/// `ConverterRegistry::declare` runs for the type.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
/// #[repr(C)]
/// struct Rgba { r: f32, g: f32, b: f32, a: f32 }
///
/// variant_value!(inline_debug Rgba);
/// registry.declare::<Rgba>()?;
/// ```
#[macro_export]
macro_rules! variant_value {
    (inline $($ty:ty),+ $(,)?) => {
        $( $crate::variant_value!(@inline $ty, $crate::variant::render_display::<$ty>); )+
    };
    (inline_debug $($ty:ty),+ $(,)?) => {
        $( $crate::variant_value!(@inline $ty, $crate::variant::render_debug::<$ty>); )+
    };
    (boxed $($ty:ty),+ $(,)?) => {
        $( $crate::variant_value!(@boxed $ty, $crate::variant::render_display::<$ty>); )+
    };
    (boxed_debug $($ty:ty),+ $(,)?) => {
        $( $crate::variant_value!(@boxed $ty, $crate::variant::render_debug::<$ty>); )+
    };
    (registered $($ty:ty),+ $(,)?) => {
        $(
            impl $crate::variant::VariantValue for $ty {
                fn default_converter() -> ::std::result::Result<
                    ::std::sync::Arc<dyn $crate::variant::Converter<Self>>,
                    $crate::variant::VariantError,
                > {
                    ::std::result::Result::Err($crate::variant::VariantError::ConversionUnsupported {
                        type_name: ::std::any::type_name::<Self>(),
                    })
                }
            }
        )+
    };
    (@inline $ty:ty, $render:expr) => {
        impl $crate::variant::VariantValue for $ty {
            fn default_converter() -> ::std::result::Result<
                ::std::sync::Arc<dyn $crate::variant::Converter<Self>>,
                $crate::variant::VariantError,
            > {
                ::std::result::Result::Ok($crate::variant::inline_or_boxed::<Self>($render))
            }
        }
    };
    (@boxed $ty:ty, $render:expr) => {
        impl $crate::variant::VariantValue for $ty {
            fn default_converter() -> ::std::result::Result<
                ::std::sync::Arc<dyn $crate::variant::Converter<Self>>,
                $crate::variant::VariantError,
            > {
                ::std::result::Result::Ok(::std::sync::Arc::new(
                    $crate::variant::BoxedConverter::<Self>::new($render),
                ))
            }
        }
    };
}

variant_value!(inline u8, u16, u32, u64, u128, usize);
variant_value!(inline i8, i16, i32, i64, i128, isize);
variant_value!(inline f32, f64);
variant_value!(boxed String, &'static str);

variant_value!(inline glam::Vec2, glam::Vec3, glam::Vec4, glam::Quat);
variant_value!(inline glam::IVec2, glam::IVec3, glam::IVec4, glam::UVec2, glam::UVec3);
variant_value!(inline glam::Mat4);

impl VariantValue for bool {
    fn default_converter() -> Result<Arc<dyn Converter<Self>>, VariantError> {
        let converter = ReprConverter::<bool, u8>::new(
            u8::from,
            |repr| match repr {
                0 => Some(false),
                1 => Some(true),
                _ => None,
            },
            render_display::<bool>,
        )?;
        Ok(Arc::new(converter))
    }
}

impl VariantValue for char {
    fn default_converter() -> Result<Arc<dyn Converter<Self>>, VariantError> {
        let converter = ReprConverter::<char, u32>::new(
            u32::from,
            char::from_u32,
            render_display::<char>,
        )?;
        Ok(Arc::new(converter))
    }
}

impl<U: Any + Send + Sync> VariantValue for Arc<U> {
    fn default_converter() -> Result<Arc<dyn Converter<Self>>, VariantError> {
        Ok(Arc::new(SharedConverter::<U>::new(render_type_name::<U>)))
    }
}

/// Install the converters every registry starts with.
pub(crate) fn declare_builtins(registry: &ConverterRegistry) {
    macro_rules! declare {
        ($($ty:ty),+ $(,)?) => {
            $(
                if let Err(err) = registry.declare::<$ty>() {
                    tracing::warn!(type_name = type_name::<$ty>(), error = %err, "built-in declaration skipped");
                }
            )+
        };
    }

    declare!(u8, u16, u32, u64, u128, usize);
    declare!(i8, i16, i32, i64, i128, isize);
    declare!(f32, f64, bool, char);
    declare!(String, &'static str);
    declare!(glam::Vec2, glam::Vec3, glam::Vec4, glam::Quat);
    declare!(glam::IVec2, glam::IVec3, glam::IVec4, glam::UVec2, glam::UVec3);
    declare!(glam::Mat4);
}
