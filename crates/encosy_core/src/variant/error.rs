use crate::variant::TypeTag;
use thiserror::Error;

/// Errors raised while packing or unpacking variants.
///
/// A type mismatch on the `try_` paths is not an error; those return `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    #[error("cannot read a `{found}` variant as `{expected}`")]
    InvalidCast { expected: TypeTag, found: TypeTag },

    #[error("no converter is available for `{type_name}`")]
    ConversionUnsupported { type_name: &'static str },

    #[error("a converter for `{type_name}` is already registered")]
    ConverterAlreadyRegistered { type_name: &'static str },

    #[error("variant payload for `{type_name}` could not be decoded")]
    CorruptPayload { type_name: &'static str },
}
