// tag.rs - Process-stable type tags
//
// Tags are small integers handed out the first time a Rust type is seen.
// They stand in for `TypeId` inside a `Variant` so the header stays four
// bytes and can be printed and compared cheaply.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{type_name, TypeId};
use std::fmt;
use std::mem::{align_of, size_of};
use std::sync::atomic::{AtomicU32, Ordering};

/// Opaque identifier for a runtime type.
///
/// `TypeTag::NONE` is reserved for empty variants; every real type gets a
/// non-zero tag.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(u32);

impl TypeTag {
    /// Tag carried by an empty variant.
    pub const NONE: TypeTag = TypeTag(0);

    /// Process-wide tag for `T`, registering it on first use.
    #[inline]
    pub fn of<T: 'static>() -> TypeTag {
        GLOBAL_TAGS.tag_of::<T>()
    }

    /// Metadata recorded when this tag was assigned by the process-wide
    /// table behind [`TypeTag::of`].
    ///
    /// A tag handed out by a separate [`TypeTagRegistry`] must be looked up
    /// in that registry instead; here it would name an unrelated type.
    pub fn meta(self) -> Option<TypeMeta> {
        GLOBAL_TAGS.meta(self)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// Prints the type name from the process-wide table (see [`TypeTag::meta`]).
impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("<none>");
        }
        match self.meta() {
            Some(meta) => f.write_str(meta.name),
            None => write!(f, "<tag {}>", self.0),
        }
    }
}

/// Layout metadata captured alongside each tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypeMeta {
    pub tag: TypeTag,
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
}

impl TypeMeta {
    fn of<T: 'static>(tag: TypeTag) -> Self {
        Self {
            tag,
            name: type_name::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
        }
    }
}

/// Tag table backing [`TypeTag::of`].
static GLOBAL_TAGS: Lazy<TypeTagRegistry> = Lazy::new(TypeTagRegistry::new);

/// Append-only mapping from Rust types to tags.
///
/// Assignment is insert-if-absent on a concurrent map: racing first uses of
/// the same type agree on a single tag, and a tag is never handed out twice.
///
/// Tags from a registry built with [`TypeTagRegistry::new`] only mean
/// something to that registry. Resolve them with [`meta`](Self::meta) or
/// [`name_of`](Self::name_of), not through `TypeTag`'s `Display`.
pub struct TypeTagRegistry {
    next: AtomicU32,
    by_type: DashMap<TypeId, TypeTag>,
    metas: DashMap<TypeTag, TypeMeta>,
}

impl TypeTagRegistry {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
            by_type: DashMap::new(),
            metas: DashMap::new(),
        }
    }

    /// Tag for `T`, assigning a fresh one on first request.
    pub fn tag_of<T: 'static>(&self) -> TypeTag {
        let id = TypeId::of::<T>();
        if let Some(tag) = self.by_type.get(&id) {
            return *tag;
        }

        *self.by_type.entry(id).or_insert_with(|| {
            let tag = TypeTag(self.next.fetch_add(1, Ordering::Relaxed));
            self.metas.insert(tag, TypeMeta::of::<T>(tag));
            tracing::trace!(tag = tag.0, type_name = type_name::<T>(), "assigned type tag");
            tag
        })
    }

    pub fn meta(&self, tag: TypeTag) -> Option<TypeMeta> {
        self.metas.get(&tag).map(|meta| *meta)
    }

    /// Type name recorded for `tag` in this registry.
    pub fn name_of(&self, tag: TypeTag) -> Option<&'static str> {
        self.meta(tag).map(|meta| meta.name)
    }

    /// Number of types seen so far.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl Default for TypeTagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct D0;
    struct D1;
    struct D2;
    struct D3;
    struct D4;
    struct D5;
    struct D6;
    struct D7;
    struct D8;
    struct D9;

    // Expands to one `tag_of` call per (a, b, c) triple of the listed markers.
    macro_rules! tag_product {
        ($registry:ident, $out:ident; [$($a:ident)*] $bs:tt $cs:tt) => {
            $( tag_product!(@b $registry, $out; $a; $bs $cs); )*
        };
        (@b $registry:ident, $out:ident; $a:ident; [$($b:ident)*] $cs:tt) => {
            $( tag_product!(@c $registry, $out; $a $b; $cs); )*
        };
        (@c $registry:ident, $out:ident; $a:ident $b:ident; [$($c:ident)*]) => {
            $( $out.push($registry.tag_of::<($a, $b, $c)>()); )*
        };
    }

    #[test]
    fn test_same_type_same_tag() {
        let registry = TypeTagRegistry::new();
        let first = registry.tag_of::<u32>();
        let second = registry.tag_of::<u32>();

        assert_eq!(first, second);
        assert!(!first.is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_types_distinct_tags() {
        let registry = TypeTagRegistry::new();
        assert_ne!(registry.tag_of::<u32>(), registry.tag_of::<i32>());
        assert_ne!(registry.tag_of::<String>(), registry.tag_of::<&'static str>());
    }

    #[test]
    fn test_thousand_types_pairwise_distinct() {
        let registry = TypeTagRegistry::new();
        let mut tags = Vec::with_capacity(1000);
        tag_product!(
            registry, tags;
            [D0 D1 D2 D3 D4 D5 D6 D7 D8 D9]
            [D0 D1 D2 D3 D4 D5 D6 D7 D8 D9]
            [D0 D1 D2 D3 D4 D5 D6 D7 D8 D9]
        );

        assert_eq!(tags.len(), 1000);
        let unique: HashSet<_> = tags.iter().copied().collect();
        assert_eq!(unique.len(), 1000);
        assert_eq!(registry.len(), 1000);
    }

    #[test]
    fn test_meta_records_layout() {
        let registry = TypeTagRegistry::new();
        let tag = registry.tag_of::<[f32; 3]>();
        let meta = registry.meta(tag).expect("meta recorded");

        assert_eq!(meta.tag, tag);
        assert_eq!(meta.size, 12);
        assert_eq!(meta.align, 4);
        assert_eq!(meta.name, "[f32; 3]");
    }

    #[test]
    fn test_scoped_tags_resolve_in_their_registry() {
        let registry = TypeTagRegistry::new();
        registry.tag_of::<D0>();
        let tag = registry.tag_of::<(D1, u8)>();

        assert_eq!(registry.name_of(tag), Some(type_name::<(D1, u8)>()));
        assert_eq!(registry.name_of(TypeTag::NONE), None);
        assert_ne!(registry.name_of(tag), registry.name_of(registry.tag_of::<D0>()));
    }

    #[test]
    fn test_display_uses_type_name() {
        assert_eq!(TypeTag::of::<u64>().to_string(), "u64");
        assert_eq!(TypeTag::NONE.to_string(), "<none>");
    }
}
