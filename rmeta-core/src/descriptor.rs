//! The tagged-union type descriptor at the heart of the reflection model.
//!
//! A [`Descriptor`] is built once per Rust type (see [`crate::registry`]) and
//! lives for the rest of the process. Everything category-specific is a
//! plain `fn` pointer rather than a boxed closure, so a `Descriptor` stays a
//! simple `'static` value: each operation is a monomorphized free function
//! (one instantiation per concrete `T`) coerced to the matching pointer type,
//! the same trick this codebase already uses for its wire-parsing tables.

use std::any::TypeId;

use crate::iter::{MapIter, MapIterMut, SeqIter, SeqIterMut};
use crate::member::RecordInfo;
use crate::typed_ref::{TypedRef, TypedRefMut};

/// A runtime description of a Rust type: its layout plus a [`Category`]
/// describing how to walk it structurally.
#[derive(Debug)]
pub struct Descriptor {
    pub size: usize,
    pub alignment: usize,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub category: Category,
}

/// One closure-initializer per freshly default-constructed element; the
/// codec uses this to decode a new sequence/set/map entry in place instead
/// of constructing it off to the side and cloning it in (Rust has no
/// `reinterpret_cast`-based placement-new, so "default, then fill" is the
/// idiomatic substitute — see DESIGN.md).
pub type Init<'a> = dyn FnMut(TypedRefMut<'_>) + 'a;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

pub struct StringOps {
    pub get_view: fn(&[u8]) -> &[u8],
    pub set_from_view: fn(&mut [u8], &[u8]),
}

pub struct EnumOps {
    pub to_int: fn(&[u8]) -> i32,
    pub from_int: fn(&mut [u8], i32),
    pub variants: &'static [(i32, &'static str)],
}

pub struct DynSeqOps {
    pub elem: fn() -> &'static Descriptor,
    pub len: fn(&[u8]) -> usize,
    pub push_default: fn(&mut [u8], &mut Init<'_>),
    pub iter: fn(&[u8]) -> SeqIter<'_>,
    pub iter_mut: fn(&mut [u8]) -> SeqIterMut<'_>,
}

pub struct FixSeqOps {
    pub elem: fn() -> &'static Descriptor,
    pub len: usize,
    pub iter: fn(&[u8]) -> SeqIter<'_>,
    pub iter_mut: fn(&mut [u8]) -> SeqIterMut<'_>,
}

pub struct SetOps {
    pub elem: fn() -> &'static Descriptor,
    pub len: fn(&[u8]) -> usize,
    pub insert_default: fn(&mut [u8], &mut Init<'_>),
    pub iter: fn(&[u8]) -> SeqIter<'_>,
}

pub struct MapOps {
    pub key: fn() -> &'static Descriptor,
    pub value: fn() -> &'static Descriptor,
    pub len: fn(&[u8]) -> usize,
    pub insert_default: fn(&mut [u8], &mut Init<'_>, &mut Init<'_>),
    pub iter: fn(&[u8]) -> MapIter<'_>,
    pub iter_mut: fn(&mut [u8]) -> MapIterMut<'_>,
}

pub struct RecordOps {
    pub name: &'static str,
    pub name_hash: u32,
    pub current_version: i8,
    pub info: fn(version: i8) -> RecordInfo,
    pub allocate: fn() -> Box<dyn std::any::Any>,
}

pub struct PtrOps {
    /// The statically-declared target record (the base of the pointer's
    /// declared type; the dynamic type reachable through it may be a
    /// registered subtype).
    pub target: fn() -> &'static Descriptor,
    pub as_pointer: fn(&[u8]) -> Option<TypedRef<'_>>,
    pub as_pointer_mut: fn(&mut [u8]) -> Option<TypedRefMut<'_>>,
    pub assign_new: fn(&mut [u8], dynamic_type: &'static Descriptor) -> TypedRefMut<'_>,
    /// Resets the pointer to empty; used when the codec reads back a `0`
    /// (null) name hash.
    pub clear: fn(&mut [u8]),
}

pub struct ErasedOps {
    pub target_type: fn(&[u8]) -> Option<&'static Descriptor>,
    pub target: fn(&[u8]) -> Option<TypedRef<'_>>,
    pub target_mut: fn(&mut [u8]) -> Option<TypedRefMut<'_>>,
    pub assign_new: fn(&mut [u8], dynamic_type: &'static Descriptor) -> TypedRefMut<'_>,
    /// Resets the slot to empty; used when the codec reads back a `0` (null)
    /// name hash.
    pub clear: fn(&mut [u8]),
}

pub enum Category {
    Scalar(ScalarKind),
    String(StringOps),
    Enum(EnumOps),
    DynSeq(DynSeqOps),
    FixSeq(FixSeqOps),
    Set(SetOps),
    Map(MapOps),
    Record(RecordOps),
    OwningPtrRecord(PtrOps),
    TypeErased(ErasedOps),
}

impl std::fmt::Debug for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Scalar(kind) => return write!(f, "Scalar({kind:?})"),
            Category::String(_) => "String",
            Category::Enum(_) => "Enum",
            Category::DynSeq(_) => "DynSeq",
            Category::FixSeq(_) => "FixSeq",
            Category::Set(_) => "Set",
            Category::Map(_) => "Map",
            Category::Record(ops) => return write!(f, "Record({})", ops.name),
            Category::OwningPtrRecord(_) => "OwningPtrRecord",
            Category::TypeErased(_) => "TypeErased",
        };
        f.write_str(name)
    }
}

impl Descriptor {
    pub fn as_record(&self) -> Option<&RecordOps> {
        match &self.category {
            Category::Record(ops) => Some(ops),
            _ => None,
        }
    }
}
