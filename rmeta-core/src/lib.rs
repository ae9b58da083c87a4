//! Runtime reflection and an optimistic binary serialization codec for
//! registered Rust types.
//!
//! Each type used with this crate gets a process-wide, `'static`
//! [`Descriptor`](descriptor::Descriptor) describing its layout and a
//! structural [`Category`](descriptor::Category) (scalar, string, sequence,
//! set, map, record, owning pointer, or type-erased slot). Descriptors are
//! produced lazily, on first use, by the [`Reflected`](registry::Reflected)
//! trait — implement it by hand, derive it with `#[derive(Reflect)]`, or
//! generate it with [`reflect_record!`]/[`reflect_enum!`].
//!
//! On top of that substrate sits the binary codec in [`codec`]:
//! [`write_binary`] and [`read_binary`] serialize any registered type using
//! varint integers, compressed `f32`s, bitmap-skipped default members, and
//! class-header chains that let a reader accept data written by an older
//! schema version.

pub mod codec;
pub mod containers;
pub mod descriptor;
pub mod error;
pub mod float8;
pub mod iter;
pub mod macros;
pub mod member;
pub mod ptr;
pub mod reader;
pub mod registry;
pub mod scalars;
pub mod typed_ref;
pub mod varint;
pub mod writer;

pub use codec::{read_binary, write_binary};
pub use descriptor::{Category, Descriptor};
pub use error::{Error, Result};
pub use member::{BaseClass, ClassHeader, ClassHeaderList, Member, RecordInfo};
pub use ptr::{OwningPtrRecord, TypeErased};
pub use registry::{descriptor_of, lookup_by_hash, lookup_by_name, lookup_by_type_id, Reflected};
pub use typed_ref::{TypedRef, TypedRefMut};

/// Derives [`Reflected`] for a flat record struct or an integer-backed enum.
///
/// Re-exported from `rmeta-derive` so downstream crates only need to depend
/// on `rmeta-core`.
pub use rmeta_derive::Reflect;
