//! Record members, base classes, and the inheritance-flattening model.
//!
//! Offsets here are never used for raw pointer arithmetic at call time —
//! they are retained for diagnostics and for invariant 5 (base offsets
//! compose by addition). The actual byte access always goes through the
//! `get`/`get_mut` accessor closures, which are generated from real
//! `std::mem::offset_of!` expressions (or, for the declarative macro path,
//! from field-path closures the caller supplies directly).

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};

#[derive(Clone, Copy)]
pub struct Member {
    pub name: &'static str,
    pub offset: usize,
    pub descriptor: fn() -> &'static Descriptor,
    pub get: fn(&[u8]) -> &[u8],
    pub get_mut: fn(&mut [u8]) -> &mut [u8],
    /// `Some(predicate)` for a conditional member: present on the wire only
    /// when `predicate(record_bytes)` is true.
    pub condition: Option<fn(&[u8]) -> bool>,
    /// Whether this member's current value equals its type's default,
    /// which is what `skip-default-members` tests to decide presence for
    /// unconditional members. Takes the member's own byte span (already
    /// offset into the containing record), the same span `codec` slices
    /// out via `FlatMember::offset`, not the whole record.
    pub is_default: fn(&[u8]) -> bool,
}

#[derive(Clone, Copy)]
pub struct BaseClass {
    pub descriptor: fn() -> &'static Descriptor,
    pub offset: usize,
    pub get: fn(&[u8]) -> &[u8],
    pub get_mut: fn(&mut [u8]) -> &mut [u8],
}

pub struct RecordInfo {
    pub members: Vec<Member>,
    pub bases: Vec<BaseClass>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassHeader {
    pub name_hash: u32,
    pub version: i8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassHeaderList(pub Vec<ClassHeader>);

impl ClassHeaderList {
    pub fn find(&self, name_hash: u32) -> Option<&ClassHeader> {
        self.0.iter().find(|h| h.name_hash == name_hash)
    }
}

/// A record member with its offset corrected for the base-class chain it
/// was reached through.
#[derive(Clone, Copy)]
pub struct FlatMember {
    pub member: Member,
    pub offset: usize,
}

/// The headers a record was declared under today: its own `(name,
/// current_version)` followed, depth-first, by its bases' current headers.
pub fn current_headers(descriptor: &'static Descriptor) -> ClassHeaderList {
    let mut out = Vec::new();
    collect_current_headers(descriptor, &mut out);
    ClassHeaderList(out)
}

fn collect_current_headers(descriptor: &'static Descriptor, out: &mut Vec<ClassHeader>) {
    let Some(ops) = descriptor.as_record() else {
        return;
    };
    out.push(ClassHeader {
        name_hash: ops.name_hash,
        version: ops.current_version,
    });
    let info = (ops.info)(ops.current_version);
    for base in &info.bases {
        collect_current_headers((base.descriptor)(), out);
    }
}

type CacheKey = (TypeId, ClassHeaderList);

fn cache() -> &'static RwLock<HashMap<CacheKey, &'static [FlatMember]>> {
    static CACHE: OnceLock<RwLock<HashMap<CacheKey, &'static [FlatMember]>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// The fully flattened member list for `descriptor` under the schema named
/// by `headers`, memoized by `(TypeId, ClassHeaderList)` and never evicted
/// (matching the memoization lifecycle in §3 of the design).
pub fn all_members(descriptor: &'static Descriptor, headers: &ClassHeaderList) -> &'static [FlatMember] {
    let key = (descriptor.type_id, headers.clone());
    if let Some(hit) = cache().read().unwrap().get(&key) {
        return hit;
    }
    let computed = compute_all_members(descriptor, headers, 0);
    let leaked: &'static [FlatMember] = Box::leak(computed.into_boxed_slice());
    // A concurrent writer may have raced us here; both leaks are harmless
    // (the cache is never evicted) and the map simply keeps whichever
    // insert lands last.
    cache().write().unwrap().insert(key, leaked);
    leaked
}

fn compute_all_members(
    descriptor: &'static Descriptor,
    headers: &ClassHeaderList,
    base_offset: usize,
) -> Vec<FlatMember> {
    let ops = descriptor
        .as_record()
        .unwrap_or_else(|| panic!("`{}` is not a record descriptor", descriptor.type_name));
    let header = headers
        .find(ops.name_hash)
        .unwrap_or_else(|| panic!("ClassHeaderList is missing a header for `{}`", ops.name));
    let info = (ops.info)(header.version);

    let mut out = Vec::new();
    for base in &info.bases {
        let base_descriptor = (base.descriptor)();
        out.extend(compute_all_members(
            base_descriptor,
            headers,
            base_offset + base.offset,
        ));
    }
    for member in info.members {
        out.push(FlatMember {
            member,
            offset: base_offset + member.offset,
        });
    }
    out
}

/// Bitmap width in bytes, or `Err` if the record has too many flattenable
/// members to fit the largest supported bitmap (64 bits). Called once at
/// registration time, against the record's *current* schema.
pub fn validate_field_count(descriptor: &'static Descriptor, name: &'static str) -> Result<()> {
    let headers = current_headers(descriptor);
    let count = all_members(descriptor, &headers).len();
    if count > 64 {
        return Err(Error::TooManyFields { name, count });
    }
    Ok(())
}

/// The bitmap width (in bits) for a record with `field_count` flattened
/// members, per §4.4.2.
pub fn bitmap_width_bits(field_count: usize) -> u32 {
    match field_count {
        0..=8 => 8,
        9..=16 => 16,
        17..=32 => 32,
        _ => 64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_widths_match_spec_bands() {
        assert_eq!(bitmap_width_bits(0), 8);
        assert_eq!(bitmap_width_bits(8), 8);
        assert_eq!(bitmap_width_bits(9), 16);
        assert_eq!(bitmap_width_bits(16), 16);
        assert_eq!(bitmap_width_bits(17), 32);
        assert_eq!(bitmap_width_bits(32), 32);
        assert_eq!(bitmap_width_bits(33), 64);
        assert_eq!(bitmap_width_bits(64), 64);
    }
}
