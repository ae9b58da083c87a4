//! The global, process-wide descriptor registry.
//!
//! Lookup goes through a `RwLock`, matching this codebase's existing
//! "read-mostly after a brief init window" concurrency style: registration
//! happens early and rarely (usually from `OnceLock`-backed statics reached
//! on first use), after which steady-state traffic is all `read()`s that
//! never block each other.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, RwLock};

use crate::descriptor::Descriptor;
use crate::error::{CollisionReason, Error, Result};
use crate::member::validate_field_count;

/// Implemented for every Rust type with a registered [`Descriptor`],
/// normally via `#[derive(Reflect)]` or the `reflect_record!`/
/// `reflect_enum!` macros. This is the crate's main entry point.
pub trait Reflected: 'static {
    fn descriptor() -> &'static Descriptor;
}

/// Zero-cost access to `T`'s static descriptor.
pub fn descriptor_of<T: Reflected>() -> &'static Descriptor {
    T::descriptor()
}

#[derive(Default)]
struct RegistryInner {
    by_type: HashMap<TypeId, &'static Descriptor>,
    by_name: HashMap<&'static str, &'static Descriptor>,
    by_hash: HashMap<u32, &'static Descriptor>,
}

fn registry() -> &'static RwLock<RegistryInner> {
    static REGISTRY: OnceLock<RwLock<RegistryInner>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(RegistryInner::default()))
}

/// Registration is globally serialized so a collision check and the
/// corresponding insert are atomic with respect to other registrations.
fn registration_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Registers a record descriptor, failing if its name, 32-bit hash, or
/// `TypeId` collides with an already-registered record (invariant 2).
/// Also validates the record's flattened field count against the 64-bit
/// bitmap limit (§4.4.2).
pub fn register_record(descriptor: &'static Descriptor) -> Result<()> {
    let _guard = registration_lock().lock().unwrap();
    let ops = descriptor
        .as_record()
        .unwrap_or_else(|| panic!("register_record called with a non-record descriptor"));

    if let Err(err) = validate_field_count(descriptor, ops.name) {
        log_registration_failure(&err);
        return Err(err);
    }

    let mut inner = registry().write().unwrap();
    if inner.by_type.contains_key(&descriptor.type_id) {
        let err = Error::RegistryCollision {
            name: ops.name,
            reason: CollisionReason::TypeId,
        };
        log_registration_failure(&err);
        return Err(err);
    }
    if inner.by_name.contains_key(ops.name) {
        let err = Error::RegistryCollision {
            name: ops.name,
            reason: CollisionReason::Name,
        };
        log_registration_failure(&err);
        return Err(err);
    }
    if inner.by_hash.contains_key(&ops.name_hash) {
        let err = Error::RegistryCollision {
            name: ops.name,
            reason: CollisionReason::Hash,
        };
        log_registration_failure(&err);
        return Err(err);
    }

    inner.by_type.insert(descriptor.type_id, descriptor);
    inner.by_name.insert(ops.name, descriptor);
    inner.by_hash.insert(ops.name_hash, descriptor);

    #[cfg(feature = "tracing")]
    tracing::debug!(name = ops.name, hash = ops.name_hash, "registered record");

    Ok(())
}

fn log_registration_failure(err: &Error) {
    #[cfg(feature = "tracing")]
    tracing::error!(error = %err, "record registration failed");
    #[cfg(not(feature = "tracing"))]
    let _ = err;
}

pub fn lookup_by_name(name: &str) -> Option<&'static Descriptor> {
    registry().read().unwrap().by_name.get(name).copied()
}

pub fn lookup_by_hash(hash: u32) -> Option<&'static Descriptor> {
    registry().read().unwrap().by_hash.get(&hash).copied()
}

pub fn lookup_by_type_id(type_id: TypeId) -> Option<&'static Descriptor> {
    registry().read().unwrap().by_type.get(&type_id).copied()
}

/// 32-bit non-zero FNV-1a hash of a record name, used as its on-wire
/// identity for polymorphic pointer/type-erased dispatch (invariant 2).
pub const fn name_hash(name: &str) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let bytes = name.as_bytes();
    let mut hash = OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(PRIME);
        i += 1;
    }
    if hash == 0 {
        1
    } else {
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_hash_is_never_zero() {
        assert_ne!(name_hash(""), 0);
        assert_ne!(name_hash("Point"), 0);
    }

    #[test]
    fn name_hash_is_stable() {
        assert_eq!(name_hash("Point"), name_hash("Point"));
        assert_ne!(name_hash("Point"), name_hash("Point2"));
    }
}
