//! The single error type returned by every fallible operation in this crate.

use std::fmt;

/// Everything that can go wrong registering a type or running the codec.
///
/// Type mismatches on [`crate::typed_ref::TypedRef::get`] are *not* part of
/// this enum: the specification treats them as programmer error, so they
/// panic instead of returning a `Result`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A record's name, 32-bit hash, or `TypeId` was already registered.
    #[error("`{name}` conflicts with an already-registered record ({reason})")]
    RegistryCollision {
        name: &'static str,
        reason: CollisionReason,
    },

    /// The wire carried a name hash that no registered record owns.
    #[error("unknown record with hash 0x{hash:08x}")]
    UnknownRecord { hash: u32 },

    /// A record's flattened member+base count exceeds the 64-bit bitmap.
    #[error("`{name}` has {count} flattenable members+bases, exceeding the 64-field limit")]
    TooManyFields { name: &'static str, count: usize },

    /// The reader ran out of bytes before a value finished decoding.
    #[error("input truncated while decoding `{context}`")]
    TruncatedInput { context: &'static str },

    /// A conditional member's bitmap bit didn't agree with its predicate.
    #[error("conditional member `{member}` of `{record}` disagreed with its presence bit on read")]
    PredicateDisagreement {
        record: &'static str,
        member: &'static str,
    },

    /// The wire named a schema version newer than the reader understands.
    #[error("`{name}` was written at version {written}, newer than the registered current version {current}")]
    FutureVersion {
        name: &'static str,
        written: i8,
        current: i8,
    },

    /// The caller-provided sink/source failed outside the codec itself.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why [`Error::RegistryCollision`] was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionReason {
    Name,
    Hash,
    TypeId,
}

impl fmt::Display for CollisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollisionReason::Name => "duplicate name",
            CollisionReason::Hash => "duplicate 32-bit name hash",
            CollisionReason::TypeId => "duplicate TypeId",
        })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
