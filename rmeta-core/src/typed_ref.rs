//! Type-erased, descriptor-carrying pointers: the ABI between the codec and
//! typed memory.

use std::any::TypeId;

use crate::descriptor::Category;
use crate::descriptor::Descriptor;
use crate::registry::{descriptor_of, Reflected};

/// A read-only type-erased reference: a descriptor paired with the exact
/// byte span of the value it describes.
#[derive(Clone, Copy)]
pub struct TypedRef<'a> {
    descriptor: &'static Descriptor,
    bytes: &'a [u8],
}

impl<'a> TypedRef<'a> {
    pub fn new<T: Reflected>(value: &'a T) -> Self {
        let descriptor = descriptor_of::<T>();
        debug_assert_eq!(descriptor.size, std::mem::size_of::<T>());
        // SAFETY: `descriptor.size` is `size_of::<T>()` (invariant 3), and
        // `value` is a valid `&T` for the duration of `'a`.
        let bytes = unsafe {
            std::slice::from_raw_parts((value as *const T).cast::<u8>(), descriptor.size)
        };
        Self { descriptor, bytes }
    }

    /// Builds a `TypedRef` from a descriptor and a byte span already known
    /// to hold a valid value of that descriptor's type. Used internally by
    /// member accessors and container iterators, which slice a larger
    /// buffer rather than starting from a concrete `&T`.
    ///
    /// # Safety
    /// `bytes.len()` must equal `descriptor.size` and the bytes must be a
    /// valid, initialized value of the type `descriptor` describes.
    pub unsafe fn from_raw(descriptor: &'static Descriptor, bytes: &'a [u8]) -> Self {
        Self { descriptor, bytes }
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        self.descriptor
    }

    pub fn category(&self) -> &'static Category {
        &self.descriptor.category
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Recovers a `&T`.
    ///
    /// # Panics
    /// Panics if `T` doesn't match the descriptor this reference carries.
    /// A type mismatch here is a programmer error, not recoverable input —
    /// matching the source specification's abort semantics (see §4.2).
    pub fn get<T: Reflected>(&self) -> &'a T {
        assert_eq!(
            self.descriptor.type_id,
            TypeId::of::<T>(),
            "TypedRef::get::<{}>() called on a `{}` value",
            std::any::type_name::<T>(),
            self.descriptor.type_name,
        );
        // SAFETY: type_id match just asserted above, and `bytes` was
        // constructed from a valid `T` (see `new`/`from_raw`'s contracts).
        unsafe { &*self.bytes.as_ptr().cast::<T>() }
    }
}

/// The mutable counterpart of [`TypedRef`].
pub struct TypedRefMut<'a> {
    descriptor: &'static Descriptor,
    bytes: &'a mut [u8],
}

impl<'a> TypedRefMut<'a> {
    pub fn new<T: Reflected>(value: &'a mut T) -> Self {
        let descriptor = descriptor_of::<T>();
        debug_assert_eq!(descriptor.size, std::mem::size_of::<T>());
        // SAFETY: see `TypedRef::new`.
        let bytes = unsafe {
            std::slice::from_raw_parts_mut((value as *mut T).cast::<u8>(), descriptor.size)
        };
        Self { descriptor, bytes }
    }

    /// # Safety
    /// Same contract as [`TypedRef::from_raw`], plus exclusive access to
    /// `bytes` for `'a`.
    pub unsafe fn from_raw(descriptor: &'static Descriptor, bytes: &'a mut [u8]) -> Self {
        Self { descriptor, bytes }
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        self.descriptor
    }

    pub fn bytes(&self) -> &[u8] {
        self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.bytes
    }

    pub fn get<T: Reflected>(&self) -> &T {
        self.downgrade_ref().get::<T>()
    }

    pub fn get_mut<T: Reflected>(&mut self) -> &mut T {
        assert_eq!(
            self.descriptor.type_id,
            TypeId::of::<T>(),
            "TypedRefMut::get_mut::<{}>() called on a `{}` value",
            std::any::type_name::<T>(),
            self.descriptor.type_name,
        );
        // SAFETY: see `TypedRef::get`.
        unsafe { &mut *self.bytes.as_mut_ptr().cast::<T>() }
    }

    /// Weakens this reference to a read-only [`TypedRef`] borrowing for the
    /// same lifetime `'a` (consumes `self`, since the mutable borrow it
    /// holds must end for the shared one to start).
    pub fn downgrade(self) -> TypedRef<'a> {
        TypedRef {
            descriptor: self.descriptor,
            bytes: self.bytes,
        }
    }

    fn downgrade_ref(&self) -> TypedRef<'_> {
        TypedRef {
            descriptor: self.descriptor,
            bytes: self.bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_ref_is_send_and_sync() {
        static_assertions::assert_impl_all!(TypedRef<'static>: Send, Sync);
        static_assertions::assert_impl_all!(TypedRefMut<'static>: Send, Sync);
    }
}
