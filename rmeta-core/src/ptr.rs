//! Owning pointers to polymorphic records, and fully type-erased record
//! slots.
//!
//! The source reaches these through a C++ virtual base pointer plus a
//! hand-rolled vtable. Rust has no safe equivalent, so both wrappers here
//! hold a `Box<dyn Any>` and recover the *dynamic* descriptor by asking the
//! registry for whatever `TypeId` the boxed value reports — the registry
//! is the vtable.

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::OnceLock;

use crate::descriptor::{Category, Descriptor, ErasedOps, PtrOps};
use crate::registry::{lookup_by_type_id, Reflected};
use crate::typed_ref::{TypedRef, TypedRefMut};

fn data_ptr(any: &dyn Any) -> *const u8 {
    (any as *const dyn Any).cast::<u8>()
}

fn data_ptr_mut(any: &mut dyn Any) -> *mut u8 {
    (any as *mut dyn Any).cast::<u8>()
}

/// An owning pointer statically declared to point at `Base` or one of
/// `Base`'s registered subtypes.
pub struct OwningPtrRecord<Base: Reflected> {
    inner: Option<Box<dyn Any>>,
    _marker: PhantomData<Base>,
}

impl<Base: Reflected> Default for OwningPtrRecord<Base> {
    fn default() -> Self {
        Self {
            inner: None,
            _marker: PhantomData,
        }
    }
}

impl<Base: Reflected> OwningPtrRecord<Base> {
    pub fn new<T: Reflected>(value: T) -> Self {
        // Force `T`'s descriptor (and registration, for records) to exist
        // before it can end up boxed behind the registry-mediated dispatch
        // `as_pointer`/`assign_new` rely on.
        T::descriptor();
        Self {
            inner: Some(Box::new(value)),
            _marker: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Downcasts the boxed dynamic value to `T`, or `None` if it holds a
    /// different type (or nothing at all).
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_deref()?.downcast_ref::<T>()
    }
}

impl<Base: Reflected> Reflected for OwningPtrRecord<Base> {
    fn descriptor() -> &'static Descriptor {
        static CELL: OnceLock<Descriptor> = OnceLock::new();
        CELL.get_or_init(|| Descriptor {
            size: std::mem::size_of::<OwningPtrRecord<Base>>(),
            alignment: std::mem::align_of::<OwningPtrRecord<Base>>(),
            type_id: TypeId::of::<OwningPtrRecord<Base>>(),
            type_name: "OwningPtrRecord<Base>",
            category: Category::OwningPtrRecord(PtrOps {
                target: Base::descriptor,
                as_pointer: |bytes| {
                    let ptr = unsafe { &*bytes.as_ptr().cast::<OwningPtrRecord<Base>>() };
                    ptr.inner.as_deref().map(|boxed| {
                        let descriptor = lookup_by_type_id((*boxed).type_id())
                            .expect("OwningPtrRecord target type was never registered");
                        let slice =
                            unsafe { std::slice::from_raw_parts(data_ptr(boxed), descriptor.size) };
                        // SAFETY: `slice` spans exactly the boxed value that
                        // `descriptor` (looked up by its own `TypeId`) describes.
                        unsafe { TypedRef::from_raw(descriptor, slice) }
                    })
                },
                as_pointer_mut: |bytes| {
                    let ptr = unsafe { &mut *bytes.as_mut_ptr().cast::<OwningPtrRecord<Base>>() };
                    ptr.inner.as_deref_mut().map(|boxed| {
                        let descriptor = lookup_by_type_id((*boxed).type_id())
                            .expect("OwningPtrRecord target type was never registered");
                        let size = descriptor.size;
                        let slice =
                            unsafe { std::slice::from_raw_parts_mut(data_ptr_mut(boxed), size) };
                        // SAFETY: see `as_pointer` above.
                        unsafe { TypedRefMut::from_raw(descriptor, slice) }
                    })
                },
                assign_new: |bytes, dynamic_type| {
                    let ptr = unsafe { &mut *bytes.as_mut_ptr().cast::<OwningPtrRecord<Base>>() };
                    let ops = dynamic_type
                        .as_record()
                        .expect("assign_new target must be a record descriptor");
                    ptr.inner = Some((ops.allocate)());
                    let boxed = ptr.inner.as_deref_mut().expect("just assigned");
                    let slice = unsafe {
                        std::slice::from_raw_parts_mut(data_ptr_mut(boxed), dynamic_type.size)
                    };
                    // SAFETY: `boxed` was just allocated by `dynamic_type`'s own
                    // `allocate` hook, so it really is a `dynamic_type.size`-byte
                    // value of that type.
                    unsafe { TypedRefMut::from_raw(dynamic_type, slice) }
                },
                clear: |bytes| {
                    let ptr = unsafe { &mut *bytes.as_mut_ptr().cast::<OwningPtrRecord<Base>>() };
                    ptr.inner = None;
                },
            }),
        })
    }
}

/// A fully type-erased record slot: unlike [`OwningPtrRecord`] it carries no
/// statically-declared base type at all.
#[derive(Default)]
pub struct TypeErased {
    inner: Option<Box<dyn Any>>,
}

impl TypeErased {
    pub fn new<T: Reflected>(value: T) -> Self {
        // See `OwningPtrRecord::new`: registration must happen before this
        // value can be dispatched through by hash.
        T::descriptor();
        Self {
            inner: Some(Box::new(value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Downcasts the boxed dynamic value to `T`, or `None` if it holds a
    /// different type (or nothing at all).
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_deref()?.downcast_ref::<T>()
    }
}

impl Reflected for TypeErased {
    fn descriptor() -> &'static Descriptor {
        static CELL: OnceLock<Descriptor> = OnceLock::new();
        CELL.get_or_init(|| Descriptor {
            size: std::mem::size_of::<TypeErased>(),
            alignment: std::mem::align_of::<TypeErased>(),
            type_id: TypeId::of::<TypeErased>(),
            type_name: "TypeErased",
            category: Category::TypeErased(ErasedOps {
                target_type: |bytes| {
                    let slot = unsafe { &*bytes.as_ptr().cast::<TypeErased>() };
                    slot.inner
                        .as_deref()
                        .and_then(|boxed| lookup_by_type_id((*boxed).type_id()))
                },
                target: |bytes| {
                    let slot = unsafe { &*bytes.as_ptr().cast::<TypeErased>() };
                    slot.inner.as_deref().map(|boxed| {
                        let descriptor = lookup_by_type_id((*boxed).type_id())
                            .expect("TypeErased target type was never registered");
                        let slice =
                            unsafe { std::slice::from_raw_parts(data_ptr(boxed), descriptor.size) };
                        unsafe { TypedRef::from_raw(descriptor, slice) }
                    })
                },
                target_mut: |bytes| {
                    let slot = unsafe { &mut *bytes.as_mut_ptr().cast::<TypeErased>() };
                    slot.inner.as_deref_mut().map(|boxed| {
                        let descriptor = lookup_by_type_id((*boxed).type_id())
                            .expect("TypeErased target type was never registered");
                        let size = descriptor.size;
                        let slice =
                            unsafe { std::slice::from_raw_parts_mut(data_ptr_mut(boxed), size) };
                        unsafe { TypedRefMut::from_raw(descriptor, slice) }
                    })
                },
                assign_new: |bytes, dynamic_type| {
                    let slot = unsafe { &mut *bytes.as_mut_ptr().cast::<TypeErased>() };
                    let ops = dynamic_type
                        .as_record()
                        .expect("assign_new target must be a record descriptor");
                    slot.inner = Some((ops.allocate)());
                    let boxed = slot.inner.as_deref_mut().expect("just assigned");
                    let slice = unsafe {
                        std::slice::from_raw_parts_mut(data_ptr_mut(boxed), dynamic_type.size)
                    };
                    unsafe { TypedRefMut::from_raw(dynamic_type, slice) }
                },
                clear: |bytes| {
                    let slot = unsafe { &mut *bytes.as_mut_ptr().cast::<TypeErased>() };
                    slot.inner = None;
                },
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{read_binary, write_binary};
    use crate::Reflect;

    #[derive(Debug, Default, Clone, Copy, PartialEq, Reflect)]
    #[reflect(crate_path = crate)]
    struct Base {
        a: i32,
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Reflect)]
    #[reflect(crate_path = crate)]
    struct Derived {
        #[reflect(base)]
        base: Base,
        b: i32,
    }

    #[test]
    fn owning_ptr_round_trips_polymorphic_dispatch() {
        let ptr: OwningPtrRecord<Base> = OwningPtrRecord::new(Derived {
            base: Base { a: 10 },
            b: 20,
        });
        let mut buf = Vec::new();
        write_binary(&mut buf, &ptr).unwrap();

        let back: OwningPtrRecord<Base> = read_binary(&mut &buf[..]).unwrap();
        assert!(!back.is_empty());
        let derived = back
            .downcast_ref::<Derived>()
            .expect("dynamic type recovered as Derived");
        assert_eq!(derived.base.a, 10);
        assert_eq!(derived.b, 20);
    }

    #[test]
    fn owning_ptr_empty_round_trips_empty() {
        let ptr: OwningPtrRecord<Base> = OwningPtrRecord::default();
        let mut buf = Vec::new();
        write_binary(&mut buf, &ptr).unwrap();

        let back: OwningPtrRecord<Base> = read_binary(&mut &buf[..]).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn type_erased_round_trips_dynamic_type() {
        let slot = TypeErased::new(Derived {
            base: Base { a: 1 },
            b: 2,
        });
        let mut buf = Vec::new();
        write_binary(&mut buf, &slot).unwrap();

        let back: TypeErased = read_binary(&mut &buf[..]).unwrap();
        assert!(!back.is_empty());
        let derived = back
            .downcast_ref::<Derived>()
            .expect("dynamic type recovered as Derived");
        assert_eq!(derived.base.a, 1);
        assert_eq!(derived.b, 2);
    }

    #[test]
    fn type_erased_empty_round_trips_empty() {
        let slot = TypeErased::default();
        let mut buf = Vec::new();
        write_binary(&mut buf, &slot).unwrap();

        let back: TypeErased = read_binary(&mut &buf[..]).unwrap();
        assert!(back.is_empty());
    }
}
