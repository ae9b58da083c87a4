//! `Reflected` implementations for the built-in container categories:
//! `Vec<T>` (DynSeq), `[T; N]` (FixSeq), `HashSet`/`BTreeSet` (Set), and
//! `HashMap`/`BTreeMap` (Map).
//!
//! Every "insert a new element from the wire" operation follows the same
//! shape: default-construct the element, hand the codec a `TypedRefMut`
//! into it via the `init` callback to fill in the decoded value, then move
//! it into the container. This sidesteps the need for `Clone` bounds or
//! unsafe placement-new — Rust containers are happy to take ownership of an
//! already-complete value, unlike the by-address construction the source
//! relied on.

use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::sync::OnceLock;

use crate::descriptor::{Category, Descriptor, DynSeqOps, FixSeqOps, MapOps, SetOps};
use crate::iter::{MapIter, MapIterMut, SeqIter, SeqIterMut};
use crate::registry::Reflected;
use crate::typed_ref::{TypedRef, TypedRefMut};

impl<T: Reflected + Default> Reflected for Vec<T> {
    fn descriptor() -> &'static Descriptor {
        static CELL: OnceLock<Descriptor> = OnceLock::new();
        CELL.get_or_init(|| Descriptor {
            size: std::mem::size_of::<Vec<T>>(),
            alignment: std::mem::align_of::<Vec<T>>(),
            type_id: TypeId::of::<Vec<T>>(),
            type_name: "Vec<T>",
            category: Category::DynSeq(DynSeqOps {
                elem: T::descriptor,
                len: |bytes| unsafe { &*bytes.as_ptr().cast::<Vec<T>>() }.len(),
                push_default: |bytes, init| {
                    let vec = unsafe { &mut *bytes.as_mut_ptr().cast::<Vec<T>>() };
                    vec.push(T::default());
                    init(TypedRefMut::new(vec.last_mut().expect("just pushed")));
                },
                iter: |bytes| {
                    let vec = unsafe { &*bytes.as_ptr().cast::<Vec<T>>() };
                    SeqIter::new(vec.iter().map(TypedRef::new))
                },
                iter_mut: |bytes| {
                    let vec = unsafe { &mut *bytes.as_mut_ptr().cast::<Vec<T>>() };
                    SeqIterMut::new(vec.iter_mut().map(TypedRefMut::new))
                },
            }),
        })
    }
}

impl<T: Reflected, const N: usize> Reflected for [T; N] {
    fn descriptor() -> &'static Descriptor {
        static CELL: OnceLock<Descriptor> = OnceLock::new();
        CELL.get_or_init(|| Descriptor {
            size: std::mem::size_of::<[T; N]>(),
            alignment: std::mem::align_of::<[T; N]>(),
            type_id: TypeId::of::<[T; N]>(),
            type_name: "[T; N]",
            category: Category::FixSeq(FixSeqOps {
                elem: T::descriptor,
                len: N,
                iter: |bytes| {
                    let arr = unsafe { &*bytes.as_ptr().cast::<[T; N]>() };
                    SeqIter::new(arr.iter().map(TypedRef::new))
                },
                iter_mut: |bytes| {
                    let arr = unsafe { &mut *bytes.as_mut_ptr().cast::<[T; N]>() };
                    SeqIterMut::new(arr.iter_mut().map(TypedRefMut::new))
                },
            }),
        })
    }
}

macro_rules! impl_set {
    ($container:ident, $type_name:literal, $($bounds:tt)+) => {
        impl<T: Reflected + Default + $($bounds)+> Reflected for $container<T> {
            fn descriptor() -> &'static Descriptor {
                static CELL: OnceLock<Descriptor> = OnceLock::new();
                CELL.get_or_init(|| Descriptor {
                    size: std::mem::size_of::<$container<T>>(),
                    alignment: std::mem::align_of::<$container<T>>(),
                    type_id: TypeId::of::<$container<T>>(),
                    type_name: $type_name,
                    category: Category::Set(SetOps {
                        elem: T::descriptor,
                        len: |bytes| unsafe { &*bytes.as_ptr().cast::<$container<T>>() }.len(),
                        insert_default: |bytes, init| {
                            let set = unsafe { &mut *bytes.as_mut_ptr().cast::<$container<T>>() };
                            let mut value = T::default();
                            init(TypedRefMut::new(&mut value));
                            set.insert(value);
                        },
                        iter: |bytes| {
                            let set = unsafe { &*bytes.as_ptr().cast::<$container<T>>() };
                            SeqIter::new(set.iter().map(TypedRef::new))
                        },
                    }),
                })
            }
        }
    };
}

impl_set!(HashSet, "HashSet<T>", Eq + Hash);
impl_set!(BTreeSet, "BTreeSet<T>", Ord);

macro_rules! impl_map {
    ($container:ident, $type_name:literal, $($bounds:tt)+) => {
        impl<K: Reflected + Default + $($bounds)+, V: Reflected + Default> Reflected for $container<K, V> {
            fn descriptor() -> &'static Descriptor {
                static CELL: OnceLock<Descriptor> = OnceLock::new();
                CELL.get_or_init(|| Descriptor {
                    size: std::mem::size_of::<$container<K, V>>(),
                    alignment: std::mem::align_of::<$container<K, V>>(),
                    type_id: TypeId::of::<$container<K, V>>(),
                    type_name: $type_name,
                    category: Category::Map(MapOps {
                        key: K::descriptor,
                        value: V::descriptor,
                        len: |bytes| unsafe { &*bytes.as_ptr().cast::<$container<K, V>>() }.len(),
                        insert_default: |bytes, key_init, value_init| {
                            let map = unsafe { &mut *bytes.as_mut_ptr().cast::<$container<K, V>>() };
                            let mut key = K::default();
                            key_init(TypedRefMut::new(&mut key));
                            let mut value = V::default();
                            value_init(TypedRefMut::new(&mut value));
                            map.insert(key, value);
                        },
                        iter: |bytes| {
                            let map = unsafe { &*bytes.as_ptr().cast::<$container<K, V>>() };
                            MapIter::new(map.iter().map(|(k, v)| (TypedRef::new(k), TypedRef::new(v))))
                        },
                        iter_mut: |bytes| {
                            let map = unsafe { &mut *bytes.as_mut_ptr().cast::<$container<K, V>>() };
                            MapIterMut::new(
                                map.iter_mut()
                                    .map(|(k, v)| (TypedRef::new(k), TypedRefMut::new(v))),
                            )
                        },
                    }),
                })
            }
        }
    };
}

impl_map!(HashMap, "HashMap<K, V>", Eq + Hash);
impl_map!(BTreeMap, "BTreeMap<K, V>", Ord);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::descriptor_of;
    use crate::typed_ref::TypedRefMut;

    #[test]
    fn vec_descriptor_reports_dyn_seq() {
        let d = descriptor_of::<Vec<i32>>();
        let Category::DynSeq(ops) = &d.category else {
            panic!("expected DynSeq")
        };
        let mut v: Vec<i32> = vec![1, 2];
        let bytes = unsafe {
            std::slice::from_raw_parts_mut((&mut v as *mut Vec<i32>).cast::<u8>(), d.size)
        };
        assert_eq!((ops.len)(bytes), 2);
        (ops.push_default)(
            bytes,
            &mut |mut slot: TypedRefMut<'_>| {
                *slot.get_mut::<i32>() = 3;
            },
        );
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn fixed_array_descriptor_reports_len() {
        let d = descriptor_of::<[u8; 4]>();
        let Category::FixSeq(ops) = &d.category else {
            panic!("expected FixSeq")
        };
        assert_eq!(ops.len, 4);
    }

    #[test]
    fn hash_map_insert_default_builds_entry() {
        let d = descriptor_of::<HashMap<i32, bool>>();
        let Category::Map(ops) = &d.category else {
            panic!("expected Map")
        };
        let mut m: HashMap<i32, bool> = HashMap::new();
        let bytes = unsafe {
            std::slice::from_raw_parts_mut((&mut m as *mut HashMap<i32, bool>).cast::<u8>(), d.size)
        };
        (ops.insert_default)(
            bytes,
            &mut |mut k: TypedRefMut<'_>| *k.get_mut::<i32>() = 7,
            &mut |mut v: TypedRefMut<'_>| *v.get_mut::<bool>() = true,
        );
        assert_eq!(m.get(&7), Some(&true));
    }
}
