//! `Reflected` implementations for the built-in scalar and string types.
//!
//! Scalars and strings aren't registered in the global [`crate::registry`]
//! (that registry only tracks records, which need name/hash lookup for
//! polymorphic dispatch) — each gets a private, per-type `OnceLock`-backed
//! static descriptor instead, the same pattern `reflect_record!` generates
//! for user types.

use std::any::TypeId;
use std::sync::OnceLock;

use crate::descriptor::{Category, Descriptor, ScalarKind, StringOps};
use crate::registry::Reflected;

macro_rules! impl_scalar {
    ($ty:ty, $kind:expr) => {
        impl Reflected for $ty {
            fn descriptor() -> &'static Descriptor {
                static CELL: OnceLock<Descriptor> = OnceLock::new();
                CELL.get_or_init(|| Descriptor {
                    size: std::mem::size_of::<$ty>(),
                    alignment: std::mem::align_of::<$ty>(),
                    type_id: TypeId::of::<$ty>(),
                    type_name: stringify!($ty),
                    category: Category::Scalar($kind),
                })
            }
        }
    };
}

impl_scalar!(bool, ScalarKind::Bool);
impl_scalar!(char, ScalarKind::Char);
impl_scalar!(i8, ScalarKind::I8);
impl_scalar!(u8, ScalarKind::U8);
impl_scalar!(i16, ScalarKind::I16);
impl_scalar!(u16, ScalarKind::U16);
impl_scalar!(i32, ScalarKind::I32);
impl_scalar!(u32, ScalarKind::U32);
impl_scalar!(i64, ScalarKind::I64);
impl_scalar!(u64, ScalarKind::U64);
impl_scalar!(f32, ScalarKind::F32);
impl_scalar!(f64, ScalarKind::F64);

impl Reflected for String {
    fn descriptor() -> &'static Descriptor {
        static CELL: OnceLock<Descriptor> = OnceLock::new();
        CELL.get_or_init(|| Descriptor {
            size: std::mem::size_of::<String>(),
            alignment: std::mem::align_of::<String>(),
            type_id: TypeId::of::<String>(),
            type_name: "String",
            category: Category::String(StringOps {
                get_view: |bytes| {
                    // SAFETY: `bytes` is a valid `&String`'s byte span.
                    let s = unsafe { &*bytes.as_ptr().cast::<String>() };
                    s.as_bytes()
                },
                set_from_view: |bytes, view| {
                    // SAFETY: `bytes` is a valid `&mut String`'s byte span.
                    let s = unsafe { &mut *bytes.as_mut_ptr().cast::<String>() };
                    *s = String::from_utf8_lossy(view).into_owned();
                },
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::descriptor_of;

    #[test]
    fn scalar_descriptors_report_true_layout() {
        let d = descriptor_of::<i32>();
        assert_eq!(d.size, 4);
        assert_eq!(d.alignment, 4);
        assert!(matches!(d.category, Category::Scalar(ScalarKind::I32)));
    }

    #[test]
    fn string_descriptor_round_trips_view() {
        let d = descriptor_of::<String>();
        let Category::String(ops) = &d.category else {
            panic!("expected Category::String")
        };
        let mut value = String::from("hello");
        let bytes =
            unsafe { std::slice::from_raw_parts_mut((&mut value as *mut String).cast::<u8>(), d.size) };
        assert_eq!((ops.get_view)(bytes), b"hello");
        (ops.set_from_view)(bytes, b"world");
        assert_eq!(value, "world");
    }
}
