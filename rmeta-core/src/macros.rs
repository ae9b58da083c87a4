//! Declarative registration for flat records and simple enums.
//!
//! `#[derive(Reflect)]` (in `rmeta-derive`) is the primary way to register a
//! type and understands base classes, conditional members, and schema
//! versioning. The two macros here cover the simpler case — a record with
//! no bases and no conditional members, or a fieldless enum — without
//! pulling in a proc-macro crate. Reach for the derive when either is
//! needed.

/// Registers a fieldless, base-free struct as a record.
///
/// Every field type must implement [`crate::registry::Reflected`] and
/// `PartialEq + Default` (the latter two back `skip-default-members`'
/// default check). The struct itself must implement `Default` (used to
/// allocate a fresh instance behind an [`crate::ptr::OwningPtrRecord`] or
/// [`crate::ptr::TypeErased`] slot).
#[macro_export]
macro_rules! reflect_record {
    (
        struct $name:ident {
            $( $field:ident : $field_ty:ty ),* $(,)?
        }
    ) => {
        impl $crate::registry::Reflected for $name {
            fn descriptor() -> &'static $crate::descriptor::Descriptor {
                static CELL: ::std::sync::OnceLock<$crate::descriptor::Descriptor> =
                    ::std::sync::OnceLock::new();
                static REGISTERED: ::std::sync::OnceLock<()> = ::std::sync::OnceLock::new();

                let descriptor = CELL.get_or_init(|| $crate::descriptor::Descriptor {
                    size: ::std::mem::size_of::<$name>(),
                    alignment: ::std::mem::align_of::<$name>(),
                    type_id: ::std::any::TypeId::of::<$name>(),
                    type_name: ::std::stringify!($name),
                    category: $crate::descriptor::Category::Record($crate::descriptor::RecordOps {
                        name: ::std::stringify!($name),
                        name_hash: $crate::registry::name_hash(::std::stringify!($name)),
                        current_version: 0,
                        info: |_version: i8| $crate::member::RecordInfo {
                            bases: ::std::vec::Vec::new(),
                            members: ::std::vec![
                                $(
                                    $crate::member::Member {
                                        name: ::std::stringify!($field),
                                        offset: ::std::mem::offset_of!($name, $field),
                                        descriptor: <$field_ty as $crate::registry::Reflected>::descriptor,
                                        get: |bytes: &[u8]| {
                                            let start = ::std::mem::offset_of!($name, $field);
                                            &bytes[start..start + ::std::mem::size_of::<$field_ty>()]
                                        },
                                        get_mut: |bytes: &mut [u8]| {
                                            let start = ::std::mem::offset_of!($name, $field);
                                            &mut bytes[start..start + ::std::mem::size_of::<$field_ty>()]
                                        },
                                        condition: None,
                                        is_default: |bytes: &[u8]| {
                                            // SAFETY: the codec calls `is_default` with exactly
                                            // this member's own byte span (already offset into
                                            // the containing record), never the full record.
                                            let value = unsafe {
                                                &*(bytes.as_ptr().cast::<$field_ty>())
                                            };
                                            *value == <$field_ty as ::std::default::Default>::default()
                                        },
                                    }
                                ),*
                            ],
                        },
                        allocate: || {
                            ::std::boxed::Box::new(<$name as ::std::default::Default>::default())
                                as ::std::boxed::Box<dyn ::std::any::Any>
                        },
                    }),
                });

                REGISTERED.get_or_init(|| {
                    $crate::registry::register_record(descriptor).unwrap_or_else(|err| {
                        panic!("failed to register `{}`: {err}", ::std::stringify!($name))
                    });
                });
                descriptor
            }
        }
    };
}

/// Registers a fieldless, `i32`-discriminanted enum.
///
/// The enum must implement `Default` — `from_int` falls back to it for a
/// wire discriminant with no matching variant, rather than constructing an
/// enum value out of thin air.
#[macro_export]
macro_rules! reflect_enum {
    (
        enum $name:ident {
            $( $variant:ident = $disc:literal ),* $(,)?
        }
    ) => {
        impl $crate::registry::Reflected for $name {
            fn descriptor() -> &'static $crate::descriptor::Descriptor {
                static CELL: ::std::sync::OnceLock<$crate::descriptor::Descriptor> =
                    ::std::sync::OnceLock::new();
                CELL.get_or_init(|| $crate::descriptor::Descriptor {
                    size: ::std::mem::size_of::<$name>(),
                    alignment: ::std::mem::align_of::<$name>(),
                    type_id: ::std::any::TypeId::of::<$name>(),
                    type_name: ::std::stringify!($name),
                    category: $crate::descriptor::Category::Enum($crate::descriptor::EnumOps {
                        to_int: |bytes: &[u8]| {
                            // SAFETY: `bytes` is a valid `$name`'s byte span.
                            let value = unsafe { &*(bytes.as_ptr().cast::<$name>()) };
                            match value {
                                $( $name::$variant => $disc, )*
                            }
                        },
                        from_int: |bytes: &mut [u8], value: i32| {
                            // SAFETY: see `to_int`.
                            let slot = unsafe { &mut *(bytes.as_mut_ptr().cast::<$name>()) };
                            *slot = match value {
                                $( $disc => $name::$variant, )*
                                _ => <$name as ::std::default::Default>::default(),
                            };
                        },
                        variants: &[ $( ($disc, ::std::stringify!($variant)) ),* ],
                    }),
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::codec::{read_binary, write_binary};
    use crate::descriptor::Category;
    use crate::registry::descriptor_of;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct MacroPoint {
        x: f64,
        y: i32,
    }

    reflect_record! {
        struct MacroPoint {
            x: f64,
            y: i32,
        }
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    enum MacroColor {
        #[default]
        Red,
        Green,
        Blue,
    }

    reflect_enum! {
        enum MacroColor {
            Red = 0,
            Green = 1,
            Blue = 2,
        }
    }

    #[test]
    fn reflect_record_builds_a_record_descriptor() {
        let d = descriptor_of::<MacroPoint>();
        assert!(matches!(d.category, Category::Record(_)));
        assert_eq!(d.size, std::mem::size_of::<MacroPoint>());
    }

    #[test]
    fn reflect_record_round_trips_through_binary_codec() {
        let p = MacroPoint { x: 1.5, y: -7 };
        let mut buf = Vec::new();
        write_binary(&mut buf, &p).unwrap();
        let back: MacroPoint = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn reflect_record_skips_default_fields() {
        let zero = MacroPoint::default();
        let mut buf = Vec::new();
        write_binary(&mut buf, &zero).unwrap();
        let back: MacroPoint = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, zero);
    }

    #[test]
    fn reflect_enum_round_trips_through_binary_codec() {
        let c = MacroColor::Blue;
        let mut buf = Vec::new();
        write_binary(&mut buf, &c).unwrap();
        let back: MacroColor = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn reflect_enum_unknown_discriminant_falls_back_to_default() {
        let d = descriptor_of::<MacroColor>();
        let Category::Enum(ops) = &d.category else {
            panic!("expected Category::Enum")
        };
        let mut c = MacroColor::Blue;
        let bytes = unsafe {
            std::slice::from_raw_parts_mut((&mut c as *mut MacroColor).cast::<u8>(), d.size)
        };
        (ops.from_int)(bytes, 99);
        assert_eq!(c, MacroColor::default());
    }
}
