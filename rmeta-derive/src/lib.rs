//! `#[derive(Reflect)]`: the full-featured counterpart to `rmeta_core`'s
//! `reflect_record!`/`reflect_enum!` declarative macros. Understands base
//! classes, conditional members, and schema versioning on structs, plus
//! integer-backed enums.

mod attrib;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

use attrib::{ContainerAttrs, FieldAttrs};

#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_reflect_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_reflect_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Reflect)] does not support generic types",
        ));
    }

    match &input.data {
        Data::Struct(data) => derive_record(&input, data),
        Data::Enum(data) => derive_enum(&input, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(Reflect)] does not support unions",
        )),
    }
}

fn derive_record(input: &DeriveInput, data: &syn::DataStruct) -> syn::Result<TokenStream2> {
    let fields = match &data.fields {
        Fields::Named(fields) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "#[derive(Reflect)] records need named fields",
            ))
        }
    };

    let container = ContainerAttrs::from_syn(&input.attrs)?;
    let rmeta_core = container.rmeta_core_path();
    let name = &input.ident;
    let name_str = container
        .name
        .clone()
        .map(|lit| quote!(#lit))
        .unwrap_or_else(|| {
            let s = name.to_string();
            quote!(#s)
        });
    let version = container.version;

    let mut base_entries = Vec::new();
    let mut member_entries = Vec::new();

    for field in fields {
        let field_ident = field
            .ident
            .as_ref()
            .expect("Fields::Named always has idents");
        let field_ty = &field.ty;
        let attrs = FieldAttrs::from_syn(&field.attrs)?;

        if attrs.base && attrs.skip {
            return Err(syn::Error::new_spanned(
                field,
                "a field cannot be both `base` and `skip`",
            ));
        }
        if attrs.skip {
            continue;
        }

        if attrs.base {
            if attrs.condition.is_some() || attrs.since != 0 {
                return Err(syn::Error::new_spanned(
                    field,
                    "a base field cannot carry `condition` or `since`",
                ));
            }
            base_entries.push(quote! {
                #rmeta_core::member::BaseClass {
                    descriptor: <#field_ty as #rmeta_core::registry::Reflected>::descriptor,
                    offset: ::std::mem::offset_of!(#name, #field_ident),
                    get: |bytes: &[u8]| {
                        let start = ::std::mem::offset_of!(#name, #field_ident);
                        &bytes[start..start + ::std::mem::size_of::<#field_ty>()]
                    },
                    get_mut: |bytes: &mut [u8]| {
                        let start = ::std::mem::offset_of!(#name, #field_ident);
                        &mut bytes[start..start + ::std::mem::size_of::<#field_ty>()]
                    },
                }
            });
            continue;
        }

        let field_name_str = field_ident.to_string();
        let since = attrs.since;
        let condition = match &attrs.condition {
            Some(path) => quote!(Some(#path)),
            None => quote!(None),
        };

        member_entries.push(quote! {
            (if version >= #since {
                Some(#rmeta_core::member::Member {
                    name: #field_name_str,
                    offset: ::std::mem::offset_of!(#name, #field_ident),
                    descriptor: <#field_ty as #rmeta_core::registry::Reflected>::descriptor,
                    get: |bytes: &[u8]| {
                        let start = ::std::mem::offset_of!(#name, #field_ident);
                        &bytes[start..start + ::std::mem::size_of::<#field_ty>()]
                    },
                    get_mut: |bytes: &mut [u8]| {
                        let start = ::std::mem::offset_of!(#name, #field_ident);
                        &mut bytes[start..start + ::std::mem::size_of::<#field_ty>()]
                    },
                    condition: #condition,
                    is_default: |bytes: &[u8]| {
                        // SAFETY: the codec calls `is_default` with exactly this
                        // member's own byte span (already offset into the
                        // containing record), never the full record.
                        let value = unsafe { &*(bytes.as_ptr().cast::<#field_ty>()) };
                        *value == <#field_ty as ::std::default::Default>::default()
                    },
                })
            } else {
                None
            })
        });
    }

    Ok(quote! {
        impl #rmeta_core::registry::Reflected for #name {
            fn descriptor() -> &'static #rmeta_core::descriptor::Descriptor {
                static CELL: ::std::sync::OnceLock<#rmeta_core::descriptor::Descriptor> =
                    ::std::sync::OnceLock::new();
                static REGISTERED: ::std::sync::OnceLock<()> = ::std::sync::OnceLock::new();

                let descriptor = CELL.get_or_init(|| #rmeta_core::descriptor::Descriptor {
                    size: ::std::mem::size_of::<#name>(),
                    alignment: ::std::mem::align_of::<#name>(),
                    type_id: ::std::any::TypeId::of::<#name>(),
                    type_name: #name_str,
                    category: #rmeta_core::descriptor::Category::Record(#rmeta_core::descriptor::RecordOps {
                        name: #name_str,
                        name_hash: #rmeta_core::registry::name_hash(#name_str),
                        current_version: #version,
                        info: |version: i8| #rmeta_core::member::RecordInfo {
                            bases: ::std::vec![ #(#base_entries),* ],
                            members: [ #(#member_entries),* ].into_iter().flatten().collect(),
                        },
                        allocate: || {
                            ::std::boxed::Box::new(<#name as ::std::default::Default>::default())
                                as ::std::boxed::Box<dyn ::std::any::Any>
                        },
                    }),
                });

                REGISTERED.get_or_init(|| {
                    #rmeta_core::registry::register_record(descriptor).unwrap_or_else(|err| {
                        panic!("failed to register `{}`: {err}", #name_str)
                    });
                });
                descriptor
            }
        }
    })
}

fn derive_enum(input: &DeriveInput, data: &syn::DataEnum) -> syn::Result<TokenStream2> {
    let container = ContainerAttrs::from_syn(&input.attrs)?;
    let rmeta_core = container.rmeta_core_path();
    let name = &input.ident;
    let name_str = container
        .name
        .clone()
        .map(|lit| quote!(#lit))
        .unwrap_or_else(|| {
            let s = name.to_string();
            quote!(#s)
        });

    let mut variant_idents = Vec::new();
    let mut variant_values = Vec::new();
    let mut variant_name_strs = Vec::new();
    let mut next_value: i64 = 0;

    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "#[derive(Reflect)] enums must be fieldless",
            ));
        }
        let value = match &variant.discriminant {
            Some((_, expr)) => extract_discriminant(expr)?,
            None => next_value,
        };
        next_value = value + 1;

        variant_idents.push(variant.ident.clone());
        variant_name_strs.push(variant.ident.to_string());
        let value32 = i32::try_from(value).map_err(|_| {
            syn::Error::new_spanned(variant, "enum discriminant does not fit in an i32")
        })?;
        variant_values.push(value32);
    }

    Ok(quote! {
        impl #rmeta_core::registry::Reflected for #name {
            fn descriptor() -> &'static #rmeta_core::descriptor::Descriptor {
                static CELL: ::std::sync::OnceLock<#rmeta_core::descriptor::Descriptor> =
                    ::std::sync::OnceLock::new();
                CELL.get_or_init(|| #rmeta_core::descriptor::Descriptor {
                    size: ::std::mem::size_of::<#name>(),
                    alignment: ::std::mem::align_of::<#name>(),
                    type_id: ::std::any::TypeId::of::<#name>(),
                    type_name: #name_str,
                    category: #rmeta_core::descriptor::Category::Enum(#rmeta_core::descriptor::EnumOps {
                        to_int: |bytes: &[u8]| {
                            // SAFETY: `bytes` is a valid `#name`'s byte span.
                            let value = unsafe { &*(bytes.as_ptr().cast::<#name>()) };
                            match value {
                                #( #name::#variant_idents => #variant_values, )*
                            }
                        },
                        from_int: |bytes: &mut [u8], value: i32| {
                            // SAFETY: see `to_int`.
                            let slot = unsafe { &mut *(bytes.as_mut_ptr().cast::<#name>()) };
                            *slot = match value {
                                #( #variant_values => #name::#variant_idents, )*
                                _ => <#name as ::std::default::Default>::default(),
                            };
                        },
                        variants: &[ #( (#variant_values, #variant_name_strs) ),* ],
                    }),
                })
            }
        }
    })
}

fn extract_discriminant(expr: &syn::Expr) -> syn::Result<i64> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(lit),
            ..
        }) => lit.base10_parse(),
        syn::Expr::Unary(syn::ExprUnary {
            op: syn::UnOp::Neg(_),
            expr,
            ..
        }) => extract_discriminant(expr).map(|v| -v),
        _ => Err(syn::Error::new_spanned(
            expr,
            "enum discriminant must be an integer literal",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: proc_macro2::TokenStream) -> DeriveInput {
        syn::parse2(input).unwrap()
    }

    #[test]
    fn derives_a_flat_record() {
        let input = parse(quote! {
            #[derive(Reflect, Default)]
            struct Point {
                x: f64,
                y: f64,
            }
        });
        assert!(derive_reflect_impl(input).is_ok());
    }

    #[test]
    fn derives_a_record_with_a_base_and_a_conditional_member() {
        let input = parse(quote! {
            #[derive(Reflect, Default)]
            #[reflect(name = "Shape", version = 1)]
            struct Circle {
                #[reflect(base)]
                base: Entity,
                radius: f64,
                #[reflect(since = 1, condition = has_label)]
                label: String,
            }
        });
        assert!(derive_reflect_impl(input).is_ok());
    }

    #[test]
    fn rejects_base_and_skip_on_the_same_field() {
        let input = parse(quote! {
            #[derive(Reflect, Default)]
            struct Bad {
                #[reflect(base, skip)]
                base: Entity,
            }
        });
        assert!(derive_reflect_impl(input).is_err());
    }

    #[test]
    fn derives_an_integer_backed_enum() {
        let input = parse(quote! {
            #[derive(Reflect, Default)]
            enum Color {
                #[default]
                Red,
                Green = 5,
                Blue,
            }
        });
        assert!(derive_reflect_impl(input).is_ok());
    }

    #[test]
    fn rejects_generic_types() {
        let input = parse(quote! {
            #[derive(Reflect, Default)]
            struct Wrapper<T> {
                value: T,
            }
        });
        assert!(derive_reflect_impl(input).is_err());
    }
}
