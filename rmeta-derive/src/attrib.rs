//! Attribute parsing for `#[derive(Reflect)]`'s `#[reflect(...)]` syntax.

use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;

mod kw {
    syn::custom_keyword!(name);
    syn::custom_keyword!(version);
    syn::custom_keyword!(crate_path);
    syn::custom_keyword!(base);
    syn::custom_keyword!(skip);
    syn::custom_keyword!(since);
    syn::custom_keyword!(condition);
}

enum ContainerAttr {
    Name(syn::LitStr),
    Version(syn::LitInt),
    CratePath(syn::Path),
}

enum FieldAttr {
    Base,
    Skip,
    Since(syn::LitInt),
    Condition(syn::Path),
}

struct ContainerAttrList(Punctuated<ContainerAttr, syn::Token![,]>);
struct FieldAttrList(Punctuated<FieldAttr, syn::Token![,]>);

pub struct ContainerAttrs {
    pub name: Option<syn::LitStr>,
    pub version: i8,
    pub crate_path: Option<syn::Path>,
}

pub struct FieldAttrs {
    pub base: bool,
    pub skip: bool,
    pub since: i8,
    pub condition: Option<syn::Path>,
}

impl Parse for ContainerAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let lookahead = input.lookahead1();
        if lookahead.peek(kw::name) {
            input.parse::<kw::name>()?;
            input.parse::<syn::Token![=]>()?;
            Ok(ContainerAttr::Name(input.parse()?))
        } else if lookahead.peek(kw::version) {
            input.parse::<kw::version>()?;
            input.parse::<syn::Token![=]>()?;
            Ok(ContainerAttr::Version(input.parse()?))
        } else if lookahead.peek(kw::crate_path) {
            input.parse::<kw::crate_path>()?;
            input.parse::<syn::Token![=]>()?;
            Ok(ContainerAttr::CratePath(input.parse()?))
        } else {
            Err(lookahead.error())
        }
    }
}

impl Parse for FieldAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let lookahead = input.lookahead1();
        if lookahead.peek(kw::base) {
            input.parse::<kw::base>()?;
            Ok(FieldAttr::Base)
        } else if lookahead.peek(kw::skip) {
            input.parse::<kw::skip>()?;
            Ok(FieldAttr::Skip)
        } else if lookahead.peek(kw::since) {
            input.parse::<kw::since>()?;
            input.parse::<syn::Token![=]>()?;
            Ok(FieldAttr::Since(input.parse()?))
        } else if lookahead.peek(kw::condition) {
            input.parse::<kw::condition>()?;
            input.parse::<syn::Token![=]>()?;
            Ok(FieldAttr::Condition(input.parse()?))
        } else {
            Err(lookahead.error())
        }
    }
}

impl Parse for ContainerAttrList {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Punctuated::parse_terminated(input).map(ContainerAttrList)
    }
}

impl Parse for FieldAttrList {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Punctuated::parse_terminated(input).map(FieldAttrList)
    }
}

impl ContainerAttrs {
    fn default() -> ContainerAttrs {
        ContainerAttrs {
            name: None,
            version: 0,
            crate_path: None,
        }
    }

    pub fn from_syn(attrs: &[syn::Attribute]) -> syn::Result<ContainerAttrs> {
        let mut res = ContainerAttrs::default();
        for attr in attrs {
            if matches!(attr.style, syn::AttrStyle::Outer) && attr.path().is_ident("reflect") {
                let chunk: ContainerAttrList = attr.parse_args()?;
                for item in chunk.0 {
                    match item {
                        ContainerAttr::Name(name) => {
                            if res.name.is_some() {
                                return Err(syn::Error::new_spanned(
                                    name,
                                    "duplicate reflect attribute `name`",
                                ));
                            }
                            res.name = Some(name);
                        }
                        ContainerAttr::Version(version) => {
                            res.version = version.base10_parse()?;
                        }
                        ContainerAttr::CratePath(path) => {
                            if res.crate_path.is_some() {
                                return Err(syn::Error::new_spanned(
                                    path,
                                    "duplicate reflect attribute `crate_path`",
                                ));
                            }
                            res.crate_path = Some(path);
                        }
                    }
                }
            }
        }
        Ok(res)
    }

    /// The path this derive's generated code refers to `rmeta-core` through,
    /// defaulting to `::rmeta_core` for downstream crates.
    pub fn rmeta_core_path(&self) -> syn::Path {
        self.crate_path
            .clone()
            .unwrap_or_else(|| syn::parse_str("::rmeta_core").unwrap())
    }
}

impl FieldAttrs {
    fn default() -> FieldAttrs {
        FieldAttrs {
            base: false,
            skip: false,
            since: 0,
            condition: None,
        }
    }

    pub fn from_syn(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
        let mut res = FieldAttrs::default();
        for attr in attrs {
            if matches!(attr.style, syn::AttrStyle::Outer) && attr.path().is_ident("reflect") {
                let chunk: FieldAttrList = attr.parse_args()?;
                for item in chunk.0 {
                    match item {
                        FieldAttr::Base => res.base = true,
                        FieldAttr::Skip => res.skip = true,
                        FieldAttr::Since(since) => res.since = since.base10_parse()?,
                        FieldAttr::Condition(path) => {
                            if res.condition.is_some() {
                                return Err(syn::Error::new_spanned(
                                    path,
                                    "duplicate reflect attribute `condition`",
                                ));
                            }
                            res.condition = Some(path);
                        }
                    }
                }
            }
        }
        Ok(res)
    }
}
