//! Attribute parsing shared by the derive macros.

use proc_macro2::Ident;
use quote::{quote, quote_spanned};
use syn::{
    Attribute, Data, DeriveInput, Expr, Field, GenericArgument, LitStr, Path, PathArguments, Type,
    TypePath, parse::Parse, spanned::Spanned,
};

use crate::utils::parse_docs;

/// A `validate(EXPR)` / `validate(EXPR, "description")` clause.
pub(crate) struct Validation {
    pub(crate) expr: Expr,
    pub(crate) description: Option<LitStr>,
}

impl Validation {
    /// Wraps the validation expression so that described predicates and plain
    /// `Validate` implementations are interchangeable at the use site.
    pub(crate) fn wrap(&self, cr: &proc_macro2::TokenStream) -> proc_macro2::TokenStream {
        let expr = &self.expr;
        if let Some(description) = &self.description {
            quote_spanned! {expr.span()=>
                #cr::validation::WithDescription::new(#expr, #description)
            }
        } else {
            quote!(#expr)
        }
    }
}

#[derive(Default)]
pub(crate) struct DeprecationAttr {
    pub(crate) since: Option<LitStr>,
    pub(crate) for_removal: bool,
}

#[derive(Default)]
pub(crate) struct ConfigFieldAttrs {
    pub(crate) property: Option<LitStr>,
    pub(crate) legacy: Vec<LitStr>,
    pub(crate) secret: bool,
    pub(crate) deprecated: Option<DeprecationAttr>,
    pub(crate) validations: Vec<Validation>,
}

impl ConfigFieldAttrs {
    fn new(attrs: &[Attribute]) -> syn::Result<Self> {
        let config_attrs = attrs.iter().filter(|attr| attr.path().is_ident("config"));

        let mut this = Self::default();
        for attr in config_attrs {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("property") {
                    this.property = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("legacy") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let names = content.parse_terminated(<LitStr as Parse>::parse, syn::Token![,])?;
                    this.legacy.extend(names);
                    Ok(())
                } else if meta.path.is_ident("secret") {
                    this.secret = true;
                    Ok(())
                } else if meta.path.is_ident("deprecated") {
                    let mut note = DeprecationAttr::default();
                    if meta.input.peek(syn::token::Paren) {
                        meta.parse_nested_meta(|nested| {
                            if nested.path.is_ident("since") {
                                note.since = Some(nested.value()?.parse()?);
                                Ok(())
                            } else if nested.path.is_ident("for_removal") {
                                note.for_removal = true;
                                Ok(())
                            } else {
                                Err(nested.error(
                                    "Unsupported `deprecated` option; only `since` and `for_removal` are supported",
                                ))
                            }
                        })?;
                    }
                    this.deprecated = Some(note);
                    Ok(())
                } else if meta.path.is_ident("validate") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let expr: Expr = content.parse()?;
                    let description = if content.peek(syn::Token![,]) {
                        content.parse::<syn::Token![,]>()?;
                        Some(content.parse()?)
                    } else {
                        None
                    };
                    this.validations.push(Validation { expr, description });
                    Ok(())
                } else {
                    Err(meta.error(
                        "Unsupported attribute; only `property`, `legacy`, `secret`, `deprecated` \
                         and `validate` are supported on fields",
                    ))
                }
            })?;
        }
        Ok(this)
    }
}

pub(crate) struct ConfigField {
    pub(crate) attrs: ConfigFieldAttrs,
    pub(crate) name: Ident,
    pub(crate) ty: Type,
    pub(crate) docs: String,
}

impl ConfigField {
    fn new(raw: &Field) -> syn::Result<Self> {
        let name = raw.ident.clone().ok_or_else(|| {
            let message = "Only named fields are supported";
            syn::Error::new_spanned(raw, message)
        })?;
        let attrs = ConfigFieldAttrs::new(&raw.attrs)?;
        if attrs.property.is_none() && attrs.legacy.is_empty() {
            let message = "Configuration attribute must be named via #[config(property = \"..\")] \
                           or carry #[config(legacy(..))] aliases";
            return Err(syn::Error::new_spanned(raw, message));
        }

        Ok(Self {
            attrs,
            name,
            ty: raw.ty.clone(),
            docs: parse_docs(&raw.attrs),
        })
    }

    /// Returns the type wrapped in `Option<_>`, if any.
    pub(crate) fn unwrap_option(ty: &Type) -> Option<&Type> {
        let Type::Path(TypePath { path, .. }) = ty else {
            return None;
        };
        if path.segments.len() != 1 {
            return None;
        }
        let segment = &path.segments[0];
        if segment.ident != "Option" {
            return None;
        }
        let PathArguments::AngleBracketed(angle_bracketed) = &segment.arguments else {
            return None;
        };
        if angle_bracketed.args.len() != 1 {
            return None;
        }
        match &angle_bracketed.args[0] {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        }
    }
}

#[derive(Default)]
pub(crate) struct ConfigContainerAttrs {
    pub(crate) cr: Option<Path>,
    pub(crate) defunct: Vec<LitStr>,
    pub(crate) validations: Vec<Validation>,
}

impl ConfigContainerAttrs {
    pub(crate) fn new(attrs: &[Attribute], for_enum: bool) -> syn::Result<Self> {
        let config_attrs = attrs.iter().filter(|attr| attr.path().is_ident("config"));

        let mut this = Self::default();
        for attr in config_attrs {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("crate") {
                    this.cr = Some(meta.value()?.parse()?);
                    Ok(())
                } else if !for_enum && meta.path.is_ident("defunct") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let names = content.parse_terminated(<LitStr as Parse>::parse, syn::Token![,])?;
                    this.defunct.extend(names);
                    Ok(())
                } else if !for_enum && meta.path.is_ident("validate") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let expr: Expr = content.parse()?;
                    let description = if content.peek(syn::Token![,]) {
                        content.parse::<syn::Token![,]>()?;
                        Some(content.parse()?)
                    } else {
                        None
                    };
                    this.validations.push(Validation { expr, description });
                    Ok(())
                } else if for_enum {
                    Err(meta.error("Unsupported attribute; only `crate` is supported on enums"))
                } else {
                    Err(meta.error(
                        "Unsupported attribute; only `crate`, `defunct` and `validate` are \
                         supported on the container",
                    ))
                }
            })?;
        }
        Ok(this)
    }
}

pub(crate) struct ConfigContainer {
    pub(crate) attrs: ConfigContainerAttrs,
    pub(crate) name: Ident,
    pub(crate) help: String,
    pub(crate) fields: Vec<ConfigField>,
}

impl ConfigContainer {
    pub(crate) fn new(raw: &DeriveInput) -> syn::Result<Self> {
        let Data::Struct(data) = &raw.data else {
            let message = "#[derive(BindConfig)] can only be placed on structs";
            return Err(syn::Error::new_spanned(raw, message));
        };
        deny_generics(raw)?;

        let attrs = ConfigContainerAttrs::new(&raw.attrs, false)?;
        let fields = data
            .fields
            .iter()
            .map(ConfigField::new)
            .collect::<syn::Result<_>>()?;
        Ok(Self {
            attrs,
            name: raw.ident.clone(),
            help: parse_docs(&raw.attrs),
            fields,
        })
    }

    pub(crate) fn cr(&self) -> proc_macro2::TokenStream {
        if let Some(cr) = &self.attrs.cr {
            quote!(#cr)
        } else {
            let name = &self.name;
            quote_spanned!(name.span()=> ::flat_config)
        }
    }
}

pub(crate) fn deny_generics(raw: &DeriveInput) -> syn::Result<()> {
    if raw.generics.type_params().count() != 0
        || raw.generics.const_params().count() != 0
        || raw.generics.lifetimes().count() != 0
    {
        let message = "generics are not supported";
        return Err(syn::Error::new_spanned(&raw.generics, message));
    }
    Ok(())
}
