//! `ConfigEnum` derive macro implementation.

use proc_macro::TokenStream;
use quote::{quote, quote_spanned};
use syn::{Data, DeriveInput, Fields};

use crate::config::{ConfigContainerAttrs, deny_generics};

pub(crate) fn impl_config_enum(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse(input) {
        Ok(input) => input,
        Err(err) => return err.into_compile_error().into(),
    };
    match derive_config_enum(&input) {
        Ok(derived) => derived.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn to_snake_case(ident: &str) -> String {
    let mut output = String::with_capacity(ident.len());
    let mut prev_is_lower_or_digit = false;
    for ch in ident.chars() {
        if ch.is_ascii_uppercase() {
            if prev_is_lower_or_digit {
                output.push('_');
            }
            output.push(ch.to_ascii_lowercase());
            prev_is_lower_or_digit = false;
        } else {
            output.push(ch);
            prev_is_lower_or_digit = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    output
}

fn derive_config_enum(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let Data::Enum(data) = &input.data else {
        let message = "#[derive(ConfigEnum)] can only be placed on enums";
        return Err(syn::Error::new_spanned(input, message));
    };
    deny_generics(input)?;

    let attrs = ConfigContainerAttrs::new(&input.attrs, true)?;
    let cr = if let Some(cr) = &attrs.cr {
        quote!(#cr)
    } else {
        quote!(::flat_config)
    };

    let mut variant_names = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            let message = "#[derive(ConfigEnum)] only supports unit variants";
            return Err(syn::Error::new_spanned(variant, message));
        }
        variant_names.push(variant.ident.clone());
    }

    // Variants are matched against the snake-cased variant name, case-insensitively and
    // with `-` in the raw value treated as `_`, so `trace-all` / `TRACE_ALL` both select
    // a `TraceAll` variant.
    let matchers = variant_names.iter().map(|variant| {
        let canonical = to_snake_case(&variant.to_string());
        quote_spanned! {variant.span()=>
            if normalized.eq_ignore_ascii_case(#canonical) {
                matched = ::core::option::Option::Some(Self::#variant);
                match_count += 1;
            }
        }
    });

    let expected = variant_names
        .iter()
        .map(|variant| to_snake_case(&variant.to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    let no_match_detail = format!("expected one of: {expected}");

    let name = &input.ident;
    Ok(quote! {
        impl #cr::FromConfigString for #name {
            fn from_config_string(raw: &str) -> ::core::result::Result<Self, #cr::CoerceError> {
                let normalized = raw.replace('-', "_");
                let mut matched = ::core::option::Option::None;
                let mut match_count = 0_usize;
                #(#matchers)*

                match (match_count, matched) {
                    (1, ::core::option::Option::Some(value)) => ::core::result::Result::Ok(value),
                    (0, _) => ::core::result::Result::Err(#cr::CoerceError::with_detail(
                        #no_match_detail,
                    )),
                    _ => ::core::result::Result::Err(#cr::CoerceError::with_detail(
                        "matches multiple variant names",
                    )),
                }
            }
        }
    })
}
