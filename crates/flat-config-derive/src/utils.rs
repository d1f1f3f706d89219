//! Miscellaneous utils.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Attribute, Expr, GenericArgument, Lit, PathArguments, Type};

/// Collects doc comments on an item into a single help string, converting
/// paragraph breaks into newlines.
pub(crate) fn parse_docs(attrs: &[Attribute]) -> String {
    let doc_lines = attrs.iter().filter_map(|attr| {
        if attr.meta.path().is_ident("doc") {
            let name_value = attr.meta.require_name_value().ok()?;
            let Expr::Lit(doc_literal) = &name_value.value else {
                return None;
            };
            match &doc_literal.lit {
                Lit::Str(doc_literal) => Some(doc_literal.value()),
                _ => None,
            }
        } else {
            None
        }
    });

    let mut docs = String::new();
    for line in doc_lines {
        let line = line.trim();
        if line.is_empty() {
            if !docs.is_empty() {
                // New paragraph; convert it to a new line.
                docs.push('\n');
            }
        } else {
            if !docs.is_empty() && !docs.ends_with(|ch: char| ch.is_ascii_whitespace()) {
                docs.push(' ');
            }
            docs.push_str(line);
        }
    }
    docs
}

pub(crate) fn wrap_in_option(tokens: Option<TokenStream>) -> TokenStream {
    if let Some(tokens) = tokens {
        quote!(::core::option::Option::Some(#tokens))
    } else {
        quote!(::core::option::Option::None)
    }
}

/// Renders a type as it is spelled in the source.
pub(crate) fn type_in_code(ty: &Type) -> TokenStream {
    let rendered = render_type(ty);
    quote!(#rendered)
}

/// Renders a `syn::Type` using ordinary Rust type syntax (e.g. `Option<LogLevel>`).
///
/// `quote`'s `ToTokens` impls insert spaces around reconstructed punctuation (e.g.
/// `Option < LogLevel >`), so this walks the common type shapes directly; anything
/// unrecognized falls back to the spaced token-stream rendering.
fn render_type(ty: &Type) -> String {
    match ty {
        Type::Path(path) if path.qself.is_none() => {
            let mut out = String::new();
            if path.path.leading_colon.is_some() {
                out.push_str("::");
            }
            for (index, segment) in path.path.segments.iter().enumerate() {
                if index > 0 {
                    out.push_str("::");
                }
                out.push_str(&segment.ident.to_string());
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    let rendered: Vec<String> = args.args.iter().map(render_generic_arg).collect();
                    out.push('<');
                    out.push_str(&rendered.join(", "));
                    out.push('>');
                }
            }
            out
        }
        Type::Reference(reference) => {
            let mut out = String::from("&");
            if let Some(lifetime) = &reference.lifetime {
                out.push_str(&format!("'{} ", lifetime.ident));
            }
            if reference.mutability.is_some() {
                out.push_str("mut ");
            }
            out.push_str(&render_type(&reference.elem));
            out
        }
        Type::Slice(slice) => format!("[{}]", render_type(&slice.elem)),
        Type::Tuple(tuple) => {
            let rendered: Vec<String> = tuple.elems.iter().map(render_type).collect();
            format!("({})", rendered.join(", "))
        }
        _ => ty.to_token_stream().to_string(),
    }
}

fn render_generic_arg(arg: &GenericArgument) -> String {
    match arg {
        GenericArgument::Type(ty) => render_type(ty),
        GenericArgument::Lifetime(lifetime) => format!("'{}", lifetime.ident),
        _ => arg.to_token_stream().to_string(),
    }
}
