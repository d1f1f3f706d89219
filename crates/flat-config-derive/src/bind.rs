//! `BindConfig` derive macro implementation.

use proc_macro::TokenStream;
use quote::{quote, quote_spanned};
use syn::{DeriveInput, spanned::Spanned};

use crate::{
    config::{ConfigContainer, ConfigField},
    utils::{type_in_code, wrap_in_option},
};

impl ConfigField {
    fn describe_attribute(&self, cr: &proc_macro2::TokenStream) -> proc_macro2::TokenStream {
        let name = &self.name;
        let name_span = name.span();
        let help = &self.docs;

        let operative = wrap_in_option(self.attrs.property.as_ref().map(|lit| quote!(#lit)));
        let legacy = self.attrs.legacy.iter();
        let secret = self.attrs.secret;
        let deprecation = wrap_in_option(self.attrs.deprecated.as_ref().map(|note| {
            let since = wrap_in_option(note.since.as_ref().map(|lit| quote!(#lit)));
            let for_removal = note.for_removal;
            quote! {
                #cr::metadata::DeprecationNote {
                    since: #since,
                    for_removal: #for_removal,
                }
            }
        }));

        let ty = &self.ty;
        let ty_in_code = type_in_code(ty);

        quote_spanned! {name_span=>
            #cr::metadata::AttributeMetadata {
                rust_field_name: ::core::stringify!(#name),
                help: #help,
                operative: #operative,
                legacy: &[#(#legacy,)*],
                security_sensitive: #secret,
                deprecation: #deprecation,
                rust_type: #cr::metadata::RustType::of::<#ty>(#ty_in_code),
            }
        }
    }

    fn bind_arm(&self, index: usize, cr: &proc_macro2::TokenStream) -> proc_macro2::TokenStream {
        let name = &self.name;
        quote_spanned! {name.span()=>
            #index => {
                self.#name = #cr::FromConfigString::from_config_string(raw)?;
                ::core::result::Result::Ok(())
            }
        }
    }

    fn violation_checks(&self, cr: &proc_macro2::TokenStream) -> Vec<proc_macro2::TokenStream> {
        let name = &self.name;
        let checks = self.attrs.validations.iter().map(|validation| {
            let wrapped = validation.wrap(cr);
            let span = validation.expr.span();
            // A reference is required to convert to `&dyn Validate<_>`-style usage. `()`s are here
            // to correctly handle some validation expressions (e.g., `a..b` ranges; unless a range
            // is parenthesized, `&` will be interpreted as a part of the range start).
            if let Some(inner_ty) = Self::unwrap_option(&self.ty) {
                // Absent optional values pass validation.
                quote_spanned! {span=>
                    if let ::core::option::Option::Some(value) = &self.#name {
                        let validation = &(#wrapped);
                        if let ::core::result::Result::Err(err) =
                            #cr::validation::Validate::<#inner_ty>::validate(validation, value)
                        {
                            violations.push(#cr::validation::Violation::for_field(
                                ::core::stringify!(#name),
                                err,
                            ));
                        }
                    }
                }
            } else {
                let ty = &self.ty;
                quote_spanned! {span=>
                    {
                        let validation = &(#wrapped);
                        if let ::core::result::Result::Err(err) =
                            #cr::validation::Validate::<#ty>::validate(validation, &self.#name)
                        {
                            violations.push(#cr::validation::Violation::for_field(
                                ::core::stringify!(#name),
                                err,
                            ));
                        }
                    }
                }
            }
        });
        checks.collect()
    }
}

impl ConfigContainer {
    fn derive_describe_config(&self) -> proc_macro2::TokenStream {
        let cr = self.cr();
        let name = &self.name;
        let name_str = name.to_string();
        let help = &self.help;

        let attributes = self.fields.iter().map(|field| field.describe_attribute(&cr));
        let defunct = self.attrs.defunct.iter();

        quote! {
            impl #cr::DescribeConfig for #name {
                fn describe_config() -> &'static #cr::metadata::ConfigMetadata {
                    static METADATA_CELL: ::std::sync::LazyLock<#cr::metadata::ConfigMetadata> =
                        ::std::sync::LazyLock::new(|| #cr::metadata::ConfigMetadata::new(
                            #cr::metadata::RustType::of::<#name>(#name_str),
                            #help,
                            ::std::boxed::Box::new([#(#attributes,)*]),
                            ::std::boxed::Box::new([#(#defunct,)*]),
                        ));
                    &METADATA_CELL
                }
            }
        }
    }

    fn derive_bind_config(&self) -> proc_macro2::TokenStream {
        let cr = self.cr();
        let name = &self.name;

        let arms = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| field.bind_arm(index, &cr));

        let field_checks: Vec<_> = self
            .fields
            .iter()
            .flat_map(|field| field.violation_checks(&cr))
            .collect();
        let config_checks = self.attrs.validations.iter().map(|validation| {
            let wrapped = validation.wrap(&cr);
            quote_spanned! {validation.expr.span()=>
                {
                    let validation = &(#wrapped);
                    if let ::core::result::Result::Err(err) =
                        #cr::validation::Validate::<Self>::validate(validation, self)
                    {
                        violations.push(#cr::validation::Violation::for_config(err));
                    }
                }
            }
        });
        let config_checks: Vec<_> = config_checks.collect();

        // `collect_violations` has a no-op default; only emit it when there is something to check.
        let violations_fn = if field_checks.is_empty() && config_checks.is_empty() {
            None
        } else {
            Some(quote! {
                fn collect_violations(
                    &self,
                    violations: &mut ::std::vec::Vec<#cr::validation::Violation>,
                ) {
                    #(#field_checks)*
                    #(#config_checks)*
                }
            })
        };

        quote! {
            impl #cr::BindConfig for #name {
                fn bind_attribute(
                    &mut self,
                    attribute: usize,
                    raw: &str,
                ) -> ::core::result::Result<(), #cr::CoerceError> {
                    match attribute {
                        #(#arms)*
                        _ => ::core::panic!(
                            "internal error: no config attribute with index {} in `{}`",
                            attribute,
                            ::core::stringify!(#name),
                        ),
                    }
                }

                #violations_fn
            }
        }
    }
}

pub(crate) fn impl_bind_config(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse(input) {
        Ok(input) => input,
        Err(err) => return err.into_compile_error().into(),
    };
    let container = match ConfigContainer::new(&input) {
        Ok(container) => container,
        Err(err) => return err.into_compile_error().into(),
    };
    let describe_impl = container.derive_describe_config();
    let bind_impl = container.derive_bind_config();
    quote!(#describe_impl #bind_impl).into()
}
