#![recursion_limit = "128"]

extern crate proc_macro;

use proc_macro::TokenStream;

mod bind;
mod config;
mod utils;
mod variants;

#[proc_macro_derive(BindConfig, attributes(config))]
pub fn bind_config(input: TokenStream) -> TokenStream {
    bind::impl_bind_config(input)
}

#[proc_macro_derive(ConfigEnum, attributes(config))]
pub fn config_enum(input: TokenStream) -> TokenStream {
    variants::impl_config_enum(input)
}
