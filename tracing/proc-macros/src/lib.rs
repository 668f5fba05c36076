//! Procedural macro for instrumenting Rust functions with trace scopes.
//!
//! `#[trace_fn]` injects a `trace_scope!` call at the top of a function so
//! entry and exit (with duration) are recorded without writing the macro by
//! hand. The macro is re-exported through the scopetrace prelude:
//!
//! ```rust,ignore
//! use scopetrace::prelude::*;
//!
//! #[trace_fn]
//! fn compute_checksum(data: &[u8]) -> u32 {
//!     data.iter().fold(0u32, |acc, &b| acc.wrapping_add(b as u32))
//! }
//! ```
//!
//! By default the scope name is the function name prefixed with the module
//! path. A custom name can be supplied: `#[trace_fn("load")]`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream, Result},
    parse_macro_input, parse_quote, ItemFn, LitStr,
};

struct TraceArgs {
    alternative_name: Option<LitStr>,
}

impl Parse for TraceArgs {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        if input.is_empty() {
            Ok(Self {
                alternative_name: None,
            })
        } else {
            Ok(Self {
                alternative_name: Some(input.parse::<LitStr>()?),
            })
        }
    }
}

/// Instruments a function with an entry/exit trace scope.
///
/// The injected scope records an Enter event when the function is called and
/// an Exit event with the elapsed duration when it returns, at the correct
/// nesting depth relative to enclosing scopes.
///
/// Async functions are rejected: a scope guard held across an await point
/// would attribute suspended time to the function. Instrument the blocking
/// sections inside the future with `trace_scope!` instead.
#[proc_macro_attribute]
pub fn trace_fn(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args as TraceArgs);
    let mut function = parse_macro_input!(input as ItemFn);

    if function.sig.asyncness.is_some() {
        return syn::Error::new_spanned(
            &function.sig,
            "#[trace_fn] does not support async functions; use trace_scope! inside the future",
        )
        .to_compile_error()
        .into();
    }

    let function_name = args
        .alternative_name
        .map_or(function.sig.ident.to_string(), |n| n.value());

    function.block.stmts.insert(
        0,
        parse_quote! {
            trace_scope!(concat!(module_path!(), "::", #function_name));
        },
    );

    TokenStream::from(quote! {
        #function
    })
}
