// This file is part of fvdd, an application to power, configure and supervise the FLIR video device FPGA.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// fvdd is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// fvdd is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Procedural macros for fvdd.
//!
//! `#[board(compat_string = "...")]` registers a board profile type under one or more
//! device-tree compatible strings:
//!
//! ```rust,ignore
//! #[board(compat_string = "fsl,imx6dl-ec101", compat_string = "fsl,imx6dl-ec501")]
//! pub struct Ec101;
//! ```
//!
//! expands to the item followed by
//!
//! ```rust,ignore
//! impl Ec101 {
//!     pub fn register_board() {
//!         crate::boards::register_board("fsl,imx6dl-ec101", || Box::new(Ec101::new()));
//!         crate::boards::register_board("fsl,imx6dl-ec501", || Box::new(Ec101::new()));
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Expr, ExprLit, ItemStruct, Lit, LitStr, MetaNameValue, Token, parse_macro_input};

fn compat_strings(args: Punctuated<MetaNameValue, Token![,]>) -> syn::Result<Vec<LitStr>> {
    let mut compat_strings = Vec::new();
    for arg in args {
        if !arg.path.is_ident("compat_string") {
            return Err(syn::Error::new_spanned(
                arg.path,
                "expected `compat_string = \"...\"`",
            ));
        }
        match arg.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(compat),
                ..
            }) if !compat.value().is_empty() => compat_strings.push(compat),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "compat_string must be a non-empty string literal",
                ));
            }
        }
    }
    Ok(compat_strings)
}

#[proc_macro_attribute]
pub fn board(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr with Punctuated::<MetaNameValue, Token![,]>::parse_terminated);
    let item = parse_macro_input!(item as ItemStruct);

    let compat_strings = match compat_strings(args) {
        Ok(strings) if strings.is_empty() => {
            return syn::Error::new_spanned(&item.ident, "#[board] needs at least one compat_string")
                .to_compile_error()
                .into();
        }
        Ok(strings) => strings,
        Err(e) => return e.to_compile_error().into(),
    };

    let name = &item.ident;
    quote! {
        #item

        impl #name {
            /// Register this board under its compatible strings.
            pub fn register_board() {
                #(
                    crate::boards::register_board(#compat_strings, || Box::new(#name::new()));
                )*
            }
        }
    }
    .into()
}
