//! Derive macros for the graphpack serialization format.
//!
//! `#[derive(Encode)]` and `#[derive(Decode)]` implement record encoding for
//! structs with named fields: the struct becomes a wire class whose name and
//! field list are declared once per stream, with instances carrying field
//! values in declaration order.

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Fields, Ident};

fn named_field_idents(input: &DeriveInput, derive: &str) -> Result<Vec<Ident>, syn::Error> {
    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(named),
            ..
        }) => &named.named,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                format!(
                    "#[derive({})] supports structs with named fields only; \
                     other shapes need a manual implementation",
                    derive
                ),
            ))
        }
    };
    Ok(fields
        .iter()
        .map(|f| f.ident.clone().expect("named field has an ident"))
        .collect())
}

/// Implements `graphpack::Encode` for a struct with named fields.
///
/// The generated implementation declares the class on first sight, registers
/// each instance in the encoder's reference table before its field values,
/// and emits back-references for instances already written.
#[proc_macro_derive(Encode)]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let idents = match named_field_idents(&input, "Encode") {
        Ok(idents) => idents,
        Err(err) => return err.to_compile_error().into(),
    };
    let name = &input.ident;
    let name_str = name.to_string();
    let field_names: Vec<String> = idents.iter().map(|i| i.to_string()).collect();

    let expanded = quote! {
        impl ::graphpack::Encode for #name {
            fn encode(&self, enc: &mut ::graphpack::Encoder) -> ::graphpack::Result<()> {
                ::graphpack::record::encode_record(
                    enc,
                    self,
                    #name_str,
                    &[#(#field_names),*],
                    |enc| {
                        #( ::graphpack::Encode::encode(&self.#idents, enc)?; )*
                        Ok(())
                    },
                )
            }

            fn write(&self, enc: &mut ::graphpack::Encoder) -> ::graphpack::Result<()> {
                ::graphpack::record::write_record(
                    enc,
                    self,
                    #name_str,
                    &[#(#field_names),*],
                    |enc| {
                        #( ::graphpack::Encode::encode(&self.#idents, enc)?; )*
                        Ok(())
                    },
                )
            }
        }
    };
    expanded.into()
}

/// Implements `graphpack::Decode` for a struct with named fields.
///
/// The generated implementation consumes class declarations, verifies the
/// declared schema against the struct's field list, and reads field values
/// in declaration order.
#[proc_macro_derive(Decode)]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let idents = match named_field_idents(&input, "Decode") {
        Ok(idents) => idents,
        Err(err) => return err.to_compile_error().into(),
    };
    let name = &input.ident;
    let name_str = name.to_string();
    let field_names: Vec<String> = idents.iter().map(|i| i.to_string()).collect();

    let expanded = quote! {
        impl ::graphpack::Decode for #name {
            fn decode_tag(
                dec: &mut ::graphpack::Decoder,
                tag: u8,
            ) -> ::graphpack::Result<Self> {
                ::graphpack::record::decode_record(
                    dec,
                    tag,
                    #name_str,
                    &[#(#field_names),*],
                    |dec| {
                        Ok(Self {
                            #( #idents: ::graphpack::Decode::decode(dec)?, )*
                        })
                    },
                )
            }
        }
    };
    expanded.into()
}
