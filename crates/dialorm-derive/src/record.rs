//! Record derive macro implementation

mod attrs;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

/// A mapped (non-skipped) field.
struct MappedField<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    column: String,
    is_id: bool,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let struct_attr = attrs::struct_attr(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut mapped = Vec::with_capacity(fields.len());
    for field in fields.iter() {
        let attr = attrs::field_attr(field)?;
        if attr.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        mapped.push(MappedField {
            ident,
            ty: &field.ty,
            column: attr.column.unwrap_or_else(|| ident.to_string()),
            is_id: attr.is_id,
        });
    }

    let field_triples = mapped.iter().map(|f| {
        let ident = f.ident;
        let ty = f.ty;
        let column = &f.column;
        quote! {
            ::dialorm::NameValueType::named(
                #column,
                ::dialorm::ToValue::to_value(&self.#ident),
                ::core::option::Option::Some(<#ty as ::dialorm::SqlTyped>::sql_type()),
            )
        }
    });

    let setters = mapped.iter().map(|f| {
        let ident = f.ident;
        let ty = f.ty;
        let column = &f.column;
        quote! {
            if column.eq_ignore_ascii_case(#column) {
                self.#ident = <#ty as ::dialorm::FromValue>::from_value(value, #column)?;
                return ::core::result::Result::Ok(true);
            }
        }
    });

    let ids: Vec<&MappedField> = mapped.iter().filter(|f| f.is_id).collect();
    let keys = ids
        .iter()
        .map(|f| f.column.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let key_member = match ids.as_slice() {
        [only] => {
            let member = only.ident.to_string();
            quote! { ::core::option::Option::Some(#member) }
        }
        _ => quote! { ::core::option::Option::None },
    };
    let sequence = match &struct_attr.sequence {
        Some(seq) => quote! { ::core::option::Option::Some(#seq) },
        None => quote! { ::core::option::Option::None },
    };
    let table = struct_attr.table.unwrap_or_default();

    Ok(quote! {
        impl #impl_generics ::dialorm::Record for #name #ty_generics #where_clause {
            fn fields(&self) -> ::std::vec::Vec<::dialorm::NameValueType> {
                ::std::vec![#(#field_triples),*]
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                column: &str,
                value: ::dialorm::Value,
            ) -> ::dialorm::OrmResult<bool> {
                #(#setters)*
                ::core::result::Result::Ok(false)
            }
        }

        impl #impl_generics ::dialorm::RecordMeta for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            const KEYS: &'static str = #keys;
            const KEY_MEMBER: ::core::option::Option<&'static str> = #key_member;
            const SEQUENCE: ::core::option::Option<&'static str> = #sequence;
        }
    })
}
