//! Attribute parsing for the Record derive macro.
//!
//! Handles struct-level and field-level `#[orm(...)]` attributes.

use syn::{DeriveInput, Result};

/// Struct-level `#[orm(table = "...", sequence = "...")]`.
#[derive(Default)]
pub(super) struct StructAttr {
    pub table: Option<String>,
    pub sequence: Option<String>,
}

impl syn::parse::Parse for StructAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = StructAttr::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;
            let value: syn::LitStr = input.parse()?;
            if ident == "table" {
                attr.table = Some(value.value());
            } else if ident == "sequence" {
                attr.sequence = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    ident,
                    "unknown orm attribute, expected `table` or `sequence`",
                ));
            }
            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attr)
    }
}

/// Field-level `#[orm(id, column = "...")]` or `#[orm(skip)]`.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub is_id: bool,
    pub skip: bool,
    pub column: Option<String>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "id" {
                attr.is_id = true;
            } else if ident == "skip" {
                attr.skip = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                attr.column = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    ident,
                    "unknown orm attribute, expected `id`, `column` or `skip`",
                ));
            }
            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attr)
    }
}

pub(super) fn struct_attr(input: &DeriveInput) -> Result<StructAttr> {
    let mut merged = StructAttr::default();
    for attr in &input.attrs {
        if attr.path().is_ident("orm") {
            let parsed: StructAttr = attr.parse_args()?;
            if parsed.table.is_some() {
                merged.table = parsed.table;
            }
            if parsed.sequence.is_some() {
                merged.sequence = parsed.sequence;
            }
        }
    }
    if merged.table.as_deref().is_none_or(|t| t.trim().is_empty()) {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Record requires #[orm(table = \"table_name\")] attribute",
        ));
    }
    Ok(merged)
}

pub(super) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if attr.path().is_ident("orm") {
            let parsed: FieldAttr = attr.parse_args()?;
            merged.is_id |= parsed.is_id;
            merged.skip |= parsed.skip;
            if parsed.column.is_some() {
                merged.column = parsed.column;
            }
        }
    }
    if merged.skip && (merged.is_id || merged.column.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "#[orm(skip)] cannot be combined with `id` or `column`",
        ));
    }
    Ok(merged)
}
