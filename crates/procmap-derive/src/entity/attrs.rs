//! Attribute parsing for the Entity derive macro.
//!
//! Handles parsing of struct-level and field-level `#[orm(...)]` attributes.

use syn::punctuated::Punctuated;
use syn::{Attribute, Ident, LitStr, Result, Token};

/// One `key` or `key = "value"` item inside `#[orm(...)]`.
struct OrmItem {
    key: Ident,
    value: Option<LitStr>,
}

impl syn::parse::Parse for OrmItem {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        let value = if input.peek(Token![=]) {
            let _: Token![=] = input.parse()?;
            Some(input.parse()?)
        } else {
            None
        };
        Ok(OrmItem { key, value })
    }
}

fn orm_items(attrs: &[Attribute]) -> Result<Vec<OrmItem>> {
    let mut items = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let parsed =
            attr.parse_args_with(Punctuated::<OrmItem, Token![,]>::parse_terminated)?;
        items.extend(parsed);
    }
    Ok(items)
}

fn require_value(item: &OrmItem) -> Result<LitStr> {
    item.value.clone().ok_or_else(|| {
        syn::Error::new_spanned(&item.key, format!("`{}` expects a string value", item.key))
    })
}

fn reject_value(item: &OrmItem) -> Result<()> {
    match &item.value {
        Some(value) => Err(syn::Error::new_spanned(
            value,
            format!("`{}` takes no value", item.key),
        )),
        None => Ok(()),
    }
}

fn set_once(slot: &mut Option<LitStr>, item: &OrmItem) -> Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new_spanned(
            &item.key,
            format!("duplicate `{}` attribute", item.key),
        ));
    }
    *slot = Some(require_value(item)?);
    Ok(())
}

/// Struct-level `#[orm(...)]`.
#[derive(Default)]
pub(super) struct StructAttrs {
    pub prefix: Option<LitStr>,
}

pub(super) fn parse_struct_attrs(attrs: &[Attribute]) -> Result<StructAttrs> {
    let mut out = StructAttrs::default();
    for item in orm_items(attrs)? {
        if item.key == "prefix" {
            set_once(&mut out.prefix, &item)?;
        } else {
            return Err(syn::Error::new_spanned(
                &item.key,
                format!("unknown struct attribute `{}`", item.key),
            ));
        }
    }
    Ok(out)
}

/// Field-level `#[orm(...)]`.
#[derive(Default)]
pub(super) struct FieldAttrs {
    pub column: Option<LitStr>,
    pub crud: Option<LitStr>,
    pub foreign_key: Option<LitStr>,
    pub identity: bool,
    pub readonly: bool,
    pub skip: bool,
    pub child: bool,
    pub scalar: bool,
}

impl FieldAttrs {
    /// Whether any attribute that only makes sense on a mapped value is present.
    pub fn has_value_attrs(&self) -> bool {
        self.column.is_some()
            || self.crud.is_some()
            || self.foreign_key.is_some()
            || self.identity
            || self.readonly
    }
}

pub(super) fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for item in orm_items(attrs)? {
        let key = item.key.to_string();
        match key.as_str() {
            "column" => set_once(&mut out.column, &item)?,
            "crud" => set_once(&mut out.crud, &item)?,
            "foreign_key" => set_once(&mut out.foreign_key, &item)?,
            "identity" => {
                reject_value(&item)?;
                out.identity = true;
            }
            "readonly" => {
                reject_value(&item)?;
                out.readonly = true;
            }
            "skip" => {
                reject_value(&item)?;
                out.skip = true;
            }
            "child" => {
                reject_value(&item)?;
                out.child = true;
            }
            "scalar" => {
                reject_value(&item)?;
                out.scalar = true;
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &item.key,
                    format!("unknown field attribute `{key}`"),
                ));
            }
        }
    }
    Ok(out)
}

/// Bits of a `crud = "create|read"` list, matching `procmap::Crud`.
pub(super) fn crud_bits(lit: &LitStr) -> Result<u8> {
    let mut bits = 0u8;
    for part in lit
        .value()
        .split(['|', ','])
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        bits |= match part.to_ascii_lowercase().as_str() {
            "create" => 1,
            "read" => 1 << 1,
            "update" => 1 << 2,
            "delete" => 1 << 3,
            "dont_use" => 1 << 4,
            "all" => 0b1111,
            other => {
                return Err(syn::Error::new_spanned(
                    lit,
                    format!(
                        "unknown CRUD direction `{other}` \
                         (expected create, read, update, delete, dont_use or all)"
                    ),
                ));
            }
        };
    }
    Ok(bits)
}
