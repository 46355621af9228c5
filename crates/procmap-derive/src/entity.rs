//! Entity derive macro implementation

mod attrs;

use crate::common::syn_types::{is_u8, option_inner, vec_inner};
use attrs::{FieldAttrs, crud_bits, parse_field_attrs, parse_struct_attrs};
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let struct_attrs = parse_struct_attrs(&input.attrs)?;
    let type_name = name.unraw().to_string();
    let prefix = struct_attrs.prefix.map(|p| quote! { .prefix(#p) });

    let mut field_defs = Vec::new();
    let mut child_slots = Vec::new();

    for field in fields {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        match child_slot(field, &attrs)? {
            Some(slot) => child_slots.push(slot),
            None => field_defs.push(field_def(field, &attrs)?),
        }
    }

    Ok(quote! {
        impl #impl_generics procmap::Entity for #name #ty_generics #where_clause {
            fn describe() -> procmap::EntityDescriptor<Self> {
                procmap::EntityDescriptor::new(#type_name)
                    #prefix
                    #(.field(#field_defs))*
                    #(.child(#child_slots))*
            }
        }
    })
}

/// `ChildSlot` builder for `Vec<C>` fields and `#[orm(child)] Option<C>` fields.
fn child_slot(field: &syn::Field, attrs: &FieldAttrs) -> Result<Option<TokenStream>> {
    let ident = field_ident(field)?;
    let field_name = ident.unraw().to_string();

    if attrs.child {
        if attrs.has_value_attrs() || attrs.scalar {
            return Err(syn::Error::new_spanned(
                field,
                "#[orm(child)] cannot be combined with value attributes",
            ));
        }
        let Some(inner) = option_inner(&field.ty) else {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "#[orm(child)] requires an Option<T> field; Vec<T> fields are child collections already",
            ));
        };
        return Ok(Some(quote! {
            procmap::ChildSlot::<Self>::one::<#inner>(#field_name, |e| &mut e.#ident)
        }));
    }

    if attrs.scalar {
        return Ok(None);
    }
    match vec_inner(&field.ty) {
        Some(inner) if !is_u8(inner) => {
            if attrs.has_value_attrs() {
                return Err(syn::Error::new_spanned(
                    field,
                    "child collections take no value attributes; add #[orm(scalar)] to map this Vec as a JSON array",
                ));
            }
            Ok(Some(quote! {
                procmap::ChildSlot::<Self>::many::<#inner>(#field_name, |e| &mut e.#ident)
            }))
        }
        _ => Ok(None),
    }
}

/// `FieldDef` builder with accessors for a mapped value field.
fn field_def(field: &syn::Field, attrs: &FieldAttrs) -> Result<TokenStream> {
    let ident = field_ident(field)?;
    let field_name = ident.unraw().to_string();
    let ty = &field.ty;

    let column = attrs.column.as_ref().map(|c| quote! { .column(#c) });
    let crud = match &attrs.crud {
        Some(lit) => {
            let bits = crud_bits(lit)?;
            Some(quote! { .crud(procmap::Crud::from_bits(#bits)) })
        }
        None => None,
    };
    let foreign_key = attrs.foreign_key.as_ref().map(|fk| quote! { .foreign_key(#fk) });
    let identity = attrs.identity.then(|| quote! { .identity() });
    let setter = (!attrs.readonly).then(|| {
        quote! {
            .setter(|e, v| {
                e.#ident = procmap::FieldValue::from_value(v)?;
                ::core::result::Result::Ok(())
            })
        }
    });

    Ok(quote! {
        procmap::FieldDef::<Self>::of::<#ty>(#field_name)
            #column
            #crud
            #foreign_key
            #identity
            .getter(|e| procmap::FieldValue::to_value(&e.#ident))
            #setter
    })
}

fn field_ident(field: &syn::Field) -> Result<&syn::Ident> {
    field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "Entity fields must be named"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expanded(input: DeriveInput) -> String {
        expand(input).unwrap().to_string().replace(' ', "")
    }

    #[test]
    fn value_fields_get_accessors_and_annotations() {
        let out = expanded(parse_quote! {
            #[orm(prefix = "u")]
            struct User {
                #[orm(identity, crud = "read|delete")]
                id: i64,
                #[orm(column = "user_name")]
                name: String,
                #[orm(foreign_key = "Team.id")]
                team_id: Option<i64>,
                #[orm(readonly)]
                created: String,
            }
        });

        assert!(out.contains("implprocmap::EntityforUser"));
        assert!(out.contains("EntityDescriptor::new(\"User\").prefix(\"u\")"));
        assert!(out.contains("FieldDef::<Self>::of::<i64>(\"id\").crud(procmap::Crud::from_bits(10u8)).identity()"));
        assert!(out.contains(".column(\"user_name\")"));
        assert!(out.contains(".foreign_key(\"Team.id\")"));
        assert!(out.contains("e.name=procmap::FieldValue::from_value(v)?"));
        assert!(!out.contains("e.created=procmap::FieldValue::from_value(v)?"));
    }

    #[test]
    fn vec_and_child_option_become_slots() {
        let out = expanded(parse_quote! {
            struct Team {
                id: i64,
                members: Vec<User>,
                avatar: Vec<u8>,
                #[orm(scalar)]
                tags: Vec<String>,
                #[orm(child)]
                lead: Option<User>,
                #[orm(skip)]
                cache: String,
            }
        });

        assert!(out.contains("ChildSlot::<Self>::many::<User>(\"members\",|e|&mute.members)"));
        assert!(out.contains("ChildSlot::<Self>::one::<User>(\"lead\",|e|&mute.lead)"));
        assert!(out.contains("FieldDef::<Self>::of::<Vec<u8>>(\"avatar\")"));
        assert!(out.contains("FieldDef::<Self>::of::<Vec<String>>(\"tags\")"));
        assert!(!out.contains("\"cache\""));
    }

    #[test]
    fn misuse_is_reported() {
        let child_on_value: DeriveInput = parse_quote! {
            struct A { #[orm(child)] b: B }
        };
        assert!(expand(child_on_value).is_err());

        let column_on_collection: DeriveInput = parse_quote! {
            struct A { #[orm(column = "x")] bs: Vec<B> }
        };
        assert!(expand(column_on_collection).is_err());

        let tuple: DeriveInput = parse_quote! { struct A(i64); };
        assert!(expand(tuple).is_err());

        let unknown: DeriveInput = parse_quote! {
            struct A { #[orm(primary)] id: i64 }
        };
        assert!(expand(unknown).is_err());
    }
}
