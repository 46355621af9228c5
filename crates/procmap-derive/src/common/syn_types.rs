//! Type helper utilities for syn type analysis.

/// Extract the inner type T from Option<T>, or return None if not an Option type.
///
/// Recognizes `Option<T>`, `std::option::Option<T>`, and `core::option::Option<T>`.
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_generic_arg(ty, "Option")
}

/// Extract the inner type T from Vec<T>, or return None if not a Vec type.
///
/// Recognizes `Vec<T>` and `std::vec::Vec<T>`.
pub fn vec_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_generic_arg(ty, "Vec")
}

/// Whether the type is `u8`.
pub fn is_u8(ty: &syn::Type) -> bool {
    let syn::Type::Path(type_path) = ty else {
        return false;
    };
    type_path.qself.is_none() && type_path.path.is_ident("u8")
}

fn single_generic_arg<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    let syn::GenericArgument::Type(inner) = args.args.first()? else {
        return None;
    };
    Some(inner)
}
