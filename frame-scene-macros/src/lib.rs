use proc_macro::TokenStream;
use quote::quote;

use syn::{Data, DeriveInput, Error, Meta};

const FETCH_VIEW_ATTR: &str = "fetch_view";

fn is_fetch_view(attrs: &[syn::Attribute]) -> Result<bool, Error> {
    for attr in attrs {
        if !attr.path().is_ident(FETCH_VIEW_ATTR) {
            continue;
        }
        return match &attr.meta {
            Meta::Path(_) => Ok(true),
            meta => Err(Error::new_spanned(
                meta,
                format!("Expected #[{FETCH_VIEW_ATTR}] without arguments"),
            )),
        };
    }
    Ok(false)
}

/// Derive macro for the `FetchViews` trait.
///
/// Fields marked `#[fetch_view]` must be `FetchView<T>` slots. Each one is
/// assigned the first discovered view of type `T`.
#[proc_macro_derive(FetchViews, attributes(fetch_view))]
pub fn derive_fetch_views(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match handle_derive_fetch_views(input) {
        Ok(v) => v.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn handle_derive_fetch_views(input: DeriveInput) -> Result<proc_macro2::TokenStream, Error> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(s) => &s.fields,
        _ => return Err(Error::new(name.span(), "Only structs are supported")),
    };

    let mut stmts = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        if !is_fetch_view(&field.attrs)? {
            continue;
        }
        let member = match &field.ident {
            Some(ident) => quote! { #ident },
            None => {
                let index = syn::Index::from(index);
                quote! { #index }
            }
        };
        stmts.push(quote! {
            ::frame_scene::FetchView::resolve(&self.#member, views);
        });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::frame_scene::FetchViews for #name #ty_generics #where_clause {
            fn fetch_views(
                &self,
                views: &[::std::sync::Arc<dyn ::frame_scene::View>],
            ) {
                let _ = views;
                #(#stmts)*
            }
        }
    })
}
