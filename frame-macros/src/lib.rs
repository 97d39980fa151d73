use proc_macro::TokenStream;
use quote::quote;

use syn::{Attribute, Data, DeriveInput, Error, Meta};

const INJECT_ATTR: &str = "inject";
const NESTED_ARG: &str = "nested";

enum InjectionPoint {
    /// `#[inject]`: an `Injected<T>` slot resolved from the provider.
    Slot,
    /// `#[inject(nested)]`: a field implementing `Inject` itself.
    Nested,
}

fn parse_injection_point(attrs: &[Attribute]) -> Result<Option<InjectionPoint>, Error> {
    for attr in attrs {
        if !attr.path().is_ident(INJECT_ATTR) {
            continue;
        }
        return match &attr.meta {
            Meta::Path(_) => Ok(Some(InjectionPoint::Slot)),
            Meta::List(list) => {
                let arg: syn::Ident = syn::parse2(list.tokens.clone())?;
                if arg == NESTED_ARG {
                    Ok(Some(InjectionPoint::Nested))
                } else {
                    Err(Error::new(
                        arg.span(),
                        format!("Unknown argument, expected #[{INJECT_ATTR}({NESTED_ARG})]"),
                    ))
                }
            }
            Meta::NameValue(v) => Err(Error::new_spanned(
                v,
                format!("Expected #[{INJECT_ATTR}] or #[{INJECT_ATTR}({NESTED_ARG})]"),
            )),
        };
    }
    Ok(None)
}

/// Derive macro for the `Inject` trait.
///
/// Fields marked `#[inject]` must be `Injected<T>` slots and are resolved from the
/// provider. Fields marked `#[inject(nested)]` are injected recursively.
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match handle_derive_inject(input) {
        Ok(v) => v.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn handle_derive_inject(input: DeriveInput) -> Result<proc_macro2::TokenStream, Error> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(s) => &s.fields,
        _ => return Err(Error::new(name.span(), "Only structs are supported")),
    };

    let mut stmts = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let member = match &field.ident {
            Some(ident) => quote! { #ident },
            None => {
                let index = syn::Index::from(index);
                quote! { #index }
            }
        };
        match parse_injection_point(&field.attrs)? {
            Some(InjectionPoint::Slot) => stmts.push(quote! {
                ::frame::Injected::resolve(&self.#member, provider)?;
            }),
            Some(InjectionPoint::Nested) => stmts.push(quote! {
                ::frame::Inject::inject(&self.#member, provider)?;
            }),
            None => {}
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::frame::Inject for #name #ty_generics #where_clause {
            fn inject(
                &self,
                provider: &::frame::Provider,
            ) -> ::std::result::Result<(), ::frame::DependencyError> {
                let _ = provider;
                #(#stmts)*
                Ok(())
            }
        }
    })
}
