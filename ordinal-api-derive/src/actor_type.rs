use darling::{FromAttributes, FromMeta};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, DeriveInput};

use crate::common::{default_type_tag, to_compile_error};

/// Options accepted by `#[actor(...)]`
#[derive(Debug, Default, FromMeta)]
struct ActorTypeOptions {
    /// Explicit type tag
    #[darling(default)]
    name: Option<String>,
}

#[derive(Debug, FromAttributes)]
#[darling(attributes(actor))]
struct ActorTypeArgs {
    #[darling(flatten)]
    opts: ActorTypeOptions,
}

fn parse_actor_attrs(attrs: &[Attribute]) -> darling::Result<ActorTypeOptions> {
    ActorTypeArgs::from_attributes(attrs).map(|a| a.opts)
}

pub(crate) fn derive_actor_type_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let options = match parse_actor_attrs(&input.attrs) {
        Ok(options) => options,
        Err(err) => return err.write_errors().into(),
    };

    let name = &input.ident;
    let tag = options
        .name
        .unwrap_or_else(|| default_type_tag(&name.to_string()));

    if tag.is_empty() {
        return to_compile_error(syn::Error::new_spanned(name, "actor type tag must not be empty"));
    }
    if tag.contains(':') {
        return to_compile_error(syn::Error::new_spanned(
            name,
            "actor type tag must not contain ':'",
        ));
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::ordinal_api::handler::ActorType for #name #ty_generics #where_clause {
            const ACTOR_TYPE: &'static str = #tag;
        }

        impl #impl_generics #name #ty_generics #where_clause {
            /// Static type tag this handler is registered under.
            pub fn actor_type(&self) -> &'static str {
                <Self as ::ordinal_api::handler::ActorType>::ACTOR_TYPE
            }
        }
    };

    TokenStream::from(expanded)
}
