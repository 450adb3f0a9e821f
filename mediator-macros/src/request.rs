use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitInt, LitStr, Result, Type, parse_macro_input};

struct CommandAttrs {
    name: Option<LitStr>,
    output: Option<Type>,
    schedulable: bool,
    payload_version: Option<LitInt>,
}

struct QueryAttrs {
    name: Option<LitStr>,
    dto: Option<Type>,
}

pub(crate) fn expand_command(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    match command_impl(&input) {
        Ok(ts) => ts.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

pub(crate) fn expand_query(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    match query_impl(&input) {
        Ok(ts) => ts.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn command_impl(input: &DeriveInput) -> Result<proc_macro2::TokenStream> {
    let mut attrs = CommandAttrs {
        name: None,
        output: None,
        schedulable: false,
        payload_version: None,
    };
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("command")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                attrs.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("output") {
                attrs.output = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("schedulable") {
                attrs.schedulable = true;
            } else if meta.path.is_ident("payload_version") {
                attrs.payload_version = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error(
                    "unknown key; expected 'name' | 'output' | 'schedulable' | 'payload_version'",
                ));
            }
            Ok(())
        })?;
    }

    if attrs.payload_version.is_some() && !attrs.schedulable {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "'payload_version' requires 'schedulable'",
        ));
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let name = request_name(ident, attrs.name);
    let output = attrs.output.unwrap_or_else(|| syn::parse_quote! { () });

    let schedulable = attrs.schedulable.then(|| {
        let version = attrs
            .payload_version
            .unwrap_or_else(|| syn::parse_quote! { 1 });
        quote! {
            impl #impl_generics ::mediator_application::command::SchedulableCommand for #ident #ty_generics #where_clause {
                const PAYLOAD_VERSION: usize = #version;
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::mediator_application::command::Command for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
            type Output = #output;
        }

        #schedulable
    })
}

fn query_impl(input: &DeriveInput) -> Result<proc_macro2::TokenStream> {
    let mut attrs = QueryAttrs {
        name: None,
        dto: None,
    };
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("query")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                attrs.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("dto") {
                attrs.dto = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unknown key; expected 'name' | 'dto'"));
            }
            Ok(())
        })?;
    }

    let ident = &input.ident;
    let Some(dto) = attrs.dto else {
        return Err(syn::Error::new_spanned(
            ident,
            "#[derive(Query)] requires #[query(dto = Type)]",
        ));
    };
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let name = request_name(ident, attrs.name);

    Ok(quote! {
        impl #impl_generics ::mediator_application::query::Query for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
            type Dto = #dto;
        }
    })
}

fn request_name(ident: &syn::Ident, name: Option<LitStr>) -> LitStr {
    name.unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()))
}
