use crate::utils::{apply_derives, ensure_leading_fields};
use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Fields, Item, LitInt, LitStr, Result, Token, Type, Variant, parse_macro_input};

/// #[domain_event] 宏实现
/// - 支持具名字段变体 `Variant { .. }` 与单元变体 `Variant`（改写为 `Variant { id }`）
/// - 确保每个变体具备 `id: IdType`
/// - 生成 `::mediator_domain::domain_event::DomainEvent` 实现（event_id/type/version）
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EventAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let enum_item = match &mut input {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new(other.span(), "#[domain_event] can only be used on enum types")
                .to_compile_error()
                .into();
        }
    };

    let id_type = cfg.id_ty.unwrap_or_else(|| syn::parse_quote! { String });
    let default_version = cfg.version.unwrap_or_else(|| syn::parse_quote! { 1 });

    apply_derives(
        &mut enum_item.attrs,
        vec![
            syn::parse_quote!(Debug),
            syn::parse_quote!(Clone),
            syn::parse_quote!(PartialEq),
            syn::parse_quote!(serde::Serialize),
            syn::parse_quote!(serde::Deserialize),
        ],
    );

    let enum_name = enum_item.ident.to_string();
    let mut type_arms = Vec::new();
    let mut version_arms = Vec::new();
    let mut id_arms = Vec::new();

    for v in &mut enum_item.variants {
        if let Err(err) = normalize_fields(v, &id_type) {
            return err.to_compile_error().into();
        }
        let overrides = match take_variant_overrides(v) {
            Ok(o) => o,
            Err(err) => return err.to_compile_error().into(),
        };

        let v_ident = &v.ident;
        let event_type = overrides.event_type.unwrap_or_else(|| {
            LitStr::new(&format!("{enum_name}.{v_ident}"), v_ident.span())
        });
        let version = overrides.event_version.unwrap_or_else(|| default_version.clone());

        id_arms.push(quote! { Self::#v_ident { id, .. } => ::core::convert::AsRef::<str>::as_ref(id) });
        type_arms.push(quote! { Self::#v_ident { .. } => #event_type });
        version_arms.push(quote! { Self::#v_ident { .. } => #version });
    }

    let enum_ident = &enum_item.ident;
    let out = quote! {
        #enum_item

        impl ::mediator_domain::domain_event::DomainEvent for #enum_ident {
            fn event_id(&self) -> &str { match self { #( #id_arms, )* } }
            fn event_type(&self) -> &str { match self { #( #type_arms, )* } }
            fn event_version(&self) -> usize { match self { #( #version_arms, )* } }
        }
    };

    TokenStream::from(out)
}

fn normalize_fields(v: &mut Variant, id_type: &Type) -> Result<()> {
    match &mut v.fields {
        Fields::Named(named) => {
            ensure_leading_fields(named, &[("id", id_type)]);
            Ok(())
        }
        Fields::Unit => {
            v.fields = Fields::Named(syn::parse_quote! { { id: #id_type } });
            Ok(())
        }
        Fields::Unnamed(_) => Err(syn::Error::new(
            v.span(),
            "#[domain_event] supports named-field or unit variants, e.g., Variant { x: T }",
        )),
    }
}

#[derive(Default)]
struct VariantOverrides {
    event_type: Option<LitStr>,
    event_version: Option<LitInt>,
}

// 取出并移除变体上的 #[event(...)]
fn take_variant_overrides(v: &mut Variant) -> Result<VariantOverrides> {
    let mut overrides = VariantOverrides::default();
    let mut retained = Vec::with_capacity(v.attrs.len());

    for attr in std::mem::take(&mut v.attrs) {
        if !attr.path().is_ident("event") {
            retained.push(attr);
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("event_type") {
                if overrides.event_type.is_some() {
                    return Err(meta.error("duplicate 'event_type' specified for this variant"));
                }
                overrides.event_type = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("event_version") {
                if overrides.event_version.is_some() {
                    return Err(meta.error("duplicate 'event_version' specified for this variant"));
                }
                overrides.event_version = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown key; expected 'event_type' | 'event_version'"))
            }
        })?;
    }

    v.attrs = retained;
    Ok(overrides)
}

// 枚举级配置：id 类型、默认版本号
struct EventAttrConfig {
    id_ty: Option<Type>,
    version: Option<LitInt>,
}

struct ConfigEntry {
    key: syn::Ident,
    value: ConfigValue,
}

enum ConfigValue {
    Type(Type),
    Int(LitInt),
}

impl Parse for ConfigEntry {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        input.parse::<Token![=]>()?;
        let value = match key.to_string().as_str() {
            "id" => ConfigValue::Type(input.parse()?),
            "version" => ConfigValue::Int(input.parse()?),
            _ => {
                return Err(syn::Error::new(
                    key.span(),
                    "unknown key; expected 'id' | 'version'",
                ));
            }
        };
        Ok(Self { key, value })
    }
}

impl Parse for EventAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = EventAttrConfig {
            id_ty: None,
            version: None,
        };
        let entries = Punctuated::<ConfigEntry, Token![,]>::parse_terminated(input)?;
        for entry in entries {
            let duplicate = match entry.value {
                ConfigValue::Type(ty) => cfg.id_ty.replace(ty).is_some(),
                ConfigValue::Int(lit) => cfg.version.replace(lit).is_some(),
            };
            if duplicate {
                return Err(syn::Error::new(
                    entry.key.span(),
                    format!("duplicate key '{}' in attribute", entry.key),
                ));
            }
        }
        Ok(cfg)
    }
}
