use proc_macro::TokenStream;
use quote::{ToTokens, quote};
use std::collections::{HashMap, HashSet};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Attribute, Expr, Ident, Item, Result, Token, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

/// #[event] 宏实现
/// - 支持任意形态的枚举变体（具名字段、元组、单元）
/// - 合并派生：Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize
/// - 生成 `::projectionist::event::DomainEvent` 实现（event_type/event_version）
/// - 事件类型默认 `"{Enum}.{Variant}"`，变体可通过 `#[event(event_type = "...", event_version = N)]` 覆写
/// - 枚举级默认版本：`#[event(version = N)]`，缺省为 1
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EventAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let enum_item = match &mut input {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new(other.span(), "#[event] can only be used on enum types")
                .to_compile_error()
                .into();
        }
    };

    if enum_item.variants.is_empty() {
        return syn::Error::new(enum_item.span(), "#[event] requires at least one variant")
            .to_compile_error()
            .into();
    }

    let version_lit = cfg.version.unwrap_or_else(|| syn::parse_quote! { 1 });

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    apply_derives(&mut enum_item.attrs, required);

    let mut variant_types: HashMap<String, syn::LitStr> = HashMap::new();
    let mut variant_versions: HashMap<String, syn::LitInt> = HashMap::new();

    for v in &mut enum_item.variants {
        let mut retained_attrs = Vec::new();
        let mut type_lit: Option<syn::LitStr> = None;
        let mut version_lit_local: Option<syn::LitInt> = None;

        for attr in v.attrs.iter() {
            if !attr.path().is_ident("event") {
                retained_attrs.push(attr.clone());
                continue;
            }
            let vc = match parse_variant_event_attr(attr) {
                Ok(vc) => vc,
                Err(err) => return err.to_compile_error().into(),
            };
            if let Some(lit) = vc.ty {
                if type_lit.replace(lit).is_some() {
                    return syn::Error::new(
                        attr.span(),
                        "duplicate 'event_type' specified for this variant",
                    )
                    .to_compile_error()
                    .into();
                }
            }
            if let Some(lit) = vc.version {
                if version_lit_local.replace(lit).is_some() {
                    return syn::Error::new(
                        attr.span(),
                        "duplicate 'event_version' specified for this variant",
                    )
                    .to_compile_error()
                    .into();
                }
            }
        }

        v.attrs = retained_attrs;
        if let Some(lit) = type_lit {
            variant_types.insert(v.ident.to_string(), lit);
        }
        if let Some(lit) = version_lit_local {
            variant_versions.insert(v.ident.to_string(), lit);
        }
    }

    // 事件类型是路由键，同一枚举内不允许重复
    let mut seen_types = HashSet::new();
    for v in &enum_item.variants {
        let ty = variant_types
            .get(&v.ident.to_string())
            .map(|lit| lit.value())
            .unwrap_or_else(|| format!("{}.{}", enum_item.ident, v.ident));
        if !seen_types.insert(ty.clone()) {
            return syn::Error::new(v.span(), format!("duplicate event type '{ty}'"))
                .to_compile_error()
                .into();
        }
    }

    let enum_ident = &enum_item.ident;
    let enum_name_string = enum_ident.to_string();
    let (impl_generics, ty_generics, where_clause) = enum_item.generics.split_for_impl();

    let type_match_arms = enum_item.variants.iter().map(|v| {
        let v_ident = &v.ident;
        let key = v_ident.to_string();
        let lit = variant_types.get(&key).cloned().unwrap_or_else(|| {
            syn::LitStr::new(&format!("{}.{}", enum_name_string, key), v_ident.span())
        });
        quote! { Self::#v_ident { .. } => #lit }
    });

    let ver_match_arms = enum_item.variants.iter().map(|v| {
        let v_ident = &v.ident;
        match variant_versions.get(&v_ident.to_string()) {
            Some(lit) => quote! { Self::#v_ident { .. } => #lit },
            None => quote! { Self::#v_ident { .. } => #version_lit },
        }
    });

    let out = quote! {
        #enum_item

        impl #impl_generics ::projectionist::event::DomainEvent for #enum_ident #ty_generics #where_clause {
            fn event_type(&self) -> &str { match self { #( #type_match_arms, )* } }
            fn event_version(&self) -> usize { match self { #( #ver_match_arms, )* } }
        }
    };

    TokenStream::from(out)
}

// -------- derives --------

// 合并默认与已有 derive（去重，优先保留 required），其余属性保持原顺序
fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<syn::Path>) {
    let mut retained = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs.drain(..) {
        if !attr.path().is_ident("derive") {
            retained.push(attr);
            continue;
        }
        match attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated) {
            Ok(list) => existing.extend(list),
            Err(_) => retained.push(attr),
        }
    }

    let mut seen = HashSet::new();
    let merged: Vec<syn::Path> = required
        .into_iter()
        .chain(existing)
        .filter(|p| seen.insert(derive_key(p)))
        .collect();

    attrs.push(syn::parse_quote!(#[derive(#(#merged),*)]));
    attrs.extend(retained);
}

// 归一化 derive 的 key，避免 Serialize/serde::Serialize 重复
fn derive_key(p: &syn::Path) -> String {
    match p.segments.last() {
        Some(last) => last.ident.to_string(),
        None => p.to_token_stream().to_string(),
    }
}

// -------- parsing --------

struct VariantEventAttrConfig {
    ty: Option<syn::LitStr>,
    version: Option<syn::LitInt>,
}

fn parse_variant_event_attr(attr: &Attribute) -> Result<VariantEventAttrConfig> {
    let syn::Meta::List(_) = &attr.meta else {
        return Err(syn::Error::new(attr.span(), "expected #[event(...)]"));
    };

    let mut ty: Option<syn::LitStr> = None;
    let mut version: Option<syn::LitInt> = None;
    let pairs = attr.parse_args_with(Punctuated::<AttrKv, Token![,]>::parse_terminated)?;

    for kv in pairs {
        match kv.key.to_string().as_str() {
            "event_type" => {
                let Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(lit),
                    ..
                }) = &kv.value
                else {
                    return Err(syn::Error::new(
                        kv.value.span(),
                        "expected string literal for 'event_type'",
                    ));
                };
                if ty.replace(lit.clone()).is_some() {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "duplicate key 'event_type' in attribute",
                    ));
                }
            }
            "event_version" => {
                let Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(lit),
                    ..
                }) = &kv.value
                else {
                    return Err(syn::Error::new(
                        kv.value.span(),
                        "expected integer literal for 'event_version'",
                    ));
                };
                if version.replace(lit.clone()).is_some() {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "duplicate key 'event_version' in attribute",
                    ));
                }
            }
            _ => {
                return Err(syn::Error::new(
                    kv.key.span(),
                    "unknown key; expected 'event_type' | 'event_version'",
                ));
            }
        }
    }

    Ok(VariantEventAttrConfig { ty, version })
}

struct AttrKv {
    key: Ident,
    value: Expr,
}

impl Parse for AttrKv {
    fn parse(input: ParseStream) -> Result<Self> {
        let key = input.parse()?;
        input.parse::<Token![=]>()?;
        let value = input.parse()?;
        Ok(Self { key, value })
    }
}

// 枚举级配置：默认事件版本号
struct EventAttrConfig {
    version: Option<syn::LitInt>,
}

impl Parse for EventAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut version: Option<syn::LitInt> = None;

        let pairs = Punctuated::<AttrKv, Token![,]>::parse_terminated(input)?;
        for kv in pairs {
            if kv.key != "version" {
                return Err(syn::Error::new(kv.key.span(), "unknown key; expected 'version'"));
            }
            let lit: syn::LitInt = syn::parse2(kv.value.to_token_stream())?;
            if version.replace(lit).is_some() {
                return Err(syn::Error::new(
                    kv.key.span(),
                    "duplicate key 'version' in attribute",
                ));
            }
        }

        Ok(Self { version })
    }
}
