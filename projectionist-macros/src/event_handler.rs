use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashSet;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Attribute, FnArg, Ident, ImplItem, ItemImpl, LitStr, Result, Signature, Token,
    parse_macro_input,
};

/// 被 `#[handles(...)]` 标注的处理器方法
struct HandlerMethod {
    ident: Ident,
    is_async: bool,
    event_types: Vec<LitStr>,
}

/// #[event_handler] 宏实现
/// - 仅用于固有 impl 块（`impl Type { .. }`）
/// - 收集带 `#[handles("EventType", ..)]` 的方法，签名须为 `fn(&self, &StoredEvent) -> Result<(), E>`，
///   其中 `E: Into<anyhow::Error>`，可为 async
/// - 生成 `::projectionist::handler::HandlerMethods` 实现：方法表、按名称调用、
///   以及由标注推导出的事件映射
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[event_handler] takes no arguments",
        )
        .to_compile_error()
        .into();
    }

    let mut item_impl = parse_macro_input!(item as ItemImpl);

    if let Some((_, path, _)) = &item_impl.trait_ {
        return syn::Error::new(
            path.span(),
            "#[event_handler] must be placed on an inherent impl block",
        )
        .to_compile_error()
        .into();
    }

    let mut methods: Vec<HandlerMethod> = Vec::new();
    for impl_item in &mut item_impl.items {
        let ImplItem::Fn(f) = impl_item else {
            continue;
        };

        let mut event_types: Option<Vec<LitStr>> = None;
        let mut retained = Vec::new();
        for attr in f.attrs.drain(..) {
            if !attr.path().is_ident("handles") {
                retained.push(attr);
                continue;
            }
            if event_types.is_some() {
                return syn::Error::new(attr.span(), "duplicate #[handles] on this method")
                    .to_compile_error()
                    .into();
            }
            match parse_handles(&attr) {
                Ok(types) => event_types = Some(types),
                Err(err) => return err.to_compile_error().into(),
            }
        }
        f.attrs = retained;

        let Some(event_types) = event_types else {
            continue;
        };
        if let Err(err) = check_signature(&f.sig) {
            return err.to_compile_error().into();
        }

        methods.push(HandlerMethod {
            ident: f.sig.ident.clone(),
            is_async: f.sig.asyncness.is_some(),
            event_types,
        });
    }

    // 同一事件类型只能映射到一个方法
    let mut seen_types = HashSet::new();
    for ty in methods.iter().flat_map(|m| &m.event_types) {
        if !seen_types.insert(ty.value()) {
            return syn::Error::new(
                ty.span(),
                format!("duplicate event type '{}' in #[handles]", ty.value()),
            )
            .to_compile_error()
            .into();
        }
    }

    if methods.is_empty() {
        return syn::Error::new(
            item_impl.self_ty.span(),
            "#[event_handler] found no #[handles(..)] methods",
        )
        .to_compile_error()
        .into();
    }

    let self_ty = &item_impl.self_ty;
    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    let names = methods
        .iter()
        .map(|m| LitStr::new(&m.ident.to_string(), m.ident.span()));

    let declared = methods.iter().flat_map(|m| {
        let name = LitStr::new(&m.ident.to_string(), m.ident.span());
        m.event_types
            .iter()
            .map(move |ty| quote! { .on(#ty, #name) })
    });

    let arms = methods.iter().map(|m| {
        let ident = &m.ident;
        let name = LitStr::new(&ident.to_string(), ident.span());
        let call = if m.is_async {
            quote! { self.#ident(event).await }
        } else {
            quote! { self.#ident(event) }
        };
        quote! {
            #name => ::core::result::Result::map_err(#call, ::core::convert::Into::into),
        }
    });

    let out = quote! {
        #item_impl

        #[::projectionist::__private::async_trait]
        impl #impl_generics ::projectionist::handler::HandlerMethods for #self_ty #where_clause {
            fn method_names(&self) -> &'static [&'static str] {
                &[ #( #names ),* ]
            }

            fn declared_events(&self) -> ::projectionist::handler::HandledEvents {
                ::projectionist::handler::HandledEvents::new() #( #declared )*
            }

            async fn call_method(
                &self,
                method: &str,
                event: &::projectionist::event::StoredEvent,
            ) -> ::projectionist::__private::anyhow::Result<()> {
                match method {
                    #( #arms )*
                    other => ::core::result::Result::Err(
                        ::projectionist::__private::anyhow::anyhow!("unknown handler method: {}", other)
                    ),
                }
            }
        }
    };

    TokenStream::from(out)
}

// `#[handles]` 或 `#[handles("A", "B")]`
fn parse_handles(attr: &Attribute) -> Result<Vec<LitStr>> {
    match &attr.meta {
        syn::Meta::Path(_) => Ok(Vec::new()),
        syn::Meta::List(_) => Ok(attr
            .parse_args_with(Punctuated::<LitStr, Token![,]>::parse_terminated)?
            .into_iter()
            .collect()),
        syn::Meta::NameValue(nv) => Err(syn::Error::new(
            nv.span(),
            "expected #[handles] or #[handles(\"EventType\", ..)]",
        )),
    }
}

fn check_signature(sig: &Signature) -> Result<()> {
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "handler methods cannot be generic",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(r)) if r.reference.is_some() && r.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new(
                sig.span(),
                "handler methods must take `&self` as receiver",
            ));
        }
    }

    match (inputs.next(), inputs.next()) {
        (Some(FnArg::Typed(_)), None) => Ok(()),
        _ => Err(syn::Error::new(
            sig.inputs.span(),
            "handler methods must take exactly one event argument: `event: &StoredEvent`",
        )),
    }
}
