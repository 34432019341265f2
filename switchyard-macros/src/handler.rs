//! Handler-table macros.
//!
//! This module contains:
//! - `#[handlers]` - Attribute macro on an `impl` block that collects its
//!   `#[handler(..)]`-tagged methods into a `HandlerTable`

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, Lit, LitStr, Token,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

/// Arguments of one `#[handler(..)]` attribute.
///
/// ```text
/// #[handler]
/// #[handler("request", "httperror", priority = 1.0, channel = "web", filter, override)]
/// ```
#[derive(Default)]
struct HandlerArgs {
    events: Vec<LitStr>,
    priority: Option<f64>,
    channel: Option<LitStr>,
    filter: bool,
    overrides: bool,
}

impl Parse for HandlerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = HandlerArgs::default();

        while !input.is_empty() {
            if input.peek(LitStr) {
                args.events.push(input.parse()?);
            } else {
                let ident = Ident::parse_any(input)?;
                match ident.to_string().as_str() {
                    "priority" => {
                        input.parse::<Token![=]>()?;
                        let negative = input.parse::<Option<Token![-]>>()?.is_some();
                        let magnitude: f64 = match input.parse::<Lit>()? {
                            Lit::Float(f) => f.base10_parse()?,
                            Lit::Int(i) => i.base10_parse::<i64>()? as f64,
                            other => {
                                return Err(syn::Error::new_spanned(
                                    other,
                                    "priority must be a number",
                                ));
                            }
                        };
                        args.priority = Some(if negative { -magnitude } else { magnitude });
                    }
                    "channel" => {
                        input.parse::<Token![=]>()?;
                        args.channel = Some(input.parse()?);
                    }
                    "filter" => args.filter = true,
                    "override" => args.overrides = true,
                    other => {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!("unknown handler option: {}", other),
                        ));
                    }
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

fn is_handler_attr(attr: &Attribute) -> bool {
    attr.path().is_ident("handler")
}

/// Pull the `#[handler]` attribute off a method, parsing its arguments.
fn take_handler_attr(method: &mut ImplItemFn) -> syn::Result<Option<HandlerArgs>> {
    let Some(pos) = method.attrs.iter().position(is_handler_attr) else {
        return Ok(None);
    };
    let attr = method.attrs.remove(pos);
    if method.attrs.iter().any(is_handler_attr) {
        return Err(syn::Error::new_spanned(
            &method.sig.ident,
            "a method can carry only one #[handler] attribute",
        ));
    }
    let args = match &attr.meta {
        syn::Meta::Path(_) => HandlerArgs::default(),
        _ => attr.parse_args()?,
    };
    Ok(Some(args))
}

fn handler_spec(method: &ImplItemFn, args: &HandlerArgs) -> syn::Result<TokenStream2> {
    let sig = &method.sig;
    let name = &sig.ident;
    let binding = name.to_string();

    match sig.inputs.first() {
        Some(FnArg::Receiver(recv)) if recv.reference.is_some() && recv.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                sig,
                "handler methods must take `&self`",
            ));
        }
    }

    let (event_param, call) = match sig.inputs.len() {
        1 => (quote! { _ }, quote! { __this.#name() }),
        2 => (quote! { __event }, quote! { __this.#name(__event) }),
        _ => {
            return Err(syn::Error::new_spanned(
                &sig.inputs,
                "handler methods take `&self` and optionally `&mut Event`",
            ));
        }
    };

    let body = if sig.asyncness.is_some() {
        quote! {
            ::std::boxed::Box::pin(async move {
                ::switchyard::IntoReply::into_reply(#call.await)
            })
        }
    } else {
        quote! {
            ::std::boxed::Box::pin(::std::future::ready(
                ::switchyard::IntoReply::into_reply(#call)
            ))
        }
    };

    let events = &args.events;
    let on = (!events.is_empty()).then(|| quote! { .on(&[#(#events),*]) });
    let priority = args.priority.map(|p| quote! { .with_priority(#p) });
    let channel = args.channel.as_ref().map(|c| quote! { .channel(#c) });
    let filter = args.filter.then(|| quote! { .filter() });
    let overrides = args.overrides.then(|| quote! { .overrides() });

    Ok(quote! {
        ::switchyard::HandlerSpec::<Self>::method(#binding, |__this, #event_param| { #body })
            #on #priority #channel #filter #overrides
    })
}

/// Implementation of the `#[handlers]` macro.
pub fn handlers_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[handlers] takes no arguments",
        )
        .to_compile_error()
        .into();
    }

    let mut input = parse_macro_input!(item as ItemImpl);

    if let Some((_, path, _)) = &input.trait_ {
        return syn::Error::new_spanned(path, "#[handlers] goes on an inherent impl block")
            .to_compile_error()
            .into();
    }

    let mut specs = Vec::new();
    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let spec = take_handler_attr(method)
            .and_then(|args| args.map(|args| handler_spec(method, &args)).transpose());
        match spec {
            Ok(Some(spec)) => specs.push(spec),
            Ok(None) => {}
            Err(err) => return err.to_compile_error().into(),
        }
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        #input

        impl #impl_generics #self_ty #where_clause {
            /// Handler table collected from this type's `#[handler]` methods.
            pub fn handler_table() -> ::switchyard::HandlerTable<Self> {
                ::switchyard::HandlerTable::<Self>::new()
                    #(.with(#specs))*
            }
        }
    };

    TokenStream::from(expanded)
}
