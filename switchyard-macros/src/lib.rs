//! Procedural macros for Switchyard.
//!
//! - [`handlers`] collects `#[handler]` methods of an `impl` block into a
//!   handler table.
//! - [`handler`] marks a method; it is only meaningful inside `#[handlers]`.

use proc_macro::TokenStream;

mod handler;

/// Collect the `#[handler(..)]` methods of an inherent `impl` block.
///
/// Generates `pub fn handler_table() -> HandlerTable<Self>`, to be returned
/// from `Component::handlers`.
///
/// Handler methods take `&self` and optionally `&mut Event`, may be `async`,
/// and return anything implementing `IntoReply`. The binding name is the
/// method name; without explicit event names the handler listens for the
/// event of that name.
///
/// # Example
///
/// ```rust,ignore
/// struct Root;
///
/// #[handlers]
/// impl Root {
///     #[handler("request", priority = 1.0)]
///     async fn index(&self, _event: &mut Event) -> &'static str {
///         "Hello World!"
///     }
/// }
///
/// impl Component for Root {
///     fn handlers() -> HandlerTable<Self> {
///         Self::handler_table()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn handlers(attr: TokenStream, item: TokenStream) -> TokenStream {
    handler::handlers_impl(attr, item)
}

/// Mark a method as an event handler.
///
/// Accepts event names as string literals followed by `priority = <number>`,
/// `channel = "<name>"`, `filter` and `override`.
#[proc_macro_attribute]
pub fn handler(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut out: TokenStream = syn::Error::new(
        proc_macro2::Span::call_site(),
        "#[handler] must be used on a method inside a #[handlers] impl block",
    )
    .to_compile_error()
    .into();
    out.extend(item);
    out
}
