use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, ImplItem, ImplItemFn, ItemImpl,
    ReturnType, Stmt, Variant, Visibility,
};

/// Turns an error enum into a flat UniFFI error with a catch-all variant.
///
/// The macro:
/// 1. Replaces any `derive`/`uniffi` attributes with
///    `#[derive(Debug, thiserror::Error, uniffi::Error)]` and `#[uniffi(flat_error)]`
/// 2. Appends a `Generic { message: String }` variant unless one is declared
/// 3. Implements `From<anyhow::Error>`, flattening the cause chain into `message`
/// 4. Adds `from_anyhow_result` for converting whole `anyhow::Result`s
///
/// ```rust,ignore
/// #[stowage_error]
/// pub enum StoreError {
///     #[error("collection {name} is unavailable")]
///     Unavailable { name: String },
/// }
/// ```
#[proc_macro_attribute]
pub fn stowage_error(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(&input, "stowage_error can only be applied to enums")
            .to_compile_error()
            .into();
    };

    let enum_name = &input.ident;
    let visibility = &input.vis;
    let generics = &input.generics;
    let attrs: Vec<&Attribute> = input
        .attrs
        .iter()
        .filter(|attr| !attr.path().is_ident("derive") && !attr.path().is_ident("uniffi"))
        .collect();

    let mut variants = data_enum.variants.clone();
    if !variants.iter().any(|variant| variant.ident == "Generic") {
        variants.push(generic_variant());
    }

    quote! {
        #[derive(Debug, thiserror::Error, uniffi::Error)]
        #[uniffi(flat_error)]
        #(#attrs)*
        #visibility enum #enum_name #generics {
            #variants
        }

        impl #generics From<anyhow::Error> for #enum_name #generics {
            fn from(err: anyhow::Error) -> Self {
                Self::Generic {
                    message: Self::flatten_anyhow(&err),
                }
            }
        }

        impl #generics #enum_name #generics {
            /// Converts an `anyhow::Result` into a result carrying this error type.
            ///
            /// # Errors
            /// Returns the `Generic` variant when `result` is an error.
            pub fn from_anyhow_result<T>(result: anyhow::Result<T>) -> Result<T, Self> {
                result.map_err(Self::from)
            }

            fn flatten_anyhow(err: &anyhow::Error) -> String {
                let mut message = err.to_string();
                let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
                if !causes.is_empty() {
                    message.push_str(" (caused by: ");
                    message.push_str(&causes.join(" -> "));
                    message.push(')');
                }
                message
            }
        }
    }
    .into()
}

fn generic_variant() -> Variant {
    syn::parse_quote! {
        /// Catch-all for errors raised through `anyhow`.
        #[error("Generic error: {message}")]
        Generic {
            /// Message including the flattened cause chain.
            message: String
        }
    }
}

/// Wraps `#[uniffi::export]` and scopes logging to the exported type.
///
/// Every `pub fn` in the block runs inside a `LogContext` named after the type, so
/// `stowage::info!` and friends are prefixed with e.g. `[MigrationService]`. Sync methods
/// hold a scope guard; async methods are wrapped in `in_log_context`, which re-enters the
/// context on each poll.
/// `async_runtime = "tokio"` is appended when any public method is async.
///
/// ```rust,ignore
/// #[stowage_export]
/// impl MigrationService {
///     pub async fn migrate_all_data(&self) -> Result<MigrationResult, MigrationError> {
///         // [MigrationService] prefix is active here
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn stowage_export(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut input_impl = parse_macro_input!(input as ItemImpl);
    let type_name = exported_type_name(&input_impl);
    let needs_tokio = has_public_async_fn(&input_impl.items);

    for item in &mut input_impl.items {
        if let ImplItem::Fn(method) = item {
            if matches!(method.vis, Visibility::Public(_)) {
                inject_log_context(method, &type_name);
            }
        }
    }

    let mut args = proc_macro2::TokenStream::from(args);
    if needs_tokio {
        args = if args.is_empty() {
            quote! { async_runtime = "tokio" }
        } else {
            quote! { #args, async_runtime = "tokio" }
        };
    }

    quote! {
        #[uniffi::export(#args)]
        #input_impl
    }
    .into()
}

fn exported_type_name(input_impl: &ItemImpl) -> String {
    match &*input_impl.self_ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map_or_else(|| "Unknown".to_string(), |segment| segment.ident.to_string()),
        _ => "Unknown".to_string(),
    }
}

fn has_public_async_fn(items: &[ImplItem]) -> bool {
    items.iter().any(|item| {
        matches!(
            item,
            ImplItem::Fn(method)
                if matches!(method.vis, Visibility::Public(_)) && method.sig.asyncness.is_some()
        )
    })
}

/// Sync methods get a scope guard as their first statement. Async bodies are wrapped in
/// `in_log_context` instead, since a guard held across `.await` could be dropped on
/// another thread.
fn inject_log_context(method: &mut ImplItemFn, type_name: &str) {
    if method.sig.asyncness.is_some() {
        let output = match &method.sig.output {
            ReturnType::Default => quote! { () },
            ReturnType::Type(_, ty) => quote! { #ty },
        };
        let body = &method.block;
        method.block = syn::parse_quote! {
            {
                crate::primitives::logger::in_log_context::<_, #output>(#type_name, async move #body)
                    .await
            }
        };
        return;
    }

    let stmt: Stmt = syn::parse_quote! {
        let _stowage_log_ctx = crate::primitives::logger::LogContext::new(#type_name);
    };
    method.block.stmts.insert(0, stmt);
}
