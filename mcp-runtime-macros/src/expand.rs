//! Emission of the parameter envelope, the handler dispatcher and the
//! registry submission.

use proc_macro2::TokenStream;
use quote::format_ident;
use quote::quote;
use syn::Ident;
use syn::ItemFn;

use crate::signature::FnDescriptor;
use crate::signature::MacroArgs;
use crate::signature::ParamKind;
use crate::signature::ParamSpec;

#[derive(Clone, Copy)]
pub(crate) enum HandlerKind {
    Prompt,
    Tool,
}

pub(crate) fn expand(
    kind: HandlerKind,
    attr: TokenStream,
    item: TokenStream,
) -> syn::Result<TokenStream> {
    let args = MacroArgs::parse(attr)?;
    let func: ItemFn = syn::parse2(item)?;
    let descriptor = FnDescriptor::from_fn(&func, args)?;

    let vis = &func.vis;
    let pascal = pascal_case(&descriptor.fn_ident.to_string());
    let envelope_ident = format_ident!("{pascal}Args");
    let handler_ident = match kind {
        HandlerKind::Prompt => format_ident!("{pascal}Prompt"),
        HandlerKind::Tool => format_ident!("{pascal}Tool"),
    };

    let envelope = emit_envelope(kind, vis, &envelope_ident, &descriptor);
    let handler = emit_handler(kind, vis, &handler_ident, &envelope_ident, &descriptor);
    let registration = emit_registration(kind, &handler_ident);

    Ok(quote! {
        #func
        #envelope
        #handler
        #registration
    })
}

/// Serializable record of the function's parameters. Optional parameters
/// become `Option` fields defaulting to absent, so incoming objects with
/// missing optional keys deserialize cleanly.
fn emit_envelope(
    kind: HandlerKind,
    vis: &syn::Visibility,
    envelope_ident: &Ident,
    descriptor: &FnDescriptor,
) -> TokenStream {
    let fields = descriptor.params.iter().map(|param| {
        let ident = &param.ident;
        let ty = param.envelope_type();
        if param.is_required() {
            quote!(#ident: #ty)
        } else {
            quote! {
                #[serde(default)]
                #ident: #ty
            }
        }
    });

    // Prompts only publish an argument list; tools also publish a JSON
    // schema derived from this envelope.
    let derives = match kind {
        HandlerKind::Prompt => quote!(#[derive(::mcp_runtime::serde::Deserialize)]),
        HandlerKind::Tool => quote! {
            #[derive(::mcp_runtime::serde::Deserialize, ::mcp_runtime::schemars::JsonSchema)]
            #[schemars(crate = "::mcp_runtime::schemars")]
        },
    };

    quote! {
        #derives
        #[serde(crate = "::mcp_runtime::serde")]
        #[doc(hidden)]
        #vis struct #envelope_ident {
            #(#fields,)*
        }
    }
}

fn emit_handler(
    kind: HandlerKind,
    vis: &syn::Visibility,
    handler_ident: &Ident,
    envelope_ident: &Ident,
    descriptor: &FnDescriptor,
) -> TokenStream {
    let name = &descriptor.name;
    let known = descriptor.known_names();
    let required = descriptor.required_names();
    let dispatch = emit_dispatch(envelope_ident, descriptor);

    let validation = quote! {
        const KNOWN: &[&str] = &[#(#known),*];
        const REQUIRED: &[&str] = &[#(#required),*];
        for key in arguments.keys() {
            if !KNOWN.contains(&key.as_str()) {
                return ::std::result::Result::Err(
                    ::mcp_runtime::HandlerError::UnknownArgument(key.clone()),
                );
            }
        }
        for required in REQUIRED {
            if !arguments.contains_key(*required) {
                return ::std::result::Result::Err(
                    ::mcp_runtime::HandlerError::MissingRequiredArgument(
                        (*required).to_string(),
                    ),
                );
            }
        }
        let envelope: #envelope_ident = ::mcp_runtime::serde_json::from_value(
            ::mcp_runtime::serde_json::Value::Object(arguments),
        )
        .map_err(|err| ::mcp_runtime::HandlerError::InvalidParams(err.to_string()))?;
    };

    match kind {
        HandlerKind::Prompt => {
            let description = option_tokens(descriptor.description.as_deref());
            let arguments = descriptor.params.iter().map(|param| {
                let arg_name = &param.name;
                let required = param.is_required();
                quote! {
                    ::mcp_runtime::mcp_types::PromptArgument {
                        name: #arg_name.to_string(),
                        description: ::std::option::Option::None,
                        required: ::std::option::Option::Some(#required),
                    }
                }
            });
            quote! {
                #[doc(hidden)]
                #vis struct #handler_ident;

                #[::mcp_runtime::async_trait::async_trait]
                impl ::mcp_runtime::PromptHandler for #handler_ident {
                    fn name(&self) -> &'static str {
                        #name
                    }

                    fn descriptor(&self) -> ::mcp_runtime::mcp_types::Prompt {
                        ::mcp_runtime::mcp_types::Prompt {
                            name: #name.to_string(),
                            description: #description,
                            arguments: ::std::option::Option::Some(vec![#(#arguments),*]),
                        }
                    }

                    async fn call(
                        &self,
                        arguments: ::mcp_runtime::mcp_types::JsonObject,
                    ) -> ::std::result::Result<
                        ::mcp_runtime::mcp_types::GetPromptResult,
                        ::mcp_runtime::HandlerError,
                    > {
                        #validation
                        #dispatch
                    }
                }
            }
        }
        HandlerKind::Tool => {
            let description = option_tokens(descriptor.description.as_deref());
            quote! {
                #[doc(hidden)]
                #vis struct #handler_ident;

                #[::mcp_runtime::async_trait::async_trait]
                impl ::mcp_runtime::ToolHandler for #handler_ident {
                    fn name(&self) -> &'static str {
                        #name
                    }

                    fn descriptor(&self) -> ::mcp_runtime::mcp_types::Tool {
                        ::mcp_runtime::mcp_types::Tool {
                            name: #name.to_string(),
                            input_schema: ::mcp_runtime::tool_input_schema::<#envelope_ident>(),
                            description: #description,
                            annotations: ::std::option::Option::None,
                        }
                    }

                    async fn call(
                        &self,
                        arguments: ::mcp_runtime::mcp_types::JsonObject,
                    ) -> ::std::result::Result<
                        ::mcp_runtime::mcp_types::CallToolResult,
                        ::mcp_runtime::HandlerError,
                    > {
                        #validation
                        #dispatch
                    }
                }
            }
        }
    }
}

/// The presence-dispatch tree: one `match` over the tuple of optional
/// fields with an arm per present/absent combination, so every leaf is a
/// direct call that forwards present values and substitutes `None` or the
/// declared default for absent ones. Parameter order always follows the
/// source declaration.
fn emit_dispatch(envelope_ident: &Ident, descriptor: &FnDescriptor) -> TokenStream {
    let all_idents: Vec<&Ident> = descriptor.params.iter().map(|p| &p.ident).collect();
    let destructure = quote! {
        let #envelope_ident { #(#all_idents),* } = envelope;
    };

    let optional: Vec<&ParamSpec> = descriptor
        .params
        .iter()
        .filter(|p| !p.is_required())
        .collect();

    if optional.is_empty() {
        let call = emit_call(descriptor, &[]);
        return quote! {
            #destructure
            #call
        };
    }

    let scrutinee_idents: Vec<&Ident> = optional.iter().map(|p| &p.ident).collect();
    let arm_count: u32 = 1 << optional.len();
    let arms = (0..arm_count).map(|mask| {
        let present: Vec<bool> = (0..optional.len()).map(|i| mask & (1 << i) != 0).collect();
        let patterns = optional.iter().zip(&present).map(|(param, present)| {
            let ident = &param.ident;
            if *present {
                quote!(::std::option::Option::Some(#ident))
            } else {
                quote!(::std::option::Option::None)
            }
        });
        let call = emit_call(descriptor, &present);
        quote! {
            ( #(#patterns,)* ) => { #call }
        }
    });

    quote! {
        #destructure
        match ( #(#scrutinee_idents,)* ) {
            #(#arms)*
        }
    }
}

/// One leaf of the dispatch tree. `present` holds one flag per optional
/// parameter, in declaration order.
fn emit_call(descriptor: &FnDescriptor, present: &[bool]) -> TokenStream {
    let fn_ident = &descriptor.fn_ident;
    let mut optional_index = 0;
    let call_args = descriptor.params.iter().map(|param| {
        let ident = &param.ident;
        match &param.kind {
            ParamKind::Required => quote!(#ident),
            ParamKind::Nullable(_) => {
                let is_present = present[optional_index];
                optional_index += 1;
                if is_present {
                    quote!(::std::option::Option::Some(#ident))
                } else {
                    quote!(::std::option::Option::None)
                }
            }
            ParamKind::Defaulted(default) => {
                let is_present = present[optional_index];
                optional_index += 1;
                if is_present {
                    quote!(#ident)
                } else {
                    quote!(#default)
                }
            }
        }
    });

    let mut invoke = quote!(#fn_ident(#(#call_args),*));
    if descriptor.is_async {
        invoke = quote!(#invoke.await);
    }
    if descriptor.fallible {
        quote! {
            #invoke.map_err(|err| ::mcp_runtime::HandlerError::Internal(err.to_string()))
        }
    } else {
        quote!(::std::result::Result::Ok(#invoke))
    }
}

fn emit_registration(kind: HandlerKind, handler_ident: &Ident) -> TokenStream {
    match kind {
        HandlerKind::Prompt => quote! {
            ::mcp_runtime::inventory::submit! {
                ::mcp_runtime::PromptRegistration::new(|| ::std::boxed::Box::new(#handler_ident))
            }
        },
        HandlerKind::Tool => quote! {
            ::mcp_runtime::inventory::submit! {
                ::mcp_runtime::ToolRegistration::new(|| ::std::boxed::Box::new(#handler_ident))
            }
        },
    }
}

fn option_tokens(value: Option<&str>) -> TokenStream {
    match value {
        Some(value) => quote!(::std::option::Option::Some(#value.to_string())),
        None => quote!(::std::option::Option::None),
    }
}

fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
