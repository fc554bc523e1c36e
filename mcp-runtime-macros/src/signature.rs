//! Collects a handler descriptor from the annotated function's signature
//! and the attribute arguments.

use proc_macro2::TokenStream;
use syn::Expr;
use syn::ExprLit;
use syn::FnArg;
use syn::Ident;
use syn::ItemFn;
use syn::Lit;
use syn::Meta;
use syn::Pat;
use syn::ReturnType;
use syn::Token;
use syn::Type;
use syn::parse::Parse;
use syn::parse::ParseStream;
use syn::parse::Parser;
use syn::punctuated::Punctuated;

/// Parsed `#[prompt(...)]` / `#[tool(...)]` arguments.
pub(crate) struct MacroArgs {
    pub name: Option<String>,
    pub description: Option<String>,
    pub defaults: Vec<(Ident, Expr)>,
}

struct DefaultEntry {
    ident: Ident,
    expr: Expr,
}

impl Parse for DefaultEntry {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let ident: Ident = input.parse()?;
        input.parse::<Token![=]>()?;
        let expr: Expr = input.parse()?;
        Ok(Self { ident, expr })
    }
}

impl MacroArgs {
    pub fn parse(attr: TokenStream) -> syn::Result<Self> {
        let mut args = Self {
            name: None,
            description: None,
            defaults: Vec::new(),
        };
        if attr.is_empty() {
            return Ok(args);
        }
        let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(attr)?;
        for meta in metas {
            match &meta {
                Meta::NameValue(nv) if nv.path.is_ident("name") => {
                    args.name = Some(string_literal(&nv.value)?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("description") => {
                    args.description = Some(string_literal(&nv.value)?);
                }
                Meta::List(list) if list.path.is_ident("default") => {
                    let entries =
                        list.parse_args_with(Punctuated::<DefaultEntry, Token![,]>::parse_terminated)?;
                    args.defaults
                        .extend(entries.into_iter().map(|e| (e.ident, e.expr)));
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        &meta,
                        "expected `name = \"...\"`, `description = \"...\"` or `default(param = expr, ...)`",
                    ));
                }
            }
        }
        Ok(args)
    }
}

fn string_literal(expr: &Expr) -> syn::Result<String> {
    if let Expr::Lit(ExprLit {
        lit: Lit::Str(s), ..
    }) = expr
    {
        Ok(s.value())
    } else {
        Err(syn::Error::new_spanned(expr, "expected a string literal"))
    }
}

/// How an absent argument key is handled at the call site.
pub(crate) enum ParamKind {
    /// Key must be present; the value is forwarded as-is.
    Required,
    /// `Option<T>` parameter; an absent key becomes `None`.
    Nullable(Box<Type>),
    /// Plain parameter with an attribute-supplied default expression.
    Defaulted(Expr),
}

pub(crate) struct ParamSpec {
    pub ident: Ident,
    pub name: String,
    pub ty: Type,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub fn is_required(&self) -> bool {
        matches!(self.kind, ParamKind::Required)
    }

    /// Type of the envelope field: the declared type for required
    /// parameters, `Option<inner>` otherwise.
    pub fn envelope_type(&self) -> TokenStream {
        match &self.kind {
            ParamKind::Required => {
                let ty = &self.ty;
                quote::quote!(#ty)
            }
            ParamKind::Nullable(inner) => quote::quote!(::std::option::Option<#inner>),
            ParamKind::Defaulted(_) => {
                let ty = &self.ty;
                quote::quote!(::std::option::Option<#ty>)
            }
        }
    }
}

pub(crate) struct FnDescriptor {
    pub fn_ident: Ident,
    /// Name published to the registry; defaults to the function identifier.
    pub name: String,
    pub description: Option<String>,
    pub is_async: bool,
    /// Function returns `Result<_, E>` rather than the bare result type.
    pub fallible: bool,
    pub params: Vec<ParamSpec>,
}

impl FnDescriptor {
    pub fn from_fn(func: &ItemFn, args: MacroArgs) -> syn::Result<Self> {
        let sig = &func.sig;
        if !sig.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &sig.generics,
                "handler functions cannot be generic",
            ));
        }
        if sig.variadic.is_some() {
            return Err(syn::Error::new_spanned(
                &sig.variadic,
                "handler functions cannot be variadic",
            ));
        }

        let mut defaults: Vec<(Ident, Expr)> = args.defaults;
        let mut params = Vec::new();
        for input in &sig.inputs {
            let typed = match input {
                FnArg::Receiver(receiver) => {
                    return Err(syn::Error::new_spanned(
                        receiver,
                        "handler functions must be free functions",
                    ));
                }
                FnArg::Typed(typed) => typed,
            };
            let ident = match typed.pat.as_ref() {
                Pat::Ident(pat) => pat.ident.clone(),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "handler parameters must be plain identifiers",
                    ));
                }
            };

            let default = defaults
                .iter()
                .position(|(name, _)| *name == ident)
                .map(|index| defaults.swap_remove(index).1);
            let kind = match (option_inner(&typed.ty), default) {
                (Some(_), Some(expr)) => {
                    return Err(syn::Error::new_spanned(
                        expr,
                        format!("parameter `{ident}` is already optional; remove the default"),
                    ));
                }
                (Some(inner), None) => ParamKind::Nullable(Box::new(inner.clone())),
                (None, Some(expr)) => ParamKind::Defaulted(expr),
                (None, None) => ParamKind::Required,
            };

            params.push(ParamSpec {
                name: ident.to_string(),
                ident,
                ty: (*typed.ty).clone(),
                kind,
            });
        }

        if let Some((ident, _)) = defaults.first() {
            return Err(syn::Error::new_spanned(
                ident,
                format!("default refers to unknown parameter `{ident}`"),
            ));
        }

        // The dispatcher emits one match arm per present/absent combination
        // of the optional parameters; past this bound the expansion no
        // longer compiles in reasonable time.
        let optional_count = params.iter().filter(|p| !p.is_required()).count();
        if optional_count > 16 {
            return Err(syn::Error::new_spanned(
                &sig.inputs,
                format!("{optional_count} optional parameters would expand to 2^{optional_count} dispatch arms; at most 16 are supported"),
            ));
        }

        let fallible = match &sig.output {
            ReturnType::Default => {
                return Err(syn::Error::new_spanned(
                    sig,
                    "handler functions must return a prompt or tool result",
                ));
            }
            ReturnType::Type(_, ty) => is_result(ty),
        };

        Ok(Self {
            fn_ident: sig.ident.clone(),
            name: args.name.unwrap_or_else(|| sig.ident.to_string()),
            description: args.description,
            is_async: sig.asyncness.is_some(),
            fallible,
            params,
        })
    }

    pub fn required_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn known_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(syn::GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn is_result(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|segment| segment.ident == "Result")
}
