use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, spanned::Spanned, BinOp, Block, Expr, ExprLit, Ident, Pat, Stmt, UnOp,
};

/// Rewrite a block of `let` bindings with plain arithmetic into `scalargrad::Value` nodes.
///
/// ```ignore
/// scalargrad! {{
///     let x = 3.;
///     let y = x * x + x;
/// }}
/// y.backward();
/// ```
///
/// Literal bindings become leaves labeled after the binding; literals inside
/// expressions become unlabeled leaves. Integer literals are converted to `f64`.
/// Supports `+ - * /`, unary `-`, parentheses and `.relu()`.
#[proc_macro]
pub fn scalargrad(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as Block);

    let mut objs = vec![];

    for stmt in &input.stmts {
        traverse_stmt(stmt, &mut objs);
    }

    let expanded = quote! {
        #(#objs)*
    };

    TokenStream::from(expanded)
}

fn traverse_stmt(input: &Stmt, terms: &mut Vec<TokenStream2>) {
    match input {
        Stmt::Local(local) => {
            if let (Pat::Ident(id), Some(init)) = (&local.pat, &local.init) {
                let name = id.ident.clone();
                let ex = &init.expr;
                let ts = match ex as &Expr {
                    Expr::Lit(lit) => quote! {
                        let #name = ::scalargrad::Value::with_label(stringify!(#name), #lit as f64);
                    },
                    Expr::Path(path) => quote! {
                        let #name = #path.clone();
                    },
                    _ => {
                        if let Some(res) = traverse_expr(ex, terms) {
                            quote! {
                                let #name = #res;
                            }
                        } else {
                            let msg = format!("unsupported expression for `{name}`");
                            quote::quote_spanned! { ex.span() =>
                                compile_error!(#msg);
                            }
                        }
                    }
                };
                terms.push(ts);
            }
        }
        Stmt::Expr(ex, _) => {
            traverse_expr(ex, terms);
        }
        _ => (),
    }
}

fn var_name(terms: &[TokenStream2]) -> String {
    format!("_a{}", terms.len())
}

fn format_term(ex: &ExprLit, terms: &mut Vec<TokenStream2>) -> Ident {
    let name = Ident::new(&var_name(terms), ex.span());
    let ts = quote! {
        let #name = ::scalargrad::Value::new(#ex as f64);
    };
    terms.push(ts);
    name
}

fn push_term(ts: TokenStream2, span: proc_macro2::Span, terms: &mut Vec<TokenStream2>) -> Ident {
    let name = Ident::new(&var_name(terms), span);
    terms.push(quote! {
        let #name = #ts;
    });
    name
}

fn traverse_expr(input: &Expr, terms: &mut Vec<TokenStream2>) -> Option<Ident> {
    match input {
        Expr::Binary(ex) => {
            let lhs = traverse_expr(&ex.left, terms)?;
            let rhs = traverse_expr(&ex.right, terms)?;
            let binop = match ex.op {
                BinOp::Add(_) => quote! { &#lhs + &#rhs },
                BinOp::Sub(_) => quote! { &#lhs - &#rhs },
                BinOp::Mul(_) => quote! { &#lhs * &#rhs },
                BinOp::Div(_) => quote! { &#lhs / &#rhs },
                _ => return None,
            };
            Some(push_term(binop, ex.span(), terms))
        }
        Expr::Unary(ex) => {
            let term = traverse_expr(&ex.expr, terms)?;
            match ex.op {
                UnOp::Neg(_) => Some(push_term(quote! { -&#term }, ex.span(), terms)),
                _ => None,
            }
        }
        Expr::MethodCall(call) if call.method == "relu" && call.args.is_empty() => {
            let term = traverse_expr(&call.receiver, terms)?;
            Some(push_term(quote! { #term.relu() }, call.span(), terms))
        }
        Expr::Paren(ex) => traverse_expr(&ex.expr, terms),
        Expr::Lit(lit) => Some(format_term(lit, terms)),
        Expr::Path(path) => path.path.segments.last().map(|seg| seg.ident.clone()),
        _ => None,
    }
}
