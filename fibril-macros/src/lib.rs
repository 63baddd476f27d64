//! Procedural macros for the `fibril` scheduler.
//!
//! These macros are re-exported by `fibril` and are not meant to be used
//! through this crate directly.

mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Combines futures of different types into a future of a tuple.
///
/// `all!(a, b, c)` resolves with `(a, b, c)` once every future resolved, and
/// rejects with the first rejection. All futures must share the same
/// rejection type.
///
/// # Examples
///
/// ```rust,ignore
/// let pair = fibril::all!(cx.resolved(1), cx.resolved("one"));
/// assert_eq!(pair.peek(), Some(Ok((1, "one"))));
/// ```
#[proc_macro]
pub fn all(input: TokenStream) -> TokenStream {
    let args = utils::split_args(input);
    let count = args.len();

    if count == 0 {
        return utils::compile_error("all! needs at least one future");
    }

    let mut output = String::from("{\n");

    for (i, expr_tokens) in args.iter().enumerate() {
        let idx = i + 1;
        let expr = utils::tokens_to_string(expr_tokens);
        output.push_str(&format!("let __f{idx} = &({expr});\n"));
    }

    let mut zipped = String::from("__f1");
    let mut pattern = String::from("__v1");

    for i in 2..=count {
        zipped = format!("{zipped}.zip(__f{i})");
        pattern = format!("({pattern}, __v{i})");
    }

    let tuple = (1..=count)
        .map(|i| format!("__v{i},"))
        .collect::<String>();

    output.push_str(&format!("{zipped}.__project(|{pattern}| ({tuple}))\n"));
    output.push_str("}\n");

    utils::emit(&output, "all")
}

/// Races futures of different types, mapping each winner through a handler.
///
/// Each branch is either `future => handler` or a bare `future`. Handlers
/// must all return the same type; the result settles as soon as any
/// branch settles, resolved or rejected.
///
/// # Examples
///
/// ```rust,ignore
/// let winner = fibril::race!(
///     fast => |n: i32| n.to_string(),
///     slow => |s: &str| s.to_owned(),
/// );
/// ```
#[proc_macro]
pub fn race(input: TokenStream) -> TokenStream {
    let branches = utils::parse_race_branches(input);

    if branches.is_empty() {
        return utils::compile_error("race! needs at least one future");
    }

    let mut out = String::from("{\n");

    for (i, (future, handler)) in branches.iter().enumerate() {
        let idx = i + 1;

        match handler {
            Some(handler) => out.push_str(&format!(
                "let __f{idx} = ({future}).__project({handler});\n"
            )),
            None => out.push_str(&format!(
                "let __f{idx} = ::core::clone::Clone::clone(&({future}));\n"
            )),
        }
    }

    let members = (1..=branches.len())
        .map(|i| format!("__f{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    out.push_str("let __scope = ::core::clone::Clone::clone(__f1.scope());\n");
    out.push_str(&format!("__scope.race([{members}])\n"));
    out.push_str("}\n");

    utils::emit(&out, "race")
}

/// Runs `main` with a `runtime` binding in scope.
///
/// The attribute builds a `fibril::Runtime` named `runtime`, runs the
/// function body, then fires every timer still pending before returning.
///
/// Options:
/// - `error = Type`: rejection type of the runtime (default `&'static str`),
/// - `clock = virtual | system`: clock of the timer queue (default
///   `virtual`).
///
/// # Examples
///
/// ```rust,ignore
/// #[fibril::main(clock = system)]
/// fn main() {
///     let value = runtime.block_on(|cx| cx.resolved(1));
///     assert_eq!(value, Ok(1));
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    match wrap_body(attr, item) {
        Ok(tokens) => tokens,
        Err(message) => utils::compile_error(&format!("fibril::main: {message}")),
    }
}

/// Like [`main`](macro@main), for `#[test]` functions.
///
/// # Examples
///
/// ```rust,ignore
/// #[fibril::test]
/// fn resolves() {
///     assert_eq!(runtime.block_on(|cx| cx.resolved(1)), Ok(1));
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let tokens = match wrap_body(attr, item) {
        Ok(tokens) => tokens,
        Err(message) => return utils::compile_error(&format!("fibril::test: {message}")),
    };

    let test_attr: TokenStream = "#[test]".parse().unwrap_or_default();
    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(tokens);

    result.into_iter().collect()
}

/// Replaces the function body with one that builds a runtime first and
/// drains its timers last.
fn wrap_body(attr: TokenStream, item: TokenStream) -> Result<TokenStream, String> {
    let options = utils::parse_runtime_options(attr)?;
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    if tokens
        .iter()
        .any(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        return Err(String::from("the function must not be `async`"));
    }

    let pos = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
        .ok_or_else(|| String::from("expected a function body"))?;

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => return Err(String::from("expected a function body")),
    };

    let new_block = format!(
        "{{
            let runtime: ::fibril::Runtime<{error}> = ::fibril::RuntimeBuilder::new()
                .clock({clock})
                .build();
            let __out = {{ {block} }};
            runtime.run();
            __out
        }}",
        error = options.error,
        clock = options.clock,
    );

    let stream = new_block
        .parse()
        .map_err(|err| format!("invalid function body: {err}"))?;

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));

    Ok(tokens.into_iter().collect())
}
