use proc_macro::{TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`.
/// Commas at the top level are used as separators; commas nested in
/// parentheses, brackets or braces stay inside their group.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(current);
                    current = Vec::new();
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Converts a slice of tokens back into Rust source.
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    tokens.iter().cloned().collect::<TokenStream>().to_string()
}

/// Returns `true` if the tokens at position `i` form a `=>` arrow.
fn is_arrow(tokens: &[TokenTree], i: usize) -> bool {
    if i + 1 >= tokens.len() {
        return false;
    }

    matches!(
        (&tokens[i], &tokens[i + 1]),
        (TokenTree::Punct(p1), TokenTree::Punct(p2))
            if p1.as_char() == '=' && p2.as_char() == '>'
    )
}

/// Parses `race!` branches from a token stream.
///
/// Each branch has the form:
///
/// ```text
/// future_expr => handler_expr
/// ```
///
/// or is a bare `future_expr`, whose value is raced unchanged.
///
/// Empty branches are ignored.
pub(crate) fn parse_race_branches(input: TokenStream) -> Vec<(String, Option<String>)> {
    let mut branches = Vec::new();

    for tokens in split_args(input) {
        let arrow = (0..tokens.len()).find(|&i| is_arrow(&tokens, i));

        let (future, handler) = match arrow {
            Some(i) => (
                tokens_to_string(&tokens[..i]),
                Some(tokens_to_string(&tokens[i + 2..])),
            ),
            None => (tokens_to_string(&tokens), None),
        };

        if future.trim().is_empty() {
            continue;
        }

        let handler = handler.filter(|handler| !handler.trim().is_empty());
        branches.push((future, handler));
    }

    branches
}

/// Options accepted by `#[fibril::main]` and `#[fibril::test]`.
pub(crate) struct RuntimeOptions {
    /// Rejection type of the runtime.
    pub(crate) error: String,

    /// Path of the `Clock` variant to build the runtime with.
    pub(crate) clock: &'static str,
}

/// Parses `error = Type, clock = system|virtual` attribute arguments.
pub(crate) fn parse_runtime_options(attr: TokenStream) -> Result<RuntimeOptions, String> {
    let mut options = RuntimeOptions {
        error: String::from("&'static str"),
        clock: "::fibril::time::Clock::Virtual",
    };

    for arg in split_args(attr) {
        let key = match arg.first() {
            Some(TokenTree::Ident(ident)) => ident.to_string(),
            _ => return Err(String::from("expected `key = value`")),
        };

        let has_eq = matches!(arg.get(1), Some(TokenTree::Punct(p)) if p.as_char() == '=');
        if !has_eq || arg.len() < 3 {
            return Err(format!("expected a value for `{key}`"));
        }

        let value = tokens_to_string(&arg[2..]);

        match key.as_str() {
            "error" => options.error = value,
            "clock" => {
                options.clock = match value.as_str() {
                    "virtual" => "::fibril::time::Clock::Virtual",
                    "system" => "::fibril::time::Clock::System",
                    other => return Err(format!("unknown clock `{other}`")),
                }
            }
            other => return Err(format!("unknown option `{other}`")),
        }
    }

    Ok(options)
}

/// Parses generated source, turning a failure into a `compile_error!`.
pub(crate) fn emit(source: &str, macro_name: &str) -> TokenStream {
    source
        .parse()
        .unwrap_or_else(|err| compile_error(&format!("{macro_name} macro error: {err}")))
}

pub(crate) fn compile_error(message: &str) -> TokenStream {
    format!("compile_error!({message:?});")
        .parse()
        .unwrap_or_default()
}
