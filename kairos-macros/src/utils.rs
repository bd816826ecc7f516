use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`.
/// Commas at the top level are used as separators.
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

/// Converts a slice of tokens into a Rust source string.
///
/// Inserts spaces between consecutive identifiers to avoid accidental
/// token merging (e.g. `mut scope` vs `mutscope`).
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    let mut out = String::new();
    let mut prev_was_ident = false;

    for t in tokens {
        let needs_space = prev_was_ident && matches!(t, TokenTree::Ident(_));

        if needs_space {
            out.push(' ');
        }

        out.push_str(&t.to_string());
        prev_was_ident = matches!(t, TokenTree::Ident(_));
    }

    out
}

/// Parses `key = value` attribute arguments.
///
/// Arguments without a `=` are returned with an empty value.
pub(crate) fn parse_options(attr: TokenStream) -> Vec<(String, String)> {
    split_args(attr)
        .into_iter()
        .map(|arg| {
            let eq = arg
                .iter()
                .position(|t| matches!(t, TokenTree::Punct(p) if p.as_char() == '='));

            match eq {
                Some(i) => (tokens_to_string(&arg[..i]), tokens_to_string(&arg[i + 1..])),
                None => (tokens_to_string(&arg), String::new()),
            }
        })
        .collect()
}

/// Removes the first `async` keyword of a function signature.
pub(crate) fn strip_async(tokens: &mut Vec<TokenTree>) {
    if let Some(pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(pos);
    }
}

/// Takes the parameter list of a function signature, leaving `()` behind.
///
/// Returns the parameters as source text, or `None` if the signature has
/// no parameter list.
pub(crate) fn take_params(tokens: &mut [TokenTree]) -> Option<String> {
    let fn_pos = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "fn"))?;

    let pos = tokens[fn_pos..]
        .iter()
        .position(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Parenthesis))?
        + fn_pos;

    let params = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().into_iter().collect::<Vec<_>>(),
        _ => return None,
    };

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Parenthesis, TokenStream::new()));

    Some(tokens_to_string(&params))
}

/// Returns the position of the function body.
pub(crate) fn body_position(tokens: &[TokenTree]) -> Option<usize> {
    tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
}

/// Turns `message` into a `compile_error!` invocation.
pub(crate) fn compile_error(message: &str) -> TokenStream {
    format!("::core::compile_error!({message:?});")
        .parse()
        .unwrap_or_default()
}
