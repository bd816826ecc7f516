mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Runs an `async fn main` on a fresh Kairos runtime.
///
/// The function may take a single `Scope` parameter. Accepted arguments:
/// `compute_threads = n`, `io_threads = n`.
///
/// ```rust,ignore
/// #[kairos::main(compute_threads = 4)]
/// async fn main(scope: kairos::Scope) {
///     scope.launch(async { println!("hello") });
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item).unwrap_or_else(|message| utils::compile_error(&message))
}

/// Runs an `async fn` test on a fresh Kairos runtime.
///
/// Accepts the same arguments as [`macro@main`]. A task failure fails the
/// test.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let expanded = match expand(attr, item) {
        Ok(expanded) => expanded,
        Err(message) => return utils::compile_error(&message),
    };

    let mut result: Vec<TokenTree> = "#[::core::prelude::v1::test]"
        .parse::<TokenStream>()
        .unwrap_or_default()
        .into_iter()
        .collect();
    result.extend(expanded);

    result.into_iter().collect()
}

/// Rewrites the body of an `async fn` into a blocking runtime call.
fn expand(attr: TokenStream, item: TokenStream) -> Result<TokenStream, String> {
    let mut builder = String::from("::kairos::RuntimeBuilder::new()");

    for (key, value) in utils::parse_options(attr) {
        match key.as_str() {
            "compute_threads" | "io_threads" => {
                let n = value
                    .parse::<usize>()
                    .map_err(|_| format!("`{key}` expects a positive integer, got `{value}`"))?;
                builder.push_str(&format!(".{key}({n})"));
            }
            _ => return Err(format!("unknown kairos option `{key}`")),
        }
    }

    builder.push_str(".build()");

    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    utils::strip_async(&mut tokens);

    let params = utils::take_params(&mut tokens)
        .ok_or_else(|| "expected a function".to_owned())?;
    let params = if params.trim().is_empty() {
        "_".to_owned()
    } else {
        params
    };

    let pos = utils::body_position(&tokens).ok_or_else(|| "expected a function body".to_owned())?;

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => return Err("expected a function body".to_owned()),
    };

    let new_block = format!(
        "{{
            let runtime = {builder};
            match runtime.run_blocking(move |{params}| async move {{ {block} }}) {{
                ::core::result::Result::Ok(value) => value,
                ::core::result::Result::Err(err) => ::core::panic!(\"kairos runtime error: {{}}\", err),
            }}
        }}"
    );

    let stream = new_block
        .parse::<TokenStream>()
        .map_err(|err| format!("kairos macro error: {err}"))?;

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));

    Ok(tokens.into_iter().collect())
}
