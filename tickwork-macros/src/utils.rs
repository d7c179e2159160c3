use proc_macro::{TokenStream, TokenTree};

/// Options accepted by `#[tickwork::test(...)]`.
pub(crate) struct TestArgs {
    /// Seconds the manual clock advances per tick.
    pub(crate) tick: String,
    pub(crate) worker_threads: Option<String>,
    pub(crate) threading: Option<String>,
}

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
/// Spaces are inserted between consecutive identifiers so they do not
/// merge (e.g. `foo bar` vs `foobar`).
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

/// Parses `key = value` pairs.
///
/// Unknown keys and missing values are reported as an error message.
pub(crate) fn parse_test_args(input: TokenStream) -> Result<TestArgs, String> {
    let mut args = TestArgs {
        tick: "1.0 / 60.0".to_owned(),
        worker_threads: None,
        threading: None,
    };

    for arg in split_args(input) {
        let (key, value) = match arg.as_slice() {
            [TokenTree::Ident(key), TokenTree::Punct(eq), value @ ..]
                if eq.as_char() == '=' && !value.is_empty() =>
            {
                (key.to_string(), tokens_to_string(value))
            }
            _ => return Err(format!("expected `key = value`, found `{}`", tokens_to_string(&arg))),
        };

        match key.as_str() {
            "tick" => args.tick = value,
            "worker_threads" => args.worker_threads = Some(value),
            "threading" => args.threading = Some(value),
            other => return Err(format!("unknown option `{other}`")),
        }
    }

    Ok(args)
}
