mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Runs an `async` test body as a coroutine on a fresh scheduler.
///
/// The scheduler reads a `ManualClock` that advances by `tick` seconds
/// (default `1.0 / 60.0`) every tick, so timed waits finish after a
/// deterministic number of ticks. The body may use `?` on `Fault`s; the
/// test fails if it returns one, or if any coroutine faults meanwhile.
///
/// Options: `tick = <secs>`, `worker_threads = <n>`, `threading = <bool>`.
///
/// ```rust,ignore
/// #[tickwork::test(tick = 0.5)]
/// async fn waits_two_ticks() {
///     tickwork::wait::seconds(1.0).await;
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match utils::parse_test_args(attr) {
        Ok(args) => args,
        Err(msg) => return compile_error(&format!("tickwork::test: {msg}")),
    };

    let mut tokens = item.into_iter().collect::<Vec<_>>();

    if let Some(pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(pos);
    }

    let block_pos = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace));

    let Some(pos) = block_pos else {
        return compile_error("tickwork::test: expected a function body");
    };

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let mut builder = format!(
        "::tickwork::SchedulerBuilder::new().clock(::tickwork::ManualClock::with_step({}))",
        args.tick
    );

    if let Some(n) = &args.worker_threads {
        builder.push_str(&format!(".worker_threads({n})"));
    }

    if let Some(enabled) = &args.threading {
        builder.push_str(&format!(".threading({enabled})"));
    }

    let new_block = format!(
        "{{
        let mut scheduler = {builder}.build();
        let result = scheduler.block_on(async move {{
            {{ {block} }};
            ::core::result::Result::Ok::<(), ::tickwork::Fault>(())
        }});
        if let ::core::result::Result::Err(fault) = result {{
            panic!(\"test coroutine failed: {{fault}}\");
        }}
    }}"
    );

    let body = match new_block.parse::<TokenStream>() {
        Ok(body) => body,
        Err(err) => return compile_error(&format!("tickwork::test: {err}")),
    };

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, body));

    let mut result: Vec<TokenTree> = "#[test]".parse::<TokenStream>().into_iter().flatten().collect();
    result.extend(tokens);

    result.into_iter().collect()
}

fn compile_error(msg: &str) -> TokenStream {
    format!("compile_error!({msg:?});")
        .parse()
        .unwrap_or_default()
}
