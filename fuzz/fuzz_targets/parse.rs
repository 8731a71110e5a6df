#![no_main]

use dscope_syntax::{lexer, parser, printer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Invalid UTF-8 is not interesting: editors hand us `&str`
    if let Ok(s) = std::str::from_utf8(data) {
        let lexed = lexer::lex(s);
        let parsed = parser::parse(&lexed.tokens);
        // Every tree the parser produces must be printable
        let _ = printer::render_module(&parsed.tree);
        let _ = dscope_syntax::context::token_context(s, s.len() / 2);
    }
});
