#![no_main]

use libfuzzer_sys::fuzz_target;
use moonhost_compiler::lexer::Lexer;
use moonhost_compiler::token::Token;

fuzz_target!(|data: &[u8]| {
    let mut lexer = Lexer::new(data);
    while let Ok(tok) = lexer.advance() {
        if tok.token == Token::Eof {
            break;
        }
    }
});
