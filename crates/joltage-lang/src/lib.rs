pub mod ast;
pub mod compiler;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use compiler::{CompileError, CompiledMachine, Compiler, MAX_TARGET};
pub use lexer::{LexError, Lexer, Span, Token, TokenKind};
pub use parser::{ParseError, Parser};
