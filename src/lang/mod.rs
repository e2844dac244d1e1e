/*!
## Language Module

Lexical analysis of the line-oriented source language: diagnostics,
expression tokens, and the per-line scanner.

*/

#[macro_use]
mod error;
mod lex;
mod token;

pub use error::Error;
pub use error::ErrorCode;
pub use lex::{
    clean_line, is_float, is_integer, is_valid_variable, parse_float_literal, parse_int_literal,
    split_command, tokenize, MAX_EXPR_LEN,
};
pub use token::{Operator, Token};
