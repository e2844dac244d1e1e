use crate::lang::{Error, Token, MAX_EXPR_LEN};

use super::policy::MAX_EXPR_TOKENS;

type Result<T> = std::result::Result<T, Error>;

/// Rewrites recognized function calls into bracket atoms that tokenize as
/// single operands:
///
/// | source    | atom    |
/// |-----------|---------|
/// | `abs(E)`  | `[E]`   |
/// | `max(A,B)`| `{A,B}` |
/// | `min(A,B)`| `\|A,B\|` |
/// | `sqrt(E)` | `~E~`   |
///
/// Arguments are rewritten recursively, bounded by the expression depth
/// budget. An unmatched opening parenthesis aborts the rewrite.
pub fn rewrite(expr: &str, max_depth: usize) -> Result<String> {
    rewrite_at(expr, 0, max_depth)
}

const FUNCTIONS: [(&str, char, char); 4] = [
    ("abs(", '[', ']'),
    ("max(", '{', '}'),
    ("min(", '|', '|'),
    ("sqrt(", '~', '~'),
];

fn rewrite_at(expr: &str, depth: usize, max_depth: usize) -> Result<String> {
    if expr.len() > MAX_EXPR_LEN {
        return Err(error!(ExpressionTooLong));
    }
    if depth >= max_depth {
        return Err(error!(ExpressionTooDeep));
    }
    let mut result = expr.to_string();
    for (name, open, close) in FUNCTIONS {
        while let Some(pos) = result.find(name) {
            let paren = pos + name.len() - 1;
            let end = match matching_paren(&result, paren) {
                Some(end) => end,
                None => return Err(error!(SyntaxError; "UNMATCHED PARENTHESIS")),
            };
            let inner = rewrite_at(&result[paren + 1..end], depth + 1, max_depth)?;
            result = format!(
                "{}{}{}{}{}",
                &result[..pos],
                open,
                inner,
                close,
                &result[end + 1..]
            );
        }
    }
    Ok(result)
}

/// Index of the `)` matching the `(` at `open`, by counting.
fn matching_paren(expr: &str, open: usize) -> Option<usize> {
    let mut count = 1;
    for (i, c) in expr.char_indices().skip(open + 1) {
        match c {
            '(' => count += 1,
            ')' => {
                count -= 1;
                if count == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Classic Shunting-Yard: pops operators of strictly greater precedence,
/// and of equal precedence only when the incoming operator associates
/// left. `^` is the one right-associative operator.
pub fn to_postfix(tokens: Vec<Token>) -> Result<Vec<Token>> {
    if tokens.len() > MAX_EXPR_TOKENS {
        return Err(error!(TooManyTokens));
    }
    let mut output: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Token> = vec![];
    for token in tokens {
        if token.is_operand() {
            output.push(token);
        } else if token == Token::LParen {
            operators.push(token);
        } else if token == Token::RParen {
            while let Some(top) = operators.pop() {
                if top == Token::LParen {
                    break;
                }
                output.push(top);
            }
        } else if let Token::Operator(op) = token {
            while let Some(Token::Operator(top)) = operators.last() {
                let wins = top.precedence() > op.precedence()
                    || (top.precedence() == op.precedence() && !op.is_right_associative());
                if !wins {
                    break;
                }
                output.push(operators.pop().unwrap());
            }
            operators.push(token);
        }
    }
    while let Some(top) = operators.pop() {
        if top != Token::LParen {
            output.push(top);
        }
    }
    Ok(output)
}

/// Splits a `max`/`min` atom body at its top-level comma, skipping commas
/// inside parentheses and nested atoms.
pub fn split_arguments(body: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let mut in_pipe = false;
    let mut in_tilde = false;
    for (i, c) in body.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '|' => in_pipe = !in_pipe,
            '~' => in_tilde = !in_tilde,
            ',' if depth == 0 && !in_pipe && !in_tilde => {
                return Some((&body[..i], &body[i + 1..]));
            }
            _ => {}
        }
    }
    None
}
