use crate::lang::{tokenize, Operator, Token};
use crate::mach::expr::{rewrite, split_arguments, to_postfix};

fn postfix(expression: &str) -> Vec<Token> {
    to_postfix(tokenize(expression).unwrap()).unwrap()
}

#[test]
fn test_rewrite_abs() {
    assert_eq!(rewrite("abs(x)", 32).unwrap(), "[x]");
    assert_eq!(rewrite("1 + abs(x - 2)", 32).unwrap(), "1 + [x - 2]");
}

#[test]
fn test_rewrite_all_functions() {
    assert_eq!(rewrite("sqrt(x)", 32).unwrap(), "~x~");
    assert_eq!(rewrite("max(a,b)", 32).unwrap(), "{a,b}");
    assert_eq!(rewrite("min(a,b)", 32).unwrap(), "|a,b|");
}

#[test]
fn test_rewrite_nested() {
    assert_eq!(rewrite("abs(max(a,b))", 32).unwrap(), "[{a,b}]");
    assert_eq!(rewrite("max(abs(a),sqrt(b))", 32).unwrap(), "{[a],~b~}");
}

#[test]
fn test_rewrite_unmatched_paren() {
    assert!(rewrite("abs(x", 32).is_err());
}

#[test]
fn test_rewrite_depth_limit() {
    let mut deep = "x".to_string();
    for _ in 0..40 {
        deep = format!("abs({})", deep);
    }
    assert!(rewrite(&deep, 32).is_err());
    assert!(rewrite(&deep, 256).is_ok());
}

#[test]
fn test_postfix_precedence() {
    // 1 + 2 * 3 keeps the multiplication inside.
    assert_eq!(
        postfix("1 + 2 * 3"),
        vec![
            Token::Integer(1),
            Token::Integer(2),
            Token::Integer(3),
            Token::Operator(Operator::Multiply),
            Token::Operator(Operator::Add),
        ]
    );
}

#[test]
fn test_postfix_left_associativity() {
    assert_eq!(
        postfix("8 - 3 - 2"),
        vec![
            Token::Integer(8),
            Token::Integer(3),
            Token::Operator(Operator::Subtract),
            Token::Integer(2),
            Token::Operator(Operator::Subtract),
        ]
    );
}

#[test]
fn test_postfix_power_right_associativity() {
    assert_eq!(
        postfix("2 ^ 3 ^ 2"),
        vec![
            Token::Integer(2),
            Token::Integer(3),
            Token::Integer(2),
            Token::Operator(Operator::Power),
            Token::Operator(Operator::Power),
        ]
    );
}

#[test]
fn test_postfix_parentheses() {
    assert_eq!(
        postfix("(1 + 2) * 3"),
        vec![
            Token::Integer(1),
            Token::Integer(2),
            Token::Operator(Operator::Add),
            Token::Integer(3),
            Token::Operator(Operator::Multiply),
        ]
    );
}

#[test]
fn test_postfix_comparison_binds_loosest() {
    assert_eq!(
        postfix("a + 1 == b"),
        vec![
            Token::Ident("a".to_string()),
            Token::Integer(1),
            Token::Operator(Operator::Add),
            Token::Ident("b".to_string()),
            Token::Operator(Operator::Equal),
        ]
    );
}

#[test]
fn test_postfix_token_limit() {
    let many = vec!["1"; 101].join(" + ");
    let tokens = tokenize(&many).unwrap();
    assert!(to_postfix(tokens).is_err());
}

#[test]
fn test_split_arguments() {
    assert_eq!(split_arguments("a,b"), Some(("a", "b")));
    assert_eq!(split_arguments("max(a,b)"), None); // no top-level comma
    assert_eq!(split_arguments("{a,b},c"), Some(("{a,b}", "c")));
    assert_eq!(split_arguments("(a,b),c"), Some(("(a,b)", "c")));
    assert_eq!(split_arguments("ab"), None);
}
