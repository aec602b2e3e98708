//! Infix expression parsing and lowering to a postfix token stream (§4.2).

mod ast;
mod token;

use pest::Parser;
use pest_derive::Parser;

pub use token::ExprToken;

use crate::error::TranslationError;

#[derive(Parser)]
#[grammar = "expr/grammar.pest"]
struct ExprParser;

/// Parse a single-line infix expression into the postfix token stream the
/// translator lowers onto the accumulator machine.
pub fn parse_postfix(expression: &str) -> Result<Vec<ExprToken>, TranslationError> {
    // `expression` is `SOI ~ or_expr ~ EOI`: parsing via `or_expr` directly
    // would silently accept trailing garbage (e.g. the second `< c` in a
    // chained comparison), since pest only requires a rule to match a
    // prefix of the input unless the rule itself reaches EOI.
    let mut pairs = ExprParser::parse(Rule::expression, expression)
        .map_err(|err| TranslationError::InvalidExpression(err.to_string()))?;
    let top = pairs.next().expect("expression always wraps exactly one or_expr");
    let tree = ast::build_or(top)?;
    let mut tokens = Vec::new();
    ast::flatten(&tree, &mut tokens);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_identifier() {
        assert_eq!(parse_postfix("x").unwrap(), vec![ExprToken::VarRef("x".into())]);
    }

    #[test]
    fn arithmetic_pushes_right_before_left() {
        let tokens = parse_postfix("2 + 3 * 4").unwrap();
        assert_eq!(
            tokens,
            vec![
                ExprToken::IntConst(4),
                ExprToken::IntConst(3),
                ExprToken::Mul,
                ExprToken::IntConst(2),
                ExprToken::Add,
            ]
        );
    }

    #[test]
    fn comparison_is_single_shot() {
        let tokens = parse_postfix("a < b").unwrap();
        assert_eq!(
            tokens,
            vec![ExprToken::VarRef("b".into()), ExprToken::VarRef("a".into()), ExprToken::Lt]
        );
    }

    #[test]
    fn chained_comparison_is_rejected() {
        assert!(parse_postfix("a < b < c").is_err());
    }

    #[test]
    fn logical_and_or_are_left_associative() {
        let tokens = parse_postfix("a || b || c").unwrap();
        // (a || b) || c
        assert_eq!(
            tokens,
            vec![
                ExprToken::VarRef("a".into()),
                ExprToken::VarRef("b".into()),
                ExprToken::Or,
                ExprToken::VarRef("c".into()),
                ExprToken::Or,
            ]
        );
    }

    #[test]
    fn not_distributes_over_nested_parens() {
        let tokens = parse_postfix("!((a))").unwrap();
        assert_eq!(tokens, vec![ExprToken::VarRef("a".into()), ExprToken::Not]);
    }

    #[test]
    fn string_literal_becomes_its_length() {
        let tokens = parse_postfix("'hi'").unwrap();
        assert_eq!(tokens, vec![ExprToken::StrLenConst(2)]);
    }

    #[test]
    fn unary_minus_and_parens() {
        let tokens = parse_postfix("-(1 + 2)").unwrap();
        assert_eq!(
            tokens,
            vec![
                ExprToken::IntConst(2),
                ExprToken::IntConst(1),
                ExprToken::Add,
                ExprToken::Neg,
            ]
        );
    }
}
