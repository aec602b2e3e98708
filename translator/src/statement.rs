//! Hand-rolled statement matching. The source grammar is small and
//! line-oriented, so an ordered sequence of string matchers reads more
//! plainly here than a regex dependency or a parser-combinator stack — the
//! statement dispatch in [`crate::translator::Translator::translate`] is
//! itself an ordered match, not a registry, per the same design.

/// Split a leading identifier (`[A-Za-z_][A-Za-z0-9_]*`) off the front of
/// `s`, returning `(identifier, rest)`.
pub(crate) fn split_identifier(s: &str) -> Option<(&str, &str)> {
    let mut end = 0;
    for (i, c) in s.char_indices() {
        if i == 0 {
            if !(c.is_ascii_alphabetic() || c == '_') {
                return None;
            }
        } else if !(c.is_ascii_alphanumeric() || c == '_') {
            break;
        }
        end = i + c.len_utf8();
    }
    if end == 0 {
        None
    } else {
        Some((&s[..end], &s[end..]))
    }
}

pub(crate) fn is_valid_identifier(s: &str) -> bool {
    matches!(split_identifier(s), Some((_, rest)) if rest.is_empty())
}

/// `name = expr`.
pub(crate) fn match_assignment(statement: &str) -> Option<(&str, &str)> {
    let (name, rest) = split_identifier(statement)?;
    let rest = rest.trim_start().strip_prefix('=')?;
    let expr = rest.trim_start();
    if expr.is_empty() {
        None
    } else {
        Some((name, expr))
    }
}

fn match_block_header<'a>(statement: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = statement.strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let expr = rest.trim_start().trim_end().strip_suffix(':')?;
    Some(expr.trim_end())
}

/// `if EXPR :`.
pub(crate) fn match_if(statement: &str) -> Option<&str> {
    match_block_header(statement, "if")
}

/// `while EXPR :`.
pub(crate) fn match_while(statement: &str) -> Option<&str> {
    match_block_header(statement, "while")
}

/// `/out EXPR` or `> EXPR`.
pub(crate) fn match_output(statement: &str) -> Option<&str> {
    if let Some(rest) = statement.strip_prefix("/out ") {
        Some(rest.trim_start())
    } else {
        statement.strip_prefix('>').map(str::trim_start)
    }
}

/// `/in name`.
pub(crate) fn match_input(statement: &str) -> Option<&str> {
    let rest = statement.strip_prefix("/in")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (name, _) = split_identifier(rest.trim_start())?;
    Some(name)
}

/// A whole-expression string literal, e.g. `'hi'`. Returns the content
/// between the quotes.
pub(crate) fn as_string_literal(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix('\'')?.strip_suffix('\'')?;
    if inner.contains('\'') {
        None
    } else {
        Some(inner)
    }
}

/// A whole-expression bare identifier, e.g. `y` in `x = y`.
pub(crate) fn as_single_identifier(expr: &str) -> Option<&str> {
    if is_valid_identifier(expr) {
        Some(expr)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_prefers_first_equals_sign() {
        assert_eq!(match_assignment("x = 1"), Some(("x", "1")));
        assert_eq!(match_assignment("x == 1"), Some(("x", "= 1")));
        assert_eq!(match_assignment("if x > 0 :"), None);
    }

    #[test]
    fn if_and_while_require_trailing_colon() {
        assert_eq!(match_if("if x > 0 :"), Some("x > 0"));
        assert_eq!(match_if("if x > 0:"), Some("x > 0"));
        assert_eq!(match_while("while x :"), Some("x"));
        assert_eq!(match_if("ifx > 0 :"), None);
    }

    #[test]
    fn output_accepts_both_spellings() {
        assert_eq!(match_output("/out x"), Some("x"));
        assert_eq!(match_output("> x"), Some("x"));
        assert_eq!(match_output(">x"), Some("x"));
    }

    #[test]
    fn input_takes_only_the_identifier() {
        assert_eq!(match_input("/in s"), Some("s"));
        assert_eq!(match_input("/ins"), None);
    }

    #[test]
    fn literal_and_identifier_detection() {
        assert_eq!(as_string_literal("'hi'"), Some("hi"));
        assert_eq!(as_string_literal("'it''s'"), None);
        assert_eq!(as_single_identifier("foo_1"), Some("foo_1"));
        assert_eq!(as_single_identifier("1 + 2"), None);
    }
}
