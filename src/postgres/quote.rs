//! Quoting for the DDL statements the reconciler emits.
//!
//! `CREATE ROLE`, `CREATE DATABASE` and friends take identifiers and
//! passwords that cannot be bound as parameters, so they are spliced into the
//! statement text here and nowhere else.

/// Quote an identifier, doubling embedded double quotes.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes.
///
/// Literals containing backslashes use the `E''` form with escaped
/// backslashes so the result does not depend on `standard_conforming_strings`.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\'', "''");
    if escaped.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{escaped}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_always_quoted() {
        assert_eq!(quote_ident("n8n"), "\"n8n\"");
        assert_eq!(quote_ident("My-App"), "\"My-App\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn literals_escape_quotes_and_backslashes() {
        assert_eq!(quote_literal("secret"), "'secret'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(r"a\b"), r"E'a\\b'");
        assert_eq!(quote_literal(r"o'k\"), r"E'o''k\\'");
    }
}
