//! # Command Parser
//!
//! Splits a raw shell-style command into `(collection, operation, literal)`.
//!
//! Accepted shape: `db.<collection>.<operation>(<arguments>)` with an
//! optional trailing `;`. The argument group is located by bracket-depth
//! counting with quote tracking, never by regex, so structural characters
//! inside quoted strings are passed through untouched.

use super::errors::{InterpreterError, InterpreterResult};

/// Fixed namespace prefix every command must carry
const NAMESPACE_PREFIX: &str = "db.";

/// A structurally valid command, ready for the access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Target collection, case preserved (collections are case-sensitive)
    pub collection: String,

    /// Operation name, lower-cased for case-insensitive resolution
    pub operation: String,

    /// Raw argument literal between the parentheses (may be empty)
    pub argument_literal: String,
}

/// Parse a raw command string.
///
/// No side effects; the result is owned by the request.
pub fn parse(raw: &str) -> InterpreterResult<ParsedCommand> {
    let text = raw.trim();

    let rest = text.strip_prefix(NAMESPACE_PREFIX).ok_or_else(|| {
        InterpreterError::MalformedCommand(format!(
            "command must start with '{}'",
            NAMESPACE_PREFIX
        ))
    })?;

    // First separator: collection name. Names must not contain '.' so the
    // split happens on the first two dots only.
    let dot = rest.find('.').ok_or_else(|| {
        InterpreterError::MalformedCommand("missing operation after collection".to_string())
    })?;
    let collection = &rest[..dot];
    if !is_identifier(collection) {
        return Err(InterpreterError::MalformedCommand(format!(
            "invalid collection name '{}'",
            collection
        )));
    }

    // Second separator: operation name, terminated by the argument group.
    let after = &rest[dot + 1..];
    let open = after.find('(').ok_or_else(|| {
        InterpreterError::MalformedCommand("missing argument list".to_string())
    })?;
    let operation = after[..open].trim();
    if !is_identifier(operation) {
        return Err(InterpreterError::MalformedCommand(format!(
            "invalid operation name '{}'",
            operation
        )));
    }

    let body = &after[open..];
    let close = find_matching_paren(body)?;
    let argument_literal = body[1..close].trim().to_string();

    // One operation per command: nothing but an optional ';' may follow.
    let trailer = body[close + 1..].trim();
    if !(trailer.is_empty() || trailer == ";") {
        return Err(InterpreterError::MalformedCommand(format!(
            "unexpected trailing input '{}'",
            trailer
        )));
    }

    Ok(ParsedCommand {
        collection: collection.to_string(),
        operation: operation.to_lowercase(),
        argument_literal,
    })
}

/// Collection and operation names: `[A-Za-z0-9_]+`
fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Find the byte offset of the parenthesis matching `body[0]` (which must
/// be `(`).
///
/// Tracks nesting depth across all three bracket kinds and a string-quote
/// state so that `(`, `)`, `,` and `:` inside quoted strings are not
/// treated as structural.
fn find_matching_paren(body: &str) -> InterpreterResult<usize> {
    debug_assert!(body.starts_with('('));

    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (pos, c) in body.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                if depth == 0 {
                    return Err(InterpreterError::MalformedCommand(
                        "unbalanced delimiters in argument list".to_string(),
                    ));
                }
                depth -= 1;
                if depth == 0 {
                    if c != ')' {
                        return Err(InterpreterError::MalformedCommand(format!(
                            "mismatched '{}' closing the argument list",
                            c
                        )));
                    }
                    return Ok(pos);
                }
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(InterpreterError::MalformedCommand(
            "unterminated string in argument list".to_string(),
        ));
    }
    Err(InterpreterError::MalformedCommand(
        "missing closing parenthesis".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_command() {
        let cmd = parse("db.events.find({status:'open'})").unwrap();
        assert_eq!(cmd.collection, "events");
        assert_eq!(cmd.operation, "find");
        assert_eq!(cmd.argument_literal, "{status:'open'}");
    }

    #[test]
    fn test_parse_empty_arguments() {
        let cmd = parse("db.events.find()").unwrap();
        assert_eq!(cmd.argument_literal, "");
    }

    #[test]
    fn test_operation_is_lowercased() {
        let cmd = parse("db.events.Find()").unwrap();
        assert_eq!(cmd.operation, "find");

        let cmd = parse("db.events.INSERTONE({})").unwrap();
        assert_eq!(cmd.operation, "insertone");
    }

    #[test]
    fn test_collection_case_preserved() {
        let cmd = parse("db.Events.find()").unwrap();
        assert_eq!(cmd.collection, "Events");
    }

    #[test]
    fn test_missing_prefix_rejected() {
        assert!(matches!(
            parse("events.find()"),
            Err(InterpreterError::MalformedCommand(_))
        ));
        assert!(matches!(
            parse("database.events.find()"),
            Err(InterpreterError::MalformedCommand(_))
        ));
    }

    #[test]
    fn test_missing_operation_rejected() {
        assert!(parse("db.events").is_err());
        assert!(parse("db.events.").is_err());
        assert!(parse("db.events.()").is_err());
    }

    #[test]
    fn test_dotted_operation_rejected() {
        // Names must not contain '.': the split is on the first two dots only
        assert!(parse("db.events.meta.find()").is_err());
    }

    #[test]
    fn test_invalid_collection_rejected() {
        assert!(parse("db.ev-ents.find()").is_err());
        assert!(parse("db..find()").is_err());
    }

    #[test]
    fn test_nested_parens_in_literal() {
        let cmd = parse("db.a.find({note: 'x (y)'})").unwrap();
        assert_eq!(cmd.argument_literal, "{note: 'x (y)'}");
    }

    #[test]
    fn test_structural_chars_in_quotes_not_structural() {
        let cmd = parse(r#"db.a.find({"note":"a (b), c: d"})"#).unwrap();
        assert_eq!(cmd.argument_literal, r#"{"note":"a (b), c: d"}"#);
    }

    #[test]
    fn test_unbalanced_delimiters_rejected() {
        assert!(parse("db.a.find({x: 1)").is_err());
        assert!(parse("db.a.find(").is_err());
        assert!(parse("db.a.find({)").is_err());
    }

    #[test]
    fn test_unterminated_string_rejected() {
        assert!(parse("db.a.find({x: 'oops})").is_err());
    }

    #[test]
    fn test_trailing_semicolon_allowed() {
        let cmd = parse("db.a.find();").unwrap();
        assert_eq!(cmd.operation, "find");
    }

    #[test]
    fn test_chained_call_rejected() {
        assert!(parse("db.a.find().sort({x: 1})").is_err());
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let cmd = parse(r"db.a.find({x: 'it\'s (fine)'})").unwrap();
        assert_eq!(cmd.argument_literal, r"{x: 'it\'s (fine)'}");
    }

    #[test]
    fn test_whitespace_tolerated() {
        let cmd = parse("  db.a.find( {x: 1} ) ; ").unwrap();
        assert_eq!(cmd.argument_literal, "{x: 1}");
    }
}
