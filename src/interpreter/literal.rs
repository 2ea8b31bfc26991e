//! # Literal Normalizer
//!
//! Converts a relaxed argument literal (unquoted keys, mixed quote styles,
//! bare `$operator` keys) into strict structured values.
//!
//! The normalizer is a character-level state machine tracking nesting
//! depth, quote state and key/value position. A whole-string regex
//! substitution cannot do this soundly for nested or quoted content, so
//! none is used anywhere here. Already-strict JSON passes through
//! unchanged, which makes normalization safe to apply unconditionally.

use serde_json::Value;

use crate::store::ident::{is_doc_id_hex, DocId};

use super::errors::{InterpreterError, InterpreterResult};

/// Normalize a raw argument literal into positional argument values.
///
/// An empty literal denotes zero arguments. Multiple top-level values are
/// split only at commas at depth 0 outside quotes, then each fragment is
/// normalized independently.
pub fn normalize_arguments(literal: &str) -> InterpreterResult<Vec<Value>> {
    if literal.trim().is_empty() {
        return Ok(Vec::new());
    }

    let fragments = split_top_level(literal)?;
    let mut args = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        args.push(normalize_one(literal, fragment)?);
    }
    Ok(args)
}

/// Byte range of one top-level positional argument
#[derive(Debug, Clone, Copy)]
struct Fragment {
    start: usize,
    end: usize,
}

/// Split the literal at depth-0 commas outside quotes
fn split_top_level(literal: &str) -> InterpreterResult<Vec<Fragment>> {
    let mut fragments = Vec::new();
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (pos, c) in literal.char_indices() {
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
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| InterpreterError::InvalidLiteral {
                    position: Some(pos),
                    reason: format!("unmatched '{}'", c),
                })?;
            }
            ',' if depth == 0 => {
                fragments.push(Fragment { start, end: pos });
                start = pos + 1;
            }
            _ => {}
        }
    }
    fragments.push(Fragment {
        start,
        end: literal.len(),
    });

    for fragment in &fragments {
        if literal[fragment.start..fragment.end].trim().is_empty() {
            return Err(InterpreterError::InvalidLiteral {
                position: Some(fragment.start),
                reason: "empty argument".to_string(),
            });
        }
    }
    Ok(fragments)
}

/// Normalize a single fragment and parse it strictly
fn normalize_one(literal: &str, fragment: Fragment) -> InterpreterResult<Value> {
    let text = &literal[fragment.start..fragment.end];
    let (normalized, positions) = normalize_fragment(text, fragment.start)?;

    let mut value: Value =
        serde_json::from_str(&normalized).map_err(|err| InterpreterError::InvalidLiteral {
            // Map the strict parser's column back to a source position via
            // the emitted-char offset table. Falls back to the fragment
            // start for multi-line input.
            position: if err.line() == 1 {
                positions
                    .get(err.column().saturating_sub(1))
                    .copied()
                    .or(Some(fragment.start))
            } else {
                Some(fragment.start)
            },
            reason: "argument does not parse as a structured value".to_string(),
        })?;

    tag_identifiers(&mut value);
    Ok(value)
}

/// Container kind, for key-position tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

/// Rewrite one fragment into strict JSON text.
///
/// Returns the normalized text plus, per emitted char, the source byte
/// offset it was produced from (used to report error positions against the
/// original literal).
fn normalize_fragment(text: &str, base: usize) -> InterpreterResult<(String, Vec<usize>)> {
    let mut out = String::with_capacity(text.len() + 16);
    let mut positions = Vec::with_capacity(text.len() + 16);
    let mut stack: Vec<Container> = Vec::new();
    let mut expect_key = false;

    let emit = |out: &mut String, positions: &mut Vec<usize>, c: char, pos: usize| {
        out.push(c);
        positions.push(base + pos);
    };

    let mut chars = text.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        match c {
            '\'' | '"' => {
                copy_string(c, pos, base, &mut chars, &mut out, &mut positions)?;
            }
            '{' => {
                emit(&mut out, &mut positions, '{', pos);
                stack.push(Container::Object);
                expect_key = true;
            }
            '[' => {
                emit(&mut out, &mut positions, '[', pos);
                stack.push(Container::Array);
                expect_key = false;
            }
            '}' | ']' => {
                let expected = if c == '}' {
                    Container::Object
                } else {
                    Container::Array
                };
                if stack.pop() != Some(expected) {
                    return Err(InterpreterError::InvalidLiteral {
                        position: Some(base + pos),
                        reason: format!("unmatched '{}'", c),
                    });
                }
                emit(&mut out, &mut positions, c, pos);
                expect_key = false;
            }
            ':' => {
                emit(&mut out, &mut positions, ':', pos);
                expect_key = false;
            }
            ',' => {
                emit(&mut out, &mut positions, ',', pos);
                expect_key = stack.last() == Some(&Container::Object);
            }
            c if c.is_whitespace() => {
                emit(&mut out, &mut positions, c, pos);
            }
            c if c.is_ascii_digit() || c == '-' => {
                // Numeric literal, passed through unchanged; the strict
                // parse validates its shape.
                emit(&mut out, &mut positions, c, pos);
                while let Some(&(p, n)) = chars.peek() {
                    if n.is_ascii_digit() || matches!(n, '.' | 'e' | 'E' | '+' | '-') {
                        emit(&mut out, &mut positions, n, p);
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
            c if is_bare_start(c) => {
                let mut word = String::new();
                word.push(c);
                while let Some(&(_, n)) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        word.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }

                if expect_key {
                    // The only place bare identifiers are legal: quote them.
                    emit(&mut out, &mut positions, '"', pos);
                    for wc in word.chars() {
                        emit(&mut out, &mut positions, wc, pos);
                    }
                    emit(&mut out, &mut positions, '"', pos);
                } else if matches!(word.as_str(), "true" | "false" | "null") {
                    for wc in word.chars() {
                        emit(&mut out, &mut positions, wc, pos);
                    }
                } else {
                    // Bare identifiers in value position fail closed rather
                    // than being promoted to strings.
                    return Err(InterpreterError::InvalidLiteral {
                        position: Some(base + pos),
                        reason: format!("unquoted identifier '{}' in value position", word),
                    });
                }
            }
            _ => {
                return Err(InterpreterError::InvalidLiteral {
                    position: Some(base + pos),
                    reason: format!("unexpected character '{}'", c),
                });
            }
        }
    }

    if !stack.is_empty() {
        return Err(InterpreterError::InvalidLiteral {
            position: Some(base + text.len()),
            reason: "unclosed brace or bracket".to_string(),
        });
    }

    Ok((out, positions))
}

/// First char of a bare identifier: letters, `_`, or `$` for operator keys
fn is_bare_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

/// Copy a quoted string into the output, converting single-quoted form to
/// double-quoted with escaping. Double-quoted input is passed through
/// verbatim so already-escaped content is never escaped twice.
fn copy_string(
    open: char,
    open_pos: usize,
    base: usize,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    out: &mut String,
    positions: &mut Vec<usize>,
) -> InterpreterResult<()> {
    let emit = |out: &mut String, positions: &mut Vec<usize>, c: char, pos: usize| {
        out.push(c);
        positions.push(base + pos);
    };

    emit(out, positions, '"', open_pos);

    while let Some((pos, c)) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some((epos, ec)) => {
                    if open == '\'' && ec == '\'' {
                        // \' is not a JSON escape; the quote itself is safe
                        // inside a double-quoted string
                        emit(out, positions, '\'', epos);
                    } else {
                        emit(out, positions, '\\', pos);
                        emit(out, positions, ec, epos);
                    }
                }
                None => {
                    return Err(InterpreterError::InvalidLiteral {
                        position: Some(base + pos),
                        reason: "dangling escape in string".to_string(),
                    });
                }
            }
        } else if c == open {
            emit(out, positions, '"', pos);
            return Ok(());
        } else if open == '\'' && c == '"' {
            emit(out, positions, '\\', pos);
            emit(out, positions, '"', pos);
        } else {
            emit(out, positions, c, pos);
        }
    }

    Err(InterpreterError::InvalidLiteral {
        position: Some(base + open_pos),
        reason: "unterminated string".to_string(),
    })
}

/// Retag every string leaf that looks like a store identifier.
///
/// Objects that already carry the tagged form are left alone, so tagging
/// is idempotent.
fn tag_identifiers(value: &mut Value) {
    match value {
        Value::String(s) => {
            if is_doc_id_hex(s) {
                if let Ok(id) = DocId::parse(s) {
                    *value = id.to_value();
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                tag_identifiers(item);
            }
        }
        Value::Object(_) => {
            if DocId::from_value(value).is_some() {
                return;
            }
            if let Value::Object(map) = value {
                for item in map.values_mut() {
                    tag_identifiers(item);
                }
            }
        }
        _ => {}
    }
}
