//! Literal escaping and field quoting
//!
//! WIQL string literals are single-quoted; a quote inside a literal is
//! written twice. Nothing else is transformed, so any Unicode text survives
//! an escape/unescape round trip byte for byte.

/// Double every single quote
///
/// # Examples
///
/// ```
/// use adoq_wiql::escape;
///
/// assert_eq!(escape("O'Brien"), "O''Brien");
/// assert_eq!(escape("日本語"), "日本語");
/// ```
pub fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

/// Reverse [`escape`]
///
/// Fails on a lone quote, which an escaped body can never contain.
pub fn unescape(s: &str) -> Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices();
    while let Some((pos, c)) = chars.next() {
        if c == '\'' {
            match chars.next() {
                Some((_, '\'')) => out.push('\''),
                _ => return Err(format!("lone quote at byte {}", pos)),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Escape and wrap in quotes
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", escape(s))
}

/// Bracket a canonical field reference
///
/// References are always bracketed, whether or not they contain
/// separators. A reference containing a bracket cannot be quoted.
pub fn quote_field(reference: &str) -> Result<String, String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err("empty field reference".to_string());
    }
    if reference.contains(['[', ']']) {
        return Err(format!("field reference '{}' contains a bracket", reference));
    }
    Ok(format!("[{}]", reference))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_examples() {
        assert_eq!(escape(""), "");
        assert_eq!(escape("''"), "''''");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_unescape_rejects_lone_quote() {
        assert!(unescape("it's").is_err());
        assert!(unescape("trailing'").is_err());
        assert_eq!(unescape("it''s").unwrap(), "it's");
    }

    #[test]
    fn test_quote_field_always_brackets() {
        assert_eq!(quote_field("System.Id").unwrap(), "[System.Id]");
        assert_eq!(quote_field("Title").unwrap(), "[Title]");
        assert!(quote_field("Sys]tem").is_err());
        assert!(quote_field("  ").is_err());
    }
}
