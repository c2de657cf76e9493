//! WHERE-only fragment validation
//!
//! A fragment is parsed rather than trusted. Fields must resolve, operators
//! must suit the field's type and operands are rendered as filter values
//! are. Anything outside the predicate grammar is refused, so a fragment
//! can neither end nor extend the statement.

use crate::compiler::{is_search_operator, pins_value, render_value, CompileContext};
use crate::error::CompileError;
use crate::escape::{quote_field, unescape};
use crate::macros::parse_date_macro;
use adoq_domain::{refs, FieldDef, FieldRegistry, Literal, Operator, ValueType};

/// Lexical token of a WHERE fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// `[...]` with the brackets removed
    Field(String),
    /// `'...'` body, still escaped
    Literal(String),
    /// Bare word (keyword)
    Word(String),
    /// Numeric literal
    Number(String),
    /// `@Name`
    Macro(String),
    /// Comparison or arithmetic symbol
    Symbol(String),
    LParen,
    RParen,
    Comma,
}

const STATEMENT_KEYWORDS: [&str; 6] = ["SELECT", "FROM", "ORDER", "ASOF", "MODE", "WHERE"];
const OPERATOR_WORDS: [&str; 8] = ["NOT", "IN", "CONTAINS", "WORDS", "UNDER", "WAS", "EVER", "GROUP"];
const NAMED_MACROS: [&str; 3] = ["@Me", "@Project", "@CurrentIteration"];

fn malformed(reason: impl Into<String>) -> CompileError {
    CompileError::MalformedFragment(reason.into())
}

/// Split a fragment into tokens
pub(crate) fn lex(input: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '[' => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some('[') => return Err(malformed("nested '[' in field reference")),
                        Some(ch) => name.push(ch),
                        None => return Err(malformed("unterminated field reference")),
                    }
                }
                tokens.push(Token::Field(name));
            }
            '\'' => {
                chars.next();
                let mut body = String::new();
                loop {
                    match chars.next() {
                        Some('\'') if chars.peek() == Some(&'\'') => {
                            chars.next();
                            body.push_str("''");
                        }
                        Some('\'') => break,
                        Some(ch) => body.push(ch),
                        None => return Err(malformed("unterminated string literal")),
                    }
                }
                tokens.push(Token::Literal(body));
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            ';' => return Err(malformed("statement separators are not allowed")),
            '=' | '<' | '>' | '!' => {
                let mut symbol = String::new();
                while let Some(&ch) = chars.peek() {
                    if !matches!(ch, '=' | '<' | '>' | '!') {
                        break;
                    }
                    symbol.push(ch);
                    chars.next();
                }
                if Operator::parse(&symbol).is_none() {
                    return Err(malformed(format!("unsupported operator '{}'", symbol)));
                }
                tokens.push(Token::Symbol(symbol));
            }
            '+' | '-' => {
                chars.next();
                tokens.push(Token::Symbol(c.to_string()));
            }
            '@' => {
                chars.next();
                let mut name = String::from("@");
                while let Some(&ch) = chars.peek() {
                    if !ch.is_ascii_alphanumeric() {
                        break;
                    }
                    name.push(ch);
                    chars.next();
                }
                tokens.push(Token::Macro(name));
            }
            c if c.is_ascii_digit() => {
                let mut number = String::new();
                while let Some(&ch) = chars.peek() {
                    if !(ch.is_ascii_digit() || ch == '.') {
                        break;
                    }
                    number.push(ch);
                    chars.next();
                }
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if !(ch.is_alphanumeric() || ch == '_') {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
            other => return Err(malformed(format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

/// A validated fragment in canonical spelling
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fragment {
    /// Normalized WHERE body
    pub text: String,

    /// Whether every match is already pinned to named team projects
    ///
    /// True only for a top-level, un-negated `=` or `IN` on the team
    /// project with no top-level `OR` beside it.
    pub scoped: bool,
}

fn is_keyword(word: &str, set: &[&str]) -> bool {
    set.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Read the operator that follows a subject field
fn read_operator(rest: &[Token]) -> Result<(Operator, usize), String> {
    if let Some(Token::Symbol(s)) = rest.first() {
        return Operator::parse(s)
            .map(|op| (op, 1))
            .ok_or_else(|| format!("unsupported operator '{}'", s));
    }

    let words: Vec<&str> = rest
        .iter()
        .map_while(|t| match t {
            Token::Word(w) if is_keyword(w, &OPERATOR_WORDS) => Some(w.as_str()),
            _ => None,
        })
        .collect();

    if words.is_empty() {
        return Err("missing operator".to_string());
    }

    let phrase = words.join(" ");
    Operator::parse(&phrase)
        .map(|op| (op, words.len()))
        .ok_or_else(|| format!("unsupported operator '{}'", phrase))
}

fn canonical_macro(name: &str) -> Option<String> {
    NAMED_MACROS
        .iter()
        .find(|m| m.eq_ignore_ascii_case(name))
        .map(|m| m.to_string())
        .or_else(|| parse_date_macro(name))
}

/// Whether a canonical macro can stand for a value of `def`
fn macro_suits(canonical: &str, def: &FieldDef) -> bool {
    match canonical {
        "@Me" => def.value_type == ValueType::Identity,
        "@Project" => def.reference.eq_ignore_ascii_case(refs::TEAM_PROJECT),
        "@CurrentIteration" => def.value_type == ValueType::TreePath,
        _ => def.value_type == ValueType::DateTime,
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Field(name) => format!("[{}]", name),
        Token::Literal(body) => format!("'{}'", body),
        Token::Word(w) | Token::Number(w) | Token::Macro(w) | Token::Symbol(w) => format!("'{}'", w),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Comma => "','".to_string(),
    }
}

fn unexpected(token: Option<&Token>, wanted: &str) -> CompileError {
    match token {
        Some(Token::Word(w)) if is_keyword(w, &STATEMENT_KEYWORDS) => malformed(format!(
            "'{}' is not allowed in a WHERE fragment",
            w.to_uppercase()
        )),
        Some(token) => malformed(format!("expected {}, found {}", wanted, describe(token))),
        None => malformed(format!("expected {}, found end of clause", wanted)),
    }
}

/// Recursive-descent reader over the fragment grammar
///
/// ```text
/// expr      := term ((AND | OR) term)*
/// term      := NOT? ( '(' expr ')' | predicate )
/// predicate := field operator operand
/// operand   := value | '(' value (',' value)* ')'      -- IN, NOT IN
/// value     := literal | number | macro [(+|-) number] | field
/// ```
struct Reader<'a> {
    tokens: &'a [Token],
    pos: usize,
    registry: &'a FieldRegistry,
    ctx: &'a CompileContext,
    pieces: Vec<String>,
    pins_project: bool,
    top_level_or: bool,
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_word(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn expr(&mut self, depth: usize, negated: bool) -> Result<(), CompileError> {
        self.term(depth, negated)?;
        loop {
            let connective = if self.peek_word("AND") {
                "AND"
            } else if self.peek_word("OR") {
                "OR"
            } else {
                return Ok(());
            };
            if connective == "OR" && depth == 0 {
                self.top_level_or = true;
            }
            self.pieces.push(connective.to_string());
            self.pos += 1;
            self.term(depth, negated)?;
        }
    }

    fn term(&mut self, depth: usize, mut negated: bool) -> Result<(), CompileError> {
        if self.peek_word("NOT") {
            self.pieces.push("NOT".to_string());
            self.pos += 1;
            negated = true;
        }

        match self.peek() {
            Some(Token::LParen) => {
                self.pieces.push("(".to_string());
                self.pos += 1;
                self.expr(depth + 1, negated)?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pieces.push(")".to_string());
                        self.pos += 1;
                        Ok(())
                    }
                    other => Err(unexpected(other, "')'")),
                }
            }
            Some(Token::Field(name)) => {
                self.pos += 1;
                self.predicate(name, depth, negated)
            }
            other => Err(unexpected(other, "a field or '('")),
        }
    }

    fn predicate(&mut self, name: &str, depth: usize, negated: bool) -> Result<(), CompileError> {
        let registry = self.registry;
        let def = registry.resolve(name)?;
        self.pieces.push(quote_field(&def.reference).map_err(malformed)?);

        let (op, consumed) = read_operator(&self.tokens[self.pos..])
            .map_err(|e| malformed(format!("{} after [{}]", e, def.reference)))?;
        if !def.value_type.accepts(op) {
            return Err(CompileError::OperatorTypeMismatch {
                field: def.reference.clone(),
                operator: op,
                value_type: def.value_type,
            });
        }
        self.pieces.push(op.token().to_string());
        self.pos += consumed;

        if op.takes_list() {
            match self.peek() {
                Some(Token::LParen) => self.pos += 1,
                other => return Err(unexpected(other, &format!("'(' after {}", op))),
            }
            let mut values = vec![self.value(def, op)?];
            loop {
                match self.peek() {
                    Some(Token::Comma) => {
                        self.pos += 1;
                        values.push(self.value(def, op)?);
                    }
                    Some(Token::RParen) => {
                        self.pos += 1;
                        break;
                    }
                    other => return Err(unexpected(other, "',' or ')' in the value list")),
                }
            }
            self.pieces.push(format!("({})", values.join(", ")));
        } else {
            let value = self.value(def, op)?;
            self.pieces.push(value);
        }

        if depth == 0
            && !negated
            && pins_value(op)
            && def.reference.eq_ignore_ascii_case(refs::TEAM_PROJECT)
        {
            self.pins_project = true;
        }
        Ok(())
    }

    /// Read and render one operand for `def`
    fn value(&mut self, def: &FieldDef, op: Operator) -> Result<String, CompileError> {
        let field = def.reference.as_str();
        let token = self.peek();
        self.pos += 1;

        match token {
            Some(Token::Literal(body)) => {
                let text = unescape(body).map_err(malformed)?;
                if is_search_operator(op) && text.trim().is_empty() {
                    return Err(CompileError::invalid(field, format!("{} needs a non-blank value", op)));
                }
                render_value(def, &Literal::Text(text), self.ctx)
            }
            Some(Token::Symbol(sign)) if sign == "-" => match self.peek() {
                Some(Token::Number(n)) => {
                    self.pos += 1;
                    self.number(def, &format!("-{}", n))
                }
                other => Err(unexpected(other, "a number after '-'")),
            },
            Some(Token::Number(n)) => self.number(def, n),
            Some(Token::Macro(name)) => {
                let mut text = name.clone();
                if let (Some(Token::Symbol(sign)), Some(Token::Number(n))) =
                    (self.peek(), self.tokens.get(self.pos + 1))
                {
                    if sign == "+" || sign == "-" {
                        text = format!("{} {} {}", name, sign, n);
                        self.pos += 2;
                    }
                }
                let canonical =
                    canonical_macro(&text).ok_or_else(|| malformed(format!("unknown macro '{}'", text)))?;
                if !macro_suits(&canonical, def) {
                    return Err(CompileError::invalid(
                        field,
                        format!("{} cannot stand for a {} value", canonical, def.value_type),
                    ));
                }
                Ok(canonical)
            }
            Some(Token::Field(other)) => {
                let other = self.registry.resolve(other)?;
                quote_field(&other.reference).map_err(malformed)
            }
            other => Err(unexpected(other, &format!("a value after [{}] {}", field, op))),
        }
    }

    fn number(&self, def: &FieldDef, text: &str) -> Result<String, CompileError> {
        if let Ok(n) = text.parse::<i64>() {
            return render_value(def, &Literal::Integer(n), self.ctx);
        }
        if def.value_type == ValueType::Integer && text.parse::<f64>().is_ok() {
            return Ok(text.to_string());
        }
        Err(CompileError::invalid(
            &def.reference,
            format!("'{}' is not a valid {} value", text, def.value_type),
        ))
    }
}

/// Validate a WHERE fragment and rewrite it in canonical spelling
///
/// Operands are rendered the way filter predicates are, so relative
/// dates resolve against `ctx` and mistyped literals are refused.
pub(crate) fn normalize(
    input: &str,
    registry: &FieldRegistry,
    ctx: &CompileContext,
) -> Result<Fragment, CompileError> {
    let mut tokens = lex(input)?;
    if matches!(tokens.first(), Some(Token::Word(w)) if w.eq_ignore_ascii_case("WHERE")) {
        tokens.remove(0);
    }
    if tokens.is_empty() {
        return Err(malformed("empty WHERE clause"));
    }

    let mut depth = 0usize;
    for token in &tokens {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| malformed("unbalanced ')'"))?;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(malformed("unbalanced '('"));
    }

    let mut reader = Reader {
        tokens: &tokens,
        pos: 0,
        registry,
        ctx,
        pieces: Vec::with_capacity(tokens.len()),
        pins_project: false,
        top_level_or: false,
    };
    reader.expr(0, false)?;
    if let Some(token) = reader.peek() {
        return Err(unexpected(Some(token), "AND, OR or the end of the clause"));
    }

    Ok(Fragment {
        text: join_pieces(&reader.pieces),
        scoped: reader.pins_project && !reader.top_level_or,
    })
}

fn join_pieces(pieces: &[String]) -> String {
    let mut out = String::new();
    for piece in pieces {
        let tight = piece == ")" || out.ends_with('(') || out.is_empty();
        if !tight {
            out.push(' ');
        }
        out.push_str(piece);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn normalize_std(input: &str) -> Result<Fragment, CompileError> {
        let ctx = CompileContext::new(None).with_today(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        normalize(input, &FieldRegistry::standard(), &ctx)
    }

    #[test]
    fn test_lex_keeps_doubled_quotes_inside_literal() {
        let tokens = lex("[System.Title] = 'it''s'").unwrap();
        assert_eq!(tokens[2], Token::Literal("it''s".to_string()));
    }

    #[test]
    fn test_normalizes_spelling() {
        let fragment =
            normalize_std("where [state] not in ('Closed','Removed') and [Priority] <= 2").unwrap();
        assert_eq!(
            fragment.text,
            "[System.State] NOT IN ('Closed', 'Removed') AND [Microsoft.VSTS.Common.Priority] <= 2"
        );
        assert!(!fragment.scoped);
    }

    #[test]
    fn test_detects_explicit_scope() {
        let fragment = normalize_std("[System.TeamProject] = 'Contoso' AND [System.Id] > 5").unwrap();
        assert!(fragment.scoped);

        let fragment = normalize_std("[System.TeamProject] IN ('A', 'B') AND NOT [System.State] = 'Closed'")
            .unwrap();
        assert!(fragment.scoped);
        assert_eq!(
            fragment.text,
            "[System.TeamProject] IN ('A', 'B') AND NOT [System.State] = 'Closed'"
        );
    }

    #[test]
    fn test_project_constraint_that_does_not_pin_scope() {
        for clause in [
            "[System.TeamProject] = 'A' OR [System.State] = 'Active'",
            "[System.State] = 'Active' OR [System.TeamProject] = 'A'",
            "[System.TeamProject] <> 'A'",
            "[System.TeamProject] NOT IN ('A', 'B')",
            "[System.TeamProject] CONTAINS 'A'",
            "NOT [System.TeamProject] = 'A'",
            "NOT ([System.TeamProject] = 'A' AND [System.Id] > 5)",
            "([System.TeamProject] = 'A' OR [System.TeamProject] = 'B')",
        ] {
            let fragment = normalize_std(clause).unwrap();
            assert!(!fragment.scoped, "treated as scoped: {}", clause);
        }
    }

    #[test]
    fn test_nested_or_keeps_top_level_scope() {
        let fragment = normalize_std(
            "[System.TeamProject] = 'A' AND ([System.State] = 'Active' OR [System.State] = 'New')",
        )
        .unwrap();
        assert!(fragment.scoped);
        assert_eq!(
            fragment.text,
            "[System.TeamProject] = 'A' AND ([System.State] = 'Active' OR [System.State] = 'New')"
        );
    }

    #[test]
    fn test_macros_are_canonicalized() {
        let fragment =
            normalize_std("[System.AssignedTo] = @me AND [System.ChangedDate] >= @today - 7").unwrap();
        assert_eq!(
            fragment.text,
            "[System.AssignedTo] = @Me AND [System.ChangedDate] >= @Today - 7"
        );
        assert!(matches!(
            normalize_std("[System.ChangedDate] >= @Tomorrow"),
            Err(CompileError::MalformedFragment(_))
        ));
    }

    #[test]
    fn test_rejects_statement_escapes() {
        for bad in [
            "[System.Id] = 1; DELETE",
            "[System.Id] = 1 ORDER BY [System.Id]",
            "[System.Title] = 'open",
            "([System.Id] = 1",
            "[System.Id] = 1)",
            "[System.Id = 1",
            "[System.Id] = 1 UNION SELECT",
            "",
            "WHERE",
            "[System.Id] = = 5 5",
            "[System.Id] = 5 5",
            "[System.Id] = 5 [System.State] = 'Active'",
            "[System.Id] =",
            "[System.Id] IN 5",
            "[System.Id] IN (5,)",
            "[System.Id] IN ()",
            "[System.State] = 'Active' AND",
            "AND [System.State] = 'Active'",
            "[System.State] = 'Active' AND OR [System.Id] = 1",
            "'Active' = [System.State]",
            "[System.State] = 'Active', 'New'",
            "[System.AssignedTo] = @Me + 1",
        ] {
            assert!(
                matches!(normalize_std(bad), Err(CompileError::MalformedFragment(_))),
                "accepted: {}",
                bad
            );
        }
    }

    #[test]
    fn test_rejects_mistyped_values() {
        for bad in [
            "[Priority] = 'abc'",
            "[ChangedDate] > 'notadate'",
            "[System.Id] IN (1, 'two')",
            "[System.ChangedDate] > 5",
            "[System.State] = @Me",
            "[System.AssignedTo] = @Today",
            "[System.ChangedDate] >= @CurrentIteration",
            "[System.State] = @Project",
            "[System.Title] CONTAINS ''",
        ] {
            assert!(
                matches!(normalize_std(bad), Err(CompileError::InvalidValue { .. })),
                "accepted: {}",
                bad
            );
        }
    }

    #[test]
    fn test_values_render_like_filter_predicates() {
        let fragment = normalize_std(
            "[Priority] = '2' AND [ChangedDate] >= 'last quarter' AND [AssignedTo] = 'me' \
             AND [System.TeamProject] = @project AND [Effort] > 2.5 AND [StackRank] > -3",
        )
        .unwrap();
        assert_eq!(
            fragment.text,
            "[Microsoft.VSTS.Common.Priority] = 2 AND [System.ChangedDate] >= '2024-01-01' \
             AND [System.AssignedTo] = @Me AND [System.TeamProject] = @Project \
             AND [Microsoft.VSTS.Scheduling.Effort] > 2.5 AND [Microsoft.VSTS.Common.StackRank] > -3"
        );
        assert!(fragment.scoped);

        let fragment = normalize_std("[System.Title] = 'it''s' AND [System.ChangedDate] > [System.CreatedDate]")
            .unwrap();
        assert_eq!(
            fragment.text,
            "[System.Title] = 'it''s' AND [System.ChangedDate] > [System.CreatedDate]"
        );
    }

    #[test]
    fn test_rejects_unknown_field_and_bad_operator() {
        assert!(matches!(
            normalize_std("[Mood] = 'happy'"),
            Err(CompileError::UnknownField(_))
        ));
        assert!(matches!(
            normalize_std("[System.AreaPath] = 'X'"),
            Err(CompileError::OperatorTypeMismatch { .. })
        ));
        assert!(matches!(
            normalize_std("[System.State] WAS EVER 'Active'"),
            Err(CompileError::MalformedFragment(_))
        ));
    }
}
