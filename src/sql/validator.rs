//! Heuristic pre-flight checks for generated SQL.
//!
//! This is not a parser. Each check targets one malformation that missing
//! or sentinel fields produce upstream; valid but unusual SQL may be
//! flagged (an unescaped apostrophe in a name) and other problems may be
//! missed.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// One detected problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlIssue {
    /// Odd number of `'` characters.
    UnterminatedString,
    /// `'undefined'` or `undefined,` reached the SQL text.
    SentinelLeak,
    /// `, )` or `,)`.
    OrphanComma,
    /// `'',`, `,''` or `'';`. Reported as an error to force upstream to
    /// emit `NULL` instead.
    EmptyLiteral,
}

impl fmt::Display for SqlIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            SqlIssue::UnterminatedString => "unterminated string literal",
            SqlIssue::SentinelLeak => "sentinel value leaked into SQL",
            SqlIssue::OrphanComma => "orphan comma before closing parenthesis",
            SqlIssue::EmptyLiteral => "empty string where NULL was intended",
        };
        f.write_str(message)
    }
}

/// Outcome of [`validate`]. Advisory only; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<SqlIssue>,
}

impl ValidationResult {
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

fn sentinel_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"'undefined'|undefined,").expect("static pattern"))
}

fn quoted_undefined() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"'undefined'").expect("static pattern"))
}

fn has_orphan_comma(sql: &str) -> bool {
    sql.contains(", )") || sql.contains(",)")
}

/// Run every check against `sql`. Checks are independent; several may fire.
pub fn validate(sql: &str) -> ValidationResult {
    let mut errors = Vec::new();

    if sql.matches('\'').count() % 2 != 0 {
        errors.push(SqlIssue::UnterminatedString);
    }
    if sentinel_pattern().is_match(sql) {
        errors.push(SqlIssue::SentinelLeak);
    }
    if has_orphan_comma(sql) {
        errors.push(SqlIssue::OrphanComma);
    }
    if sql.contains("'',") || sql.contains(",''") || sql.contains("'';") {
        errors.push(SqlIssue::EmptyLiteral);
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// A quote toggling a string literal open or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuoteEvent {
    /// Character offset of the quote.
    pub position: usize,
    pub opens: bool,
}

/// Operator-facing dump of a SQL text that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlDiagnostics {
    pub quote_count: usize,
    pub quote_trace: Vec<QuoteEvent>,
    pub unclosed_string: bool,
    pub undefined_tokens: usize,
    pub has_empty_literal: bool,
    pub has_orphan_comma: bool,
}

impl SqlDiagnostics {
    pub fn analyze(sql: &str) -> Self {
        let mut in_string = false;
        let mut quote_trace = Vec::new();
        for (position, ch) in sql.chars().enumerate() {
            if ch == '\'' {
                in_string = !in_string;
                quote_trace.push(QuoteEvent {
                    position,
                    opens: in_string,
                });
            }
        }

        Self {
            quote_count: quote_trace.len(),
            quote_trace,
            unclosed_string: in_string,
            undefined_tokens: quoted_undefined().find_iter(sql).count(),
            has_empty_literal: sql.contains("''"),
            has_orphan_comma: has_orphan_comma(sql),
        }
    }

    pub fn quotes_balanced(&self) -> bool {
        self.quote_count % 2 == 0
    }
}

impl fmt::Display for SqlDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "single quotes: {} ({})",
            self.quote_count,
            if self.quotes_balanced() { "even" } else { "odd" }
        )?;
        for event in &self.quote_trace {
            let action = if event.opens { "opened" } else { "closed" };
            writeln!(f, "  string {} at position {}", action, event.position)?;
        }
        if self.unclosed_string {
            writeln!(f, "unclosed string literal")?;
        }
        writeln!(f, "'undefined' tokens: {}", self.undefined_tokens)?;
        if self.has_empty_literal {
            writeln!(f, "empty literals present, consider NULL")?;
        }
        if self.has_orphan_comma {
            writeln!(f, "orphan comma present")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_statement() {
        let result = validate(
            "INSERT INTO hospitais (codigo, nome) VALUES ('H1', 'Hosp A') ON CONFLICT (codigo) DO NOTHING;",
        );
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_odd_quotes() {
        let result = validate("INSERT INTO t (a) VALUES ('O'Brien');");
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec![SqlIssue::UnterminatedString]);
        assert!(result.messages()[0].contains("unterminated"));
    }

    #[test]
    fn test_escaped_apostrophe_passes() {
        assert!(validate("INSERT INTO t (a) VALUES ('O''Brien');").is_valid);
    }

    #[test]
    fn test_orphan_comma() {
        let result = validate("INSERT INTO t (a,b) VALUES (1, );");
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec![SqlIssue::OrphanComma]);
        assert!(result.messages()[0].contains("orphan comma"));
        assert!(!validate("INSERT INTO t (a,b) VALUES (1,);").is_valid);
    }

    #[test]
    fn test_sentinel_leak() {
        let quoted = validate("INSERT INTO t (a, b) VALUES ('undefined', 1);");
        assert_eq!(quoted.errors, vec![SqlIssue::SentinelLeak]);

        let bare = validate("INSERT INTO t (a, b) VALUES (undefined, 1);");
        assert_eq!(bare.errors, vec![SqlIssue::SentinelLeak]);
    }

    #[test]
    fn test_empty_literal() {
        let result = validate("INSERT INTO t (a, b) VALUES ('', 'x');");
        assert_eq!(result.errors, vec![SqlIssue::EmptyLiteral]);
        assert!(!validate("SELECT '';").is_valid);
    }

    #[test]
    fn test_checks_accumulate() {
        let result = validate("INSERT INTO t (a, b, c) VALUES ('undefined', '', );");
        assert_eq!(
            result.errors,
            vec![SqlIssue::SentinelLeak, SqlIssue::OrphanComma, SqlIssue::EmptyLiteral]
        );
    }

    #[test]
    fn test_diagnostics_trace() {
        let diag = SqlDiagnostics::analyze("VALUES ('a', 'b)");
        assert_eq!(diag.quote_count, 3);
        assert!(!diag.quotes_balanced());
        assert!(diag.unclosed_string);
        assert_eq!(
            diag.quote_trace[..2],
            [
                QuoteEvent { position: 8, opens: true },
                QuoteEvent { position: 10, opens: false }
            ]
        );
        let dump = diag.to_string();
        assert!(dump.contains("single quotes: 3 (odd)"));
        assert!(dump.contains("unclosed string literal"));
    }

    #[test]
    fn test_diagnostics_counts_undefined_tokens() {
        let diag = SqlDiagnostics::analyze("VALUES ('undefined', 'undefined', '')");
        assert_eq!(diag.undefined_tokens, 2);
        assert!(diag.has_empty_literal);
        assert!(!diag.has_orphan_comma);
    }
}
