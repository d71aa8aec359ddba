//! Quote-aware splitting of multi-statement SQL scripts.
//!
//! Free-text columns (addresses, specialty lists) routinely contain `;`, so
//! a plain `split(';')` would cut statements in half. The scanner tracks
//! whether it is inside a `'...'` or `"..."` literal and only treats a
//! semicolon outside literals as a terminator.

use super::builder::SqlStatement;

/// Split `script` into trimmed, non-empty statements, in order.
///
/// A quote preceded by a backslash does not toggle the literal state.
/// Terminating semicolons are not included in the returned statements.
///
/// # Example
/// ```
/// use health_ingest::sql::split_statements;
///
/// let statements = split_statements("INSERT INTO t (a) VALUES ('a;b'); SELECT 1;");
/// assert_eq!(statements.len(), 2);
/// assert_eq!(statements[0].as_str(), "INSERT INTO t (a) VALUES ('a;b')");
/// ```
pub fn split_statements(script: &str) -> Vec<SqlStatement> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut open_quote: Option<char> = None;
    let mut prev: Option<char> = None;

    for ch in script.chars() {
        if (ch == '\'' || ch == '"') && prev != Some('\\') {
            match open_quote {
                None => open_quote = Some(ch),
                Some(quote) if quote == ch => open_quote = None,
                Some(_) => {}
            }
        }

        if ch == ';' && open_quote.is_none() {
            push_trimmed(&mut statements, &current);
            current.clear();
        } else {
            current.push(ch);
        }
        prev = Some(ch);
    }
    push_trimmed(&mut statements, &current);

    statements
}

fn push_trimmed(statements: &mut Vec<SqlStatement>, buffer: &str) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        statements.push(SqlStatement::new(trimmed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(script: &str) -> Vec<String> {
        split_statements(script)
            .into_iter()
            .map(SqlStatement::into_string)
            .collect()
    }

    #[test]
    fn test_semicolon_inside_literal() {
        assert_eq!(
            texts("INSERT INTO t (a) VALUES ('a;b');"),
            vec!["INSERT INTO t (a) VALUES ('a;b')"]
        );
    }

    #[test]
    fn test_round_trip_of_joined_statements() {
        let originals = [
            "INSERT INTO hospitais (codigo, nome) VALUES ('H1', 'Hosp A')",
            "INSERT INTO hospitais (codigo, especialidades) VALUES ('H2', 'Cardiologia; Pediatria')",
            "INSERT INTO medicos (codigo) VALUES ('M1')",
        ];
        let script = originals.join("; ");
        assert_eq!(texts(&script), originals.to_vec());
    }

    #[test]
    fn test_double_quoted_identifiers() {
        assert_eq!(
            texts(r#"SELECT "a;b" FROM t; SELECT 1"#),
            vec![r#"SELECT "a;b" FROM t"#, "SELECT 1"]
        );
    }

    #[test]
    fn test_other_quote_inside_literal_is_content() {
        assert_eq!(
            texts(r#"INSERT INTO t (a) VALUES ('say "hi;"'); SELECT 2;"#),
            vec![r#"INSERT INTO t (a) VALUES ('say "hi;"')"#, "SELECT 2"]
        );
    }

    #[test]
    fn test_doubled_quote_escape_keeps_state() {
        assert_eq!(
            texts("INSERT INTO t (a) VALUES ('O''Brien; Jr'); SELECT 3"),
            vec!["INSERT INTO t (a) VALUES ('O''Brien; Jr')", "SELECT 3"]
        );
    }

    #[test]
    fn test_backslash_escaped_quote() {
        assert_eq!(
            texts(r"INSERT INTO t (a) VALUES ('it\'s; fine'); SELECT 4"),
            vec![r"INSERT INTO t (a) VALUES ('it\'s; fine')", "SELECT 4"]
        );
    }

    #[test]
    fn test_trailing_statement_without_semicolon() {
        assert_eq!(texts("SELECT 1;\n  SELECT 2  "), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_empty_statements_dropped() {
        assert_eq!(texts(";;  ;\n;SELECT 1;;"), vec!["SELECT 1"]);
        assert!(texts("").is_empty());
        assert!(texts("   \n").is_empty());
    }
}
