//! Transaction-control detection for migration content
//!
//! Every step runs its payload inside a transaction the driver opened. A
//! payload that commits or rolls back on its own ends that transaction
//! early, and the ledger write after it would land outside any
//! transaction. Such payloads are refused before they touch the store.
//!
//! The scan is lexical: comments and quoted text are skipped, and only the
//! first keyword of each top-level statement is inspected. Trigger bodies
//! (`BEGIN ... END` inside `CREATE TRIGGER`) and `CASE ... END` expressions
//! do not split statements.

const CONTROL_KEYWORDS: &[&str] = &["BEGIN", "COMMIT", "END", "ABORT", "START"];

/// Keyword of the first statement in `sql` that opens or ends a transaction
pub(crate) fn transaction_control(sql: &str) -> Option<&'static str> {
    let mut chars = sql.char_indices().peekable();
    let mut at_start = true;
    let mut depth = 0usize;
    let mut create = false;
    let mut trigger = false;
    // `ROLLBACK` seen at statement start; `ROLLBACK TO <savepoint>` is allowed
    let mut rollback = false;

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '-' if matches!(chars.peek(), Some((_, '-'))) => {
                for (_, n) in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut star = false;
                for (_, n) in chars.by_ref() {
                    if star && n == '/' {
                        break;
                    }
                    star = n == '*';
                }
            }
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                for (_, n) in chars.by_ref() {
                    if n == close {
                        break;
                    }
                }
                at_start = false;
            }
            ';' => {
                if rollback {
                    return Some("ROLLBACK");
                }
                if depth == 0 {
                    at_start = true;
                    create = false;
                    trigger = false;
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, n)) = chars.peek() {
                    if !(n.is_alphanumeric() || n == '_' || n == '$') {
                        break;
                    }
                    end = i + n.len_utf8();
                    chars.next();
                }
                let word = sql[start..end].to_ascii_uppercase();

                if rollback {
                    match word.as_str() {
                        "TRANSACTION" => {}
                        "TO" => rollback = false,
                        _ => return Some("ROLLBACK"),
                    }
                } else if at_start {
                    at_start = false;
                    create = word == "CREATE";
                    if word == "ROLLBACK" {
                        rollback = true;
                    } else if let Some(keyword) =
                        CONTROL_KEYWORDS.iter().find(|k| **k == word.as_str())
                    {
                        return Some(*keyword);
                    }
                } else {
                    match word.as_str() {
                        "TRIGGER" if create => trigger = true,
                        "BEGIN" if trigger => depth += 1,
                        "CASE" => depth += 1,
                        "END" => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                }
            }
            _ => at_start = false,
        }
    }

    rollback.then_some("ROLLBACK")
}
