/// Converts a byte index within a single line into a 1-based character column.
///
/// Indices past the end of the line map to the column just after the last character,
/// which is where a caret for "missing something at end of line" belongs.
pub fn column_of(line: &str, byte_index: usize) -> usize {
    let end = byte_index.min(line.len());
    line.get(..end).map_or(end, |prefix| prefix.chars().count()) + 1
}

/// Renders the classic caret diagnostic used by lex and parse errors:
///
/// ```text
/// A key must always be followed by a colon.
/// on line 3, column 8:
/// foo bar
///        ^
/// ```
pub fn caret_snippet(message: &str, line_text: &str, line: usize, column: usize) -> String {
    let arrow = " ".repeat(column.saturating_sub(1));
    format!("{message}\non line {line}, column {column}:\n{line_text}\n{arrow}^")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_counts_chars_not_bytes() {
        assert_eq!(column_of("abc", 0), 1);
        assert_eq!(column_of("abc", 2), 3);
        assert_eq!(column_of("åbc", 2), 2);
        assert_eq!(column_of("abc", 10), 4);
    }

    #[test]
    fn snippet_points_at_column() {
        let snippet = caret_snippet("oops", "foo bar", 3, 8);
        assert_eq!(snippet, "oops\non line 3, column 8:\nfoo bar\n       ^");
    }
}
