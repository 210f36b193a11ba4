//! Purpose: Define the line <-> row transform used by the store.
//! Exports: `LineFormat`, `Row`, `DEFAULT_DELIMITER`, `LINE_TERMINATOR`.
//! Role: Pure split/join helpers; no I/O.
//! Invariants: An empty line is a row with zero fields, so zero-column writes round-trip.
//! Invariants: No quoting or escaping; fields holding the delimiter or a newline do not round-trip.

use crate::core::error::{Error, ErrorKind};

pub const DEFAULT_DELIMITER: &str = "\t";
pub const LINE_TERMINATOR: &str = "\n";

pub type Row = Vec<String>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineFormat {
    delimiter: String,
}

impl Default for LineFormat {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

impl LineFormat {
    pub fn new(delimiter: impl Into<String>) -> Result<Self, Error> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("delimiter must not be empty"));
        }
        if delimiter.contains(['\n', '\r']) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("delimiter must not contain a line terminator"));
        }
        Ok(Self { delimiter })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Splits one raw line into fields. A single trailing `\n` or `\r\n` is
    /// dropped first; nothing else is trimmed.
    pub fn split_line(&self, line: &str) -> Row {
        let line = strip_terminator(line);
        if line.is_empty() {
            return Row::new();
        }
        line.split(self.delimiter.as_str())
            .map(str::to_string)
            .collect()
    }

    /// Joins fields into one terminated line.
    pub fn join_row<I, S>(&self, columns: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = String::new();
        for (idx, column) in columns.into_iter().enumerate() {
            if idx > 0 {
                line.push_str(&self.delimiter);
            }
            line.push_str(column.as_ref());
        }
        line.push_str(LINE_TERMINATOR);
        line
    }
}

fn strip_terminator(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::{LineFormat, Row};
    use crate::core::error::ErrorKind;

    #[test]
    fn split_on_tab_by_default() {
        let format = LineFormat::default();
        assert_eq!(format.split_line("a\tb\tc\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn line_without_delimiter_is_single_field() {
        let format = LineFormat::default();
        assert_eq!(format.split_line("solo\n"), vec!["solo"]);
    }

    #[test]
    fn empty_line_is_zero_fields() {
        let format = LineFormat::default();
        assert_eq!(format.split_line("\n"), Row::new());
        assert_eq!(format.split_line(""), Row::new());
        assert_eq!(format.split_line("\r\n"), Row::new());
    }

    #[test]
    fn empty_fields_and_whitespace_are_preserved() {
        let format = LineFormat::default();
        assert_eq!(
            format.split_line("\t x \t\n"),
            vec!["".to_string(), " x ".to_string(), "".to_string()]
        );
    }

    #[test]
    fn crlf_terminator_is_stripped_once() {
        let format = LineFormat::default();
        assert_eq!(format.split_line("a\tb\r\n"), vec!["a", "b"]);
        assert_eq!(format.split_line("a\tb\r\r\n"), vec!["a", "b\r"]);
    }

    #[test]
    fn join_adds_terminator() {
        let format = LineFormat::default();
        assert_eq!(format.join_row(["a", "b", "c"]), "a\tb\tc\n");
        assert_eq!(format.join_row(Vec::<String>::new()), "\n");
    }

    #[test]
    fn multi_char_delimiter() {
        let format = LineFormat::new("::").expect("format");
        assert_eq!(format.join_row(["x", "y"]), "x::y\n");
        assert_eq!(format.split_line("x::y::\n"), vec!["x", "y", ""]);
    }

    #[test]
    fn bad_delimiters_are_rejected() {
        for delimiter in ["", "\n", ",\r"] {
            let err = LineFormat::new(delimiter).expect_err("bad delimiter");
            assert_eq!(err.kind(), ErrorKind::Usage);
        }
    }
}
