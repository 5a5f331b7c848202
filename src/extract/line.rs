//! Fixed-structure line scanner
//!
//! Recognizes `<tag>{heater: N, fan: N, input: F, error: F}` anywhere in a
//! line. The heater and fan fields are unsigned digit runs, `input` is a run
//! of digits and dots, `error` additionally allows a minus sign.

/// Numeric fields captured from one matching line
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct LineFields {
    pub heater: i64,
    pub input: f64,
    pub error: f64,
}

/// Scan `line` for the first occurrence of `tag` followed by a well-formed
/// field block.
///
/// Later occurrences are tried when an earlier one is malformed. Captured text
/// that does not convert to a number (e.g. `1.2.3`) counts as no match.
pub(super) fn scan(line: &str, tag: &str) -> Option<LineFields> {
    line.match_indices(tag)
        .find_map(|(start, _)| parse_fields(&line[start + tag.len()..]))
}

fn parse_fields(rest: &str) -> Option<LineFields> {
    let mut cursor = Cursor { rest };

    let heater = cursor.take_while(|c| c.is_ascii_digit())?;
    cursor.consume(", fan: ")?;
    cursor.take_while(|c| c.is_ascii_digit())?;
    cursor.consume(", input: ")?;
    let input = cursor.take_while(|c| c.is_ascii_digit() || c == '.')?;
    cursor.consume(", error: ")?;
    let error = cursor.take_while(|c| c.is_ascii_digit() || c == '.' || c == '-')?;
    cursor.consume("}")?;

    Some(LineFields {
        heater: heater.parse().ok()?,
        input: input.parse().ok()?,
        error: error.parse().ok()?,
    })
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    /// Consume a literal prefix
    fn consume(&mut self, literal: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(literal)?;
        Some(())
    }

    /// Consume the longest non-empty prefix whose chars satisfy `pred`
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> Option<&'a str> {
        let end = self
            .rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map_or(self.rest.len(), |(i, _)| i);
        if end == 0 {
            return None;
        }
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }
}
