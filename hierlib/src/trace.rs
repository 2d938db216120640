use std::fmt;
use std::io::BufRead;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::TraceError;
use crate::hierarchy::AccessKind;

lazy_static! {
    // `<address> <kind>`, address in hex with an optional 0x prefix
    static ref TRACE_LINE: Regex =
        Regex::new(r"^\s*(?:0[xX])?(?P<address>[0-9a-fA-F]+)\s+(?P<kind>[IiDd])\s*$").unwrap();
}

/// One access from a trace
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TraceRecord {
    pub kind: AccessKind,
    pub address: u32,
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            AccessKind::Instruction => 'I',
            AccessKind::Data => 'D',
        };
        write!(f, "{:#010x} {kind}", self.address)
    }
}

/// Parses a single trace line
///
/// Blank lines and lines starting with `#` carry no access and give `None`
///
/// # Arguments
///
/// * `line_number`: 1-based line number, used for error reporting
/// * `line`: The line, with or without its line terminator
///
/// returns: Result<Option<TraceRecord>, TraceError>
///
/// # Examples
///
/// ```
/// use hierlib::hierarchy::AccessKind;
/// use hierlib::trace::parse_line;
/// let record = parse_line(1, "0x0040a1c8 I").unwrap().unwrap();
/// assert_eq!(record.kind, AccessKind::Instruction);
/// assert_eq!(record.address, 0x0040_a1c8);
/// ```
pub fn parse_line(line_number: usize, line: &str) -> Result<Option<TraceRecord>, TraceError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let captures = TRACE_LINE.captures(trimmed).ok_or_else(|| TraceError::Malformed {
        line: line_number,
        content: trimmed.to_string(),
    })?;
    let digits = &captures["address"];
    let address = u32::from_str_radix(digits, 16).map_err(|_| TraceError::AddressOutOfRange {
        line: line_number,
        address: digits.to_string(),
    })?;
    let kind = match &captures["kind"] {
        "I" | "i" => AccessKind::Instruction,
        _ => AccessKind::Data,
    };
    Ok(Some(TraceRecord { kind, address }))
}

/// Reads trace records one line at a time, reusing a single line buffer
pub struct TraceReader<R: BufRead> {
    reader: R,
    buffer: String,
    line_number: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buffer: String::new(), line_number: 0 }
    }

    /// Number of lines read so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_number += 1;
            match parse_line(self.line_number, &self.buffer) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_kinds_with_and_without_prefix() {
        assert_eq!(parse_line(1, "0x10 D\n").unwrap(), Some(TraceRecord { kind: AccessKind::Data, address: 0x10 }));
        assert_eq!(parse_line(1, "  7fff0000   i  ").unwrap(),
                   Some(TraceRecord { kind: AccessKind::Instruction, address: 0x7fff_0000 }));
        assert_eq!(parse_line(1, "FFFFFFFF d").unwrap(), Some(TraceRecord { kind: AccessKind::Data, address: u32::MAX }));
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(parse_line(1, "").unwrap(), None);
        assert_eq!(parse_line(2, "   \r\n").unwrap(), None);
        assert_eq!(parse_line(3, "# warm up").unwrap(), None);
    }

    #[test]
    fn reports_malformed_lines() {
        for bad in ["0x10", "I 0x10", "0x10 X", "0xZZ D", "0x10 D extra"] {
            match parse_line(4, bad) {
                Err(TraceError::Malformed { line, content }) => {
                    assert_eq!(line, 4);
                    assert_eq!(content, bad);
                }
                other => panic!("expected a malformed line error for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn reports_addresses_wider_than_32_bits() {
        match parse_line(9, "0x100000000 I") {
            Err(TraceError::AddressOutOfRange { line: 9, address }) => assert_eq!(address, "100000000"),
            other => panic!("expected an out of range error, got {other:?}"),
        }
    }

    #[test]
    fn reader_counts_lines_including_skipped_ones() {
        let trace = "# header\n0x0 I\n\n0x40 D\nbogus\n";
        let mut reader = TraceReader::new(trace.as_bytes());
        assert_eq!(reader.next().unwrap().unwrap(), TraceRecord { kind: AccessKind::Instruction, address: 0 });
        assert_eq!(reader.next().unwrap().unwrap(), TraceRecord { kind: AccessKind::Data, address: 0x40 });
        assert!(matches!(reader.next(), Some(Err(TraceError::Malformed { line: 5, .. }))));
        assert!(reader.next().is_none());
        assert_eq!(reader.line_number(), 5);
    }

    #[test]
    fn records_display_in_trace_format() {
        let record = TraceRecord { kind: AccessKind::Data, address: 0xbeef };
        assert_eq!(record.to_string(), "0x0000beef D");
        assert_eq!(parse_line(1, &record.to_string()).unwrap(), Some(record));
    }
}
