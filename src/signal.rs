//! Signal sources — where input vectors come from.
//!
//! ```text
//! 0.12, 0.98
//! 0.40, 0.51     ─► CsvSignalSource ─► [0.40, 0.51] ─► GngEngine::step
//! ```

use std::io::BufRead;

use crate::{Error, Result};

/// A lazy, possibly infinite, stream of input vectors.
///
/// `Ok(None)` means the stream is exhausted. That ends a run normally.
pub trait SignalSource {
    fn next_signal(&mut self) -> Result<Option<Vec<f64>>>;
}

/// Any iterator of vectors is an infallible source (synthetic streams, tests).
impl<I> SignalSource for I
where
    I: Iterator<Item = Vec<f64>>,
{
    fn next_signal(&mut self) -> Result<Option<Vec<f64>>> {
        Ok(self.next())
    }
}

// ============================================================================
// CsvSignalSource
// ============================================================================

/// Comma-separated records, one vector per line.
///
/// Whitespace around fields is ignored and blank lines are skipped. The
/// first record fixes the arity; every later record must match it. Fields
/// must be finite numbers.
pub struct CsvSignalSource<R: BufRead> {
    reader: R,
    line: usize,
    arity: Option<usize>,
    buf: String,
    peeked: Option<Vec<f64>>,
}

impl<R: BufRead> CsvSignalSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            arity: None,
            buf: String::new(),
            peeked: None,
        }
    }

    /// Look at the next record without consuming it.
    pub fn peek(&mut self) -> Result<Option<&[f64]>> {
        if self.peeked.is_none() {
            self.peeked = self.read_record()?;
        }
        Ok(self.peeked.as_deref())
    }

    /// Field count established by the first record, if one has been read.
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    fn read_record(&mut self) -> Result<Option<Vec<f64>>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            if self.buf.trim().is_empty() {
                continue;
            }
            return self.parse_record().map(Some);
        }
    }

    fn parse_record(&mut self) -> Result<Vec<f64>> {
        let line = self.line;
        let malformed = |message: String| Error::MalformedSignal { line, message };

        let record = self.buf.trim();
        let mut values = Vec::with_capacity(self.arity.unwrap_or(4));
        for (i, field) in record.split(',').enumerate() {
            let field = field.trim();
            let value: f64 = field
                .parse()
                .map_err(|_| malformed(format!("field {} is not a number: {field:?}", i + 1)))?;
            if !value.is_finite() {
                return Err(malformed(format!("field {} is not finite: {field:?}", i + 1)));
            }
            values.push(value);
        }

        match self.arity {
            Some(expected) if expected != values.len() => Err(malformed(format!(
                "expected {expected} fields, found {}",
                values.len()
            ))),
            Some(_) => Ok(values),
            None => {
                self.arity = Some(values.len());
                Ok(values)
            }
        }
    }
}

impl<R: BufRead> SignalSource for CsvSignalSource<R> {
    fn next_signal(&mut self) -> Result<Option<Vec<f64>>> {
        match self.peeked.take() {
            Some(signal) => Ok(Some(signal)),
            None => self.read_record(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(text: &str) -> CsvSignalSource<Cursor<Vec<u8>>> {
        CsvSignalSource::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_reads_records_until_exhausted() {
        let mut s = source("0.5, 1.5\n  2,3\n\n-1e-3 ,4\n");
        assert_eq!(s.next_signal().unwrap(), Some(vec![0.5, 1.5]));
        assert_eq!(s.next_signal().unwrap(), Some(vec![2.0, 3.0]));
        assert_eq!(s.next_signal().unwrap(), Some(vec![-0.001, 4.0]));
        assert_eq!(s.next_signal().unwrap(), None);
        assert_eq!(s.arity(), Some(2));
    }

    #[test]
    fn test_last_line_without_newline() {
        let mut s = source("1,2\n3,4");
        s.next_signal().unwrap();
        assert_eq!(s.next_signal().unwrap(), Some(vec![3.0, 4.0]));
        assert_eq!(s.next_signal().unwrap(), None);
    }

    #[test]
    fn test_non_numeric_field_is_malformed() {
        let mut s = source("1,2\n3,abc\n");
        s.next_signal().unwrap();
        match s.next_signal() {
            Err(Error::MalformedSignal { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("field 2"));
            }
            other => panic!("expected MalformedSignal, got {other:?}"),
        }
    }

    #[test]
    fn test_arity_change_is_malformed() {
        let mut s = source("1,2\n3,4,5\n");
        s.next_signal().unwrap();
        assert!(matches!(s.next_signal(), Err(Error::MalformedSignal { line: 2, .. })));
    }

    #[test]
    fn test_non_finite_field_is_malformed() {
        let mut s = source("NaN,1\n");
        assert!(matches!(s.next_signal(), Err(Error::MalformedSignal { line: 1, .. })));
        let mut s = source("inf\n");
        assert!(s.next_signal().is_err());
    }

    #[test]
    fn test_empty_field_is_malformed() {
        let mut s = source("1,,2\n");
        assert!(s.next_signal().is_err());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut s = source("\n1,2,3\n4,5,6\n");
        assert_eq!(s.peek().unwrap(), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(s.peek().unwrap().map(<[f64]>::len), Some(3));
        assert_eq!(s.next_signal().unwrap(), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(s.next_signal().unwrap(), Some(vec![4.0, 5.0, 6.0]));
        assert_eq!(s.peek().unwrap(), None);
    }

    #[test]
    fn test_iterator_source() {
        let mut it = vec![vec![1.0], vec![2.0]].into_iter();
        assert_eq!(it.next_signal().unwrap(), Some(vec![1.0]));
        assert_eq!(it.next_signal().unwrap(), Some(vec![2.0]));
        assert_eq!(it.next_signal().unwrap(), None);
    }
}
