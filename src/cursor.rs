//! A line cursor for fixed-offset text formats.
//!
//! Solution files and solver logs put their numbers at known line offsets
//! (a fixed header, then blocks where field `k` sits `n` lines after field
//! `k - 1`). `LineCursor` keeps those offsets explicit: every skip names how
//! many lines it drops, and every read that must succeed reports the source
//! and line number when it does not.

use crate::errors::*;
use regex::{Captures, Regex};
use std::io::{BufRead, Lines};

/// Where a scanner currently is within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Consuming the fixed header.
    Header,
    /// Inside repeated solver statistics blocks.
    Statistics,
    /// At the line that decides the outcome of a run.
    Outcome,
    /// Consuming the per-solution metrics tail.
    Metrics,
    /// Nothing more to read.
    Done,
}

/// Line-by-line reader that tracks its position.
pub struct LineCursor<R> {
    lines: Lines<R>,
    source: String,
    line_no: usize,
}

impl<R: BufRead> LineCursor<R> {
    /// Wraps `reader`; `source` names it in error messages.
    pub fn new(reader: R, source: &str) -> Self {
        LineCursor {
            lines: reader.lines(),
            source: source.to_string(),
            line_no: 0,
        }
    }

    /// Name of the underlying input.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of lines consumed so far.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Next line without its line terminator, or `None` at end of input.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                let mut line = line?;
                if line.ends_with('\r') {
                    line.pop();
                }
                Ok(Some(line))
            }
            None => Ok(None),
        }
    }

    /// Next line; running out of input is a malformed file.
    pub fn expect_line(&mut self) -> Result<String> {
        match self.next_line()? {
            Some(line) => Ok(line),
            None => Err(self.malformed("<end of file>")),
        }
    }

    /// Drops `n` lines. Ending early is fine; the next required read fails.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            if self.next_line()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Drops exactly `n` lines of a fixed header.
    pub fn skip_header(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            if self.next_line()?.is_none() {
                bail!(ErrorKind::FileTooShort(self.source.clone(), n));
            }
        }
        Ok(())
    }

    /// Reads the next line and matches it against `re`.
    pub fn expect_match(&mut self, re: &Regex) -> Result<Vec<String>> {
        let line = self.expect_line()?;
        self.captures(re, &line)
    }

    /// Matches `line` against `re`, returning every capture group as text.
    pub fn captures(&self, re: &Regex, line: &str) -> Result<Vec<String>> {
        match re.captures(line) {
            Some(caps) => Ok(groups(&caps)),
            None => Err(self.malformed(line)),
        }
    }

    /// A `MalformedLine` error at the current position.
    pub fn malformed(&self, line: &str) -> Error {
        let at = format!("{}:{}", self.source, self.line_no);
        ErrorKind::MalformedLine(at, line.to_string()).into()
    }

    /// Remaining lines until end of input.
    pub fn rest(&mut self) -> Result<Vec<String>> {
        let mut rest = Vec::new();
        while let Some(line) = self.next_line()? {
            rest.push(line);
        }
        Ok(rest)
    }
}

fn groups(caps: &Captures) -> Vec<String> {
    caps.iter()
        .skip(1)
        .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
        .collect()
}
