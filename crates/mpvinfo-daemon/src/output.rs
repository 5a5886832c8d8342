//! Status line output
//!
//! Each status update is one newline-terminated line, written with a single
//! `write_all` and flushed right away so the bar sees it without delay.

use std::io::{self, Stdout, Write};

/// Writes status lines, skipping repeats of the previous line
#[derive(Debug)]
pub struct StatusWriter<W: Write> {
    out: W,
    last: Option<String>,
}

impl StatusWriter<Stdout> {
    /// Writer for the process's standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> StatusWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    /// Write `line` unless it equals the last line written
    ///
    /// Returns whether the line was written.
    pub fn emit(&mut self, line: &str) -> io::Result<bool> {
        if self.last.as_deref() == Some(line) {
            return Ok(false);
        }
        self.write_line(line)?;
        Ok(true)
    }

    /// Write `line` unconditionally, used for the final line on shutdown
    pub fn emit_final(&mut self, line: &str) -> io::Result<()> {
        self.write_line(line)
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        self.out.write_all(buf.as_bytes())?;
        self.out.flush()?;
        self.last = Some(line.to_string());
        Ok(())
    }
}
