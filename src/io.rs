//! The token-level I/O collaborator contract.
//!
//! The core never touches a stream directly; it calls through `TokenIo`,
//! which is the only interface spec.md carves out as an external
//! collaborator. `BufferedTokenIo` is the one concrete, ambient
//! implementation this crate ships, so the round-trip properties in
//! spec.md §8 are testable without every caller hand-writing an adapter.

use std::io::{BufRead, Write};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whitespace {
    Space,
    Tab,
    Newline,
}

impl Whitespace {
    fn as_char(self) -> char {
        match self {
            Whitespace::Space => ' ',
            Whitespace::Tab => '\t',
            Whitespace::Newline => '\n',
        }
    }
}

/// Tokenization strictness on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitespacePolicy {
    /// `read_token` fails if the next character is whitespace; whitespace
    /// must be consumed explicitly via `read_whitespace`.
    Exact,
    /// Leading whitespace before a token is skipped automatically, and
    /// `read_whitespace` is a no-op.
    IgnoreWhitespace,
}

/// The interface the generation/validation core consumes for reading and
/// writing token streams. The core only ever calls these five methods.
pub trait TokenIo {
    fn whitespace_policy(&self) -> WhitespacePolicy;
    fn read_token(&mut self) -> Result<String>;
    fn read_whitespace(&mut self, kind: Whitespace) -> Result<()>;
    fn print_token(&mut self, token: &str) -> Result<()>;
    fn print_whitespace(&mut self, kind: Whitespace) -> Result<()>;
}

/// A `TokenIo` over any `BufRead` + `Write` pair.
pub struct BufferedTokenIo<R: BufRead, W: Write> {
    reader: R,
    writer: W,
    policy: WhitespacePolicy,
}

impl<R: BufRead, W: Write> BufferedTokenIo<R, W> {
    pub fn new(reader: R, writer: W, policy: WhitespacePolicy) -> Self {
        BufferedTokenIo { reader, writer, policy }
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        let buf = self
            .reader
            .fill_buf()
            .map_err(|e| Error::failed_precondition(format!("read error: {e}")))?;
        Ok(buf.first().copied())
    }

    fn consume_one(&mut self) {
        self.reader.consume(1);
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        while let Some(b) = self.peek_byte()? {
            if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
                self.consume_one();
            } else {
                break;
            }
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> TokenIo for BufferedTokenIo<R, W> {
    fn whitespace_policy(&self) -> WhitespacePolicy {
        self.policy
    }

    fn read_token(&mut self) -> Result<String> {
        if self.policy == WhitespacePolicy::IgnoreWhitespace {
            self.skip_whitespace()?;
        } else if let Some(b) = self.peek_byte()? {
            if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
                return Err(Error::failed_precondition(
                    "read_token called on whitespace under an exact whitespace policy",
                ));
            }
        }

        let mut token = Vec::new();
        while let Some(b) = self.peek_byte()? {
            if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
                break;
            }
            token.push(b);
            self.consume_one();
        }
        if token.is_empty() {
            return Err(Error::failed_precondition("read_token: no more input"));
        }
        String::from_utf8(token)
            .map_err(|e| Error::failed_precondition(format!("read_token: invalid utf8: {e}")))
    }

    fn read_whitespace(&mut self, kind: Whitespace) -> Result<()> {
        if self.policy == WhitespacePolicy::IgnoreWhitespace {
            self.skip_whitespace()?;
            return Ok(());
        }
        match self.peek_byte()? {
            Some(b) if b == kind.as_char() as u8 => {
                self.consume_one();
                Ok(())
            }
            _ => Err(Error::failed_precondition(format!(
                "expected whitespace {:?} not found",
                kind
            ))),
        }
    }

    fn print_token(&mut self, token: &str) -> Result<()> {
        self.writer
            .write_all(token.as_bytes())
            .map_err(|e| Error::failed_precondition(format!("write error: {e}")))
    }

    fn print_whitespace(&mut self, kind: Whitespace) -> Result<()> {
        self.writer
            .write_all(&[kind.as_char() as u8])
            .map_err(|e| Error::failed_precondition(format!("write error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn io_over(input: &str) -> BufferedTokenIo<Cursor<Vec<u8>>, Vec<u8>> {
        BufferedTokenIo::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), WhitespacePolicy::Exact)
    }

    #[test]
    fn exact_policy_reads_single_token() {
        let mut io = io_over("42");
        assert_eq!(io.read_token().unwrap(), "42");
    }

    #[test]
    fn exact_policy_rejects_leading_whitespace() {
        let mut io = io_over(" 42");
        assert!(io.read_token().is_err());
    }

    #[test]
    fn exact_policy_reads_declared_separator() {
        let mut io = io_over("1 2");
        assert_eq!(io.read_token().unwrap(), "1");
        io.read_whitespace(Whitespace::Space).unwrap();
        assert_eq!(io.read_token().unwrap(), "2");
    }

    #[test]
    fn ignore_whitespace_policy_skips_leading_whitespace() {
        let mut io = BufferedTokenIo::new(
            Cursor::new(b"   42".to_vec()),
            Vec::new(),
            WhitespacePolicy::IgnoreWhitespace,
        );
        assert_eq!(io.read_token().unwrap(), "42");
    }

    #[test]
    fn print_token_and_whitespace_round_trip() {
        let mut io = io_over("");
        io.print_token("hello").unwrap();
        io.print_whitespace(Whitespace::Space).unwrap();
        io.print_token("world").unwrap();
        assert_eq!(io.writer, b"hello world".to_vec());
    }
}
