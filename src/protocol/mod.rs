/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

//! # The wire codec
//!
//! Requests are arrays of bulk strings: `*<n>\r\n` followed by `n` elements
//! of the form `$<len>\r\n<len bytes>\r\n`. Replies are one of five tagged
//! shapes (`+`, `-`, `:`, `$`, `*`) — see [`reply::Reply`].
//!
//! [`Parser`] is pessimistic and cheap to retry: it never blocks and never
//! consumes bytes from the caller's buffer on failure. On [`ParseError::NotEnough`]
//! the caller should read more bytes and call it again; on
//! [`ParseError::BadPacket`] the request is irrecoverably malformed and the
//! connection must be closed.

pub mod reply;
#[cfg(test)]
mod tests;

pub use reply::Reply;

use bytes::Bytes;

/// One fully-parsed request: the verb followed by its arguments, each a
/// binary-safe byte string.
pub type Request = Vec<Bytes>;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer does not yet hold a complete request; read more and retry.
    NotEnough,
    /// The bytes present could never form a valid request; close the connection.
    BadPacket,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// A cursor over a request buffer. Never mutates or takes ownership of the
/// buffer; on success, returns how many leading bytes were consumed so the
/// caller can advance its own `BytesMut`.
pub struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Parse exactly one request, returning the request and the number of
    /// bytes consumed from the front of the buffer.
    pub fn parse(mut self) -> ParseResult<(Request, usize)> {
        if self.buf.is_empty() {
            return Err(ParseError::NotEnough);
        }
        if self.next_byte()? != b'*' {
            return Err(ParseError::BadPacket);
        }
        let count = self.read_usize_line()?;
        if count >= (1 << 32) {
            // absurd for a request array; reject rather than allocate
            return Err(ParseError::BadPacket);
        }
        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            elements.push(self.parse_bulk_string()?);
        }
        Ok((elements, self.pos))
    }

    fn next_byte(&mut self) -> ParseResult<u8> {
        let b = *self.buf.get(self.pos).ok_or(ParseError::NotEnough)?;
        self.pos += 1;
        Ok(b)
    }

    fn peek_byte(&self) -> ParseResult<u8> {
        self.buf.get(self.pos).copied().ok_or(ParseError::NotEnough)
    }

    /// Read an unsigned decimal line terminated by `\r\n`, not including the
    /// terminator. Rejects non-digit bytes and empty lines.
    fn read_usize_line(&mut self) -> ParseResult<usize> {
        let start = self.pos;
        loop {
            match self.peek_byte()? {
                b'\r' => break,
                b if b.is_ascii_digit() => {
                    self.pos += 1;
                }
                _ => return Err(ParseError::BadPacket),
            }
        }
        if self.pos == start {
            // an empty length line is malformed
            return Err(ParseError::BadPacket);
        }
        let digits = &self.buf[start..self.pos];
        self.expect_crlf()?;
        let mut value: usize = 0;
        for &d in digits {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add((d - b'0') as usize))
                .ok_or(ParseError::BadPacket)?;
        }
        if value >= (1usize << 63) {
            return Err(ParseError::BadPacket);
        }
        Ok(value)
    }

    fn expect_crlf(&mut self) -> ParseResult<()> {
        if self.peek_byte()? != b'\r' {
            return Err(ParseError::BadPacket);
        }
        self.pos += 1;
        if self.next_byte()? != b'\n' {
            return Err(ParseError::BadPacket);
        }
        Ok(())
    }

    fn parse_bulk_string(&mut self) -> ParseResult<Bytes> {
        if self.next_byte()? != b'$' {
            return Err(ParseError::BadPacket);
        }
        let len = self.read_usize_line()?;
        let end = self.pos.checked_add(len).ok_or(ParseError::BadPacket)?;
        let payload = self.buf.get(self.pos..end).ok_or(ParseError::NotEnough)?;
        let payload = Bytes::copy_from_slice(payload);
        self.pos = end;
        self.expect_crlf()?;
        Ok(payload)
    }
}
