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

use bytes::{Bytes, BytesMut};

/// A reply value. `write_to` is the only thing callers need: it appends the
/// wire form to an existing output buffer so a connection's write half can
/// accumulate several replies before a single flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK\r\n`-style simple string. Must not itself contain `\r` or `\n`.
    Simple(&'static str),
    /// `-ERR message\r\n`. Owned because error text is built at dispatch time.
    Error(Vec<u8>),
    Integer(i64),
    /// `$-1\r\n` when `None`, `$<len>\r\n<bytes>\r\n` when `Some`.
    Bulk(Option<Bytes>),
    /// `*-1\r\n` when `None` (a "null array" — used nowhere by this server's
    /// own commands but kept for protocol completeness), `*<n>\r\n`
    /// followed by each element's wire form when `Some`.
    Array(Option<Vec<Reply>>),
}

impl Reply {
    pub fn ok() -> Self {
        Self::Simple("OK")
    }

    pub fn nil() -> Self {
        Self::Bulk(None)
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Self::Bulk(Some(data.into()))
    }

    pub fn error(msg: impl Into<Vec<u8>>) -> Self {
        Self::Error(msg.into())
    }

    pub fn array(items: Vec<Reply>) -> Self {
        Self::Array(Some(items))
    }

    pub fn empty_array() -> Self {
        Self::Array(Some(Vec::new()))
    }

    pub fn write_to(&self, out: &mut BytesMut) {
        match self {
            Self::Simple(s) => {
                out.extend_from_slice(b"+");
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Self::Error(msg) => {
                out.extend_from_slice(b"-");
                out.extend_from_slice(msg);
                out.extend_from_slice(b"\r\n");
            }
            Self::Integer(n) => {
                out.extend_from_slice(b":");
                out.extend_from_slice(n.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Self::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
            Self::Bulk(Some(data)) => {
                out.extend_from_slice(b"$");
                out.extend_from_slice(data.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(data);
                out.extend_from_slice(b"\r\n");
            }
            Self::Array(None) => out.extend_from_slice(b"*-1\r\n"),
            Self::Array(Some(items)) => {
                out.extend_from_slice(b"*");
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.write_to(out);
                }
            }
        }
    }

    pub fn to_bytes(&self) -> BytesMut {
        let mut out = BytesMut::new();
        self.write_to(&mut out);
        out
    }
}
