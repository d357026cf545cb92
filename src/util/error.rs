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

use std::{fmt, io};

/// The outcome of dispatching one parsed request.
///
/// `Protocol` carries a fully-formed `-ERR ...` payload and leaves the
/// connection open; `Framing` means the bytes on the wire could not be
/// parsed at all and the connection must be closed after the reply is
/// flushed; `Io` is a transport failure and ends the handler without a
/// reply.
#[derive(Debug)]
pub enum DispatchError {
    Protocol(Vec<u8>),
    Framing(Vec<u8>),
    Io(io::Error),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

impl DispatchError {
    pub fn protocol(msg: impl Into<Vec<u8>>) -> Self {
        Self::Protocol(msg.into())
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(m) => write!(f, "protocol error: {}", String::from_utf8_lossy(m)),
            Self::Framing(m) => write!(f, "framing error: {}", String::from_utf8_lossy(m)),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<io::Error> for DispatchError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
