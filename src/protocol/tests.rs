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

use super::*;

fn parse_ok(input: &[u8]) -> (Request, usize) {
    Parser::new(input).parse().expect("expected a parse")
}

#[test]
fn parses_simple_command() {
    let (req, consumed) = parse_ok(b"*1\r\n$4\r\nPING\r\n");
    assert_eq!(req, vec![Bytes::from_static(b"PING")]);
    assert_eq!(consumed, b"*1\r\n$4\r\nPING\r\n".len());
}

#[test]
fn parses_multiple_arguments() {
    let (req, _) = parse_ok(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n");
    assert_eq!(
        req,
        vec![
            Bytes::from_static(b"SET"),
            Bytes::from_static(b"k"),
            Bytes::from_static(b"v"),
        ]
    );
}

#[test]
fn bulk_strings_are_binary_safe() {
    let (req, _) = parse_ok(b"*2\r\n$3\r\nGET\r\n$4\r\n\x00\x01\r\n\r\n");
    assert_eq!(req[1].as_ref(), b"\x00\x01\r\n");
}

#[test]
fn leaves_trailing_bytes_unconsumed() {
    let input = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n";
    let (_, consumed) = parse_ok(input);
    assert_eq!(consumed, 14);
    assert_eq!(&input[consumed..], b"*1\r\n$4\r\nPING\r\n");
}

#[test]
fn incomplete_header_needs_more_bytes() {
    assert_eq!(Parser::new(b"*1\r\n$4\r\nPI").parse(), Err(ParseError::NotEnough));
    assert_eq!(Parser::new(b"*1\r\n").parse(), Err(ParseError::NotEnough));
    assert_eq!(Parser::new(b"").parse(), Err(ParseError::NotEnough));
}

#[test]
fn rejects_wrong_leading_byte() {
    assert_eq!(Parser::new(b"$4\r\nPING\r\n").parse(), Err(ParseError::BadPacket));
}

#[test]
fn rejects_non_digit_length() {
    assert_eq!(Parser::new(b"*x\r\n").parse(), Err(ParseError::BadPacket));
    assert_eq!(Parser::new(b"*1\r\n$x\r\nPING\r\n").parse(), Err(ParseError::BadPacket));
}

#[test]
fn rejects_missing_crlf_terminator() {
    assert_eq!(
        Parser::new(b"*1\r\n$4\r\nPINGxx").parse(),
        Err(ParseError::BadPacket)
    );
}

#[test]
fn rejects_empty_length_line() {
    assert_eq!(Parser::new(b"*\r\n").parse(), Err(ParseError::BadPacket));
}

#[test]
fn zero_argument_array_is_valid() {
    let (req, consumed) = parse_ok(b"*0\r\n");
    assert!(req.is_empty());
    assert_eq!(consumed, 4);
}
