//! Wire tags.
//!
//! Every value on the wire is introduced or punctuated by a single tag byte.
//! The tags are ASCII so a stream stays mostly readable in a hex dump; they
//! are stable and part of the wire format.

/// Integer in signed 32-bit range, framed as `i<decimal>;`.
pub const TAG_INTEGER: u8 = b'i';
/// Integer outside signed 32-bit range, framed as `l<decimal>;`.
/// Also carries arbitrary-precision integers.
pub const TAG_LONG: u8 = b'l';
/// Finite float, framed as `d<decimal>;`.
pub const TAG_DOUBLE: u8 = b'd';
pub const TAG_NAN: u8 = b'N';
/// Followed by [`TAG_POS`] or [`TAG_NEG`].
pub const TAG_INFINITY: u8 = b'I';
pub const TAG_POS: u8 = b'+';
pub const TAG_NEG: u8 = b'-';
pub const TAG_TRUE: u8 = b't';
pub const TAG_FALSE: u8 = b'f';
pub const TAG_NULL: u8 = b'n';
/// The empty string.
pub const TAG_EMPTY: u8 = b'e';
/// A single UTF-16 code unit worth of string, as raw UTF-8 with no framing.
pub const TAG_UTF8_CHAR: u8 = b'u';
/// String framed as `s<utf16len>"<utf8>"`; length omitted when 0.
pub const TAG_STRING: u8 = b's';
/// Byte array framed as `b<count>"<octets>"`; count omitted when 0.
pub const TAG_BYTES: u8 = b'b';
/// UUID framed as `g{8-4-4-4-12 lowercase hex}`.
pub const TAG_GUID: u8 = b'g';
/// Sequence framed as `a<count>{<elements>}`; count omitted when 0.
pub const TAG_LIST: u8 = b'a';
/// Mapping framed as `m<count>{<k><v>...}`; count omitted when 0.
pub const TAG_MAP: u8 = b'm';
/// Class declaration: `c<namelen>"<name>"<fieldcount>{<fieldnames>}`.
pub const TAG_CLASS: u8 = b'c';
/// Object instance: `o<classindex>{<fieldvalues>}`.
pub const TAG_OBJECT: u8 = b'o';
/// Back-reference to an earlier emission: `r<index>;`.
pub const TAG_REF: u8 = b'r';
/// Error value: `E` followed by a string-framed message.
pub const TAG_ERROR: u8 = b'E';
pub const TAG_OPENBRACE: u8 = b'{';
pub const TAG_CLOSEBRACE: u8 = b'}';
pub const TAG_SEMICOLON: u8 = b';';
pub const TAG_QUOTE: u8 = b'"';

/// Digit tags `'0'..='9'` are self-encoding integers.
#[inline]
pub fn digit_value(tag: u8) -> Option<u8> {
    if tag.is_ascii_digit() {
        Some(tag - b'0')
    } else {
        None
    }
}
