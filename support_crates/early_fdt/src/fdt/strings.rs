//! Handling of the *strings* block
//!
//! This is implemented according to [Devicetree Specification, Section 5.5](https://devicetree-specification.readthedocs.io/en/v0.3/flattened-format.html#strings-block).

use core::ffi::CStr;
use thiserror_no_std::Error;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Strings<'buf> {
    buf: &'buf [u8],
}

#[derive(Debug, Error, Eq, PartialEq, Copy, Clone)]
pub enum StringsError {
    #[error("No string could be found at offset {0} in buffer of size {1}")]
    OutOfBounds(usize, usize),
    #[error("There was data at offset {0} but it was not zero-terminated")]
    Unterminated(usize),
    #[error("The string at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

impl<'buf> Strings<'buf> {
    /// Wrap the strings block.
    ///
    /// `buf` must cover exactly `size_dt_strings` bytes so that lookups cannot run into other blocks.
    pub fn from_buffer(buf: &'buf [u8]) -> Self {
        Self { buf }
    }

    /// Look up the zero-terminated string that starts at `offset`
    pub fn get_string(&self, offset: usize) -> Result<&'buf str, StringsError> {
        if offset >= self.buf.len() {
            return Err(StringsError::OutOfBounds(offset, self.buf.len()));
        }
        let cstr = CStr::from_bytes_until_nul(&self.buf[offset..])
            .map_err(|_| StringsError::Unterminated(offset))?;
        cstr.to_str().map_err(|_| StringsError::InvalidUtf8(offset))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn get_string_works() {
        let strings = Strings::from_buffer(b"reg\0compatible\0");
        assert_eq!(strings.get_string(0), Ok("reg"));
        assert_eq!(strings.get_string(4), Ok("compatible"));
        assert_eq!(strings.get_string(5), Ok("ompatible"));
    }

    #[test]
    fn get_string_fails_out_of_bounds() {
        let strings = Strings::from_buffer(b"reg\0");
        assert_eq!(strings.get_string(4), Err(StringsError::OutOfBounds(4, 4)));
        assert_eq!(
            Strings::from_buffer(b"").get_string(0),
            Err(StringsError::OutOfBounds(0, 0))
        );
    }

    #[test]
    fn get_string_fails_without_terminator() {
        let strings = Strings::from_buffer(b"reg\0status");
        assert_eq!(strings.get_string(4), Err(StringsError::Unterminated(4)));
    }

    #[test]
    fn get_string_fails_with_invalid_utf8() {
        let strings = Strings::from_buffer(b"\xff\xfe\0");
        assert_eq!(strings.get_string(0), Err(StringsError::InvalidUtf8(0)));
    }
}
