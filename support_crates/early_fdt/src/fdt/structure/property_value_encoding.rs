//! Decoding of the common property value encodings (`<u32>`, `<prop-encoded-array>`, `<stringlist>`)

use crate::fdt::structure::StructureError;
use core::ffi::CStr;
use core::mem;
use thiserror_no_std::Error;

/// The widest address or size field that can be decoded, in cells
pub const MAX_CELLS: u32 = 2;

const CELL_SIZE: usize = mem::size_of::<u32>();

#[derive(Debug, Error, Eq, PartialEq)]
pub enum StringError {
    #[error("The raw property value is not null-terminated")]
    NoNullTerminator,
    #[error("The raw property is not valid UTF-8")]
    Utf8Error,
}

/// Decode the first cell of `value` as big-endian `u32`
pub(crate) fn read_u32(value: &[u8], property: &'static str) -> Result<u32, StructureError> {
    value
        .first_chunk::<CELL_SIZE>()
        .map(|bytes| u32::from_be_bytes(*bytes))
        .ok_or(StructureError::InvalidPropertyValue { property })
}

/// Reject cell counts that do not fit into a `u64`
pub(crate) fn check_cell_width(cells: u32) -> Result<usize, StructureError> {
    if cells > MAX_CELLS {
        return Err(StructureError::UnsupportedCellWidth { cells });
    }
    Ok(cells as usize)
}

/// Decode a number that is encoded in `cells` big-endian cells at the start of `value`.
///
/// Zero cells decode to `0` without consuming anything. The number of consumed bytes is returned alongside the
/// value. `None` is returned if `value` is too short.
pub(crate) fn read_cells(value: &[u8], cells: usize) -> Option<(u64, usize)> {
    let len = cells * CELL_SIZE;
    let bytes = value.get(..len)?;
    let number = bytes
        .chunks_exact(CELL_SIZE)
        .fold(0u64, |acc, cell| {
            let mut word = [0u8; CELL_SIZE];
            word.copy_from_slice(cell);
            (acc << 32) | u32::from_be_bytes(word) as u64
        });
    Some((number, len))
}

/// An iterator over a property value that is `<stringlist>` encoded.
///
/// While `Iterator<Item = &str>` is implemented for this, parsing errors are not surfaced due to limitations
/// of the iterator api.
/// If reading the error is desired use [`next_str()`](StringListIterator::next_str) instead.
#[derive(Debug, Clone)]
pub struct StringListIterator<'buf> {
    pub(crate) buf: &'buf [u8],
}

impl<'buf> StringListIterator<'buf> {
    pub fn new(buf: &'buf [u8]) -> Self {
        Self { buf }
    }

    /// Try to read the next string from the underlying buffer
    ///
    /// If reading fails, return a descriptive error instead.
    /// Note that the internal buffer is still advanced if possible even if an error is returned so that strings located later in the list can still be read.
    pub fn next_str(&mut self) -> Result<&'buf str, StringError> {
        let cstr =
            CStr::from_bytes_until_nul(self.buf).map_err(|_| StringError::NoNullTerminator)?;
        self.buf = &self.buf[cstr.to_bytes_with_nul().len()..];
        let str = cstr.to_str().map_err(|_| StringError::Utf8Error)?;
        Ok(str)
    }
}

impl<'buf> Iterator for StringListIterator<'buf> {
    type Item = &'buf str;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_str().ok()
    }
}
