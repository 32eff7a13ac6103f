use crate::fdt::structure::StructureError;
use core::mem;

/// Align a number (typically a buffer index) so that it can be used to access aligned FDT tokens
#[inline]
pub(crate) const fn align_to_token(n: usize) -> usize {
    const ALIGNMENT: usize = mem::align_of::<u32>();
    (n + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// A read position inside the structure block.
///
/// Every read is checked against the end of the block so that a malformed blob can never make the parser look at
/// memory outside of it.
#[derive(Debug, Clone)]
pub(crate) struct TokenCursor<'buf> {
    /// The structure block
    block: &'buf [u8],
    /// Offset of the structure block from the start of the blob
    base: usize,
    /// Current read position relative to `block`
    pos: usize,
}

impl<'buf> TokenCursor<'buf> {
    pub(crate) fn new(block: &'buf [u8], base: usize) -> Self {
        Self {
            block,
            base,
            pos: 0,
        }
    }

    /// The current position as offset from the start of the blob
    pub(crate) fn blob_offset(&self) -> usize {
        self.base + self.pos
    }

    fn truncated(&self, wanted: usize) -> StructureError {
        StructureError::TruncatedStructBlock {
            offset: self.blob_offset(),
            wanted,
        }
    }

    /// Read one big-endian `u32` and advance past it
    pub(crate) fn read_u32(&mut self) -> Result<u32, StructureError> {
        let word = self
            .block
            .get(self.pos..)
            .and_then(|rest| rest.first_chunk::<4>())
            .ok_or_else(|| self.truncated(mem::size_of::<u32>()))?;
        self.pos += mem::size_of::<u32>();
        Ok(u32::from_be_bytes(*word))
    }

    /// Read `len` bytes and advance to the next token boundary after them
    pub(crate) fn read_bytes_aligned(&mut self, len: usize) -> Result<&'buf [u8], StructureError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.block.len())
            .ok_or_else(|| self.truncated(len))?;
        let bytes = &self.block[self.pos..end];
        self.pos = align_to_token(end);
        Ok(bytes)
    }

    /// Read a zero-terminated string and advance to the next token boundary after its terminator.
    ///
    /// The returned bytes do not include the terminator.
    pub(crate) fn read_cstr_aligned(&mut self) -> Result<&'buf [u8], StructureError> {
        let rest = self.block.get(self.pos..).unwrap_or_default();
        let len = rest
            .iter()
            .position(|byte| *byte == 0)
            .ok_or_else(|| self.truncated(rest.len() + 1))?;
        let bytes = &rest[..len];
        self.pos = align_to_token(self.pos + len + 1);
        Ok(bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn align_to_token_rounds_up() {
        assert_eq!(align_to_token(0), 0);
        assert_eq!(align_to_token(1), 4);
        assert_eq!(align_to_token(4), 4);
        assert_eq!(align_to_token(13), 16);
    }

    #[test]
    fn read_u32_is_bounds_checked() {
        let buf = [0u8, 0, 0, 1, 0xff, 0xff];
        let mut cursor = TokenCursor::new(&buf, 0x40);
        assert_eq!(cursor.read_u32(), Ok(1));
        assert_eq!(
            cursor.read_u32(),
            Err(StructureError::TruncatedStructBlock {
                offset: 0x44,
                wanted: 4
            })
        );
    }

    #[test]
    fn read_cstr_skips_padding() {
        let mut buf = [0u8; 12];
        buf[0..5].copy_from_slice(b"uart\0");
        buf[8..12].copy_from_slice(&9u32.to_be_bytes());
        let mut cursor = TokenCursor::new(&buf, 0);
        assert_eq!(cursor.read_cstr_aligned(), Ok(&b"uart"[..]));
        assert_eq!(cursor.blob_offset(), 8);
        assert_eq!(cursor.read_u32(), Ok(9));
    }

    #[test]
    fn read_cstr_fails_without_terminator() {
        let buf = *b"cpus";
        let mut cursor = TokenCursor::new(&buf, 0);
        assert!(matches!(
            cursor.read_cstr_aligned(),
            Err(StructureError::TruncatedStructBlock { offset: 0, .. })
        ));
    }

    #[test]
    fn read_bytes_fails_if_value_exceeds_block() {
        let buf = [0u8; 8];
        let mut cursor = TokenCursor::new(&buf, 0);
        assert_eq!(cursor.read_bytes_aligned(3), Ok(&[0u8, 0, 0][..]));
        assert_eq!(cursor.blob_offset(), 4);
        assert!(cursor.read_bytes_aligned(5).is_err());
        assert!(cursor.read_bytes_aligned(usize::MAX).is_err());
    }
}
