use core::mem;
use thiserror_no_std::Error;

/// The value every device tree blob starts with
pub const HEADER_MAGIC: u32 = 0xd00dfeed;

/// Size of the encoded header in bytes
pub const HEADER_SIZE: usize = mem::size_of::<FdtHeader>();

/// Errors that can occur when reading the FDT header
#[derive(Debug, Error, Eq, PartialEq, Copy, Clone)]
pub enum HeaderReadError {
    /// The provided buffer did not contain the required magic bytes at the start
    #[error("The provided buffer did not start with the magic bytes 0xd00dfeed but with {0:#x}")]
    InvalidMagic(u32),
    /// The provided buffer is smaller than the header or than the size the header claims for the whole blob
    #[error("The provided buffer holds {available} bytes but {required} bytes are required")]
    TruncatedBlob { available: usize, required: usize },
    /// One of the blocks described by the header does not lie inside the blob
    #[error("The {block} block at offset {offset:#x} with size {size:#x} exceeds the total blob size {total_size:#x}")]
    OffsetOutOfRange {
        block: &'static str,
        offset: u32,
        size: u32,
        total_size: u32,
    },
}

/// The FDT-Header data structure present at the start of every device tree blob.
/// All the header fields are 32-bit integers, stored in big-endian format.
///
/// It is modelled according to the [Devicetree Specification, Section 5.2](https://devicetree-specification.readthedocs.io/en/latest/chapter5-flattened-format.html#header).
/// Instances of this type always hold the fields in host byte order.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[repr(C)]
pub struct FdtHeader {
    /// This field shall contain the value 0xd00dfeed (big-endian).
    pub magic: u32,
    /// This field shall contain the total size in bytes of the devicetree data structure.
    /// This size shall encompass all sections of the structure: the header, the memory reservation block, structure block and strings block, as well as any free space gaps between the blocks or after the final block.
    pub total_size: u32,
    /// This field shall contain the offset in bytes of the structure block from the beginning of the header.
    pub off_dt_struct: u32,
    /// This field shall contain the offset in bytes of the strings block from the beginning of the header.
    pub off_dt_strings: u32,
    /// This field shall contain the offset in bytes of the memory reservation block from the beginning of the header.
    pub off_mem_rsvmap: u32,
    /// This field shall contain the version of the devicetree data structure.
    pub version: u32,
    /// This field shall contain the lowest version of the devicetree data structure with which the version used is backwards compatible.
    pub last_comp_version: u32,
    /// This field shall contain the physical ID of the system’s boot CPU.
    /// It shall be identical to the physical ID given in the reg property of that CPU node within the devicetree.
    pub boot_cpuid_phys: u32,
    /// This field shall contain the length in bytes of the strings block section of the devicetree blob.
    pub size_dt_strings: u32,
    /// This field shall contain the length in bytes of the structure block section of the devicetree blob.
    pub size_dt_struct: u32,
}

impl FdtHeader {
    /// Try to read a header from a provided buffer
    ///
    /// Besides decoding the fields this verifies the magic bytes, that `buf` holds at least `total_size` bytes and
    /// that the structure and strings blocks lie within `total_size`.
    /// The version fields are reported but not judged.
    pub fn read_from_buffer(buf: &[u8]) -> Result<Self, HeaderReadError> {
        fn read_u32(buf: &[u8]) -> Result<(u32, &[u8]), HeaderReadError> {
            match buf {
                [a, b, c, d, tail @ ..] => Ok((u32::from_be_bytes([*a, *b, *c, *d]), tail)),
                _ => Err(HeaderReadError::TruncatedBlob {
                    available: buf.len(),
                    required: mem::size_of::<u32>(),
                }),
            }
        }

        if buf.len() < HEADER_SIZE {
            return Err(HeaderReadError::TruncatedBlob {
                available: buf.len(),
                required: HEADER_SIZE,
            });
        }

        let (magic, rest) = read_u32(buf)?;
        if magic != HEADER_MAGIC {
            return Err(HeaderReadError::InvalidMagic(magic));
        }
        let (total_size, rest) = read_u32(rest)?;
        let (off_dt_struct, rest) = read_u32(rest)?;
        let (off_dt_strings, rest) = read_u32(rest)?;
        let (off_mem_rsvmap, rest) = read_u32(rest)?;
        let (version, rest) = read_u32(rest)?;
        let (last_comp_version, rest) = read_u32(rest)?;
        let (boot_cpuid_phys, rest) = read_u32(rest)?;
        let (size_dt_strings, rest) = read_u32(rest)?;
        let (size_dt_struct, _rest) = read_u32(rest)?;

        let header = Self {
            magic,
            total_size,
            off_dt_struct,
            off_dt_strings,
            off_mem_rsvmap,
            version,
            last_comp_version,
            boot_cpuid_phys,
            size_dt_strings,
            size_dt_struct,
        };

        if buf.len() < total_size as usize {
            return Err(HeaderReadError::TruncatedBlob {
                available: buf.len(),
                required: total_size as usize,
            });
        }
        header.check_blocks()?;

        Ok(header)
    }

    /// Try to read a header from a provided memory location
    ///
    /// # Safety
    /// The given pointer must be valid and the backing memory must be readable for at least 40 bytes after it.
    /// It must also be readable for as many bytes as the header claims the blob to have.
    pub unsafe fn from_ptr(ptr: *const u8) -> Result<Self, HeaderReadError> {
        let buf = core::slice::from_raw_parts::<u8>(ptr, HEADER_SIZE);
        let magic = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if magic != HEADER_MAGIC {
            return Err(HeaderReadError::InvalidMagic(magic));
        }
        let total_size = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
        let buf = core::slice::from_raw_parts::<u8>(ptr, total_size.max(HEADER_SIZE));
        Self::read_from_buffer(buf)
    }

    /// Verify that the magic is correct and that the structure and strings blocks lie within `total_size`
    pub fn check_blocks(&self) -> Result<(), HeaderReadError> {
        if self.magic != HEADER_MAGIC {
            return Err(HeaderReadError::InvalidMagic(self.magic));
        }
        self.check_block("structure", self.off_dt_struct, self.size_dt_struct)?;
        self.check_block("strings", self.off_dt_strings, self.size_dt_strings)
    }

    fn check_block(&self, block: &'static str, offset: u32, size: u32) -> Result<(), HeaderReadError> {
        match offset.checked_add(size) {
            Some(end) if end <= self.total_size => Ok(()),
            _ => Err(HeaderReadError::OffsetOutOfRange {
                block,
                offset,
                size,
                total_size: self.total_size,
            }),
        }
    }

    /// The byte range of the structure block inside the blob, `None` if it does not fit into the address space
    pub fn struct_range(&self) -> Option<core::ops::Range<usize>> {
        block_range(self.off_dt_struct, self.size_dt_struct)
    }

    /// The byte range of the strings block inside the blob, `None` if it does not fit into the address space
    pub fn strings_range(&self) -> Option<core::ops::Range<usize>> {
        block_range(self.off_dt_strings, self.size_dt_strings)
    }
}

fn block_range(offset: u32, size: u32) -> Option<core::ops::Range<usize>> {
    let end = offset.checked_add(size)?;
    Some(offset as usize..end as usize)
}
