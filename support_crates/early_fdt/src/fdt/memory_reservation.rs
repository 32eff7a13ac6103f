use core::mem;

/// A single entry of the memory reservation block.
///
/// Each entry gives the physical address and size in bytes of a reserved memory region.
/// These given regions are required to not overlap each other.
/// The list of reserved blocks shall be terminated with an entry where both address and size are equal to 0.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct MemoryReservationEntry {
    /// The address at which the memory reservation starts
    pub address: u64,
    /// The length in bytes of the memory reservation
    pub size: u64,
}

impl MemoryReservationEntry {
    /// Create a new memory reservation entry
    pub fn new(address: u64, size: u64) -> Self {
        Self { address, size }
    }
}

const ENTRY_SIZE: usize = mem::size_of::<u64>() * 2;

/// Description of memory areas that are *reserved* and should not be used for general memory allocations.
///
/// For details see [Devicetree Specification, Section 5.3](https://devicetree-specification.readthedocs.io/en/latest/chapter5-flattened-format.html#memory-reservation-block).
///
/// Iteration stops at the terminating entry or, for malformed blobs, as soon as the remaining buffer cannot hold
/// another entry.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MemoryReservationBlock<'buf> {
    buf: Option<&'buf [u8]>,
}

impl<'buf> MemoryReservationBlock<'buf> {
    /// Interpret the buffer that starts at `off_mem_rsvmap` and reaches to the end of the blob
    pub(crate) fn from_buffer(buf: &'buf [u8]) -> Self {
        Self { buf: Some(buf) }
    }
}

impl<'buf> Iterator for MemoryReservationBlock<'buf> {
    type Item = MemoryReservationEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let buf = self.buf?;
        let Some((entry, rest)) = buf.split_first_chunk::<ENTRY_SIZE>() else {
            log::warn!("memory reservation block is not terminated");
            self.buf = None;
            return None;
        };

        let (addr, size) = entry.split_at(mem::size_of::<u64>());
        let mut addr_bytes = [0u8; 8];
        addr_bytes.copy_from_slice(addr);
        let mut size_bytes = [0u8; 8];
        size_bytes.copy_from_slice(size);
        let address = u64::from_be_bytes(addr_bytes);
        let size = u64::from_be_bytes(size_bytes);

        // if this entry is the specified terminator, finish iteration
        if address == 0 && size == 0 {
            self.buf = None;
            return None;
        }

        self.buf = Some(rest);
        Some(MemoryReservationEntry { address, size })
    }
}
