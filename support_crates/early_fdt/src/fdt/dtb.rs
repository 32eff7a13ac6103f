//! Handling of the DTB/FDT as a whole

use crate::arena::{Arena, TreeStorage};
use crate::fdt::structure::walker;
use crate::fdt::{
    DtbNode, FdtHeader, HeaderReadError, MemoryReservationBlock, NodeHandle, Property,
    StructureError,
};
use thiserror_no_std::Error;

/// The error that can occur when parsing a FDT
#[derive(Debug, Error, Eq, PartialEq, Copy, Clone)]
pub enum FdtError {
    /// The FDT header could not be parsed for a specific reason
    #[error("Could not parse the fdt header: {0}")]
    HeaderParseError(#[from] HeaderReadError),
    /// The structure block could not be parsed for a specific reason
    #[error("Could not parse structure block: {0}")]
    StructureError(#[from] StructureError),
    /// The arenas handed to the parser were not empty
    #[error("The arenas must be empty but already hold {nodes} nodes and {props} properties")]
    ArenaInUse { nodes: usize, props: usize },
}

/// A device tree that has been parsed from an underlying buffer into a fixed-capacity arena.
///
/// The tree is read-only. Nodes are addressed through [`NodeHandle`]s which are only meaningful for the tree that
/// produced them.
#[derive(Debug, Clone, Copy)]
pub struct DeviceTree<'buf, 's> {
    /// Metadata information about the device tree
    pub header: FdtHeader,
    /// The exact buffer that holds this device trees data
    pub buf: &'buf [u8],
    pub(crate) root: NodeHandle,
    pub(crate) nodes: &'s [DtbNode<'buf>],
    pub(crate) props: &'s [Property<'buf>],
    pub(crate) max_depth: usize,
}

impl<'buf, 's> DeviceTree<'buf, 's> {
    /// Try to parse a FDT from a buffer, placing the tree into `storage`
    pub fn from_buffer<const NODES: usize, const PROPS: usize>(
        buf: &'buf [u8],
        storage: &'s mut TreeStorage<'buf, NODES, PROPS>,
    ) -> Result<Self, FdtError> {
        let (nodes, props) = storage.arenas();
        Self::from_arenas(buf, nodes, props)
    }

    /// Try to parse a FDT from a buffer, placing nodes and properties into the given arenas
    pub fn from_arenas(
        buf: &'buf [u8],
        nodes: Arena<'s, DtbNode<'buf>>,
        props: Arena<'s, Property<'buf>>,
    ) -> Result<Self, FdtError> {
        let header = FdtHeader::read_from_buffer(buf)?;
        log_header(&header);
        Self::parse(header, buf, nodes, props)
    }

    /// Build the tree for a blob whose header has already been read.
    ///
    /// The header is checked again against `buf`, so it may also come from somewhere else than
    /// [`FdtHeader::read_from_buffer()`]. Both arenas must be empty so that the synthetic root ends up at
    /// [`NodeHandle::ROOT`].
    pub fn parse(
        header: FdtHeader,
        buf: &'buf [u8],
        nodes: Arena<'s, DtbNode<'buf>>,
        props: Arena<'s, Property<'buf>>,
    ) -> Result<Self, FdtError> {
        if !nodes.is_empty() || !props.is_empty() {
            return Err(FdtError::ArenaInUse {
                nodes: nodes.len(),
                props: props.len(),
            });
        }
        header.check_blocks()?;
        let buf = buf
            .get(..header.total_size as usize)
            .ok_or(HeaderReadError::TruncatedBlob {
                available: buf.len(),
                required: header.total_size as usize,
            })?;
        let tree = walker::walk(&header, buf, nodes, props)?;

        Ok(Self {
            header,
            buf,
            root: tree.root,
            nodes: tree.nodes,
            props: tree.props,
            max_depth: tree.max_depth,
        })
    }

    /// Try to read a FDT from a raw pointer
    ///
    /// # Safety
    /// The given pointer must be valid and the backing memory must be readable for at least 40 bytes after it and
    /// for as many bytes as the header claims the blob to have.
    ///
    /// The underlying memory must also be valid for as long as the resulting instance is used.
    pub unsafe fn from_ptr<const NODES: usize, const PROPS: usize>(
        ptr: *const u8,
        storage: &'s mut TreeStorage<'buf, NODES, PROPS>,
    ) -> Result<Self, FdtError> {
        let header = FdtHeader::from_ptr(ptr)?;
        let buf = core::slice::from_raw_parts::<u8>(ptr, header.total_size as usize);
        Self::from_buffer(buf, storage)
    }

    /// Areas of the system memory which are reserved and should not be used without special care
    pub fn memory_reservations(&self) -> MemoryReservationBlock<'buf> {
        let rsvmap = self
            .buf
            .get(self.header.off_mem_rsvmap as usize..)
            .unwrap_or_default();
        MemoryReservationBlock::from_buffer(rsvmap)
    }
}

fn log_header(header: &FdtHeader) {
    log::debug!("fdt header:");
    log::debug!("  magic: {:#x}", header.magic);
    log::debug!("  totalsize: {}", header.total_size);
    log::debug!("  off_dt_struct: {:#x}", header.off_dt_struct);
    log::debug!("  off_dt_strings: {:#x}", header.off_dt_strings);
    log::debug!("  off_mem_rsvmap: {:#x}", header.off_mem_rsvmap);
    log::debug!("  version: {}", header.version);
    log::debug!("  last_comp_version: {}", header.last_comp_version);
    log::debug!("  boot_cpuid_phys: {:#x}", header.boot_cpuid_phys);
    log::debug!("  size_dt_strings: {:#x}", header.size_dt_strings);
    log::debug!("  size_dt_struct: {:#x}", header.size_dt_struct);
}
