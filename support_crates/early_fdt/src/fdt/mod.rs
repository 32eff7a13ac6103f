//! Flattened Device Tree (also called Device-Tree-Blob) handling
//!
//! A blob is one linear, pointer free byte buffer. A fixed 40 byte header at the front
//! ([Devicetree Specification, Section 5.2](https://devicetree-specification.readthedocs.io/en/latest/chapter5-flattened-format.html#header))
//! holds the offsets of three blocks which normally follow in this order:
//!
//! - the memory reservation block, a list of `(address, size)` pairs,
//! - the structure block, a stream of 32-bit tokens describing nodes and their properties,
//! - the strings block, holding every property name exactly once.
//!
//! Gaps between the blocks are allowed, e.g. to satisfy alignment:
//! ```text
//! ┌──────────────────────────┐
//! │ FdtHeader (40 bytes)     │  offset 0
//! ├──────────────────────────┤
//! │ memory reservation block │  off_mem_rsvmap
//! ├──────────────────────────┤
//! │ structure block          │  off_dt_struct, size_dt_struct
//! ├──────────────────────────┤
//! │ strings block            │  off_dt_strings, size_dt_strings
//! └──────────────────────────┘
//! ```
//!
//! Only the structure block is turned into a tree. The memory reservation block is read lazily through
//! [`DeviceTree::memory_reservations()`].

mod dtb;
mod header;
mod memory_reservation;
mod strings;
pub(crate) mod structure;

pub use dtb::{DeviceTree, FdtError};
pub use header::{FdtHeader, HeaderReadError, HEADER_MAGIC, HEADER_SIZE};
pub use memory_reservation::{MemoryReservationBlock, MemoryReservationEntry};
pub use strings::{Strings, StringsError};
pub use structure::node::{Compatible, DtbNode, NodeHandle, Reg, MAX_COMPATIBLE};
pub use structure::property::{Property, PropertyHandle};
pub use structure::property_value_encoding::{StringError, StringListIterator, MAX_CELLS};
pub use structure::StructureError;
