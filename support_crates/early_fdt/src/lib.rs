//! Allocation-free parsing of [Device Tree](https://devicetree-specification.readthedocs.io/en/latest/index.html) blobs
//! during early boot.
//!
//! The flattened blob handed over by the firmware is walked exactly once. Every node is placed into a fixed-capacity
//! arena that the caller provides (see [`TreeStorage`]) so that the parser can run before any heap exists.
//! The resulting [`DeviceTree`] is read-only and answers the questions the rest of the boot sequence has about the
//! hardware (where RAM is, which harts exist, where the interrupt controller and the serial console live).
//!
//! # Example
//!
//! ```rust
//! # use align_data::{include_aligned, Align64};
//! # use early_fdt::{DeviceTree, TreeStorage};
//! # use early_fdt::device_info::DeviceInfo;
//! # static DTB: &[u8] = include_aligned!(Align64, "../test/data/riscv_virt.dtb");
//! let mut storage = TreeStorage::<64, 256>::new();
//! let tree = DeviceTree::from_buffer(DTB, &mut storage).unwrap();
//!
//! let memory = DeviceInfo::new(&tree).memory().unwrap();
//! assert_eq!(memory.start, 0x8000_0000);
//! ```
#![no_std]

#[cfg(test)]
extern crate std;

pub mod arena;
pub mod device_info;
mod dump;
pub mod fdt;
mod tree;

pub use arena::{Arena, ArenaExhausted, TreeStorage};
pub use dump::TreeDump;
pub use fdt::{
    DeviceTree, DtbNode, FdtError, FdtHeader, NodeHandle, Property, PropertyHandle, Reg,
    MAX_COMPATIBLE,
};
pub use tree::{Children, Preorder, Properties, RegIter};
