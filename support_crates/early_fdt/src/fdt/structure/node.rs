//! Handling of single nodes inside the structure block

use crate::fdt::structure::property::PropertyHandle;
use crate::fdt::structure::StructureError;
use core::fmt;

/// How many strings a single `compatible` property may list
pub const MAX_COMPATIBLE: usize = 8;

/// A stable reference to a node inside the arena of the tree that produced it
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeHandle(pub(crate) usize);

impl NodeHandle {
    /// The synthetic root is always the first node that gets allocated
    pub const ROOT: NodeHandle = NodeHandle(0);

    /// Position of the node in arena allocation order
    pub fn index(self) -> usize {
        self.0
    }
}

/// The first `(address, length)` pair of a `reg` property
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct Reg {
    pub address: u64,
    pub length: u64,
}

/// The strings of a `compatible` property in the order in which they were listed, most specific first
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct Compatible<'buf> {
    entries: [&'buf str; MAX_COMPATIBLE],
    len: usize,
}

impl<'buf> Compatible<'buf> {
    pub const EMPTY: Compatible<'static> = Compatible {
        entries: [""; MAX_COMPATIBLE],
        len: 0,
    };

    /// Split a raw `compatible` value on its zero bytes.
    ///
    /// Empty fragments are skipped and a missing final terminator is tolerated.
    pub(crate) fn parse(value: &'buf [u8]) -> Result<Self, StructureError> {
        let mut compatible: Compatible<'buf> = Compatible::EMPTY;
        for fragment in value.split(|byte| *byte == 0).filter(|f| !f.is_empty()) {
            let entry = core::str::from_utf8(fragment).map_err(|_| {
                StructureError::InvalidPropertyValue {
                    property: "compatible",
                }
            })?;
            if compatible.len == MAX_COMPATIBLE {
                return Err(StructureError::TooManyCompatibleStrings {
                    limit: MAX_COMPATIBLE,
                });
            }
            compatible.entries[compatible.len] = entry;
            compatible.len += 1;
        }
        Ok(compatible)
    }

    pub fn as_slice(&self) -> &[&'buf str] {
        &self.entries[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = &'buf str> + '_ {
        self.as_slice().iter().copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether one of the strings is exactly `compatible`
    pub fn contains(&self, compatible: &str) -> bool {
        self.iter().any(|entry| entry == compatible)
    }

    /// The first string, which by convention names the exact device model
    pub fn first(&self) -> Option<&'buf str> {
        self.as_slice().first().copied()
    }
}

impl fmt::Debug for Compatible<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// A single node of the device tree as it is kept in the arena.
///
/// Besides the tree links, a node carries the interpretation of the handful of properties that early boot code
/// needs. The raw values of *all* properties are additionally kept in a per-node property list, see
/// [`DeviceTree::properties()`](crate::DeviceTree::properties).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DtbNode<'buf> {
    /// Handle of this node
    pub id: NodeHandle,
    /// The node name without the unit address
    pub name: &'buf str,
    /// The node name as it is encoded in the blob, including `@` and the unit address
    pub full_name: &'buf str,
    /// The unit address, if the name has one
    pub address: Option<u64>,
    pub parent: Option<NodeHandle>,
    /// The most recently declared child
    pub children: Option<NodeHandle>,
    /// The next child of the same parent, which was declared *before* this one
    pub sibling: Option<NodeHandle>,
    pub compatible: Compatible<'buf>,
    /// Whether a `reg`, `compatible` or `interrupts` property marked this node as a device
    pub is_device: bool,
    /// `#address-cells` of this node, `None` if the value is inherited
    pub address_cells: Option<u32>,
    /// `#size-cells` of this node, `None` if the value is inherited
    pub size_cells: Option<u32>,
    pub irq: Option<u32>,
    pub reg: Option<Reg>,
    /// Offset of the node's FDT_BEGIN_NODE token from the start of the blob
    pub fdt_offset: usize,
    /// Nesting depth, the synthetic root is at depth 0
    pub depth: usize,
    pub(crate) first_prop: Option<PropertyHandle>,
    pub(crate) last_prop: Option<PropertyHandle>,
}

impl<'buf> DtbNode<'buf> {
    pub const EMPTY: DtbNode<'static> = DtbNode {
        id: NodeHandle::ROOT,
        name: "",
        full_name: "",
        address: None,
        parent: None,
        children: None,
        sibling: None,
        compatible: Compatible::EMPTY,
        is_device: false,
        address_cells: None,
        size_cells: None,
        irq: None,
        reg: None,
        fdt_offset: 0,
        depth: 0,
        first_prop: None,
        last_prop: None,
    };

    /// Create a fresh node for the given (full) node name
    pub(crate) fn new(
        id: NodeHandle,
        full_name: &'buf str,
        fdt_offset: usize,
        depth: usize,
    ) -> Self {
        let (name, address) = split_unit_address(full_name);
        Self {
            id,
            name,
            full_name,
            address,
            fdt_offset,
            depth,
            ..DtbNode::EMPTY
        }
    }

    /// Whether this is the synthetic node at the top of the arena
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The base address of the device.
    ///
    /// This is the address of the first `reg` entry and falls back to the unit address of the node name.
    pub fn base_address(&self) -> Option<u64> {
        self.reg.map(|reg| reg.address).or(self.address)
    }
}

/// Split `name@1000` into `name` and the hexadecimal unit address `0x1000`.
///
/// Only the leading hex digits after `@` are considered, so `cpu@0,1` yields `0`.
/// If no digit follows the `@`, the name is still split but no address is returned.
pub(crate) fn split_unit_address(full_name: &str) -> (&str, Option<u64>) {
    let Some((name, unit)) = full_name.split_once('@') else {
        return (full_name, None);
    };

    let digits = unit
        .bytes()
        .take_while(|byte| byte.is_ascii_hexdigit())
        .count();
    let address = match u64::from_str_radix(&unit[..digits], 16) {
        Ok(address) => Some(address),
        Err(_) => {
            log::warn!("node {} has an unparseable unit address", full_name);
            None
        }
    };
    (name, address)
}
