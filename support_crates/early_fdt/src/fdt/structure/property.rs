//! Handling of properties inside nodes

use crate::fdt::structure::node::{Compatible, DtbNode, NodeHandle, Reg};
use crate::fdt::structure::property_value_encoding::{check_cell_width, read_cells, read_u32};
use crate::fdt::structure::StructureError;

pub(crate) const ADDRESS_CELLS: &str = "#address-cells";
pub(crate) const SIZE_CELLS: &str = "#size-cells";
pub(crate) const INTERRUPTS: &str = "interrupts";
pub(crate) const REG: &str = "reg";
pub(crate) const COMPATIBLE: &str = "compatible";

/// A stable reference to a property inside the arena of the tree that produced it
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PropertyHandle(pub(crate) usize);

/// A single property inside a node, exactly as it is encoded in the blob
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Property<'buf> {
    /// Name of the property as looked up from the *strings* block of the FDT
    pub name: &'buf str,
    /// Value of the property
    pub value: &'buf [u8],
    /// The next property of the same node
    pub(crate) next: Option<PropertyHandle>,
}

impl<'buf> Property<'buf> {
    pub const EMPTY: Property<'static> = Property {
        name: "",
        value: &[],
        next: None,
    };

    pub(crate) fn new(name: &'buf str, value: &'buf [u8]) -> Self {
        Self {
            name,
            value,
            next: None,
        }
    }

    /// Interpret the value as a single `<u32>`
    pub fn as_u32(&self) -> Option<u32> {
        self.value
            .try_into()
            .ok()
            .map(u32::from_be_bytes)
    }

    /// Interpret the value as a single `<u64>`
    pub fn as_u64(&self) -> Option<u64> {
        self.value
            .try_into()
            .ok()
            .map(u64::from_be_bytes)
    }

    /// Interpret the value as a single zero-terminated `<string>`
    pub fn as_str(&self) -> Option<&'buf str> {
        core::ffi::CStr::from_bytes_with_nul(self.value)
            .ok()?
            .to_str()
            .ok()
    }
}

/// Walk up from `node` until a node defines the requested cell count.
///
/// Nodes without any ancestor defining it resolve to 0.
pub(crate) fn resolve_cells(
    nodes: &[DtbNode<'_>],
    node: NodeHandle,
    select: impl Fn(&DtbNode<'_>) -> Option<u32>,
) -> u32 {
    let mut current = Some(node);
    while let Some(handle) = current {
        let node = &nodes[handle.0];
        if let Some(cells) = select(node) {
            return cells;
        }
        current = node.parent;
    }
    0
}

/// Update the interpreted fields of `node` according to one of its properties.
///
/// Properties that early boot does not care about are left alone; they are still reachable through the generic
/// property list.
pub(crate) fn apply_property<'buf>(
    nodes: &mut [DtbNode<'buf>],
    node: NodeHandle,
    name: &str,
    value: &'buf [u8],
) -> Result<(), StructureError> {
    match name {
        ADDRESS_CELLS => nodes[node.0].address_cells = Some(read_u32(value, ADDRESS_CELLS)?),
        SIZE_CELLS => nodes[node.0].size_cells = Some(read_u32(value, SIZE_CELLS)?),
        INTERRUPTS => {
            let target = &mut nodes[node.0];
            target.irq = Some(read_u32(value, INTERRUPTS)?);
            target.is_device = true;
        }
        REG => {
            let reg = decode_reg(nodes, node, value)?;
            let target = &mut nodes[node.0];
            target.reg = Some(reg);
            target.is_device = true;
        }
        COMPATIBLE => {
            let target = &mut nodes[node.0];
            target.compatible = Compatible::parse(value)?;
            target.is_device = true;
        }
        _ => {}
    }
    Ok(())
}

/// Decode the first `(address, length)` entry of a `reg` value with the cell widths that apply to `node`
fn decode_reg(nodes: &[DtbNode<'_>], node: NodeHandle, value: &[u8]) -> Result<Reg, StructureError> {
    let address_cells = check_cell_width(resolve_cells(nodes, node, |n| n.address_cells))?;
    let size_cells = check_cell_width(resolve_cells(nodes, node, |n| n.size_cells))?;

    let invalid = StructureError::InvalidPropertyValue { property: REG };
    let (address, consumed) = read_cells(value, address_cells).ok_or(invalid)?;
    let (length, _) = read_cells(&value[consumed..], size_cells).ok_or(invalid)?;
    Ok(Reg { address, length })
}
