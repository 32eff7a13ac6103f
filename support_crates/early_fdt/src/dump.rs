//! Human readable rendering of a parsed tree for diagnostics

use crate::fdt::{DeviceTree, DtbNode};
use core::fmt::{self, Display, Formatter};

/// A [`Display`] adapter that renders every node of a tree on its own line, indented by nesting depth.
///
/// Siblings appear in the same order as [`DeviceTree::children()`] yields them.
#[derive(Debug, Clone, Copy)]
pub struct TreeDump<'t, 'buf, 's> {
    tree: &'t DeviceTree<'buf, 's>,
}

/// One line of a [`TreeDump`]
struct NodeLine<'n, 'buf>(&'n DtbNode<'buf>);

impl<'buf, 's> DeviceTree<'buf, 's> {
    /// Render the tree for humans, see [`TreeDump`]
    pub fn dump(&self) -> TreeDump<'_, 'buf, 's> {
        TreeDump { tree: self }
    }

    /// Write the rendered tree to the logger, one record per node
    pub fn log_dump(&self, level: log::Level) {
        if !log::log_enabled!(level) {
            return;
        }
        for node in self.preorder(self.root()).skip(1) {
            log::log!(level, "{}", NodeLine(node));
        }
    }
}

impl Display for TreeDump<'_, '_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for node in self.tree.preorder(self.tree.root()).skip(1) {
            writeln!(f, "{}", NodeLine(node))?;
        }
        Ok(())
    }
}

impl Display for NodeLine<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let node = self.0;
        let indent = node.depth.saturating_sub(1) * 2;
        let name = match node.full_name {
            "" => "/",
            name => name,
        };
        write!(f, "{:indent$}{}", "", name, indent = indent)?;

        if let Some(cells) = node.address_cells {
            write!(f, " #address-cells={}", cells)?;
        }
        if let Some(cells) = node.size_cells {
            write!(f, " #size-cells={}", cells)?;
        }
        if !node.compatible.is_empty() {
            write!(f, " compatible={:?}", node.compatible)?;
        }
        if let Some(reg) = node.reg {
            write!(f, " reg=<{:#x} {:#x}>", reg.address, reg.length)?;
        }
        if let Some(irq) = node.irq {
            write!(f, " irq={}", irq)?;
        }
        Ok(())
    }
}
