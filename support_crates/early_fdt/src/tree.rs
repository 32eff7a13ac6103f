//! Read-only queries on a parsed [`DeviceTree`]

use crate::fdt::structure::property::{resolve_cells, REG};
use crate::fdt::structure::property_value_encoding::{check_cell_width, read_cells};
use crate::fdt::{DeviceTree, DtbNode, NodeHandle, Property, PropertyHandle, Reg, StringListIterator};
use core::ops::ControlFlow;

impl<'buf, 's> DeviceTree<'buf, 's> {
    /// The synthetic node that everything else hangs off.
    ///
    /// It is not part of the blob; the blob's own `/` node is its child, see
    /// [`devicetree_root()`](DeviceTree::devicetree_root).
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// The node which the blob declares as `/`.
    ///
    /// Well-formed blobs have exactly one top level node. For anything else the synthetic root is returned.
    pub fn devicetree_root(&self) -> NodeHandle {
        let root = self.node(self.root);
        match root.children {
            Some(child) if self.node(child).sibling.is_none() => child,
            _ => self.root,
        }
    }

    /// Look up a node by its handle.
    ///
    /// # Panics
    /// Panics if `handle` was produced by a different tree.
    pub fn node(&self, handle: NodeHandle) -> &'s DtbNode<'buf> {
        &self.nodes[handle.0]
    }

    /// The number of nodes including the synthetic root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The deepest nesting level that occurred in the blob
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// All nodes in the order in which they were allocated, which is the order of their FDT_BEGIN_NODE tokens
    pub fn nodes(&self) -> impl Iterator<Item = &'s DtbNode<'buf>> + 's {
        self.nodes.iter()
    }

    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.node(handle).parent
    }

    /// The children of a node, most recently declared first
    pub fn children(&self, handle: NodeHandle) -> Children<'buf, 's> {
        Children {
            nodes: self.nodes,
            next: self.node(handle).children,
        }
    }

    /// Depth-first traversal of the subtree below `handle` (including `handle` itself)
    pub fn preorder(&self, handle: NodeHandle) -> Preorder<'buf, 's> {
        Preorder {
            nodes: self.nodes,
            start: handle,
            next: Some(handle),
        }
    }

    /// Resolve the number of cells that encode an address below `handle`.
    ///
    /// The node's own `#address-cells` wins, otherwise the closest ancestor that defines it is used. If none does,
    /// the result is 0.
    pub fn resolve_address_cells(&self, handle: NodeHandle) -> u32 {
        resolve_cells(self.nodes, handle, |node| node.address_cells)
    }

    /// Resolve the number of cells that encode a size below `handle`, see
    /// [`resolve_address_cells()`](DeviceTree::resolve_address_cells)
    pub fn resolve_size_cells(&self, handle: NodeHandle) -> u32 {
        resolve_cells(self.nodes, handle, |node| node.size_cells)
    }

    /// Every node that carries device information, in allocation order
    pub fn devices(&self) -> impl Iterator<Item = &'s DtbNode<'buf>> + 's {
        self.nodes.iter().filter(|node| node.is_device)
    }

    /// Call `visit` for every device node in allocation order.
    ///
    /// The walk stops as soon as `visit` breaks and the break value is returned. If every device was visited,
    /// `None` is returned.
    ///
    /// ```rust
    /// # use align_data::{include_aligned, Align64};
    /// # use early_fdt::{DeviceTree, TreeStorage};
    /// # use core::ops::ControlFlow;
    /// # static DTB: &[u8] = include_aligned!(Align64, "../test/data/riscv_virt.dtb");
    /// # let mut storage = TreeStorage::<64, 256>::new();
    /// # let tree = DeviceTree::from_buffer(DTB, &mut storage).unwrap();
    /// let uart_base = tree.walk_devices(|node| match node.compatible.contains("sifive,uart0") {
    ///     true => ControlFlow::Break(node.base_address()),
    ///     false => ControlFlow::Continue(()),
    /// });
    /// assert_eq!(uart_base, Some(Some(0x1001_0000)));
    /// ```
    pub fn walk_devices<B>(&self, mut visit: impl FnMut(&'s DtbNode<'buf>) -> ControlFlow<B>) -> Option<B> {
        for node in self.devices() {
            if let ControlFlow::Break(value) = visit(node) {
                return Some(value);
            }
        }
        None
    }

    /// Find a node by its path from the devicetree root, e.g. `/soc/serial@10010000`.
    ///
    /// Each path segment matches either the full node name or the name without unit address. If several children
    /// match, the one declared first wins.
    pub fn find_by_path(&self, path: &str) -> Option<NodeHandle> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.devicetree_root(), |current, segment| {
                self.children(current)
                    .filter(|child| child.full_name == segment || child.name == segment)
                    .last()
                    .map(|child| child.id)
            })
    }

    /// All raw properties of a node in the order in which they appeared in the blob
    pub fn properties(&self, handle: NodeHandle) -> Properties<'buf, 's> {
        Properties {
            props: self.props,
            next: self.node(handle).first_prop,
        }
    }

    /// Look up a raw property of a node by name
    pub fn property(&self, handle: NodeHandle, name: &str) -> Option<&'s Property<'buf>> {
        self.properties(handle).find(|prop| prop.name == name)
    }

    /// Iterate the strings of a `<stringlist>` encoded property, e.g. `clock-names`
    pub fn string_list(&self, handle: NodeHandle, name: &str) -> Option<StringListIterator<'buf>> {
        self.property(handle, name)
            .map(|prop| StringListIterator::new(prop.value))
    }

    /// Iterate every `(address, length)` entry of a node's `reg` property.
    ///
    /// [`DtbNode::reg`] only holds the first entry, devices like interrupt controllers often list more.
    /// `None` is returned if the node has no `reg` property or its cell widths cannot be decoded.
    pub fn reg_entries(&self, handle: NodeHandle) -> Option<RegIter<'buf>> {
        let prop = self.property(handle, REG)?;
        let address_cells = check_cell_width(self.resolve_address_cells(handle)).ok()?;
        let size_cells = check_cell_width(self.resolve_size_cells(handle)).ok()?;
        Some(RegIter {
            value: prop.value,
            address_cells,
            size_cells,
        })
    }
}

/// Iterator over the children of a node, see [`DeviceTree::children()`]
#[derive(Debug, Clone)]
pub struct Children<'buf, 's> {
    nodes: &'s [DtbNode<'buf>],
    next: Option<NodeHandle>,
}

impl<'buf, 's> Iterator for Children<'buf, 's> {
    type Item = &'s DtbNode<'buf>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.nodes[self.next?.0];
        self.next = node.sibling;
        Some(node)
    }
}

/// Depth-first iterator over a subtree, see [`DeviceTree::preorder()`]
///
/// It follows the parent and sibling links so no stack is needed.
#[derive(Debug, Clone)]
pub struct Preorder<'buf, 's> {
    nodes: &'s [DtbNode<'buf>],
    start: NodeHandle,
    next: Option<NodeHandle>,
}

impl<'buf, 's> Iterator for Preorder<'buf, 's> {
    type Item = &'s DtbNode<'buf>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.nodes[self.next?.0];

        self.next = node.children.or_else(|| {
            let mut current = node;
            loop {
                if current.id == self.start {
                    return None;
                }
                if let Some(sibling) = current.sibling {
                    return Some(sibling);
                }
                current = &self.nodes[current.parent?.0];
            }
        });
        Some(node)
    }
}

/// Iterator over the properties of a node, see [`DeviceTree::properties()`]
#[derive(Debug, Clone)]
pub struct Properties<'buf, 's> {
    props: &'s [Property<'buf>],
    next: Option<PropertyHandle>,
}

impl<'buf, 's> Iterator for Properties<'buf, 's> {
    type Item = &'s Property<'buf>;

    fn next(&mut self) -> Option<Self::Item> {
        let prop = &self.props[self.next?.0];
        self.next = prop.next;
        Some(prop)
    }
}

/// Iterator over the entries of a `reg` property, see [`DeviceTree::reg_entries()`]
#[derive(Debug, Clone)]
pub struct RegIter<'buf> {
    value: &'buf [u8],
    address_cells: usize,
    size_cells: usize,
}

impl Iterator for RegIter<'_> {
    type Item = Reg;

    fn next(&mut self) -> Option<Self::Item> {
        if self.address_cells + self.size_cells == 0 {
            return None;
        }
        let (address, consumed) = read_cells(self.value, self.address_cells)?;
        let (length, consumed_len) = read_cells(&self.value[consumed..], self.size_cells)?;
        self.value = &self.value[consumed + consumed_len..];
        Some(Reg { address, length })
    }
}
