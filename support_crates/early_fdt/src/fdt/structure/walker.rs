//! Single pass construction of the node tree from the structure block

use crate::arena::Arena;
use crate::fdt::structure::buf_tools::TokenCursor;
use crate::fdt::structure::node::{DtbNode, NodeHandle};
use crate::fdt::structure::property::{apply_property, Property, PropertyHandle};
use crate::fdt::structure::{
    StructureError, FDT_BEGIN_NODE, FDT_END, FDT_END_NODE, FDT_NOP, FDT_PROP,
};
use crate::fdt::{FdtHeader, Strings};

/// The outcome of a successful walk over the structure block
#[derive(Debug)]
pub(crate) struct ParsedTree<'s, 'buf> {
    pub root: NodeHandle,
    pub nodes: &'s [DtbNode<'buf>],
    pub props: &'s [Property<'buf>],
    pub max_depth: usize,
}

struct TreeBuilder<'s, 'buf> {
    cursor: TokenCursor<'buf>,
    strings: Strings<'buf>,
    nodes: Arena<'s, DtbNode<'buf>>,
    props: Arena<'s, Property<'buf>>,
    root: NodeHandle,
    current: NodeHandle,
    depth: usize,
    max_depth: usize,
}

/// Walk the structure block of `blob` and build the node tree in the given arenas.
///
/// `header` must have been read from `blob` so that the block offsets are known to lie inside of it.
/// The first error aborts the walk; whatever was already placed into the arenas must then be considered garbage.
pub(crate) fn walk<'s, 'buf>(
    header: &FdtHeader,
    blob: &'buf [u8],
    mut nodes: Arena<'s, DtbNode<'buf>>,
    props: Arena<'s, Property<'buf>>,
) -> Result<ParsedTree<'s, 'buf>, StructureError> {
    let struct_block = header
        .struct_range()
        .and_then(|range| blob.get(range))
        .unwrap_or_default();
    let strings_block = header
        .strings_range()
        .and_then(|range| blob.get(range))
        .unwrap_or_default();

    let root = NodeHandle(nodes.len());
    nodes.alloc(DtbNode::new(root, "", header.off_dt_struct as usize, 0))?;

    TreeBuilder {
        cursor: TokenCursor::new(struct_block, header.off_dt_struct as usize),
        strings: Strings::from_buffer(strings_block),
        nodes,
        props,
        root,
        current: root,
        depth: 0,
        max_depth: 0,
    }
    .build()
}

impl<'s, 'buf> TreeBuilder<'s, 'buf> {
    fn build(mut self) -> Result<ParsedTree<'s, 'buf>, StructureError> {
        loop {
            let offset = self.cursor.blob_offset();
            match self.cursor.read_u32()? {
                FDT_BEGIN_NODE => self.begin_node(offset)?,
                FDT_END_NODE => self.end_node(offset)?,
                FDT_PROP => self.property()?,
                FDT_NOP => {}
                FDT_END => {
                    if self.depth != 0 {
                        return Err(StructureError::UnbalancedNodeEnd {
                            offset,
                            depth: self.depth,
                        });
                    }
                    break;
                }
                token => return Err(StructureError::InvalidToken { token, offset }),
            }
        }

        log::debug!(
            "device tree holds {} nodes and {} properties, nested {} levels deep",
            self.nodes.len(),
            self.props.len(),
            self.max_depth
        );
        Ok(ParsedTree {
            root: self.root,
            nodes: self.nodes.into_slice(),
            props: self.props.into_slice(),
            max_depth: self.max_depth,
        })
    }

    fn begin_node(&mut self, offset: usize) -> Result<(), StructureError> {
        let name_offset = self.cursor.blob_offset();
        let full_name = core::str::from_utf8(self.cursor.read_cstr_aligned()?)
            .map_err(|_| StructureError::InvalidNodeName {
                offset: name_offset,
            })?;

        let handle = NodeHandle(self.nodes.len());
        let mut node = DtbNode::new(handle, full_name, offset, self.depth + 1);
        node.parent = Some(self.current);
        // children are prepended, so the previous head becomes the next sibling
        node.sibling = self.nodes.as_slice()[self.current.0].children;
        self.nodes.alloc(node)?;
        self.nodes.as_mut_slice()[self.current.0].children = Some(handle);
        log::trace!("node {} at {:#x}", full_name, offset);

        self.current = handle;
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        Ok(())
    }

    fn end_node(&mut self, offset: usize) -> Result<(), StructureError> {
        let parent = match self.nodes.as_slice()[self.current.0].parent {
            Some(parent) if self.depth > 0 => parent,
            _ => {
                return Err(StructureError::UnbalancedNodeEnd {
                    offset,
                    depth: self.depth,
                })
            }
        };
        self.current = parent;
        self.depth -= 1;
        Ok(())
    }

    fn property(&mut self) -> Result<(), StructureError> {
        let len = self.cursor.read_u32()? as usize;
        let name_offset = self.cursor.read_u32()? as usize;
        let value = self.cursor.read_bytes_aligned(len)?;
        let name = self.strings.get_string(name_offset)?;
        log::trace!("  property {} ({} bytes)", name, len);

        self.store_property(name, value)?;
        apply_property(self.nodes.as_mut_slice(), self.current, name, value)
    }

    /// Append the raw property to the current node's list, replacing the value of an equally named one
    fn store_property(&mut self, name: &'buf str, value: &'buf [u8]) -> Result<(), StructureError> {
        let node = &self.nodes.as_slice()[self.current.0];

        let mut existing = node.first_prop;
        while let Some(handle) = existing {
            let prop = &mut self.props.as_mut_slice()[handle.0];
            if prop.name == name {
                prop.value = value;
                return Ok(());
            }
            existing = prop.next;
        }

        let last = node.last_prop;
        let handle = PropertyHandle(self.props.alloc(Property::new(name, value))?);
        if let Some(last) = last {
            self.props.as_mut_slice()[last.0].next = Some(handle);
        }
        let node = &mut self.nodes.as_mut_slice()[self.current.0];
        node.first_prop.get_or_insert(handle);
        node.last_prop = Some(handle);
        Ok(())
    }
}
