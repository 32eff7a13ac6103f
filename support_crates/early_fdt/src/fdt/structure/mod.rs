//! Structure Block handling implementation
//!
//! This implementation is according to [Devicetree Specification, Section 5.4](https://devicetree-specification.readthedocs.io/en/v0.3/flattened-format.html#structure-block)
//!
//! The structure block describes the structure and contents of the devicetree itself.
//! It is composed of a sequence of nodes with properties.
//! These are organized into a linear tree structure.

use crate::arena::ArenaExhausted;
use crate::fdt::StringsError;
use thiserror_no_std::Error;

/// The FDT_BEGIN_NODE token marks the beginning of a node’s representation.
/// It shall be followed by the node’s unit name as extra data.
/// The name is stored as a null-terminated string, and shall include the unit address (see [Devicetree Specification, Section 2.2.1](https://devicetree-specification.readthedocs.io/en/v0.3/devicetree-basics.html#sect-node-names)), if any.
/// The node name is followed by zeroed padding bytes, if necessary for alignment, and then the next token, which may be any token except FDT_END.
pub(crate) const FDT_BEGIN_NODE: u32 = 0x00000001;

/// The FDT_END_NODE token marks the end of a node’s representation.
/// This token has no extra data; so it is followed immediately by the next token, which may be any token except FDT_PROP.
pub(crate) const FDT_END_NODE: u32 = 0x00000002;

/// The FDT_PROP token marks the beginning of the representation of one property in the devicetree.
/// It is followed by the value length and the name offset (both `u32`) and then the value itself.
pub(crate) const FDT_PROP: u32 = 0x00000003;

/// The FDT_NOP token will be ignored by any program parsing the device tree.
/// This token has no extra data; so it is followed immediately by the next token, which can be any valid token.
/// A property or node definition in the tree can be overwritten with FDT_NOP tokens to remove it from the tree without needing to move other sections of the tree’s representation in the devicetree blob.
pub(crate) const FDT_NOP: u32 = 0x00000004;

/// The FDT_END token marks the end of the structure block.
/// There shall be only one FDT_END token, and it shall be the last token in the structure block.
pub(crate) const FDT_END: u32 = 0x00000009;

pub(crate) mod buf_tools;
pub(crate) mod node;
pub(crate) mod property;
pub(crate) mod property_value_encoding;
pub(crate) mod walker;

/// Everything that can go wrong while turning the structure block into a tree
#[derive(Debug, Error, Eq, PartialEq, Copy, Clone)]
pub enum StructureError {
    #[error("Reading {wanted} bytes at offset {offset:#x} would run past the end of the structure block")]
    TruncatedStructBlock { offset: usize, wanted: usize },
    #[error("The FDT_END_NODE or FDT_END token at offset {offset:#x} does not match the current nesting depth {depth}")]
    UnbalancedNodeEnd { offset: usize, depth: usize },
    #[error("The structure block contains the unknown token {token:#x} at offset {offset:#x}")]
    InvalidToken { token: u32, offset: usize },
    #[error("The name of the node at offset {offset:#x} is not valid UTF-8")]
    InvalidNodeName { offset: usize },
    #[error("The property name could not be resolved: {0}")]
    MalformedPropertyName(#[from] StringsError),
    #[error("Cannot decode values that span {cells} cells, at most 2 are supported")]
    UnsupportedCellWidth { cells: u32 },
    #[error("The value of the {property} property is malformed")]
    InvalidPropertyValue { property: &'static str },
    #[error("The compatible property lists more than {limit} strings")]
    TooManyCompatibleStrings { limit: usize },
    #[error("The tree does not fit into its storage: {0}")]
    ArenaExhausted(#[from] ArenaExhausted),
}
