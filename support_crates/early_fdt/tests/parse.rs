mod common;

use common::{patch_header, BlobBuilder, MAGIC};
use core::ops::ControlFlow;
use early_fdt::fdt::{
    FdtHeader, HeaderReadError, MemoryReservationEntry, StringsError, StructureError,
};
use early_fdt::{DeviceTree, FdtError, Reg, TreeStorage};

fn structure_error(result: Result<DeviceTree<'_, '_>, FdtError>) -> StructureError {
    match result {
        Err(FdtError::StructureError(e)) => e,
        other => panic!("expected a structure error but got {:?}", other),
    }
}

#[test]
fn header_fields_are_read_in_host_order() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .end_node()
        .end()
        .finish();
    let header = FdtHeader::read_from_buffer(&blob).unwrap();

    assert_eq!(header.magic, MAGIC);
    assert_eq!(header.total_size as usize, blob.len());
    assert_eq!(header.off_mem_rsvmap, 40);
    assert_eq!(header.off_dt_struct, 56);
    assert_eq!(header.size_dt_struct, 16);
    assert_eq!(header.off_dt_strings, 72);
    assert_eq!(header.size_dt_strings, 0);
    assert_eq!(header.version, 17);
    assert_eq!(header.last_comp_version, 16);
}

#[test]
fn wrong_magic_is_rejected() {
    let mut blob = BlobBuilder::new().begin_node("").end_node().end().finish();
    patch_header(&mut blob, 0, 0xfeedd00d);

    let mut storage = TreeStorage::<4, 4>::new();
    assert_eq!(
        DeviceTree::from_buffer(&blob, &mut storage).unwrap_err(),
        FdtError::HeaderParseError(HeaderReadError::InvalidMagic(0xfeedd00d))
    );
}

#[test]
fn truncated_blobs_are_rejected() {
    let blob = BlobBuilder::new().begin_node("").end_node().end().finish();

    assert!(matches!(
        FdtHeader::read_from_buffer(&blob[..20]),
        Err(HeaderReadError::TruncatedBlob { available: 20, .. })
    ));
    assert!(matches!(
        FdtHeader::read_from_buffer(&blob[..blob.len() - 1]),
        Err(HeaderReadError::TruncatedBlob { .. })
    ));

    let mut blob = blob;
    patch_header(&mut blob, 3, 0x1000);
    assert!(matches!(
        FdtHeader::read_from_buffer(&blob),
        Err(HeaderReadError::OffsetOutOfRange {
            block: "strings",
            ..
        })
    ));
}

#[test]
fn balanced_nesting_yields_one_node_per_pair() {
    const DEPTH: usize = 6;
    let mut builder = BlobBuilder::new();
    for level in 0..DEPTH {
        builder.begin_node(if level == 0 { "" } else { "level" });
    }
    for _ in 0..DEPTH {
        builder.end_node();
    }
    let blob = builder.end().finish();

    let mut storage = TreeStorage::<16, 4>::new();
    let tree = DeviceTree::from_buffer(&blob, &mut storage).unwrap();
    assert_eq!(tree.len(), DEPTH + 1);
    assert_eq!(tree.max_depth(), DEPTH);
    assert_eq!(tree.nodes().map(|node| node.depth).max(), Some(DEPTH));
}

#[test]
fn siblings_stay_at_the_same_depth() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .begin_node("a")
        .end_node()
        .begin_node("b")
        .end_node()
        .begin_node("c")
        .end_node()
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<8, 4>::new();
    let tree = DeviceTree::from_buffer(&blob, &mut storage).unwrap();
    assert_eq!(tree.len(), 5);
    assert_eq!(tree.max_depth(), 2);

    let root = tree.devicetree_root();
    let names: Vec<_> = tree.children(root).map(|node| node.name).collect();
    assert_eq!(names, ["c", "b", "a"]);
    assert!(tree
        .children(root)
        .all(|node| node.parent == Some(root) && node.depth == 2));
}

#[test]
fn surplus_end_node_is_detected() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .end_node()
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 4>::new();
    assert!(matches!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::UnbalancedNodeEnd { depth: 0, .. }
    ));
}

#[test]
fn premature_end_is_detected() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .begin_node("cpus")
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 4>::new();
    assert!(matches!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::UnbalancedNodeEnd { depth: 1, .. }
    ));
}

#[test]
fn missing_end_token_is_truncation() {
    let blob = BlobBuilder::new().begin_node("").end_node().finish();

    let mut storage = TreeStorage::<4, 4>::new();
    assert!(matches!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::TruncatedStructBlock { wanted: 4, .. }
    ));
}

#[test]
fn property_running_past_the_block_is_truncation() {
    let mut builder = BlobBuilder::new();
    builder.begin_node("").token(common::PROP);
    builder.token(64);
    let blob = builder.finish();

    let mut storage = TreeStorage::<4, 4>::new();
    assert!(matches!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::TruncatedStructBlock { .. }
    ));
}

#[test]
fn unknown_tokens_are_rejected() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .token(0x7)
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 4>::new();
    assert_eq!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::InvalidToken {
            token: 0x7,
            offset: 56 + 8
        }
    );
}

#[test]
fn nop_tokens_are_skipped() {
    let blob = BlobBuilder::new()
        .nop()
        .begin_node("")
        .nop()
        .prop_u32("#address-cells", 1)
        .nop()
        .begin_node("chosen")
        .end_node()
        .nop()
        .end_node()
        .nop()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 4>::new();
    let tree = DeviceTree::from_buffer(&blob, &mut storage).unwrap();
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.node(tree.devicetree_root()).address_cells, Some(1));
}

#[test]
fn bad_property_name_offset_is_rejected() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .prop("model", b"virt\0")
        .prop_at(0x100, &[0, 0, 0, 1])
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 4>::new();
    assert!(matches!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::MalformedPropertyName(StringsError::OutOfBounds(0x100, _))
    ));
}

#[test]
fn cells_are_inherited_when_decoding_reg() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .prop_u32("#address-cells", 2)
        .prop_u32("#size-cells", 1)
        .begin_node("soc")
        .begin_node("uart@10010000")
        .prop_cells("reg", &[0x1, 0x1001_0000, 0x1000])
        .end_node()
        .end_node()
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<8, 8>::new();
    let tree = DeviceTree::from_buffer(&blob, &mut storage).unwrap();
    let uart = tree.find_by_path("/soc/uart").unwrap();
    let node = tree.node(uart);

    assert_eq!(tree.resolve_address_cells(uart), 2);
    assert_eq!(tree.resolve_size_cells(uart), 1);
    assert_eq!(
        node.reg,
        Some(Reg {
            address: 0x1_1001_0000,
            length: 0x1000
        })
    );
    assert_eq!(node.name, "uart");
    assert_eq!(node.address, Some(0x1001_0000));
    assert!(node.is_device);
    assert!(!tree.node(tree.find_by_path("/soc").unwrap()).is_device);
}

#[test]
fn three_cell_addresses_are_unsupported() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .prop_u32("#address-cells", 3)
        .prop_u32("#size-cells", 1)
        .begin_node("pci@0")
        .prop_cells("reg", &[0, 0, 0, 0])
        .end_node()
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<8, 8>::new();
    assert_eq!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::UnsupportedCellWidth { cells: 3 }
    );
}

#[test]
fn compatible_lists_are_split() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .begin_node("serial@10000000")
        .prop("compatible", b"sifive,uart0\0ns16550a\0")
        .end_node()
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 4>::new();
    let tree = DeviceTree::from_buffer(&blob, &mut storage).unwrap();
    let serial = tree.node(tree.find_by_path("/serial@10000000").unwrap());

    assert_eq!(serial.compatible.as_slice(), ["sifive,uart0", "ns16550a"]);
    assert!(serial.compatible.contains("ns16550a"));
    assert!(serial.is_device);
    assert_eq!(serial.base_address(), Some(0x1000_0000));
}

#[test]
fn too_many_compatible_strings_are_rejected() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .prop("compatible", b"a\0b\0c\0d\0e\0f\0g\0h\0i\0")
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 4>::new();
    assert_eq!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::TooManyCompatibleStrings { limit: 8 }
    );
}

#[test]
fn repeated_properties_replace_the_value() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .prop("status", b"disabled\0")
        .prop("model", b"virt\0")
        .prop("status", b"okay\0")
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 4>::new();
    let tree = DeviceTree::from_buffer(&blob, &mut storage).unwrap();
    let root = tree.devicetree_root();

    let props: Vec<_> = tree
        .properties(root)
        .map(|prop| (prop.name, prop.value))
        .collect();
    assert_eq!(
        props,
        [("status", &b"okay\0"[..]), ("model", &b"virt\0"[..])]
    );
}

#[test]
fn memory_is_found_by_walking_devices() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .prop_u32("#address-cells", 2)
        .prop_u32("#size-cells", 2)
        .begin_node("memory@80000000")
        .prop("device_type", b"memory\0")
        .prop_cells("reg", &[0x0, 0x8000_0000, 0x0, 0x800_0000])
        .end_node()
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 8>::new();
    let tree = DeviceTree::from_buffer(&blob, &mut storage).unwrap();

    let mut visits = 0;
    let memory = tree.walk_devices(|node| {
        visits += 1;
        match node.name {
            "memory" => ControlFlow::Break(node.reg),
            _ => ControlFlow::Continue(()),
        }
    });
    assert_eq!(
        memory,
        Some(Some(Reg {
            address: 0x8000_0000,
            length: 0x800_0000
        }))
    );
    assert_eq!(visits, 1);

    let mut visits = 0;
    assert_eq!(
        tree.walk_devices::<()>(|_| {
            visits += 1;
            ControlFlow::Continue(())
        }),
        None
    );
    assert_eq!(visits, tree.devices().count());
}

#[test]
fn one_size_cell_reads_the_third_reg_cell_as_length() {
    // a 4 cell reg decoded with #address-cells = <2> and #size-cells = <1>
    let blob = BlobBuilder::new()
        .begin_node("")
        .prop_u32("#address-cells", 2)
        .prop_u32("#size-cells", 1)
        .begin_node("memory@80000000")
        .prop_cells("reg", &[0x0, 0x8000_0000, 0x0, 0x800_0000])
        .end_node()
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 8>::new();
    let tree = DeviceTree::from_buffer(&blob, &mut storage).unwrap();
    let memory = tree.walk_devices(|node| match node.name {
        "memory" => ControlFlow::Break(node.reg),
        _ => ControlFlow::Continue(()),
    });
    assert_eq!(
        memory,
        Some(Some(Reg {
            address: 0x8000_0000,
            length: 0
        }))
    );
}

#[test]
fn node_names_must_be_utf8() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .begin_node_bytes(b"uart\xff@0")
        .end_node()
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<4, 4>::new();
    // the name follows the child's FDT_BEGIN_NODE at 56 + 8
    assert_eq!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::InvalidNodeName { offset: 56 + 12 }
    );
}

#[test]
fn arena_capacity_bounds_the_tree() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .begin_node("a")
        .end_node()
        .begin_node("b")
        .end_node()
        .end_node()
        .end()
        .finish();

    // synthetic root, `/`, `a` and `b`
    let mut storage = TreeStorage::<4, 1>::new();
    assert!(DeviceTree::from_buffer(&blob, &mut storage).is_ok());

    let mut storage = TreeStorage::<3, 1>::new();
    assert!(matches!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::ArenaExhausted(exhausted) if exhausted.capacity == 3
    ));
}

#[test]
fn property_capacity_bounds_the_tree() {
    let blob = BlobBuilder::new()
        .begin_node("")
        .prop("model", b"virt\0")
        .prop("serial-number", b"1\0")
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<2, 1>::new();
    assert!(matches!(
        structure_error(DeviceTree::from_buffer(&blob, &mut storage)),
        StructureError::ArenaExhausted(_)
    ));
}

#[test]
fn memory_reservations_are_listed() {
    let blob = BlobBuilder::new()
        .reservation(0x8000_0000, 0x4_0000)
        .reservation(0x8800_0000, 0x1000)
        .begin_node("")
        .end_node()
        .end()
        .finish();

    let mut storage = TreeStorage::<2, 1>::new();
    let tree = DeviceTree::from_buffer(&blob, &mut storage).unwrap();
    let entries: Vec<_> = tree.memory_reservations().collect();
    assert_eq!(
        entries,
        [
            MemoryReservationEntry::new(0x8000_0000, 0x4_0000),
            MemoryReservationEntry::new(0x8800_0000, 0x1000)
        ]
    );
}
