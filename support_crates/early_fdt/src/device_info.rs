//! Answers to the questions early boot code has about the machine it runs on

use crate::fdt::{DeviceTree, DtbNode, MemoryReservationEntry};
use core::cmp::{max, Ordering};
use core::ops::ControlFlow;

/// Node name prefix under which M-mode firmware (e.g. OpenSBI) describes the memory it occupies
pub const MMODE_RESERVATION_PREFIX: &str = "mmode_resv";

/// A contiguous range of physical memory
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MemoryRegion {
    pub start: u64,
    pub length: u64,
}

impl MemoryRegion {
    /// The first address after this region
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }
}

impl From<MemoryReservationEntry> for MemoryRegion {
    fn from(entry: MemoryReservationEntry) -> Self {
        Self {
            start: entry.address,
            length: entry.size,
        }
    }
}

/// Where a serial console lives and which interrupt it raises
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SerialPort {
    pub base: u64,
    pub irq: Option<u32>,
}

/// Information about the device on which the kernel is currently executing
#[derive(Debug, Clone, Copy)]
pub struct DeviceInfo<'t, 'buf, 's> {
    tree: &'t DeviceTree<'buf, 's>,
}

impl<'t, 'buf, 's> DeviceInfo<'t, 'buf, 's> {
    pub fn new(tree: &'t DeviceTree<'buf, 's>) -> Self {
        Self { tree }
    }

    /// The first device that claims to be compatible with `compatible`
    pub fn find_compatible(&self, compatible: &str) -> Option<&'s DtbNode<'buf>> {
        self.tree.walk_devices(|node| match node.compatible.contains(compatible) {
            true => ControlFlow::Break(node),
            false => ControlFlow::Continue(()),
        })
    }

    /// The hart ids of all cpus, in the order in which they are declared
    pub fn cpu_ids(&self) -> impl Iterator<Item = u64> + 's {
        let nodes: &'s [DtbNode<'s>] = self.tree.nodes;
        nodes
            .iter()
            .filter(move |node| {
                node.name == "cpu"
                    && node
                        .parent
                        .is_some_and(|parent| nodes[parent.0].name == "cpus")
            })
            .filter_map(|node| node.base_address())
    }

    /// The platform level interrupt controller
    ///
    /// Any device with a `*plic*` compatible string qualifies, e.g. `sifive,plic-1.0.0` or `riscv,plic0`.
    pub fn interrupt_controller(&self) -> Option<&'s DtbNode<'buf>> {
        self.tree.walk_devices(|node| {
            match node.compatible.iter().any(|entry| entry.contains("plic")) {
                true => ControlFlow::Break(node),
                false => ControlFlow::Continue(()),
            }
        })
    }

    /// Locate a serial port that is compatible with `compatible`, e.g. `sifive,uart0` or `ns16550a`
    pub fn uart(&self, compatible: &str) -> Option<SerialPort> {
        let node = self.find_compatible(compatible)?;
        let base = node.base_address()?;
        log::trace!("found uart {} at {:#x}", node.full_name, base);
        Some(SerialPort {
            base,
            irq: node.irq,
        })
    }

    /// Search for memory description in the device tree and return the starting address and size of it.
    ///
    /// **Note**: The memory returned here includes **all** device memory, including reserved regions.
    /// See [`usable_memory()`](DeviceInfo::usable_memory) for what is left after those are taken out.
    ///
    /// # Device Tree Details
    /// The memory is described by the first `reg` entry of the */memory* node.
    ///
    /// For details about the node, see the [DeviceTree specs /memory node](https://devicetree-specification.readthedocs.io/en/v0.3/devicenodes.html#memory-node).
    pub fn memory(&self) -> Option<MemoryRegion> {
        log::trace!("searching for memory node in device tree");
        let node = self.tree.walk_devices(|node| match node.name {
            "memory" => ControlFlow::Break(node),
            _ => ControlFlow::Continue(()),
        })?;
        let reg = node.reg?;
        log::trace!(
            "found memory node {} start = {:#x} len = {:#x}",
            node.full_name,
            reg.address,
            reg.length
        );
        Some(MemoryRegion {
            start: reg.address,
            length: reg.length,
        })
    }

    /// Memory regions that the M-mode firmware has reserved for itself
    pub fn reserved_regions(&self) -> impl Iterator<Item = MemoryRegion> + 's {
        let nodes: &'s [DtbNode<'s>] = self.tree.nodes;
        nodes
            .iter()
            .filter(|node| node.is_device && node.name.starts_with(MMODE_RESERVATION_PREFIX))
            .filter_map(|node| node.reg)
            .map(|reg| MemoryRegion {
                start: reg.address,
                length: reg.length,
            })
    }

    /// Concatenate every firmware reservation and every entry of the memory reservation block into one region.
    ///
    /// **Note**: This only makes sense when the reserved memory lies completely at the beginning or end of the
    /// whole devices memory. Otherwise the area in the middle is included through the concatenation.
    pub fn reserved_memory(&self) -> Option<MemoryRegion> {
        self.reserved_regions()
            .chain(self.tree.memory_reservations().map(MemoryRegion::from))
            .reduce(|a, b| match a.start.cmp(&b.start) {
                Ordering::Less => MemoryRegion {
                    start: a.start,
                    length: max(a.end(), b.end()) - a.start,
                },
                Ordering::Equal => MemoryRegion {
                    start: a.start,
                    length: max(a.length, b.length),
                },
                Ordering::Greater => MemoryRegion {
                    start: b.start,
                    length: max(a.end(), b.end()) - b.start,
                },
            })
    }

    /// The part of [`memory()`](DeviceInfo::memory) that is free for general purpose use
    ///
    /// Reserved memory is only cut off if it sits at the bottom of physical memory.
    pub fn usable_memory(&self) -> Option<MemoryRegion> {
        let memory = self.memory()?;
        match self.reserved_memory() {
            Some(reserved) if reserved.start == memory.start => Some(MemoryRegion {
                start: reserved.end(),
                length: memory.length.saturating_sub(reserved.length),
            }),
            Some(reserved) => {
                log::warn!(
                    "reserved memory at {:#x} is not at the start of memory {:#x}, ignoring it",
                    reserved.start,
                    memory.start
                );
                Some(memory)
            }
            None => Some(memory),
        }
    }
}
