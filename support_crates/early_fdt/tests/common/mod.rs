//! Assembly of flattened device tree blobs for tests

#![allow(dead_code)]

pub const MAGIC: u32 = 0xd00dfeed;
pub const BEGIN_NODE: u32 = 1;
pub const END_NODE: u32 = 2;
pub const PROP: u32 = 3;
pub const NOP: u32 = 4;
pub const END: u32 = 9;

/// Writes tokens into a structure block and deduplicates property names in a strings block
#[derive(Debug, Default)]
pub struct BlobBuilder {
    structure: Vec<u8>,
    strings: Vec<u8>,
    reservations: Vec<(u64, u64)>,
}

impl BlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&mut self, token: u32) -> &mut Self {
        self.structure.extend_from_slice(&token.to_be_bytes());
        self
    }

    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.begin_node_bytes(name.as_bytes())
    }

    /// Emit a node name without checking that it is valid UTF-8
    pub fn begin_node_bytes(&mut self, name: &[u8]) -> &mut Self {
        self.token(BEGIN_NODE);
        self.structure.extend_from_slice(name);
        self.structure.push(0);
        self.pad();
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.token(END_NODE)
    }

    pub fn nop(&mut self) -> &mut Self {
        self.token(NOP)
    }

    pub fn end(&mut self) -> &mut Self {
        self.token(END)
    }

    pub fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let name_offset = self.string_offset(name);
        self.prop_at(name_offset, value)
    }

    /// Emit a property whose name offset is not checked against the strings block
    pub fn prop_at(&mut self, name_offset: u32, value: &[u8]) -> &mut Self {
        self.token(PROP);
        self.structure
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.structure.extend_from_slice(&name_offset.to_be_bytes());
        self.structure.extend_from_slice(value);
        self.pad();
        self
    }

    pub fn prop_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop_cells(name, &[value])
    }

    pub fn prop_cells(&mut self, name: &str, cells: &[u32]) -> &mut Self {
        let value: Vec<u8> = cells.iter().flat_map(|cell| cell.to_be_bytes()).collect();
        self.prop(name, &value)
    }

    pub fn reservation(&mut self, address: u64, size: u64) -> &mut Self {
        self.reservations.push((address, size));
        self
    }

    /// Assemble header, memory reservation block, structure block and strings block
    pub fn finish(&self) -> Vec<u8> {
        let off_rsvmap = 40;
        let rsvmap_len = (self.reservations.len() + 1) * 16;
        let off_struct = off_rsvmap + rsvmap_len;
        let off_strings = off_struct + self.structure.len();
        let total_size = off_strings + self.strings.len();

        let header = [
            MAGIC,
            total_size as u32,
            off_struct as u32,
            off_strings as u32,
            off_rsvmap as u32,
            17,
            16,
            0,
            self.strings.len() as u32,
            self.structure.len() as u32,
        ];

        let mut blob = Vec::with_capacity(total_size);
        blob.extend(header.iter().flat_map(|field| field.to_be_bytes()));
        for (address, size) in self.reservations.iter().chain(&[(0, 0)]) {
            blob.extend_from_slice(&address.to_be_bytes());
            blob.extend_from_slice(&size.to_be_bytes());
        }
        blob.extend_from_slice(&self.structure);
        blob.extend_from_slice(&self.strings);
        blob
    }

    fn string_offset(&mut self, name: &str) -> u32 {
        let mut offset = 0;
        for existing in self.strings.split(|byte| *byte == 0) {
            if existing == name.as_bytes() && offset < self.strings.len() {
                return offset as u32;
            }
            offset += existing.len() + 1;
        }
        let offset = self.strings.len();
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        offset as u32
    }

    fn pad(&mut self) {
        while self.structure.len() % 4 != 0 {
            self.structure.push(0);
        }
    }
}

/// Overwrite a big-endian header field, `index` counting 32-bit words from the start of the blob
pub fn patch_header(blob: &mut [u8], index: usize, value: u32) {
    blob[index * 4..index * 4 + 4].copy_from_slice(&value.to_be_bytes());
}
