//! HPACK header-block encoder (RFC 7541 Section 6)
//!
//! Keeps its own dynamic table in lockstep with the peer's decoder: every
//! incremental literal it emits is inserted locally, so combined-space
//! indices mean the same thing on both ends.

use crate::hpack::table::HeaderTable;
use crate::hpack::{huffman, integer, HeaderField, Indexing};

/// Encoder with its dynamic table. One per connection.
#[derive(Debug)]
pub struct Encoder {
    table: HeaderTable,
    /// Size update to emit at the start of the next block, if any
    pending_size_update: Option<usize>,
}

impl Encoder {
    /// `max_table_size` is the peer's SETTINGS_HEADER_TABLE_SIZE.
    pub fn new(max_table_size: usize) -> Self {
        Encoder {
            table: HeaderTable::new(max_table_size),
            pending_size_update: None,
        }
    }

    pub fn table(&self) -> &HeaderTable {
        &self.table
    }

    /// Schedule a dynamic table size update for the next block. Takes
    /// effect locally at once so eviction stays in sync with the peer.
    pub fn set_table_size(&mut self, new_max: usize) {
        self.table.set_protocol_max(new_max);
        self.pending_size_update = Some(new_max);
    }

    /// Encode a header list into one block.
    pub fn encode(&mut self, fields: &[HeaderField]) -> Vec<u8> {
        let mut block = Vec::new();

        if let Some(new_max) = self.pending_size_update.take() {
            integer::encode(new_max as u64, 5, 0x20, &mut block);
        }

        for field in fields {
            self.encode_field(field, &mut block);
        }
        block
    }

    fn encode_field(&mut self, field: &HeaderField, block: &mut Vec<u8>) {
        // Sensitive fields bypass all indexing, including lookup by value
        if field.indexing == Indexing::NeverIndex {
            let name_index = self
                .table
                .find(&field.name, &field.value)
                .map(|(i, _)| i)
                .unwrap_or(0);
            integer::encode(name_index as u64, 4, 0x10, block);
            if name_index == 0 {
                encode_string(&field.name, block);
            }
            encode_string(&field.value, block);
            return;
        }

        match self.table.find(&field.name, &field.value) {
            Some((index, true)) => {
                integer::encode(index as u64, 7, 0x80, block);
            }
            found => {
                let name_index = found.map(|(i, _)| i).unwrap_or(0);
                // Entries that would evict the whole table are not worth
                // indexing; emit without-indexing instead
                let index_it = field.indexing == Indexing::IncrementalIndex
                    && field.table_size() <= self.table.max_size();

                if index_it {
                    integer::encode(name_index as u64, 6, 0x40, block);
                } else {
                    integer::encode(name_index as u64, 4, 0x00, block);
                }
                if name_index == 0 {
                    encode_string(&field.name, block);
                }
                encode_string(&field.value, block);

                if index_it {
                    self.table.insert(field.name.clone(), field.value.clone());
                }
            }
        }
    }
}

/// String literal, Huffman-coded when that is shorter.
fn encode_string(octets: &[u8], block: &mut Vec<u8>) {
    let (encoded, huffman_coded) = huffman::encode_if_smaller(octets);
    let flag = if huffman_coded { 0x80 } else { 0x00 };
    integer::encode(encoded.len() as u64, 7, flag, block);
    block.extend_from_slice(&encoded);
}
