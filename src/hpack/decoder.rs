//! HPACK header-block decoder (RFC 7541 Section 6)
//!
//! Every malformed input is a COMPRESSION_ERROR for the whole connection;
//! there is no per-field recovery, because a desynchronized dynamic table
//! poisons every later block.

use crate::error::{Error, Result};
use crate::hpack::table::HeaderTable;
use crate::hpack::{huffman, integer, HeaderField, Indexing};

/// Decoder with its dynamic table. One per connection, fed header blocks in
/// the order they arrive on the wire.
#[derive(Debug)]
pub struct Decoder {
    table: HeaderTable,
}

impl Decoder {
    /// `max_table_size` is this side's SETTINGS_HEADER_TABLE_SIZE.
    pub fn new(max_table_size: usize) -> Self {
        Decoder {
            table: HeaderTable::new(max_table_size),
        }
    }

    pub fn table(&self) -> &HeaderTable {
        &self.table
    }

    /// Tighten or relax the ceiling after a SETTINGS change.
    pub fn set_max_table_size(&mut self, max: usize) {
        self.table.set_protocol_max(max);
    }

    /// Decode one complete header block into fields, in order.
    pub fn decode(&mut self, mut block: &[u8]) -> Result<Vec<HeaderField>> {
        let mut fields = Vec::new();

        while let Some(&first) = block.first() {
            if first & 0x80 != 0 {
                // 1xxxxxxx: indexed field
                let (index, used) = integer::decode(block, 7)?;
                block = &block[used..];
                if index == 0 {
                    return Err(Error::compression("indexed field with index 0"));
                }
                let (name, value) = self.table.get(index as usize)?;
                fields.push(HeaderField {
                    name: name.to_vec(),
                    value: value.to_vec(),
                    indexing: Indexing::IncrementalIndex,
                });
            } else if first & 0xC0 == 0x40 {
                // 01xxxxxx: literal with incremental indexing
                let (field, rest) = self.decode_literal(block, 6, Indexing::IncrementalIndex)?;
                block = rest;
                self.table.insert(field.name.clone(), field.value.clone());
                fields.push(field);
            } else if first & 0xE0 == 0x20 {
                // 001xxxxx: dynamic table size update
                let (new_max, used) = integer::decode(block, 5)?;
                block = &block[used..];
                self.table.update_size(new_max as usize)?;
            } else if first & 0xF0 == 0x10 {
                // 0001xxxx: literal never indexed
                let (field, rest) = self.decode_literal(block, 4, Indexing::NeverIndex)?;
                block = rest;
                fields.push(field);
            } else {
                // 0000xxxx: literal without indexing
                let (field, rest) = self.decode_literal(block, 4, Indexing::WithoutIndex)?;
                block = rest;
                fields.push(field);
            }
        }

        Ok(fields)
    }

    /// Literal representation: name index (or literal name) then value.
    fn decode_literal<'a>(
        &self,
        block: &'a [u8],
        prefix_bits: u8,
        indexing: Indexing,
    ) -> Result<(HeaderField, &'a [u8])> {
        let (name_index, used) = integer::decode(block, prefix_bits)?;
        let mut rest = &block[used..];

        let name = if name_index == 0 {
            let (name, r) = decode_string(rest)?;
            rest = r;
            name
        } else {
            self.table.get(name_index as usize)?.0.to_vec()
        };

        let (value, rest) = decode_string(rest)?;
        Ok((HeaderField { name, value, indexing }, rest))
    }
}

/// String literal: huffman bit, 7-bit-prefix length, then octets.
fn decode_string(src: &[u8]) -> Result<(Vec<u8>, &[u8])> {
    let huffman_coded = src
        .first()
        .map(|&b| b & 0x80 != 0)
        .ok_or_else(|| Error::compression("string truncated at length octet"))?;
    let (len, used) = integer::decode(src, 7)?;
    let len = len as usize;
    let rest = &src[used..];

    if rest.len() < len {
        return Err(Error::compression("string length exceeds block"));
    }
    let (octets, rest) = rest.split_at(len);

    let octets = if huffman_coded {
        huffman::decode(octets)?
    } else {
        octets.to_vec()
    };
    Ok((octets, rest))
}
