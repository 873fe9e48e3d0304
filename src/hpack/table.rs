//! HPACK indexing tables (RFC 7541 Sections 2.3 and 4)
//!
//! A single index address space covers the 61-entry static table followed by
//! the dynamic table, newest entry first. The dynamic table is bounded by a
//! size the encoder announces in size-update representations, itself capped
//! by the SETTINGS_HEADER_TABLE_SIZE the decoder's side advertised.

use crate::error::{Error, Result};
use crate::hpack::HeaderField;
use std::collections::VecDeque;

/// Per-entry accounting overhead (RFC 7541 Section 4.1).
pub const ENTRY_OVERHEAD: usize = 32;

/// Number of entries in the static table.
pub const STATIC_TABLE_LEN: usize = 61;

/// RFC 7541 Appendix A, indices 1 through 61.
#[rustfmt::skip]
const STATIC_TABLE: [(&[u8], &[u8]); STATIC_TABLE_LEN] = [
    (b":authority", b""),
    (b":method", b"GET"),
    (b":method", b"POST"),
    (b":path", b"/"),
    (b":path", b"/index.html"),
    (b":scheme", b"http"),
    (b":scheme", b"https"),
    (b":status", b"200"),
    (b":status", b"204"),
    (b":status", b"206"),
    (b":status", b"304"),
    (b":status", b"400"),
    (b":status", b"404"),
    (b":status", b"500"),
    (b"accept-charset", b""),
    (b"accept-encoding", b"gzip, deflate"),
    (b"accept-language", b""),
    (b"accept-ranges", b""),
    (b"accept", b""),
    (b"access-control-allow-origin", b""),
    (b"age", b""),
    (b"allow", b""),
    (b"authorization", b""),
    (b"cache-control", b""),
    (b"content-disposition", b""),
    (b"content-encoding", b""),
    (b"content-language", b""),
    (b"content-length", b""),
    (b"content-location", b""),
    (b"content-range", b""),
    (b"content-type", b""),
    (b"cookie", b""),
    (b"date", b""),
    (b"etag", b""),
    (b"expect", b""),
    (b"expires", b""),
    (b"from", b""),
    (b"host", b""),
    (b"if-match", b""),
    (b"if-modified-since", b""),
    (b"if-none-match", b""),
    (b"if-range", b""),
    (b"if-unmodified-since", b""),
    (b"last-modified", b""),
    (b"link", b""),
    (b"location", b""),
    (b"max-forwards", b""),
    (b"proxy-authenticate", b""),
    (b"proxy-authorization", b""),
    (b"range", b""),
    (b"referer", b""),
    (b"refresh", b""),
    (b"retry-after", b""),
    (b"server", b""),
    (b"set-cookie", b""),
    (b"strict-transport-security", b""),
    (b"transfer-encoding", b""),
    (b"user-agent", b""),
    (b"vary", b""),
    (b"via", b""),
    (b"www-authenticate", b""),
];

/// Read-only access to the static table.
pub struct StaticTable;

impl StaticTable {
    /// Entry at 1-based index `index`, or None outside 1..=61.
    pub fn get(index: usize) -> Option<(&'static [u8], &'static [u8])> {
        if (1..=STATIC_TABLE_LEN).contains(&index) {
            Some(STATIC_TABLE[index - 1])
        } else {
            None
        }
    }

    /// Best static match for a field: `(index, value_matched)`. Prefers an
    /// exact name+value hit over a name-only hit.
    pub fn find(name: &[u8], value: &[u8]) -> Option<(usize, bool)> {
        let mut name_only = None;
        for (i, &(n, v)) in STATIC_TABLE.iter().enumerate() {
            if n == name {
                if v == value {
                    return Some((i + 1, true));
                }
                if name_only.is_none() {
                    name_only = Some((i + 1, false));
                }
            }
        }
        name_only
    }
}

/// One dynamic-table entry.
#[derive(Debug, Clone)]
struct Entry {
    name: Vec<u8>,
    value: Vec<u8>,
}

impl Entry {
    fn size(&self) -> usize {
        self.name.len() + self.value.len() + ENTRY_OVERHEAD
    }
}

/// The dynamic table plus the combined index space over both tables.
///
/// Insertion is at the front; eviction pops from the back until the new
/// entry fits. An entry larger than the whole table empties it, which is
/// valid and not an error (RFC 7541 Section 4.4).
#[derive(Debug)]
pub struct HeaderTable {
    entries: VecDeque<Entry>,
    /// Sum of entry sizes currently held
    size: usize,
    /// Current maximum, set by size updates
    max_size: usize,
    /// Ceiling on `max_size`, from SETTINGS_HEADER_TABLE_SIZE
    protocol_max: usize,
}

impl HeaderTable {
    pub fn new(max_size: usize) -> Self {
        HeaderTable {
            entries: VecDeque::new(),
            size: 0,
            max_size,
            protocol_max: max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Look up a combined-space index. 1..=61 hits the static table; 62
    /// onward counts into the dynamic table, newest first. Index 0 and
    /// indices past the end are COMPRESSION_ERROR.
    pub fn get(&self, index: usize) -> Result<(&[u8], &[u8])> {
        if let Some((name, value)) = StaticTable::get(index) {
            return Ok((name, value));
        }
        self.entries
            .get(index.wrapping_sub(STATIC_TABLE_LEN + 1))
            .map(|e| (e.name.as_slice(), e.value.as_slice()))
            .ok_or_else(|| Error::compression(format!("header index {index} out of range")))
    }

    /// Insert at the front, evicting from the back to make room.
    pub fn insert(&mut self, name: Vec<u8>, value: Vec<u8>) {
        let entry = Entry { name, value };
        let entry_size = entry.size();

        while self.size + entry_size > self.max_size {
            match self.entries.pop_back() {
                Some(evicted) => self.size -= evicted.size(),
                None => return, // entry larger than the table: table stays empty
            }
        }
        self.size += entry_size;
        self.entries.push_front(entry);
    }

    /// Apply a dynamic table size update. A request above the negotiated
    /// SETTINGS ceiling is COMPRESSION_ERROR; shrinking evicts immediately.
    pub fn update_size(&mut self, new_max: usize) -> Result<()> {
        if new_max > self.protocol_max {
            return Err(Error::compression(format!(
                "table size update {new_max} exceeds negotiated maximum {}",
                self.protocol_max
            )));
        }
        self.max_size = new_max;
        while self.size > self.max_size {
            if let Some(evicted) = self.entries.pop_back() {
                self.size -= evicted.size();
            }
        }
        Ok(())
    }

    /// Raise or lower the SETTINGS ceiling. Lowering also clamps the current
    /// maximum so the table shrinks without waiting for a size update.
    pub fn set_protocol_max(&mut self, protocol_max: usize) {
        self.protocol_max = protocol_max;
        if self.max_size > protocol_max {
            // update_size cannot fail here, new_max == protocol_max
            let _ = self.update_size(protocol_max);
        }
    }

    /// Best match across both tables: `(index, value_matched)`.
    pub fn find(&self, name: &[u8], value: &[u8]) -> Option<(usize, bool)> {
        match StaticTable::find(name, value) {
            hit @ Some((_, true)) => hit,
            name_hit => {
                let mut best = name_hit;
                for (i, entry) in self.entries.iter().enumerate() {
                    if entry.name == name {
                        if entry.value == value {
                            return Some((STATIC_TABLE_LEN + 1 + i, true));
                        }
                        if best.is_none() {
                            best = Some((STATIC_TABLE_LEN + 1 + i, false));
                        }
                    }
                }
                best
            }
        }
    }
}
