//! HPACK header compression (RFC 7541)
//!
//! The codec is split along the RFC's own seams:
//!
//! - [`integer`]: prefix-integer primitive (Section 5.1)
//! - [`huffman`]: string compression (Section 5.2, Appendix B)
//! - [`table`]: static and dynamic indexing tables (Sections 2.3, 4)
//! - [`decoder`]: header-block decode (Section 6)
//! - [`encoder`]: header-block encode, the decoder's structural mirror
//!
//! Decoder and encoder each own a dynamic table and must be driven strictly
//! in wire order: the table mutates as a side effect of individual
//! representations, so one connection gets exactly one of each, and header
//! blocks are never decoded concurrently.

pub mod decoder;
pub mod encoder;
pub mod huffman;
pub mod integer;
pub mod table;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use table::{HeaderTable, StaticTable, ENTRY_OVERHEAD, STATIC_TABLE_LEN};

/// How a header field relates to the dynamic table (RFC 7541 Section 6.2).
///
/// `IncrementalIndex` and `NeverIndex` are mutually exclusive by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indexing {
    /// Literal inserted into the dynamic table on encode and decode
    #[default]
    IncrementalIndex,
    /// Sensitive literal; never inserted, and the marker survives re-encoding
    NeverIndex,
    /// Plain literal; not inserted, no marker
    WithoutIndex,
}

/// One decoded header field: opaque octets for name and value plus its
/// indexing directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub indexing: Indexing,
}

impl HeaderField {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        HeaderField {
            name: name.into(),
            value: value.into(),
            indexing: Indexing::IncrementalIndex,
        }
    }

    /// Mark the field sensitive: emitted never-indexed, kept out of tables.
    pub fn sensitive(mut self) -> Self {
        self.indexing = Indexing::NeverIndex;
        self
    }

    /// RFC 7541 Section 4.1 size: name + value + 32 octets of overhead.
    pub fn table_size(&self) -> usize {
        self.name.len() + self.value.len() + ENTRY_OVERHEAD
    }
}
