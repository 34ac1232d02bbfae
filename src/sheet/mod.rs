//! Tabular "sheet" records: a compact schema describes the column layout of
//! a fixed-width row buffer, and a single data-driven decoder turns one row
//! plus its auxiliary string region into a typed record.

pub mod column;
pub mod record;

pub use column::ColumnReader;
pub use record::{LazyRef, Record, ResolveRef, Value, decode_record};

use indexmap::IndexMap;

/// Fixed-width scalar column payloads. Sheet row data is big-endian.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScalarKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    Bool,
}

impl ScalarKind {
    pub fn width(self) -> u16 {
        match self {
            ScalarKind::U8 | ScalarKind::I8 | ScalarKind::Bool => 1,
            ScalarKind::U16 | ScalarKind::I16 => 2,
            ScalarKind::U32 | ScalarKind::I32 | ScalarKind::F32 => 4,
            ScalarKind::U64 | ScalarKind::I64 => 8,
        }
    }

    fn hash_tag(self) -> u8 {
        match self {
            ScalarKind::U8 => 0x01,
            ScalarKind::I8 => 0x02,
            ScalarKind::U16 => 0x03,
            ScalarKind::I16 => 0x04,
            ScalarKind::U32 => 0x05,
            ScalarKind::I32 => 0x06,
            ScalarKind::U64 => 0x07,
            ScalarKind::I64 => 0x08,
            ScalarKind::F32 => 0x09,
            ScalarKind::Bool => 0x0a,
        }
    }
}

/// One column's declared shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Scalar(ScalarKind),
    /// The row stores a u32 offset into the bound string sub-table; the
    /// string itself is a NUL-terminated UTF-8 run. Rich-text markup inside
    /// it is opaque to this engine.
    String,
    /// The row stores a u32 foreign row id into `target`. Resolution is the
    /// caller's job; decode only captures the id.
    Reference { target: &'static str },
    /// `arity` consecutive elements of `elem`, addressed as
    /// `base + j * elem_width`.
    Array { elem: Box<ColumnKind>, arity: u16 },
    /// A boolean packed into one bit of a shared byte at an explicit row
    /// offset. Does not participate in cumulative layout; several of these
    /// may name the same byte at different bits.
    PackedBool { byte_offset: u16, bit: u8 },
}

impl ColumnKind {
    /// Bytes this column occupies in the fixed row region.
    pub fn width(&self) -> u16 {
        match self {
            ColumnKind::Scalar(kind) => kind.width(),
            ColumnKind::String | ColumnKind::Reference { .. } => 4,
            ColumnKind::Array { elem, arity } => elem.width() * arity,
            ColumnKind::PackedBool { .. } => 0,
        }
    }
}

/// Static, ordered description of one record family's column layout.
///
/// Created once per family and immutable afterwards. `content_hash`
/// fingerprints the layout; `decode_record` refuses to touch a row whose
/// data file carries a different hash.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    name: String,
    content_hash: u32,
    columns: IndexMap<String, ColumnKind>,
    offsets: Vec<u16>,
    row_width: u16,
}

impl SchemaDescriptor {
    /// Builds a descriptor, computing cumulative column offsets and the
    /// layout hash. String and array columns make the layout position-
    /// dependent, so offsets are accumulated rather than strided.
    pub fn new(name: &str, columns: Vec<(&str, ColumnKind)>) -> SchemaDescriptor {
        let columns: IndexMap<String, ColumnKind> = columns
            .into_iter()
            .map(|(name, kind)| (name.to_string(), kind))
            .collect();

        let mut offsets = Vec::with_capacity(columns.len());
        let mut cursor: u16 = 0;
        let mut row_width: u16 = 0;

        for kind in columns.values() {
            match kind {
                ColumnKind::PackedBool { byte_offset, .. } => {
                    offsets.push(*byte_offset);
                    row_width = row_width.max(byte_offset + 1);
                }
                _ => {
                    offsets.push(cursor);
                    cursor += kind.width();
                    row_width = row_width.max(cursor);
                }
            }
        }

        let content_hash = column_layout_hash(&columns);

        SchemaDescriptor {
            name: name.to_string(),
            content_hash,
            columns,
            offsets,
            row_width,
        }
    }

    /// Same as [`SchemaDescriptor::new`] but with an externally supplied
    /// hash, for families whose fingerprint is part of the static catalog
    /// rather than recomputed.
    pub fn with_hash(name: &str, content_hash: u32, columns: Vec<(&str, ColumnKind)>) -> Self {
        let mut schema = SchemaDescriptor::new(name, columns);
        schema.content_hash = content_hash;
        schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_hash(&self) -> u32 {
        self.content_hash
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<(&str, &ColumnKind)> {
        self.columns
            .get_index(index)
            .map(|(name, kind)| (name.as_str(), kind))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    /// Byte offset of a column within the row region.
    pub fn offset(&self, index: usize) -> Option<u16> {
        self.offsets.get(index).copied()
    }

    /// Total fixed-row width, covering the highest packed-bool byte.
    pub fn row_width(&self) -> u16 {
        self.row_width
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnKind)> {
        self.columns.iter().map(|(name, kind)| (name.as_str(), kind))
    }
}

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a(hash: u32, bytes: &[u8]) -> u32 {
    bytes.iter().fold(hash, |hash, byte| {
        (hash ^ *byte as u32).wrapping_mul(FNV_PRIME)
    })
}

fn hash_kind(mut hash: u32, kind: &ColumnKind) -> u32 {
    match kind {
        ColumnKind::Scalar(scalar) => fnv1a(hash, &[scalar.hash_tag()]),
        ColumnKind::String => fnv1a(hash, &[0x10]),
        ColumnKind::Reference { target } => {
            hash = fnv1a(hash, &[0x11]);
            fnv1a(hash, target.as_bytes())
        }
        ColumnKind::Array { elem, arity } => {
            hash = fnv1a(hash, &[0x12]);
            hash = fnv1a(hash, &arity.to_be_bytes());
            hash_kind(hash, elem)
        }
        ColumnKind::PackedBool { byte_offset, bit } => {
            hash = fnv1a(hash, &[0x13]);
            hash = fnv1a(hash, &byte_offset.to_be_bytes());
            fnv1a(hash, &[*bit])
        }
    }
}

/// FNV-1a fingerprint over a column layout. The same function produces the
/// hash embedded in data files, so any drift in column order, kind, or
/// placement changes the value.
pub fn column_layout_hash(columns: &IndexMap<String, ColumnKind>) -> u32 {
    columns.iter().fold(FNV_OFFSET, |mut hash, (name, kind)| {
        hash = fnv1a(hash, name.as_bytes());
        hash_kind(hash, kind)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_columns() -> Vec<(&'static str, ColumnKind)> {
        vec![
            ("id", ColumnKind::Scalar(ScalarKind::U32)),
            ("name", ColumnKind::String),
            ("stack", ColumnKind::Scalar(ScalarKind::U16)),
            (
                "params",
                ColumnKind::Array {
                    elem: Box::new(ColumnKind::Scalar(ScalarKind::I16)),
                    arity: 3,
                },
            ),
            (
                "is_unique",
                ColumnKind::PackedBool {
                    byte_offset: 16,
                    bit: 0,
                },
            ),
            (
                "is_untradable",
                ColumnKind::PackedBool {
                    byte_offset: 16,
                    bit: 1,
                },
            ),
        ]
    }

    #[test]
    fn cumulative_offsets() {
        let schema = SchemaDescriptor::new("Item", item_columns());

        assert_eq!(schema.offset(0), Some(0)); // u32
        assert_eq!(schema.offset(1), Some(4)); // string offset
        assert_eq!(schema.offset(2), Some(8)); // u16
        assert_eq!(schema.offset(3), Some(10)); // 3 x i16
        assert_eq!(schema.offset(4), Some(16)); // packed bool byte
        assert_eq!(schema.offset(5), Some(16)); // shares the byte
        assert_eq!(schema.row_width(), 17);
    }

    #[test]
    fn packed_bool_extends_row_width() {
        let schema = SchemaDescriptor::new(
            "Flags",
            vec![
                ("a", ColumnKind::Scalar(ScalarKind::U8)),
                (
                    "far_flag",
                    ColumnKind::PackedBool {
                        byte_offset: 31,
                        bit: 7,
                    },
                ),
            ],
        );

        assert_eq!(schema.row_width(), 32);
    }

    #[test]
    fn layout_hash_is_order_sensitive() {
        let a = SchemaDescriptor::new(
            "A",
            vec![
                ("x", ColumnKind::Scalar(ScalarKind::U8)),
                ("y", ColumnKind::Scalar(ScalarKind::U16)),
            ],
        );
        let b = SchemaDescriptor::new(
            "A",
            vec![
                ("y", ColumnKind::Scalar(ScalarKind::U16)),
                ("x", ColumnKind::Scalar(ScalarKind::U8)),
            ],
        );

        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn layout_hash_is_stable() {
        let a = SchemaDescriptor::new("Item", item_columns());
        let b = SchemaDescriptor::new("Item", item_columns());

        assert_eq!(a.content_hash(), b.content_hash());
    }
}
