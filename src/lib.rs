pub mod model;
pub mod sheet;
pub mod texture;

use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// Selects which string sub-table a reader binds to. The engine treats this
/// purely as an index; which language a given index corresponds to is the
/// caller's business.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct LanguageSelector(pub u16);

impl LanguageSelector {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Every way a decode call can fail. All of these are terminal for the call
/// that raised them; downstream offsets depend on full consumption of prior
/// sections, so there is no partial-result recovery.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The compiled schema's column-layout hash disagrees with the hash
    /// embedded in the data file. Decoding anyway would misread every row.
    SchemaMismatch { expected: u32, found: u32 },
    /// An index or offset landed beyond the declared bounds.
    OutOfRange(String),
    /// A format code or compression scheme with no defined conversion.
    UnsupportedFormat(u32),
    /// Fewer bytes were available than a section declared it needs.
    TruncatedData,
    /// A structurally contradictory header.
    InvalidHeader(String),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::SchemaMismatch { expected, found } => write!(
                f,
                "schema layout hash mismatch (compiled {:#010x}, data {:#010x})",
                expected, found
            ),
            DecodeError::OutOfRange(what) => write!(f, "out of range: {}", what),
            DecodeError::UnsupportedFormat(code) => {
                write!(f, "unsupported format code {:#06x}", code)
            }
            DecodeError::TruncatedData => write!(f, "input truncated mid-section"),
            DecodeError::InvalidHeader(what) => write!(f, "invalid header: {}", what),
        }
    }
}

impl Error for DecodeError {}

impl From<io::Error> for DecodeError {
    fn from(_: io::Error) -> Self {
        // Reads here go through an in-memory cursor, so the only io failure
        // mode is running off the end of the buffer.
        DecodeError::TruncatedData
    }
}

/// A borrowed view over one record: its fixed-width row bytes, the
/// per-language string sub-tables that back its string columns, and the
/// column-layout hash the source data file carries for version-skew
/// detection.
///
/// The archive layer that located and decompressed the file owns the
/// underlying buffer; a decoder borrows this span for one call and must not
/// retain it.
#[derive(Debug, Clone)]
pub struct RowSpan<'a> {
    row: &'a [u8],
    string_tables: Vec<&'a [u8]>,
    layout_hash: u32,
}

impl<'a> RowSpan<'a> {
    pub fn new(row: &'a [u8], string_tables: Vec<&'a [u8]>, layout_hash: u32) -> RowSpan<'a> {
        RowSpan {
            row,
            string_tables,
            layout_hash,
        }
    }

    pub fn row(&self) -> &'a [u8] {
        self.row
    }

    pub fn layout_hash(&self) -> u32 {
        self.layout_hash
    }

    /// The string sub-table a given language binds to.
    pub fn string_table(&self, language: LanguageSelector) -> Result<&'a [u8], DecodeError> {
        self.string_tables
            .get(language.index())
            .copied()
            .ok_or_else(|| {
                DecodeError::OutOfRange(format!(
                    "string sub-table {} (have {})",
                    language.index(),
                    self.string_tables.len()
                ))
            })
    }
}
