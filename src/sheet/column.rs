use byteorder::{BigEndian, ByteOrder};

use crate::{DecodeError, LanguageSelector, RowSpan};

use super::{ColumnKind, ScalarKind, SchemaDescriptor};

/// Positions reads over one row's byte span using the bound schema's
/// column-offset table.
///
/// Asking for a column with a type that disagrees with the schema's declared
/// kind is a programming error and panics; asking for bytes beyond the row
/// span is a data error and returns [`DecodeError::OutOfRange`].
pub struct ColumnReader<'a> {
    schema: &'a SchemaDescriptor,
    span: &'a RowSpan<'a>,
    language: LanguageSelector,
}

impl<'a> ColumnReader<'a> {
    pub fn new(
        schema: &'a SchemaDescriptor,
        span: &'a RowSpan<'a>,
        language: LanguageSelector,
    ) -> ColumnReader<'a> {
        ColumnReader {
            schema,
            span,
            language,
        }
    }

    pub fn language(&self) -> LanguageSelector {
        self.language
    }

    fn kind(&self, index: usize) -> &'a ColumnKind {
        match self.schema.column(index) {
            Some((_, kind)) => kind,
            None => panic!(
                "column {} out of range for schema {} ({} columns)",
                index,
                self.schema.name(),
                self.schema.column_count()
            ),
        }
    }

    fn column_offset(&self, index: usize) -> usize {
        // `kind` has already established the index is in range.
        self.schema.offset(index).unwrap_or(0) as usize
    }

    fn scalar_offset(&self, index: usize, expected: ScalarKind) -> usize {
        match self.kind(index) {
            ColumnKind::Scalar(kind) if *kind == expected => self.column_offset(index),
            other => panic!(
                "column {} of {} is {:?}, read as {:?}",
                index,
                self.schema.name(),
                other,
                expected
            ),
        }
    }

    fn field(&self, offset: usize, width: usize) -> Result<&'a [u8], DecodeError> {
        let row = self.span.row();
        if offset + width > row.len() {
            return Err(DecodeError::OutOfRange(format!(
                "row offset {}..{} (row is {} bytes)",
                offset,
                offset + width,
                row.len()
            )));
        }
        Ok(&row[offset..offset + width])
    }

    pub fn read_u8(&self, index: usize) -> Result<u8, DecodeError> {
        let offset = self.scalar_offset(index, ScalarKind::U8);
        self.u8_at(offset)
    }

    pub fn read_i8(&self, index: usize) -> Result<i8, DecodeError> {
        let offset = self.scalar_offset(index, ScalarKind::I8);
        Ok(self.u8_at(offset)? as i8)
    }

    pub fn read_u16(&self, index: usize) -> Result<u16, DecodeError> {
        let offset = self.scalar_offset(index, ScalarKind::U16);
        self.u16_at(offset)
    }

    pub fn read_i16(&self, index: usize) -> Result<i16, DecodeError> {
        let offset = self.scalar_offset(index, ScalarKind::I16);
        Ok(self.u16_at(offset)? as i16)
    }

    pub fn read_u32(&self, index: usize) -> Result<u32, DecodeError> {
        let offset = self.scalar_offset(index, ScalarKind::U32);
        self.u32_at(offset)
    }

    pub fn read_i32(&self, index: usize) -> Result<i32, DecodeError> {
        let offset = self.scalar_offset(index, ScalarKind::I32);
        Ok(self.u32_at(offset)? as i32)
    }

    pub fn read_u64(&self, index: usize) -> Result<u64, DecodeError> {
        let offset = self.scalar_offset(index, ScalarKind::U64);
        self.u64_at(offset)
    }

    pub fn read_i64(&self, index: usize) -> Result<i64, DecodeError> {
        let offset = self.scalar_offset(index, ScalarKind::I64);
        Ok(self.u64_at(offset)? as i64)
    }

    pub fn read_f32(&self, index: usize) -> Result<f32, DecodeError> {
        let offset = self.scalar_offset(index, ScalarKind::F32);
        self.f32_at(offset)
    }

    pub fn read_bool(&self, index: usize) -> Result<bool, DecodeError> {
        let offset = self.scalar_offset(index, ScalarKind::Bool);
        Ok(self.u8_at(offset)? != 0)
    }

    /// Reads one bit of a shared byte. Other packed-bool columns on the same
    /// byte are unaffected.
    pub fn read_packed_bool(&self, index: usize) -> Result<bool, DecodeError> {
        match self.kind(index) {
            ColumnKind::PackedBool { byte_offset, bit } => {
                let byte = self.u8_at(*byte_offset as usize)?;
                Ok((byte >> bit) & 0x01 != 0)
            }
            other => panic!(
                "column {} of {} is {:?}, read as packed bool",
                index,
                self.schema.name(),
                other
            ),
        }
    }

    /// Resolves the column's u32 offset into the bound language's string
    /// sub-table and decodes the NUL-terminated run found there.
    pub fn read_string(&self, index: usize) -> Result<String, DecodeError> {
        match self.kind(index) {
            ColumnKind::String => self.str_at(self.column_offset(index)),
            other => panic!(
                "column {} of {} is {:?}, read as string",
                index,
                self.schema.name(),
                other
            ),
        }
    }

    /// Captures a reference column's foreign row id. Dereferencing it is the
    /// caller's job, not this reader's.
    pub fn read_reference_id(&self, index: usize) -> Result<u32, DecodeError> {
        match self.kind(index) {
            ColumnKind::Reference { .. } => self.u32_at(self.column_offset(index)),
            other => panic!(
                "column {} of {} is {:?}, read as reference",
                index,
                self.schema.name(),
                other
            ),
        }
    }

    // Raw offset-addressed reads. The record decoder uses these for array
    // elements, whose offsets are `base + j * elem_width`.

    pub(crate) fn u8_at(&self, offset: usize) -> Result<u8, DecodeError> {
        Ok(self.field(offset, 1)?[0])
    }

    pub(crate) fn u16_at(&self, offset: usize) -> Result<u16, DecodeError> {
        Ok(BigEndian::read_u16(self.field(offset, 2)?))
    }

    pub(crate) fn u32_at(&self, offset: usize) -> Result<u32, DecodeError> {
        Ok(BigEndian::read_u32(self.field(offset, 4)?))
    }

    pub(crate) fn u64_at(&self, offset: usize) -> Result<u64, DecodeError> {
        Ok(BigEndian::read_u64(self.field(offset, 8)?))
    }

    pub(crate) fn f32_at(&self, offset: usize) -> Result<f32, DecodeError> {
        Ok(BigEndian::read_f32(self.field(offset, 4)?))
    }

    pub(crate) fn str_at(&self, row_offset: usize) -> Result<String, DecodeError> {
        let relative = self.u32_at(row_offset)? as usize;
        let table = self.span.string_table(self.language)?;

        if relative >= table.len() {
            return Err(DecodeError::OutOfRange(format!(
                "string offset {} (sub-table is {} bytes)",
                relative,
                table.len()
            )));
        }

        let tail = &table[relative..];
        let end = tail
            .iter()
            .position(|byte| *byte == 0)
            .ok_or(DecodeError::TruncatedData)?;

        // Rich-text payload bytes inside the run are not this engine's
        // concern; keep whatever is representable.
        Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed_schema() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "PackedFlags",
            vec![
                (
                    "a",
                    ColumnKind::PackedBool {
                        byte_offset: 0,
                        bit: 0,
                    },
                ),
                (
                    "b",
                    ColumnKind::PackedBool {
                        byte_offset: 0,
                        bit: 1,
                    },
                ),
                (
                    "c",
                    ColumnKind::PackedBool {
                        byte_offset: 0,
                        bit: 2,
                    },
                ),
            ],
        )
    }

    #[test]
    fn packed_bools_decode_independently() {
        let schema = packed_schema();

        // Every combination of the three shared bits.
        for bits in 0u8..8 {
            let row = [bits];
            let span = RowSpan::new(&row, vec![], schema.content_hash());
            let reader = ColumnReader::new(&schema, &span, LanguageSelector::default());

            assert_eq!(reader.read_packed_bool(0).unwrap(), bits & 0x01 != 0);
            assert_eq!(reader.read_packed_bool(1).unwrap(), bits & 0x02 != 0);
            assert_eq!(reader.read_packed_bool(2).unwrap(), bits & 0x04 != 0);
        }
    }

    #[test]
    fn scalars_are_big_endian() {
        let schema = SchemaDescriptor::new(
            "Scalars",
            vec![
                ("a", ColumnKind::Scalar(ScalarKind::U16)),
                ("b", ColumnKind::Scalar(ScalarKind::I32)),
            ],
        );

        let row = [0x12, 0x34, 0xff, 0xff, 0xff, 0xfe];
        let span = RowSpan::new(&row, vec![], schema.content_hash());
        let reader = ColumnReader::new(&schema, &span, LanguageSelector::default());

        assert_eq!(reader.read_u16(0).unwrap(), 0x1234);
        assert_eq!(reader.read_i32(1).unwrap(), -2);
    }

    #[test]
    fn string_resolves_through_language_sub_table() {
        let schema = SchemaDescriptor::new("Named", vec![("name", ColumnKind::String)]);

        let row = [0x00, 0x00, 0x00, 0x02]; // offset 2 into the sub-table
        let english: &[u8] = b"xx\0skipped";
        let german: &[u8] = b"yyAxt\0";

        let span = RowSpan::new(&row, vec![english, german], schema.content_hash());

        let reader = ColumnReader::new(&schema, &span, LanguageSelector(0));
        assert_eq!(reader.read_string(0).unwrap(), "");

        let reader = ColumnReader::new(&schema, &span, LanguageSelector(1));
        assert_eq!(reader.read_string(0).unwrap(), "Axt");
    }

    #[test]
    fn missing_language_sub_table_is_out_of_range() {
        let schema = SchemaDescriptor::new("Named", vec![("name", ColumnKind::String)]);

        let row = [0x00, 0x00, 0x00, 0x00];
        let span = RowSpan::new(&row, vec![b"a\0" as &[u8]], schema.content_hash());
        let reader = ColumnReader::new(&schema, &span, LanguageSelector(5));

        assert!(matches!(
            reader.read_string(0),
            Err(DecodeError::OutOfRange(_))
        ));
    }

    #[test]
    fn read_past_row_end_is_out_of_range() {
        let schema = SchemaDescriptor::new("Short", vec![("a", ColumnKind::Scalar(ScalarKind::U32))]);

        let row = [0x00, 0x01]; // two bytes where four are declared
        let span = RowSpan::new(&row, vec![], schema.content_hash());
        let reader = ColumnReader::new(&schema, &span, LanguageSelector::default());

        assert!(matches!(reader.read_u32(0), Err(DecodeError::OutOfRange(_))));
    }

    #[test]
    #[should_panic(expected = "read as")]
    fn kind_mismatch_is_a_programming_error() {
        let schema = SchemaDescriptor::new("Named", vec![("name", ColumnKind::String)]);

        let row = [0x00; 4];
        let span = RowSpan::new(&row, vec![], schema.content_hash());
        let reader = ColumnReader::new(&schema, &span, LanguageSelector::default());

        let _ = reader.read_u32(0);
    }

    #[test]
    fn unterminated_string_is_truncated() {
        let schema = SchemaDescriptor::new("Named", vec![("name", ColumnKind::String)]);

        let row = [0x00, 0x00, 0x00, 0x00];
        let span = RowSpan::new(&row, vec![b"no terminator" as &[u8]], schema.content_hash());
        let reader = ColumnReader::new(&schema, &span, LanguageSelector(0));

        assert_eq!(reader.read_string(0), Err(DecodeError::TruncatedData));
    }
}
