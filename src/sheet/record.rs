use std::{any::Any, fmt, sync::Arc};

use crate::{DecodeError, LanguageSelector, RowSpan};

use super::{ColumnKind, ColumnReader, ScalarKind, SchemaDescriptor};

/// Capability for fetching a foreign record by id. Supplied by the caller;
/// the decode engine stores it on [`LazyRef`] values but never invokes it
/// itself.
pub trait ResolveRef: Send + Sync {
    fn resolve(
        &self,
        target: &str,
        row_id: u32,
        language: LanguageSelector,
    ) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// A captured cross-table reference: the foreign row id plus the deferred
/// fetch capability. The target record is only fetched when a caller
/// dereferences through [`LazyRef::fetch`].
#[derive(Clone)]
pub struct LazyRef {
    target: &'static str,
    row_id: u32,
    language: LanguageSelector,
    resolver: Option<Arc<dyn ResolveRef>>,
}

impl LazyRef {
    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn row_id(&self) -> u32 {
        self.row_id
    }

    pub fn language(&self) -> LanguageSelector {
        self.language
    }

    /// Dereferences the reference through the caller-supplied resolver.
    /// Returns `None` when no resolver was attached or the target row does
    /// not exist.
    pub fn fetch(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.resolver
            .as_ref()?
            .resolve(self.target, self.row_id, self.language)
    }
}

impl fmt::Debug for LazyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRef")
            .field("target", &self.target)
            .field("row_id", &self.row_id)
            .finish()
    }
}

impl PartialEq for LazyRef {
    fn eq(&self, other: &LazyRef) -> bool {
        self.target == other.target && self.row_id == other.row_id
    }
}

/// One decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    Bool(bool),
    Str(String),
    Ref(LazyRef),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<u32> {
        match self {
            Value::Ref(lazy) => Some(lazy.row_id()),
            _ => None,
        }
    }
}

/// A fully decoded record: one owned value per schema column, in declared
/// order. No further mutation after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    sheet: String,
    values: Vec<Value>,
}

impl Record {
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Decodes one row into a typed [`Record`].
///
/// The schema's layout hash is validated against the hash the data file
/// carries before any column is read; on disagreement the row is likely
/// misaligned and the decode fails with [`DecodeError::SchemaMismatch`]
/// rather than produce garbage. The span is borrowed only for this call.
pub fn decode_record(
    schema: &SchemaDescriptor,
    span: &RowSpan<'_>,
    language: LanguageSelector,
    resolver: Option<Arc<dyn ResolveRef>>,
) -> Result<Record, DecodeError> {
    if schema.content_hash() != span.layout_hash() {
        return Err(DecodeError::SchemaMismatch {
            expected: schema.content_hash(),
            found: span.layout_hash(),
        });
    }

    let reader = ColumnReader::new(schema, span, language);
    let mut values = Vec::with_capacity(schema.column_count());

    for (index, (_, kind)) in schema.columns().enumerate() {
        values.push(decode_column(&reader, schema, index, kind, &resolver)?);
    }

    Ok(Record {
        sheet: schema.name().to_string(),
        values,
    })
}

fn decode_column(
    reader: &ColumnReader<'_>,
    schema: &SchemaDescriptor,
    index: usize,
    kind: &ColumnKind,
    resolver: &Option<Arc<dyn ResolveRef>>,
) -> Result<Value, DecodeError> {
    match kind {
        ColumnKind::Scalar(scalar) => decode_scalar(reader, index, *scalar),
        ColumnKind::String => Ok(Value::Str(reader.read_string(index)?)),
        ColumnKind::Reference { target } => {
            let row_id = reader.read_reference_id(index)?;
            Ok(Value::Ref(LazyRef {
                target: *target,
                row_id,
                language: reader.language(),
                resolver: resolver.clone(),
            }))
        }
        ColumnKind::Array { elem, arity } => {
            let base = schema.offset(index).unwrap_or(0) as usize;
            let width = elem.width() as usize;

            let mut elems = Vec::with_capacity(*arity as usize);
            for j in 0..*arity as usize {
                elems.push(decode_element(reader, elem, base + j * width, resolver)?);
            }
            Ok(Value::Array(elems))
        }
        ColumnKind::PackedBool { .. } => Ok(Value::Bool(reader.read_packed_bool(index)?)),
    }
}

fn decode_element(
    reader: &ColumnReader<'_>,
    kind: &ColumnKind,
    offset: usize,
    resolver: &Option<Arc<dyn ResolveRef>>,
) -> Result<Value, DecodeError> {
    match kind {
        ColumnKind::Scalar(scalar) => decode_scalar_at(reader, *scalar, offset),
        ColumnKind::String => Ok(Value::Str(reader.str_at(offset)?)),
        ColumnKind::Reference { target } => Ok(Value::Ref(LazyRef {
            target: *target,
            row_id: reader.u32_at(offset)?,
            language: reader.language(),
            resolver: resolver.clone(),
        })),
        ColumnKind::Array { elem, arity } => {
            let width = elem.width() as usize;

            let mut elems = Vec::with_capacity(*arity as usize);
            for j in 0..*arity as usize {
                elems.push(decode_element(reader, elem, offset + j * width, resolver)?);
            }
            Ok(Value::Array(elems))
        }
        ColumnKind::PackedBool { .. } => {
            panic!("packed bools carry their own placement and cannot be array elements")
        }
    }
}

fn decode_scalar(
    reader: &ColumnReader<'_>,
    index: usize,
    scalar: ScalarKind,
) -> Result<Value, DecodeError> {
    Ok(match scalar {
        ScalarKind::U8 => Value::U8(reader.read_u8(index)?),
        ScalarKind::I8 => Value::I8(reader.read_i8(index)?),
        ScalarKind::U16 => Value::U16(reader.read_u16(index)?),
        ScalarKind::I16 => Value::I16(reader.read_i16(index)?),
        ScalarKind::U32 => Value::U32(reader.read_u32(index)?),
        ScalarKind::I32 => Value::I32(reader.read_i32(index)?),
        ScalarKind::U64 => Value::U64(reader.read_u64(index)?),
        ScalarKind::I64 => Value::I64(reader.read_i64(index)?),
        ScalarKind::F32 => Value::F32(reader.read_f32(index)?),
        ScalarKind::Bool => Value::Bool(reader.read_bool(index)?),
    })
}

fn decode_scalar_at(
    reader: &ColumnReader<'_>,
    scalar: ScalarKind,
    offset: usize,
) -> Result<Value, DecodeError> {
    Ok(match scalar {
        ScalarKind::U8 => Value::U8(reader.u8_at(offset)?),
        ScalarKind::I8 => Value::I8(reader.u8_at(offset)? as i8),
        ScalarKind::U16 => Value::U16(reader.u16_at(offset)?),
        ScalarKind::I16 => Value::I16(reader.u16_at(offset)? as i16),
        ScalarKind::U32 => Value::U32(reader.u32_at(offset)?),
        ScalarKind::I32 => Value::I32(reader.u32_at(offset)? as i32),
        ScalarKind::U64 => Value::U64(reader.u64_at(offset)?),
        ScalarKind::I64 => Value::I64(reader.u64_at(offset)? as i64),
        ScalarKind::F32 => Value::F32(reader.f32_at(offset)?),
        ScalarKind::Bool => Value::Bool(reader.u8_at(offset)? != 0),
    })
}

#[cfg(test)]
mod tests {
    use byteorder::{BigEndian, WriteBytesExt};

    use super::*;

    fn item_schema() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "Item",
            vec![
                ("name", ColumnKind::String),
                ("price", ColumnKind::Scalar(ScalarKind::U32)),
                ("icon", ColumnKind::Reference { target: "Icon" }),
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
                        byte_offset: 18,
                        bit: 0,
                    },
                ),
                (
                    "is_untradable",
                    ColumnKind::PackedBool {
                        byte_offset: 18,
                        bit: 3,
                    },
                ),
            ],
        )
    }

    /// Encodes the reference row the way the data files lay it out.
    fn reference_row() -> Vec<u8> {
        let mut row = Vec::new();

        row.write_u32::<BigEndian>(0).unwrap(); // string offset
        row.write_u32::<BigEndian>(6250).unwrap(); // price
        row.write_u32::<BigEndian>(21433).unwrap(); // icon row id
        row.write_i16::<BigEndian>(12).unwrap(); // params[0]
        row.write_i16::<BigEndian>(-4).unwrap(); // params[1]
        row.write_i16::<BigEndian>(0).unwrap(); // params[2]
        row.write_u8(0b0000_1001).unwrap(); // both packed flags set

        row
    }

    fn expected_values() -> Vec<Value> {
        vec![
            Value::Str("Bronze Sword".to_string()),
            Value::U32(6250),
            Value::Ref(LazyRef {
                target: "Icon",
                row_id: 21433,
                language: LanguageSelector(0),
                resolver: None,
            }),
            Value::Array(vec![Value::I16(12), Value::I16(-4), Value::I16(0)]),
            Value::Bool(true),
            Value::Bool(true),
        ]
    }

    #[test]
    fn reference_row_round_trips() {
        let schema = item_schema();
        let row = reference_row();
        let strings: &[u8] = b"Bronze Sword\0";
        let span = RowSpan::new(&row, vec![strings], schema.content_hash());

        let record = decode_record(&schema, &span, LanguageSelector(0), None).unwrap();

        assert_eq!(record.sheet(), "Item");
        assert_eq!(record.values(), expected_values().as_slice());

        // Deterministic: a second decode of the same bytes is identical.
        let again = decode_record(&schema, &span, LanguageSelector(0), None).unwrap();
        assert_eq!(record, again);
    }

    #[test]
    fn hash_mismatch_fails_before_any_column_read() {
        let schema = item_schema();

        // An empty row would make any column read fail with OutOfRange, so
        // getting SchemaMismatch back proves nothing was read.
        let span = RowSpan::new(&[], vec![], schema.content_hash() ^ 0xdead_beef);

        let err = decode_record(&schema, &span, LanguageSelector(0), None).unwrap_err();
        assert_eq!(
            err,
            DecodeError::SchemaMismatch {
                expected: schema.content_hash(),
                found: schema.content_hash() ^ 0xdead_beef,
            }
        );
    }

    struct FixedResolver;

    impl ResolveRef for FixedResolver {
        fn resolve(
            &self,
            target: &str,
            row_id: u32,
            _language: LanguageSelector,
        ) -> Option<Arc<dyn Any + Send + Sync>> {
            (target == "Icon" && row_id == 21433)
                .then(|| Arc::new("icon_21433".to_string()) as Arc<dyn Any + Send + Sync>)
        }
    }

    #[test]
    fn reference_is_captured_lazily_and_fetchable() {
        let schema = item_schema();
        let row = reference_row();
        let strings: &[u8] = b"Bronze Sword\0";
        let span = RowSpan::new(&row, vec![strings], schema.content_hash());

        let resolver: Arc<dyn ResolveRef> = Arc::new(FixedResolver);
        let record =
            decode_record(&schema, &span, LanguageSelector(0), Some(resolver)).unwrap();

        let Some(Value::Ref(lazy)) = record.get(2) else {
            panic!("expected a reference value");
        };

        assert_eq!(lazy.target(), "Icon");
        assert_eq!(lazy.row_id(), 21433);

        let handle = lazy.fetch().expect("resolver knows this row");
        let name = handle.downcast_ref::<String>().expect("resolver payload");
        assert_eq!(name, "icon_21433");
    }

    #[test]
    fn truncated_row_is_out_of_range() {
        let schema = item_schema();
        let row = &reference_row()[..8]; // cuts the row before the reference
        let span = RowSpan::new(row, vec![b"Bronze Sword\0" as &[u8]], schema.content_hash());

        assert!(matches!(
            decode_record(&schema, &span, LanguageSelector(0), None),
            Err(DecodeError::OutOfRange(_))
        ));
    }
}
