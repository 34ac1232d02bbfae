//! Model assets: a header-driven sequence of variable-length sections.
//!
//! Almost no section is self-describing; every element count comes from a
//! header field read earlier. The decoder is therefore a strict sequential
//! state machine over one cursor, expressed as an explicit step list so the
//! ordering invariant sits in one place and the cursor position can be
//! asserted after every step. Reading the wrong count desynchronizes every
//! subsequent offset irrecoverably, so any short read aborts the whole
//! decode.

use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::DecodeError;

pub const FILE_HEADER_SIZE: usize = 0x44;
pub const VERTEX_DECLARATION_SIZE: usize = 17 * 8;
pub const MODEL_HEADER_SIZE: usize = 56;

/// Flag bit in [`ModelHeader::flags2`]: the three extra-LOD entries are
/// present.
pub const FLAG2_EXTRA_LOD: u8 = 0x10;

const VERTEX_ELEMENT_END: u8 = 0xff;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileHeader {
    pub version: u32,
    pub stack_size: u32,
    pub runtime_size: u32,
    pub vertex_declaration_count: u16,
    pub material_count: u16,
    pub vertex_offsets: [u32; 3],
    pub index_offsets: [u32; 3],
    pub vertex_buffer_sizes: [u32; 3],
    pub index_buffer_sizes: [u32; 3],
    pub lod_count: u8,
    pub index_buffer_streaming: bool,
    pub edge_geometry: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexElement {
    pub stream: u8,
    pub offset: u8,
    pub kind: u8,
    pub usage: u8,
    pub usage_index: u8,
}

/// One declaration slot: up to 17 elements, terminated early by a sentinel
/// stream id. The slot's byte size on disk is fixed regardless of how many
/// elements are live.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexDeclaration {
    pub elements: Vec<VertexElement>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelHeader {
    pub radius: f32,
    pub mesh_count: u16,
    pub attribute_count: u16,
    pub submesh_count: u16,
    pub material_count: u16,
    pub bone_count: u16,
    pub bone_table_count: u16,
    pub shape_count: u16,
    pub shape_mesh_count: u16,
    pub shape_value_count: u16,
    pub lod_count: u8,
    pub flags1: u8,
    pub element_id_count: u16,
    pub terrain_shadow_mesh_count: u8,
    pub flags2: u8,
    pub model_clip_out_distance: f32,
    pub shadow_clip_out_distance: f32,
    pub unknown4: u16,
    pub terrain_shadow_submesh_count: u16,
    pub unknown5: u8,
    pub bg_change_material_index: u8,
    pub bg_crest_change_material_index: u8,
    pub unknown6: u8,
    pub unknown7: u16,
    pub unknown8: u16,
    pub unknown9: u16,
}

impl ModelHeader {
    pub fn has_extra_lods(&self) -> bool {
        self.flags2 & FLAG2_EXTRA_LOD != 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementId {
    pub element_id: u32,
    pub parent_bone_name: u32,
    pub translate: [f32; 3],
    pub rotate: [f32; 3],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lod {
    pub mesh_index: u16,
    pub mesh_count: u16,
    pub model_lod_range: f32,
    pub texture_lod_range: f32,
    pub water_mesh_index: u16,
    pub water_mesh_count: u16,
    pub shadow_mesh_index: u16,
    pub shadow_mesh_count: u16,
    pub terrain_shadow_mesh_index: u16,
    pub terrain_shadow_mesh_count: u16,
    pub vertical_fog_mesh_index: u16,
    pub vertical_fog_mesh_count: u16,
    pub edge_geometry_size: u32,
    pub edge_geometry_offset: u32,
    pub polygon_count: u32,
    pub unknown1: u32,
    pub vertex_buffer_size: u32,
    pub index_buffer_size: u32,
    pub vertex_data_offset: u32,
    pub index_data_offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraLod {
    pub light_shaft_mesh_index: u16,
    pub light_shaft_mesh_count: u16,
    pub glass_mesh_index: u16,
    pub glass_mesh_count: u16,
    pub material_change_mesh_index: u16,
    pub material_change_mesh_count: u16,
    pub crest_change_mesh_index: u16,
    pub crest_change_mesh_count: u16,
    pub unknown: [u16; 12],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertex_count: u16,
    pub padding: u16,
    pub index_count: u32,
    pub material_index: u16,
    pub submesh_index: u16,
    pub submesh_count: u16,
    pub bone_table_index: u16,
    pub start_index: u32,
    pub vertex_buffer_offsets: [u32; 3],
    pub vertex_buffer_strides: [u8; 3],
    pub vertex_stream_count: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainShadowMesh {
    pub index_count: u32,
    pub start_index: u32,
    pub vertex_buffer_offset: u32,
    pub vertex_count: u16,
    pub submesh_index: u16,
    pub submesh_count: u16,
    pub vertex_buffer_stride: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submesh {
    pub index_offset: u32,
    pub index_count: u32,
    pub attribute_index_mask: u32,
    pub bone_start_index: u16,
    pub bone_count: u16,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainShadowSubmesh {
    pub index_offset: u32,
    pub index_count: u32,
    pub unknown1: u16,
    pub unknown2: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoneTable {
    pub bone_indices: [u16; 64],
    pub bone_count: u8,
}

impl Default for BoneTable {
    fn default() -> BoneTable {
        BoneTable {
            bone_indices: [0; 64],
            bone_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub string_offset: u32,
    pub shape_mesh_start_index: [u16; 3],
    pub shape_mesh_count: [u16; 3],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeMesh {
    pub mesh_index_offset: u32,
    pub shape_value_count: u32,
    pub shape_value_offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeValue {
    pub base_indices_index: u16,
    pub replacing_vertex_index: u16,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 4],
    pub max: [f32; 4],
}

/// The fully decoded model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    pub file_header: FileHeader,
    pub vertex_declarations: Vec<VertexDeclaration>,
    pub string_count: u16,
    pub string_data: Vec<u8>,
    pub header: ModelHeader,
    pub element_ids: Vec<ElementId>,
    pub lods: [Lod; 3],
    pub extra_lods: Option<[ExtraLod; 3]>,
    pub meshes: Vec<Mesh>,
    pub attribute_name_offsets: Vec<u32>,
    pub terrain_shadow_meshes: Vec<TerrainShadowMesh>,
    pub submeshes: Vec<Submesh>,
    pub terrain_shadow_submeshes: Vec<TerrainShadowSubmesh>,
    pub material_name_offsets: Vec<u32>,
    pub bone_name_offsets: Vec<u32>,
    pub bone_tables: Vec<BoneTable>,
    pub shapes: Vec<Shape>,
    pub shape_meshes: Vec<ShapeMesh>,
    pub shape_values: Vec<ShapeValue>,
    pub submesh_bone_map: Vec<u16>,
    pub bounding_box: BoundingBox,
    pub model_bounding_box: BoundingBox,
    pub water_bounding_box: BoundingBox,
    pub vertical_fog_bounding_box: BoundingBox,
    pub bone_bounding_boxes: Vec<BoundingBox>,
}

impl ModelData {
    /// The NUL-terminated name at an offset into the string blob
    /// (attribute / material / bone name offsets point here).
    pub fn string_at(&self, offset: u32) -> Option<&str> {
        let tail = self.string_data.get(offset as usize..)?;
        let end = tail.iter().position(|byte| *byte == 0)?;
        std::str::from_utf8(&tail[..end]).ok()
    }
}

/// One step of the section state machine, in file order. The only
/// conditional step is `ExtraLods`, present iff the header flag says so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    ElementIds,
    Lods,
    ExtraLods,
    Meshes,
    AttributeNameOffsets,
    TerrainShadowMeshes,
    Submeshes,
    TerrainShadowSubmeshes,
    MaterialNameOffsets,
    BoneNameOffsets,
    BoneTables,
    Shapes,
    ShapeMeshes,
    ShapeValues,
    SubmeshBoneMap,
    Padding,
    BoundingBoxes,
    BoneBoundingBoxes,
}

pub const SECTION_ORDER: [Section; 18] = [
    Section::ElementIds,
    Section::Lods,
    Section::ExtraLods,
    Section::Meshes,
    Section::AttributeNameOffsets,
    Section::TerrainShadowMeshes,
    Section::Submeshes,
    Section::TerrainShadowSubmeshes,
    Section::MaterialNameOffsets,
    Section::BoneNameOffsets,
    Section::BoneTables,
    Section::Shapes,
    Section::ShapeMeshes,
    Section::ShapeValues,
    Section::SubmeshBoneMap,
    Section::Padding,
    Section::BoundingBoxes,
    Section::BoneBoundingBoxes,
];

/// Decodes a whole model file.
pub fn decode_model(bytes: &[u8]) -> Result<ModelData, DecodeError> {
    let mut decoder = ModelDecoder::new(bytes)?;

    for section in SECTION_ORDER {
        decoder.read_section(section)?;
    }

    Ok(decoder.finish())
}

/// The sequential decoder. [`ModelDecoder::new`] consumes the prelude (file
/// header, vertex declarations, string blob, model header); each
/// [`read_section`](ModelDecoder::read_section) call then consumes exactly
/// one step of [`SECTION_ORDER`].
#[derive(Debug)]
pub struct ModelDecoder<'a> {
    cur: Cursor<&'a [u8]>,
    model: ModelData,
}

impl<'a> ModelDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<ModelDecoder<'a>, DecodeError> {
        let mut cur = Cursor::new(bytes);

        let file_header = read_file_header(&mut cur)?;

        let mut vertex_declarations =
            Vec::with_capacity(file_header.vertex_declaration_count as usize);
        for _ in 0..file_header.vertex_declaration_count {
            vertex_declarations.push(read_vertex_declaration(&mut cur)?);
        }

        let string_count = cur.read_u16::<LittleEndian>()?;
        let _padding = cur.read_u16::<LittleEndian>()?;
        let string_size = cur.read_u32::<LittleEndian>()?;

        // The blob's byte count is known up front; consume it verbatim, no
        // delimiter scanning.
        let string_start = cur.position() as usize;
        let string_end = string_start + string_size as usize;
        if string_end > bytes.len() {
            return Err(DecodeError::TruncatedData);
        }
        let string_data = bytes[string_start..string_end].to_vec();
        cur.seek(SeekFrom::Start(string_end as u64))?;

        let header = read_model_header(&mut cur)?;

        Ok(ModelDecoder {
            cur,
            model: ModelData {
                file_header,
                vertex_declarations,
                string_count,
                string_data,
                header,
                ..ModelData::default()
            },
        })
    }

    /// Current cursor offset into the file.
    pub fn position(&self) -> u64 {
        self.cur.position()
    }

    pub fn header(&self) -> &ModelHeader {
        &self.model.header
    }

    /// Reads exactly one section. Callers must follow [`SECTION_ORDER`];
    /// there is no backtracking.
    pub fn read_section(&mut self, section: Section) -> Result<(), DecodeError> {
        let cur = &mut self.cur;
        let header = &self.model.header;

        match section {
            Section::ElementIds => {
                self.model.element_ids =
                    read_vec(cur, header.element_id_count as usize, read_element_id)?;
            }
            Section::Lods => {
                for lod in 0..3 {
                    self.model.lods[lod] = read_lod(cur)?;
                }
            }
            Section::ExtraLods => {
                if header.has_extra_lods() {
                    let mut extra = [ExtraLod::default(), ExtraLod::default(), ExtraLod::default()];
                    for lod in extra.iter_mut() {
                        *lod = read_extra_lod(cur)?;
                    }
                    self.model.extra_lods = Some(extra);
                }
            }
            Section::Meshes => {
                self.model.meshes = read_vec(cur, header.mesh_count as usize, read_mesh)?;
            }
            Section::AttributeNameOffsets => {
                self.model.attribute_name_offsets =
                    read_vec(cur, header.attribute_count as usize, read_name_offset)?;
            }
            Section::TerrainShadowMeshes => {
                self.model.terrain_shadow_meshes = read_vec(
                    cur,
                    header.terrain_shadow_mesh_count as usize,
                    read_terrain_shadow_mesh,
                )?;
            }
            Section::Submeshes => {
                self.model.submeshes = read_vec(cur, header.submesh_count as usize, read_submesh)?;
            }
            Section::TerrainShadowSubmeshes => {
                self.model.terrain_shadow_submeshes = read_vec(
                    cur,
                    header.terrain_shadow_submesh_count as usize,
                    read_terrain_shadow_submesh,
                )?;
            }
            Section::MaterialNameOffsets => {
                self.model.material_name_offsets =
                    read_vec(cur, header.material_count as usize, read_name_offset)?;
            }
            Section::BoneNameOffsets => {
                self.model.bone_name_offsets =
                    read_vec(cur, header.bone_count as usize, read_name_offset)?;
            }
            Section::BoneTables => {
                self.model.bone_tables =
                    read_vec(cur, header.bone_table_count as usize, read_bone_table)?;
            }
            Section::Shapes => {
                self.model.shapes = read_vec(cur, header.shape_count as usize, read_shape)?;
            }
            Section::ShapeMeshes => {
                self.model.shape_meshes =
                    read_vec(cur, header.shape_mesh_count as usize, read_shape_mesh)?;
            }
            Section::ShapeValues => {
                self.model.shape_values =
                    read_vec(cur, header.shape_value_count as usize, read_shape_value)?;
            }
            Section::SubmeshBoneMap => {
                // Sized by an explicit byte count divided by the element
                // width.
                let byte_count = cur.read_u32::<LittleEndian>()?;
                let entries = byte_count as usize / 2;
                self.model.submesh_bone_map = read_vec(cur, entries, |cur| {
                    Ok(cur.read_u16::<LittleEndian>()?)
                })?;
            }
            Section::Padding => {
                let amount = cur.read_u8()?;
                let skipped_to = cur.position() + amount as u64;
                if skipped_to > cur.get_ref().len() as u64 {
                    return Err(DecodeError::TruncatedData);
                }
                cur.seek(SeekFrom::Start(skipped_to))?;
            }
            Section::BoundingBoxes => {
                self.model.bounding_box = read_bounding_box(cur)?;
                self.model.model_bounding_box = read_bounding_box(cur)?;
                self.model.water_bounding_box = read_bounding_box(cur)?;
                self.model.vertical_fog_bounding_box = read_bounding_box(cur)?;
            }
            Section::BoneBoundingBoxes => {
                self.model.bone_bounding_boxes =
                    read_vec(cur, header.bone_count as usize, read_bounding_box)?;
            }
        }

        Ok(())
    }

    pub fn finish(self) -> ModelData {
        self.model
    }
}

fn read_vec<T>(
    cur: &mut Cursor<&[u8]>,
    count: usize,
    read_one: impl Fn(&mut Cursor<&[u8]>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read_one(cur)?);
    }
    Ok(items)
}

fn read_u32_array<const N: usize>(cur: &mut Cursor<&[u8]>) -> Result<[u32; N], DecodeError> {
    let mut values = [0u32; N];
    for value in values.iter_mut() {
        *value = cur.read_u32::<LittleEndian>()?;
    }
    Ok(values)
}

fn read_f32_array<const N: usize>(cur: &mut Cursor<&[u8]>) -> Result<[f32; N], DecodeError> {
    let mut values = [0f32; N];
    for value in values.iter_mut() {
        *value = cur.read_f32::<LittleEndian>()?;
    }
    Ok(values)
}

fn read_file_header(cur: &mut Cursor<&[u8]>) -> Result<FileHeader, DecodeError> {
    let header = FileHeader {
        version: cur.read_u32::<LittleEndian>()?,
        stack_size: cur.read_u32::<LittleEndian>()?,
        runtime_size: cur.read_u32::<LittleEndian>()?,
        vertex_declaration_count: cur.read_u16::<LittleEndian>()?,
        material_count: cur.read_u16::<LittleEndian>()?,
        vertex_offsets: read_u32_array(cur)?,
        index_offsets: read_u32_array(cur)?,
        vertex_buffer_sizes: read_u32_array(cur)?,
        index_buffer_sizes: read_u32_array(cur)?,
        lod_count: cur.read_u8()?,
        index_buffer_streaming: cur.read_u8()? != 0,
        edge_geometry: cur.read_u8()? != 0,
    };
    let _padding = cur.read_u8()?;

    Ok(header)
}

/// Reads one fixed-size declaration slot: elements up to the sentinel, then
/// a seek past the unused remainder so the cursor lands on the next slot.
fn read_vertex_declaration(cur: &mut Cursor<&[u8]>) -> Result<VertexDeclaration, DecodeError> {
    let slot_start = cur.position();
    let mut elements = Vec::new();

    for _ in 0..17 {
        let stream = cur.read_u8()?;
        if stream == VERTEX_ELEMENT_END {
            break;
        }

        let element = VertexElement {
            stream,
            offset: cur.read_u8()?,
            kind: cur.read_u8()?,
            usage: cur.read_u8()?,
            usage_index: cur.read_u8()?,
        };
        cur.seek(SeekFrom::Current(3))?;

        elements.push(element);
    }

    cur.seek(SeekFrom::Start(slot_start + VERTEX_DECLARATION_SIZE as u64))?;

    Ok(VertexDeclaration { elements })
}

fn read_model_header(cur: &mut Cursor<&[u8]>) -> Result<ModelHeader, DecodeError> {
    let header = ModelHeader {
        radius: cur.read_f32::<LittleEndian>()?,
        mesh_count: cur.read_u16::<LittleEndian>()?,
        attribute_count: cur.read_u16::<LittleEndian>()?,
        submesh_count: cur.read_u16::<LittleEndian>()?,
        material_count: cur.read_u16::<LittleEndian>()?,
        bone_count: cur.read_u16::<LittleEndian>()?,
        bone_table_count: cur.read_u16::<LittleEndian>()?,
        shape_count: cur.read_u16::<LittleEndian>()?,
        shape_mesh_count: cur.read_u16::<LittleEndian>()?,
        shape_value_count: cur.read_u16::<LittleEndian>()?,
        lod_count: cur.read_u8()?,
        flags1: cur.read_u8()?,
        element_id_count: cur.read_u16::<LittleEndian>()?,
        terrain_shadow_mesh_count: cur.read_u8()?,
        flags2: cur.read_u8()?,
        model_clip_out_distance: cur.read_f32::<LittleEndian>()?,
        shadow_clip_out_distance: cur.read_f32::<LittleEndian>()?,
        unknown4: cur.read_u16::<LittleEndian>()?,
        terrain_shadow_submesh_count: cur.read_u16::<LittleEndian>()?,
        unknown5: cur.read_u8()?,
        bg_change_material_index: cur.read_u8()?,
        bg_crest_change_material_index: cur.read_u8()?,
        unknown6: cur.read_u8()?,
        unknown7: cur.read_u16::<LittleEndian>()?,
        unknown8: cur.read_u16::<LittleEndian>()?,
        unknown9: cur.read_u16::<LittleEndian>()?,
    };
    cur.seek(SeekFrom::Current(6))?;

    Ok(header)
}

fn read_element_id(cur: &mut Cursor<&[u8]>) -> Result<ElementId, DecodeError> {
    Ok(ElementId {
        element_id: cur.read_u32::<LittleEndian>()?,
        parent_bone_name: cur.read_u32::<LittleEndian>()?,
        translate: read_f32_array(cur)?,
        rotate: read_f32_array(cur)?,
    })
}

fn read_lod(cur: &mut Cursor<&[u8]>) -> Result<Lod, DecodeError> {
    Ok(Lod {
        mesh_index: cur.read_u16::<LittleEndian>()?,
        mesh_count: cur.read_u16::<LittleEndian>()?,
        model_lod_range: cur.read_f32::<LittleEndian>()?,
        texture_lod_range: cur.read_f32::<LittleEndian>()?,
        water_mesh_index: cur.read_u16::<LittleEndian>()?,
        water_mesh_count: cur.read_u16::<LittleEndian>()?,
        shadow_mesh_index: cur.read_u16::<LittleEndian>()?,
        shadow_mesh_count: cur.read_u16::<LittleEndian>()?,
        terrain_shadow_mesh_index: cur.read_u16::<LittleEndian>()?,
        terrain_shadow_mesh_count: cur.read_u16::<LittleEndian>()?,
        vertical_fog_mesh_index: cur.read_u16::<LittleEndian>()?,
        vertical_fog_mesh_count: cur.read_u16::<LittleEndian>()?,
        edge_geometry_size: cur.read_u32::<LittleEndian>()?,
        edge_geometry_offset: cur.read_u32::<LittleEndian>()?,
        polygon_count: cur.read_u32::<LittleEndian>()?,
        unknown1: cur.read_u32::<LittleEndian>()?,
        vertex_buffer_size: cur.read_u32::<LittleEndian>()?,
        index_buffer_size: cur.read_u32::<LittleEndian>()?,
        vertex_data_offset: cur.read_u32::<LittleEndian>()?,
        index_data_offset: cur.read_u32::<LittleEndian>()?,
    })
}

fn read_extra_lod(cur: &mut Cursor<&[u8]>) -> Result<ExtraLod, DecodeError> {
    let mut lod = ExtraLod {
        light_shaft_mesh_index: cur.read_u16::<LittleEndian>()?,
        light_shaft_mesh_count: cur.read_u16::<LittleEndian>()?,
        glass_mesh_index: cur.read_u16::<LittleEndian>()?,
        glass_mesh_count: cur.read_u16::<LittleEndian>()?,
        material_change_mesh_index: cur.read_u16::<LittleEndian>()?,
        material_change_mesh_count: cur.read_u16::<LittleEndian>()?,
        crest_change_mesh_index: cur.read_u16::<LittleEndian>()?,
        crest_change_mesh_count: cur.read_u16::<LittleEndian>()?,
        unknown: [0; 12],
    };
    for value in lod.unknown.iter_mut() {
        *value = cur.read_u16::<LittleEndian>()?;
    }

    Ok(lod)
}

fn read_mesh(cur: &mut Cursor<&[u8]>) -> Result<Mesh, DecodeError> {
    Ok(Mesh {
        vertex_count: cur.read_u16::<LittleEndian>()?,
        padding: cur.read_u16::<LittleEndian>()?,
        index_count: cur.read_u32::<LittleEndian>()?,
        material_index: cur.read_u16::<LittleEndian>()?,
        submesh_index: cur.read_u16::<LittleEndian>()?,
        submesh_count: cur.read_u16::<LittleEndian>()?,
        bone_table_index: cur.read_u16::<LittleEndian>()?,
        start_index: cur.read_u32::<LittleEndian>()?,
        vertex_buffer_offsets: read_u32_array(cur)?,
        vertex_buffer_strides: [cur.read_u8()?, cur.read_u8()?, cur.read_u8()?],
        vertex_stream_count: cur.read_u8()?,
    })
}

fn read_name_offset(cur: &mut Cursor<&[u8]>) -> Result<u32, DecodeError> {
    Ok(cur.read_u32::<LittleEndian>()?)
}

fn read_terrain_shadow_mesh(cur: &mut Cursor<&[u8]>) -> Result<TerrainShadowMesh, DecodeError> {
    let mesh = TerrainShadowMesh {
        index_count: cur.read_u32::<LittleEndian>()?,
        start_index: cur.read_u32::<LittleEndian>()?,
        vertex_buffer_offset: cur.read_u32::<LittleEndian>()?,
        vertex_count: cur.read_u16::<LittleEndian>()?,
        submesh_index: cur.read_u16::<LittleEndian>()?,
        submesh_count: cur.read_u16::<LittleEndian>()?,
        vertex_buffer_stride: cur.read_u8()?,
    };
    let _padding = cur.read_u8()?;

    Ok(mesh)
}

fn read_submesh(cur: &mut Cursor<&[u8]>) -> Result<Submesh, DecodeError> {
    Ok(Submesh {
        index_offset: cur.read_u32::<LittleEndian>()?,
        index_count: cur.read_u32::<LittleEndian>()?,
        attribute_index_mask: cur.read_u32::<LittleEndian>()?,
        bone_start_index: cur.read_u16::<LittleEndian>()?,
        bone_count: cur.read_u16::<LittleEndian>()?,
    })
}

fn read_terrain_shadow_submesh(
    cur: &mut Cursor<&[u8]>,
) -> Result<TerrainShadowSubmesh, DecodeError> {
    Ok(TerrainShadowSubmesh {
        index_offset: cur.read_u32::<LittleEndian>()?,
        index_count: cur.read_u32::<LittleEndian>()?,
        unknown1: cur.read_u16::<LittleEndian>()?,
        unknown2: cur.read_u16::<LittleEndian>()?,
    })
}

fn read_bone_table(cur: &mut Cursor<&[u8]>) -> Result<BoneTable, DecodeError> {
    let mut table = BoneTable::default();
    for index in table.bone_indices.iter_mut() {
        *index = cur.read_u16::<LittleEndian>()?;
    }
    table.bone_count = cur.read_u8()?;
    cur.seek(SeekFrom::Current(3))?;

    Ok(table)
}

fn read_shape(cur: &mut Cursor<&[u8]>) -> Result<Shape, DecodeError> {
    let mut shape = Shape {
        string_offset: cur.read_u32::<LittleEndian>()?,
        ..Shape::default()
    };
    for index in shape.shape_mesh_start_index.iter_mut() {
        *index = cur.read_u16::<LittleEndian>()?;
    }
    for count in shape.shape_mesh_count.iter_mut() {
        *count = cur.read_u16::<LittleEndian>()?;
    }

    Ok(shape)
}

fn read_shape_mesh(cur: &mut Cursor<&[u8]>) -> Result<ShapeMesh, DecodeError> {
    Ok(ShapeMesh {
        mesh_index_offset: cur.read_u32::<LittleEndian>()?,
        shape_value_count: cur.read_u32::<LittleEndian>()?,
        shape_value_offset: cur.read_u32::<LittleEndian>()?,
    })
}

fn read_shape_value(cur: &mut Cursor<&[u8]>) -> Result<ShapeValue, DecodeError> {
    Ok(ShapeValue {
        base_indices_index: cur.read_u16::<LittleEndian>()?,
        replacing_vertex_index: cur.read_u16::<LittleEndian>()?,
    })
}

fn read_bounding_box(cur: &mut Cursor<&[u8]>) -> Result<BoundingBox, DecodeError> {
    Ok(BoundingBox {
        min: read_f32_array(cur)?,
        max: read_f32_array(cur)?,
    })
}
