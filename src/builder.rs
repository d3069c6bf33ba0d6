use std::collections::{BTreeSet, HashMap};

use log::info;
use nalgebra::DMatrix;

use crate::{
    datatypes::{CellBlock, FamilyNameMap, GroupAssignments, Material, Mesh, TagToMaterialIndex},
    error::AstermatError,
};

/// Cell types accepted as the volumetric block.
pub const VOLUME_CELL_TYPES: [&str; 4] = ["tetra", "tetra4", "tet10", "tetra10"];
/// Element type id written into column 0 of the element matrix.
pub const TETRA4_TYPE_ID: i64 = 1;
/// Nodes per linear tetrahedron.
const TETRA4_NODES: usize = 4;
/// Name of the per-cell attribute carrying family tags.
const CELL_TAGS_KEY: &str = "cell_tags";

/// Composes the family id -> material row index from the three parsed
/// sources.
///
/// A family whose group name appears in no assignment is skipped: meshes
/// routinely carry named surface groups that the material field never
/// references. A group that names an undefined material is an error.
///
/// # Arguments
/// * `family_names` - Family id -> group name, from the mesh metadata
/// * `materials` - The ordered material list; position defines the row index
/// * `assignments` - Group name -> material name, from the command file
///
/// # Returns
/// A non-empty TagToMaterialIndex with 1-based material rows
pub fn build_tag_index(
    family_names: &FamilyNameMap,
    materials: &[Material],
    assignments: &GroupAssignments,
) -> Result<TagToMaterialIndex, AstermatError> {
    let mut material_lookup: HashMap<&str, usize> = HashMap::new();
    for (idx, material) in materials.iter().enumerate() {
        material_lookup.insert(material.name.as_str(), idx + 1);
    }

    let mut tag_index = TagToMaterialIndex::new();
    for (family_id, group_name) in family_names {
        let material_name = match assignments.get(group_name) {
            Some(name) => name,
            None => continue,
        };

        let row = match material_lookup.get(material_name.as_str()) {
            Some(row) => *row,
            None => {
                return Err(AstermatError::Builder(format!(
                    "Material '{}' referenced by group '{}' is undefined",
                    material_name, group_name
                )))
            }
        };

        tag_index.insert(*family_id, row);
    }

    if tag_index.is_empty() {
        return Err(AstermatError::Builder(
            "Failed to build any material mappings from mesh groups".to_string(),
        ));
    }

    Ok(tag_index)
}

/// Returns the first cell block with a volumetric type, checked for 4-node
/// cells. Later volumetric blocks are ignored.
pub fn locate_volume_block(mesh: &Mesh) -> Result<(usize, &CellBlock), AstermatError> {
    for (idx, block) in mesh.cells.iter().enumerate() {
        if !VOLUME_CELL_TYPES.contains(&block.cell_type.as_str()) {
            continue;
        }

        for row in &block.data {
            if row.len() != TETRA4_NODES {
                return Err(AstermatError::Builder(format!(
                    "Expected 4-node tets, got {} nodes per cell",
                    row.len()
                )));
            }
        }

        return Ok((idx, block));
    }

    Err(AstermatError::Builder(
        "No tetrahedral cell block found in mesh".to_string(),
    ))
}

/// Fetches the tag array for a block: the attribute named `cell_tags` when
/// present, else the first attribute in file order with an array for that
/// block index.
fn extract_cell_tags(mesh: &Mesh, block_index: usize) -> Result<&[i64], AstermatError> {
    if let Some((_, arrays)) = mesh
        .cell_data
        .iter()
        .find(|(name, _)| name.as_str() == CELL_TAGS_KEY)
    {
        return match arrays.get(block_index) {
            Some(tags) => Ok(tags),
            None => Err(AstermatError::Builder(format!(
                "{} carries no array for cell block {}",
                CELL_TAGS_KEY, block_index
            ))),
        };
    }

    for (_, arrays) in &mesh.cell_data {
        if block_index < arrays.len() {
            return Ok(&arrays[block_index]);
        }
    }

    Err(AstermatError::Builder(
        "No cell tags found for tetrahedral block".to_string(),
    ))
}

/// Assembles the element matrix `[type_id, material_row, n1, n2, n3, n4]`
/// for the volumetric block, with 1-based connectivity.
///
/// With a tag index, every family tag must resolve to a material row;
/// unresolved tags are collected and reported together. Without one, the
/// raw tag value is written into the material column untranslated.
///
/// Unresolved tags are marked with a transient -1 before the check, so a
/// mesh using -1 as a real, mapped family id is fine, but an unmapped -1
/// would alias the sentinel.
///
/// # Arguments
/// * `mesh` - The loaded mesh
/// * `tag_index` - Family id -> material row, or None for raw tags
///
/// # Returns
/// An M-by-6 integer matrix, one row per cell of the volumetric block
pub fn build_elem_matrix(
    mesh: &Mesh,
    tag_index: Option<&TagToMaterialIndex>,
) -> Result<DMatrix<i64>, AstermatError> {
    let (block_index, block) = locate_volume_block(mesh)?;
    let tags = extract_cell_tags(mesh, block_index)?;

    if tags.len() != block.data.len() {
        return Err(AstermatError::Builder(
            "Mismatch between element tags and connectivity lengths".to_string(),
        ));
    }

    let material_column: Vec<i64> = match tag_index {
        Some(index) => {
            let mapped: Vec<i64> = tags
                .iter()
                .map(|tag| match index.get(tag) {
                    Some(row) => *row as i64,
                    None => -1,
                })
                .collect();

            let missing: BTreeSet<i64> = tags
                .iter()
                .zip(&mapped)
                .filter(|(_, mapped_row)| **mapped_row < 0)
                .map(|(tag, _)| *tag)
                .collect();

            if !missing.is_empty() {
                let listed: Vec<String> = missing.iter().map(|id| id.to_string()).collect();
                return Err(AstermatError::Builder(format!(
                    "No material mapping found for family ids: {}",
                    listed.join(", ")
                )));
            }

            mapped
        }
        None => tags.to_vec(),
    };

    let rows = block.data.len();
    let elem = DMatrix::from_fn(rows, 2 + TETRA4_NODES, |row, col| match col {
        0 => TETRA4_TYPE_ID,
        1 => material_column[row],
        // connectivity goes out 1-based
        _ => block.data[row][col - 2] + 1,
    });

    info!(
        "assembled element matrix for {} cells in block {}",
        rows, block_index
    );

    Ok(elem)
}

/// Builds the N-by-3 node matrix from the mesh points, order-preserving.
pub fn build_node_matrix(mesh: &Mesh) -> DMatrix<f64> {
    DMatrix::from_fn(mesh.points.len(), 3, |row, col| mesh.points[row][col])
}

/// Builds the K-by-2 material matrix `[E, NU]`, one row per parsed material
/// in parse order.
pub fn build_material_matrix(materials: &[Material]) -> DMatrix<f64> {
    DMatrix::from_fn(materials.len(), 2, |row, col| {
        if col == 0 {
            materials[row].young_modulus
        } else {
            materials[row].poisson_ratio
        }
    })
}
