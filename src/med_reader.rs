use json::JsonValue;
use log::info;

use crate::{
    datatypes::{CellBlock, FamilyNameMap, Mesh},
    error::AstermatError,
};

/// Path of the element-family metadata tree inside the container, as laid
/// out by Salome MED exports.
const FAMILY_TREE_PATH: [&str; 3] = ["FAS", "Mesh_1", "ELEME"];
/// Family entries are keyed `FAM_<signed id>_<suffix>`.
const FAMILY_KEY_PREFIX: &str = "FAM_";

/// Reads the container file in full and parses it into a json tree. The
/// file handle is released before parsing starts.
fn parse_container(med_file: &str) -> Result<JsonValue, AstermatError> {
    let contents = match std::fs::read_to_string(med_file) {
        Ok(contents) => contents,
        Err(err) => {
            return Err(AstermatError::MedReader(format!(
                "Unable to open mesh file {}: {}",
                med_file, err
            )))
        }
    };

    match json::parse(&contents) {
        Ok(doc) => Ok(doc),
        Err(err) => Err(AstermatError::MedReader(format!(
            "Error in mesh container json: {}",
            err
        ))),
    }
}

/// Loads the mesh view of the container: point coordinates, cell blocks,
/// and the named per-cell attribute arrays.
///
/// # Arguments
/// * `med_file` - The path to the .med.json mesh container
///
/// # Returns
/// A Mesh with 0-based connectivity and cell_data in file appearance order
pub fn load_mesh(med_file: &str) -> Result<Mesh, AstermatError> {
    let doc = parse_container(med_file)?;

    if !doc["points"].is_array() {
        return Err(AstermatError::MedReader(
            "Mesh container is missing its points array".to_string(),
        ));
    }
    if !doc["cells"].is_array() {
        return Err(AstermatError::MedReader(
            "Mesh container is missing its cells array".to_string(),
        ));
    }

    let mut points: Vec<[f64; 3]> = Vec::new();
    for (row_idx, row) in doc["points"].members().enumerate() {
        if row.len() != 3 {
            return Err(AstermatError::MedReader(format!(
                "Point {} has {} coordinates, expected 3",
                row_idx,
                row.len()
            )));
        }

        let mut coords = [0.0f64; 3];
        for (axis, value) in row.members().enumerate() {
            coords[axis] = match value.as_f64() {
                Some(coordinate) => coordinate,
                None => {
                    return Err(AstermatError::MedReader(format!(
                        "Non-float coordinate in point {}",
                        row_idx
                    )))
                }
            };
        }
        points.push(coords);
    }

    let mut cells: Vec<CellBlock> = Vec::new();
    for block in doc["cells"].members() {
        let cell_type = match block["type"].as_str() {
            Some(cell_type) => cell_type.to_string(),
            None => {
                return Err(AstermatError::MedReader(format!(
                    "Cell block {} is missing its type tag",
                    cells.len()
                )))
            }
        };

        let mut data: Vec<Vec<i64>> = Vec::new();
        for row in block["data"].members() {
            let mut nodes: Vec<i64> = Vec::new();
            for value in row.members() {
                match value.as_i64() {
                    Some(node) => nodes.push(node),
                    None => {
                        return Err(AstermatError::MedReader(format!(
                            "Non-integer connectivity entry in {} block",
                            cell_type
                        )))
                    }
                }
            }
            data.push(nodes);
        }

        cells.push(CellBlock { cell_type, data });
    }

    let mut cell_data: Vec<(String, Vec<Vec<i64>>)> = Vec::new();
    for (name, arrays) in doc["cell_data"].entries() {
        let mut per_block: Vec<Vec<i64>> = Vec::new();
        for array in arrays.members() {
            let mut tags: Vec<i64> = Vec::new();
            for value in array.members() {
                match value.as_i64() {
                    Some(tag) => tags.push(tag),
                    None => {
                        return Err(AstermatError::MedReader(format!(
                            "Non-integer tag in cell data array {}",
                            name
                        )))
                    }
                }
            }
            per_block.push(tags);
        }
        cell_data.push((name.to_string(), per_block));
    }

    info!(
        "loaded {} points and {} cell blocks from {}",
        points.len(),
        cells.len(),
        med_file
    );

    Ok(Mesh {
        points,
        cells,
        cell_data,
    })
}

/// Parses the signed family id out of a `FAM_<id>_<suffix>` key.
fn parse_family_id(key: &str) -> Option<i64> {
    let rest = key.strip_prefix(FAMILY_KEY_PREFIX)?;
    let sep = rest.find('_')?;
    rest[..sep].parse().ok()
}

/// Decodes a family's GRO/NOM name dataset: the first fixed-width row of
/// character codes, with null padding dropped and whitespace trimmed.
fn decode_family_name(key: &str, entry: &JsonValue) -> Result<String, AstermatError> {
    let first_row = &entry["GRO"]["NOM"][0];
    if !first_row.is_array() {
        return Err(AstermatError::MedReader(format!(
            "Family entry {} is missing its GRO/NOM name dataset",
            key
        )));
    }

    let mut name = String::new();
    for value in first_row.members() {
        let code = match value.as_i64() {
            Some(code) => code,
            None => {
                return Err(AstermatError::MedReader(format!(
                    "Non-integer character code in family entry {}",
                    key
                )))
            }
        };
        if code != 0 {
            name.push(code as u8 as char);
        }
    }

    Ok(name.trim().to_string())
}

/// Resolves the family metadata tree to a family id -> group name map.
///
/// An absent metadata tree is not an error: the mesh simply carries no named
/// groups, and the map comes back empty. A duplicate family id keeps the
/// last entry read.
///
/// # Arguments
/// * `med_file` - The path to the .med.json mesh container
///
/// # Returns
/// A FamilyNameMap of every `FAM_<id>_` entry under the metadata tree
pub fn load_family_names(med_file: &str) -> Result<FamilyNameMap, AstermatError> {
    let doc = parse_container(med_file)?;

    let mut tree = &doc;
    for segment in FAMILY_TREE_PATH {
        tree = &tree[segment];
    }

    let mut families = FamilyNameMap::new();
    if tree.is_null() {
        return Ok(families);
    }

    for (key, entry) in tree.entries() {
        let family_id = match parse_family_id(key) {
            Some(id) => id,
            None => continue,
        };
        families.insert(family_id, decode_family_name(key, entry)?);
    }

    info!("resolved {} named families from {}", families.len(), med_file);

    Ok(families)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    const CONTAINER: &str = r#"{
        "points": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 1.0]],
        "cells": [
            {"type": "triangle", "data": [[0, 1, 2]]},
            {"type": "tetra", "data": [[0, 1, 2, 3], [1, 2, 3, 4]]}
        ],
        "cell_data": {"cell_tags": [[3], [7, 7]]},
        "FAS": {"Mesh_1": {"ELEME": {
            "FAM_7_GROUP": {"GRO": {"NOM": [[86, 79, 76, 85, 77, 69, 49, 0, 0, 0]]}},
            "FAM_-2_SKIN": {"GRO": {"NOM": [[80, 69, 65, 85, 0, 0, 0, 0]]}}
        }}}
    }"#;

    #[test]
    fn loads_mesh_view() {
        let path = write_temp("astermat_loads_mesh_view.med.json", CONTAINER);
        let mesh = load_mesh(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(mesh.points.len(), 5);
        assert_eq!(mesh.points[1], [1.0, 0.0, 0.0]);
        assert_eq!(mesh.cells.len(), 2);
        assert_eq!(mesh.cells[1].cell_type, "tetra");
        assert_eq!(mesh.cells[1].data, vec![vec![0, 1, 2, 3], vec![1, 2, 3, 4]]);
        assert_eq!(mesh.cell_data.len(), 1);
        assert_eq!(mesh.cell_data[0].0, "cell_tags");
        assert_eq!(mesh.cell_data[0].1[1], vec![7, 7]);
    }

    #[test]
    fn resolves_family_names() {
        let path = write_temp("astermat_resolves_family_names.med.json", CONTAINER);
        let families = load_family_names(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(families.len(), 2);
        assert_eq!(families[&7], "VOLUME1");
        assert_eq!(families[&-2], "PEAU");
    }

    #[test]
    fn absent_metadata_tree_means_no_names() {
        let path = write_temp(
            "astermat_absent_metadata.med.json",
            r#"{"points": [], "cells": []}"#,
        );
        let families = load_family_names(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(families.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_mesh("/nonexistent/astermat.med.json").unwrap_err();
        assert!(matches!(err, AstermatError::MedReader(_)));
        assert!(err.to_string().contains("Unable to open mesh file"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let path = write_temp("astermat_malformed.med.json", "{not json");
        let err = load_mesh(path.to_str().unwrap()).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(err.to_string().contains("Error in mesh container json"));
    }

    #[test]
    fn family_keys_must_match_the_pattern() {
        assert_eq!(parse_family_id("FAM_7_GROUP"), Some(7));
        assert_eq!(parse_family_id("FAM_-12_ELEM"), Some(-12));
        assert_eq!(parse_family_id("FAM_7"), None);
        assert_eq!(parse_family_id("FAM_x_GROUP"), None);
        assert_eq!(parse_family_id("FAMILLE_7_"), None);
        assert_eq!(parse_family_id("OTHER"), None);
    }
}
