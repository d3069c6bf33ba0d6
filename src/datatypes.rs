use std::collections::{BTreeMap, HashMap};

/// A named elastic material parsed from the command file.
///
/// Parse order is significant: the (i+1)-th parsed material owns row i of
/// the material matrix, and element rows reference it by that 1-based index.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub young_modulus: f64,
    pub poisson_ratio: f64,
}

/// One cell block of the mesh: a type tag plus its connectivity, one row per
/// cell, 0-based node indices as read from the container.
#[derive(Debug, Clone)]
pub struct CellBlock {
    pub cell_type: String,
    pub data: Vec<Vec<i64>>,
}

/// In-memory view of the mesh container.
///
/// `cell_data` keeps the container's appearance order: tag lookup falls back
/// to the first array long enough for the target block, so order matters.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub points: Vec<[f64; 3]>,
    pub cells: Vec<CellBlock>,
    pub cell_data: Vec<(String, Vec<Vec<i64>>)>,
}

/// Family id -> group name, read from the mesh metadata tree.
pub type FamilyNameMap = BTreeMap<i64, String>;

/// Mesh group name -> material name, parsed from AFFE_MATERIAU.
pub type GroupAssignments = HashMap<String, String>;

/// Family id -> 1-based material row index.
pub type TagToMaterialIndex = BTreeMap<i64, usize>;
