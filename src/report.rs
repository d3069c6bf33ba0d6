use nalgebra::DMatrix;

use crate::datatypes::{Material, Mesh};

/// Prints the end-of-run case summary to stdout.
///
/// # Arguments
/// * `comm_name` - File name of the command script
/// * `med_name` - File name of the mesh container
/// * `mesh` - The loaded mesh
/// * `node` - The node matrix
/// * `elem` - The element matrix
/// * `materials` - The material list and matrix, absent in raw-tag runs
pub fn print_summary(
    comm_name: &str,
    med_name: &str,
    mesh: &Mesh,
    node: &DMatrix<f64>,
    elem: &DMatrix<i64>,
    materials: Option<(&[Material], &DMatrix<f64>)>,
) {
    println!("Found command file : {}", comm_name);
    println!("Found mesh file    : {}", med_name);
    println!(
        "Mesh summary       : {} points, {} cell blocks",
        mesh.points.len(),
        mesh.cells.len()
    );
    println!("Node matrix shape  : {:?}", node.shape());
    println!("Element matrix shape: {:?}", elem.shape());

    if let Some((materials, mater)) = materials {
        println!("Material matrix shape: {:?}", mater.shape());
        for (material, row) in materials.iter().zip(mater.row_iter()) {
            println!("  {}: E={}, nu={}", material.name, row[0], row[1]);
        }
    }
}
