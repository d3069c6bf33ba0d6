use std::path::{Path, PathBuf};

use clap::Parser;

mod builder;
mod comm_parser;
mod datatypes;
mod error;
mod med_reader;
mod report;

use error::AstermatError;

/// Extension of the command script.
const COMM_EXTENSION: &str = ".comm";
/// Extension of the mesh container snapshot.
const MED_EXTENSION: &str = ".med.json";

/// Extracts solver-ready node, element, and material matrices from a
/// Code_Aster style case directory.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Directory holding the .comm command file and the .med.json mesh file
    #[arg(default_value = "Input")]
    input_dir: PathBuf,
    /// Write raw family tags into the material column instead of resolving
    /// them to material rows
    #[arg(long)]
    raw_tags: bool,
}

/// Locates the first .comm and .med.json files in the case directory.
///
/// Selection is first-in-sorted-filename-order for each kind, so the pick
/// stays deterministic when a directory carries several cases.
///
/// # Arguments
/// * `input_dir` - The case directory
///
/// # Returns
/// The command-file path and the mesh-file path, in that order
fn locate_case_files(input_dir: &Path) -> Result<(PathBuf, PathBuf), AstermatError> {
    if !input_dir.is_dir() {
        return Err(AstermatError::Input(format!(
            "Input directory '{}' does not exist",
            input_dir.display()
        )));
    }

    let entries = match std::fs::read_dir(input_dir) {
        Ok(entries) => entries,
        Err(err) => {
            return Err(AstermatError::Input(format!(
                "Unable to list input directory '{}': {}",
                input_dir.display(),
                err
            )))
        }
    };

    let mut comm_files: Vec<PathBuf> = Vec::new();
    let mut med_files: Vec<PathBuf> = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();

        if file_name.ends_with(COMM_EXTENSION) {
            comm_files.push(entry.path());
        } else if file_name.ends_with(MED_EXTENSION) {
            med_files.push(entry.path());
        }
    }
    comm_files.sort();
    med_files.sort();

    let comm_path = match comm_files.into_iter().next() {
        Some(path) => path,
        None => {
            return Err(AstermatError::Input(format!(
                "No {} files found inside '{}'",
                COMM_EXTENSION,
                input_dir.display()
            )))
        }
    };
    let med_path = match med_files.into_iter().next() {
        Some(path) => path,
        None => {
            return Err(AstermatError::Input(format!(
                "No {} files found inside '{}'",
                MED_EXTENSION,
                input_dir.display()
            )))
        }
    };

    Ok((comm_path, med_path))
}

fn file_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}

fn run(cli: &Cli) -> Result<(), AstermatError> {
    let (comm_path, med_path) = locate_case_files(&cli.input_dir)?;
    let med_file = med_path.to_string_lossy().into_owned();

    let comm_text = match std::fs::read_to_string(&comm_path) {
        Ok(text) => text,
        Err(err) => {
            return Err(AstermatError::Input(format!(
                "Unable to open command file {}: {}",
                comm_path.display(),
                err
            )))
        }
    };

    let mesh = med_reader::load_mesh(&med_file)?;
    let node = builder::build_node_matrix(&mesh);

    let comm_name = file_name(&comm_path);
    let med_name = file_name(&med_path);

    if cli.raw_tags {
        let elem = builder::build_elem_matrix(&mesh, None)?;
        report::print_summary(&comm_name, &med_name, &mesh, &node, &elem, None);
        return Ok(());
    }

    let materials = comm_parser::parse_materials(&comm_text)?;
    let assignments = comm_parser::parse_group_assignments(&comm_text)?;
    let families = med_reader::load_family_names(&med_file)?;
    let tag_index = builder::build_tag_index(&families, &materials, &assignments)?;
    let elem = builder::build_elem_matrix(&mesh, Some(&tag_index))?;
    let mater = builder::build_material_matrix(&materials);

    report::print_summary(
        &comm_name,
        &med_name,
        &mesh,
        &node,
        &elem,
        Some((&materials, &mater)),
    );

    Ok(())
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_dir(name: &str, files: &[&str]) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        for file in files {
            std::fs::write(dir.join(file), "").unwrap();
        }
        dir
    }

    #[test]
    fn picks_first_files_in_sorted_order() {
        let dir = case_dir(
            "astermat_sorted_pick",
            &["beam.comm", "axle.comm", "part.med.json", "bolt.med.json"],
        );

        let (comm_path, med_path) = locate_case_files(&dir).unwrap();
        assert_eq!(file_name(&comm_path), "axle.comm");
        assert_eq!(file_name(&med_path), "bolt.med.json");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = locate_case_files(Path::new("/nonexistent/astermat_case")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn missing_command_file_is_an_error() {
        let dir = case_dir("astermat_no_comm", &["part.med.json"]);
        let err = locate_case_files(&dir).unwrap_err();
        assert!(err.to_string().contains("No .comm files found"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_mesh_file_is_an_error() {
        let dir = case_dir("astermat_no_med", &["case.comm"]);
        let err = locate_case_files(&dir).unwrap_err();
        assert!(err.to_string().contains("No .med.json files found"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
