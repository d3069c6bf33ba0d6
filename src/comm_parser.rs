use log::info;

use crate::{
    datatypes::{GroupAssignments, Material},
    error::AstermatError,
};

/// Statement that declares a named material.
const MATERIAL_STATEMENT: &str = "DEFI_MATERIAU";
/// Statement that binds mesh groups to materials.
const ASSIGNMENT_STATEMENT: &str = "AFFE_MATERIAU";
/// Marker of the recurring keyword-factory sub-blocks inside a statement.
const SUBBLOCK_MARKER: &str = "_F";
/// Key of the elastic sub-block inside a material definition.
const ELASTIC_KEY: &str = "ELAS";
/// Key listing mesh group names inside an assignment sub-block.
const GROUP_KEY: &str = "GROUP_MA";
/// Key naming the assigned material inside an assignment sub-block.
const MATERIAL_KEY: &str = "MATER";

/// Scans for the matching close paren, starting just past an open paren.
///
/// Depth starts at 1; every `(` increments, every `)` decrements, and the
/// span ends right before the paren that brings depth back to 0. Running out
/// of text first means the parens are unbalanced.
fn balanced_span<'a>(
    text: &'a str,
    body_start: usize,
    context: &str,
) -> Result<&'a str, AstermatError> {
    let mut depth: usize = 1;

    for (offset, character) in text[body_start..].char_indices() {
        match character {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[body_start..body_start + offset]);
                }
            }
            _ => {}
        }
    }

    Err(AstermatError::CommParser(format!(
        "Unbalanced parentheses while parsing {}",
        context
    )))
}

/// Returns the inner text of the first `func_name(...)` call, keeping any
/// nested parenthesized sub-expressions intact.
///
/// # Arguments
/// * `text` - The full command-file text
/// * `func_name` - The name of the call to locate
///
/// # Returns
/// The substring between the call's outer parentheses
pub fn extract_function_body<'a>(
    text: &'a str,
    func_name: &str,
) -> Result<&'a str, AstermatError> {
    let target = format!("{}(", func_name);

    let start = match text.find(&target) {
        Some(position) => position,
        None => {
            return Err(AstermatError::CommParser(format!(
                "{} call not found in .comm file",
                func_name
            )))
        }
    };

    balanced_span(text, start + target.len(), func_name)
}

/// Returns the inner text of every `marker(...)` occurrence, in order of
/// appearance. Occurrences never overlap: the scan resumes past each
/// closing paren.
pub fn extract_marker_blocks<'a>(
    text: &'a str,
    marker: &str,
) -> Result<Vec<&'a str>, AstermatError> {
    let target = format!("{}(", marker);
    let mut blocks: Vec<&str> = Vec::new();
    let mut search_pos: usize = 0;

    while let Some(found) = text[search_pos..].find(&target) {
        let body_start = search_pos + found + target.len();
        let body = balanced_span(text, body_start, marker)?;
        search_pos = body_start + body.len() + 1;
        blocks.push(body);
    }

    Ok(blocks)
}

/// Locates `key = (...)` in `text` (or `key = call_name(...)` when a call
/// name is given) and returns the balanced paren body. Returns None when
/// the shape is absent or the parens never close.
fn key_value_span<'a>(text: &'a str, key: &str, call_name: Option<&str>) -> Option<&'a str> {
    let key_pos = text.find(key)?;
    let mut rest = text[key_pos + key.len()..].trim_start();
    rest = rest.strip_prefix('=')?.trim_start();

    if let Some(name) = call_name {
        rest = rest.strip_prefix(name)?.trim_start();
    }
    rest = rest.strip_prefix('(')?;

    let mut depth: usize = 1;
    for (offset, character) in rest.char_indices() {
        match character {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[..offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Splits on commas at paren depth 0, leaving nested lists whole.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = Vec::new();
    let mut depth: usize = 0;
    let mut start: usize = 0;

    for (idx, character) in text.char_indices() {
        match character {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);

    parts
}

/// Walks back from a statement call to find the `<name> =` binding in front
/// of it. Returns None when the call is not the right-hand side of an
/// assignment.
fn binding_name(text: &str, call_start: usize) -> Option<&str> {
    let lhs = text[..call_start].trim_end();
    let lhs = lhs.strip_suffix('=')?.trim_end();

    let mut name_start = lhs.len();
    for (idx, character) in lhs.char_indices().rev() {
        if character.is_ascii_alphanumeric() || character == '_' {
            name_start = idx;
        } else {
            break;
        }
    }

    if name_start == lhs.len() {
        None
    } else {
        Some(&lhs[name_start..])
    }
}

/// Pulls E and NU out of the `ELAS = _F(...)` sub-block of a material
/// definition body. Returns None when the sub-block or either value is
/// missing or unparseable.
fn parse_elastic_block(body: &str) -> Option<(f64, f64)> {
    let elastic = key_value_span(body, ELASTIC_KEY, Some(SUBBLOCK_MARKER))?;

    let mut young_modulus: Option<f64> = None;
    let mut poisson_ratio: Option<f64> = None;

    for pair in split_top_level(elastic) {
        let (key, value) = match pair.split_once('=') {
            Some(kv) => kv,
            None => continue,
        };

        match key.trim() {
            "E" => young_modulus = value.trim().parse().ok(),
            "NU" => poisson_ratio = value.trim().parse().ok(),
            _ => {}
        }
    }

    Some((young_modulus?, poisson_ratio?))
}

/// Collects the contents of every single-quoted name in a list body.
fn quoted_names(list: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut rest = list;

    while let Some(open) = rest.find('\'') {
        let after = &rest[open + 1..];
        match after.find('\'') {
            Some(close) => {
                if close > 0 {
                    names.push(&after[..close]);
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }

    names
}

/// Returns the first bare identifier in a list body.
fn first_identifier(text: &str) -> Option<&str> {
    let start = text
        .char_indices()
        .find(|(_, c)| c.is_ascii_alphabetic() || *c == '_')?
        .0;

    let end = text[start..]
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(offset, _)| start + offset)
        .unwrap_or(text.len());

    Some(&text[start..end])
}

/// Parses every `<name> = DEFI_MATERIAU(ELAS=_F(E=..., NU=...))` statement
/// in the command text.
///
/// Statements missing the name binding, the elastic sub-block, or a
/// parseable E/NU pair are not material definitions and are skipped.
///
/// # Arguments
/// * `comm_text` - The full command-file text
///
/// # Returns
/// The materials in order of first appearance; that order defines the
/// 1-based row index used by the element matrix.
pub fn parse_materials(comm_text: &str) -> Result<Vec<Material>, AstermatError> {
    let target = format!("{}(", MATERIAL_STATEMENT);
    let mut materials: Vec<Material> = Vec::new();
    let mut search_pos: usize = 0;

    while let Some(found) = comm_text[search_pos..].find(&target) {
        let call_start = search_pos + found;
        let body_start = call_start + target.len();
        let body = balanced_span(comm_text, body_start, MATERIAL_STATEMENT)?;
        search_pos = body_start + body.len() + 1;

        let name = match binding_name(comm_text, call_start) {
            Some(name) => name,
            None => continue,
        };
        let (young_modulus, poisson_ratio) = match parse_elastic_block(body) {
            Some(pair) => pair,
            None => continue,
        };

        materials.push(Material {
            name: name.to_string(),
            young_modulus,
            poisson_ratio,
        });
    }

    if materials.is_empty() {
        return Err(AstermatError::CommParser(
            "No DEFI_MATERIAU blocks found in .comm file".to_string(),
        ));
    }

    info!("parsed {} material definitions", materials.len());

    Ok(materials)
}

/// Maps mesh group names to material names from the single AFFE_MATERIAU
/// statement.
///
/// Each `_F(...)` sub-block carrying both a GROUP_MA list and a MATER list
/// contributes every quoted group name, bound to the first identifier of the
/// MATER list. A group named in more than one sub-block keeps the last
/// binding, in appearance order.
///
/// # Arguments
/// * `comm_text` - The full command-file text
///
/// # Returns
/// A group name -> material name map
pub fn parse_group_assignments(comm_text: &str) -> Result<GroupAssignments, AstermatError> {
    let body = extract_function_body(comm_text, ASSIGNMENT_STATEMENT)?;
    let mut assignments = GroupAssignments::new();

    for block in extract_marker_blocks(body, SUBBLOCK_MARKER)? {
        if !block.contains(GROUP_KEY) || !block.contains(MATERIAL_KEY) {
            continue;
        }

        let group_list = match key_value_span(block, GROUP_KEY, None) {
            Some(list) => list,
            None => continue,
        };
        let material_list = match key_value_span(block, MATERIAL_KEY, None) {
            Some(list) => list,
            None => continue,
        };

        let material_name = match first_identifier(material_list) {
            Some(name) => name,
            None => continue,
        };

        for group in quoted_names(group_list) {
            assignments.insert(group.to_string(), material_name.to_string());
        }
    }

    if assignments.is_empty() {
        return Err(AstermatError::CommParser(
            "No GROUP_MA to MATER assignments found in AFFE_MATERIAU".to_string(),
        ));
    }

    info!("parsed {} group assignments", assignments.len());

    Ok(assignments)
}
