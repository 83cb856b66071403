use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result};
use crate::structure::{Coordinate, PointSet};

/// Alpha-carbon trace of one model in a PDB file
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub number: i32,
    pub points: PointSet,
}

/// Read alpha-carbon coordinates of the first model, in file order
pub fn read_ca_coordinates(path: impl AsRef<Path>) -> Result<PointSet> {
    let path = path.as_ref();
    let mut models = read_ca_models(path, Some(1))?;

    match models.pop() {
        Some(model) if !model.points.is_empty() => Ok(model.points),
        _ => Err(AnalysisError::EmptyStructure(path.to_path_buf())),
    }
}

/// Read alpha-carbon coordinates of every model in a PDB file
///
/// # Arguments
/// * `max_models` - Maximum number of models to read (None for all models)
///
/// # Returns
/// Models sorted by model number. A file without MODEL records is read as a
/// single model numbered 1.
pub fn read_ca_models(path: impl AsRef<Path>, max_models: Option<usize>) -> Result<Vec<Model>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut models: Vec<Model> = Vec::new();
    let mut current: Option<Model> = None;
    let mut untagged = PointSet::new();
    let mut model_found = false;

    for (idx, line_result) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line_result.map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if line.starts_with("MODEL") {
            model_found = true;

            if let Some(model) = current.take() {
                push_model(&mut models, model);
            }
            if max_models.is_some_and(|max| models.len() >= max) {
                break;
            }

            let number = line
                .get(6..)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| parse_error(path, line_number, "MODEL record without serial number"))?
                .parse::<i32>()
                .map_err(|e| parse_error(path, line_number, &format!("invalid model number: {}", e)))?;

            current = Some(Model {
                number,
                points: PointSet::new(),
            });
        } else if line.starts_with("ENDMDL") {
            if let Some(model) = current.take() {
                push_model(&mut models, model);
            }
            if max_models.is_some_and(|max| models.len() >= max) {
                break;
            }
        } else if is_alpha_carbon(&line) {
            let point = parse_coordinate(&line, path, line_number)?;
            match current.as_mut() {
                Some(model) => model.points.push(point),
                None if !model_found => untagged.push(point),
                // Atoms between ENDMDL and the next MODEL belong to no model
                None => {}
            }
        }
    }

    // Last model of a file missing its final ENDMDL
    if let Some(model) = current.take() {
        if max_models.map_or(true, |max| models.len() < max) {
            push_model(&mut models, model);
        }
    }

    if !model_found && !untagged.is_empty() {
        models.push(Model {
            number: 1,
            points: untagged,
        });
    }

    models.sort_by_key(|m| m.number);

    debug!(path = %path.display(), models = models.len(), "read alpha-carbon models");
    if let Some(first) = models.first() {
        info!(
            path = %path.display(),
            residues = first.points.len(),
            models = models.len(),
            "loaded structure"
        );
    }

    Ok(models)
}

/// Keep a finished model unless it holds no alpha carbons
fn push_model(models: &mut Vec<Model>, model: Model) {
    if model.points.is_empty() {
        warn!(model = model.number, "skipping model without alpha-carbon atoms");
        return;
    }
    models.push(model);
}

/// ATOM/HETATM record for an alpha carbon, excluding calcium ions
fn is_alpha_carbon(line: &str) -> bool {
    if !(line.starts_with("ATOM") || line.starts_with("HETATM")) {
        return false;
    }
    if line.get(12..16).map(str::trim) != Some("CA") {
        return false;
    }

    // Keep the first conformer only
    let alt_loc = line.get(16..17).unwrap_or(" ");
    if alt_loc != " " && alt_loc != "A" {
        return false;
    }

    match line.get(76..78).map(str::trim) {
        Some("CA") => false,
        Some(element) if !element.is_empty() => true,
        // No element column: fall back on the residue name
        _ => line.get(17..20).map(str::trim) != Some("CA"),
    }
}

/// Fixed-column coordinates: x = 31-38, y = 39-46, z = 47-54 (1-indexed)
fn parse_coordinate(line: &str, path: &Path, line_number: usize) -> Result<Coordinate> {
    let field = |range: std::ops::Range<usize>, axis: &str| -> Result<f64> {
        let raw = line.get(range).ok_or_else(|| {
            parse_error(path, line_number, &format!("record too short for {} coordinate", axis))
        })?;
        let value = raw.trim().parse::<f64>().map_err(|e| {
            parse_error(
                path,
                line_number,
                &format!("invalid {} coordinate '{}': {}", axis, raw.trim(), e),
            )
        })?;
        // `f64::from_str` accepts "nan" and "inf"
        if !value.is_finite() {
            return Err(parse_error(
                path,
                line_number,
                &format!("non-finite {} coordinate '{}'", axis, raw.trim()),
            ));
        }
        Ok(value)
    };

    Ok(Coordinate::new(
        field(30..38, "x")?,
        field(38..46, "y")?,
        field(46..54, "z")?,
    ))
}

fn parse_error(path: &Path, line: usize, message: &str) -> AnalysisError {
    AnalysisError::Parse {
        path: PathBuf::from(path),
        line,
        message: message.to_string(),
    }
}
