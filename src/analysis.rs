use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::contacts::{build_contacts, compare, ContactVector, DEFAULT_CONTACT_THRESHOLD};
use crate::error::{AnalysisError, Result};
use crate::pdb::{read_ca_coordinates, Model};
use crate::structure::Coordinate;
use crate::superposition::align;

/// Settings for a contact density comparison
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Contact distance cutoff (Å)
    pub threshold: f64,
    /// Superpose the conformation onto the native structure before scoring
    pub superpose: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONTACT_THRESHOLD,
            superpose: true,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "contact threshold must be a positive finite distance, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Contact density of a conformation measured against the native structure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactDensityReport {
    pub conformation_contacts: usize,
    pub native_contacts: usize,
    pub common_contacts: usize,
    /// Percentage of native contacts present in the conformation
    pub contact_density: f64,
    /// RMSD after superposition, when superposition was performed
    pub rmsd: Option<f64>,
}

impl ContactDensityReport {
    /// Pretty-printed JSON rendering of the report
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of scoring one model of a trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReport {
    pub model: i32,
    pub report: ContactDensityReport,
}

/// One row of the trajectory scores CSV
#[derive(Serialize)]
struct ModelRow {
    model: i32,
    conformation_contacts: usize,
    native_contacts: usize,
    common_contacts: usize,
    contact_density: f64,
    rmsd: Option<f64>,
}

impl From<&ModelReport> for ModelRow {
    fn from(entry: &ModelReport) -> Self {
        let r = &entry.report;
        Self {
            model: entry.model,
            conformation_contacts: r.conformation_contacts,
            native_contacts: r.native_contacts,
            common_contacts: r.common_contacts,
            contact_density: r.contact_density,
            rmsd: r.rmsd,
        }
    }
}

/// Compare a conformation with the native structure.
///
/// The conformation is superposed onto the native structure (if enabled),
/// both contact vectors are built and the native one is used as reference.
#[instrument(skip_all, fields(residues = native.len()))]
pub fn analyze(
    native: &[Coordinate],
    conformation: &[Coordinate],
    config: &AnalysisConfig,
) -> Result<ContactDensityReport> {
    config.validate()?;
    let native_contacts = build_contacts(native, config.threshold)?;
    score_against(&native_contacts, native, conformation, config)
}

/// Read both structures from PDB files and compare them
pub fn analyze_files(
    native_path: impl AsRef<Path>,
    conformation_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<ContactDensityReport> {
    let native = read_ca_coordinates(native_path)?;
    let conformation = read_ca_coordinates(conformation_path)?;
    analyze(&native, &conformation, config)
}

/// Score every model of a trajectory against the native structure
///
/// # Arguments
/// * `output_csv_path` - Optional path to save one CSV row per model
#[instrument(skip_all, fields(models = models.len()))]
pub fn analyze_trajectory(
    native: &[Coordinate],
    models: &[Model],
    config: &AnalysisConfig,
    output_csv_path: Option<&Path>,
) -> Result<Vec<ModelReport>> {
    config.validate()?;
    let native_contacts = build_contacts(native, config.threshold)?;
    info!(native_contacts = native_contacts.count(), "scoring trajectory");

    let pb = ProgressBar::new(models.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} models ({percent}%) | ETA: {eta}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut results = Vec::with_capacity(models.len());
    for model in models {
        let report = score_against(&native_contacts, native, &model.points, config).map_err(|e| {
            warn!(model = model.number, error = %e, "failed to score model");
            e
        })?;
        results.push(ModelReport {
            model: model.number,
            report,
        });
        pb.inc(1);
    }
    pb.finish_with_message("Scoring complete");

    if let Some(output_path) = output_csv_path {
        save_reports_to_csv(&results, output_path)?;
        info!(path = %output_path.display(), "saved trajectory scores");
    }

    Ok(results)
}

fn score_against(
    native_contacts: &ContactVector,
    native: &[Coordinate],
    conformation: &[Coordinate],
    config: &AnalysisConfig,
) -> Result<ContactDensityReport> {
    let (conformation_contacts, rmsd) = if config.superpose {
        let alignment = align(conformation, native)?;
        (
            build_contacts(&alignment.aligned, config.threshold)?,
            Some(alignment.rmsd),
        )
    } else {
        if conformation.len() != native.len() {
            return Err(AnalysisError::DimensionMismatch {
                expected: native.len(),
                found: conformation.len(),
            });
        }
        (build_contacts(conformation, config.threshold)?, None)
    };

    let summary = compare(&conformation_contacts, native_contacts)?;

    Ok(ContactDensityReport {
        conformation_contacts: summary.total_a,
        native_contacts: summary.total_b,
        common_contacts: summary.common,
        contact_density: summary.density,
        rmsd,
    })
}

/// Save model reports to CSV file
fn save_reports_to_csv(reports: &[ModelReport], output_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)?;

    // Header row comes from the `ModelRow` field names
    for entry in reports {
        writer.serialize(ModelRow::from(entry))?;
    }

    writer.flush().map_err(|source| AnalysisError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::superposition::RigidTransform;
    use nalgebra::{Rotation3, Vector3};

    /// Compact, helix-like trace with a few long-range contacts
    fn native_trace(n: usize) -> Vec<Coordinate> {
        (0..n)
            .map(|i| {
                let angle = (i as f64 * 100.0).to_radians();
                Coordinate::new(2.3 * angle.cos(), 2.3 * angle.sin(), 1.5 * i as f64)
            })
            .collect()
    }

    fn moved(points: &[Coordinate]) -> Vec<Coordinate> {
        RigidTransform {
            rotation: Rotation3::from_euler_angles(0.9, 0.2, -1.4).into_inner(),
            translation: Vector3::new(30.0, -12.0, 5.0),
        }
        .apply_all(points)
    }

    #[test]
    fn test_identical_structures() {
        let native = native_trace(10);
        let report = analyze(&native, &native, &AnalysisConfig::default()).unwrap();
        assert!(report.native_contacts > 0);
        assert_eq!(report.common_contacts, report.native_contacts);
        assert_eq!(report.conformation_contacts, report.native_contacts);
        assert_eq!(report.contact_density, 100.0);
        assert!(report.rmsd.unwrap() < 1e-9);
    }

    #[test]
    fn test_rigid_motion_does_not_change_contacts() {
        let native = native_trace(25);
        let conformation = moved(&native);

        let aligned = analyze(&native, &conformation, &AnalysisConfig::default()).unwrap();
        assert_eq!(aligned.common_contacts, aligned.native_contacts);
        assert_eq!(aligned.contact_density, 100.0);

        let unaligned = AnalysisConfig {
            superpose: false,
            ..AnalysisConfig::default()
        };
        let report = analyze(&native, &conformation, &unaligned).unwrap();
        assert_eq!(report.conformation_contacts, report.native_contacts);
        assert!(report.rmsd.is_none());
    }

    #[test]
    fn test_unfolded_conformation() {
        let native = native_trace(12);
        let extended: Vec<Coordinate> = (0..12)
            .map(|i| Coordinate::new(3.8 * i as f64, if i % 2 == 0 { 0.0 } else { 0.5 }, 0.0))
            .collect();

        let report = analyze(&native, &extended, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.conformation_contacts, 0);
        assert_eq!(report.common_contacts, 0);
        assert_eq!(report.contact_density, 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let native = native_trace(10);
        let conformation = native_trace(9);
        for superpose in [true, false] {
            let config = AnalysisConfig {
                superpose,
                ..AnalysisConfig::default()
            };
            assert!(matches!(
                analyze(&native, &conformation, &config),
                Err(AnalysisError::DimensionMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_invalid_threshold() {
        let native = native_trace(5);
        let config = AnalysisConfig {
            threshold: -2.0,
            superpose: true,
        };
        assert!(matches!(
            analyze(&native, &native, &config),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_trajectory_scoring_and_csv() {
        let native = native_trace(10);
        let models = vec![
            Model {
                number: 1,
                points: moved(&native),
            },
            Model {
                number: 2,
                points: native.clone(),
            },
        ];
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("scores.csv");

        let reports =
            analyze_trajectory(&native, &models, &AnalysisConfig::default(), Some(&csv_path)).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.report.contact_density == 100.0));

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                "model",
                "conformation_contacts",
                "native_contacts",
                "common_contacts",
                "contact_density",
                "rmsd"
            ]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get(0), Some("2"));
        assert_eq!(rows[1].get(4).unwrap().parse::<f64>().unwrap(), 100.0);
        assert!(rows[1].get(5).unwrap().parse::<f64>().unwrap() < 1e-6);

        let unaligned = AnalysisConfig {
            superpose: false,
            ..AnalysisConfig::default()
        };
        analyze_trajectory(&native, &models, &unaligned, Some(&csv_path)).unwrap();
        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(first.get(5), Some(""));
    }

    #[test]
    fn test_analyze_files() {
        use std::io::Write;

        let write = |points: &[Coordinate]| {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            for (i, p) in points.iter().enumerate() {
                writeln!(
                    file,
                    "ATOM  {:>5}  CA  ALA A{:>4}    {:>8.3}{:>8.3}{:>8.3}  1.00  0.00           C",
                    i + 1,
                    i + 1,
                    p.x,
                    p.y,
                    p.z
                )
                .unwrap();
            }
            file.flush().unwrap();
            file
        };

        let native = native_trace(10);
        let native_file = write(&native);
        let conformation_file = write(&moved(&native));

        let report =
            analyze_files(native_file.path(), conformation_file.path(), &AnalysisConfig::default()).unwrap();
        assert!(report.native_contacts > 0);
        assert_eq!(report.contact_density, 100.0);
        assert!(report.rmsd.unwrap() < 0.01);
    }

    #[test]
    fn test_json_errors_convert() {
        let err: AnalysisError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AnalysisError::Json(_)));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let native = native_trace(6);
        let report = analyze(&native, &native, &AnalysisConfig::default()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["contact_density"], 100.0);
        assert!(json.get("native_contacts").is_some());
    }
}
