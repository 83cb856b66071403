pub mod analysis;
pub mod contacts;
pub mod error;
pub mod pdb;
pub mod structure;
pub mod superposition;

#[cfg(feature = "python")]
pub mod python_bindings;

// Re-export commonly used types and functions
pub use analysis::{analyze, analyze_files, analyze_trajectory, AnalysisConfig, ContactDensityReport, ModelReport};
pub use contacts::{build_contacts, compare, save_contact_pairs_to_csv, ContactSummary, ContactVector, DEFAULT_CONTACT_THRESHOLD};
pub use error::{AnalysisError, Result};
pub use pdb::{read_ca_coordinates, read_ca_models, Model};
pub use structure::{Coordinate, PointSet};
pub use superposition::{align, superpose, Alignment, RigidTransform};
