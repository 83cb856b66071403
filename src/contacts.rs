use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::structure::{ensure_finite, Coordinate};

/// Default contact distance cutoff (Å)
pub const DEFAULT_CONTACT_THRESHOLD: f64 = 6.0;

/// Residues closer than this in sequence are never scored as contacts
pub const MIN_SEQUENCE_SEPARATION: usize = 2;

/// Binary contact map over all residue pairs `(i, j)` with `j >= i + 2`,
/// flattened with `i` ascending and `j` ascending within each `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactVector {
    flags: Vec<bool>,
    residue_count: usize,
}

impl ContactVector {
    /// Number of scored pairs for `n` residues: n(n-1)/2 - (n-1)
    pub fn expected_len(residue_count: usize) -> usize {
        residue_count.saturating_sub(1) * residue_count.saturating_sub(2) / 2
    }

    /// Wrap flags produced elsewhere, recovering the residue count from the length.
    ///
    /// Lengths that no residue count produces are rejected. An empty vector is
    /// taken to describe two residues.
    pub fn from_flags(flags: Vec<bool>) -> Result<Self> {
        let mut residue_count = MIN_SEQUENCE_SEPARATION;
        while Self::expected_len(residue_count) < flags.len() {
            residue_count += 1;
        }
        if Self::expected_len(residue_count) != flags.len() {
            return Err(AnalysisError::InvalidParameter(format!(
                "{} flags do not form a contact vector for any residue count",
                flags.len()
            )));
        }
        Ok(Self {
            flags,
            residue_count,
        })
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn residue_count(&self) -> usize {
        self.residue_count
    }

    /// Number of pairs in contact
    pub fn count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.flags.iter().copied()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.flags
    }

    /// Residue index pairs that are in contact, in enumeration order
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        pair_indices(self.residue_count)
            .zip(self.flags.iter())
            .filter(|&(_, &flag)| flag)
            .map(|(pair, _)| pair)
            .collect()
    }
}

/// All scored residue pairs for `n` residues, in contact vector order
pub fn pair_indices(residue_count: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..residue_count).flat_map(move |i| {
        (i + MIN_SEQUENCE_SEPARATION..residue_count).map(move |j| (i, j))
    })
}

/// Contact counts of two structures and their overlap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactSummary {
    pub total_a: usize,
    /// Contacts in the reference structure
    pub total_b: usize,
    pub common: usize,
    /// Percentage of the reference contacts also present in `a`
    pub density: f64,
}

/// Build the contact vector of a structure.
///
/// A pair is in contact when its squared distance is strictly below
/// `threshold²`.
pub fn build_contacts(points: &[Coordinate], threshold: f64) -> Result<ContactVector> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "contact threshold must be a positive finite distance, got {}",
            threshold
        )));
    }

    ensure_finite(points, "input")?;

    let n = points.len();
    let cutoff_sq = threshold * threshold;

    #[cfg(feature = "parallel")]
    let flags: Vec<bool> = {
        use rayon::prelude::*;
        (0..n)
            .into_par_iter()
            .map(|i| contact_row(points, i, cutoff_sq))
            .collect::<Vec<Vec<bool>>>()
            .concat()
    };
    #[cfg(not(feature = "parallel"))]
    let flags: Vec<bool> = (0..n)
        .flat_map(|i| contact_row(points, i, cutoff_sq))
        .collect();

    let vector = ContactVector {
        flags,
        residue_count: n,
    };
    debug!(
        residues = n,
        pairs = vector.len(),
        contacts = vector.count(),
        threshold,
        "built contact vector"
    );

    Ok(vector)
}

fn contact_row(points: &[Coordinate], i: usize, cutoff_sq: f64) -> Vec<bool> {
    let origin = &points[i];
    points
        .iter()
        .skip(i + MIN_SEQUENCE_SEPARATION)
        .map(|other| origin.squared_distance_to(other) < cutoff_sq)
        .collect()
}

/// Compare a candidate contact vector `a` with a reference `b`.
///
/// Density is `common / total_b * 100`, or 0 when the reference has no contacts.
pub fn compare(a: &ContactVector, b: &ContactVector) -> Result<ContactSummary> {
    if a.len() != b.len() {
        return Err(AnalysisError::DimensionMismatch {
            expected: b.len(),
            found: a.len(),
        });
    }

    let total_a = a.count();
    let total_b = b.count();
    let common = a.iter().zip(b.iter()).filter(|&(x, y)| x && y).count();

    let density = if total_b > 0 {
        common as f64 / total_b as f64 * 100.0
    } else {
        0.0
    };

    Ok(ContactSummary {
        total_a,
        total_b,
        common,
        density,
    })
}

/// Save the contacting residue pairs (0-based indices) to a CSV file
pub fn save_contact_pairs_to_csv(contacts: &ContactVector, output_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)?;

    writer.write_record(&["i", "j"])?;
    for (i, j) in contacts.pairs() {
        writer.write_record(&[i.to_string(), j.to_string()])?;
    }

    writer.flush().map_err(|source| AnalysisError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;

    Ok(())
}
