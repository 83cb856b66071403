//! Rigid-body superposition of two corresponding point sets.
//!
//! Finds the proper rotation and translation that minimise the sum of squared
//! distances between `mobile` and `target` (Kabsch fit), and applies it to
//! `mobile`. The reflection correction `d = sign(det(V·Uᵀ))` keeps the result
//! a proper rotation even for near-planar inputs.

use std::cmp::Ordering;

use nalgebra::{Matrix3, Vector3};
use tracing::{debug, trace};

use crate::error::{AnalysisError, Result};
use crate::structure::{self, Coordinate, PointSet};

/// Smallest number of points that can fix a rotation
pub const MIN_ALIGNMENT_POINTS: usize = 3;

/// Relative size of the second principal moment below which a point set is
/// treated as collinear
pub const COLLINEARITY_TOLERANCE: f64 = 1e-10;

/// Proper rotation followed by a translation: `p' = R·p + t`
#[derive(Debug, Clone, PartialEq)]
pub struct RigidTransform {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn apply(&self, point: &Coordinate) -> Coordinate {
        Coordinate::from(self.rotation * point.to_vector() + self.translation)
    }

    pub fn apply_all(&self, points: &[Coordinate]) -> PointSet {
        points.iter().map(|p| self.apply(p)).collect()
    }

    pub fn determinant(&self) -> f64 {
        self.rotation.determinant()
    }
}

/// Result of superposing a mobile point set onto a target
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Mobile points expressed in the target's frame, same order as the input
    pub aligned: PointSet,
    pub transform: RigidTransform,
    /// RMSD between `aligned` and the target
    pub rmsd: f64,
}

/// Superpose `mobile` onto `target`.
///
/// # Errors
/// * `DimensionMismatch` if the lengths differ or the inputs are empty
/// * `InvalidParameter` if any coordinate is NaN or infinite
/// * `DegenerateInput` for fewer than three points, or when either set is
///   collinear (the rotation about the common line is then arbitrary)
pub fn align(mobile: &[Coordinate], target: &[Coordinate]) -> Result<Alignment> {
    let n = mobile.len();
    if n != target.len() {
        return Err(AnalysisError::DimensionMismatch {
            expected: target.len(),
            found: n,
        });
    }
    if n == 0 {
        return Err(AnalysisError::DimensionMismatch {
            expected: MIN_ALIGNMENT_POINTS,
            found: 0,
        });
    }
    if n < MIN_ALIGNMENT_POINTS {
        return Err(AnalysisError::DegenerateInput(format!(
            "at least {} points are needed to determine a rotation, got {}",
            MIN_ALIGNMENT_POINTS, n
        )));
    }
    structure::ensure_finite(mobile, "mobile")?;
    structure::ensure_finite(target, "target")?;

    let mobile_v: Vec<Vector3<f64>> = mobile.iter().map(Coordinate::to_vector).collect();
    let target_v: Vec<Vector3<f64>> = target.iter().map(Coordinate::to_vector).collect();

    let mobile_centroid = mean(&mobile_v);
    let target_centroid = mean(&target_v);

    let mobile_centered: Vec<Vector3<f64>> =
        mobile_v.iter().map(|p| p - mobile_centroid).collect();
    let target_centered: Vec<Vector3<f64>> =
        target_v.iter().map(|p| p - target_centroid).collect();

    ensure_not_collinear(&mobile_centered, "mobile")?;
    ensure_not_collinear(&target_centered, "target")?;

    // H[r][c] = Σ mobile[r] · target[c]
    let h: Matrix3<f64> = mobile_centered
        .iter()
        .zip(target_centered.iter())
        .fold(Matrix3::<f64>::zeros(), |acc, (m, t)| acc + m * t.transpose());

    // `svd` returns singular values in descending order, so the reflection
    // correction always lands on the smallest one.
    let svd = h.svd(true, true);
    let u = svd.u.ok_or_else(|| {
        AnalysisError::DegenerateInput("SVD of the covariance matrix produced no U".to_string())
    })?;
    let v_t = svd.v_t.ok_or_else(|| {
        AnalysisError::DegenerateInput("SVD of the covariance matrix produced no Vᵀ".to_string())
    })?;
    trace!(singular_values = ?svd.singular_values, "covariance SVD");

    let v = v_t.transpose();
    let u_t = u.transpose();
    let d = if (v * u_t).determinant() < 0.0 { -1.0 } else { 1.0 };
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));

    let rotation = v * correction * u_t;
    let translation = target_centroid - rotation * mobile_centroid;
    let transform = RigidTransform {
        rotation,
        translation,
    };

    let aligned = transform.apply_all(mobile);
    let rmsd = structure::rmsd(&aligned, target)?;

    let reflection_corrected = d < 0.0;
    debug!(points = n, reflection_corrected, rmsd, "superposition complete");

    Ok(Alignment {
        aligned,
        transform,
        rmsd,
    })
}

/// Superpose `mobile` onto `target` and return only the moved points
pub fn superpose(mobile: &[Coordinate], target: &[Coordinate]) -> Result<PointSet> {
    align(mobile, target).map(|alignment| alignment.aligned)
}

fn mean(points: &[Vector3<f64>]) -> Vector3<f64> {
    points.iter().fold(Vector3::<f64>::zeros(), |acc, p| acc + p) / points.len() as f64
}

/// Reject point sets whose spread lies along a single line
fn ensure_not_collinear(centered: &[Vector3<f64>], label: &str) -> Result<()> {
    let scatter: Matrix3<f64> = centered
        .iter()
        .fold(Matrix3::<f64>::zeros(), |acc, c| acc + c * c.transpose());

    let mut moments: Vec<f64> = scatter.symmetric_eigenvalues().iter().copied().collect();
    moments.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

    if moments[0] <= 0.0 || moments[1] <= COLLINEARITY_TOLERANCE * moments[0] {
        return Err(AnalysisError::DegenerateInput(format!(
            "{} points are collinear or coincident; rotation is not unique",
            label
        )));
    }

    Ok(())
}
