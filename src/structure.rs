use nalgebra::Vector3;

use crate::error::{AnalysisError, Result};

/// 3D coordinate of one residue's representative atom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Calculate Euclidean distance to another coordinate
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        self.squared_distance_to(other).sqrt()
    }

    /// Squared Euclidean distance, used wherever only a comparison is needed
    pub fn squared_distance_to(&self, other: &Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl From<Vector3<f64>> for Coordinate {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<[f64; 3]> for Coordinate {
    fn from(c: [f64; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

/// Ordered residue coordinates; index is the residue position
pub type PointSet = Vec<Coordinate>;

/// Mean position of a point set, or `None` when it is empty
pub fn centroid(points: &[Coordinate]) -> Option<Coordinate> {
    if points.is_empty() {
        return None;
    }

    let sum = points
        .iter()
        .fold(Vector3::<f64>::zeros(), |acc, p| acc + p.to_vector());

    Some(Coordinate::from(sum / points.len() as f64))
}

/// Fail with `InvalidParameter` when any coordinate is NaN or infinite
pub fn ensure_finite(points: &[Coordinate], label: &str) -> Result<()> {
    match points.iter().position(|p| !p.is_finite()) {
        Some(index) => Err(AnalysisError::InvalidParameter(format!(
            "{} point {} has a non-finite coordinate: {:?}",
            label, index, points[index]
        ))),
        None => Ok(()),
    }
}

/// Root-mean-square deviation between corresponding points (no superposition)
pub fn rmsd(a: &[Coordinate], b: &[Coordinate]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(AnalysisError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    if a.is_empty() {
        return Ok(0.0);
    }

    let sum_sq: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| p.squared_distance_to(q))
        .sum();

    Ok((sum_sq / a.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_distance() {
        let c1 = Coordinate::new(0.0, 0.0, 0.0);
        let c2 = Coordinate::new(3.0, 4.0, 0.0);
        assert_eq!(c1.distance_to(&c2), 5.0);
        assert_eq!(c1.squared_distance_to(&c2), 25.0);
    }

    #[test]
    fn test_centroid() {
        let points = vec![
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(2.0, 0.0, 0.0),
            Coordinate::new(2.0, 4.0, 0.0),
            Coordinate::new(0.0, 4.0, 6.0),
        ];
        let c = centroid(&points).unwrap();
        assert_eq!(c, Coordinate::new(1.0, 2.0, 1.5));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn test_rmsd() {
        let a = vec![Coordinate::new(0.0, 0.0, 0.0), Coordinate::new(1.0, 0.0, 0.0)];
        let b = vec![Coordinate::new(0.0, 0.0, 0.0), Coordinate::new(0.0, 0.0, 0.0)];
        // sqrt((0 + 1) / 2)
        assert!((rmsd(&a, &b).unwrap() - 0.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(rmsd(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_ensure_finite() {
        let mut points = vec![Coordinate::new(0.0, 1.0, 2.0); 4];
        assert!(ensure_finite(&points, "test").is_ok());

        points[2] = Coordinate::new(0.0, f64::NAN, 2.0);
        assert!(!points[2].is_finite());
        assert!(matches!(
            ensure_finite(&points, "test"),
            Err(AnalysisError::InvalidParameter(_))
        ));

        points[2] = Coordinate::new(f64::NEG_INFINITY, 0.0, 0.0);
        assert!(ensure_finite(&points, "test").is_err());
    }

    #[test]
    fn test_rmsd_length_mismatch() {
        let a = vec![Coordinate::new(0.0, 0.0, 0.0); 3];
        let b = vec![Coordinate::new(0.0, 0.0, 0.0); 2];
        assert!(matches!(
            rmsd(&a, &b),
            Err(AnalysisError::DimensionMismatch { expected: 3, found: 2 })
        ));
    }
}
