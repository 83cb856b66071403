use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::analysis::{analyze_files, AnalysisConfig};
use crate::contacts::{self, ContactVector, DEFAULT_CONTACT_THRESHOLD};
use crate::error::AnalysisError;
use crate::structure::{Coordinate, PointSet};
use crate::superposition;

fn to_py_err(e: AnalysisError) -> PyErr {
    match e {
        AnalysisError::Io { .. } => PyErr::new::<pyo3::exceptions::PyIOError, _>(e.to_string()),
        AnalysisError::Parse { .. }
        | AnalysisError::EmptyStructure(_)
        | AnalysisError::Csv(_)
        | AnalysisError::Json(_) => {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string())
        }
        _ => PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()),
    }
}

fn to_point_set(points: Vec<[f64; 3]>) -> PointSet {
    points.into_iter().map(Coordinate::from).collect()
}

fn to_flags(values: Vec<u8>) -> PyResult<ContactVector> {
    ContactVector::from_flags(values.into_iter().map(|v| v != 0).collect()).map_err(to_py_err)
}

/// Python binding for align: superpose `mobile` onto `target`
///
/// Returns (aligned_points, rotation_rows, translation, rmsd)
#[pyfunction]
#[allow(clippy::type_complexity)]
fn align(
    mobile: Vec<[f64; 3]>,
    target: Vec<[f64; 3]>,
) -> PyResult<(Vec<[f64; 3]>, [[f64; 3]; 3], [f64; 3], f64)> {
    let alignment = superposition::align(&to_point_set(mobile), &to_point_set(target))
        .map_err(to_py_err)?;

    let aligned = alignment.aligned.iter().map(|p| [p.x, p.y, p.z]).collect();
    let r = &alignment.transform.rotation;
    let rotation = [
        [r[(0, 0)], r[(0, 1)], r[(0, 2)]],
        [r[(1, 0)], r[(1, 1)], r[(1, 2)]],
        [r[(2, 0)], r[(2, 1)], r[(2, 2)]],
    ];
    let t = &alignment.transform.translation;

    Ok((aligned, rotation, [t.x, t.y, t.z], alignment.rmsd))
}

/// Python binding for build_contacts: list of 0/1 flags per residue pair
#[pyfunction]
#[pyo3(signature = (points, threshold=DEFAULT_CONTACT_THRESHOLD))]
fn build_contacts(points: Vec<[f64; 3]>, threshold: f64) -> PyResult<Vec<u8>> {
    let contacts = contacts::build_contacts(&to_point_set(points), threshold).map_err(to_py_err)?;
    Ok(contacts.iter().map(u8::from).collect())
}

/// Python binding for compare: overlap of candidate `a` with reference `b`
#[pyfunction]
fn compare(py: Python<'_>, a: Vec<u8>, b: Vec<u8>) -> PyResult<PyObject> {
    let summary = contacts::compare(&to_flags(a)?, &to_flags(b)?).map_err(to_py_err)?;

    let py_dict = PyDict::new_bound(py);
    py_dict.set_item("total_a", summary.total_a)?;
    py_dict.set_item("total_b", summary.total_b)?;
    py_dict.set_item("common", summary.common)?;
    py_dict.set_item("density", summary.density)?;

    Ok(py_dict.into())
}

/// Python binding for the full native/conformation comparison of two PDB files
#[pyfunction]
#[pyo3(signature = (native_file, conformation_file, threshold=DEFAULT_CONTACT_THRESHOLD, superpose=true))]
fn contact_density(
    py: Python<'_>,
    native_file: &str,
    conformation_file: &str,
    threshold: f64,
    superpose: bool,
) -> PyResult<PyObject> {
    let config = AnalysisConfig {
        threshold,
        superpose,
    };
    let report = analyze_files(native_file, conformation_file, &config).map_err(to_py_err)?;

    let py_dict = PyDict::new_bound(py);
    py_dict.set_item("conformation_contacts", report.conformation_contacts)?;
    py_dict.set_item("native_contacts", report.native_contacts)?;
    py_dict.set_item("common_contacts", report.common_contacts)?;
    py_dict.set_item("contact_density", report.contact_density)?;
    py_dict.set_item("rmsd", report.rmsd)?;

    Ok(py_dict.into())
}

/// Python binding listing contacting residue pairs of a structure
#[pyfunction]
#[pyo3(signature = (points, threshold=DEFAULT_CONTACT_THRESHOLD))]
fn contact_pairs(py: Python<'_>, points: Vec<[f64; 3]>, threshold: f64) -> PyResult<PyObject> {
    let contacts = contacts::build_contacts(&to_point_set(points), threshold).map_err(to_py_err)?;

    let py_pairs = PyList::empty_bound(py);
    for pair in contacts.pairs() {
        py_pairs.append(pair)?;
    }

    Ok(py_pairs.into())
}

/// Python module definition
#[pymodule]
fn contact_density_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(align, m)?)?;
    m.add_function(wrap_pyfunction!(build_contacts, m)?)?;
    m.add_function(wrap_pyfunction!(compare, m)?)?;
    m.add_function(wrap_pyfunction!(contact_density, m)?)?;
    m.add_function(wrap_pyfunction!(contact_pairs, m)?)?;
    m.add("__doc__", "Contact density analysis with rigid superposition")?;
    Ok(())
}
