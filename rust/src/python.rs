//! PyO3 bindings for the `gantt_rust` Python module.

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;

use crate::config::{CategoryFilter, ChartConfig, TimeScaleUnit};
use crate::dependency::{self, resolve_starts};
use crate::document::load_project;
use crate::layout;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Chart scale and spacing (PyO3 wrapper).
#[pyclass(name = "ChartConfig")]
#[derive(Clone, Debug)]
pub struct PyChartConfig {
    #[pyo3(get, set)]
    pub pixels_per_day: f64,
    #[pyo3(get, set)]
    pub row_height: f64,
    #[pyo3(get, set)]
    pub row_spacing: f64,
    #[pyo3(get, set)]
    pub heading_spacing: f64,
    #[pyo3(get, set)]
    pub top_offset: f64,
    #[pyo3(get, set)]
    pub time_scale: String,
    #[pyo3(get, set)]
    pub verbosity: u8,
}

#[pymethods]
impl PyChartConfig {
    #[new]
    #[pyo3(signature = (pixels_per_day=30.0, row_height=30.0, row_spacing=5.0, heading_spacing=10.0, top_offset=60.0, time_scale="days".to_string(), verbosity=0))]
    fn new(
        pixels_per_day: f64,
        row_height: f64,
        row_spacing: f64,
        heading_spacing: f64,
        top_offset: f64,
        time_scale: String,
        verbosity: u8,
    ) -> PyResult<Self> {
        time_scale.parse::<TimeScaleUnit>().map_err(value_error)?;
        Ok(Self {
            pixels_per_day,
            row_height,
            row_spacing,
            heading_spacing,
            top_offset,
            time_scale,
            verbosity,
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "ChartConfig(pixels_per_day={}, row_height={}, time_scale={:?})",
            self.pixels_per_day, self.row_height, self.time_scale
        )
    }
}

impl PyChartConfig {
    fn to_config(&self) -> PyResult<ChartConfig> {
        Ok(ChartConfig {
            pixels_per_day: self.pixels_per_day,
            row_height: self.row_height,
            row_spacing: self.row_spacing,
            heading_spacing: self.heading_spacing,
            top_offset: self.top_offset,
            time_scale: self.time_scale.parse().map_err(value_error)?,
            verbosity: self.verbosity,
        })
    }
}

/// Resolve every task's effective start date.
///
/// # Returns
/// * Dict mapping task position to resolved start date
///
/// # Raises
/// * ValueError if the document is malformed or contains a dependency cycle
#[pyfunction]
#[pyo3(signature = (yaml, today, verbosity=0))]
fn resolve_start_dates(
    yaml: &str,
    today: NaiveDate,
    verbosity: u8,
) -> PyResult<HashMap<usize, NaiveDate>> {
    let project = load_project(yaml, verbosity).map_err(value_error)?;
    let resolved = resolve_starts(project.tasks(), today, verbosity).map_err(value_error)?;
    Ok(resolved
        .into_iter()
        .filter_map(|(id, start)| project.tasks().position(id).map(|p| (p, start)))
        .collect())
}

/// Whether the task at `index` can reach a dependency cycle.
#[pyfunction]
fn has_circular_dependency(yaml: &str, index: usize) -> PyResult<bool> {
    let project = load_project(yaml, 0).map_err(value_error)?;
    let id = project
        .tasks()
        .id_at(index)
        .ok_or_else(|| PyValueError::new_err(format!("Task index out of range: {index}")))?;
    Ok(dependency::has_circular_dependency(project.tasks(), id))
}

/// Lay out the chart and return it as a YAML document.
///
/// `selected_categories` holds category ids as strings plus `"uncategorized"`;
/// `None` shows every category.
#[pyfunction]
#[pyo3(signature = (yaml, config, today, selected_categories=None))]
fn render_chart(
    yaml: &str,
    config: &PyChartConfig,
    today: NaiveDate,
    selected_categories: Option<Vec<String>>,
) -> PyResult<String> {
    let config = config.to_config()?;
    let project = load_project(yaml, config.verbosity).map_err(value_error)?;
    let filter = match selected_categories {
        Some(keys) => CategoryFilter::from_keys(keys.iter().map(String::as_str))
            .map_err(value_error)?,
        None => CategoryFilter::All,
    };
    let chart = layout::render_chart(&project, &filter, &config, today).map_err(value_error)?;
    serde_yaml::to_string(&chart).map_err(value_error)
}

/// The gantt_rust Python module.
#[pymodule]
fn gantt_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyChartConfig>()?;

    m.add_function(wrap_pyfunction!(resolve_start_dates, m)?)?;
    m.add_function(wrap_pyfunction!(has_circular_dependency, m)?)?;
    m.add_function(wrap_pyfunction!(render_chart, m)?)?;

    Ok(())
}
