use bes_core::ParamValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Minimum number of digits in a run identifier.
pub const DEFAULT_RUN_ID_WIDTH: usize = 4;

/// Ordered mapping from parameter name to its candidate values.
///
/// Key order and value order define the enumeration order of the sweep, so
/// both are preserved exactly as loaded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SweepSpec {
    dimensions: IndexMap<String, Vec<ParamValue>>,
}

impl SweepSpec {
    /// Creates an empty sweep.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a dimension. Re-declaring a name replaces its values in place.
    pub fn with_dimension(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = ParamValue>,
    ) -> Self {
        self.dimensions
            .insert(name.into(), values.into_iter().collect());
        self
    }

    /// Iterates dimensions in enumeration order.
    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &[ParamValue])> {
        self.dimensions
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Candidate values for `name`.
    pub fn values(&self, name: &str) -> Option<&[ParamValue]> {
        self.dimensions.get(name).map(Vec::as_slice)
    }

    /// Whether the sweep declares `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.dimensions.contains_key(name)
    }

    /// Number of jobs the expansion will produce.
    pub fn job_count(&self) -> usize {
        self.dimensions.values().map(Vec::len).product()
    }
}

/// One concrete point of the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Zero-padded identifier derived from the enumeration index.
    pub run_id: String,
    /// Position in the canonical enumeration.
    pub index: usize,
    /// Exactly one value per sweep dimension, in sweep key order.
    pub params: IndexMap<String, ParamValue>,
}

impl Job {
    /// Value assigned to `name`.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// String value assigned to `name`, rendering numbers when needed.
    pub fn label(&self, name: &str) -> String {
        self.params
            .get(name)
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// Formats the identifier of the job at `index`.
pub fn run_id(index: usize, width: usize) -> String {
    format!("run_{index:0width$}")
}

/// Pad width for a sweep of `job_count` jobs.
pub fn run_id_width(job_count: usize) -> usize {
    let largest = job_count.saturating_sub(1);
    let digits = largest.checked_ilog10().map_or(1, |log| log as usize + 1);
    digits.max(DEFAULT_RUN_ID_WIDTH)
}

/// Expands the sweep into its cartesian product.
///
/// The first dimension is the outermost loop and the last one varies
/// fastest. An empty value list anywhere yields no jobs.
pub fn expand(spec: &SweepSpec) -> Vec<Job> {
    let dimensions: Vec<(&String, &Vec<ParamValue>)> = spec.dimensions.iter().collect();
    let mut combinations = Vec::with_capacity(spec.job_count());
    expand_grid(&dimensions, 0, IndexMap::new(), &mut combinations);
    let width = run_id_width(combinations.len());
    combinations
        .into_iter()
        .enumerate()
        .map(|(index, params)| Job {
            run_id: run_id(index, width),
            index,
            params,
        })
        .collect()
}

fn expand_grid(
    dimensions: &[(&String, &Vec<ParamValue>)],
    idx: usize,
    current: IndexMap<String, ParamValue>,
    outputs: &mut Vec<IndexMap<String, ParamValue>>,
) {
    if idx == dimensions.len() {
        outputs.push(current);
        return;
    }
    let (name, values) = dimensions[idx];
    for value in values.iter() {
        let mut next = current.clone();
        next.insert(name.clone(), value.clone());
        expand_grid(dimensions, idx + 1, next, outputs);
    }
}
