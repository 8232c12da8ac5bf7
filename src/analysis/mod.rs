//! Analysis options

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::assembly::BackendKind;
use crate::error::{SolverError, SolverResult};
use crate::solver::LinearSolverKind;

/// Options for a load-controlled nonlinear analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Load factor reached at the end of the analysis
    pub max_load_factor: f64,
    /// Number of equal load factor increments
    pub num_steps: usize,
    /// Convergence tolerance on `sqrt(|G|)`
    pub tolerance: f64,
    /// Maximum iterations per load step
    pub max_iterations: usize,
    /// Assembly backend
    pub backend: BackendKind,
    /// Linear solver backend
    pub linear_solver: LinearSolverKind,
    /// Every n-th step, log its summary and the recorded results at info level
    pub log_frequency: Option<usize>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_load_factor: 1.0,
            num_steps: 10,
            tolerance: 1e-2,
            max_iterations: 30,
            backend: BackendKind::Local,
            linear_solver: LinearSolverKind::Lu,
            log_frequency: None,
        }
    }
}

impl AnalysisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> SolverResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> SolverResult<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> SolverResult<()> {
        if !(self.max_load_factor > 0.0) || !self.max_load_factor.is_finite() {
            return Err(SolverError::InvalidInput(format!(
                "max_load_factor must be positive, got {}",
                self.max_load_factor
            )));
        }
        if self.num_steps == 0 {
            return Err(SolverError::InvalidInput("num_steps must be at least 1".to_string()));
        }
        if !(self.tolerance > 0.0) {
            return Err(SolverError::InvalidInput(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidInput(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if let BackendKind::Distributed { partitions: 0 } = self.backend {
            return Err(SolverError::InvalidInput(
                "the distributed backend needs at least one partition".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the final load factor
    pub fn with_load_factor(mut self, max_load_factor: f64) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    /// Set the number of load steps
    pub fn with_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_linear_solver(mut self, linear_solver: LinearSolverKind) -> Self {
        self.linear_solver = linear_solver;
        self
    }

    /// Log the step summary and the recorded results every `frequency` steps
    pub fn with_logging(mut self, frequency: usize) -> Self {
        self.log_frequency = Some(frequency);
        self
    }
}
