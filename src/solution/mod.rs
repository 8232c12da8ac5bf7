//! Load-controlled Newton-Raphson procedure
//!
//! The reference loads are applied in `num_steps` equal increments of the
//! load factor. Within a step the out-of-balance force `G = R - P` is driven
//! below the tolerance by repeated tangent solves `dU = -K^-1 G`. A converged
//! step commits every section and is written to the scribe; a step that runs
//! out of iterations ends the analysis.
//!
//! A tangent that cannot be factorised on the first solve of a run is an
//! error. Once a tangent has been factorised, a singular one can only come
//! from a collapse mechanism forming, and it ends the run as a failed step.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::analysis::AnalysisOptions;
use crate::assembly::Assembler;
use crate::error::{SolverError, SolverResult};
use crate::loads::LoadManager;
use crate::mesh::GlobalMesh;
use crate::results::Scribe;
use crate::solver::Solver;

/// Relative gap between the final and the requested load factor accepted as
/// a complete analysis
pub const LOAD_FACTOR_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolutionState {
    Idle,
    LoadStepping,
    Iterating,
    Converged,
    Finished,
    Failed,
}

/// Summary of one load step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: usize,
    pub load_factor: f64,
    /// Tangent solves performed in the step
    pub iterations: usize,
    /// Out-of-balance measure at the last check
    pub g_max: f64,
    pub converged: bool,
}

/// What an analysis achieved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub succeeded: bool,
    pub load_factor: f64,
    pub total_iterations: usize,
    pub steps: Vec<StepReport>,
    pub elapsed: Duration,
}

impl AnalysisOutcome {
    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// Report of the last step attempted
    pub fn last_step(&self) -> Option<&StepReport> {
        self.steps.last()
    }
}

#[derive(Debug, Clone)]
pub struct SolutionProcedure {
    max_load_factor: f64,
    num_steps: usize,
    load_factor_increment: f64,
    tolerance: f64,
    max_iterations: usize,
    log_frequency: Option<usize>,
    load_factor: f64,
    state: SolutionState,
    tangent_factorised: bool,
}

impl SolutionProcedure {
    pub fn new(
        max_load_factor: f64,
        num_steps: usize,
        tolerance: f64,
        max_iterations: usize,
    ) -> SolverResult<Self> {
        if !(max_load_factor > 0.0) {
            return Err(SolverError::InvalidInput(format!(
                "maximum load factor must be positive, got {max_load_factor}"
            )));
        }
        if num_steps == 0 {
            return Err(SolverError::InvalidInput("at least one load step is needed".to_string()));
        }
        if !(tolerance > 0.0) {
            return Err(SolverError::InvalidInput(format!(
                "tolerance must be positive, got {tolerance}"
            )));
        }
        if max_iterations == 0 {
            return Err(SolverError::InvalidInput(
                "at least one iteration per step is needed".to_string(),
            ));
        }
        Ok(Self {
            max_load_factor,
            num_steps,
            load_factor_increment: max_load_factor / num_steps as f64,
            tolerance,
            max_iterations,
            log_frequency: None,
            load_factor: 0.0,
            state: SolutionState::Idle,
            tangent_factorised: false,
        })
    }

    pub fn from_options(options: &AnalysisOptions) -> SolverResult<Self> {
        let mut procedure = Self::new(
            options.max_load_factor,
            options.num_steps,
            options.tolerance,
            options.max_iterations,
        )?;
        procedure.log_frequency = options.log_frequency;
        Ok(procedure)
    }

    /// Log every `frequency`-th step summary and the recorded results at `info`
    pub fn with_log_frequency(mut self, frequency: usize) -> Self {
        self.log_frequency = Some(frequency);
        self
    }

    pub fn state(&self) -> SolutionState {
        self.state
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    pub fn load_factor_increment(&self) -> f64 {
        self.load_factor_increment
    }

    /// Run the analysis.
    ///
    /// Failing to converge is reported through the outcome; errors are
    /// reserved for inconsistent input and singular tangents.
    pub fn solve(
        &mut self,
        mesh: &mut GlobalMesh,
        assembler: &mut dyn Assembler,
        solver: &mut Solver,
        load_manager: &LoadManager,
        scribe: &mut Scribe,
    ) -> SolverResult<AnalysisOutcome> {
        let start = Instant::now();
        info!(
            "Starting analysis: {} steps to LF = {}, tol = {:e}, max {} iterations, {} assembler, {} solver",
            self.num_steps,
            self.max_load_factor,
            self.tolerance,
            self.max_iterations,
            assembler.name(),
            solver.name()
        );

        self.load_factor = 0.0;
        self.tangent_factorised = false;
        let mut steps = Vec::with_capacity(self.num_steps);
        let mut total_iterations = 0;

        for step in 1..=self.num_steps {
            self.state = SolutionState::LoadStepping;
            self.load_factor += self.load_factor_increment;
            load_manager.increment_loads(mesh, self.load_factor_increment)?;
            assembler.assemble_global_p(mesh)?;

            let report = match self.iterate(step, mesh, assembler, solver) {
                Ok(report) => report,
                Err(e) => {
                    self.state = SolutionState::Failed;
                    return Err(e);
                }
            };
            total_iterations += report.iterations;

            mesh.update_starting_states();
            scribe.write_to_records(mesh, self.load_factor)?;
            steps.push(report);

            let summary = format!(
                "Step {step}/{}: LF = {:.6}, {} iterations, G_max = {:e}",
                self.num_steps, self.load_factor, report.iterations, report.g_max
            );
            match self.log_frequency {
                Some(frequency) if frequency > 0 && step % frequency == 0 => {
                    info!("{summary}");
                    scribe.read_all_records();
                }
                _ => debug!("{summary}"),
            }

            if !report.converged {
                self.state = SolutionState::Failed;
                warn!(
                    "Analysis stopped: step {step} did not converge at LF = {}, G_max = {:e} (tol = {:e})",
                    self.load_factor, report.g_max, self.tolerance
                );
                break;
            }
        }

        let reached = (self.load_factor - self.max_load_factor).abs() / self.max_load_factor
            <= LOAD_FACTOR_TOLERANCE;
        let succeeded = self.state != SolutionState::Failed && reached;
        self.state = if succeeded {
            SolutionState::Finished
        } else {
            SolutionState::Failed
        };

        let elapsed = start.elapsed();
        info!(
            "Analysis {} at LF = {:.6} after {total_iterations} iterations in {:.3}s",
            if succeeded { "succeeded" } else { "failed" },
            self.load_factor,
            elapsed.as_secs_f64()
        );

        Ok(AnalysisOutcome {
            succeeded,
            load_factor: self.load_factor,
            total_iterations,
            steps,
            elapsed,
        })
    }

    fn iterate(
        &mut self,
        step: usize,
        mesh: &mut GlobalMesh,
        assembler: &mut dyn Assembler,
        solver: &mut Solver,
    ) -> SolverResult<StepReport> {
        self.state = SolutionState::Iterating;
        let mut corrections = 0;
        let mut converged = false;

        for iteration in 1..=self.max_iterations {
            assembler.map_u_to_nodes(mesh)?;
            assembler.update_element_states(mesh)?;
            assembler.assemble_global_k_r(mesh)?;
            assembler.calculate_out_of_balance();
            converged = assembler.check_convergence(self.tolerance);
            debug!(
                "Step {step}, iteration {iteration}: G_max = {:e}{}",
                assembler.g_max(),
                if converged { " (converged)" } else { "" }
            );
            if converged {
                break;
            }
            match solver.solve_for_delta_u(assembler) {
                Ok(()) => self.tangent_factorised = true,
                Err(SolverError::SingularMatrix) if self.tangent_factorised => {
                    warn!(
                        "Step {step}, iteration {iteration}: tangent became singular at LF = {}, a collapse mechanism has formed",
                        self.load_factor
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
            assembler.increment_u();
            corrections += 1;
        }

        if converged {
            self.state = SolutionState::Converged;
        }
        Ok(StepReport {
            step,
            load_factor: self.load_factor,
            iterations: corrections,
            g_max: assembler.g_max(),
            converged,
        })
    }
}
