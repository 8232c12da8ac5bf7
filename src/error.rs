//! Error types for the fibre solver

use thiserror::Error;

/// Main error type for solver operations
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Fibre input mismatch: {areas} areas but {positions} positions")]
    MismatchedFibreInput { areas: usize, positions: usize },

    #[error("Load input mismatch: {dofs} DoFs but {loads} loads")]
    MismatchedLoadInput { dofs: usize, loads: usize },

    #[error("Invalid DoF {0}, expected a value in 0..6")]
    InvalidDof(usize),

    #[error("Node {node} has no load on DoF {dof} to increment")]
    UnloadedDof { node: usize, dof: usize },

    #[error("Node {0} not found in mesh")]
    NodeNotFound(usize),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Singular stiffness matrix - model may be unstable or have insufficient restraints")]
    SingularMatrix,

    #[error("Assembly error: {0}")]
    Assembly(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for solver operations
pub type SolverResult<T> = Result<T, SolverError>;
