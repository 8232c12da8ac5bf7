//! Interface exchange between partitions
//!
//! Every partition owns a contiguous block of equations. The displacements
//! of equations its elements touch but another partition owns are kept in
//! an [`InterfaceMap`] and refreshed through an [`ImportPlan`] that is
//! worked out once, when the partitions are set up.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::error::{SolverError, SolverResult};

/// How imported values are combined with the target map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    /// Create the entry; used on the first exchange
    Insert,
    /// Overwrite an entry that must already exist
    Replace,
}

/// Displacements of equations owned by other partitions, keyed by global
/// equation number
#[derive(Debug, Clone, Default)]
pub struct InterfaceMap {
    values: BTreeMap<usize, f64>,
}

impl InterfaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn combine(&mut self, row: usize, value: f64, mode: CombineMode) -> SolverResult<()> {
        match mode {
            CombineMode::Insert => {
                self.values.insert(row, value);
            }
            CombineMode::Replace => {
                let entry = self.values.get_mut(&row).ok_or_else(|| {
                    SolverError::Assembly(format!(
                        "cannot replace interface equation {row}, it was never imported"
                    ))
                })?;
                *entry = value;
            }
        }
        Ok(())
    }

    pub fn get(&self, row: usize) -> Option<f64> {
        self.values.get(&row).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.values.keys().copied()
    }
}

/// Partition owning `row`, given contiguous, ordered row ranges
pub(crate) fn owner_of(ranges: &[Range<usize>], row: usize) -> Option<usize> {
    let p = ranges.partition_point(|range| range.end <= row);
    ranges.get(p).filter(|range| range.contains(&row)).map(|_| p)
}

/// Who sends which equations to whom during an interface exchange
#[derive(Debug, Clone)]
pub struct ImportPlan {
    // imports[target] = [(source, rows)]
    imports: Vec<Vec<(usize, Vec<usize>)>>,
    // exports[source] = [(target, rows)]
    exports: Vec<Vec<(usize, Vec<usize>)>>,
    executed: bool,
}

impl ImportPlan {
    /// Plan the exchange of `ghosts[p]`, the rows partition `p` reads but
    /// does not own
    pub fn new(ranges: &[Range<usize>], ghosts: &[BTreeSet<usize>]) -> SolverResult<Self> {
        let n = ranges.len();
        if ghosts.len() != n {
            return Err(SolverError::Assembly(format!(
                "{} ghost sets for {n} partitions",
                ghosts.len()
            )));
        }

        let mut imports = vec![Vec::new(); n];
        let mut exports = vec![Vec::new(); n];
        for (target, rows) in ghosts.iter().enumerate() {
            let mut by_source: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for &row in rows {
                let source = owner_of(ranges, row).ok_or_else(|| {
                    SolverError::Assembly(format!("equation {row} has no owning partition"))
                })?;
                if source == target {
                    return Err(SolverError::Assembly(format!(
                        "partition {target} lists its own equation {row} as a ghost"
                    )));
                }
                by_source.entry(source).or_default().push(row);
            }
            for (source, rows) in by_source {
                exports[source].push((target, rows.clone()));
                imports[target].push((source, rows));
            }
        }

        Ok(Self {
            imports,
            exports,
            executed: false,
        })
    }

    /// `(source, rows)` pairs partition `target` receives
    pub fn imports(&self, target: usize) -> &[(usize, Vec<usize>)] {
        &self.imports[target]
    }

    /// `(target, rows)` pairs partition `source` sends
    pub fn exports(&self, source: usize) -> &[(usize, Vec<usize>)] {
        &self.exports[source]
    }

    /// Total number of values moved per exchange
    pub fn num_imported(&self) -> usize {
        self.imports
            .iter()
            .flat_map(|per_target| per_target.iter().map(|(_, rows)| rows.len()))
            .sum()
    }

    /// Insert on the first exchange, replace afterwards
    pub fn mode(&self) -> CombineMode {
        if self.executed {
            CombineMode::Replace
        } else {
            CombineMode::Insert
        }
    }

    pub(crate) fn mark_executed(&mut self) {
        self.executed = true;
    }
}
