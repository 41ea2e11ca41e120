//! Makespan activation handler
//!
//! Rows are jobs, columns are machines. Once the first `k` jobs are fixed on a
//! set of machines and those machines carry the same fixed makespan, the
//! machines are interchangeable for the remaining jobs `k..`, which makes the
//! trailing submatrix a sub-orbitope.
//!
//! Jobs are scanned in order while tracking, per machine, the total duration
//! of the jobs fixed to it, or `None` once an earlier entry of its column was
//! left free. A makespan value that a machine joins while another machine
//! already holds it becomes a candidate group; candidates of row `j` are
//! emitted at the start of row `j + 1`, unless every entry of the group in
//! that row is fixed to zero, in which case the group is deferred by one more
//! row.

use std::any::Any;
use std::collections::BTreeMap;
use tracing::debug;

use crate::bounds::{BoundOracle, SharedTransform, VarRef, VarTransform};
use crate::error::{alloc_vec, ActivationError, Result};
use crate::handler::{ActivationHandler, HandlerRegistry};
use crate::matrix::VarMatrix;
use crate::payload::{ConstraintId, Payload, PayloadMap};
use crate::submatrix::{OrbitopeKind, Submatrix, SubmatrixList};

pub const NAME: &str = "makespan";
pub const DESC: &str = "makespan activation handler";

/// Registration input; every array is copied.
#[derive(Debug, Clone, Copy)]
pub struct MakespanParams<'a> {
    /// Jobs x machines.
    pub matrix: &'a [Vec<VarRef>],
    /// Processing time of every job.
    pub job_durations: &'a [u64],
}

/// Buffers reused across detection calls; bounded by the machine count.
#[derive(Debug)]
struct MakespanScratch {
    /// Fixed makespan per machine, `None` once undetermined.
    fixed_makespan: Vec<Option<u64>>,
    /// Number of machines holding each determined makespan value.
    fixed_makespan_counts: BTreeMap<u64, usize>,
    /// Makespan values shared by >= 2 machines, in the order they qualified.
    new_group_makespans: Vec<u64>,
    /// Groups whose first row was all zero, carried to the next row.
    deferred: Vec<u64>,
    group_cols: Vec<usize>,
}

impl MakespanScratch {
    fn new(nmachines: usize) -> Result<Self> {
        Ok(Self {
            fixed_makespan: alloc_vec(nmachines, "fixed makespans")?,
            fixed_makespan_counts: BTreeMap::new(),
            new_group_makespans: alloc_vec(nmachines / 2 + 1, "new group makespans")?,
            deferred: alloc_vec(nmachines / 2 + 1, "deferred group makespans")?,
            group_cols: alloc_vec(nmachines, "group columns")?,
        })
    }

    /// Every machine starts at makespan zero.
    fn reset(&mut self, nmachines: usize) {
        self.fixed_makespan.clear();
        self.fixed_makespan.resize(nmachines, Some(0));
        self.fixed_makespan_counts.clear();
        self.fixed_makespan_counts.insert(0, nmachines);
        self.new_group_makespans.clear();
        self.deferred.clear();
        self.group_cols.clear();
    }

    fn leave(&mut self, value: u64) {
        if let Some(count) = self.fixed_makespan_counts.get_mut(&value) {
            *count -= 1;
            if *count == 0 {
                self.fixed_makespan_counts.remove(&value);
            }
        }
    }

    /// Returns the number of machines now holding `value`.
    fn join(&mut self, value: u64) -> usize {
        let count = self.fixed_makespan_counts.entry(value).or_insert(0);
        *count += 1;
        *count
    }
}

#[derive(Debug)]
pub struct MakespanPayload {
    matrix: VarMatrix,
    job_durations: Vec<u64>,
    scratch: MakespanScratch,
}

impl MakespanPayload {
    pub fn new(params: &MakespanParams<'_>) -> Result<Self> {
        if params.job_durations.len() != params.matrix.len() {
            return Err(ActivationError::InvalidParameter(format!(
                "{} job durations for {} jobs",
                params.job_durations.len(),
                params.matrix.len()
            )));
        }

        // every makespan is bounded by the total duration
        let total = params
            .job_durations
            .iter()
            .try_fold(0u64, |total, &duration| total.checked_add(duration));
        if total.is_none() {
            return Err(ActivationError::InvalidParameter(
                "total job duration overflows u64".to_string(),
            ));
        }

        let matrix = VarMatrix::from_rows(params.matrix)?;
        let mut job_durations = alloc_vec(params.job_durations.len(), "job durations")?;
        job_durations.extend_from_slice(params.job_durations);
        let scratch = MakespanScratch::new(matrix.ncols())?;

        Ok(Self {
            matrix,
            job_durations,
            scratch,
        })
    }

    pub fn njobs(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn nmachines(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn matrix(&self) -> &VarMatrix {
        &self.matrix
    }

    pub fn detect(&mut self, bounds: &dyn BoundOracle) -> SubmatrixList {
        let Self {
            matrix,
            job_durations,
            scratch,
        } = self;
        let njobs = matrix.nrows();
        let nmachines = matrix.ncols();
        let mut result = SubmatrixList::new();

        scratch.reset(nmachines);

        for j in 0..njobs {
            if !scratch.new_group_makespans.is_empty() {
                scratch.deferred.clear();

                for &value in &scratch.new_group_makespans {
                    scratch.group_cols.clear();
                    scratch.group_cols.extend(
                        (0..nmachines).filter(|&m| scratch.fixed_makespan[m] == Some(value)),
                    );
                    if scratch.group_cols.len() < 2 {
                        continue;
                    }

                    let all_fixed_zero = scratch
                        .group_cols
                        .iter()
                        .all(|&m| bounds.is_fixed_to_zero(matrix.get(j, m)));
                    if all_fixed_zero {
                        scratch.deferred.push(value);
                        continue;
                    }

                    let kind = if scratch.group_cols.len() == nmachines {
                        OrbitopeKind::Partitioning
                    } else {
                        OrbitopeKind::Packing
                    };
                    result.push(Submatrix::trailing_rows(j, njobs, scratch.group_cols.clone(), kind));
                }

                std::mem::swap(&mut scratch.new_group_makespans, &mut scratch.deferred);
            }

            let mut all_undetermined = true;

            for m in 0..nmachines {
                let Some(current) = scratch.fixed_makespan[m] else {
                    continue;
                };
                all_undetermined = false;

                let var = matrix.get(j, m);
                if bounds.is_fixed_to_one(var) {
                    scratch.leave(current);
                    let value = current + job_durations[j];
                    scratch.fixed_makespan[m] = Some(value);
                    if scratch.join(value) >= 2 && !scratch.new_group_makespans.contains(&value) {
                        scratch.new_group_makespans.push(value);
                    }
                } else if !bounds.is_fixed_to_zero(var) {
                    scratch.leave(current);
                    scratch.fixed_makespan[m] = None;
                }
            }

            // no machine can join a group any more
            if all_undetermined {
                break;
            }
        }

        result
    }
}

impl Payload for MakespanPayload {
    fn rebind(&mut self, transform: &dyn VarTransform) -> Result<()> {
        self.matrix.rebind(transform)
    }
}

#[derive(Debug, Default)]
pub struct MakespanHandler {
    payloads: PayloadMap<MakespanPayload>,
}

impl MakespanHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_cons(&mut self, cons: ConstraintId, params: &MakespanParams<'_>) -> Result<()> {
        let payload = MakespanPayload::new(params)?;
        self.payloads.register(cons, payload)
    }

    pub fn payloads(&self) -> &PayloadMap<MakespanPayload> {
        &self.payloads
    }
}

impl ActivationHandler for MakespanHandler {
    fn copy(&self) -> Option<Box<dyn ActivationHandler>> {
        Some(Box::new(MakespanHandler::new()))
    }

    fn free(&mut self) -> Result<()> {
        self.payloads.release_all();
        Ok(())
    }

    fn init(&mut self, transform: &SharedTransform) -> Result<()> {
        self.payloads.rebind_after_transform(transform)?;
        Ok(())
    }

    fn is_active(&self, cons: ConstraintId) -> bool {
        self.payloads.contains(cons)
    }

    fn find_activation_data(
        &mut self,
        cons: ConstraintId,
        bounds: &dyn BoundOracle,
    ) -> Result<SubmatrixList> {
        let Some(payload) = self.payloads.get_mut(cons) else {
            return Ok(SubmatrixList::new());
        };

        let result = payload.detect(bounds);
        if !result.is_empty() {
            debug!("Found {} makespan submatrices for {}", result.len(), cons);
        }
        Ok(result)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn include(registry: &mut HandlerRegistry) -> Result<()> {
    registry.include(NAME, DESC, Box::new(MakespanHandler::new()))
}

/// Register a scheduling constraint with the handler included in `registry`.
pub fn register_cons(
    registry: &mut HandlerRegistry,
    cons: ConstraintId,
    params: &MakespanParams<'_>,
) -> Result<()> {
    registry
        .handler_mut::<MakespanHandler>(NAME)?
        .register_cons(cons, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{Fixing, NodeFixings, VarMapping};
    use crate::matrix::sequential_rows;
    use std::sync::Arc;

    /// One string per job, one character per machine.
    fn fixings(rows: &[&str]) -> NodeFixings {
        NodeFixings::from_fixings(
            rows.iter()
                .flat_map(|row| row.chars().map(Fixing::from_char))
                .collect(),
        )
    }

    fn payload(njobs: usize, nmachines: usize, durations: &[u64]) -> MakespanPayload {
        let rows = sequential_rows(njobs, nmachines);
        MakespanPayload::new(&MakespanParams {
            matrix: &rows,
            job_durations: durations,
        })
        .unwrap()
    }

    #[test]
    fn test_nothing_fixed_is_empty() {
        let mut p = payload(3, 3, &[1, 2, 3]);
        assert!(p.detect(&NodeFixings::new(9)).is_empty());
    }

    #[test]
    fn test_two_machines_equal_makespan() {
        let mut p = payload(2, 2, &[3, 3]);
        let bounds = fixings(&["11", "??"]);

        let result = p.detect(&bounds).into_vec();
        assert_eq!(
            result,
            vec![Submatrix::new(vec![1], vec![0, 1], OrbitopeKind::Partitioning)]
        );
    }

    #[test]
    fn test_subset_of_machines_is_packing() {
        let mut p = payload(3, 3, &[2, 2, 1]);
        // machines 0 and 2 reach makespan 2 after job 1, machine 1 is undetermined
        let bounds = fixings(&["1?0", "0?1", "???"]);

        let result = p.detect(&bounds).into_vec();
        assert_eq!(
            result,
            vec![Submatrix::new(vec![2], vec![0, 2], OrbitopeKind::Packing)]
        );
    }

    #[test]
    fn test_all_zero_first_row_defers_group() {
        let mut p = payload(4, 2, &[3, 3, 5, 1]);
        let bounds = fixings(&["11", "00", "1?", "??"]);

        let result = p.detect(&bounds).into_vec();
        assert_eq!(
            result,
            vec![Submatrix::new(vec![2, 3], vec![0, 1], OrbitopeKind::Partitioning)]
        );
        // the emitted first row is not entirely fixed to zero
        assert!(!bounds.is_fixed_to_zero(VarRef(4)));
    }

    #[test]
    fn test_repeated_all_zero_rows_keep_deferring() {
        let mut p = payload(5, 2, &[3, 3, 3, 3, 3]);
        let bounds = fixings(&["11", "00", "00", "00", "??"]);

        let result = p.detect(&bounds).into_vec();
        assert_eq!(
            result,
            vec![Submatrix::new(vec![4], vec![0, 1], OrbitopeKind::Partitioning)]
        );
    }

    #[test]
    fn test_deferred_to_end_is_dropped() {
        let mut p = payload(2, 2, &[3, 3]);
        let bounds = fixings(&["11", "00"]);

        assert!(p.detect(&bounds).is_empty());
    }

    #[test]
    fn test_deferred_group_keeps_its_columns() {
        // {0, 1} tie at 3 after job 0 and are all zero in job 1, while
        // machine 2 moves to 4 without joining them
        let mut p = payload(3, 3, &[3, 4, 2]);
        let bounds = fixings(&["110", "001", "???"]);

        let result = p.detect(&bounds).into_vec();
        assert_eq!(
            result,
            vec![Submatrix::new(vec![2], vec![0, 1], OrbitopeKind::Packing)]
        );
    }

    #[test]
    fn test_emitted_group_shares_makespan_before_first_row() {
        let durations = [2, 1, 1, 3, 2];
        let mut p = payload(5, 4, &durations);
        let rows = ["1000", "0110", "0101", "0010", "????"];
        let bounds = fixings(&rows);

        let result = p.detect(&bounds).into_vec();
        assert!(!result.is_empty());
        for subm in &result {
            assert!(subm.ncols() >= 2);
            let first = subm.rows[0];
            let makespans: Vec<u64> = subm
                .cols
                .iter()
                .map(|&m| {
                    (0..first)
                        .filter(|&j| rows[j].as_bytes()[m] == b'1')
                        .map(|j| durations[j])
                        .sum()
                })
                .collect();
            assert!(makespans.windows(2).all(|w| w[0] == w[1]), "{:?}", subm);
            assert!(subm
                .cols
                .iter()
                .any(|&m| !bounds.is_fixed_to_zero(VarRef(first * 4 + m))));
        }
    }

    #[test]
    fn test_early_exit_when_all_undetermined() {
        let mut p = payload(3, 2, &[1, 1, 1]);
        // job 0 leaves both machines undetermined; later fixings are irrelevant
        let bounds = fixings(&["??", "11", "??"]);

        assert!(p.detect(&bounds).is_empty());
    }

    #[test]
    fn test_largest_total_duration_accepted() {
        let mut p = payload(3, 2, &[u64::MAX - 1, 1, 1]);
        let bounds = fixings(&["11", "11", "??"]);

        let result = p.detect(&bounds).into_vec();
        assert_eq!(
            result,
            vec![
                Submatrix::new(vec![1, 2], vec![0, 1], OrbitopeKind::Partitioning),
                Submatrix::new(vec![2], vec![0, 1], OrbitopeKind::Partitioning),
            ]
        );
    }

    #[test]
    fn test_scratch_reset_between_calls() {
        let mut p = payload(2, 2, &[3, 3]);
        let tied = fixings(&["11", "??"]);

        assert_eq!(p.detect(&tied).len(), 1);
        assert!(p.detect(&fixings(&["??", "??"])).is_empty());
        assert_eq!(p.detect(&tied).len(), 1);
    }

    #[test]
    fn test_invalid_parameters() {
        let rows = sequential_rows(2, 2);
        let err = MakespanPayload::new(&MakespanParams {
            matrix: &rows,
            job_durations: &[1],
        })
        .unwrap_err();
        assert!(matches!(err, ActivationError::InvalidParameter(_)));

        let err = MakespanPayload::new(&MakespanParams {
            matrix: &[],
            job_durations: &[],
        })
        .unwrap_err();
        assert!(matches!(err, ActivationError::InvalidParameter(_)));

        let rows = sequential_rows(3, 2);
        let err = MakespanPayload::new(&MakespanParams {
            matrix: &rows,
            job_durations: &[u64::MAX, 1, 1],
        })
        .unwrap_err();
        assert!(matches!(err, ActivationError::InvalidParameter(_)));
    }

    #[test]
    fn test_handler_roundtrip() {
        let mut registry = HandlerRegistry::new();
        include(&mut registry).unwrap();
        let rows = sequential_rows(2, 2);
        register_cons(
            &mut registry,
            ConstraintId(3),
            &MakespanParams {
                matrix: &rows,
                job_durations: &[3, 3],
            },
        )
        .unwrap();

        registry.init_all(Arc::new(VarMapping::identity(4))).unwrap();
        let handler = registry.handler::<MakespanHandler>(NAME).unwrap();
        assert!(handler.payloads().is_transformed(ConstraintId(3)));

        let result = registry
            .find_activation_data(NAME, ConstraintId(3), &fixings(&["11", "??"]))
            .unwrap();
        assert_eq!(result.len(), 1);

        registry.exit_all().unwrap();
        registry.free(NAME).unwrap();
        assert!(registry.is_empty());
    }
}
