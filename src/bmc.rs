//! The bounded model checking driver.
//!
//! [`Bmc::run`] alternates between three steps until every output has been
//! checked in frames `0..max_frames`, a counterexample is found, or a budget
//! runs out:
//!
//! 1. [`Unroller::extend`] builds the next slice of timeframes and queues
//!    one target per (frame, output) pair;
//! 2. [`Stitcher::load`] adds the new logic to the persistent SAT instance;
//! 3. every queued target is assumed in turn. Refuted targets become unit
//!    clauses, a satisfied one becomes a [`Cex`] that is replayed on the
//!    original network before it is returned.
//!
//! Before any of that, ternary simulation proves the frames in which every
//! output is constant 0, and those frames are never handed to SAT.

use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

use log::{debug, info};
use thiserror::Error;

use crate::aig::Aig;
use crate::cex::Cex;
use crate::solver::{Cadical, SatOracle, SolveResult};
use crate::stitch::Stitcher;
use crate::ternary::TernarySim;
use crate::unroll::{Target, Unroller};

#[derive(Debug, Error)]
pub enum BmcError {
    #[error("register {0} has no next-state function")]
    OpenRegister(usize),
    #[error("SAT instance became inconsistent: {0}")]
    Inconsistent(String),
    #[error("counterexample for output {output} in frame {frame} does not replay")]
    InvalidCounterexample { frame: u32, output: usize },
}

/// Engine settings. Conflict limits of 0 mean no limit.
#[derive(Debug, Clone)]
pub struct BmcParams {
    /// Frames `0..max_frames` are checked.
    pub max_frames: u32,
    /// Approximate number of nodes added to the unrolled copy per iteration.
    pub node_budget: usize,
    /// Conflicts allowed per target.
    pub conflict_limit: u64,
    /// Conflicts allowed over the whole run.
    pub global_conflict_limit: u64,
    pub timeout: Option<Duration>,
    /// First frame handed to SAT; earlier frames are neither checked nor
    /// counted as safe.
    pub start_frame: u32,
    /// Frames tried by ternary simulation.
    pub ternary_frames: u32,
    /// Values stored by ternary simulation before it gives up.
    pub ternary_cells: usize,
    /// Log one line per iteration at info level instead of debug.
    pub verbose: bool,
}

impl Default for BmcParams {
    fn default() -> Self {
        Self {
            max_frames: 100,
            node_budget: 2000,
            conflict_limit: 0,
            global_conflict_limit: 0,
            timeout: None,
            start_frame: 0,
            ternary_frames: 100,
            ternary_cells: 1 << 24,
            verbose: false,
        }
    }
}

impl BmcParams {
    pub fn with_max_frames(mut self, max_frames: u32) -> Self {
        self.max_frames = max_frames;
        self
    }
    pub fn with_node_budget(mut self, node_budget: usize) -> Self {
        self.node_budget = node_budget;
        self
    }
    pub fn with_conflict_limit(mut self, conflict_limit: u64) -> Self {
        self.conflict_limit = conflict_limit;
        self
    }
    pub fn with_global_conflict_limit(mut self, global_conflict_limit: u64) -> Self {
        self.global_conflict_limit = global_conflict_limit;
        self
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
    pub fn with_start_frame(mut self, start_frame: u32) -> Self {
        self.start_frame = start_frame;
        self
    }
    pub fn with_ternary_frames(mut self, ternary_frames: u32) -> Self {
        self.ternary_frames = ternary_frames;
        self
    }
    pub fn with_ternary_cells(mut self, ternary_cells: usize) -> Self {
        self.ternary_cells = ternary_cells;
        self
    }
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UndefReason {
    /// A single target used up its conflict limit.
    LocalConflictLimit,
    GlobalConflictLimit,
    Timeout,
}

impl Display for UndefReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UndefReason::LocalConflictLimit => write!(f, "conflict limit of a single target reached"),
            UndefReason::GlobalConflictLimit => write!(f, "global conflict limit reached"),
            UndefReason::Timeout => write!(f, "timeout reached"),
        }
    }
}

/// Result of a run.
///
/// `deepest_safe` is the largest frame `f` such that every output was proved
/// 0 in all frames `0..=f`, or `None` if frame 0 was not fully proved.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Verdict {
    Sat(Cex),
    Unsat { deepest_safe: Option<u32> },
    Undef { deepest_safe: Option<u32>, reason: UndefReason },
}

impl Verdict {
    pub fn is_sat(&self) -> bool {
        matches!(self, Verdict::Sat(_))
    }

    pub fn cex(&self) -> Option<&Cex> {
        match self {
            Verdict::Sat(cex) => Some(cex),
            _ => None,
        }
    }

    pub fn deepest_safe(&self) -> Option<u32> {
        match *self {
            Verdict::Sat(_) => None,
            Verdict::Unsat { deepest_safe } | Verdict::Undef { deepest_safe, .. } => deepest_safe,
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let safe = |d: Option<u32>| match d {
            Some(d) => format!("no output asserted in frames 0..={}", d),
            None => "no frame fully proved".to_string(),
        };
        match self {
            Verdict::Sat(cex) => write!(f, "output {} asserted in frame {}", cex.output, cex.frame),
            Verdict::Unsat { deepest_safe } => write!(f, "{}", safe(*deepest_safe)),
            Verdict::Undef { deepest_safe, reason } => write!(f, "{} ({})", safe(*deepest_safe), reason),
        }
    }
}

pub struct Bmc<'a, O: SatOracle> {
    aig: &'a Aig,
    params: BmcParams,
    oracle: O,
}

impl<'a, O: SatOracle> Bmc<'a, O> {
    pub fn new(aig: &'a Aig, params: BmcParams, oracle: O) -> Self {
        Self { aig, params, oracle }
    }

    pub fn run(&mut self) -> Result<Verdict, BmcError> {
        let aig = self.aig;
        let start = Instant::now();
        let deadline = self.params.timeout.map(|t| start + t);
        let max_frames = self.params.max_frames;
        let num_pos = aig.num_pos();

        if let Some(reg) = aig.first_open_register() {
            return Err(BmcError::OpenRegister(reg));
        }
        if num_pos == 0 {
            return Ok(Verdict::Unsat {
                deepest_safe: max_frames.checked_sub(1),
            });
        }

        let ternary_frames = self.params.ternary_frames.min(max_frames);
        let ternary = TernarySim::new(aig).safe_prefix(ternary_frames, self.params.ternary_cells);
        let proved = ternary.safe_frames.min(max_frames);
        info!("ternary simulation: {} of {} frames safe ({:?})", proved, max_frames, ternary.stop);
        let mut deepest_safe = proved.checked_sub(1);
        if proved >= max_frames {
            return Ok(Verdict::Unsat { deepest_safe });
        }

        let first_frame = proved.max(self.params.start_frame);
        let mut unroller = Unroller::new(aig, first_frame, max_frames);
        self.oracle.set_deadline(deadline);
        let mut stitcher = Stitcher::new(&mut self.oracle)?;

        let undef = |deepest_safe: Option<u32>, reason: UndefReason| -> Result<Verdict, BmcError> {
            info!("stopping: {}", reason);
            Ok(Verdict::Undef { deepest_safe, reason })
        };
        let expired = || deadline.is_some_and(|d| Instant::now() >= d);

        let mut iter = 0;
        while !unroller.is_done() {
            if expired() {
                return undef(deepest_safe, UndefReason::Timeout);
            }

            let targets = unroller.extend(self.params.node_budget);
            stitcher.load(unroller.frames(), &targets, &mut self.oracle)?;

            for target in &targets {
                let global = self.params.global_conflict_limit;
                if global > 0 && self.oracle.conflicts() >= global {
                    return undef(deepest_safe, UndefReason::GlobalConflictLimit);
                }
                if expired() {
                    return undef(deepest_safe, UndefReason::Timeout);
                }

                if !target.lit.is_zero() {
                    let Some(lit) = stitcher.lit_of(target.lit) else {
                        return Err(BmcError::Inconsistent(format!(
                            "target {}/{} has no variable",
                            target.frame, target.output
                        )));
                    };
                    match self.oracle.solve_under(lit, self.params.conflict_limit) {
                        SolveResult::Unsat => {
                            if !self.oracle.failed(lit) {
                                return Err(BmcError::Inconsistent(format!(
                                    "clauses are unsatisfiable without target {}/{}",
                                    target.frame, target.output
                                )));
                            }
                            let mut units = vec![!lit];
                            units.extend(self.oracle.drain_learned_units());
                            for unit in units {
                                if !self.oracle.add_clause(&[unit]) {
                                    return Err(BmcError::Inconsistent(format!("unit {} rejected", unit)));
                                }
                            }
                        }
                        SolveResult::Sat => {
                            let cex = self.build_cex(&unroller, &stitcher, target);
                            self.check_cex(&cex)?;
                            info!(
                                "output {} asserted in frame {} ({:.2?})",
                                target.output,
                                target.frame,
                                start.elapsed()
                            );
                            return Ok(Verdict::Sat(cex));
                        }
                        SolveResult::Undef => {
                            let reason = if expired() {
                                UndefReason::Timeout
                            } else {
                                UndefReason::LocalConflictLimit
                            };
                            return undef(deepest_safe, reason);
                        }
                    }
                }

                // The last output of a frame closes it, if no frame is missing below.
                if target.output + 1 == num_pos && deepest_safe.map_or(target.frame == 0, |d| d + 1 == target.frame)
                {
                    deepest_safe = Some(target.frame);
                }
            }

            let frames = unroller.frames();
            let line = format!(
                "{:3} : F = {:3}. O = {:3}. And = {:7}. Var = {:7}. Conf = {:7}. {:.2?}",
                iter,
                targets.last().map_or(0, |t| t.frame),
                targets.last().map_or(0, |t| t.output),
                frames.num_ands(),
                stitcher.num_vars(),
                self.oracle.conflicts(),
                start.elapsed()
            );
            if self.params.verbose {
                info!("{}", line);
            } else {
                debug!("{}", line);
            }
            iter += 1;
        }

        info!("no output asserted in {} frames ({:.2?})", max_frames, start.elapsed());
        Ok(Verdict::Unsat { deepest_safe })
    }

    /// Read the inputs of frames `0..=target.frame` from the model.
    fn build_cex(&self, unroller: &Unroller, stitcher: &Stitcher, target: &Target) -> Cex {
        let aig = self.aig;
        let mut cex = Cex::new(aig.num_regs(), aig.num_pis(), target.frame, target.output);
        for reg in 0..aig.num_regs() {
            cex.set_init(reg, aig.init(reg));
        }
        for (index, &id) in unroller.frames().pis().iter().enumerate() {
            let (pi, frame) = unroller.origin(index);
            if frame > target.frame {
                continue;
            }
            if let Some(var) = stitcher.var_of(id) {
                if self.oracle.value(var) == Some(true) {
                    cex.set_input(frame, pi as usize, true);
                }
            }
        }
        cex
    }

    /// The failing output must be 1 in the failing frame and 0 in every
    /// earlier frame from `start_frame` on.
    fn check_cex(&self, cex: &Cex) -> Result<(), BmcError> {
        let outputs = cex.replay(self.aig);
        let fires = |frame: u32| outputs[frame as usize][cex.output];
        let start = self.params.start_frame.min(cex.frame);
        let valid = fires(cex.frame) && (start..cex.frame).all(|f| !fires(f));
        if valid {
            Ok(())
        } else {
            Err(BmcError::InvalidCounterexample {
                frame: cex.frame,
                output: cex.output,
            })
        }
    }
}

/// Run the engine with a fresh CaDiCaL instance.
pub fn run(aig: &Aig, params: BmcParams) -> Result<Verdict, BmcError> {
    Bmc::new(aig, params, Cadical::new()).run()
}
