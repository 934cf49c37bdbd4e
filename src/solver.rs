//! Incremental SAT oracle interface and its CaDiCaL implementation.

use std::time::Instant;

use log::{trace, warn};

use crate::types::{Lit, Var};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SolveResult {
    Sat,
    Unsat,
    /// The call gave up: budget exhausted or deadline reached.
    Undef,
}

/// What the engine needs from an incremental SAT solver.
///
/// Clauses are only ever added, never removed. A solve call is made under a
/// single assumption literal, which is dropped again once the call returns.
pub trait SatOracle {
    /// Make variables `1..=num_vars` available.
    fn reserve_vars(&mut self, num_vars: u32);

    /// Add a clause. Returns `false` if the instance became trivially
    /// unsatisfiable.
    fn add_clause(&mut self, clause: &[Lit]) -> bool;

    /// Solve under `assumption`, giving up after about `conflict_budget`
    /// conflicts (0 means no limit).
    fn solve_under(&mut self, assumption: Lit, conflict_budget: u64) -> SolveResult;

    /// Model value of `var` after a [`SolveResult::Sat`] answer.
    fn value(&self, var: Var) -> Option<bool>;

    /// Whether `assumption` took part in the refutation after a
    /// [`SolveResult::Unsat`] answer. `false` means the clauses alone are
    /// unsatisfiable.
    fn failed(&self, assumption: Lit) -> bool;

    /// Unit clauses learned since the previous call.
    fn drain_learned_units(&mut self) -> Vec<Lit>;

    /// Make running and future solve calls give up at `deadline`.
    fn set_deadline(&mut self, deadline: Option<Instant>);

    /// Conflicts spent over the lifetime of the oracle.
    fn conflicts(&mut self) -> u64;
}

/// Solver callbacks: deadline polling and learned clause bookkeeping.
#[derive(Debug, Default)]
pub struct Monitor {
    deadline: Option<Instant>,
    learned: u64,
    units: Vec<Lit>,
}

impl cadical::Callbacks for Monitor {
    fn terminate(&mut self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn max_length(&self) -> i32 {
        i32::MAX
    }

    fn learn(&mut self, clause: &[i32]) {
        // Every conflict learns exactly one clause.
        self.learned += 1;
        if let [lit] = clause {
            self.units.push(Lit::from_dimacs(*lit));
        }
    }
}

pub struct Cadical {
    solver: cadical::Solver<Monitor>,
    num_vars: u32,
    inconsistent: bool,
}

impl Cadical {
    pub fn new() -> Self {
        let mut solver = cadical::Solver::new();
        solver.set_callbacks(Some(Monitor::default()));
        Self {
            solver,
            num_vars: 0,
            inconsistent: false,
        }
    }

    fn monitor(&mut self) -> &mut Monitor {
        match self.solver.get_callbacks() {
            Some(monitor) => monitor,
            None => unreachable!("callbacks are installed in Cadical::new"),
        }
    }
}

impl Default for Cadical {
    fn default() -> Self {
        Self::new()
    }
}

impl SatOracle for Cadical {
    fn reserve_vars(&mut self, num_vars: u32) {
        self.num_vars = self.num_vars.max(num_vars);
    }

    fn add_clause(&mut self, clause: &[Lit]) -> bool {
        if clause.is_empty() {
            self.inconsistent = true;
        }
        self.solver.add_clause(clause.iter().map(|lit| lit.to_dimacs()));
        !self.inconsistent
    }

    fn solve_under(&mut self, assumption: Lit, conflict_budget: u64) -> SolveResult {
        if conflict_budget > 0 {
            let limit = conflict_budget.min(i32::MAX as u64) as i32;
            if let Err(e) = self.solver.set_limit("conflicts", limit) {
                warn!("could not set conflict limit: {:?}", e);
            }
        }
        let result = match self.solver.solve_with([assumption.to_dimacs()]) {
            Some(true) => SolveResult::Sat,
            Some(false) => SolveResult::Unsat,
            None => SolveResult::Undef,
        };
        trace!("solve under {} -> {:?}", assumption, result);
        result
    }

    fn value(&self, var: Var) -> Option<bool> {
        let id = var.id() as i32;
        if id > self.solver.max_variable() {
            return None;
        }
        self.solver.value(id)
    }

    fn failed(&self, assumption: Lit) -> bool {
        self.solver.failed(assumption.to_dimacs())
    }

    fn drain_learned_units(&mut self) -> Vec<Lit> {
        std::mem::take(&mut self.monitor().units)
    }

    fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.monitor().deadline = deadline;
    }

    fn conflicts(&mut self) -> u64 {
        self.monitor().learned
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn lit(v: i32) -> Lit {
        Lit::from_dimacs(v)
    }

    #[test]
    fn test_solve_under_assumption() {
        let mut s = Cadical::new();
        s.reserve_vars(2);
        assert!(s.add_clause(&[lit(1), lit(2)]));
        assert!(s.add_clause(&[lit(-1), lit(2)]));

        assert_eq!(s.solve_under(lit(2), 0), SolveResult::Sat);
        assert_eq!(s.value(Var::new(2)), Some(true));
        assert_eq!(s.solve_under(lit(-2), 0), SolveResult::Unsat);
        // The assumption is gone after the call.
        assert_eq!(s.solve_under(lit(1), 0), SolveResult::Sat);
    }

    #[test]
    fn test_empty_clause() {
        let mut s = Cadical::new();
        assert!(!s.add_clause(&[]));
        assert!(!s.add_clause(&[lit(1)]));
    }

    #[test]
    fn test_failed_assumption() {
        let mut s = Cadical::new();
        s.reserve_vars(2);
        s.add_clause(&[lit(-1), lit(-2)]);
        s.add_clause(&[lit(1)]);
        assert_eq!(s.solve_under(lit(2), 0), SolveResult::Unsat);
        assert!(s.failed(lit(2)));
    }

    #[test]
    fn test_contradictory_units_are_not_blamed_on_assumption() {
        let mut s = Cadical::new();
        s.reserve_vars(2);
        // Both accepted: the contradiction only shows up when solving.
        assert!(s.add_clause(&[lit(1)]));
        assert!(s.add_clause(&[lit(-1)]));
        assert_eq!(s.solve_under(lit(2), 0), SolveResult::Unsat);
        assert!(!s.failed(lit(2)));
    }

    #[test]
    fn test_unknown_variable_has_no_value() {
        let mut s = Cadical::new();
        s.add_clause(&[lit(1)]);
        assert_eq!(s.solve_under(lit(1), 0), SolveResult::Sat);
        assert_eq!(s.value(Var::new(7)), None);
    }

    #[test]
    fn test_expired_deadline() {
        let mut s = Cadical::new();
        // Pigeonhole 4 into 3: needs search, so the deadline is polled.
        let p = |i: i32, j: i32| i * 3 + j + 1;
        for i in 0..4 {
            s.add_clause(&[lit(p(i, 0)), lit(p(i, 1)), lit(p(i, 2))]);
        }
        for j in 0..3 {
            for a in 0..4 {
                for b in a + 1..4 {
                    s.add_clause(&[lit(-p(a, j)), lit(-p(b, j))]);
                }
            }
        }
        s.set_deadline(Some(Instant::now()));
        assert_ne!(s.solve_under(lit(1), 0), SolveResult::Sat);
        s.set_deadline(None);
        assert_eq!(s.solve_under(lit(1), 0), SolveResult::Unsat);
    }
}
