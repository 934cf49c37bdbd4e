//! Incremental loading of the unrolled copy into a SAT oracle.
//!
//! Each increment is cut out of the unrolled copy as a small combinational
//! fragment, encoded on its own with [`Cnf::derive`], shifted past the
//! variables already in use and tied to them with equivalence clauses.

use log::debug;

use crate::aig::{Aig, Node};
use crate::bitset::BitSet;
use crate::bmc::BmcError;
use crate::cnf::Cnf;
use crate::reference::Ref;
use crate::solver::SatOracle;
use crate::types::{Lit, Var};
use crate::unroll::Target;

/// SAT variables of the nodes of the unrolled copy.
#[derive(Debug)]
pub struct Stitcher {
    /// Variable per node id, 0 for none.
    obj2var: Vec<u32>,
    num_vars: u32,
}

impl Stitcher {
    /// Give the constant node variable 1 and assert it.
    pub fn new<O: SatOracle>(oracle: &mut O) -> Result<Self, BmcError> {
        oracle.reserve_vars(1);
        let one = Var::new(1);
        if !oracle.add_clause(&[one.pos()]) {
            return Err(BmcError::Inconsistent("constant unit clause rejected".to_string()));
        }
        Ok(Self {
            obj2var: vec![0, one.id()],
            num_vars: 1,
        })
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    pub fn var_of(&self, id: u32) -> Option<Var> {
        match self.obj2var.get(id as usize) {
            Some(&v) if v != 0 => Some(Var::new(v)),
            _ => None,
        }
    }

    /// SAT literal of an edge of the unrolled copy, if its node is loaded.
    pub fn lit_of(&self, r: Ref) -> Option<Lit> {
        self.var_of(r.id()).map(|v| v.lit(r.is_complemented()))
    }

    /// Nodes that are cut out as fragment inputs.
    fn is_interface(&self, frames: &Aig, id: u32) -> bool {
        self.var_of(id).is_some() || frames.is_pi(id)
    }

    /// Load the cones of `targets` that are not in the oracle yet.
    ///
    /// Afterwards every target has a literal in [`lit_of`][Self::lit_of].
    pub fn load<O: SatOracle>(&mut self, frames: &Aig, targets: &[Target], oracle: &mut O) -> Result<(), BmcError> {
        if self.obj2var.len() < frames.size() {
            self.obj2var.resize(frames.size(), 0);
        }

        // Collect the new logic, stopping at interface nodes.
        let mut seen = BitSet::new(frames.size());
        let mut cone = Vec::new();
        let mut stack: Vec<u32> = targets.iter().map(|t| t.lit.id()).collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id as usize) {
                continue;
            }
            cone.push(id);
            if self.is_interface(frames, id) {
                continue;
            }
            if let Node::And(a, b) = *frames.node(id) {
                stack.push(a.id());
                stack.push(b.id());
            }
        }
        cone.sort_unstable();

        // Copy it into a fragment, in topological order.
        let mut fragment = Aig::new();
        let mut copy = vec![None; frames.size()];
        for &id in &cone {
            let r = if id == Ref::ONE.id() {
                Ref::ONE
            } else if self.is_interface(frames, id) {
                fragment.add_input()
            } else {
                match *frames.node(id) {
                    Node::And(a, b) => {
                        let x = copy_of(&copy, a);
                        let y = copy_of(&copy, b);
                        fragment.and(x, y)
                    }
                    ref node => panic!("Node {} ({:?}) cannot be part of a cone", id, node),
                }
            };
            copy[id as usize] = Some(r);
        }
        for t in targets {
            fragment.add_output(copy_of(&copy, t.lit));
        }

        let mut cnf = Cnf::derive(&fragment, fragment.num_pos());
        cnf.lift(self.num_vars);
        let mut total = self.num_vars + cnf.num_vars();

        // Bridge or adopt.
        let mut bridges: Vec<[Lit; 2]> = Vec::new();
        let mut adopted = BitSet::new(total as usize + 1);
        for &id in &cone {
            if id == Ref::ONE.id() {
                continue;
            }
            let Some(r) = copy[id as usize] else { continue };
            let Some(new) = cnf.lit_of(r) else { continue };
            let old = match self.var_of(id) {
                Some(old) => old,
                None if new.is_positive() && adopted.insert(new.var().id() as usize) => {
                    self.obj2var[id as usize] = new.var().id();
                    continue;
                }
                None => {
                    total += 1;
                    self.obj2var[id as usize] = total;
                    Var::new(total)
                }
            };
            bridges.push([old.pos(), !new]);
            bridges.push([old.neg(), new]);
        }

        oracle.reserve_vars(total);
        for clause in &bridges {
            if !oracle.add_clause(clause) {
                return Err(BmcError::Inconsistent(format!("bridge clause {} {} rejected", clause[0], clause[1])));
            }
        }
        for clause in cnf.clauses() {
            if !oracle.add_clause(clause) {
                return Err(BmcError::Inconsistent("fragment clause rejected".to_string()));
            }
        }

        debug!(
            "stitch: {} nodes, {} vars (+{}), {} clauses, {} bridges",
            cone.len(),
            total,
            total - self.num_vars,
            cnf.clauses().len(),
            bridges.len()
        );
        self.num_vars = total;
        Ok(())
    }
}

fn copy_of(copy: &[Option<Ref>], r: Ref) -> Ref {
    match copy[r.index()] {
        Some(c) => c.not_if(r.is_complemented()),
        None => panic!("Fanin {} was not copied", r),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::solver::{Cadical, SolveResult};

    fn target(lit: Ref) -> Target {
        Target { frame: 0, output: 0, lit }
    }

    #[test]
    fn test_constant_is_true() {
        let mut oracle = Cadical::new();
        let stitcher = Stitcher::new(&mut oracle).unwrap();
        assert_eq!(stitcher.num_vars(), 1);
        let one = stitcher.lit_of(Ref::ONE).unwrap();
        assert_eq!(oracle.solve_under(one, 0), SolveResult::Sat);
        assert_eq!(oracle.solve_under(!one, 0), SolveResult::Unsat);
    }

    #[test]
    fn test_increments_share_logic() {
        let mut frames = Aig::new();
        let a = frames.add_input();
        let b = frames.add_input();
        let c = frames.add_input();
        let ab = frames.and(a, b);
        let t1 = frames.and(ab, !c);

        let mut oracle = Cadical::new();
        let mut stitcher = Stitcher::new(&mut oracle).unwrap();
        stitcher.load(&frames, &[target(t1)], &mut oracle).unwrap();
        let l1 = stitcher.lit_of(t1).unwrap();
        assert_eq!(oracle.solve_under(l1, 0), SolveResult::Sat);
        let va = stitcher.lit_of(a).unwrap();
        assert_eq!(oracle.value(va.var()), Some(true));

        // The second increment reuses `ab` through a bridge.
        let before = stitcher.var_of(ab.id());
        let t2 = frames.and(ab, c);
        stitcher.load(&frames, &[target(t2)], &mut oracle).unwrap();
        let l2 = stitcher.lit_of(t2).unwrap();
        assert_eq!(stitcher.var_of(ab.id()), before);
        assert!(oracle.add_clause(&[!l1]));
        assert_eq!(oracle.solve_under(l2, 0), SolveResult::Sat);
        assert!(oracle.add_clause(&[!l2]));
        // t1 and t2 both false forces ab false.
        let lab = stitcher.lit_of(ab).unwrap();
        assert_eq!(oracle.solve_under(lab, 0), SolveResult::Unsat);
    }

    #[test]
    fn test_constant_target() {
        let frames = Aig::new();
        let mut oracle = Cadical::new();
        let mut stitcher = Stitcher::new(&mut oracle).unwrap();
        stitcher.load(&frames, &[target(Ref::ZERO)], &mut oracle).unwrap();
        let l = stitcher.lit_of(Ref::ZERO).unwrap();
        assert_eq!(oracle.solve_under(l, 0), SolveResult::Unsat);
    }
}
