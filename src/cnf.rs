//! Tseitin encoding of a combinational [`Aig`].

use std::fmt::{Display, Formatter};

use crate::aig::{Aig, Node};
use crate::bitset::BitSet;
use crate::reference::Ref;
use crate::types::{Lit, Var};

/// Clauses for the logic in the fanin cones of some outputs of a network.
#[derive(Debug, Clone)]
pub struct Cnf {
    num_vars: u32,
    clauses: Vec<Vec<Lit>>,
    /// Variable per node id, 0 for nodes without one.
    var_nums: Vec<u32>,
}

impl Cnf {
    /// Encode the cones of outputs `0..num_roots` of a combinational network.
    ///
    /// The constant node always gets variable 1 and a unit clause. Inputs,
    /// AND nodes and the root outputs inside the cones get the following
    /// variables in id order. Every AND contributes three clauses and every
    /// root output two.
    pub fn derive(aig: &Aig, num_roots: usize) -> Self {
        assert!(num_roots <= aig.num_pos());

        let mut reachable = BitSet::new(aig.size());
        let mut stack: Vec<u32> = aig.pos()[..num_roots].to_vec();
        while let Some(id) = stack.pop() {
            if !reachable.insert(id as usize) {
                continue;
            }
            match *aig.node(id) {
                Node::And(a, b) => {
                    stack.push(a.id());
                    stack.push(b.id());
                }
                Node::Po(_, d) | Node::Li(_, d) => stack.push(d.id()),
                _ => {}
            }
        }
        reachable.insert(Ref::ONE.index());

        let mut var_nums = vec![0; aig.size()];
        let mut num_vars = 0;
        for id in reachable.iter() {
            num_vars += 1;
            var_nums[id] = num_vars;
        }

        let mut cnf = Self {
            num_vars,
            clauses: Vec::new(),
            var_nums,
        };
        cnf.clauses.push(vec![Var::new(cnf.var_nums[1]).pos()]);
        for id in reachable.iter() {
            let id = id as u32;
            let v = Var::new(cnf.var_nums[id as usize]);
            match *aig.node(id) {
                Node::And(a, b) => {
                    let a = cnf.lit(a);
                    let b = cnf.lit(b);
                    cnf.clauses.push(vec![v.neg(), a]);
                    cnf.clauses.push(vec![v.neg(), b]);
                    cnf.clauses.push(vec![v.pos(), -a, -b]);
                }
                Node::Po(_, d) | Node::Li(_, d) => {
                    let d = cnf.lit(d);
                    cnf.clauses.push(vec![v.neg(), d]);
                    cnf.clauses.push(vec![v.pos(), -d]);
                }
                _ => {}
            }
        }
        cnf
    }

    fn lit(&self, r: Ref) -> Lit {
        Lit::new(Var::new(self.var_nums[r.index()]), r.is_complemented())
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    pub fn clauses(&self) -> &[Vec<Lit>] {
        &self.clauses
    }

    /// Variable of node `id`, if it is inside the encoded cones.
    pub fn var_of(&self, id: u32) -> Option<Var> {
        match self.var_nums.get(id as usize) {
            Some(&v) if v != 0 => Some(Var::new(v)),
            _ => None,
        }
    }

    /// Literal of an edge, if its node is inside the encoded cones.
    pub fn lit_of(&self, r: Ref) -> Option<Lit> {
        self.var_of(r.id()).map(|v| v.lit(r.is_complemented()))
    }

    /// Shift every variable up by `delta`.
    pub fn lift(&mut self, delta: u32) {
        for v in self.var_nums.iter_mut().filter(|v| **v != 0) {
            *v += delta;
        }
        for clause in &mut self.clauses {
            for lit in clause.iter_mut() {
                *lit = lit.lift(delta);
            }
        }
    }
}

impl Display for Cnf {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let max_var = self.var_nums.iter().copied().max().unwrap_or(0);
        writeln!(f, "p cnf {} {}", max_var, self.clauses.len())?;
        for clause in &self.clauses {
            for lit in clause {
                write!(f, "{} ", lit.to_dimacs())?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}
