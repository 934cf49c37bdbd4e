//! Lazy timeframe expansion of a sequential network.
//!
//! The unrolled copy is an ordinary combinational [`Aig`]: one fresh input per
//! (primary input, frame) pair actually needed, and one output per queued
//! [`Target`]. Register outputs are never materialized as inputs; in frame 0
//! they are the constant 0 and in later frames they are the register input
//! of the previous frame.

use log::{debug, trace};

use crate::aig::{Aig, Node};
use crate::frames::FrameMap;
use crate::reference::Ref;

/// One output of the original network in one frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Target {
    pub frame: u32,
    pub output: usize,
    /// The output's edge in the unrolled copy.
    pub lit: Ref,
}

pub struct Unroller<'a> {
    aig: &'a Aig,
    frames: Aig,
    map: FrameMap,
    /// (primary input index, frame) of every input of the unrolled copy.
    origins: Vec<(u32, u32)>,
    /// Pairs materialized since the last compaction.
    visited: Vec<(u32, u32)>,
    frame: u32,
    output: usize,
    max_frames: u32,
}

impl<'a> Unroller<'a> {
    /// Create an unroller whose first target is output 0 of `first_frame`.
    ///
    /// Every register of `aig` must have a next-state function.
    pub fn new(aig: &'a Aig, first_frame: u32, max_frames: u32) -> Self {
        Self {
            aig,
            frames: Aig::new(),
            map: FrameMap::new(aig.size()),
            origins: Vec::new(),
            visited: Vec::new(),
            frame: first_frame,
            output: 0,
            max_frames,
        }
    }

    /// The unrolled copy built so far.
    pub fn frames(&self) -> &Aig {
        &self.frames
    }

    /// Original primary input and frame behind input `index` of the unrolled copy.
    pub fn origin(&self, index: usize) -> (u32, u32) {
        self.origins[index]
    }

    /// Whether every target below the frame limit has been queued.
    pub fn is_done(&self) -> bool {
        self.frame >= self.max_frames || self.aig.num_pos() == 0
    }

    /// Built edge of `id` in `frame`, unless it is missing or was removed by
    /// compaction.
    fn lookup(&self, id: u32, frame: u32) -> Option<Ref> {
        self.map.get(id, frame).filter(|r| self.frames.is_live(r.id()))
    }

    fn record(&mut self, id: u32, frame: u32, r: Ref) {
        self.map.set(id, frame, r);
        self.visited.push((id, frame));
    }

    /// Return the edge of `id` in `frame`, building it if needed.
    ///
    /// Entries whose node was removed by compaction are rebuilt. The cone is
    /// walked with an explicit stack, so its depth is not limited by the
    /// call stack. An AND whose first fanin is 0 never builds its second.
    pub fn materialize(&mut self, id: u32, frame: u32) -> Ref {
        let mut result = Ref::ZERO;
        let mut stack = vec![(id, frame)];
        while let Some(&(id, frame)) = stack.last() {
            if let Some(r) = self.lookup(id, frame) {
                stack.pop();
                result = r;
                continue;
            }

            // Dependency that has to be built first.
            let node = *self.aig.node(id);
            let (dep_id, dep_frame) = match node {
                Node::Const => {
                    self.record(id, frame, Ref::ONE);
                    continue;
                }
                Node::Pi(i) => {
                    let r = self.frames.add_input();
                    self.origins.push((i, frame));
                    self.record(id, frame, r);
                    continue;
                }
                Node::Lo(_) if frame == 0 => {
                    self.record(id, frame, Ref::ZERO);
                    continue;
                }
                Node::Lo(reg) => {
                    let Some(li) = self.aig.li(reg as usize) else {
                        panic!("Register {} has no next state", reg);
                    };
                    match self.lookup(li, frame - 1) {
                        Some(r) => {
                            self.record(id, frame, r);
                            continue;
                        }
                        None => (li, frame - 1),
                    }
                }
                Node::Po(_, d) | Node::Li(_, d) => match self.lookup(d.id(), frame) {
                    Some(r) => {
                        self.record(id, frame, r.not_if(d.is_complemented()));
                        continue;
                    }
                    None => (d.id(), frame),
                },
                Node::And(a, b) => match self.lookup(a.id(), frame) {
                    None => (a.id(), frame),
                    Some(x) => {
                        let x = x.not_if(a.is_complemented());
                        if x.is_zero() {
                            self.record(id, frame, Ref::ZERO);
                            continue;
                        }
                        match self.lookup(b.id(), frame) {
                            Some(y) => {
                                let r = self.frames.and(x, y.not_if(b.is_complemented()));
                                self.record(id, frame, r);
                                continue;
                            }
                            None => (b.id(), frame),
                        }
                    }
                },
            };
            stack.push((dep_id, dep_frame));
        }
        result
    }

    /// Queue targets in (frame, output) order until the unrolled copy has
    /// grown by `node_budget` nodes or the frame limit is reached.
    ///
    /// At least one target is queued per call unless [`is_done`][Self::is_done].
    pub fn extend(&mut self, node_budget: usize) -> Vec<Target> {
        let start = self.frames.num_nodes();
        let mut batch = Vec::new();

        while !self.is_done() {
            if !batch.is_empty() && self.frames.num_nodes() - start >= node_budget {
                break;
            }

            let po = self.aig.po(self.output);
            let lit = self.materialize(po, self.frame);
            self.frames.add_output(lit);
            trace!("target {}/{} -> {}", self.frame, self.output, lit);
            batch.push(Target {
                frame: self.frame,
                output: self.output,
                lit,
            });

            self.frames.compact();
            self.forget_stale();

            self.output += 1;
            if self.output == self.aig.num_pos() {
                self.output = 0;
                self.frame += 1;
            }
        }

        debug!(
            "extend: {} targets, unrolled copy has {} nodes ({} ands), map has {} entries over {} frames",
            batch.len(),
            self.frames.num_nodes(),
            self.frames.num_ands(),
            self.map.num_entries(),
            self.map.num_frames()
        );
        batch
    }

    /// Clear map entries of this round's pairs whose node was removed.
    fn forget_stale(&mut self) {
        for &(id, frame) in &self.visited {
            if let Some(r) = self.map.get(id, frame) {
                if !self.frames.is_live(r.id()) {
                    self.map.clear(id, frame);
                }
            }
        }
        self.visited.clear();
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn shift_register() -> Aig {
        let mut aig = Aig::new();
        let x = aig.add_input();
        let r1 = aig.add_register();
        let r2 = aig.add_register();
        let r3 = aig.add_register();
        aig.set_next(r1, x);
        aig.set_next(r2, r1);
        aig.set_next(r3, r2);
        aig.add_output(r3);
        aig
    }

    #[test]
    fn test_initial_state_is_zero() {
        let aig = shift_register();
        let mut unroller = Unroller::new(&aig, 0, 10);
        for frame in 0..3 {
            assert_eq!(unroller.materialize(aig.po(0), frame), Ref::ZERO);
        }
        assert_eq!(unroller.frames().num_pis(), 0);
    }

    #[test]
    fn test_register_reads_previous_frame() {
        let aig = shift_register();
        let mut unroller = Unroller::new(&aig, 0, 10);
        let out = unroller.materialize(aig.po(0), 3);
        let input = unroller.materialize(aig.pi(0), 0);
        assert_eq!(out, input);
        assert_eq!(unroller.origin(0), (0, 0));
        // Memoized: no second input for the same pair.
        unroller.materialize(aig.po(0), 3);
        assert_eq!(unroller.frames().num_pis(), 1);
    }

    #[test]
    fn test_zero_fanin_skips_second() {
        let mut aig = Aig::new();
        let x = aig.add_input();
        let r = aig.add_register();
        aig.set_next(r, x);
        let f = aig.and(r, x);
        aig.add_output(f);

        let mut unroller = Unroller::new(&aig, 0, 10);
        // In frame 0 the register is 0, so `x` of frame 0 is never built.
        assert_eq!(unroller.materialize(aig.po(0), 0), Ref::ZERO);
        assert_eq!(unroller.frames().num_pis(), 0);
    }

    #[test]
    fn test_extend_queues_in_order() {
        let mut aig = Aig::new();
        let x = aig.add_input();
        let y = aig.add_input();
        let r = aig.add_register();
        let n = aig.xor(x, r);
        aig.set_next(r, n);
        aig.add_output(r);
        let g = aig.and(y, r);
        aig.add_output(g);

        let mut unroller = Unroller::new(&aig, 1, 3);
        let batch = unroller.extend(usize::MAX);
        let order: Vec<_> = batch.iter().map(|t| (t.frame, t.output)).collect();
        assert_eq!(order, vec![(1, 0), (1, 1), (2, 0), (2, 1)]);
        assert!(unroller.is_done());
        assert!(unroller.extend(usize::MAX).is_empty());
        assert_eq!(unroller.frames().num_pos(), 4);
    }

    #[test]
    fn test_extend_respects_budget() {
        let mut aig = Aig::new();
        let x = aig.add_input();
        let r = aig.add_register();
        let n = aig.xor(x, r);
        aig.set_next(r, n);
        aig.add_output(r);

        let mut unroller = Unroller::new(&aig, 0, 100);
        let first = unroller.extend(0);
        assert_eq!(first.len(), 1);
        let second = unroller.extend(0);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].frame, 1);
        assert_eq!(unroller.frame, 2);
    }

    #[test]
    fn test_deep_cone() {
        // A long AND chain over one input and one register.
        let depth = 200_000;
        let mut aig = Aig::new();
        let x = aig.add_input();
        let r = aig.add_register();
        aig.set_next(r, x);
        let mut chain = r;
        for i in 0..depth {
            let y = aig.add_input();
            chain = if i % 2 == 0 { aig.and(chain, y) } else { aig.and(y, chain) };
        }
        aig.add_output(chain);
        assert_eq!(aig.num_ands(), depth);

        let mut unroller = Unroller::new(&aig, 0, 2);
        // Register is 0 in frame 0, so the whole chain folds to 0.
        let first = unroller.extend(usize::MAX);
        assert_eq!(first[0].lit, Ref::ZERO);
        assert_eq!(first[1].frame, 1);
        assert!(!first[1].lit.is_const());
        assert_eq!(unroller.frames().num_ands(), depth);
    }

    #[test]
    fn test_stale_entries_are_rebuilt() {
        let mut aig = Aig::new();
        let x = aig.add_input();
        let y = aig.add_input();
        let f = aig.and(x, y);
        aig.add_output(f);

        let mut unroller = Unroller::new(&aig, 0, 1);
        let first = unroller.materialize(f.id(), 0);
        // Not an output of the copy yet, so compaction removes it.
        assert_eq!(unroller.frames.compact(), 1);
        assert!(!unroller.frames().is_live(first.id()));
        let again = unroller.materialize(f.id(), 0);
        assert!(unroller.frames().is_live(again.id()));
        assert_ne!(again.id(), first.id());
    }
}
