//! Ternary (0/1/X) simulation over timeframes.
//!
//! Primary inputs are X in every frame and registers start at 0, so any
//! output that simulates to 0 in some frame is 0 under every input sequence
//! in that frame. The leading frames in which all outputs are 0 need no SAT
//! query at all.

use std::fmt::{Display, Formatter};
use std::ops::Not;

use log::debug;

use crate::aig::{Aig, Node};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Ternary {
    Zero,
    One,
    X,
}

impl Ternary {
    pub fn and(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::Zero, _) | (_, Ternary::Zero) => Ternary::Zero,
            (Ternary::One, Ternary::One) => Ternary::One,
            _ => Ternary::X,
        }
    }

    /// Apply an edge polarity.
    pub fn not_if(self, cond: bool) -> Ternary {
        if cond {
            !self
        } else {
            self
        }
    }
}

impl Not for Ternary {
    type Output = Ternary;

    fn not(self) -> Self::Output {
        match self {
            Ternary::Zero => Ternary::One,
            Ternary::One => Ternary::Zero,
            Ternary::X => Ternary::X,
        }
    }
}

impl Display for Ternary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ternary::Zero => write!(f, "0"),
            Ternary::One => write!(f, "1"),
            Ternary::X => write!(f, "x"),
        }
    }
}

/// Why ternary simulation stopped.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TernaryStop {
    /// Some output is not 0 in frame `safe_frames`; SAT has to take over there.
    Escalate,
    /// The register state repeated, so every later frame looks the same.
    Fixpoint,
    /// The frame budget was used up.
    FrameLimit,
    /// The memory budget was used up.
    MemoryLimit,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TernaryOutcome {
    /// Frames `0..safe_frames` have every output at 0.
    pub safe_frames: u32,
    pub stop: TernaryStop,
}

/// Memoized ternary values, one row per frame.
pub struct TernarySim<'a> {
    aig: &'a Aig,
    rows: Vec<Vec<Ternary>>,
}

impl<'a> TernarySim<'a> {
    pub fn new(aig: &'a Aig) -> Self {
        Self {
            aig,
            rows: Vec::new(),
        }
    }

    /// Value of node `id` in `frame`, simulating up to that frame if needed.
    pub fn value(&mut self, id: u32, frame: u32) -> Ternary {
        while self.rows.len() <= frame as usize {
            self.step();
        }
        self.rows[frame as usize][id as usize]
    }

    /// Value of primary output `index` in `frame`.
    pub fn output(&mut self, index: usize, frame: u32) -> Ternary {
        self.value(self.aig.po(index), frame)
    }

    /// Simulate one more frame.
    fn step(&mut self) {
        let aig = self.aig;
        let prev = self.rows.last();
        let mut row = vec![Ternary::X; aig.size()];
        for id in aig.ids() {
            let value = match *aig.node(id) {
                Node::Const => Ternary::One,
                Node::Pi(_) => Ternary::X,
                Node::Lo(reg) => match (prev, aig.li(reg as usize)) {
                    (Some(prev), Some(li)) => prev[li as usize],
                    (Some(_), None) => Ternary::X,
                    (None, _) => Ternary::Zero,
                },
                Node::And(a, b) => {
                    let va = row[a.index()].not_if(a.is_complemented());
                    let vb = row[b.index()].not_if(b.is_complemented());
                    va.and(vb)
                }
                Node::Po(_, d) | Node::Li(_, d) => row[d.index()].not_if(d.is_complemented()),
            };
            row[id as usize] = value;
        }
        self.rows.push(row);
    }

    fn register_state(&self, frame: usize) -> Vec<Ternary> {
        (0..self.aig.num_regs())
            .map(|reg| self.rows[frame][self.aig.lo(reg) as usize])
            .collect()
    }

    /// Find how many leading frames have every output at 0.
    ///
    /// Stops at the first frame with a non-0 output, once the register state
    /// repeats, after `max_frames` frames, or before storing more than
    /// `max_cells` values.
    pub fn safe_prefix(&mut self, max_frames: u32, max_cells: usize) -> TernaryOutcome {
        let width = self.aig.size().max(1);
        let mut seen = Vec::new();
        for frame in 0..max_frames {
            if (frame as usize + 1) * width > max_cells {
                debug!("ternary: memory budget reached at frame {}", frame);
                return TernaryOutcome {
                    safe_frames: frame,
                    stop: TernaryStop::MemoryLimit,
                };
            }
            let fires = (0..self.aig.num_pos()).any(|i| self.output(i, frame) != Ternary::Zero);
            if fires {
                debug!("ternary: output may fire in frame {}", frame);
                return TernaryOutcome {
                    safe_frames: frame,
                    stop: TernaryStop::Escalate,
                };
            }
            let state = self.register_state(frame as usize);
            if seen.contains(&state) {
                debug!("ternary: state repeats in frame {}", frame);
                return TernaryOutcome {
                    safe_frames: max_frames,
                    stop: TernaryStop::Fixpoint,
                };
            }
            seen.push(state);
        }
        TernaryOutcome {
            safe_frames: max_frames,
            stop: TernaryStop::FrameLimit,
        }
    }
}
