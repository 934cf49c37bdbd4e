//! Counterexample traces.

use std::fmt::{Display, Formatter};

use crate::aig::{Aig, Node};
use crate::bitset::BitSet;

/// An input sequence driving an output to 1.
///
/// Bits are laid out as the declared initial register values followed by the
/// primary input values of frames `0..=frame`, so input `i` of frame `f` is
/// bit `num_regs + num_pis * f + i`. The register bits are only reported;
/// [`replay`][Cex::replay] starts every register of the network at 0, which
/// is how reset values are encoded there (see [`Aig::init`]).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Cex {
    pub num_regs: usize,
    pub num_pis: usize,
    /// The frame in which the output fails.
    pub frame: u32,
    /// The failing output.
    pub output: usize,
    data: BitSet,
}

impl Cex {
    /// All-zero trace for `output` failing in `frame`.
    pub fn new(num_regs: usize, num_pis: usize, frame: u32, output: usize) -> Self {
        let bits = num_regs + num_pis * (frame as usize + 1);
        Self {
            num_regs,
            num_pis,
            frame,
            output,
            data: BitSet::new(bits),
        }
    }

    pub fn num_frames(&self) -> u32 {
        self.frame + 1
    }

    fn bit(&self, frame: u32, pi: usize) -> usize {
        assert!(frame <= self.frame && pi < self.num_pis);
        self.num_regs + self.num_pis * frame as usize + pi
    }

    pub fn set_init(&mut self, reg: usize, value: bool) {
        assert!(reg < self.num_regs);
        self.data.set(reg, value);
    }

    pub fn init(&self, reg: usize) -> bool {
        self.data.contains(reg)
    }

    pub fn set_input(&mut self, frame: u32, pi: usize, value: bool) {
        let bit = self.bit(frame, pi);
        self.data.set(bit, value);
    }

    pub fn input(&self, frame: u32, pi: usize) -> bool {
        self.data.contains(self.bit(frame, pi))
    }

    /// Simulate `aig` under this trace and return the primary output values
    /// of every frame.
    pub fn replay(&self, aig: &Aig) -> Vec<Vec<bool>> {
        assert_eq!(aig.num_pis(), self.num_pis);
        assert_eq!(aig.num_regs(), self.num_regs);

        let mut outputs = Vec::with_capacity(self.num_frames() as usize);
        let mut prev: Vec<bool> = Vec::new();
        for frame in 0..self.num_frames() {
            let mut values = vec![false; aig.size()];
            for id in aig.ids() {
                let value = match *aig.node(id) {
                    Node::Const => true,
                    Node::Pi(i) => self.input(frame, i as usize),
                    Node::Lo(reg) => match aig.li(reg as usize) {
                        Some(li) if frame > 0 => prev[li as usize],
                        _ => false,
                    },
                    Node::And(a, b) => {
                        (values[a.index()] ^ a.is_complemented()) && (values[b.index()] ^ b.is_complemented())
                    }
                    Node::Po(_, d) | Node::Li(_, d) => values[d.index()] ^ d.is_complemented(),
                };
                values[id as usize] = value;
            }
            outputs.push(aig.pos().iter().map(|&po| values[po as usize]).collect());
            prev = values;
        }
        outputs
    }

    /// Whether the trace drives the failing output to 1 in the failing frame.
    pub fn verify(&self, aig: &Aig) -> bool {
        self.replay(aig)
            .last()
            .and_then(|values| values.get(self.output).copied())
            .unwrap_or(false)
    }
}

/// AIGER witness format.
impl Display for Cex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "1")?;
        writeln!(f, "b{}", self.output)?;
        for reg in 0..self.num_regs {
            write!(f, "{}", self.init(reg) as u8)?;
        }
        writeln!(f)?;
        for frame in 0..self.num_frames() {
            for pi in 0..self.num_pis {
                write!(f, "{}", self.input(frame, pi) as u8)?;
            }
            writeln!(f)?;
        }
        write!(f, ".")
    }
}
