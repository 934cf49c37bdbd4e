//! Sequential And-Inverter Graph.
//!
//! Every node lives in a [`Table`], so two-input AND nodes are structurally
//! hashed: building the same AND twice returns the same node. Edges carry
//! their polarity in a [`Ref`].
//!
//! Combinational inputs are primary inputs (PIs) and register outputs (LOs);
//! combinational outputs are primary outputs (POs) and register inputs (LIs).
//! A register's LO holds the value its LI had one clock cycle earlier, and is
//! zero in the initial state.
//!
//! Node ids are issued in increasing order and a node is only ever created
//! after its fanins, so iterating ids upwards is a topological traversal.
//! Register feedback does not break this: an LI is an output node created
//! after its driver, and the LO it feeds is an input node.

use std::fmt::{Debug, Formatter};

use log::debug;

use crate::bitset::BitSet;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Node {
    /// The constant-one node. Always has id 1.
    #[default]
    Const,
    /// Primary input with its index.
    Pi(u32),
    /// Register output with its register index.
    Lo(u32),
    /// Two-input AND, fanins in canonical order.
    And(Ref, Ref),
    /// Primary output with its index and driver.
    Po(u32, Ref),
    /// Register input with its register index and driver.
    Li(u32, Ref),
}

fn edge_key(r: Ref) -> u64 {
    ((r.id() as u64) << 1) | r.is_complemented() as u64
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        match *self {
            Node::And(a, b) => pairing3(3, edge_key(a), edge_key(b)),
            Node::Const => 0,
            Node::Pi(i) => pairing3(1, i as u64, 0),
            Node::Lo(i) => pairing3(2, i as u64, 0),
            Node::Po(i, d) => pairing3(4, i as u64, edge_key(d)),
            Node::Li(i, d) => pairing3(5, i as u64, edge_key(d)),
        }
    }
}

pub struct Aig {
    nodes: Table<Node>,
    pis: Vec<u32>,
    los: Vec<u32>,
    pos: Vec<u32>,
    /// Register input node per register, 0 while unset.
    lis: Vec<u32>,
    /// Declared reset value per register. The simulated register always
    /// starts at 0; a reset-1 register is stored complemented.
    inits: Vec<bool>,
}

impl Aig {
    pub fn new() -> Self {
        Self::with_bits(12)
    }

    /// Create a network whose unique table starts with `2^bits` buckets.
    pub fn with_bits(bits: usize) -> Self {
        let mut nodes = Table::new(bits);
        let one = nodes.add(Node::Const);
        assert_eq!(one, 1); // Make sure the constant node is (1).
        Self {
            nodes,
            pis: Vec::new(),
            los: Vec::new(),
            pos: Vec::new(),
            lis: Vec::new(),
            inits: Vec::new(),
        }
    }
}

impl Default for Aig {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Aig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aig")
            .field("pis", &self.num_pis())
            .field("pos", &self.num_pos())
            .field("regs", &self.num_regs())
            .field("ands", &self.num_ands())
            .field("size", &self.size())
            .finish()
    }
}

// Construction
impl Aig {
    /// Add a primary input.
    pub fn add_input(&mut self) -> Ref {
        let index = self.pis.len() as u32;
        let id = self.nodes.add(Node::Pi(index)) as u32;
        self.pis.push(id);
        Ref::positive(id)
    }

    /// Add a register and return its output. The next-state function is
    /// given later with [`set_next`][Aig::set_next].
    pub fn add_register(&mut self) -> Ref {
        let index = self.los.len() as u32;
        let id = self.nodes.add(Node::Lo(index)) as u32;
        self.los.push(id);
        self.lis.push(0);
        self.inits.push(false);
        Ref::positive(id)
    }

    /// Record that the register whose output is `lo` is declared with reset
    /// value `value`.
    ///
    /// The network semantics do not change: callers encode a reset-1
    /// register by complementing its output and next state. The value is
    /// kept for reporting, e.g. on the initial-state line of a witness.
    pub fn set_init(&mut self, lo: Ref, value: bool) {
        let Node::Lo(reg) = *self.node(lo.id()) else {
            panic!("Node {} is not a register output", lo);
        };
        self.inits[reg as usize] = value;
    }

    /// Set the next-state function of the register whose output is `lo`.
    pub fn set_next(&mut self, lo: Ref, next: Ref) {
        assert!(!lo.is_complemented(), "Register output must be a positive edge");
        let Node::Lo(reg) = *self.node(lo.id()) else {
            panic!("Node {} is not a register output", lo);
        };
        assert_eq!(self.lis[reg as usize], 0, "Register {} already has a next state", reg);
        let id = self.nodes.add(Node::Li(reg, next)) as u32;
        self.lis[reg as usize] = id;
    }

    /// Add a primary output driven by `driver` and return its index.
    pub fn add_output(&mut self, driver: Ref) -> usize {
        let index = self.pos.len();
        let id = self.nodes.add(Node::Po(index as u32, driver)) as u32;
        self.pos.push(id);
        index
    }

    /// Build `a ∧ b`, reusing an existing node when possible.
    pub fn and(&mut self, a: Ref, b: Ref) -> Ref {
        // Trivial cases.
        if a.is_zero() || b.is_zero() || a == !b {
            return Ref::ZERO;
        }
        if a.is_one() || a == b {
            return b;
        }
        if b.is_one() {
            return a;
        }
        debug_assert!(self.is_live(a.id()) && self.is_live(b.id()));

        let (a, b) = if a < b { (a, b) } else { (b, a) };
        let id = self.nodes.put(Node::And(a, b));
        Ref::positive(id as u32)
    }

    pub fn or(&mut self, a: Ref, b: Ref) -> Ref {
        !self.and(!a, !b)
    }

    pub fn xor(&mut self, a: Ref, b: Ref) -> Ref {
        let x = self.and(a, !b);
        let y = self.and(!a, b);
        self.or(x, y)
    }

    /// Build `if c then t else e`.
    pub fn mux(&mut self, c: Ref, t: Ref, e: Ref) -> Ref {
        let x = self.and(c, t);
        let y = self.and(!c, e);
        self.or(x, y)
    }

    pub fn and_many(&mut self, refs: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ONE;
        for r in refs {
            res = self.and(res, r);
        }
        res
    }
}

// Getters
impl Aig {
    pub fn node(&self, id: u32) -> &Node {
        self.nodes.value(id as usize)
    }

    /// Number of issued node ids, including dead ones and the unused id 0.
    pub fn size(&self) -> usize {
        self.nodes.size()
    }

    /// Number of live nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.real_size()
    }

    pub fn num_pis(&self) -> usize {
        self.pis.len()
    }
    pub fn num_pos(&self) -> usize {
        self.pos.len()
    }
    pub fn num_regs(&self) -> usize {
        self.los.len()
    }
    pub fn num_ands(&self) -> usize {
        let lis = self.lis.iter().filter(|&&li| li != 0).count();
        self.num_nodes() - 1 - self.pis.len() - self.los.len() - self.pos.len() - lis
    }

    /// Whether `id` is a node that was created and not removed by compaction.
    pub fn is_live(&self, id: u32) -> bool {
        self.nodes.is_occupied(id as usize)
    }

    /// Iterate over live node ids in topological order.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes.indices().map(|i| i as u32)
    }

    pub fn pi(&self, index: usize) -> u32 {
        self.pis[index]
    }
    pub fn pis(&self) -> &[u32] {
        &self.pis
    }
    pub fn po(&self, index: usize) -> u32 {
        self.pos[index]
    }
    pub fn pos(&self) -> &[u32] {
        &self.pos
    }
    pub fn lo(&self, reg: usize) -> u32 {
        self.los[reg]
    }

    /// Declared reset value of a register.
    pub fn init(&self, reg: usize) -> bool {
        self.inits[reg]
    }

    /// Register input node of a register, if its next state was set.
    pub fn li(&self, reg: usize) -> Option<u32> {
        match self.lis[reg] {
            0 => None,
            id => Some(id),
        }
    }

    pub fn po_driver(&self, index: usize) -> Ref {
        self.fanin0(self.pos[index])
    }

    pub fn is_const(&self, id: u32) -> bool {
        matches!(self.node(id), Node::Const)
    }
    pub fn is_pi(&self, id: u32) -> bool {
        matches!(self.node(id), Node::Pi(_))
    }
    pub fn is_lo(&self, id: u32) -> bool {
        matches!(self.node(id), Node::Lo(_))
    }
    pub fn is_and(&self, id: u32) -> bool {
        matches!(self.node(id), Node::And(..))
    }
    pub fn is_po(&self, id: u32) -> bool {
        matches!(self.node(id), Node::Po(..))
    }
    pub fn is_li(&self, id: u32) -> bool {
        matches!(self.node(id), Node::Li(..))
    }

    /// First fanin of an AND node, or the driver of an output node.
    pub fn fanin0(&self, id: u32) -> Ref {
        match *self.node(id) {
            Node::And(a, _) => a,
            Node::Po(_, d) | Node::Li(_, d) => d,
            ref node => panic!("Node {} ({:?}) has no fanins", id, node),
        }
    }

    /// Second fanin of an AND node.
    pub fn fanin1(&self, id: u32) -> Ref {
        match *self.node(id) {
            Node::And(_, b) => b,
            ref node => panic!("Node {} ({:?}) has no second fanin", id, node),
        }
    }

    /// Register input feeding the register output `lo`.
    pub fn lo_to_li(&self, lo: u32) -> Option<u32> {
        match *self.node(lo) {
            Node::Lo(reg) => self.li(reg as usize),
            _ => None,
        }
    }

    /// Register output fed by the register input `li`.
    pub fn li_to_lo(&self, li: u32) -> Option<u32> {
        match *self.node(li) {
            Node::Li(reg, _) => Some(self.los[reg as usize]),
            _ => None,
        }
    }

    /// Index of the first register without a next-state function.
    pub fn first_open_register(&self) -> Option<usize> {
        self.lis.iter().position(|&li| li == 0)
    }
}

// Maintenance
impl Aig {
    /// Remove every AND node that no output depends on.
    ///
    /// Inputs, outputs and the constant always survive. Removed ids are never
    /// reused, so callers holding an id can detect its removal with
    /// [`is_live`][Aig::is_live]. Returns the number of removed nodes.
    pub fn compact(&mut self) -> usize {
        let mut alive = BitSet::new(self.size());
        let mut stack: Vec<u32> = self
            .pos
            .iter()
            .chain(self.lis.iter().filter(|&&li| li != 0))
            .map(|&co| self.fanin0(co).id())
            .collect();

        while let Some(id) = stack.pop() {
            if !alive.insert(id as usize) {
                continue;
            }
            if let Node::And(a, b) = *self.node(id) {
                stack.push(a.id());
                stack.push(b.id());
            }
        }

        let dead: Vec<u32> = self
            .ids()
            .filter(|&id| self.is_and(id) && !alive.contains(id as usize))
            .collect();
        for &id in &dead {
            self.nodes.drop(id as usize);
        }
        if !dead.is_empty() {
            debug!("compact: removed {} dead nodes, {} left", dead.len(), self.num_nodes());
        }
        dead.len()
    }
}
