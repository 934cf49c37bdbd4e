use std::fmt::{Debug, Display, Formatter};
use std::ops::{Neg, Not};

/// A possibly complemented edge to a node of an [`Aig`][crate::aig::Aig].
///
/// The polarity is kept in its own field instead of being packed into the
/// lowest bit of the id.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref {
    id: u32,
    complemented: bool,
}

impl Ref {
    /// Constant true: positive edge to the constant node.
    pub const ONE: Ref = Ref::positive(1);
    /// Constant false: complemented edge to the constant node.
    pub const ZERO: Ref = Ref::negative(1);

    pub const fn new(id: u32, complemented: bool) -> Self {
        Self { id, complemented }
    }

    pub const fn positive(id: u32) -> Self {
        Self::new(id, false)
    }

    pub const fn negative(id: u32) -> Self {
        Self::new(id, true)
    }

    /// Node id this edge points to.
    pub const fn id(self) -> u32 {
        self.id
    }

    /// Node id as an index into per-node tables.
    pub const fn index(self) -> usize {
        self.id as usize
    }

    pub const fn is_complemented(self) -> bool {
        self.complemented
    }

    /// The same edge with positive polarity.
    pub const fn regular(self) -> Self {
        Self::positive(self.id)
    }

    /// Complement the edge if `cond` holds.
    pub const fn not_if(self, cond: bool) -> Self {
        Self::new(self.id, self.complemented ^ cond)
    }

    pub const fn is_const(self) -> bool {
        self.id == 1
    }

    pub const fn is_zero(self) -> bool {
        self.is_const() && self.complemented
    }

    pub const fn is_one(self) -> bool {
        self.is_const() && !self.complemented
    }
}

impl Not for Ref {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.not_if(true)
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        !self
    }
}

impl From<bool> for Ref {
    fn from(b: bool) -> Self {
        if b {
            Ref::ONE
        } else {
            Ref::ZERO
        }
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_const() {
            return write!(f, "{}", if self.is_one() { 1 } else { 0 });
        }
        write!(
            f,
            "{}@{}",
            if self.is_complemented() { "~" } else { "" },
            self.id
        )
    }
}

impl Debug for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
