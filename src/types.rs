//! Type-safe wrappers for SAT variables and literals.
//!
//! Variables are 1-indexed, so literals map directly onto DIMACS integers.
use std::fmt;
use std::ops::{Neg, Not};

/// A SAT variable identifier (1-indexed).
///
/// # Invariants
///
/// - Variable IDs must be >= 1 (0 is reserved to mean "no variable")
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates a new variable with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`. Variables must be 1-indexed.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Variable IDs must be >= 1");
        Var(id)
    }

    /// Returns the raw variable ID as a `u32`.
    pub fn id(self) -> u32 {
        self.0
    }

    /// Positive literal of this variable.
    pub fn pos(self) -> Lit {
        Lit::new(self, false)
    }

    /// Negative literal of this variable.
    pub fn neg(self) -> Lit {
        Lit::new(self, true)
    }

    /// Literal of this variable, negated if `negated` holds.
    pub fn lit(self, negated: bool) -> Lit {
        Lit::new(self, negated)
    }

    /// The variable shifted up by `delta`.
    pub fn lift(self, delta: u32) -> Self {
        Var(self.0 + delta)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A literal: a variable with a sign, stored in DIMACS form.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit(i32);

impl Lit {
    pub fn new(var: Var, negated: bool) -> Self {
        let v = var.id() as i32;
        Lit(if negated { -v } else { v })
    }

    /// Creates a literal from a signed DIMACS integer.
    ///
    /// # Panics
    ///
    /// Panics if `value == 0`.
    pub fn from_dimacs(value: i32) -> Self {
        assert_ne!(value, 0, "DIMACS literal must be non-zero");
        Lit(value)
    }

    pub fn to_dimacs(self) -> i32 {
        self.0
    }

    pub fn var(self) -> Var {
        Var(self.0.unsigned_abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// The literal with its variable shifted up by `delta`.
    pub fn lift(self, delta: u32) -> Self {
        self.var().lift(delta).lit(self.is_negative())
    }
}

impl Neg for Lit {
    type Output = Lit;

    fn neg(self) -> Self::Output {
        Lit(-self.0)
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Self::Output {
        -self
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "~")?;
        }
        write!(f, "{}", self.var())
    }
}
