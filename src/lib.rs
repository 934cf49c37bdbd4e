//! # bmc-rs: Incremental Bounded Model Checking for And-Inverter Graphs
//!
//! **`bmc-rs`** searches a sequential circuit for an input sequence that drives one of its outputs to 1.
//! Each primary output is a property monitor: 1 means "bad state reached".
//!
//! ## How it works
//!
//! The circuit is an [`Aig`][crate::aig::Aig]: two-input AND gates, inverted edges, primary inputs and registers that start at 0.
//! The engine unrolls it into timeframes **lazily**, a bounded number of new nodes at a time, and keeps a **single** incremental SAT instance for the whole run.
//! Only the logic added by the latest unrolling step is encoded into CNF; nodes seen before are tied to their existing variables with two binary clauses each.
//!
//! - **Ternary simulation** first proves the leading frames in which every output is constantly 0, so SAT never sees them.
//! - **Structural hashing** in the unrolled copy shares equal logic across frames.
//! - **Budgets**: per-target and global conflict limits, and a wall-clock timeout. Running out is a verdict, not an error.
//! - **Checked answers**: every counterexample is replayed on the original circuit before it is returned.
//!
//! ## Basic Usage
//!
//! ```rust
//! use bmc_rs::aig::Aig;
//! use bmc_rs::bmc::{run, BmcParams, Verdict};
//!
//! // A 3-stage shift register fed by input `x`.
//! let mut aig = Aig::new();
//! let x = aig.add_input();
//! let r1 = aig.add_register();
//! let r2 = aig.add_register();
//! let r3 = aig.add_register();
//! aig.set_next(r1, x);
//! aig.set_next(r2, r1);
//! aig.set_next(r3, r2);
//!
//! // Bad when the last stage holds 1.
//! aig.add_output(r3);
//!
//! let verdict = run(&aig, BmcParams::default().with_max_frames(10)).unwrap();
//! let Verdict::Sat(cex) = verdict else { panic!("expected a counterexample") };
//! assert_eq!(cex.frame, 3);
//! assert!(cex.input(0, 0));
//! assert!(cex.verify(&aig));
//! ```
//!
//! ## Core Components
//!
//! - **[`bmc`]**: The driver. Contains [`Bmc`][crate::bmc::Bmc], its parameters and verdicts.
//! - **[`unroll`]**: Lazy timeframe expansion.
//! - **[`stitch`]**: Incremental CNF loading.
//! - **[`ternary`]**: 0/1/X simulation.
//! - **[`cex`]**: Counterexample traces and their replay.
//! - **[`aiger`]**: Reading and writing ASCII AIGER files.

pub mod aig;
pub mod aiger;
pub mod bitset;
pub mod bmc;
pub mod cex;
pub mod cnf;
pub mod frames;
pub mod reference;
pub mod solver;
pub mod stitch;
pub mod table;
pub mod ternary;
pub mod types;
pub mod unroll;
pub mod utils;
