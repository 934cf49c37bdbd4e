//! Reading and writing the ASCII AIGER format (`aag`).
//!
//! Supported: inputs, latches with reset value 0 or 1, outputs, bad-state
//! properties (appended after the outputs) and AND gates in any order.
//! Symbols and comments are skipped. Invariant constraints, justice and
//! fairness properties, and uninitialized latches are rejected.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::aig::{Aig, Node};
use crate::reference::Ref;

#[derive(Debug, Error)]
pub enum AigerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid header: {0}")]
    Header(String),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("latch {latch} has unsupported reset value {reset}")]
    UnsupportedReset { latch: usize, reset: u32 },
    #[error("literal {0} is used but never defined")]
    Undefined(u32),
    #[error("AND gate {0} depends on itself")]
    Cyclic(u32),
    #[error("unsupported section: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Header {
    pub m: u32,
    pub i: u32,
    pub l: u32,
    pub o: u32,
    pub a: u32,
    pub b: u32,
}

fn parse_header(line: &str) -> Result<Header, AigerError> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some("aag") {
        return Err(AigerError::Header(format!("expected 'aag', got '{}'", line)));
    }
    let nums = parts
        .map(|s| s.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AigerError::Header(e.to_string()))?;
    if nums.len() < 5 || nums.len() > 9 {
        return Err(AigerError::Header(format!("expected 5 to 9 numbers, got {}", nums.len())));
    }
    let field = |k: usize| nums.get(k).copied().unwrap_or(0);
    for (k, name) in [(6, "invariant constraints"), (7, "justice properties"), (8, "fairness constraints")] {
        if field(k) != 0 {
            return Err(AigerError::Unsupported(name.to_string()));
        }
    }
    Ok(Header {
        m: field(0),
        i: field(1),
        l: field(2),
        o: field(3),
        a: field(4),
        b: field(5),
    })
}

struct Lines<R> {
    inner: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> Lines<R> {
    fn next_numbers(&mut self, min: usize, max: usize) -> Result<Vec<u32>, AigerError> {
        self.line += 1;
        let text = match self.inner.next() {
            Some(text) => text?,
            None => return Err(self.error("unexpected end of file")),
        };
        let nums = text
            .split_whitespace()
            .map(|s| s.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.error(&format!("{}: '{}'", e, text)))?;
        if nums.len() < min || nums.len() > max {
            return Err(self.error(&format!("expected {}..={} literals, got '{}'", min, max, text)));
        }
        Ok(nums)
    }

    fn error(&self, message: &str) -> AigerError {
        AigerError::Syntax {
            line: self.line,
            message: message.to_string(),
        }
    }
}

/// Parse an ASCII AIGER file from a reader.
pub fn read_aag<R: BufRead>(reader: R) -> Result<Aig, AigerError> {
    let mut lines = Lines {
        inner: reader.lines(),
        line: 1,
    };
    let header = match lines.inner.next() {
        Some(line) => parse_header(&line?)?,
        None => return Err(AigerError::Header("empty input".to_string())),
    };
    debug!("aiger header = {:?}", header);

    let var_of = |lines: &Lines<R>, lit: u32| -> Result<usize, AigerError> {
        if lit / 2 > header.m {
            return Err(lines.error(&format!("literal {} exceeds maximum variable {}", lit, header.m)));
        }
        Ok((lit / 2) as usize)
    };

    let mut aig = Aig::new();
    let mut map: Vec<Option<Ref>> = vec![None; header.m as usize + 1];
    map[0] = Some(Ref::ZERO);

    for _ in 0..header.i {
        let lit = lines.next_numbers(1, 1)?[0];
        let v = var_of(&lines, lit)?;
        if lit % 2 != 0 || map[v].is_some() {
            return Err(lines.error(&format!("bad input literal {}", lit)));
        }
        map[v] = Some(aig.add_input());
    }

    let mut latches = Vec::new();
    for latch in 0..header.l as usize {
        let nums = lines.next_numbers(2, 3)?;
        let (lit, next) = (nums[0], nums[1]);
        let reset = nums.get(2).copied().unwrap_or(0);
        let v = var_of(&lines, lit)?;
        var_of(&lines, next)?;
        if lit % 2 != 0 || map[v].is_some() {
            return Err(lines.error(&format!("bad latch literal {}", lit)));
        }
        // A latch reset to 1 is stored complemented in a register reset to 0.
        let inverted = match reset {
            0 => false,
            1 => true,
            _ => return Err(AigerError::UnsupportedReset { latch, reset }),
        };
        let lo = aig.add_register();
        aig.set_init(lo, inverted);
        map[v] = Some(lo.not_if(inverted));
        latches.push((lo, next, inverted));
    }

    let mut outputs = Vec::new();
    for _ in 0..header.o + header.b {
        let lit = lines.next_numbers(1, 1)?[0];
        var_of(&lines, lit)?;
        outputs.push(lit);
    }

    let mut gates: Vec<Option<(u32, u32)>> = vec![None; header.m as usize + 1];
    for _ in 0..header.a {
        let nums = lines.next_numbers(3, 3)?;
        let v = var_of(&lines, nums[0])?;
        var_of(&lines, nums[1])?;
        var_of(&lines, nums[2])?;
        if nums[0] % 2 != 0 || map[v].is_some() || gates[v].is_some() {
            return Err(lines.error(&format!("bad AND literal {}", nums[0])));
        }
        gates[v] = Some((nums[1], nums[2]));
    }

    let mut resolve = |aig: &mut Aig, lit: u32| -> Result<Ref, AigerError> {
        resolve_literal(aig, &mut map, &gates, lit)
    };

    for &(lo, next, inverted) in &latches {
        let next = resolve(&mut aig, next)?;
        aig.set_next(lo, next.not_if(inverted));
    }
    for &lit in &outputs {
        let driver = resolve(&mut aig, lit)?;
        aig.add_output(driver);
    }

    debug!("aiger network = {:?}", aig);
    Ok(aig)
}

/// Build the AND cone of `lit` without recursion, so deep files are fine.
fn resolve_literal(
    aig: &mut Aig,
    map: &mut [Option<Ref>],
    gates: &[Option<(u32, u32)>],
    lit: u32,
) -> Result<Ref, AigerError> {
    let root = (lit / 2) as usize;
    if map[root].is_none() {
        // Entries are (var, expanded).
        let mut stack = vec![(root, false)];
        let mut on_stack = vec![false; map.len()];
        while let Some((v, expanded)) = stack.pop() {
            if map[v].is_some() {
                continue;
            }
            let (l0, l1) = gates[v].ok_or(AigerError::Undefined(2 * v as u32))?;
            let (v0, v1) = ((l0 / 2) as usize, (l1 / 2) as usize);
            if expanded {
                let a = map[v0].ok_or(AigerError::Undefined(l0))?.not_if(l0 % 2 == 1);
                let b = map[v1].ok_or(AigerError::Undefined(l1))?.not_if(l1 % 2 == 1);
                map[v] = Some(aig.and(a, b));
                on_stack[v] = false;
                continue;
            }
            if on_stack[v] {
                return Err(AigerError::Cyclic(2 * v as u32));
            }
            on_stack[v] = true;
            stack.push((v, true));
            for u in [v0, v1] {
                if map[u].is_none() {
                    if on_stack[u] {
                        return Err(AigerError::Cyclic(2 * u as u32));
                    }
                    stack.push((u, false));
                }
            }
        }
    }
    let r = map[root].ok_or(AigerError::Undefined(lit))?;
    Ok(r.not_if(lit % 2 == 1))
}

/// Parse an ASCII AIGER string.
pub fn parse_aag(text: &str) -> Result<Aig, AigerError> {
    read_aag(text.as_bytes())
}

/// Load an ASCII AIGER file.
pub fn load_aag(path: impl AsRef<Path>) -> Result<Aig, AigerError> {
    let file = File::open(path)?;
    read_aag(BufReader::new(file))
}

impl Aig {
    /// Write the network in ASCII AIGER format.
    ///
    /// Only live nodes are written; AND gates keep their topological order.
    /// Registers declared with reset value 1 are written as such, with their
    /// complemented encoding undone.
    pub fn to_aag(&self) -> String {
        let mut var = vec![0u32; self.size()];
        let mut next = 1;
        let los: Vec<u32> = (0..self.num_regs()).map(|r| self.lo(r)).collect();
        for &id in self.pis().iter().chain(&los) {
            var[id as usize] = next;
            next += 1;
        }
        let ands: Vec<u32> = self.ids().filter(|&id| self.is_and(id)).collect();
        for &id in &ands {
            var[id as usize] = next;
            next += 1;
        }
        let lit = |r: Ref| -> u32 {
            if r.is_const() {
                return r.is_one() as u32;
            }
            let flip = match *self.node(r.id()) {
                Node::Lo(reg) => self.init(reg as usize),
                _ => false,
            };
            2 * var[r.index()] + (r.is_complemented() ^ flip) as u32
        };

        let mut out = format!(
            "aag {} {} {} {} {}\n",
            next - 1,
            self.num_pis(),
            self.num_regs(),
            self.num_pos(),
            ands.len()
        );
        for &id in self.pis() {
            out += &format!("{}\n", 2 * var[id as usize]);
        }
        for reg in 0..self.num_regs() {
            let lo = self.lo(reg);
            let init = self.init(reg);
            let next = self.li(reg).map_or(0, |li| lit(self.fanin0(li).not_if(init)));
            if init {
                out += &format!("{} {} 1\n", 2 * var[lo as usize], next);
            } else {
                out += &format!("{} {}\n", 2 * var[lo as usize], next);
            }
        }
        for index in 0..self.num_pos() {
            out += &format!("{}\n", lit(self.po_driver(index)));
        }
        for &id in &ands {
            if let Node::And(a, b) = *self.node(id) {
                out += &format!("{} {} {}\n", 2 * var[id as usize], lit(b), lit(a));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    const TOGGLE: &str = "aag 1 0 1 2 0\n2 3\n2\n3\n";

    #[test]
    fn test_and_gate() {
        let aig = parse_aag("aag 3 2 0 1 1\n2\n4\n6\n6 2 4\n").unwrap();
        assert_eq!(aig.num_pis(), 2);
        assert_eq!(aig.num_pos(), 1);
        assert_eq!(aig.num_ands(), 1);
        let out = aig.po_driver(0);
        assert!(aig.is_and(out.id()));
        assert!(!out.is_complemented());
    }

    #[test]
    fn test_toggle() {
        let aig = parse_aag(TOGGLE).unwrap();
        assert_eq!(aig.num_regs(), 1);
        let lo = aig.lo(0);
        let li = aig.li(0).unwrap();
        assert_eq!(aig.fanin0(li), !Ref::positive(lo));
        assert_eq!(aig.po_driver(1), !Ref::positive(lo));
    }

    #[test]
    fn test_gates_out_of_order() {
        let aig = parse_aag("aag 5 2 0 1 2\n2\n4\n10\n10 8 2\n8 2 5\n").unwrap();
        assert_eq!(aig.num_ands(), 2);
    }

    #[test]
    fn test_reset_one() {
        // Latch starts at 1 and keeps its value; output is the latch.
        let aig = parse_aag("aag 1 0 1 1 0\n2 2 1\n2\n").unwrap();
        let lo = Ref::positive(aig.lo(0));
        assert_eq!(aig.po_driver(0), !lo);
        assert_eq!(aig.fanin0(aig.li(0).unwrap()), lo);
        assert!(aig.init(0));
        assert_eq!(aig.to_aag(), "aag 1 0 1 1 0\n2 2 1\n2\n");
    }

    #[test]
    fn test_bad_properties_become_outputs() {
        let aig = parse_aag("aag 1 1 0 0 0 1\n2\n2\n").unwrap();
        assert_eq!(aig.num_pos(), 1);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse_aag("aig 0 0 0 0 0\n"), Err(AigerError::Header(_))));
        assert!(matches!(parse_aag("aag 1 1 0 1 0\n2\n"), Err(AigerError::Syntax { .. })));
        assert!(matches!(parse_aag("aag 1 0 1 0 0\n2 2 2\n"), Err(AigerError::UnsupportedReset { .. })));
        assert!(matches!(parse_aag("aag 2 0 0 1 0\n4\n"), Err(AigerError::Undefined(_))));
        assert!(matches!(parse_aag("aag 1 0 0 1 1\n2\n2 2 3\n"), Err(AigerError::Cyclic(_))));
        assert!(matches!(parse_aag("aag 0 0 0 0 0 0 1\n"), Err(AigerError::Unsupported(_))));
    }

    #[test]
    fn test_write_and_read_back() {
        let aig = parse_aag("aag 4 2 1 1 1\n2\n4\n6 8\n9\n8 2 7\n").unwrap();
        let text = aig.to_aag();
        let again = parse_aag(&text).unwrap();
        assert_eq!(again.num_pis(), 2);
        assert_eq!(again.num_regs(), 1);
        assert_eq!(again.num_ands(), 1);
        assert_eq!(again.to_aag(), text);
    }
}
