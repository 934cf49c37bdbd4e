use test_log::test;

use bmc_rs::aig::Aig;
use bmc_rs::aiger::parse_aag;
use bmc_rs::bmc::{run, BmcParams, Verdict};
use bmc_rs::reference::Ref;

/// `n`-stage shift register fed by one input, bad when the last stage is 1.
fn shift_register(n: usize) -> (Aig, Ref) {
    let mut aig = Aig::new();
    let x = aig.add_input();
    let mut prev = x;
    for _ in 0..n {
        let r = aig.add_register();
        aig.set_next(r, prev);
        prev = r;
    }
    (aig, prev)
}

/// 3-bit counter incremented while the input is 1, bad when it reaches `value`.
fn counter(value: u32) -> Aig {
    let mut aig = Aig::new();
    let x = aig.add_input();
    let bits: Vec<Ref> = (0..3).map(|_| aig.add_register()).collect();
    let mut carry = x;
    for &b in &bits {
        let next = aig.xor(b, carry);
        aig.set_next(b, next);
        carry = aig.and(carry, b);
    }
    let matches = bits
        .iter()
        .enumerate()
        .map(|(i, &b)| b.not_if(value & (1 << i) == 0))
        .collect::<Vec<_>>();
    let bad = aig.and_many(matches);
    aig.add_output(bad);
    aig
}

/// Asserted when the input was 1 in every one of the first `n` frames.
fn all_ones(n: usize) -> Aig {
    let mut aig = Aig::new();
    let x = aig.add_input();
    let mut prev = Ref::ONE;
    for _ in 0..n {
        let r = aig.add_register();
        let next = aig.and(x, prev);
        aig.set_next(r, next);
        prev = r;
    }
    aig.add_output(prev);
    aig
}

fn check_cex(aig: &Aig, verdict: &Verdict) {
    let cex = verdict.cex().expect("expected a counterexample");
    let outputs = cex.replay(aig);
    assert!(outputs[cex.frame as usize][cex.output]);
    for frame in 0..cex.frame {
        assert!(!outputs[frame as usize][cex.output], "asserted early in frame {}", frame);
    }
}

#[test]
fn test_flop_fed_by_itself_is_safe() {
    let mut aig = Aig::new();
    let r = aig.add_register();
    aig.set_next(r, r);
    aig.add_output(r);

    let verdict = run(&aig, BmcParams::default().with_max_frames(25)).unwrap();
    assert_eq!(verdict, Verdict::Unsat { deepest_safe: Some(24) });

    // Same answer without ternary simulation.
    let params = BmcParams::default().with_max_frames(25).with_ternary_frames(0);
    let verdict = run(&aig, params).unwrap();
    assert_eq!(verdict, Verdict::Unsat { deepest_safe: Some(24) });
}

#[test]
fn test_shift_register_fails_in_frame_3() {
    let (mut aig, last) = shift_register(3);
    aig.add_output(last);

    let verdict = run(&aig, BmcParams::default()).unwrap();
    let cex = verdict.cex().unwrap();
    assert_eq!((cex.frame, cex.output), (3, 0));
    assert!(cex.input(0, 0));
    assert!(cex.verify(&aig));
    check_cex(&aig, &verdict);
}

#[test]
fn test_second_output_fails_in_frame_5() {
    let (mut aig, last) = shift_register(5);
    let x = Ref::positive(aig.pi(0));
    let y = aig.add_input();
    let r = aig.add_register();
    let next = aig.xor(y, r);
    aig.set_next(r, next);
    let a = aig.and(r, y);
    let b = aig.and(!r, x);
    let never = aig.and(a, b);
    aig.add_output(never);
    aig.add_output(last);

    let params = BmcParams::default().with_max_frames(20).with_ternary_frames(0);
    let verdict = run(&aig, params).unwrap();
    let cex = verdict.cex().unwrap();
    assert_eq!((cex.frame, cex.output), (5, 1));
    assert!(cex.input(0, 0));
    check_cex(&aig, &verdict);
}

#[test]
fn test_counter_trace_is_valid() {
    for value in 1..8 {
        let aig = counter(value);
        let verdict = run(&aig, BmcParams::default().with_max_frames(16)).unwrap();
        let cex = verdict.cex().unwrap();
        assert_eq!(cex.frame, value);
        for frame in 0..value {
            assert!(cex.input(frame, 0));
        }
        check_cex(&aig, &verdict);
    }
}

#[test]
fn test_deeper_runs_agree_with_shallow_ones() {
    let aig = all_ones(6);

    let shallow = run(&aig, BmcParams::default().with_max_frames(4)).unwrap();
    assert_eq!(shallow, Verdict::Unsat { deepest_safe: Some(3) });

    let deep = run(&aig, BmcParams::default().with_max_frames(12)).unwrap();
    let cex = deep.cex().unwrap();
    assert!(cex.frame > shallow.deepest_safe().unwrap());
    assert_eq!(cex.frame, 6);
    check_cex(&aig, &deep);
}

#[test]
fn test_reruns_are_identical() {
    let aig = counter(6);
    let params = BmcParams::default().with_max_frames(10).with_node_budget(5);
    let first = run(&aig, params.clone()).unwrap();
    let second = run(&aig, params).unwrap();
    assert_eq!(first, second);
    let (a, b) = (first.cex().unwrap(), second.cex().unwrap());
    assert_eq!(a.replay(&aig), b.replay(&aig));
    assert_eq!(a.to_string(), b.to_string());
}

#[test]
fn test_node_budget_does_not_change_verdict() {
    let aig = counter(5);
    for budget in [0, 1, 10, 100_000] {
        let params = BmcParams::default().with_max_frames(10).with_node_budget(budget);
        let verdict = run(&aig, params).unwrap();
        assert_eq!(verdict.cex().map(|c| (c.frame, c.output)), Some((5, 0)));
    }
}

#[test]
fn test_start_frame_skips_early_failures() {
    let (mut aig, last) = shift_register(1);
    aig.add_output(last);

    // Fails from frame 1 on; starting at 4 reports frame 4.
    let params = BmcParams::default().with_start_frame(4).with_max_frames(10);
    let verdict = run(&aig, params).unwrap();
    let cex = verdict.cex().unwrap();
    assert_eq!(cex.frame, 4);
    assert!(cex.input(3, 0));
    assert!(cex.verify(&aig));
}

#[test]
fn test_aag_design() {
    let text = "aag 3 1 1 1 1\n2\n4 2\n6\n6 4 2\n";
    let aig = parse_aag(text).unwrap();
    let verdict = run(&aig, BmcParams::default()).unwrap();
    let cex = verdict.cex().unwrap();
    assert_eq!(cex.frame, 1);
    assert!(cex.input(0, 0));
    assert!(cex.input(1, 0));
    assert_eq!(cex.to_string(), "1\nb0\n0\n1\n1\n.");
}

#[test]
fn test_witness_reports_reset_values() {
    // Latch starts at 1 and copies the input; bad while latch is 1 and input is 0.
    let text = "aag 3 1 1 1 1\n2\n4 2 1\n6\n6 4 3\n";
    let aig = parse_aag(text).unwrap();
    assert!(aig.init(0));
    let verdict = run(&aig, BmcParams::default()).unwrap();
    let cex = verdict.cex().unwrap();
    assert_eq!(cex.frame, 0);
    assert!(cex.init(0));
    assert!(!cex.input(0, 0));
    assert_eq!(cex.to_string(), "1\nb0\n1\n0\n.");
    check_cex(&aig, &verdict);
}

#[test]
fn test_deep_cone() {
    // Output is the register AND'ed with a long chain of inputs.
    let depth = 100_000;
    let mut aig = Aig::new();
    let x = aig.add_input();
    let r = aig.add_register();
    aig.set_next(r, x);
    let mut chain = r;
    for _ in 0..depth {
        let y = aig.add_input();
        chain = aig.and(chain, y);
    }
    aig.add_output(chain);

    let verdict = run(&aig, BmcParams::default().with_max_frames(2)).unwrap();
    let cex = verdict.cex().unwrap();
    assert_eq!(cex.frame, 1);
    assert!(cex.input(0, 0));
    assert!((1..=depth).all(|pi| cex.input(1, pi)));
    check_cex(&aig, &verdict);
}
