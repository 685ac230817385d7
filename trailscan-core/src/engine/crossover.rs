//! Crossover detection between the reference line and the trailing stop.
//!
//! - above: reference was strictly below the stop on the previous bar and is
//!   strictly above it now.
//! - below: the mirror image.
//!
//! Index 0 has no predecessor and never crosses.

/// Crossing state at one index. `above` and `below` are never both true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crossover {
    pub above: bool,
    pub below: bool,
}

/// Compute crossings of `reference` over `stop`. Both slices must be index-aligned;
/// the output has the length of the shorter one.
pub fn crossovers(reference: &[f64], stop: &[f64]) -> Vec<Crossover> {
    let n = reference.len().min(stop.len());
    let mut result = vec![Crossover::default(); n];

    for i in 1..n {
        let (ref_prev, ref_cur) = (reference[i - 1], reference[i]);
        let (stop_prev, stop_cur) = (stop[i - 1], stop[i]);
        result[i] = Crossover {
            above: ref_prev < stop_prev && ref_cur > stop_cur,
            below: stop_prev < ref_prev && stop_cur > ref_cur,
        };
    }

    result
}
