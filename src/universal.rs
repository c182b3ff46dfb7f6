//! Universal fallback decoder (C9): when no registered protocol claims a
//! signal, recover *something* structured from it rather than discarding
//! it, using one of two explicit strategies.

use std::collections::HashMap;

use crate::bitfield::BitOrder;
use crate::error::{IrError, Result};
use crate::timing::{matches, matches_pair};

/// Which heuristic to use when no protocol descriptor matches a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniversalStrategy {
    /// Infer two canonical (mark, space) burst shapes from the body and
    /// decode against them, the way a half-bit or Manchester protocol
    /// would, without knowing the protocol in advance.
    PairShape,
    /// No stable pair shape could be inferred; compare each duration to
    /// its same-parity predecessor and call it a `1` bit when they're
    /// close, a `0` otherwise.
    NearestNeighbour,
}

const STRIP_PAIRS: usize = 1;

/// Try [`UniversalStrategy::PairShape`] first, falling back to
/// [`UniversalStrategy::NearestNeighbour`] if no stable shape emerges.
pub fn decode(rlc: &[i64], tolerance_pct: u32) -> Result<(UniversalStrategy, Vec<u8>)> {
    match decode_pair_shape(rlc, tolerance_pct) {
        Ok((_, bits)) => Ok((UniversalStrategy::PairShape, bits)),
        Err(_) => decode_nearest_neighbour(rlc, tolerance_pct).map(|bits| (UniversalStrategy::NearestNeighbour, bits)),
    }
}

/// Infer two canonical burst shapes from `rlc` (ignoring one leading and
/// one trailing pair, treated as lead-in/lead-out) and decode the body
/// against them. Also reports whether the shapes look MSB-first
/// (Manchester-style, complementary pairs) or LSB-first.
pub fn decode_pair_shape(rlc: &[i64], tolerance_pct: u32) -> Result<(BitOrder, Vec<u8>)> {
    if rlc.len() < (STRIP_PAIRS * 2 + 2) * 2 {
        return Err(IrError::IRStreamError("signal too short for pair-shape inference".into()));
    }
    let body = &rlc[STRIP_PAIRS * 2..rlc.len() - STRIP_PAIRS * 2];
    if body.len() % 2 != 0 {
        return Err(IrError::IRStreamError("universal body has an odd number of durations".into()));
    }

    let mut shapes: Vec<(i64, i64)> = Vec::new();
    for chunk in body.chunks(2) {
        let pair = (chunk[0], chunk[1]);
        if !shapes.iter().any(|&s| matches_pair(pair, s, tolerance_pct)) {
            shapes.push(pair);
        }
    }
    if shapes.is_empty() {
        return Err(IrError::IRStreamError("no burst shape found".into()));
    }
    if shapes.len() > 2 {
        shapes.truncate(2);
    }
    if shapes.len() == 1 {
        shapes.push((shapes[0].1, shapes[0].0));
    }

    let order = if shapes[0] == (shapes[1].1, shapes[1].0) { BitOrder::Msb } else { BitOrder::Lsb };

    let bits = body
        .chunks(2)
        .map(|chunk| {
            let pair = (chunk[0], chunk[1]);
            shapes.iter().position(|&s| matches_pair(pair, s, tolerance_pct)).unwrap_or(0) as u8
        })
        .collect();
    Ok((order, bits))
}

/// Compare each duration in `rlc` to its same-parity predecessor (two
/// positions back); a close match is a `1` bit, otherwise a `0`. Durations
/// whose magnitude occurs exactly once are dropped first as noise.
pub fn decode_nearest_neighbour(rlc: &[i64], tolerance_pct: u32) -> Result<Vec<u8>> {
    if rlc.len() < 3 {
        return Err(IrError::IRStreamError("signal too short for nearest-neighbour decode".into()));
    }
    let mut counts: HashMap<i64, u32> = HashMap::new();
    for &d in rlc {
        *counts.entry(d.abs()).or_insert(0) += 1;
    }
    let filtered: Vec<i64> = rlc.iter().copied().filter(|d| counts[&d.abs()] > 1).collect();
    if filtered.len() < 3 {
        return Err(IrError::IRStreamError("not enough recurring durations for nearest-neighbour decode".into()));
    }
    let bits = filtered
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            if i < 2 {
                0
            } else {
                let tol = tolerance_pct.max(20);
                u8::from(matches(d, filtered[i - 2], tol) || d.abs_diff(filtered[i - 2]) <= 3)
            }
        })
        .collect();
    Ok(bits)
}
