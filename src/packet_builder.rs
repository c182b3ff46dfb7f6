//! Bit-list to raw-RLC encoding (C5), the inverse of [`crate::stream_decoder`].

use crate::error::{IrError, Result};
use crate::protocol::{BurstSet, MiddleTiming};
use crate::vocab::merge_same_sign;

/// Encode a bit list into the body portion of a raw RLC, according to
/// `bursts` and any position-dependent `middle_timings` override (mirroring
/// [`crate::stream_decoder::lookup_pair`] on the decode side). The caller is
/// responsible for prepending `lead_in` and appending `lead_out` and for
/// merging the seam between body and lead-in/out via [`merge_same_sign`].
pub fn build_body(bits: &[u8], bursts: &BurstSet, middle_timings: &[MiddleTiming]) -> Result<Vec<i64>> {
    match bursts {
        BurstSet::PulseCount { mark_unit, space_unit } => Ok(build_pulse_count_body(bits, *mark_unit, *space_unit)),
        BurstSet::Pairs(pairs) => build_pairs_body(bits, pairs, middle_timings),
    }
}

/// Build a full raw RLC: lead-in, body, lead-out, with same-sign runs
/// across the seams merged together (spec.md §4.5 / §8 invariant #2).
pub fn build_rlc(lead_in: &[i64], bits: &[u8], bursts: &BurstSet, middle_timings: &[MiddleTiming], lead_out: &[i64]) -> Result<Vec<i64>> {
    let body = build_body(bits, bursts, middle_timings)?;
    let mut full = Vec::with_capacity(lead_in.len() + body.len() + lead_out.len());
    full.extend_from_slice(lead_in);
    full.extend(body);
    full.extend_from_slice(lead_out);
    Ok(merge_same_sign(&full))
}

fn build_pulse_count_body(bits: &[u8], mark_unit: i64, space_unit: i64) -> Vec<i64> {
    let mut out = Vec::new();
    let mut iter = bits.iter().peekable();
    while let Some(&first) = iter.next() {
        let mut run = 1i64;
        while iter.peek() == Some(&&first) {
            iter.next();
            run += 1;
        }
        let unit = if first == 1 { mark_unit } else { space_unit };
        out.push(unit * run);
    }
    out
}

fn build_pairs_body(bits: &[u8], pairs: &[(i64, i64)], middle_timings: &[MiddleTiming]) -> Result<Vec<i64>> {
    let bits_per_pair = pairs.len().trailing_zeros() as usize;
    if bits_per_pair == 0 || bits.len() % bits_per_pair != 0 {
        return Err(IrError::IRStreamError(format!(
            "bit count {} is not a multiple of {bits_per_pair} bits/pair",
            bits.len()
        )));
    }
    let mut out = Vec::with_capacity(bits.len() / bits_per_pair * 2);
    for (pair_idx, chunk) in bits.chunks(bits_per_pair).enumerate() {
        let mut idx = 0u32;
        for &b in chunk {
            idx = (idx << 1) | (b as u32);
        }
        let (mark, space) = pick_pair(pair_idx as u32, idx, pairs, middle_timings);
        out.push(mark);
        out.push(space);
    }
    Ok(out)
}

/// Choose the burst pair for bit-pair `pair_idx`, value `idx`, mirroring
/// [`crate::stream_decoder::lookup_pair`]'s two `MiddleTiming` shapes: a
/// `Plain` override always available for a zero-valued pair, and a `Ranged`
/// override whose burst table replaces the descriptor's default one while
/// `pair_idx` falls within its declared span. Falls back to `bursts[idx]`
/// when nothing in `middle_timings` applies.
fn pick_pair(pair_idx: u32, idx: u32, bursts: &[(i64, i64)], middle_timings: &[MiddleTiming]) -> (i64, i64) {
    for m in middle_timings {
        match m {
            MiddleTiming::Plain(mark, space) if idx == 0 => return (*mark, *space),
            MiddleTiming::Ranged { start, stop, bursts: window } if pair_idx >= *start && pair_idx <= *stop => {
                return window[idx as usize];
            }
            _ => {}
        }
    }
    bursts[idx as usize]
}
