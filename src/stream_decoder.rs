//! Raw-RLC to bit-list decoding (C4).
//!
//! This is the core of the library: given a signed-microsecond duration
//! vector and a protocol's lead-in/lead-out/burst tables, recover the
//! ordered bit list the body encodes. Three sub-stages run in sequence:
//! trim the lead-in (stage A), trim the lead-out (stage B), then decode
//! whatever's left according to the protocol's burst encoding (stage C).

use std::collections::VecDeque;

use itertools::Itertools;

use crate::error::{IrError, Result};
use crate::protocol::{BurstSet, MiddleTiming, OPEN_TAIL};
use crate::timing::{matches, matches_pair};

/// Bit-encoding scheme inferred from a protocol's [`BurstSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// N consecutive marks/spaces of a fixed unit = value N.
    PulseCount,
    /// One burst pair = one or more bits, alternating sign within the pair.
    HalfBit,
    /// Burst pairs are two half-cells that transition mid-bit; adjacent
    /// same-sign half-cells may appear merged into one duration.
    Manchester,
}

/// Infer the encoding scheme from a burst table, per spec.md §4.4: a
/// `PulseCount` burst set is unambiguous; for `Pairs`, two pairs related by
/// `pair[1] == (pair[0].1, pair[0].0)` (same two magnitudes, swapped) are
/// Manchester, anything else is half-bit/pulse-distance.
pub fn classify(bursts: &BurstSet) -> Encoding {
    match bursts {
        BurstSet::PulseCount { .. } => Encoding::PulseCount,
        BurstSet::Pairs(pairs) => {
            if pairs.len() == 2 && pairs[0] == (pairs[1].1, pairs[1].0) {
                Encoding::Manchester
            } else {
                Encoding::HalfBit
            }
        }
    }
}

/// Result of decoding one frame's body: the bit list in decode order, plus
/// any literal open-tail duration observed (see [`OPEN_TAIL`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    /// Bits in the order they were decoded from the wire.
    pub bits: Vec<u8>,
    /// The literal trailing duration(s) consumed by an open lead-out tail,
    /// if the protocol declares one. Appended back onto the normalised RLC
    /// by the caller; never fed to bit decoding.
    pub open_tail: Vec<i64>,
}

/// Collect every nonzero scalar component that appears in a burst/timing
/// table, used as candidate "unit" values when a lead-in/lead-out duration
/// looks like `expected + k*unit` rather than a plain match.
pub(crate) fn burst_components(bursts: &BurstSet, middle: &[MiddleTiming]) -> Vec<i64> {
    let mut units = Vec::new();
    match bursts {
        BurstSet::PulseCount { mark_unit, space_unit } => {
            units.push(*mark_unit);
            units.push(*space_unit);
        }
        BurstSet::Pairs(pairs) => {
            for &(m, s) in *pairs {
                units.push(m);
                units.push(s);
            }
        }
    }
    for m in middle {
        match m {
            MiddleTiming::Plain(m, s) => {
                units.push(*m);
                units.push(*s);
            }
            MiddleTiming::Ranged { bursts, .. } => {
                for &(m, s) in *bursts {
                    units.push(m);
                    units.push(s);
                }
            }
        }
    }
    units.retain(|&u| u != 0);
    units
}

/// Stage A: consume `lead_in` from the front of `deque`, tolerating a
/// split where one observed duration covers the expected lead-in duration
/// plus a whole multiple of a burst unit (the remainder is fed back as the
/// new front of the body).
pub(crate) fn consume_lead_in(deque: &mut VecDeque<i64>, lead_in: &[i64], units: &[i64], tol: u32) -> Result<()> {
    for &expected in lead_in {
        let observed = deque.pop_front().ok_or(IrError::LeadInError(expected))?;
        if matches(observed, expected, tol) {
            continue;
        }
        let mut resolved = false;
        for &unit in units {
            let multiplier = (observed - expected) / unit;
            if multiplier == 0 {
                continue;
            }
            let candidate = expected + multiplier * unit;
            if matches(observed, candidate, tol) {
                deque.push_front(observed - candidate);
                resolved = true;
                break;
            }
        }
        if !resolved {
            return Err(IrError::LeadInError(observed));
        }
    }
    Ok(())
}

/// Stage B: consume `lead_out` from the tail of `deque`, aligned forward
/// (lead_out[0] is the tail window's first/earliest entry). A trailing
/// [`OPEN_TAIL`] sentinel stops consumption early and returns whatever's
/// left as a literal tail, uninterpreted by bit decoding.
pub(crate) fn consume_lead_out(deque: &mut VecDeque<i64>, lead_out: &[i64], units: &[i64], tol: u32) -> Result<Vec<i64>> {
    if lead_out.is_empty() {
        return Ok(Vec::new());
    }
    let n = lead_out.len();
    if deque.len() < n {
        return Err(IrError::LeadOutError(format!(
            "stream too short for lead-out ({} remaining, {n} required)",
            deque.len()
        )));
    }
    let split_at = deque.len() - n;
    let tail: Vec<i64> = deque.split_off(split_at).into();
    let mut extra_end = Vec::new();
    for (i, &expected) in lead_out.iter().enumerate() {
        if expected == OPEN_TAIL {
            return Ok(tail[i..].to_vec());
        }
        let observed = tail[i];
        if matches(observed, expected, tol) {
            continue;
        }
        let mut resolved = false;
        if i == 0 {
            for &unit in units {
                let multiplier = (observed - expected) / unit;
                if multiplier == 0 {
                    continue;
                }
                let candidate = expected + multiplier * unit;
                if matches(observed, candidate, tol) {
                    extra_end.push(observed - candidate);
                    resolved = true;
                    break;
                }
            }
        }
        if !resolved {
            return Err(IrError::LeadOutError(format!("{observed} vs {expected} at lead-out[{i}]")));
        }
    }
    Ok(extra_end)
}

/// Stage C, pulse-count body: each observed duration is `unit * k` for
/// some `k >= 1`; a mark duration decodes to `k` ones, a space duration to
/// `k` zeroes.
fn decode_pulse_count(body: &[i64], mark_unit: i64, space_unit: i64, tol: u32) -> Result<Vec<u8>> {
    let mut bits = Vec::new();
    for &d in body {
        let (unit, bit) = if d > 0 { (mark_unit, 1u8) } else { (space_unit, 0u8) };
        if unit == 0 {
            return Err(IrError::IRStreamError("pulse-count unit is zero".into()));
        }
        let k = ((d as f64) / (unit as f64)).round() as i64;
        if k <= 0 || !matches(d, unit * k, tol) {
            return Err(IrError::IRStreamError(format!("pulse-count duration {d} does not match unit {unit}")));
        }
        bits.extend(std::iter::repeat(bit).take(k as usize));
    }
    Ok(bits)
}

/// Stage C, half-bit body: pair up `body` two at a time and look each pair
/// up in `bursts` (or a position-matching [`MiddleTiming`]), emitting
/// `log2(bursts.len())` bits per pair, MSB-of-the-index first.
fn decode_half_bit(body: &[i64], bursts: &[(i64, i64)], middle: &[MiddleTiming], tol: u32) -> Result<Vec<u8>> {
    if body.len() % 2 != 0 {
        return Err(IrError::IRStreamError("half-bit body has an odd number of durations".into()));
    }
    let bits_per_pair = bursts.len().trailing_zeros();
    let mut out = Vec::new();
    for (pair_idx, (mark, space)) in body.iter().copied().tuples().enumerate() {
        let idx = lookup_pair((mark, space), bursts, middle, pair_idx as u32, tol)?;
        for b in (0..bits_per_pair).rev() {
            out.push(((idx >> b) & 1) as u8);
        }
    }
    Ok(out)
}

pub(crate) fn lookup_pair(
    observed: (i64, i64),
    bursts: &[(i64, i64)],
    middle: &[MiddleTiming],
    pair_idx: u32,
    tol: u32,
) -> Result<u32> {
    for m in middle {
        match m {
            MiddleTiming::Plain(mark, space) => {
                if matches_pair(observed, (*mark, *space), tol) {
                    return Ok(0);
                }
            }
            MiddleTiming::Ranged { start, stop, bursts: win } if pair_idx >= *start && pair_idx <= *stop => {
                if let Some(i) = win.iter().position(|&e| matches_pair(observed, e, tol)) {
                    return Ok(i as u32);
                }
            }
            MiddleTiming::Ranged { .. } => {}
        }
    }
    bursts
        .iter()
        .position(|&e| matches_pair(observed, e, tol))
        .map(|i| i as u32)
        .ok_or_else(|| IrError::IRStreamError(format!("no burst matches ({}, {}) at pair {pair_idx}", observed.0, observed.1)))
}

/// Stage C, Manchester body: half-cells may arrive merged (one duration of
/// magnitude `2*unit` standing in for two consecutive same-sign
/// half-cells spanning a bit boundary); this expands them back out before
/// pairing.
pub(crate) struct HalfCellFeed<'a> {
    body: std::slice::Iter<'a, i64>,
    stash: Option<i64>,
}

impl<'a> HalfCellFeed<'a> {
    pub(crate) fn new(body: &'a [i64]) -> Self {
        Self { body: body.iter(), stash: None }
    }

    /// Pull the next raw duration from the underlying body, bypassing the
    /// merge-splitting `next()` does; used when a position's burst table
    /// expects one literal double-width pair rather than two half-cells.
    pub(crate) fn next_raw(&mut self) -> Option<i64> {
        if let Some(v) = self.stash.take() {
            return Some(v);
        }
        self.body.next().copied()
    }

    pub(crate) fn next(&mut self, unit: i64) -> Option<i64> {
        if let Some(v) = self.stash.take() {
            return Some(v);
        }
        let raw = *self.body.next()?;
        let sign = if raw < 0 { -1 } else { 1 };
        if raw.abs() == 2 * unit {
            self.stash = Some(sign * unit);
            Some(sign * unit)
        } else {
            Some(raw)
        }
    }
}

fn decode_manchester(body: &[i64], bursts: &[(i64, i64)], middle: &[MiddleTiming], tol: u32) -> Result<Vec<u8>> {
    let unit = bursts[0].0.unsigned_abs() as i64;
    let mut feed = HalfCellFeed::new(body);
    let mut out = Vec::new();
    let mut pair_idx: u32 = 0;
    loop {
        let Some(c1) = feed.next(unit) else { break };
        let c2 = feed
            .next(unit)
            .ok_or_else(|| IrError::IRStreamError("manchester body has an odd number of half-cells".into()))?;
        let idx = lookup_pair((c1, c2), bursts, middle, pair_idx, tol)?;
        out.push(idx as u8);
        pair_idx += 1;
    }
    Ok(out)
}

/// Stage A+B only: trim `lead_in`/`lead_out` and return the remaining
/// body plus any open-tail literal, without running stage C. Used by
/// protocols whose body needs bespoke decoding (see
/// [`crate::protocols::rc6m32`]).
pub(crate) fn trim_frame(
    rlc: &[i64],
    lead_in: &[i64],
    lead_out: &[i64],
    bursts: &BurstSet,
    middle_timings: &[MiddleTiming],
    tolerance_pct: u32,
) -> Result<(Vec<i64>, Vec<i64>)> {
    let mut deque: VecDeque<i64> = rlc.iter().copied().collect();
    let units = burst_components(bursts, middle_timings);
    consume_lead_in(&mut deque, lead_in, &units, tolerance_pct)?;
    let open_tail = consume_lead_out(&mut deque, lead_out, &units, tolerance_pct)?;
    Ok((deque.into_iter().collect(), open_tail))
}

/// Decode one frame: trim lead-in/lead-out from `rlc` and decode whatever
/// remains into a bit list, according to `bursts`' inferred [`Encoding`].
#[allow(clippy::too_many_arguments)]
pub fn decode_stream(
    rlc: &[i64],
    lead_in: &[i64],
    lead_out: &[i64],
    bursts: &BurstSet,
    middle_timings: &[MiddleTiming],
    tolerance_pct: u32,
) -> Result<DecodedBody> {
    let (body, open_tail) = trim_frame(rlc, lead_in, lead_out, bursts, middle_timings, tolerance_pct)?;
    let bits = match classify(bursts) {
        Encoding::PulseCount => {
            let BurstSet::PulseCount { mark_unit, space_unit } = bursts else { unreachable!() };
            decode_pulse_count(&body, *mark_unit, *space_unit, tolerance_pct)?
        }
        Encoding::HalfBit => {
            let BurstSet::Pairs(pairs) = bursts else { unreachable!() };
            decode_half_bit(&body, pairs, middle_timings, tolerance_pct)?
        }
        Encoding::Manchester => {
            let BurstSet::Pairs(pairs) = bursts else { unreachable!() };
            decode_manchester(&body, pairs, middle_timings, tolerance_pct)?
        }
    };

    Ok(DecodedBody { bits, open_tail })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF_BIT_BURSTS: &[(i64, i64)] = &[(550, -550), (550, -1650)];

    #[test]
    fn classify_pulse_count() {
        let b = BurstSet::PulseCount { mark_unit: 500, space_unit: -500 };
        assert_eq!(classify(&b), Encoding::PulseCount);
    }

    #[test]
    fn classify_half_bit() {
        let b = BurstSet::Pairs(HALF_BIT_BURSTS);
        assert_eq!(classify(&b), Encoding::HalfBit);
    }

    #[test]
    fn classify_manchester() {
        const PAIRS: &[(i64, i64)] = &[(-889, 889), (889, -889)];
        let b = BurstSet::Pairs(PAIRS);
        assert_eq!(classify(&b), Encoding::Manchester);
    }

    #[test]
    fn decode_simple_half_bit_body() {
        // (550,-550) is bursts[0] -> bit 0, (550,-1650) is bursts[1] -> bit 1.
        let body = vec![550, -550, 550, -1650, 550, -550];
        let bits = decode_half_bit(&body, HALF_BIT_BURSTS, &[], 20).unwrap();
        assert_eq!(bits, vec![0, 1, 0]);
    }

    #[test]
    fn decode_pulse_count_body() {
        let body = vec![1500, -500, 500, -1500];
        let bits = decode_pulse_count(&body, 500, -500, 20).unwrap();
        assert_eq!(bits, vec![1, 1, 1, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn decode_full_stream_trims_lead_in_and_out() {
        let lead_in = [8800i64, -4400];
        let lead_out = [550i64, -23100];
        let mut rlc = vec![8800, -4400];
        rlc.extend([550, -550, 550, -1650, 550, -550]);
        rlc.extend([550, -23100]);
        let bursts = BurstSet::Pairs(HALF_BIT_BURSTS);
        let decoded = decode_stream(&rlc, &lead_in, &lead_out, &bursts, &[], 20).unwrap();
        assert_eq!(decoded.bits, vec![0, 1, 0]);
        assert!(decoded.open_tail.is_empty());
    }

    #[test]
    fn open_tail_is_not_fed_to_bit_decoder() {
        let lead_in = [4512i64, -4512];
        let lead_out = [564i64, OPEN_TAIL];
        let mut rlc = vec![4512, -4512];
        rlc.extend([564, -564, 564, -1692]);
        rlc.extend([564, -108000]);
        let bursts = BurstSet::Pairs(&[(564, -564), (564, -1692)]);
        let decoded = decode_stream(&rlc, &lead_in, &lead_out, &bursts, &[], 20).unwrap();
        assert_eq!(decoded.bits, vec![0, 1]);
        assert_eq!(decoded.open_tail, vec![-108000]);
    }

    #[test]
    fn lead_in_mismatch_is_reported() {
        let lead_in = [8800i64, -4400];
        let rlc = vec![1, -1];
        let bursts = BurstSet::Pairs(HALF_BIT_BURSTS);
        let err = decode_stream(&rlc, &lead_in, &[], &bursts, &[], 20).unwrap_err();
        assert!(matches!(err, IrError::LeadInError(_)));
    }
}
