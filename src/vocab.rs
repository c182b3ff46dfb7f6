//! Shared helpers used by more than one component (C11).
//!
//! Error kinds live in [`crate::error`]; this module holds the small
//! stateless utility functions that several components (packet builder,
//! Pronto codec, universal fallback) all need: merging a run of same-sign
//! durations into one, and padding an RLC to the MCE wire shape.

/// Merge consecutive same-sign durations in `rlc` into single durations.
///
/// This is the "packet-builder merge" spec.md §4.5 and §8 invariant #2
/// refer to: no two adjacent durations in an emitted RLC share a sign.
pub fn merge_same_sign(rlc: &[i64]) -> Vec<i64> {
    let mut out: Vec<i64> = Vec::with_capacity(rlc.len());
    for &d in rlc {
        match out.last_mut() {
            Some(last) if (*last < 0) == (d < 0) => *last += d,
            _ => out.push(d),
        }
    }
    out
}

/// Pad an RLC to the MCE wire format: identical to raw RLC except each
/// frame ends with a padding space so the total pair count is even.
pub fn build_mce_rlc(rlc: &[i64]) -> Vec<i64> {
    let mut out = rlc.to_vec();
    if out.len() % 2 != 0 {
        out.push(-1);
    }
    out
}

/// XOR-fold a sequence of bit-field values together; used by checksum hooks
/// that compute e.g. `device ^ sub_device ^ function`.
pub fn xor_fold(values: impl IntoIterator<Item = u64>) -> u64 {
    values.into_iter().fold(0, |acc, v| acc ^ v)
}
