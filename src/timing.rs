//! Tolerant comparison of observed vs expected IR durations (C1).
//!
//! Every duration in this crate is a signed microsecond count: positive is a
//! mark (carrier on), negative is a space (carrier off). A duration of zero
//! never occurs on the wire and is never a valid `expected` value either.

/// Default matching tolerance, in percent, used when a protocol descriptor
/// does not declare one.
pub const DEFAULT_TOLERANCE_PCT: u32 = 20;

/// Return true if `observed` matches `expected` within `tol_pct` percent.
///
/// `observed` and `expected` must carry the same sign (or both be zero);
/// differing signs never match, regardless of tolerance. The allowed window
/// is `[floor(expected*(1-tol/100)), floor(expected*(1+tol/100))]`; for a
/// negative `expected` the endpoints are swapped first so the window is
/// still an ascending interval on the number line.
pub fn matches(observed: i64, expected: i64, tol_pct: u32) -> bool {
    if (observed < 0) != (expected < 0) && observed != 0 && expected != 0 {
        return false;
    }
    let tol = tol_pct as f64 / 100.0;
    let e = expected as f64;
    let high = (e + e * tol).floor() as i64;
    let low = (e - e * tol).floor() as i64;
    let (low, high) = if expected < 0 { (high, low) } else { (low, high) };
    low <= observed && observed <= high
}

/// Match a whole (mark, space) burst pair.
pub fn matches_pair(observed: (i64, i64), expected: (i64, i64), tol_pct: u32) -> bool {
    matches(observed.0, expected.0, tol_pct) && matches(observed.1, expected.1, tol_pct)
}
