//! NECx: lsb half-bit, inverted-function checksum, short 1-bit repeat frame.
//!
//! Grounded on `necx.py`: `{38.4k,564,lsb}<1,-1|1,-3>(8,-8,D:8,S:8,F:8,~F:8,
//! 1,^108m,(8,-8,D:1,1,^108m)*)`. The trailing `^108m` is "fill to the 108ms
//! period", not a fixed gap, so both lead-outs use [`OPEN_TAIL`]. The repeat
//! frame carries a different, shorter payload than the main frame, but the
//! generic [`RepeatPolicy::RepeatFrame`] path only checks that *a* repeat
//! frame decoded, not its bit count, so this needs no override.

use crate::bitfield::BitOrder;
use crate::protocol::{BurstSet, EncodeFieldSpec, FieldMap, FieldSpec, ProtocolDescriptor, RepeatPolicy, OPEN_TAIL};

const TIMING: i64 = 564;
const BURSTS: &[(i64, i64)] = &[(TIMING, -TIMING), (TIMING, -TIMING * 3)];

fn function_checksum(fields: &FieldMap) -> u64 {
    let function = fields.get("function").map(|b| b.value()).unwrap_or(0);
    (!function) & 0xFF
}

pub static NECX: ProtocolDescriptor = ProtocolDescriptor {
    name: "necx",
    carrier_hz: 38400,
    bit_order: BitOrder::Lsb,
    total_bits: 32,
    tolerance_pct: 20,
    lead_in: &[TIMING * 8, -TIMING * 8],
    lead_out: &[TIMING, OPEN_TAIL],
    repeat_lead_in: Some(&[TIMING * 8, -TIMING * 8]),
    repeat_lead_out: Some(&[TIMING, OPEN_TAIL]),
    bursts: BurstSet::Pairs(BURSTS),
    middle_timings: &[],
    fields: &[
        FieldSpec { name: "device", lo: 0, hi: 7 },
        FieldSpec { name: "sub_device", lo: 8, hi: 15 },
        FieldSpec { name: "function", lo: 16, hi: 23 },
        FieldSpec { name: "f_checksum", lo: 24, hi: 31 },
    ],
    encode_fields: &[
        EncodeFieldSpec { name: "device", min: 0, max: 255 },
        EncodeFieldSpec { name: "sub_device", min: 0, max: 255 },
        EncodeFieldSpec { name: "function", min: 0, max: 255 },
    ],
    code_order: &[("device", 8), ("sub_device", 8), ("function", 8)],
    checksum_hooks: &[(function_checksum, "f_checksum")],
    repeat_policy: RepeatPolicy::RepeatFrame,
    repeat_timeout_us: 0,
};
