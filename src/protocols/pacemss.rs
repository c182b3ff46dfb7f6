//! PaceMSS: msb half-bit, no checksum, three plain fields.
//!
//! Grounded on `pacemss.py`: `{38k,630,msb}<1,-7|1,-11>(1,-5,1,-5,T:1,D:1,
//! F:8,1,^120m)*`. No checksum field and no dedicated repeat frame, so this
//! is a fully declarative protocol.

use crate::bitfield::BitOrder;
use crate::protocol::{BurstSet, EncodeFieldSpec, FieldSpec, ProtocolDescriptor, RepeatPolicy, OPEN_TAIL};

const TIMING: i64 = 630;
const BURSTS: &[(i64, i64)] = &[(TIMING, -TIMING * 7), (TIMING, -TIMING * 11)];

pub static PACEMSS: ProtocolDescriptor = ProtocolDescriptor {
    name: "pacemss",
    carrier_hz: 38000,
    bit_order: BitOrder::Msb,
    total_bits: 10,
    tolerance_pct: 20,
    lead_in: &[TIMING, -TIMING * 5, TIMING, -TIMING * 5],
    lead_out: &[TIMING, OPEN_TAIL],
    repeat_lead_in: None,
    repeat_lead_out: None,
    bursts: BurstSet::Pairs(BURSTS),
    middle_timings: &[],
    fields: &[
        FieldSpec { name: "toggle", lo: 0, hi: 0 },
        FieldSpec { name: "device", lo: 1, hi: 1 },
        FieldSpec { name: "function", lo: 2, hi: 9 },
    ],
    encode_fields: &[
        EncodeFieldSpec { name: "device", min: 0, max: 1 },
        EncodeFieldSpec { name: "function", min: 0, max: 255 },
        EncodeFieldSpec { name: "toggle", min: 0, max: 1 },
    ],
    code_order: &[("device", 1), ("function", 8), ("toggle", 1)],
    checksum_hooks: &[],
    repeat_policy: RepeatPolicy::Normal,
    repeat_timeout_us: 0,
};
