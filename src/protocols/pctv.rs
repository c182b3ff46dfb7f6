//! PCTV: lsb pulse-count, one duration per bit (no mark/space pairing).
//!
//! Grounded on `pctv.py`: `{38.4k,832,lsb}<-1|1>(2,-8,1,D:8,F:8,2,-100m)`.
//! `<-1|1>` is a single-duration-per-bit scheme — a negative unit is bit 0,
//! a positive unit is bit 1 — which is exactly [`BurstSet::PulseCount`]
//! with `mark_unit` and `space_unit` both magnitude 832, so this needs no
//! bespoke decode. The original source itself carries a `# TODO: finish`
//! above the class; kept here as a fully declarative protocol but worth
//! treating as less battle-tested than the others in this module.

use crate::bitfield::BitOrder;
use crate::protocol::{BurstSet, EncodeFieldSpec, FieldSpec, ProtocolDescriptor, RepeatPolicy};

const TIMING: i64 = 832;

pub static PCTV: ProtocolDescriptor = ProtocolDescriptor {
    name: "pctv",
    carrier_hz: 38400,
    bit_order: BitOrder::Lsb,
    total_bits: 16,
    tolerance_pct: 20,
    lead_in: &[TIMING * 2, -TIMING * 8, TIMING],
    lead_out: &[TIMING * 2, -100_000],
    repeat_lead_in: None,
    repeat_lead_out: None,
    bursts: BurstSet::PulseCount { mark_unit: TIMING, space_unit: -TIMING },
    middle_timings: &[],
    fields: &[
        FieldSpec { name: "device", lo: 0, hi: 7 },
        FieldSpec { name: "function", lo: 8, hi: 15 },
    ],
    encode_fields: &[
        EncodeFieldSpec { name: "device", min: 0, max: 255 },
        EncodeFieldSpec { name: "function", min: 0, max: 255 },
    ],
    code_order: &[("device", 8), ("function", 8)],
    checksum_hooks: &[],
    repeat_policy: RepeatPolicy::Normal,
    repeat_timeout_us: 0,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{DeclarativeProtocol, Protocol};
    use crate::session::{DecodeOutcome, DecodeSession};
    use std::collections::HashMap;

    #[test]
    fn encode_then_decode_round_trips() {
        let protocol = DeclarativeProtocol(&PCTV);
        let mut args = HashMap::new();
        args.insert("device", 238u64);
        args.insert("function", 121u64);
        let code = protocol.encode(&args).unwrap();
        let mut session = DecodeSession::new();
        let outcome = protocol.decode(code.raw_rlc(), PCTV.carrier_hz, &mut session, 0).unwrap();
        match outcome {
            DecodeOutcome::Code(decoded) => {
                assert_eq!(decoded.field("device"), Some(238));
                assert_eq!(decoded.field("function"), Some(121));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn matches_original_test_vector() {
        let protocol = DeclarativeProtocol(&PCTV);
        let rlc = vec![1664, -6656, 832, -832, 2496, -832, 3328, -1664, 3328, -832, 1664, -100000];
        let mut session = DecodeSession::new();
        let outcome = protocol.decode(&rlc, PCTV.carrier_hz, &mut session, 0).unwrap();
        match outcome {
            DecodeOutcome::Code(code) => {
                assert_eq!(code.field("device"), Some(238));
                assert_eq!(code.field("function"), Some(121));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
