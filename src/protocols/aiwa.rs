//! Aiwa: lsb half-bit, three independent inverted-field checksums.
//!
//! Grounded on `aiwa.py`: `{38.123k,550,lsb}<1,-1|1,-3>(16,-8,D:8,S:5,~D:8,
//! ~S:5,F:8,~F:8,1,-42,(16,-8,1,-165)*)`.

use crate::bitfield::BitOrder;
use crate::protocol::{BurstSet, EncodeFieldSpec, FieldMap, FieldSpec, ProtocolDescriptor, RepeatPolicy};

const TIMING: i64 = 550;
const BURSTS: &[(i64, i64)] = &[(TIMING, -TIMING), (TIMING, -TIMING * 3)];

fn invert(fields: &FieldMap, name: &'static str, width: u32) -> u64 {
    let value = fields.get(name).map(|b| b.value()).unwrap_or(0);
    (!value) & ((1u64 << width) - 1)
}

fn device_checksum(fields: &FieldMap) -> u64 {
    invert(fields, "device", 8)
}

fn sub_device_checksum(fields: &FieldMap) -> u64 {
    invert(fields, "sub_device", 5)
}

fn function_checksum(fields: &FieldMap) -> u64 {
    invert(fields, "function", 8)
}

pub static AIWA: ProtocolDescriptor = ProtocolDescriptor {
    name: "aiwa",
    carrier_hz: 38123,
    bit_order: BitOrder::Lsb,
    total_bits: 42,
    tolerance_pct: 20,
    lead_in: &[TIMING * 16, -TIMING * 8],
    lead_out: &[TIMING, -TIMING * 42],
    repeat_lead_in: Some(&[TIMING * 16, -TIMING * 8]),
    repeat_lead_out: Some(&[TIMING, -TIMING * 165]),
    bursts: BurstSet::Pairs(BURSTS),
    middle_timings: &[],
    fields: &[
        FieldSpec { name: "device", lo: 0, hi: 7 },
        FieldSpec { name: "sub_device", lo: 8, hi: 12 },
        FieldSpec { name: "device_checksum", lo: 13, hi: 20 },
        FieldSpec { name: "sub_device_checksum", lo: 21, hi: 25 },
        FieldSpec { name: "function", lo: 26, hi: 33 },
        FieldSpec { name: "function_checksum", lo: 34, hi: 41 },
    ],
    encode_fields: &[
        EncodeFieldSpec { name: "device", min: 0, max: 255 },
        EncodeFieldSpec { name: "sub_device", min: 0, max: 31 },
        EncodeFieldSpec { name: "function", min: 0, max: 255 },
    ],
    code_order: &[("device", 8), ("sub_device", 5), ("function", 8)],
    checksum_hooks: &[
        (device_checksum, "device_checksum"),
        (sub_device_checksum, "sub_device_checksum"),
        (function_checksum, "function_checksum"),
    ],
    repeat_policy: RepeatPolicy::RepeatFrame,
    repeat_timeout_us: 0,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{DeclarativeProtocol, Protocol};
    use crate::session::{DecodeOutcome, DecodeSession};
    use std::collections::HashMap;

    #[test]
    fn encode_then_decode_round_trips_device_sub_device_function() {
        let protocol = DeclarativeProtocol(&AIWA);
        let mut args = HashMap::new();
        args.insert("device", 34u64);
        args.insert("sub_device", 17u64);
        args.insert("function", 14u64);
        let code = protocol.encode(&args).unwrap();
        let mut session = DecodeSession::new();
        let outcome = protocol.decode(code.raw_rlc(), AIWA.carrier_hz, &mut session, 0).unwrap();
        match outcome {
            DecodeOutcome::Code(decoded) => {
                assert_eq!(decoded.field("device"), Some(34));
                assert_eq!(decoded.field("sub_device"), Some(17));
                assert_eq!(decoded.field("function"), Some(14));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn matches_original_test_vector() {
        let rlc = vec![
            8800, -4400, 550, -550, 550, -1650, 550, -550, 550, -550, 550, -550, 550, -1650, 550, -550, 550, -550,
            550, -1650, 550, -550, 550, -550, 550, -550, 550, -1650, 550, -1650, 550, -550, 550, -1650, 550, -1650,
            550, -1650, 550, -550, 550, -1650, 550, -1650, 550, -550, 550, -1650, 550, -1650, 550, -1650, 550, -550,
            550, -550, 550, -1650, 550, -1650, 550, -1650, 550, -550, 550, -550, 550, -550, 550, -550, 550, -1650,
            550, -550, 550, -550, 550, -550, 550, -1650, 550, -1650, 550, -1650, 550, -1650, 550, -23100,
        ];
        let protocol = DeclarativeProtocol(&AIWA);
        let mut session = DecodeSession::new();
        let outcome = protocol.decode(&rlc, AIWA.carrier_hz, &mut session, 0).unwrap();
        match outcome {
            DecodeOutcome::Code(code) => {
                assert_eq!(code.field("device"), Some(34));
                assert_eq!(code.field("function"), Some(14));
                assert_eq!(code.field("sub_device"), Some(17));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
