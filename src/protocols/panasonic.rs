//! Panasonic: lsb half-bit, XOR checksum plus two static "vendor id" bytes.
//!
//! Grounded on `panasonic.py`: `{37k,432,lsb}<1,-1|1,-3>(8,-4,2:8,32:8,D:8,
//! S:8,F:8,(D^S^F):8,1,-173)*`. The two leading constant bytes (`C0=2`,
//! `C1=32`) aren't expressible as a checksum hook (they don't derive from
//! any other field), so this protocol overrides [`Protocol::decode`] to
//! add that check on top of the generic pipeline.

use std::collections::HashMap;

use crate::bitfield::BitOrder;
use crate::error::{IrError, Result};
use crate::ir_code::IrCode;
use crate::protocol::{default_encode, BurstSet, EncodeFieldSpec, FieldMap, FieldSpec, Protocol, ProtocolDescriptor, RepeatPolicy};
use crate::session::{default_decode, DecodeOutcome, DecodeSession};
use crate::vocab::xor_fold;

const TIMING: i64 = 432;
const BURSTS: &[(i64, i64)] = &[(TIMING, -TIMING), (TIMING, -TIMING * 3)];
const VENDOR_C0: u64 = 2;
const VENDOR_C1: u64 = 32;

fn checksum(fields: &FieldMap) -> u64 {
    let get = |name| fields.get(name).map(|b| b.value()).unwrap_or(0);
    xor_fold([get("device"), get("sub_device"), get("function")])
}

static DESCRIPTOR: ProtocolDescriptor = ProtocolDescriptor {
    name: "panasonic",
    carrier_hz: 37000,
    bit_order: BitOrder::Lsb,
    total_bits: 48,
    tolerance_pct: 20,
    lead_in: &[TIMING * 8, -TIMING * 4],
    lead_out: &[TIMING, -TIMING * 173],
    repeat_lead_in: None,
    repeat_lead_out: None,
    bursts: BurstSet::Pairs(BURSTS),
    middle_timings: &[],
    fields: &[
        FieldSpec { name: "vendor_id_0", lo: 0, hi: 7 },
        FieldSpec { name: "vendor_id_1", lo: 8, hi: 15 },
        FieldSpec { name: "device", lo: 16, hi: 23 },
        FieldSpec { name: "sub_device", lo: 24, hi: 31 },
        FieldSpec { name: "function", lo: 32, hi: 39 },
        FieldSpec { name: "checksum", lo: 40, hi: 47 },
    ],
    encode_fields: &[
        EncodeFieldSpec { name: "device", min: 0, max: 255 },
        EncodeFieldSpec { name: "sub_device", min: 0, max: 255 },
        EncodeFieldSpec { name: "function", min: 0, max: 255 },
    ],
    code_order: &[("device", 8), ("sub_device", 8), ("function", 8)],
    checksum_hooks: &[(checksum, "checksum")],
    repeat_policy: RepeatPolicy::Normal,
    repeat_timeout_us: 0,
};

/// Panasonic's [`Protocol`]: the generic descriptor pipeline plus the
/// `vendor_id_0 == 2 && vendor_id_1 == 32` guard.
pub struct Panasonic;

impl Protocol for Panasonic {
    fn descriptor(&self) -> &'static ProtocolDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, rlc: &[i64], frequency_hz: u32, session: &mut DecodeSession, now_us: u64) -> Result<DecodeOutcome> {
        let outcome = default_decode(&DESCRIPTOR, rlc, frequency_hz, session, now_us)?;
        if let DecodeOutcome::Code(code) = &outcome {
            if code.field("vendor_id_0") != Some(VENDOR_C0) || code.field("vendor_id_1") != Some(VENDOR_C1) {
                return Err(IrError::DecodeError("panasonic vendor id mismatch".into()));
            }
        }
        Ok(outcome)
    }

    fn encode(&self, args: &HashMap<&str, u64>) -> Result<IrCode> {
        let mut args = args.clone();
        args.insert("vendor_id_0", VENDOR_C0);
        args.insert("vendor_id_1", VENDOR_C1);
        default_encode(&DESCRIPTOR, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_via_custom_encode_and_decode() {
        let mut args = HashMap::new();
        args.insert("device", 248u64);
        args.insert("sub_device", 173u64);
        args.insert("function", 176u64);
        let code = Panasonic.encode(&args).unwrap();
        let mut session = DecodeSession::new();
        let outcome = Panasonic.decode(code.raw_rlc(), DESCRIPTOR.carrier_hz, &mut session, 0).unwrap();
        match outcome {
            DecodeOutcome::Code(decoded) => {
                assert_eq!(decoded.field("device"), Some(248));
                assert_eq!(decoded.field("sub_device"), Some(173));
                assert_eq!(decoded.field("function"), Some(176));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn matches_original_test_vector() {
        let rlc = vec![
            3456, -1728, 432, -432, 432, -1296, 432, -432, 432, -432, 432, -432, 432, -432, 432, -432, 432, -432,
            432, -432, 432, -432, 432, -432, 432, -432, 432, -432, 432, -1296, 432, -432, 432, -432, 432, -432, 432,
            -432, 432, -432, 432, -1296, 432, -1296, 432, -1296, 432, -1296, 432, -1296, 432, -1296, 432, -432, 432,
            -1296, 432, -1296, 432, -432, 432, -1296, 432, -432, 432, -1296, 432, -432, 432, -432, 432, -432, 432,
            -432, 432, -1296, 432, -1296, 432, -432, 432, -1296, 432, -1296, 432, -432, 432, -1296, 432, -432, 432,
            -432, 432, -1296, 432, -1296, 432, -1296, 432, -74736,
        ];
        let mut session = DecodeSession::new();
        let outcome = Panasonic.decode(&rlc, DESCRIPTOR.carrier_hz, &mut session, 0).unwrap();
        match outcome {
            DecodeOutcome::Code(code) => {
                assert_eq!(code.field("device"), Some(248));
                assert_eq!(code.field("function"), Some(176));
                assert_eq!(code.field("sub_device"), Some(173));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn rejects_vendor_id_mismatch() {
        let mut args = HashMap::new();
        args.insert("device", 1u64);
        args.insert("sub_device", 1u64);
        args.insert("function", 1u64);
        args.insert("vendor_id_0", 9u64);
        let code = default_encode(&DESCRIPTOR, &args).unwrap();
        let mut session = DecodeSession::new();
        let err = Panasonic.decode(code.raw_rlc(), DESCRIPTOR.carrier_hz, &mut session, 0).unwrap_err();
        assert!(matches!(err, IrError::DecodeError(_)));
    }
}
