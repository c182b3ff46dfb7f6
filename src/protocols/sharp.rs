//! Sharp: lsb half-bit, two 15-bit groups separated by a literal
//! non-bit-carrying gap, the second group repeating `device` and carrying
//! an inverted-function checksum.
//!
//! Grounded on `sharp.py`: `{38k,264,lsb}<1,-3|1,-7>(D:5,F:8,1:2,1,-165,
//! D:5,~F:8,2:2,1,-165)*`. The `1,-165` between the two groups is a fixed
//! gap, not a position-dependent burst variant, so it can't be expressed
//! via [`crate::protocol::MiddleTiming`] (that models a burst table
//! override at a bit position, not an extra non-bit gap spliced into the
//! stream) — this protocol walks its body by hand instead.

use std::collections::HashMap;

use itertools::Itertools;

use crate::bitfield::{BitFieldInt, BitOrder};
use crate::error::{IrError, Result};
use crate::ir_code::IrCode;
use crate::protocol::{BurstSet, EncodeFieldSpec, FieldMap, Protocol, ProtocolDescriptor, RepeatPolicy};
use crate::packet_builder::build_body;
use crate::session::{build_code, frame_duration_us, repeat_timeout_us, DecodeOutcome, DecodeSession};
use crate::stream_decoder::{lookup_pair, trim_frame};
use crate::timing::matches_pair;
use crate::vocab::merge_same_sign;

const TIMING: i64 = 264;
const BURSTS: &[(i64, i64)] = &[(TIMING, -TIMING * 3), (TIMING, -TIMING * 7)];
const GAP: (i64, i64) = (TIMING, -TIMING * 165);

static DESCRIPTOR: ProtocolDescriptor = ProtocolDescriptor {
    name: "sharp",
    carrier_hz: 38000,
    bit_order: BitOrder::Lsb,
    total_bits: 30,
    tolerance_pct: 20,
    lead_in: &[],
    lead_out: &[TIMING, -TIMING * 165],
    repeat_lead_in: None,
    repeat_lead_out: None,
    bursts: BurstSet::Pairs(BURSTS),
    middle_timings: &[],
    fields: &[],
    encode_fields: &[
        EncodeFieldSpec { name: "device", min: 0, max: 31 },
        EncodeFieldSpec { name: "function", min: 0, max: 255 },
    ],
    code_order: &[("device", 5), ("function", 8)],
    checksum_hooks: &[],
    repeat_policy: RepeatPolicy::Normal,
    repeat_timeout_us: 0,
};

fn decode_group(body: &[i64], tol: u32) -> Result<Vec<u8>> {
    let mut bits = Vec::with_capacity(body.len() / 2);
    for (pair_idx, (mark, space)) in body.iter().copied().tuples().enumerate() {
        let idx = lookup_pair((mark, space), BURSTS, &[], pair_idx as u32, tol)?;
        bits.push(idx as u8);
    }
    Ok(bits)
}

fn function_checksum(function: u64) -> u64 {
    (!function) & 0xFF
}

pub struct Sharp;

impl Protocol for Sharp {
    fn descriptor(&self) -> &'static ProtocolDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, rlc: &[i64], frequency_hz: u32, session: &mut DecodeSession, now_us: u64) -> Result<DecodeOutcome> {
        let (body, open_tail) = trim_frame(rlc, DESCRIPTOR.lead_in, DESCRIPTOR.lead_out, &DESCRIPTOR.bursts, &[], DESCRIPTOR.tolerance_pct)?;
        if body.len() != 62 {
            return Err(IrError::IRStreamError(format!("sharp body expects 62 durations, got {}", body.len())));
        }
        let group1 = decode_group(&body[0..30], DESCRIPTOR.tolerance_pct)?;
        let gap = (body[30], body[31]);
        if !matches_pair(gap, GAP, DESCRIPTOR.tolerance_pct) {
            return Err(IrError::IRStreamError(format!("sharp mid-body gap {gap:?} does not match {GAP:?}")));
        }
        let group2 = decode_group(&body[32..62], DESCRIPTOR.tolerance_pct)?;

        let device = BitFieldInt::from_bits(&group1[0..5], BitOrder::Lsb);
        let function = BitFieldInt::from_bits(&group1[5..13], BitOrder::Lsb);
        let c0 = BitFieldInt::from_bits(&group1[13..15], BitOrder::Lsb);
        let d_checksum = BitFieldInt::from_bits(&group2[0..5], BitOrder::Lsb);
        let f_checksum = BitFieldInt::from_bits(&group2[5..13], BitOrder::Lsb);
        let c1 = BitFieldInt::from_bits(&group2[13..15], BitOrder::Lsb);

        if c0.value() != 1 || c1.value() != 2 {
            return Err(IrError::DecodeError("sharp checksum failed".into()));
        }
        if device.value() != d_checksum.value() || function_checksum(function.value()) != f_checksum.value() {
            return Err(IrError::DecodeError("sharp checksum failed".into()));
        }

        let mut fields = FieldMap::new();
        fields.insert("device", device);
        fields.insert("function", function);
        fields.insert("d_checksum", d_checksum);
        fields.insert("f_checksum", f_checksum);
        fields.insert("c0", c0);
        fields.insert("c1", c1);

        let mut full_rlc = rlc.to_vec();
        full_rlc.extend(open_tail);
        let timeout_us = repeat_timeout_us(&DESCRIPTOR, frame_duration_us(&full_rlc));
        let code = build_code(&DESCRIPTOR, frequency_hz, fields, &full_rlc);
        session.set_held(code.clone(), now_us, timeout_us);
        Ok(DecodeOutcome::Code(code))
    }

    fn encode(&self, args: &HashMap<&str, u64>) -> Result<IrCode> {
        for spec in DESCRIPTOR.encode_fields {
            let value = *args.get(spec.name).ok_or_else(|| IrError::UnknownField(spec.name.to_string()))?;
            DESCRIPTOR.check_range(spec.name, value)?;
        }
        let device = args["device"];
        let function = args["function"];
        let f_checksum = function_checksum(function);

        let mut fields = FieldMap::new();
        fields.insert("device", BitFieldInt::new(device, 5));
        fields.insert("function", BitFieldInt::new(function, 8));
        fields.insert("d_checksum", BitFieldInt::new(device, 5));
        fields.insert("f_checksum", BitFieldInt::new(f_checksum, 8));
        fields.insert("c0", BitFieldInt::new(1, 2));
        fields.insert("c1", BitFieldInt::new(2, 2));

        let mut group1_bits = Vec::with_capacity(15);
        group1_bits.extend(BitFieldInt::new(device, 5).emission_order(BitOrder::Lsb));
        group1_bits.extend(BitFieldInt::new(function, 8).emission_order(BitOrder::Lsb));
        group1_bits.extend(BitFieldInt::new(1, 2).emission_order(BitOrder::Lsb));

        let mut group2_bits = Vec::with_capacity(15);
        group2_bits.extend(BitFieldInt::new(device, 5).emission_order(BitOrder::Lsb));
        group2_bits.extend(BitFieldInt::new(f_checksum, 8).emission_order(BitOrder::Lsb));
        group2_bits.extend(BitFieldInt::new(2, 2).emission_order(BitOrder::Lsb));

        let group1 = build_body(&group1_bits, &DESCRIPTOR.bursts, DESCRIPTOR.middle_timings)?;
        let group2 = build_body(&group2_bits, &DESCRIPTOR.bursts, DESCRIPTOR.middle_timings)?;

        let mut full = Vec::new();
        full.extend(group1);
        full.push(GAP.0);
        full.push(GAP.1);
        full.extend(group2);
        full.extend_from_slice(DESCRIPTOR.lead_out);
        let rlc = merge_same_sign(&full);

        Ok(IrCode::new(DESCRIPTOR.name, DESCRIPTOR.carrier_hz, fields, DESCRIPTOR.code_order, vec![rlc]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_round_trips() {
        let mut args = HashMap::new();
        args.insert("device", 8u64);
        args.insert("function", 208u64);
        let code = Sharp.encode(&args).unwrap();
        let mut session = DecodeSession::new();
        let outcome = Sharp.decode(code.raw_rlc(), DESCRIPTOR.carrier_hz, &mut session, 0).unwrap();
        match outcome {
            DecodeOutcome::Code(decoded) => {
                assert_eq!(decoded.field("device"), Some(8));
                assert_eq!(decoded.field("function"), Some(208));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn matches_original_test_vector() {
        let rlc = vec![
            264, -792, 264, -792, 264, -792, 264, -1848, 264, -792, 264, -792, 264, -792, 264, -792, 264, -792, 264,
            -1848, 264, -792, 264, -1848, 264, -1848, 264, -1848, 264, -792, 264, -43560, 264, -792, 264, -792, 264,
            -792, 264, -1848, 264, -792, 264, -1848, 264, -1848, 264, -1848, 264, -1848, 264, -792, 264, -1848, 264,
            -792, 264, -792, 264, -792, 264, -1848, 264, -43560,
        ];
        let mut session = DecodeSession::new();
        let outcome = Sharp.decode(&rlc, DESCRIPTOR.carrier_hz, &mut session, 0).unwrap();
        match outcome {
            DecodeOutcome::Code(code) => {
                assert_eq!(code.field("device"), Some(8));
                assert_eq!(code.field("function"), Some(208));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn rejects_mismatched_device_checksum() {
        let mut fields = FieldMap::new();
        fields.insert("device", BitFieldInt::new(8, 5));
        fields.insert("function", BitFieldInt::new(208, 8));
        fields.insert("d_checksum", BitFieldInt::new(9, 5));
        fields.insert("f_checksum", BitFieldInt::new(function_checksum(208), 8));
        fields.insert("c0", BitFieldInt::new(1, 2));
        fields.insert("c1", BitFieldInt::new(2, 2));

        let mut group1_bits = Vec::with_capacity(15);
        group1_bits.extend(BitFieldInt::new(8, 5).emission_order(BitOrder::Lsb));
        group1_bits.extend(BitFieldInt::new(208, 8).emission_order(BitOrder::Lsb));
        group1_bits.extend(BitFieldInt::new(1, 2).emission_order(BitOrder::Lsb));
        let mut group2_bits = Vec::with_capacity(15);
        group2_bits.extend(BitFieldInt::new(9, 5).emission_order(BitOrder::Lsb));
        group2_bits.extend(BitFieldInt::new(function_checksum(208), 8).emission_order(BitOrder::Lsb));
        group2_bits.extend(BitFieldInt::new(2, 2).emission_order(BitOrder::Lsb));

        let group1 = build_body(&group1_bits, &DESCRIPTOR.bursts, DESCRIPTOR.middle_timings).unwrap();
        let group2 = build_body(&group2_bits, &DESCRIPTOR.bursts, DESCRIPTOR.middle_timings).unwrap();
        let mut full = Vec::new();
        full.extend(group1);
        full.push(GAP.0);
        full.push(GAP.1);
        full.extend(group2);
        full.extend_from_slice(DESCRIPTOR.lead_out);
        let rlc = merge_same_sign(&full);

        let mut session = DecodeSession::new();
        let err = Sharp.decode(&rlc, DESCRIPTOR.carrier_hz, &mut session, 0).unwrap_err();
        assert!(matches!(err, IrError::DecodeError(_)));
    }
}
