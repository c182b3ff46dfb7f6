//! RC6-M32 (mode-6 variant): MSB Manchester body with one double-width
//! toggle symbol, plus a mode/OEM1 collision guard against RC6-M56.
//!
//! Grounded on `rc6m32.py`: `{36k,444,msb}<-1,1|1,-1>(6,-2,1:1,M:3,
//! <-2,2|2,-2>(1-(T:1)),OEM1:8,OEM2:8,D:8,F:8,^107m)*`. The toggle symbol's
//! burst pair is twice the width of every other bit, which is a genuine
//! single double-width pulse rather than a wire-merge of two same-sign
//! half-cells — [`crate::stream_decoder::HalfCellFeed::next`] would
//! misinterpret it as the latter, so this protocol reads it with
//! [`crate::stream_decoder::HalfCellFeed::next_raw`] instead and otherwise
//! walks the body by hand.

use std::collections::HashMap;

use crate::bitfield::{BitFieldInt, BitOrder};
use crate::error::{IrError, Result};
use crate::ir_code::IrCode;
use crate::protocol::{BurstSet, EncodeFieldSpec, FieldMap, FieldSpec, Protocol, ProtocolDescriptor, RepeatPolicy, OPEN_TAIL};
use crate::session::{build_code, frame_duration_us, repeat_timeout_us, DecodeOutcome, DecodeSession};
use crate::stream_decoder::{lookup_pair, trim_frame, HalfCellFeed};
use crate::timing::matches_pair;
use crate::vocab::merge_same_sign;

const TIMING: i64 = 444;
const BURSTS: &[(i64, i64)] = &[(-TIMING, TIMING), (TIMING, -TIMING)];

static DESCRIPTOR: ProtocolDescriptor = ProtocolDescriptor {
    name: "rc6m32",
    carrier_hz: 36000,
    bit_order: BitOrder::Msb,
    total_bits: 37,
    tolerance_pct: 20,
    lead_in: &[TIMING * 6, -TIMING * 2],
    lead_out: &[OPEN_TAIL],
    repeat_lead_in: None,
    repeat_lead_out: None,
    bursts: BurstSet::Pairs(BURSTS),
    middle_timings: &[],
    fields: &[
        FieldSpec { name: "c0", lo: 0, hi: 0 },
        FieldSpec { name: "mode", lo: 1, hi: 3 },
        FieldSpec { name: "toggle", lo: 4, hi: 4 },
        FieldSpec { name: "oem1", lo: 5, hi: 12 },
        FieldSpec { name: "oem2", lo: 13, hi: 20 },
        FieldSpec { name: "device", lo: 21, hi: 28 },
        FieldSpec { name: "function", lo: 29, hi: 36 },
    ],
    encode_fields: &[
        EncodeFieldSpec { name: "mode", min: 0, max: 7 },
        EncodeFieldSpec { name: "oem1", min: 0, max: 255 },
        EncodeFieldSpec { name: "oem2", min: 0, max: 255 },
        EncodeFieldSpec { name: "device", min: 0, max: 255 },
        EncodeFieldSpec { name: "function", min: 0, max: 255 },
    ],
    code_order: &[("mode", 3), ("oem1", 8), ("oem2", 8), ("device", 8), ("function", 8)],
    checksum_hooks: &[],
    repeat_policy: RepeatPolicy::MutatingLeadOut,
    repeat_timeout_us: 0,
};

fn decode_body(body: &[i64], tol: u32) -> Result<FieldMap> {
    let mut feed = HalfCellFeed::new(body);
    let mut fields = FieldMap::new();

    let mut head_bits = Vec::with_capacity(4);
    for pair_idx in 0..4u32 {
        let c1 = feed.next(TIMING).ok_or(IrError::IRStreamError("rc6m32 body too short for header".into()))?;
        let c2 = feed.next(TIMING).ok_or(IrError::IRStreamError("rc6m32 body too short for header".into()))?;
        let idx = lookup_pair((c1, c2), BURSTS, &[], pair_idx, tol)?;
        head_bits.push(idx as u8);
    }
    fields.insert("c0", BitFieldInt::from_bits(&head_bits[0..1], BitOrder::Msb));
    fields.insert("mode", BitFieldInt::from_bits(&head_bits[1..4], BitOrder::Msb));

    let t1 = feed.next_raw().ok_or(IrError::IRStreamError("rc6m32 body truncated at toggle".into()))?;
    let t2 = feed.next_raw().ok_or(IrError::IRStreamError("rc6m32 body truncated at toggle".into()))?;
    let toggle = if matches_pair((t1, t2), (-TIMING * 2, TIMING * 2), tol) {
        0u8
    } else if matches_pair((t1, t2), (TIMING * 2, -TIMING * 2), tol) {
        1u8
    } else {
        return Err(IrError::IRStreamError(format!("rc6m32 toggle symbol ({t1}, {t2}) matches neither polarity")));
    };
    fields.insert("toggle", BitFieldInt::new(toggle as u64, 1));

    let mut tail_bits = Vec::with_capacity(32);
    for pair_idx in 5..37u32 {
        let c1 = feed.next(TIMING).ok_or(IrError::IRStreamError("rc6m32 body too short for payload".into()))?;
        let c2 = feed.next(TIMING).ok_or(IrError::IRStreamError("rc6m32 body too short for payload".into()))?;
        let idx = lookup_pair((c1, c2), BURSTS, &[], pair_idx, tol)?;
        tail_bits.push(idx as u8);
    }
    fields.insert("oem1", BitFieldInt::from_bits(&tail_bits[0..8], BitOrder::Msb));
    fields.insert("oem2", BitFieldInt::from_bits(&tail_bits[8..16], BitOrder::Msb));
    fields.insert("device", BitFieldInt::from_bits(&tail_bits[16..24], BitOrder::Msb));
    fields.insert("function", BitFieldInt::from_bits(&tail_bits[24..32], BitOrder::Msb));

    if feed.next_raw().is_some() {
        return Err(IrError::IRStreamError("rc6m32 body longer than 37 bits".into()));
    }
    Ok(fields)
}

fn validate(fields: &FieldMap) -> Result<()> {
    let get = |name| fields.get(name).map(|b| b.value()).unwrap_or(0);
    if get("c0") != 1 {
        return Err(IrError::DecodeError("rc6m32 checksum failed".into()));
    }
    if get("mode") == 6 && get("oem1") == 128 {
        return Err(IrError::DecodeError("rc6m32: this is an RC6-M56 frame".into()));
    }
    Ok(())
}

/// `encode()` sends one primary frame per repeat plus a final lead-out
/// frame with the toggle bit inverted, all part of a single hardware
/// button hold (`rc6m32.py`'s `packet`/`lead_out` pair). Recognising that
/// trailing frame as a continuation of the held code — rather than a
/// fresh key press — means comparing every field except `toggle`.
fn same_transmission(a: &FieldMap, b: &FieldMap) -> bool {
    a.len() == b.len()
        && a.iter().all(|(k, v)| *k == "toggle" || b.get(k) == Some(v))
        && b.iter().all(|(k, v)| *k == "toggle" || a.get(k) == Some(v))
}

pub struct Rc6M32;

impl Protocol for Rc6M32 {
    fn descriptor(&self) -> &'static ProtocolDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, rlc: &[i64], frequency_hz: u32, session: &mut DecodeSession, now_us: u64) -> Result<DecodeOutcome> {
        let (body, open_tail) = trim_frame(rlc, DESCRIPTOR.lead_in, DESCRIPTOR.lead_out, &DESCRIPTOR.bursts, &[], DESCRIPTOR.tolerance_pct)?;
        let fields = decode_body(&body, DESCRIPTOR.tolerance_pct)?;
        validate(&fields)?;

        let mut full_rlc = rlc.to_vec();
        full_rlc.extend(open_tail);
        let timeout_us = repeat_timeout_us(&DESCRIPTOR, frame_duration_us(&full_rlc));

        if let Some(held) = session.held_code() {
            if same_transmission(held.fields(), &fields) {
                session.touch_held(now_us, timeout_us);
                return Ok(DecodeOutcome::RepeatOut);
            }
        }
        let code = build_code(&DESCRIPTOR, frequency_hz, fields, &full_rlc);
        session.set_held(code.clone(), now_us, timeout_us);
        Ok(DecodeOutcome::Code(code))
    }

    fn encode(&self, args: &HashMap<&str, u64>) -> Result<IrCode> {
        for spec in DESCRIPTOR.encode_fields {
            let value = *args.get(spec.name).ok_or_else(|| IrError::UnknownField(spec.name.to_string()))?;
            DESCRIPTOR.check_range(spec.name, value)?;
        }
        let mode = args["mode"];
        let oem1 = args["oem1"];
        let oem2 = args["oem2"];
        let device = args["device"];
        let function = args["function"];
        let toggle = args.get("toggle").copied().unwrap_or(0) & 1;

        let mut fields = FieldMap::new();
        fields.insert("c0", BitFieldInt::new(1, 1));
        fields.insert("mode", BitFieldInt::new(mode, 3));
        fields.insert("toggle", BitFieldInt::new(toggle, 1));
        fields.insert("oem1", BitFieldInt::new(oem1, 8));
        fields.insert("oem2", BitFieldInt::new(oem2, 8));
        fields.insert("device", BitFieldInt::new(device, 8));
        fields.insert("function", BitFieldInt::new(function, 8));

        let mut head_bits = Vec::with_capacity(4);
        head_bits.extend(BitFieldInt::new(1, 1).emission_order(BitOrder::Msb));
        head_bits.extend(BitFieldInt::new(mode, 3).emission_order(BitOrder::Msb));
        let mut tail_bits = Vec::with_capacity(32);
        tail_bits.extend(BitFieldInt::new(oem1, 8).emission_order(BitOrder::Msb));
        tail_bits.extend(BitFieldInt::new(oem2, 8).emission_order(BitOrder::Msb));
        tail_bits.extend(BitFieldInt::new(device, 8).emission_order(BitOrder::Msb));
        tail_bits.extend(BitFieldInt::new(function, 8).emission_order(BitOrder::Msb));

        let mut body = Vec::new();
        for bit in &head_bits {
            let (m, s) = BURSTS[*bit as usize];
            body.push(m);
            body.push(s);
        }
        body.push(if toggle == 0 { -TIMING * 2 } else { TIMING * 2 });
        body.push(if toggle == 0 { TIMING * 2 } else { -TIMING * 2 });
        for bit in &tail_bits {
            let (m, s) = BURSTS[*bit as usize];
            body.push(m);
            body.push(s);
        }

        let lead_out: Vec<i64> = vec![-100_000];
        let mut full = Vec::with_capacity(DESCRIPTOR.lead_in.len() + body.len() + lead_out.len());
        full.extend_from_slice(DESCRIPTOR.lead_in);
        full.extend(body);
        full.extend(lead_out);
        let rlc = merge_same_sign(&full);

        Ok(IrCode::new(DESCRIPTOR.name, DESCRIPTOR.carrier_hz, fields, DESCRIPTOR.code_order, vec![rlc]))
    }
}
