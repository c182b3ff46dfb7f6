//! Per-protocol decode session state machine (C8): toggle tracking, the
//! repeat timer, and the repeat-sentinel control-flow outcomes.

use log::{debug, trace};

use crate::bitfield::BitFieldInt;
use crate::error::{IrError, Result};
use crate::ir_code::IrCode;
use crate::protocol::{FieldMap, ProtocolDescriptor, RepeatPolicy};
use crate::stream_decoder::decode_stream;

/// What a repeat-aware decode resolved to. Distinct from [`IrError`]
/// because these are not failures: a caller using [`DecodeSession`] has
/// opted into this richer result type instead of a bare `IrCode`.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// A full, validated code.
    Code(IrCode),
    /// A "send twice" protocol's opening frame; the same code is expected
    /// again shortly to confirm it.
    RepeatIn,
    /// A mutating-lead-out protocol's second identical frame: the session
    /// already returned this code once and will not return it again
    /// unless the body genuinely changes.
    RepeatOut,
    /// The held code's repeat window has closed with no further frames;
    /// carries the code that was released so callers (and released
    /// callbacks) can act on it.
    TimedOut(IrCode),
}

struct HeldCode {
    code: IrCode,
    last_seen_us: u64,
    timeout_us: u64,
}

/// Per-protocol, per-decoder mutable state. Not `Sync`; share across
/// threads only behind external synchronisation (spec.md §5).
pub struct DecodeSession {
    held: Option<HeldCode>,
}

impl Default for DecodeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeSession {
    /// A session with no held code.
    pub fn new() -> Self {
        Self { held: None }
    }

    /// True while a code is being held for repeat/toggle tracking.
    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    /// Clear the held code if it has been idle longer than its own repeat
    /// timeout. Returns [`DecodeOutcome::TimedOut`] if a code was cleared.
    pub fn poll_timeout(&mut self, now_us: u64) -> Option<DecodeOutcome> {
        if let Some(h) = &self.held {
            if now_us.saturating_sub(h.last_seen_us) > h.timeout_us {
                trace!("decode session: held code timed out after {}us idle", h.timeout_us);
                let released = self.held.take().unwrap().code;
                return Some(DecodeOutcome::TimedOut(released));
            }
        }
        None
    }

    fn repeat_timeout_us(descriptor: &ProtocolDescriptor, frame_duration_us: u64) -> u64 {
        if descriptor.repeat_timeout_us == 0 {
            frame_duration_us
        } else {
            descriptor.repeat_timeout_us
        }
    }

    /// The currently held code, if any. Exposed for protocols (RC6-M32)
    /// whose hold/repeat comparison can't use the generic `fields_match`
    /// check as-is and need to inspect or replace the held state directly.
    pub fn held_code(&self) -> Option<&IrCode> {
        self.held.as_ref().map(|h| &h.code)
    }

    /// Replace the held code and (re)arm its idle timer.
    pub fn set_held(&mut self, code: IrCode, now_us: u64, timeout_us: u64) {
        self.held = Some(HeldCode { code, last_seen_us: now_us, timeout_us });
    }

    /// Refresh the held code's idle timer without replacing it.
    pub fn touch_held(&mut self, now_us: u64, timeout_us: u64) {
        if let Some(h) = &mut self.held {
            h.last_seen_us = now_us;
            h.timeout_us = timeout_us;
        }
    }
}

/// [`Self::repeat_timeout_us`]'s policy, exposed for protocols with a
/// bespoke decode override that still want the descriptor's declared
/// timeout semantics.
pub fn repeat_timeout_us(descriptor: &ProtocolDescriptor, frame_duration_us: u64) -> u64 {
    DecodeSession::repeat_timeout_us(descriptor, frame_duration_us)
}

fn assemble_fields(descriptor: &ProtocolDescriptor, bits: &[u8]) -> Result<FieldMap> {
    if bits.len() as u32 != descriptor.total_bits {
        return Err(IrError::IRStreamError(format!(
            "{} expects {} bits, decoded {}",
            descriptor.name,
            descriptor.total_bits,
            bits.len()
        )));
    }
    let mut fields = FieldMap::new();
    for spec in descriptor.fields {
        let slice = &bits[spec.lo as usize..=spec.hi as usize];
        fields.insert(spec.name, BitFieldInt::from_bits(slice, descriptor.bit_order));
    }
    Ok(fields)
}

fn validate_checksum(descriptor: &ProtocolDescriptor, fields: &FieldMap) -> Result<()> {
    for &(hook, field_name) in descriptor.checksum_hooks {
        let expected = hook(fields);
        let actual = fields.get(field_name).map(|b| b.value()).unwrap_or(0);
        if expected != actual {
            return Err(IrError::DecodeError(format!(
                "{} checksum mismatch: computed {expected:#x}, field {field_name} = {actual:#x}",
                descriptor.name
            )));
        }
    }
    Ok(())
}

pub(crate) fn build_code(descriptor: &ProtocolDescriptor, frequency_hz: u32, fields: FieldMap, rlc: &[i64]) -> IrCode {
    IrCode::new(descriptor.name, frequency_hz, fields, descriptor.code_order, vec![rlc.to_vec()])
}

pub(crate) fn frame_duration_us(rlc: &[i64]) -> u64 {
    rlc.iter().map(|d| d.unsigned_abs()).sum()
}

/// True if every field in `a` has a matching value in `b` (and vice
/// versa). RC6-M32 uses its own toggle-aware variant instead of this one,
/// since its toggle bit legitimately differs between a held code and its
/// repeat/lead-out frame.
pub(crate) fn fields_match(a: &FieldMap, b: &FieldMap) -> bool {
    a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
}

/// Run the default decode pipeline (stream decode, field assembly,
/// checksum validation, repeat-policy handling) for a protocol descriptor
/// with no custom override.
pub fn default_decode(
    descriptor: &ProtocolDescriptor,
    rlc: &[i64],
    frequency_hz: u32,
    session: &mut DecodeSession,
    now_us: u64,
) -> Result<DecodeOutcome> {
    if descriptor.repeat_policy == RepeatPolicy::RepeatFrame {
        if let (Some(rep_in), Some(rep_out)) = (descriptor.repeat_lead_in, descriptor.repeat_lead_out) {
            if let Ok(repeat_decoded) = decode_stream(rlc, rep_in, rep_out, &descriptor.bursts, descriptor.middle_timings, descriptor.tolerance_pct) {
                if let Some(h) = &mut session.held {
                    h.last_seen_us = now_us;
                    h.timeout_us = DecodeSession::repeat_timeout_us(descriptor, frame_duration_us(rlc) + frame_duration_us(&repeat_decoded.open_tail));
                    debug!("{}: repeat frame refreshes held code", descriptor.name);
                    return Ok(DecodeOutcome::Code(h.code.clone()));
                }
            }
        }
    }

    // A malformed or failed-checksum frame drops a HELD session straight back
    // to IDLE rather than leaving a stale `last_code` around to be compared
    // against the next, genuinely unrelated frame (spec.md §4.8).
    let decoded = match decode_stream(rlc, descriptor.lead_in, descriptor.lead_out, &descriptor.bursts, descriptor.middle_timings, descriptor.tolerance_pct) {
        Ok(d) => d,
        Err(e) => {
            session.held = None;
            return Err(e);
        }
    };
    let fields = match assemble_fields(descriptor, &decoded.bits) {
        Ok(f) => f,
        Err(e) => {
            session.held = None;
            return Err(e);
        }
    };
    if let Err(e) = validate_checksum(descriptor, &fields) {
        session.held = None;
        return Err(e);
    }

    let mut full_rlc = rlc.to_vec();
    full_rlc.extend(decoded.open_tail.iter().copied());
    let timeout_us = DecodeSession::repeat_timeout_us(descriptor, frame_duration_us(&full_rlc));

    match descriptor.repeat_policy {
        RepeatPolicy::Normal | RepeatPolicy::RepeatFrame => {
            let code = build_code(descriptor, frequency_hz, fields, &full_rlc);
            session.held = Some(HeldCode { code: code.clone(), last_seen_us: now_us, timeout_us });
            Ok(DecodeOutcome::Code(code))
        }
        RepeatPolicy::MutatingLeadOut => {
            if let Some(h) = &session.held {
                if fields_match(h.code.fields(), &fields) {
                    debug!("{}: second identical frame, reporting repeat lead-out", descriptor.name);
                    return Ok(DecodeOutcome::RepeatOut);
                }
            }
            let code = build_code(descriptor, frequency_hz, fields, &full_rlc);
            session.held = Some(HeldCode { code: code.clone(), last_seen_us: now_us, timeout_us });
            Ok(DecodeOutcome::Code(code))
        }
        RepeatPolicy::SendTwice => match session.held.take() {
            None => {
                let code = build_code(descriptor, frequency_hz, fields, &full_rlc);
                session.held = Some(HeldCode { code, last_seen_us: now_us, timeout_us });
                Ok(DecodeOutcome::RepeatIn)
            }
            Some(h) if fields_match(h.code.fields(), &fields) => Ok(DecodeOutcome::Code(h.code)),
            Some(_) => {
                let code = build_code(descriptor, frequency_hz, fields, &full_rlc);
                session.held = Some(HeldCode { code, last_seen_us: now_us, timeout_us });
                Ok(DecodeOutcome::RepeatIn)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitfield::BitOrder;
    use crate::protocol::{BurstSet, EncodeFieldSpec, FieldSpec};

    const BURSTS: &[(i64, i64)] = &[(550, -550), (550, -1650)];

    fn descriptor(repeat_policy: RepeatPolicy) -> ProtocolDescriptor {
        ProtocolDescriptor {
            name: "test-normal",
            carrier_hz: 38000,
            bit_order: BitOrder::Msb,
            total_bits: 4,
            tolerance_pct: 20,
            lead_in: &[8800, -4400],
            lead_out: &[550, -23100],
            repeat_lead_in: None,
            repeat_lead_out: None,
            bursts: BurstSet::Pairs(BURSTS),
            middle_timings: &[],
            fields: &[FieldSpec { name: "device", lo: 0, hi: 3 }],
            encode_fields: &[EncodeFieldSpec { name: "device", min: 0, max: 15 }],
            code_order: &[("device", 4)],
            checksum_hooks: &[],
            repeat_policy,
            repeat_timeout_us: 0,
        }
    }

    fn sample_rlc() -> Vec<i64> {
        let mut rlc = vec![8800, -4400];
        rlc.extend([550, -1650, 550, -1650, 550, -1650, 550, -1650]);
        rlc.extend([550, -23100]);
        rlc
    }

    #[test]
    fn normal_policy_decodes_every_frame_independently() {
        let d = descriptor(RepeatPolicy::Normal);
        let mut session = DecodeSession::new();
        let outcome = default_decode(&d, &sample_rlc(), 38000, &mut session, 0).unwrap();
        match outcome {
            DecodeOutcome::Code(code) => assert_eq!(code.field("device"), Some(0b1111)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn send_twice_requires_two_matching_frames() {
        let d = descriptor(RepeatPolicy::SendTwice);
        let mut session = DecodeSession::new();
        let first = default_decode(&d, &sample_rlc(), 38000, &mut session, 0).unwrap();
        assert_eq!(first, DecodeOutcome::RepeatIn);
        let second = default_decode(&d, &sample_rlc(), 38000, &mut session, 100).unwrap();
        assert!(matches!(second, DecodeOutcome::Code(_)));
    }

    #[test]
    fn mutating_lead_out_flags_second_identical_frame() {
        let d = descriptor(RepeatPolicy::MutatingLeadOut);
        let mut session = DecodeSession::new();
        let first = default_decode(&d, &sample_rlc(), 38000, &mut session, 0).unwrap();
        assert!(matches!(first, DecodeOutcome::Code(_)));
        let second = default_decode(&d, &sample_rlc(), 38000, &mut session, 100).unwrap();
        assert_eq!(second, DecodeOutcome::RepeatOut);
    }

    #[test]
    fn decode_failure_releases_a_held_code_back_to_idle() {
        let d = descriptor(RepeatPolicy::Normal);
        let mut session = DecodeSession::new();
        default_decode(&d, &sample_rlc(), 38000, &mut session, 0).unwrap();
        assert!(session.is_holding());

        // A bogus frame (bad lead-in) fails decode_stream and must drop the
        // hold, not leave the previous code's state lying around.
        let bogus = vec![1, -1, 1, -1];
        let outcome = default_decode(&d, &bogus, 38000, &mut session, 100);
        assert!(outcome.is_err());
        assert!(!session.is_holding());
    }

    #[test]
    fn poll_timeout_clears_held_code_after_idle_window() {
        let d = descriptor(RepeatPolicy::Normal);
        let mut session = DecodeSession::new();
        default_decode(&d, &sample_rlc(), 38000, &mut session, 0).unwrap();
        assert!(session.is_holding());
        let outcome = session.poll_timeout(1_000_000);
        assert!(matches!(outcome, Some(DecodeOutcome::TimedOut(ref code)) if code.field("device") == Some(0b1111)));
        assert!(!session.is_holding());
    }
}
