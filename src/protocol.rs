//! The protocol specification model (C6): a declarative descriptor plus the
//! decode/encode hooks each concrete protocol instantiates.

use std::collections::{BTreeMap, HashMap};

use crate::bitfield::{BitFieldInt, BitOrder};
use crate::error::{IrError, Result};
use crate::ir_code::IrCode;
use crate::packet_builder::build_rlc;
use crate::session::{default_decode, DecodeOutcome, DecodeSession};

/// Sentinel lead-out duration meaning "no fixed tail — accept whatever
/// remains and compute its length from the total duration budget".
pub const OPEN_TAIL: i64 = -999_999_999_999;

/// How a protocol's `bursts` table encodes bit values, per spec.md §4.4.
#[derive(Debug, Clone, Copy)]
pub enum BurstSet {
    /// N consecutive marks/spaces of `mark_unit`/`space_unit` = value N.
    PulseCount { mark_unit: i64, space_unit: i64 },
    /// Burst-pair templates: 2 entries -> 1 bit/pair, 4 -> 2 bits/pair, 16
    /// -> 4 bits/pair.
    Pairs(&'static [(i64, i64)]),
}

/// A timing that only occurs at specific bit positions, used by protocols
/// with an irregular symbol in the middle of an otherwise uniform body
/// (e.g. RC6's double-width toggle bit).
#[derive(Debug, Clone, Copy)]
pub enum MiddleTiming {
    /// Applies at any bit-pair position.
    Plain(i64, i64),
    /// Applies only while the current bit-pair index falls in
    /// `[start, stop]` inclusive.
    Ranged {
        /// First bit-pair index (inclusive) this applies to.
        start: u32,
        /// Last bit-pair index (inclusive) this applies to.
        stop: u32,
        /// Burst-pair templates used instead of the protocol's `bursts`
        /// while in range.
        bursts: &'static [(i64, i64)],
    },
}

/// One `(name, lo_bit, hi_bit)` entry of a protocol's field layout. Bit
/// numbering is inclusive of both ends and measured from bit 0 = first
/// bit assembled from the decoded bit list (see [`BitFieldInt::from_bits`]).
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name, as used in [`crate::ir_code::IrCode::field`].
    pub name: &'static str,
    /// Lowest bit index (inclusive).
    pub lo: u32,
    /// Highest bit index (inclusive).
    pub hi: u32,
}

impl FieldSpec {
    /// Width in bits.
    pub const fn width(&self) -> u32 {
        self.hi - self.lo + 1
    }
}

/// One `(arg_name, min, max)` entry of a protocol's public encode API.
#[derive(Debug, Clone, Copy)]
pub struct EncodeFieldSpec {
    /// Argument name, as used in [`crate::protocol::Protocol::encode`].
    pub name: &'static str,
    /// Inclusive minimum accepted value.
    pub min: u64,
    /// Inclusive maximum accepted value.
    pub max: u64,
}

/// How a protocol's decode session handles repeats (C8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPolicy {
    /// No special repeat framing beyond the generic toggle/idle-timeout
    /// session machinery.
    Normal,
    /// A distinct, shorter repeat frame exists (`repeat_lead_in`/
    /// `repeat_lead_out`); a matching repeat frame restarts the idle timer
    /// and returns the held code without re-running checksum validation.
    RepeatFrame,
    /// The descriptor's lead-out is swapped between a "command" shape and
    /// a "repeat sentinel" shape across successive calls; a second
    /// identical frame raises [`crate::session::DecodeOutcome::RepeatOut`]
    /// instead of a code (RC6-M32 style).
    MutatingLeadOut,
    /// Two-frame "send twice" protocols: the first frame always raises
    /// [`crate::session::DecodeOutcome::RepeatIn`]; the second resolves to
    /// the real code.
    SendTwice,
}

/// Field name to decoded value. Checksum hooks and `IrCode` both key off
/// this map.
pub type FieldMap = BTreeMap<&'static str, BitFieldInt>;

/// A pure function computing a checksum (or any derived field) from the
/// already-decoded fields.
pub type ChecksumHook = fn(&FieldMap) -> u64;

/// One `(hook, field_name)` pair: `hook` computes the expected value of
/// the field named `field_name`, consulted on both decode (validation)
/// and encode (fill). Most protocols declare zero or one; Aiwa declares
/// three independent inverted-field checksums.
pub type ChecksumEntry = (ChecksumHook, &'static str);

/// The declarative description of one IR protocol (C6). Constructed once
/// as a `'static` value; immutable thereafter and freely shared across
/// sessions.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolDescriptor {
    /// Protocol name, used by the registry and by `encode()`.
    pub name: &'static str,
    /// Nominal carrier frequency in Hz. 0 = unspecified (38kHz is used for
    /// Pronto output in that case).
    pub carrier_hz: u32,
    /// MSB-first or LSB-first bit ordering.
    pub bit_order: BitOrder,
    /// Number of payload bits, excluding lead-in/out.
    pub total_bits: u32,
    /// Matching tolerance, in percent.
    pub tolerance_pct: u32,
    /// Expected lead-in durations.
    pub lead_in: &'static [i64],
    /// Expected lead-out durations; the last entry may be [`OPEN_TAIL`].
    pub lead_out: &'static [i64],
    /// Lead-in used for repeat frames, if different from `lead_in`.
    pub repeat_lead_in: Option<&'static [i64]>,
    /// Lead-out used for repeat frames, if different from `lead_out`.
    pub repeat_lead_out: Option<&'static [i64]>,
    /// Bit encoding scheme.
    pub bursts: BurstSet,
    /// Position-dependent timing overrides.
    pub middle_timings: &'static [MiddleTiming],
    /// Field layout; must partition `[0, total_bits)` without overlap or
    /// gap.
    pub fields: &'static [FieldSpec],
    /// Public `encode()` argument ranges.
    pub encode_fields: &'static [EncodeFieldSpec],
    /// Field order used when serialising the logical code to an integer
    /// or hex string, as `(field_name, bit_width)` pairs.
    pub code_order: &'static [(&'static str, u32)],
    /// Checksum/derived-field computations, consulted by decode
    /// (validation) and encode (to fill the field). Empty if the protocol
    /// has no checksum.
    pub checksum_hooks: &'static [ChecksumEntry],
    /// Repeat-handling behaviour.
    pub repeat_policy: RepeatPolicy,
    /// Repeat timeout in microseconds; 0 means "use the frame's own
    /// normalised-RLC duration".
    pub repeat_timeout_us: u64,
}

impl ProtocolDescriptor {
    /// Validate an encode argument against its declared range.
    pub fn check_range(&self, name: &'static str, value: u64) -> Result<()> {
        let spec = self
            .encode_fields
            .iter()
            .find(|f| f.name == name)
            .ok_or(IrError::UnknownField(name.to_string()))?;
        if value < spec.min || value > spec.max {
            return Err(IrError::EncodeRangeError {
                name,
                value,
                min: spec.min,
                max: spec.max,
            });
        }
        Ok(())
    }
}

/// A concrete, nameable IR protocol: a [`ProtocolDescriptor`] plus the
/// decode/encode behaviour built from it. Most protocols need no
/// overrides and are represented by [`DeclarativeProtocol`]; a minority
/// (RC6-M32's double-width toggle, NECx's bit-sampled repeat frame)
/// override one or both methods.
pub trait Protocol: Send + Sync {
    /// The descriptor this protocol was built from.
    fn descriptor(&self) -> &'static ProtocolDescriptor;

    /// Decode one frame, updating `session`'s held-code/toggle state.
    fn decode(&self, rlc: &[i64], frequency_hz: u32, session: &mut DecodeSession, now_us: u64) -> Result<DecodeOutcome> {
        default_decode(self.descriptor(), rlc, frequency_hz, session, now_us)
    }

    /// Encode an [`IrCode`] from named argument values.
    fn encode(&self, args: &HashMap<&str, u64>) -> Result<IrCode> {
        default_encode(self.descriptor(), args)
    }
}

/// A [`Protocol`] with no overrides: decode/encode behaviour is exactly
/// what the descriptor implies.
pub struct DeclarativeProtocol(pub &'static ProtocolDescriptor);

impl Protocol for DeclarativeProtocol {
    fn descriptor(&self) -> &'static ProtocolDescriptor {
        self.0
    }
}

/// Lead-out duration substituted for [`OPEN_TAIL`] when *encoding* (there's
/// no "whatever's left" on the wire when you're the one producing the
/// signal — something concrete has to be sent).
const DEFAULT_OPEN_TAIL_GAP_US: i64 = 100_000;

/// Build an [`IrCode`] from named field values, validating each against
/// the descriptor's `encode_fields` ranges and filling any checksum field
/// via `checksum_hook`.
pub fn default_encode(descriptor: &ProtocolDescriptor, args: &HashMap<&str, u64>) -> Result<IrCode> {
    for spec in descriptor.encode_fields {
        let value = *args.get(spec.name).ok_or_else(|| IrError::UnknownField(spec.name.to_string()))?;
        descriptor.check_range(spec.name, value)?;
    }

    let mut fields: FieldMap = BTreeMap::new();
    for spec in descriptor.fields {
        if let Some(&value) = args.get(spec.name) {
            fields.insert(spec.name, BitFieldInt::new(value, spec.width()));
        }
    }
    for &(hook, checksum_name) in descriptor.checksum_hooks {
        if let Some(spec) = descriptor.fields.iter().find(|f| f.name == checksum_name) {
            let value = hook(&fields);
            fields.insert(checksum_name, BitFieldInt::new(value, spec.width()));
        }
    }

    let mut bits = vec![0u8; descriptor.total_bits as usize];
    for spec in descriptor.fields {
        let value = fields.get(spec.name).copied().unwrap_or_else(|| BitFieldInt::new(0, spec.width()));
        for (i, b) in value.emission_order(descriptor.bit_order).enumerate() {
            bits[spec.lo as usize + i] = b;
        }
    }

    let lead_out: Vec<i64> = descriptor
        .lead_out
        .iter()
        .map(|&d| if d == OPEN_TAIL { -DEFAULT_OPEN_TAIL_GAP_US } else { d })
        .collect();
    let rlc = build_rlc(descriptor.lead_in, &bits, &descriptor.bursts, descriptor.middle_timings, &lead_out)?;

    Ok(IrCode::new(descriptor.name, descriptor.carrier_hz, fields, descriptor.code_order, vec![rlc]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_decoder::decode_stream;

    const BURSTS: &[(i64, i64)] = &[(550, -550), (550, -1650)];

    static TEST_PROTOCOL: ProtocolDescriptor = ProtocolDescriptor {
        name: "test-aiwaish",
        carrier_hz: 38123,
        bit_order: BitOrder::Lsb,
        total_bits: 8,
        tolerance_pct: 20,
        lead_in: &[8800, -4400],
        lead_out: &[550, -23100],
        repeat_lead_in: None,
        repeat_lead_out: None,
        bursts: BurstSet::Pairs(BURSTS),
        middle_timings: &[],
        fields: &[FieldSpec { name: "device", lo: 0, hi: 7 }],
        encode_fields: &[EncodeFieldSpec { name: "device", min: 0, max: 255 }],
        code_order: &[("device", 8)],
        checksum_hooks: &[],
        repeat_policy: RepeatPolicy::Normal,
        repeat_timeout_us: 0,
    };

    #[test]
    fn default_encode_rejects_out_of_range_argument() {
        let mut args = HashMap::new();
        args.insert("device", 999u64);
        let err = default_encode(&TEST_PROTOCOL, &args).unwrap_err();
        assert!(matches!(err, IrError::EncodeRangeError { .. }));
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let mut args = HashMap::new();
        args.insert("device", 0b0110_1001u64);
        let code = default_encode(&TEST_PROTOCOL, &args).unwrap();
        let decoded = decode_stream(
            code.raw_rlc(),
            TEST_PROTOCOL.lead_in,
            TEST_PROTOCOL.lead_out,
            &TEST_PROTOCOL.bursts,
            TEST_PROTOCOL.middle_timings,
            TEST_PROTOCOL.tolerance_pct,
        )
        .unwrap();
        let rebuilt = BitFieldInt::from_bits(&decoded.bits, TEST_PROTOCOL.bit_order);
        assert_eq!(rebuilt.value(), 0b0110_1001);
    }

    #[test]
    fn declarative_protocol_decode_uses_descriptor() {
        let protocol = DeclarativeProtocol(&TEST_PROTOCOL);
        let mut args = HashMap::new();
        args.insert("device", 42u64);
        let code = protocol.encode(&args).unwrap();
        let mut session = DecodeSession::new();
        let outcome = protocol.decode(code.raw_rlc(), TEST_PROTOCOL.carrier_hz, &mut session, 0).unwrap();
        match outcome {
            DecodeOutcome::Code(decoded) => assert_eq!(decoded.field("device"), Some(42)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
