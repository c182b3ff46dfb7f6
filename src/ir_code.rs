//! The decoded/encoded result value (C7): field map, normalised RLC, and
//! the three wire views (raw, MCE, Pronto).

use crate::error::Result;
use crate::protocol::FieldMap;
use crate::pronto::rlc_to_pronto;
use crate::vocab::build_mce_rlc;

/// One decoded or to-be-encoded IR command.
///
/// Equality is structural over protocol identity and field map only:
/// `frequency_hz` and `normalized_rlc` are carried along for wire-format
/// round-tripping but don't participate in it. Two codes decoded from
/// slightly different but semantically equal frames (e.g. differing only
/// in trailing lead-out jitter) should compare equal.
#[derive(Debug, Clone)]
pub struct IrCode {
    protocol_name: &'static str,
    frequency_hz: u32,
    fields: FieldMap,
    code_order: &'static [(&'static str, u32)],
    /// One inner vector per frame; most protocols decode to exactly one.
    normalized_rlc: Vec<Vec<i64>>,
}

impl IrCode {
    /// Construct from a decoded field map and the frame(s) it came from.
    pub fn new(
        protocol_name: &'static str,
        frequency_hz: u32,
        fields: FieldMap,
        code_order: &'static [(&'static str, u32)],
        normalized_rlc: Vec<Vec<i64>>,
    ) -> Self {
        Self { protocol_name, frequency_hz, fields, code_order, normalized_rlc }
    }

    /// The protocol that produced (or will produce) this code.
    pub fn protocol_name(&self) -> &'static str {
        self.protocol_name
    }

    /// Nominal carrier frequency in Hz.
    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    /// Look up a decoded field by name.
    pub fn field(&self, name: &str) -> Option<u64> {
        self.fields.get(name).map(|b| b.value())
    }

    /// All decoded fields.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Frames making up this code, in transmission order.
    pub fn normalized_rlc(&self) -> &[Vec<i64>] {
        &self.normalized_rlc
    }

    /// Concatenate `code_order` fields, each shifted left by the previous
    /// fields' combined width, into a single integer.
    pub fn to_int(&self) -> u64 {
        let mut value = 0u64;
        for &(name, width) in self.code_order {
            let field_value = self.fields.get(name).map(|b| b.value()).unwrap_or(0);
            value = (value << width) | (field_value & mask(width));
        }
        value
    }

    /// [`Self::to_int`] rendered as uppercase hex, width derived from the
    /// total `code_order` bit count.
    pub fn to_hex(&self) -> String {
        let total_bits: u32 = self.code_order.iter().map(|(_, w)| w).sum();
        let hex_digits = total_bits.div_ceil(4) as usize;
        format!("{:0width$X}", self.to_int(), width = hex_digits)
    }

    /// The raw wire view: the first frame's duration vector, verbatim.
    pub fn raw_rlc(&self) -> &[i64] {
        self.normalized_rlc.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// The MCE wire view: each frame's raw RLC, even-length padded.
    pub fn mce_rlc(&self) -> Vec<Vec<i64>> {
        self.normalized_rlc.iter().map(|f| build_mce_rlc(f)).collect()
    }

    /// The Pronto text wire view.
    pub fn pronto(&self) -> Result<String> {
        let flattened: Vec<i64> = self.normalized_rlc.iter().flatten().copied().collect();
        rlc_to_pronto(self.frequency_hz, &flattened)
    }
}

impl PartialEq for IrCode {
    fn eq(&self, other: &Self) -> bool {
        self.protocol_name == other.protocol_name && self.fields == other.fields
    }
}

/// Concatenating two codes appends `other`'s frames after `self`'s and
/// merges field maps, with `other`'s fields winning on name collision.
/// Used to build multi-frame transmissions (e.g. command + repeat frame).
impl std::ops::Add for IrCode {
    type Output = IrCode;

    fn add(mut self, other: IrCode) -> IrCode {
        self.normalized_rlc.extend(other.normalized_rlc);
        for (k, v) in other.fields {
            self.fields.insert(k, v);
        }
        self
    }
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
