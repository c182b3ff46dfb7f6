//! Boundary traits and DTOs for the two external systems this crate
//! talks to but does not implement (spec.md §6): persisted-code XML and
//! a remote name-lookup service. Neither file I/O, an XML parser, nor
//! an HTTP client lives here; callers own that and pass us data through
//! [`PersistedCode`] or implement [`NameResolver`] over whatever HTTP
//! client they already have.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ir_code::IrCode;

/// The shape of a persisted code: attributes are field values, plus the
/// original and normalised RLC frames rendered as comma-separated signed
/// integers with a leading `+` on positive values (spec.md §6). This
/// struct is the data an XML (de)serialiser reads and writes; this
/// crate carries the shape but not the serialisation itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedCode {
    pub protocol_name: String,
    pub frequency_hz: u32,
    pub fields: BTreeMap<String, u64>,
    pub original_rlc: String,
    pub normalized_rlc: String,
}

impl PersistedCode {
    /// Render one RLC frame the way the persisted form expects: comma
    /// separated, positive values carrying an explicit `+`.
    pub fn format_rlc(frame: &[i64]) -> String {
        frame
            .iter()
            .map(|d| if *d >= 0 { format!("+{d}") } else { d.to_string() })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse one [`Self::format_rlc`]-shaped string back into durations.
    pub fn parse_rlc(text: &str) -> Option<Vec<i64>> {
        text.split(',').map(|s| s.trim().parse::<i64>().ok()).collect()
    }

    /// Build the persisted shape from a decoded code. `original_rlc` and
    /// `normalized_rlc` both come from [`IrCode::raw_rlc`] here since the
    /// core does not distinguish pre- and post-normalisation framing
    /// once decoding has produced an [`IrCode`]; a caller that captured
    /// the as-received signal separately may substitute it in.
    pub fn from_code(code: &IrCode) -> Self {
        let fields = code.fields().iter().map(|(name, value)| (name.to_string(), value.value())).collect();
        let rlc = Self::format_rlc(code.raw_rlc());
        Self {
            protocol_name: code.protocol_name().to_string(),
            frequency_hz: code.frequency_hz(),
            fields,
            original_rlc: rlc.clone(),
            normalized_rlc: rlc,
        }
    }
}

/// A remote lookup for a human-readable display name, advisory only:
/// any transport failure or non-200 status is reported as `None`
/// (spec.md §6), never as an error. Implementations typically exchange
/// a configured URL for a token with one GET, then pass `decoder` and
/// `code` query parameters to a second GET that returns the name.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve_name(&self, decoder: &str, code: &str) -> Option<String>;
}
