//! The protocol registry (C10): an ordered list of protocols, each tried
//! against every incoming signal, plus named lookup for encoding.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::error::{IrError, Result};
use crate::ir_code::IrCode;
use crate::protocol::Protocol;
use crate::session::{DecodeOutcome, DecodeSession};
use crate::universal::{self, UniversalStrategy};

struct Entry {
    protocol: Box<dyn Protocol>,
    session: DecodeSession,
}

/// A callback invoked when a protocol's session releases a held code
/// (its repeat-idle timer expired).
pub type ReleasedCallback = Box<dyn FnMut(&IrCode) + Send>;

/// The ordered collection of known protocols. `decode` tries every one
/// against the input and collects every successful code (spec.md §4.10:
/// "iterates, collecting any IR codes whose protocol accepts the input");
/// a signal no protocol accepts falls through to the universal fallback
/// (C9) rather than being discarded.
pub struct Registry {
    entries: Vec<Entry>,
    released_callbacks: HashMap<&'static str, Vec<ReleasedCallback>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry with no protocols registered.
    pub fn new() -> Self {
        Self { entries: Vec::new(), released_callbacks: HashMap::new() }
    }

    /// Register a protocol, appending it to the dispatch order.
    pub fn register(&mut self, protocol: Box<dyn Protocol>) {
        debug!("registry: adding protocol {}", protocol.descriptor().name);
        self.entries.push(Entry { protocol, session: DecodeSession::new() });
    }

    /// Subscribe to release notifications for a protocol's held codes.
    pub fn register_released_callback(&mut self, protocol_name: &'static str, callback: ReleasedCallback) {
        self.released_callbacks.entry(protocol_name).or_default().push(callback);
    }

    /// Advance every held session's idle timer, firing release callbacks
    /// for any that time out.
    pub fn poll_timeouts(&mut self, now_us: u64) {
        for entry in &mut self.entries {
            if let Some(DecodeOutcome::TimedOut(code)) = entry.session.poll_timeout(now_us) {
                let name = entry.protocol.descriptor().name;
                info!("{name}: held code released after repeat timeout");
                if let Some(callbacks) = self.released_callbacks.get_mut(name) {
                    for cb in callbacks {
                        cb(&code);
                    }
                }
            }
        }
    }

    /// Try every registered protocol against `rlc`, in dispatch order.
    /// Returns one `(protocol_name, outcome)` per protocol that decoded
    /// successfully (`Code`, `RepeatIn`, or `RepeatOut`); protocols that
    /// errored are omitted, not propagated.
    pub fn decode_outcomes(&mut self, rlc: &[i64], frequency_hz: u32, now_us: u64) -> Vec<(&'static str, DecodeOutcome)> {
        let mut hits = Vec::new();
        for entry in &mut self.entries {
            match entry.protocol.decode(rlc, frequency_hz, &mut entry.session, now_us) {
                Ok(outcome) => hits.push((entry.protocol.descriptor().name, outcome)),
                Err(_) => continue,
            }
        }
        hits
    }

    /// The library's primary decode entry point: every protocol's fully
    /// resolved code for this signal (spec.md §6). Repeat-protocol
    /// intermediate outcomes (`RepeatIn`/`RepeatOut`) are not codes and
    /// are omitted here; use [`Self::decode_outcomes`] to observe them.
    /// Falls back to the universal heuristic decoder when no registered
    /// protocol accepts the signal at all.
    pub fn decode(&mut self, rlc: &[i64], frequency_hz: u32, now_us: u64) -> Result<Vec<IrCode>> {
        let outcomes = self.decode_outcomes(rlc, frequency_hz, now_us);
        if outcomes.is_empty() {
            warn!("registry: no protocol matched, falling back to universal decode");
            return Ok(vec![universal_decode(rlc, frequency_hz)?]);
        }
        Ok(outcomes
            .into_iter()
            .filter_map(|(_, outcome)| match outcome {
                DecodeOutcome::Code(code) => Some(code),
                _ => None,
            })
            .collect())
    }

    /// Encode `name`'s protocol from `args`.
    pub fn encode(&self, name: &str, args: &HashMap<&str, u64>) -> Result<IrCode> {
        self.entries
            .iter()
            .find(|e| e.protocol.descriptor().name == name)
            .ok_or_else(|| IrError::UnknownProtocol(name.to_string()))?
            .protocol
            .encode(args)
    }

    /// Names of every registered protocol, in dispatch order.
    pub fn protocol_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.protocol.descriptor().name).collect()
    }
}

fn universal_decode(rlc: &[i64], frequency_hz: u32) -> Result<IrCode> {
    let (strategy, bits) = universal::decode(rlc, 20)?;
    debug!("registry: universal decode used {strategy:?}, {} bits", bits.len());
    let mut fields = crate::protocol::FieldMap::new();
    let value = crate::bitfield::BitFieldInt::from_bits(&bits, crate::bitfield::BitOrder::Msb);
    fields.insert("code", value);
    // `code`'s width varies per signal, so it can't join a `'static`
    // code_order table; callers read it via `IrCode::field("code")`.
    Ok(IrCode::new(universal_name(strategy), frequency_hz, fields, &[], vec![rlc.to_vec()]))
}

fn universal_name(strategy: UniversalStrategy) -> &'static str {
    match strategy {
        UniversalStrategy::PairShape => "universal-pair-shape",
        UniversalStrategy::NearestNeighbour => "universal-nearest-neighbour",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitfield::BitOrder;
    use crate::protocol::{BurstSet, DeclarativeProtocol, EncodeFieldSpec, FieldSpec, ProtocolDescriptor, RepeatPolicy};
    use std::sync::{Arc, Mutex};

    const BURSTS: &[(i64, i64)] = &[(550, -550), (550, -1650)];

    static SAMPLE: ProtocolDescriptor = ProtocolDescriptor {
        name: "sample",
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
        repeat_policy: RepeatPolicy::Normal,
        repeat_timeout_us: 0,
    };

    #[test]
    fn decode_dispatches_to_registered_protocol() {
        let mut registry = Registry::new();
        registry.register(Box::new(DeclarativeProtocol(&SAMPLE)));
        let mut args = HashMap::new();
        args.insert("device", 5u64);
        let code = registry.encode("sample", &args).unwrap();
        let codes = registry.decode(code.raw_rlc(), 38000, 0).unwrap();
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].field("device"), Some(5));
    }

    #[test]
    fn encode_rejects_unknown_protocol_name() {
        let registry = Registry::new();
        let err = registry.encode("nonexistent", &HashMap::new()).unwrap_err();
        assert!(matches!(err, IrError::UnknownProtocol(_)));
    }

    #[test]
    fn decode_falls_back_to_universal_when_unmatched() {
        let mut registry = Registry::new();
        registry.register(Box::new(DeclarativeProtocol(&SAMPLE)));
        let junk = vec![100, -200, 300, -100, 150, -250, 100, -9000];
        let codes = registry.decode(&junk, 38000, 0).unwrap();
        assert_eq!(codes.len(), 1);
        assert!(codes[0].protocol_name().starts_with("universal-"));
    }

    #[test]
    fn released_callback_fires_on_idle_timeout() {
        let mut registry = Registry::new();
        registry.register(Box::new(DeclarativeProtocol(&SAMPLE)));
        let seen: Arc<Mutex<Vec<Option<u64>>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        registry.register_released_callback(
            "sample",
            Box::new(move |code: &IrCode| {
                seen_clone.lock().unwrap().push(code.field("device"));
            }),
        );
        let mut args = HashMap::new();
        args.insert("device", 7u64);
        let code = registry.encode("sample", &args).unwrap();
        registry.decode(code.raw_rlc(), 38000, 0).unwrap();
        registry.poll_timeouts(10_000_000);
        assert_eq!(seen.lock().unwrap().as_slice(), &[Some(7)]);
    }
}
