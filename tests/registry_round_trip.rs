//! Property test: every built-in protocol's own `encode()` produces a
//! signal its own `decode()` (via the registry) recovers unchanged, for
//! randomly sampled in-range field values. Grounded on spec.md §8's
//! round-trip property and SPEC_FULL.md §2.4's note that `rand` drives
//! bounded-random `encode_fields` tuples.

use std::collections::HashMap;

use rand::Rng;

use irdecode::protocol::Protocol;
use irdecode::protocols;
use irdecode::registry::Registry;
use irdecode::session::DecodeOutcome;

fn random_args(rng: &mut impl Rng, encode_fields: &[irdecode::protocol::EncodeFieldSpec]) -> HashMap<&'static str, u64> {
    encode_fields.iter().map(|spec| (spec.name, rng.random_range(spec.min..=spec.max))).collect()
}

#[test]
fn every_builtin_protocol_round_trips_random_field_values() {
    let mut rng = rand::rng();
    for protocol in protocols::all() {
        let descriptor = protocol.descriptor();
        for _ in 0..25 {
            let args = random_args(&mut rng, descriptor.encode_fields);
            let code = protocol.encode(&args).unwrap_or_else(|e| panic!("{}: encode failed: {e}", descriptor.name));

            let mut registry = Registry::new();
            registry.register(protocols::all().into_iter().find(|p| p.descriptor().name == descriptor.name).unwrap());
            let decoded = registry
                .decode(code.raw_rlc(), descriptor.carrier_hz, 0)
                .unwrap_or_else(|e| panic!("{}: decode failed: {e}", descriptor.name));
            assert_eq!(decoded.len(), 1, "{}: expected exactly one decoded code", descriptor.name);

            for (name, value) in &args {
                assert_eq!(
                    decoded[0].field(name),
                    Some(*value),
                    "{}: field {name} round-tripped incorrectly",
                    descriptor.name
                );
            }
        }
    }
}

#[test]
fn decode_outcomes_reports_every_registered_protocol_independently() {
    let mut rng = rand::rng();
    let mut registry = Registry::new();
    for protocol in protocols::all() {
        registry.register(protocol);
    }
    assert_eq!(registry.protocol_names().len(), 7);

    let aiwa = protocols::all().into_iter().find(|p| p.descriptor().name == "aiwa").unwrap();
    let args = random_args(&mut rng, aiwa.descriptor().encode_fields);
    let code = aiwa.encode(&args).unwrap();

    let outcomes = registry.decode_outcomes(code.raw_rlc(), aiwa.descriptor().carrier_hz, 0);
    let aiwa_hit = outcomes.iter().find(|(name, _)| *name == "aiwa").expect("aiwa protocol should claim its own signal");
    assert!(matches!(aiwa_hit.1, DecodeOutcome::Code(_)));
}
