//! The built-in protocol set. Each module grounds one descriptor (or, where
//! the wire format can't be expressed declaratively, one bespoke
//! [`crate::protocol::Protocol`] impl) in a specific file under
//! `pyIRDecoder`; see each module's doc comment for its source.

pub mod aiwa;
pub mod necx;
pub mod pacemss;
pub mod panasonic;
pub mod pctv;
pub mod rc6m32;
pub mod sharp;

use crate::protocol::{DeclarativeProtocol, Protocol};

/// Every built-in protocol, in the order they're tried against an
/// incoming signal. Order only matters for ambiguous inputs that more
/// than one protocol would accept; none of the built-ins currently
/// overlap like that.
pub fn all() -> Vec<Box<dyn Protocol>> {
    vec![
        Box::new(DeclarativeProtocol(&aiwa::AIWA)),
        Box::new(DeclarativeProtocol(&necx::NECX)),
        Box::new(DeclarativeProtocol(&pacemss::PACEMSS)),
        Box::new(panasonic::Panasonic),
        Box::new(DeclarativeProtocol(&pctv::PCTV)),
        Box::new(rc6m32::Rc6M32),
        Box::new(sharp::Sharp),
    ]
}
