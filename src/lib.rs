//! Decode and encode consumer-IR remote control signals.
//!
//! The library works in raw RLC: a sequence of signed microsecond
//! durations, positive for mark (carrier on) and negative for space
//! (carrier off). [`registry::Registry`] holds the set of known
//! protocols and is the usual entry point — construct one with
//! [`registry::Registry::new`], [`registry::Registry::register`] the
//! protocols you want (or all of [`protocols::all`]), then call
//! [`registry::Registry::decode`] / [`registry::Registry::encode`].
//!
//! There is deliberately no global registry singleton: callers own
//! their `Registry` and decide which protocols it knows about.
//!
//! - [`pronto`] converts to and from the Pronto hex text format.
//! - [`protocol::Protocol`] is the trait a protocol implements; most
//!   protocols only need a [`protocol::ProtocolDescriptor`] and can use
//!   [`protocol::DeclarativeProtocol`] to wrap it.
//! - [`session::DecodeSession`] tracks per-protocol repeat/toggle state
//!   across calls; [`scheduler::Scheduler`] drives idle-timeout polling.
//! - [`external`] defines the boundary traits for persistence and name
//!   lookup that this crate consumes but does not implement.

pub mod bitfield;
pub mod error;
pub mod external;
pub mod ir_code;
pub mod packet_builder;
pub mod pronto;
pub mod protocol;
pub mod protocols;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod stream_decoder;
pub mod timing;
pub mod universal;
pub mod vocab;

pub use error::{IrError, Result};
pub use ir_code::IrCode;
pub use registry::Registry;
