//! Domain events and the envelope used to record them in the audit trail.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
