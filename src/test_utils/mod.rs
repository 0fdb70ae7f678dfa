//! Test doubles for the transport and clock seams, plus an optional
//! embedded PostgreSQL for end-to-end runs.

pub mod clock;
pub mod fake;

#[cfg(feature = "test-utils-postgres")]
pub mod postgres;

pub use clock::ManualClock;
pub use fake::{FakeDatabase, FakeRole, FakeServer, Recorded, StatementKind};
