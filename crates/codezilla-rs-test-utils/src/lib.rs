//! Test helpers shared across Codezilla crates.

pub mod runtime;

pub use runtime::FakeRuntime;
