// The Snuggle compiler driver, as a library.
//
// `snugglec` the binary is a thin shell over this: discover sources, run
// the pipeline, render diagnostics. Integration tests drive the same
// functions against in-memory and temp-dir source sets.

pub mod discovery;
pub mod emit;
pub mod pipeline;
pub mod report;

pub use pipeline::{compile, compile_sources};
