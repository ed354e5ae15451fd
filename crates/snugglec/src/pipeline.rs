//! The compile pipeline: resolve, type, lower.
//!
//! Each pass is fail-fast; the first escaping error is converted to the
//! common diagnostic shape and returned. Reflect-registry validation
//! happens before the pipeline ever runs (the registry argument is already
//! validated by construction).

use log::debug;
use snuggle_common::{Diagnostic, FileLoader, SourceSet};
use snuggle_ir::IrProgram;
use snuggle_typeck::ReflectRegistry;

/// Compile a program from its entry file.
pub fn compile(
    entry: &str,
    loader: &dyn FileLoader,
    registry: &ReflectRegistry,
) -> Result<IrProgram, Diagnostic> {
    debug!("compiling entry file `{entry}`");
    let resolved = snuggle_resolver::resolve_program(entry, loader, &registry.names())
        .map_err(|e| e.into_diagnostic())?;
    let typed = snuggle_typeck::check_program(&resolved, registry)
        .map_err(|e| e.into_diagnostic())?;
    let program = snuggle_codegen::lower_program(&typed).map_err(|e| e.into_diagnostic())?;
    debug!(
        "emitted {} generated type(s) across {} file(s)",
        program.types.len(),
        program.files.len()
    );
    Ok(program)
}

/// Compile from in-memory (name, text) pairs; the first pair is the entry
/// file. Convenience for tests and tooling.
pub fn compile_sources(
    sources: &[(&str, &str)],
    registry: &ReflectRegistry,
) -> Result<IrProgram, Diagnostic> {
    let set = SourceSet::from_pairs(sources.iter().copied());
    compile(sources[0].0, &set, registry)
}
