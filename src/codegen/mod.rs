//! Code generation module
//!
//! Generation runs once per method body after the whole unit resolved
//! without errors. Each method gets its own `Listing`; the listing checks
//! register balance and label placement when the method is finished.

pub mod arch;
pub mod error;
mod expr;
pub mod gen;
pub mod listing;

pub use arch::{Architecture, CallTarget, FlowHint, Label, Reg, RestorePoint, RuntimeRoutine};
pub use error::{CodeGenError, CodeGenResult};
pub use gen::MethodGen;
pub use listing::{Instr, LineEntry, Listing, MethodCode};

use crate::ast::Program;
use crate::common::{Config, Result};
use crate::wash::Resolution;

/// Generate every method of every unit that resolved cleanly
pub fn generate_program(program: &mut Program, resolution: &Resolution, config: &Config) -> Result<Vec<MethodCode>> {
    let mut methods = Vec::new();
    for unit in program.units.iter_mut() {
        if !resolution.unit_ok(&unit.name) {
            log::debug!("skipping generation of {}", unit.name);
            continue;
        }
        let Some(info) = resolution.table.class(&unit.name) else {
            continue;
        };
        for (method, sig) in unit.methods.iter_mut().zip(&info.methods) {
            let Some(body) = method.body.as_mut() else {
                continue;
            };
            let mut listing = Listing::new(sig.symbol.clone(), config.registers);
            MethodGen::new(&mut listing, config, &resolution.table, sig, body).gen_method()?;
            let code = listing.finish()?;
            log::debug!("{}: {} instructions", code.name, code.instrs.len());
            methods.push(code);
        }
    }
    Ok(methods)
}
