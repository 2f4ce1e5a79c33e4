//! Program loading and machine-image construction.
//!
//! This module turns an assembled [`Program`] into the immutable
//! [`MachineImage`] a run starts from. It performs:
//! 1. **Data placement:** Lays memory locations out sequentially from
//!    `memory.data_base`, each aligned to its declared alignment.
//! 2. **Symbol binding:** Binds code labels and location names to addresses.
//! 3. **Decoding:** Decodes every instruction once against the instruction set.
//! 4. **Unit check:** Rejects programs that need an unconfigured unit class.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::common::error::{ConfigError, MemoryFault, SemanticsError, SimError};
use crate::common::reg::RegisterFile;
use crate::config::Config;
use crate::core::cpu::MachineImage;
use crate::isa::decode::DecodedInstruction;
use crate::isa::instruction::{MemoryLocation, Program};
use crate::isa::semantics::InstructionSet;
use crate::memory::MemoryImage;

fn bind(symbols: &mut HashMap<String, u64>, name: &str, address: u64) -> Result<(), SemanticsError> {
    if symbols.insert(name.to_owned(), address).is_some() {
        return Err(SemanticsError::Duplicate(name.to_owned()));
    }
    Ok(())
}

/// Places `locations` into `memory` starting at `base`.
///
/// Returns the address bound to each location, in input order.
pub fn place_locations(
    memory: &mut MemoryImage,
    base: u64,
    locations: &[MemoryLocation],
) -> Result<Vec<u64>, MemoryFault> {
    let mut next = base;
    let mut addresses = Vec::with_capacity(locations.len());
    for location in locations {
        let address = next.next_multiple_of(location.alignment.max(1));
        memory.load(address, &location.bytes)?;
        addresses.push(address);
        next = address + location.bytes.len() as u64;
    }
    Ok(addresses)
}

/// Builds the machine image of `program` on the machine described by `config`.
///
/// `config` is expected to be validated already.
pub fn load_program(
    config: Config,
    isa: &InstructionSet,
    registers: RegisterFile,
    program: &Program,
) -> Result<MachineImage, SimError> {
    let mut memory = MemoryImage::new(config.memory.size);
    let addresses = place_locations(&mut memory, config.memory.data_base, &program.memory)?;

    let mut symbols = HashMap::new();
    for (location, &address) in program.memory.iter().zip(&addresses) {
        bind(&mut symbols, &location.name, address)?;
    }
    for (label, &index) in &program.labels {
        bind(&mut symbols, label, Program::address_of(index))?;
    }

    let decoded = program
        .instructions
        .iter()
        .enumerate()
        .map(|(index, inst)| {
            DecodedInstruction::decode(inst, Program::address_of(index), isa, &registers, &symbols)
                .map(Arc::new)
        })
        .collect::<Result<Vec<_>, _>>()?;

    for inst in &decoded {
        if let Some(class) = inst.semantics.unit
            && config.unit(class).is_none()
        {
            return Err(ConfigError::MissingUnit {
                opcode: inst.semantics.name.clone(),
                class,
            }
            .into());
        }
    }

    debug!(
        instructions = decoded.len(),
        locations = addresses.len(),
        "program loaded"
    );
    Ok(MachineImage {
        config,
        program: decoded.into(),
        registers,
        memory,
        entry_pc: Program::address_of(program.entry),
        symbols,
    })
}
