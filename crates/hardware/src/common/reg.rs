//! Architectural register file.
//!
//! Holds committed register values along with the naming information the ISA
//! loader supplies: canonical names, aliases, register kind and constant-ness.
//! Registers are addressed by a dense [`RegId`] so the rename table can be a
//! flat vector indexed by the same id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::common::error::SemanticsError;

/// Dense index of an architectural register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct RegId(pub u16);

impl RegId {
    /// Index into per-register tables.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Register file a register belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RegisterKind {
    /// General-purpose integer register.
    Int,
    /// Floating-point register.
    Float,
}

/// One architectural register as described by the ISA loader.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchRegister {
    /// Canonical name (e.g. `x5`).
    pub name: String,
    /// Alternative names (e.g. `t0`).
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Register file.
    pub kind: RegisterKind,
    /// Writes are discarded and the register is never renamed.
    #[serde(default)]
    pub constant: bool,
    /// Initial raw value.
    #[serde(default)]
    pub value: u64,
}

impl ArchRegister {
    /// Creates a zero-initialised, writable register.
    pub fn new(name: impl Into<String>, kind: RegisterKind) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            kind,
            constant: false,
            value: 0,
        }
    }

    /// Adds an alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// ABI names of the integer registers, in index order.
const INT_ABI: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// ABI names of the floating-point registers, in index order.
const FLOAT_ABI: [&str; 32] = [
    "ft0", "ft1", "ft2", "ft3", "ft4", "ft5", "ft6", "ft7", "fs0", "fs1", "fa0", "fa1", "fa2",
    "fa3", "fa4", "fa5", "fa6", "fa7", "fs2", "fs3", "fs4", "fs5", "fs6", "fs7", "fs8", "fs9",
    "fs10", "fs11", "ft8", "ft9", "ft10", "ft11",
];

/// Architectural register file with name lookup.
#[derive(Clone, Debug)]
pub struct RegisterFile {
    regs: Vec<ArchRegister>,
    lookup: HashMap<String, RegId>,
}

impl RegisterFile {
    /// Builds a register file, rejecting duplicate names or aliases.
    pub fn new(regs: Vec<ArchRegister>) -> Result<Self, SemanticsError> {
        let mut lookup = HashMap::new();
        for (idx, reg) in regs.iter().enumerate() {
            let id = RegId(idx as u16);
            for name in std::iter::once(&reg.name).chain(&reg.aliases) {
                if lookup.insert(name.clone(), id).is_some() {
                    return Err(SemanticsError::Duplicate(name.clone()));
                }
            }
        }
        Ok(Self { regs, lookup })
    }

    /// The RISC-V integer and floating-point register files.
    ///
    /// `x0`/`zero` is a constant zero; `fp` is an extra alias of `x8`.
    pub fn riscv() -> Self {
        let mut regs = Vec::with_capacity(64);
        for (i, abi) in INT_ABI.iter().enumerate() {
            let mut reg = ArchRegister::new(format!("x{i}"), RegisterKind::Int).alias(*abi);
            if i == 0 {
                reg.constant = true;
            }
            if i == 8 {
                reg = reg.alias("fp");
            }
            regs.push(reg);
        }
        for (i, abi) in FLOAT_ABI.iter().enumerate() {
            regs.push(ArchRegister::new(format!("f{i}"), RegisterKind::Float).alias(*abi));
        }
        let lookup = regs
            .iter()
            .enumerate()
            .flat_map(|(idx, reg)| {
                std::iter::once(reg.name.clone())
                    .chain(reg.aliases.iter().cloned())
                    .map(move |name| (name, RegId(idx as u16)))
            })
            .collect();
        Self { regs, lookup }
    }

    /// Sets the initial value of a register by name or alias.
    pub fn with_value(mut self, name: &str, value: u64) -> Result<Self, SemanticsError> {
        let id = self
            .resolve(name)
            .ok_or_else(|| SemanticsError::UnknownRegister(name.to_owned()))?;
        self.regs[id.index()].value = value;
        Ok(self)
    }

    /// Resolves a name or alias.
    pub fn resolve(&self, name: &str) -> Option<RegId> {
        self.lookup.get(name).copied()
    }

    /// Register metadata.
    pub fn get(&self, id: RegId) -> &ArchRegister {
        &self.regs[id.index()]
    }

    /// Committed raw value.
    #[inline]
    pub fn read(&self, id: RegId) -> u64 {
        self.regs[id.index()].value
    }

    /// Writes a committed value; constant registers ignore the write.
    #[inline]
    pub fn write(&mut self, id: RegId, value: u64) {
        let reg = &mut self.regs[id.index()];
        if !reg.constant {
            reg.value = value;
        }
    }

    /// Returns true for constant registers.
    #[inline]
    pub fn is_constant(&self, id: RegId) -> bool {
        self.regs[id.index()].constant
    }

    /// Number of registers.
    pub fn len(&self) -> usize {
        self.regs.len()
    }

    /// Returns true if the file has no registers.
    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    /// Iterates registers in id order.
    pub fn iter(&self) -> impl Iterator<Item = (RegId, &ArchRegister)> {
        self.regs
            .iter()
            .enumerate()
            .map(|(idx, reg)| (RegId(idx as u16), reg))
    }
}
