//! Symbol interning for loop variables and reference names.

use serde::{Deserialize, Serialize};
use std::fmt;
use string_interner::{backend::StringBackend, DefaultSymbol, StringInterner, Symbol as SymbolTrait};

/// An interned identifier, valid for the [`SymbolInterner`] that issued it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(u32);

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// Per-tree identifier table.
#[derive(Debug, Clone, Default)]
pub struct SymbolInterner {
    names: StringInterner<StringBackend<DefaultSymbol>>,
}

impl SymbolInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The symbol for `name`, interning it on first use.
    pub fn intern(&mut self, name: &str) -> Symbol {
        Symbol(self.names.get_or_intern(name).to_usize() as u32)
    }

    pub fn resolve(&self, symbol: Symbol) -> Option<&str> {
        self.names.resolve(DefaultSymbol::try_from_usize(symbol.0 as usize)?)
    }
}
