// Symbol table: string-to-identifier interning shared by every transducer in
// the process. Entries are never removed once interned.

use hashbrown::HashMap;
use std::fmt;
use std::sync::{LazyLock, PoisonError, RwLock};

/// String form of the epsilon symbol.
pub const EPSILON_STRING: &str = "@_EPSILON_SYMBOL_@";
/// String form of the unknown symbol.
pub const UNKNOWN_STRING: &str = "@_UNKNOWN_SYMBOL_@";
/// String form of the identity symbol.
pub const IDENTITY_STRING: &str = "@_IDENTITY_SYMBOL_@";

/// An interned symbol.
///
/// Symbols compare by identifier, which is assigned in interning order, so
/// ordered collections of symbols iterate in a stable order within a process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

/// An input/output symbol pair.
pub type SymbolPair = (Symbol, Symbol);

struct SymbolTable {
    strings: Vec<&'static str>,
    ids: HashMap<&'static str, u32>,
}

impl SymbolTable {
    fn with_reserved() -> Self {
        let mut table = SymbolTable {
            strings: Vec::new(),
            ids: HashMap::new(),
        };
        for reserved in [EPSILON_STRING, UNKNOWN_STRING, IDENTITY_STRING] {
            table.strings.push(reserved);
            table.ids.insert(reserved, table.strings.len() as u32 - 1);
        }
        table
    }

    fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&id) = self.ids.get(name) {
            return Symbol(id);
        }
        // Interned strings live for the rest of the process.
        let stored: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let id = self.strings.len() as u32;
        self.strings.push(stored);
        self.ids.insert(stored, id);
        Symbol(id)
    }
}

static TABLE: LazyLock<RwLock<SymbolTable>> =
    LazyLock::new(|| RwLock::new(SymbolTable::with_reserved()));

impl Symbol {
    pub const EPSILON: Symbol = Symbol(0);
    pub const UNKNOWN: Symbol = Symbol(1);
    pub const IDENTITY: Symbol = Symbol(2);

    /// Intern `name`, returning the existing symbol if it is already known.
    pub fn intern(name: &str) -> Symbol {
        if let Some(symbol) = Symbol::lookup(name) {
            return symbol;
        }
        TABLE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .intern(name)
    }

    /// Find an already interned symbol without creating it.
    pub fn lookup(name: &str) -> Option<Symbol> {
        TABLE
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ids
            .get(name)
            .map(|&id| Symbol(id))
    }

    /// Rebuild a symbol from its numeric identifier, if it was ever interned.
    pub fn from_id(id: u32) -> Option<Symbol> {
        let table = TABLE.read().unwrap_or_else(PoisonError::into_inner);
        ((id as usize) < table.strings.len()).then_some(Symbol(id))
    }

    pub fn id(self) -> u32 {
        self.0
    }

    /// The interned string.
    pub fn as_str(self) -> &'static str {
        TABLE
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .strings
            .get(self.0 as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn is_epsilon(self) -> bool {
        self == Symbol::EPSILON
    }

    pub fn is_unknown(self) -> bool {
        self == Symbol::UNKNOWN
    }

    pub fn is_identity(self) -> bool {
        self == Symbol::IDENTITY
    }

    /// Epsilon, unknown or identity.
    pub fn is_reserved(self) -> bool {
        self.0 <= Symbol::IDENTITY.0
    }

    /// Whether the symbol has the shape of a flag diacritic, `@[PNDRCU].FEATURE(.VALUE)?@`.
    pub fn is_flag_diacritic(self) -> bool {
        crate::flags::is_flag_diacritic(self.as_str())
    }
}

/// Number of symbols interned so far, reserved symbols included.
pub fn interned_count() -> usize {
    TABLE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .strings
        .len()
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({}, {:?})", self.0, self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::intern(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_symbols_have_fixed_ids() {
        assert_eq!(Symbol::intern(EPSILON_STRING), Symbol::EPSILON);
        assert_eq!(Symbol::intern(UNKNOWN_STRING), Symbol::UNKNOWN);
        assert_eq!(Symbol::intern(IDENTITY_STRING), Symbol::IDENTITY);
        assert_eq!(Symbol::EPSILON.id(), 0);
        assert_eq!(Symbol::IDENTITY.as_str(), IDENTITY_STRING);
    }

    #[test]
    fn interning_is_idempotent() {
        let a = Symbol::intern("symbol-test-a");
        let again = Symbol::intern("symbol-test-a");
        assert_eq!(a, again);
        assert_eq!(a.as_str(), "symbol-test-a");
        assert!(!a.is_reserved());
    }

    #[test]
    fn distinct_strings_get_distinct_ids() {
        let x = Symbol::intern("symbol-test-x");
        let y = Symbol::intern("symbol-test-y");
        assert_ne!(x, y);
        assert!(interned_count() >= 5);
    }

    #[test]
    fn lookup_does_not_create() {
        assert_eq!(Symbol::lookup("symbol-test-never-interned"), None);
        let z = Symbol::intern("symbol-test-z");
        assert_eq!(Symbol::lookup("symbol-test-z"), Some(z));
    }

    #[test]
    fn from_id_checks_bounds() {
        let s = Symbol::intern("symbol-test-id");
        assert_eq!(Symbol::from_id(s.id()), Some(s));
        assert_eq!(Symbol::from_id(u32::MAX), None);
    }

    #[test]
    fn multibyte_symbols() {
        let a = Symbol::intern("\u{00e4}");
        assert_eq!(a.to_string(), "\u{00e4}");
    }

    #[test]
    fn flag_shape_detection() {
        assert!(Symbol::intern("@U.CASE.NOM@").is_flag_diacritic());
        assert!(!Symbol::intern("@_SPACE_@").is_flag_diacritic());
        assert!(!Symbol::EPSILON.is_flag_diacritic());
    }
}
