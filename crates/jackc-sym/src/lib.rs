//! A single symbol scope: `name -> (type, kind, index)`.
//!
//! The compilation engine owns two of these - a class scope that lives for
//! the whole class and a subroutine scope rebuilt from empty at the start
//! of every subroutine - and searches subroutine before class. This crate
//! only models one scope; the two-scope discipline and the
//! `kind -> segment` mapping live in `jackc-compiler`, next to the rest of
//! the translation logic that needs them.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub type_name: String,
    pub kind: Kind,
    pub index: u16,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Entry>,
    counts: [u16; 4],
}

fn kind_slot(kind: Kind) -> usize {
    match kind {
        Kind::Static => 0,
        Kind::Field => 1,
        Kind::Argument => 2,
        Kind::Local => 3,
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `name` with the next free index for `kind`. Per spec, a
    /// second insertion of the same name within one scope is a programming
    /// error in the source, not a recoverable condition here - the caller
    /// (the compilation engine) is expected to have already rejected
    /// duplicate declarations before calling this on a param/var/field.
    pub fn add(&mut self, name: impl Into<String>, type_name: impl Into<String>, kind: Kind) {
        let slot = kind_slot(kind);
        let index = self.counts[slot];
        self.counts[slot] += 1;
        self.entries.insert(
            name.into(),
            Entry {
                type_name: type_name.into(),
                kind,
                index,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn count(&self, kind: Kind) -> u16 {
        self.counts[kind_slot(kind)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense_and_per_kind() {
        let mut table = SymbolTable::new();
        table.add("x", "int", Kind::Field);
        table.add("y", "int", Kind::Field);
        table.add("color", "int", Kind::Static);

        assert_eq!(table.get("x").unwrap().index, 0);
        assert_eq!(table.get("y").unwrap().index, 1);
        assert_eq!(table.get("color").unwrap().index, 0);
        assert_eq!(table.count(Kind::Field), 2);
        assert_eq!(table.count(Kind::Static), 1);
    }

    #[test]
    fn method_receiver_seeds_argument_zero() {
        let mut table = SymbolTable::new();
        table.add("this", "Point", Kind::Argument);
        table.add("dx", "int", Kind::Argument);

        assert_eq!(table.get("this").unwrap().index, 0);
        assert_eq!(table.get("dx").unwrap().index, 1);
    }

    #[test]
    fn contains_and_missing_lookup() {
        let mut table = SymbolTable::new();
        table.add("a", "int", Kind::Local);
        assert!(table.contains("a"));
        assert!(!table.contains("b"));
        assert!(table.get("b").is_none());
    }
}
