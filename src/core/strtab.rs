//! Per-module string interning. Every name in the IR (module, regions,
//! functions, named entities) is a dense [`StringId`] into the owning
//! module's table.

use color_eyre::{eyre::eyre, Report};
use std::collections::HashMap;
use std::fmt;

/// Dense id of an interned string. Id 0 is always the empty string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringId(u32);

impl StringId {
    /// Sentinel for "no string". Never returned by interning.
    pub const INVALID: StringId = StringId(u32::MAX);

    /// The reserved id of the empty string.
    pub const EMPTY: StringId = StringId(0);

    pub fn new(id: u32) -> StringId {
        StringId(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Interner assigning dense, insertion-ordered ids to string content.
///
/// Interning is idempotent, the empty string is always id 0, and lookup
/// by content takes a borrowed `&str` (no allocation unless the string
/// is new).
pub struct StringTable {
    table: HashMap<String, StringId>,
    strs: Vec<String>,
    next_id: u32,
}

impl StringTable {
    pub fn new() -> StringTable {
        let mut table = HashMap::new();
        table.insert(String::new(), StringId::EMPTY);
        StringTable {
            table,
            strs: vec![String::new()],
            next_id: 1,
        }
    }

    /// Intern `s`, returning the existing id if the content is already
    /// present.
    pub fn intern(&mut self, s: &str) -> StringId {
        if s.is_empty() {
            return StringId::EMPTY;
        }
        if let Some(&id) = self.table.get(s) {
            return id;
        }
        let id = StringId(self.next_id);
        self.next_id += 1;
        self.table.insert(s.to_owned(), id);
        self.strs.push(s.to_owned());
        id
    }

    /// Resolve an id back to its content. Ids beyond the table size are
    /// a bounded-range error.
    pub fn get(&self, id: StringId) -> Result<&str, Report> {
        self.strs
            .get(id.index())
            .map(String::as_str)
            .ok_or_else(|| {
                eyre!(
                    "string id {} is out of range (table size {})",
                    id.index(),
                    self.strs.len()
                )
            })
    }

    /// Content lookup without interning.
    pub fn lookup(&self, s: &str) -> Option<StringId> {
        self.table.get(s).copied()
    }

    pub fn contains(&self, s: &str) -> bool {
        self.table.contains_key(s)
    }

    pub fn len(&self) -> usize {
        self.strs.len()
    }

    pub fn is_empty(&self) -> bool {
        // The empty string is always present.
        false
    }

    /// Drop everything but the empty-string entry and reset the next id
    /// to 1.
    pub fn clear(&mut self) {
        self.table.clear();
        self.strs.clear();
        self.table.insert(String::new(), StringId::EMPTY);
        self.strs.push(String::new());
        self.next_id = 1;
    }
}

impl Default for StringTable {
    fn default() -> StringTable {
        StringTable::new()
    }
}
