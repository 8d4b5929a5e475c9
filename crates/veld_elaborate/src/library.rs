//! The registry of named, ordered source libraries.

use std::collections::HashMap;
use veld_common::{Ident, Interner};
use veld_hier::{Arena, LibraryId};

/// Priority assigned to the default library so it sorts after every named
/// library unless explicitly listed.
const DEFAULT_LIBRARY_PRIORITY: u32 = u32::MAX;

/// A named source library.
///
/// Identity is the [`LibraryId`]; two compilations each registering a
/// library called `lib1` hold distinct libraries.
#[derive(Debug, Clone)]
pub struct SourceLibrary {
    /// The library name.
    pub name: Ident,
    /// Stable priority: registration order for named libraries, a sentinel
    /// for the default library.
    pub priority: u32,
    /// Whether this is the compilation's default library.
    pub is_default: bool,
}

/// The ordered collection of libraries known to one compilation.
///
/// The default library (conventionally `work`) is created up front and is a
/// member of the compilation, never a process global.
#[derive(Debug)]
pub struct LibraryRegistry {
    libraries: Arena<LibraryId, SourceLibrary>,
    by_name: HashMap<Ident, LibraryId>,
    default_library: LibraryId,
    explicit_order: Option<Vec<LibraryId>>,
}

impl LibraryRegistry {
    /// Creates a registry containing only the default library.
    pub fn new(interner: &Interner) -> Self {
        let mut libraries = Arena::new();
        let name = interner.get_or_intern("work");
        let default_library = libraries.alloc(SourceLibrary {
            name,
            priority: DEFAULT_LIBRARY_PRIORITY,
            is_default: true,
        });
        let mut by_name = HashMap::new();
        by_name.insert(name, default_library);
        Self {
            libraries,
            by_name,
            default_library,
            explicit_order: None,
        }
    }

    /// Registers a library, or returns the existing one with the same name.
    ///
    /// Priority follows registration order; re-registering a name is
    /// idempotent.
    pub fn register(&mut self, name: Ident) -> LibraryId {
        if let Some(&id) = self.by_name.get(&name) {
            return id;
        }
        let priority = self.libraries.len() as u32;
        let id = self.libraries.alloc(SourceLibrary {
            name,
            priority,
            is_default: false,
        });
        self.by_name.insert(name, id);
        id
    }

    /// Looks up a library by name.
    pub fn get(&self, name: Ident) -> Option<LibraryId> {
        self.by_name.get(&name).copied()
    }

    /// Returns the library with the given ID.
    pub fn library(&self, id: LibraryId) -> &SourceLibrary {
        &self.libraries[id]
    }

    /// The compilation's default library.
    pub fn default_library(&self) -> LibraryId {
        self.default_library
    }

    /// Sets the explicit search order (the `-L` surface). Listed libraries
    /// come first in the given order; unlisted ones keep registration order
    /// after them.
    pub fn set_explicit_order(&mut self, order: Vec<LibraryId>) {
        self.explicit_order = Some(order);
    }

    /// The global library search order: the explicit order if one was set,
    /// then remaining named libraries by priority, then the default library
    /// unless it was explicitly listed.
    pub fn search_order(&self) -> Vec<LibraryId> {
        let mut order: Vec<LibraryId> = self.explicit_order.clone().unwrap_or_default();
        let mut rest: Vec<LibraryId> = self
            .libraries
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !order.contains(id))
            .collect();
        rest.sort_by_key(|id| self.libraries[*id].priority);
        order.extend(rest);
        order
    }
}
