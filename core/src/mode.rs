use indexmap::IndexSet;
use smol_str::SmolStr;

/// Identifier of a dispatch context. Cheap to copy; issued by
/// [`ModeRegistry::declare`] and only meaningful to the registry that issued
/// it. Exactly one mode is active per dispatcher at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mode(u32);

impl Mode {
    /// The default mode. Its bindings form the base layer beneath every other
    /// mode, and it exists in every registry from construction.
    pub const GLOBAL: Mode = Mode(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Mode(index as u32)
    }
}

/// The enumerable, named set of dispatch contexts known to one dispatcher.
/// Declaration order is preserved for introspection and help output.
#[derive(Debug, Clone)]
pub struct ModeRegistry {
    names: IndexSet<SmolStr>,
}

pub(crate) const GLOBAL_NAME: &str = "global";

impl ModeRegistry {
    pub fn new() -> Self {
        let mut names = IndexSet::new();
        names.insert(SmolStr::new_static(GLOBAL_NAME));
        Self { names }
    }

    /// Declare a mode, returning its id. Redeclaring an existing name returns
    /// the id it already has.
    pub fn declare(&mut self, name: impl Into<SmolStr>) -> Mode {
        let (index, _) = self.names.insert_full(name.into());
        Mode::from_index(index)
    }

    /// Look up a declared mode by name.
    pub fn get(&self, name: &str) -> Option<Mode> {
        self.names.get_index_of(name).map(Mode::from_index)
    }

    pub fn name(&self, mode: Mode) -> Option<&str> {
        self.names.get_index(mode.index()).map(|s| s.as_str())
    }

    pub fn contains(&self, mode: Mode) -> bool {
        mode.index() < self.names.len()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the global mode always exists
    }

    /// Iterate modes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Mode, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (Mode::from_index(index), name.as_str()))
    }

    /// Printable name for logs and errors, even for foreign ids.
    pub(crate) fn display(&self, mode: Mode) -> String {
        match self.name(mode) {
            Some(name) => name.to_string(),
            None => format!("#{}", mode.index()),
        }
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
