use crate::{key::Chord, mode::Mode};
use smallvec::SmallVec;

/// Transient state held while a prefix sequence awaits its continuation.
/// Reset on completion, on escape, or on timeout; never outlives a sequence.
#[derive(Debug, Clone)]
pub(crate) struct PrefixState {
    /// Mode that was active when the prefix began; restored on abort.
    pub origin: Mode,

    /// Mode whose table resolves the next continuation key.
    pub submap: Mode,

    /// Keys accumulated so far, the prefix chord included.
    pub keys: SmallVec<[Chord; 4]>,

    /// Ticks since the last key arrived.
    pub idle_ticks: u32,
}

impl PrefixState {
    pub fn enter(origin: Mode, submap: Mode, chord: Chord) -> Self {
        let mut keys = SmallVec::new();
        keys.push(chord);
        Self {
            origin,
            submap,
            keys,
            idle_ticks: 0,
        }
    }

    /// Descend into a nested prefix map.
    pub fn descend(&mut self, submap: Mode, chord: Chord) {
        self.keys.push(chord);
        self.submap = submap;
        self.idle_ticks = 0;
    }
}
