use std::collections::BTreeMap;

use super::types::MediaAction;

/// Click count to action mapping. Counts without an entry finalize to nothing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClickPatternTable {
    entries: BTreeMap<u32, MediaAction>,
}

impl ClickPatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, clicks: u32, action: MediaAction) -> Option<MediaAction> {
        self.entries.insert(clicks, action)
    }

    pub fn get(&self, clicks: u32) -> Option<MediaAction> {
        self.entries.get(&clicks).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, MediaAction)> + '_ {
        self.entries.iter().map(|(clicks, action)| (*clicks, *action))
    }
}

impl FromIterator<(u32, MediaAction)> for ClickPatternTable {
    fn from_iter<I: IntoIterator<Item = (u32, MediaAction)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
