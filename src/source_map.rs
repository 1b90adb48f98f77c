//! Mapping between memory locations and source lines.

use std::collections::HashMap;
use std::iter::FromIterator;

/// Mapping from memory addresses into the source line numbers that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    inner: HashMap<u16, usize>,
}

impl FromIterator<(u16, usize)> for SourceMap {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (u16, usize)>,
    {
        SourceMap {
            inner: HashMap::from_iter(iter),
        }
    }
}

impl SourceMap {
    /// Returns the line in the original source code which defined the word at the given memory
    /// location.
    pub fn get_source_line(&self, address: u16) -> Option<usize> {
        self.inner.get(&address).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[test]
fn test_source_lines() {
    let map: SourceMap = vec![(10, 2), (11, 3), (12, 3)].into_iter().collect();

    assert_eq!(map.len(), 3);
    assert_eq!(map.get_source_line(12), Some(3));
    assert_eq!(map.get_source_line(13), None);
}
