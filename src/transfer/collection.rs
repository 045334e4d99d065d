use std::ops::Index;

use super::TransferRef;

/// Ordered result set of a repository query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferCollection {
    items: Vec<TransferRef>,
}

impl TransferCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&TransferRef> {
        self.items.first()
    }

    pub fn get(&self, index: usize) -> Option<&TransferRef> {
        self.items.get(index)
    }

    pub fn push(&mut self, item: TransferRef) {
        self.items.push(item);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransferRef> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<TransferRef> {
        self.items
    }
}

impl From<Vec<TransferRef>> for TransferCollection {
    fn from(items: Vec<TransferRef>) -> Self {
        Self { items }
    }
}

impl FromIterator<TransferRef> for TransferCollection {
    fn from_iter<I: IntoIterator<Item = TransferRef>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TransferCollection {
    type Item = TransferRef;
    type IntoIter = std::vec::IntoIter<TransferRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a TransferCollection {
    type Item = &'a TransferRef;
    type IntoIter = std::slice::Iter<'a, TransferRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Index<usize> for TransferCollection {
    type Output = TransferRef;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}
