//! Insertion-ordered frequency counting.
//!
//! Every "most frequent" statistic breaks ties in favor of the key seen first,
//! so counts are kept in first-seen order and ranked with a stable sort.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct Tally<K> {
    order: Vec<(K, i64)>,
    index: HashMap<K, usize>,
}

impl<K> Default for Tally<K> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> Tally<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, amount: i64) {
        match self.index.get(&key) {
            Some(&i) => self.order[i].1 += amount,
            None => {
                self.index.insert(key.clone(), self.order.len());
                self.order.push((key, amount));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.iter().map(|(k, _)| k)
    }

    /// Highest count; the first-seen key on ties.
    pub fn most_frequent(&self) -> Option<&K> {
        self.order
            .iter()
            .fold(None::<&(K, i64)>, |best, entry| match best {
                Some(b) if b.1 >= entry.1 => Some(b),
                _ => Some(entry),
            })
            .map(|(k, _)| k)
    }

    /// Up to `n` keys by descending count, first-seen order within equal counts.
    pub fn top(&self, n: usize) -> Vec<K> {
        let mut ranked: Vec<&(K, i64)> = self.order.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().take(n).map(|(k, _)| k.clone()).collect()
    }
}

impl<K: Clone + Eq + Hash> FromIterator<K> for Tally<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tally = Tally::new();
        for key in iter {
            tally.add(key, 1);
        }
        tally
    }
}
