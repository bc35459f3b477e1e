/// Frequency tallies with reproducible ranking
use ahash::AHashMap;
use serde::Serialize;

/// Counts keys in first-seen order
#[derive(Debug, Clone, Default)]
pub struct Tally {
    index: AHashMap<String, usize>,
    entries: Vec<TallyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    pub key: String,
    pub count: usize,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&idx) => self.entries[idx].count += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push(TallyEntry {
                    key: key.to_string(),
                    count: 1,
                });
            }
        }
    }

    pub fn count(&self, key: &str) -> usize {
        self.index.get(key).map(|&idx| self.entries[idx].count).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descending by count; equal counts keep first-seen order
    pub fn ranked(&self) -> Vec<TallyEntry> {
        let mut ranked = self.entries.clone();
        // sort_by is stable
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }
}

impl<'a> FromIterator<&'a str> for Tally {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tally = Tally::new();
        for key in iter {
            tally.add(key);
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(entries: &[TallyEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.key.as_str()).collect()
    }

    #[test]
    fn test_ranking_is_descending() {
        let tally: Tally = ["NotFound", "InvalidArgument", "InvalidArgument", "AlreadyExists"]
            .into_iter()
            .collect();
        let ranked = tally.ranked();
        assert_eq!(ranked[0], TallyEntry { key: "InvalidArgument".into(), count: 2 });
        assert_eq!(tally.count("NotFound"), 1);
        assert_eq!(tally.count("Internal"), 0);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let tally: Tally = ["b", "a", "c", "a", "b", "d"].into_iter().collect();
        assert_eq!(keys(&tally.ranked()), vec!["b", "a", "c", "d"]);

        // repeated ranking is reproducible
        assert_eq!(tally.ranked(), tally.ranked());
    }
}
