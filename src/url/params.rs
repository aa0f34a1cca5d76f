use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Key of a [`ParamBag`] entry.
///
/// Positional keys sort before named keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamKey {
    Index(usize),
    Named(String),
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Index(i) => write!(f, "{i}"),
            ParamKey::Named(name) => f.write_str(name),
        }
    }
}

impl From<&str> for ParamKey {
    /// All-digit keys become positional.
    fn from(key: &str) -> Self {
        match key.parse::<usize>() {
            Ok(index) if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) => {
                ParamKey::Index(index)
            }
            _ => ParamKey::Named(key.to_string()),
        }
    }
}

/// Ordered parameter list handed to the URL generator.
///
/// Named entries fill `{name}` placeholders; positional entries fill
/// whatever placeholders are left, in index order. Entries that are not
/// consumed end up in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBag {
    entries: Vec<(ParamKey, String)>,
}

impl ParamBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named entry.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(ParamKey::Named(name.into()), value.into());
        self
    }

    /// Append a positional entry.
    #[must_use]
    pub fn push(mut self, value: impl Into<String>) -> Self {
        let next = self
            .entries
            .iter()
            .filter_map(|(k, _)| match k {
                ParamKey::Index(i) => Some(i + 1),
                ParamKey::Named(_) => None,
            })
            .max()
            .unwrap_or(0);
        self.entries.push((ParamKey::Index(next), value.into()));
        self
    }

    /// Insert, replacing an existing entry with the same key in place.
    pub fn insert(&mut self, key: ParamKey, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, ParamKey::Named(n) if n == name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove and return a named entry.
    pub fn pull(&mut self, name: &str) -> Option<String> {
        let index = self
            .entries
            .iter()
            .position(|(k, _)| matches!(k, ParamKey::Named(n) if n == name))?;
        Some(self.entries.remove(index).1)
    }

    /// Remove and return the positional entry with the lowest index.
    pub fn pull_first_positional(&mut self) -> Option<String> {
        let (position, _) = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(pos, (k, _))| match k {
                ParamKey::Index(i) => Some((pos, *i)),
                ParamKey::Named(_) => None,
            })
            .min_by_key(|(_, i)| *i)?;
        Some(self.entries.remove(position).1)
    }

    #[must_use]
    pub fn has_positional(&self) -> bool {
        self.entries
            .iter()
            .any(|(k, _)| matches!(k, ParamKey::Index(_)))
    }

    pub fn named(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(k, v)| match k {
            ParamKey::Named(name) => Some((name.as_str(), v.as_str())),
            ParamKey::Index(_) => None,
        })
    }

    pub fn positional(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(k, v)| match k {
            ParamKey::Index(_) => Some(v.as_str()),
            ParamKey::Named(_) => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Order positional entries by index, then named entries by key.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParamBag {
    /// Keys made only of digits are positional.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = ParamBag::new();
        for (key, value) in iter {
            let key: String = key.into();
            bag.insert(ParamKey::from(key.as_str()), value.into());
        }
        bag
    }
}

impl From<HashMap<String, String>> for ParamBag {
    fn from(map: HashMap<String, String>) -> Self {
        let sorted: BTreeMap<String, String> = map.into_iter().collect();
        sorted.into_iter().collect()
    }
}

impl From<Vec<String>> for ParamBag {
    fn from(values: Vec<String>) -> Self {
        Self {
            entries: values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (ParamKey::Index(i), v))
                .collect(),
        }
    }
}
