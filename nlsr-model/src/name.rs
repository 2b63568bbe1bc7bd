//! Hierarchical names
//!
//! A `Name` is an ordered sequence of UTF-8 components. The `/` separator only
//! exists in the URI form: once parsed, every operation works on components.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("name must start with '/': {0}")]
    NotAbsolute(String),
}

/// Hierarchical identity, certificate or advertisement name.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    components: Vec<String>,
}

impl Name {
    /// The empty name (`/`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a name from components. Empty components are dropped.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components
                .into_iter()
                .map(Into::into)
                .filter(|c: &String| !c.is_empty())
                .collect(),
        }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.components.get(index).map(String::as_str)
    }

    /// Append one component.
    pub fn append(mut self, component: impl Into<String>) -> Self {
        let component = component.into();
        if !component.is_empty() {
            self.components.push(component);
        }
        self
    }

    /// Append every component of `suffix`.
    pub fn join(mut self, suffix: &Name) -> Self {
        self.components.extend(suffix.components.iter().cloned());
        self
    }

    /// The first `n` components (the whole name if `n >= len`).
    pub fn prefix(&self, n: usize) -> Name {
        Self {
            components: self.components[..n.min(self.len())].to_vec(),
        }
    }

    /// Name without its last component.
    pub fn parent(&self) -> Name {
        self.prefix(self.len().saturating_sub(1))
    }

    /// Index of the first component equal to `segment`.
    pub fn position(&self, segment: &str) -> Option<usize> {
        self.components.iter().position(|c| c == segment)
    }

    pub fn contains(&self, segment: &str) -> bool {
        self.position(segment).is_some()
    }

    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.len() <= other.len() && self.components[..] == other.components[..self.len()]
    }

    /// Tolerant lookup rule: `stored` is a prefix of `self` and `self` is at
    /// most one component longer.
    ///
    /// Lets a certificate name and the same name carrying a trailing version
    /// component resolve to one stored record.
    pub fn resolves_to(&self, stored: &Name) -> bool {
        stored.is_prefix_of(self) && self.len() - stored.len() <= 1
    }

    /// Tolerant rule in either direction.
    pub fn overlaps(&self, other: &Name) -> bool {
        self.resolves_to(other) || other.resolves_to(self)
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let trimmed = uri.trim();
        if !trimmed.starts_with('/') {
            return Err(NameError::NotAbsolute(uri.to_string()));
        }
        Ok(Self::from_components(trimmed.split('/')))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}
