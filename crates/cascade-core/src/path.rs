//! Keys addressing a branch of an error tree or diff
//!
//! A branch is named by a field or relation, or by the position of a child
//! inside a `Many` relation payload.

use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathKey {
    Index(usize),
    Name(String),
}

impl PathKey {
    /// Numeric-looking keys become indices, everything else stays a name
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<usize>() {
            Ok(index) => PathKey::Index(index),
            Err(_) => PathKey::Name(raw.to_string()),
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Index(i) => write!(f, "{}", i),
            PathKey::Name(n) => f.write_str(n),
        }
    }
}

impl Serialize for PathKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

impl From<&str> for PathKey {
    fn from(name: &str) -> Self {
        PathKey::Name(name.to_string())
    }
}

impl From<String> for PathKey {
    fn from(name: String) -> Self {
        PathKey::Name(name)
    }
}

impl From<&String> for PathKey {
    fn from(name: &String) -> Self {
        PathKey::Name(name.clone())
    }
}
