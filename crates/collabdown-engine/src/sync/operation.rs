use serde::{Deserialize, Serialize};

/// Identifier the operation log assigns to each participant
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who produced an edit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    Local,
    Remote(ParticipantId),
}

impl Origin {
    pub fn participant(&self) -> Option<&ParticipantId> {
        match self {
            Origin::Local => None,
            Origin::Remote(id) => Some(id),
        }
    }
}

/// An edit in character-offset terms, the unit exchanged with the operation log.
///
/// Offsets refer to the document as it was immediately before the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Insert { offset: usize, text: String },
    Delete { offset: usize, length: usize },
}

impl Operation {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Operation::Insert {
            offset,
            text: text.into(),
        }
    }

    pub fn delete(offset: usize, length: usize) -> Self {
        Operation::Delete { offset, length }
    }

    pub fn offset(&self) -> usize {
        match self {
            Operation::Insert { offset, .. } | Operation::Delete { offset, .. } => *offset,
        }
    }

    /// Change in document length in characters
    pub fn delta(&self) -> isize {
        match self {
            Operation::Insert { text, .. } => {
                isize::try_from(text.chars().count()).unwrap_or(isize::MAX)
            }
            Operation::Delete { length, .. } => -isize::try_from(*length).unwrap_or(isize::MAX),
        }
    }

    /// First offset after the affected span, in pre-operation coordinates
    pub fn end(&self) -> usize {
        match self {
            Operation::Insert { offset, .. } => *offset,
            Operation::Delete { offset, length } => offset.saturating_add(*length),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Insert { offset, text } => write!(f, "insert {text:?} at {offset}"),
            Operation::Delete { offset, length } => write!(f, "delete {length} at {offset}"),
        }
    }
}
