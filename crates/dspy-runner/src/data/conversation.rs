use serde::{Deserialize, Serialize};

/// The user turns of one conversation, in the order they are sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<String>,
}

impl Conversation {
    pub fn new<T: Into<String>>(turns: impl IntoIterator<Item = T>) -> Self {
        Self {
            turns: turns.into_iter().map(Into::into).collect(),
        }
    }

    /// A conversation with exactly one user turn.
    pub fn single(turn: impl Into<String>) -> Self {
        Self {
            turns: vec![turn.into()],
        }
    }

    pub fn turns(&self) -> &[String] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl From<Vec<String>> for Conversation {
    fn from(turns: Vec<String>) -> Self {
        Self { turns }
    }
}

impl<T: Into<String>> FromIterator<T> for Conversation {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}
