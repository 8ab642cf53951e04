// Queue Identity - (queue name, URL prefix), compared case-insensitively

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies one physical dispatch queue.
///
/// Both fields keep their original spelling for display, but equality and
/// hashing fold case so `Orders` and `orders` name the same queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueIdentity {
    queue_name: String,
    url_prefix: String,
}

impl QueueIdentity {
    pub fn new(queue_name: impl Into<String>, url_prefix: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }
}

fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

impl PartialEq for QueueIdentity {
    fn eq(&self, other: &Self) -> bool {
        folded(&self.queue_name).eq(folded(&other.queue_name))
            && folded(&self.url_prefix).eq(folded(&other.url_prefix))
    }
}

impl Eq for QueueIdentity {}

impl Hash for QueueIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must hash exactly the sequence `eq` compares
        for c in folded(&self.queue_name) {
            c.hash(state);
        }
        // Field separator keeps ("ab", "c") and ("a", "bc") apart
        state.write_u8(0xff);
        for c in folded(&self.url_prefix) {
            c.hash(state);
        }
    }
}

impl fmt::Display for QueueIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.queue_name, self.url_prefix)
    }
}
