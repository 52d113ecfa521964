//! Partition types
//!
//! A [`Partition`] names one shard of one topic. A [`PartitionGroup`] is the
//! ordered, non-empty set of partitions owned by a single publisher or
//! subscriber instance.

use std::fmt;

/// One partition of one topic
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition {
    /// Topic name
    pub topic: String,
    /// Partition index within the topic
    pub index: i32,
}

impl Partition {
    pub fn new(topic: impl Into<String>, index: i32) -> Self {
        Self {
            topic: topic.into(),
            index,
        }
    }

    /// Build partitions of one topic from a list of indices, keeping order
    pub fn for_topic(topic: &str, indices: &[i32]) -> Vec<Partition> {
        indices
            .iter()
            .map(|&index| Partition::new(topic, index))
            .collect()
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.topic, self.index)
    }
}

/// Partitions assigned to exactly one instance
///
/// Only the allocator creates groups, and it never creates an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionGroup {
    partitions: Vec<Partition>,
}

impl PartitionGroup {
    /// Wrap a non-empty slice of partitions
    pub(crate) fn new(partitions: Vec<Partition>) -> Self {
        debug_assert!(!partitions.is_empty(), "partition groups are never empty");
        Self { partitions }
    }

    /// Partitions in allocation order
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Number of partitions in the group
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// True if the group holds no partitions
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Partition indices in allocation order
    pub fn indices(&self) -> Vec<i32> {
        self.partitions.iter().map(|p| p.index).collect()
    }

    pub fn into_partitions(self) -> Vec<Partition> {
        self.partitions
    }
}

impl fmt::Display for PartitionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.partitions.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
