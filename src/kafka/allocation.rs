//! Partition Allocation
//!
//! Divides a topic's partitions across a requested number of instances.
//!
//! # Algorithm
//!
//! 1. If at least as many instances are requested as there are partitions,
//!    every partition becomes its own group.
//! 2. Otherwise compute `chunk = ceil(total / requested)`.
//! 3. Cut the ordered partitions into consecutive chunks of `chunk`; the last
//!    chunk holds the remainder.
//!
//! The number of groups is `ceil(total / chunk)`, which can be smaller than
//! the number requested. Callers size their instance pool from the returned
//! groups, never from the request.
//!
//! # Example
//!
//! With 4 partitions and 3 requested instances:
//! - chunk = ceil(4 / 3) = 2
//! - Group 0: partitions [0, 1]
//! - Group 1: partitions [2, 3]
//!
//! Only 2 instances are created. Honoring the request exactly would give one
//! instance twice the load of the others.

use super::error::AllocationError;
use super::partition::{Partition, PartitionGroup};

/// Split `partitions` into at most `requested` groups of even size
///
/// Group order and order within each group follow the input.
pub fn allocate(
    partitions: Vec<Partition>,
    requested: usize,
) -> Result<Vec<PartitionGroup>, AllocationError> {
    if requested == 0 {
        return Err(AllocationError::ZeroInstances);
    }
    if partitions.is_empty() {
        return Err(AllocationError::NoPartitions);
    }

    let total = partitions.len();
    let chunk_size = if requested >= total {
        1
    } else {
        total.div_ceil(requested)
    };

    Ok(partitions
        .chunks(chunk_size)
        .map(|chunk| PartitionGroup::new(chunk.to_vec()))
        .collect())
}
