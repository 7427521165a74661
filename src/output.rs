//! Per-task results and their ordered aggregation.

use crate::transport::Payload;
use std::collections::HashMap;
use std::time::Duration;

/// Final state of one task, stored at the task's input position.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// The task succeeded after `attempts` attempts.
    Done { payload: Payload, attempts: u32 },
    /// Every allowed attempt failed.
    Exhausted { attempts: u32, last_error: String },
    /// A terminal failure stopped the task early.
    Rejected { attempts: u32, error: String },
    /// No worker resolved the task.
    Unresolved,
}

impl Slot {
    /// Returns `true` for every slot without a payload.
    pub fn is_empty(&self) -> bool {
        !matches!(self, Slot::Done { .. })
    }

    /// The payload of a successful slot.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Slot::Done { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Consume the slot, keeping only a successful payload.
    pub fn into_payload(self) -> Option<Payload> {
        match self {
            Slot::Done { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Attempts spent on this task; zero if it was never resolved.
    pub fn attempts(&self) -> u32 {
        match self {
            Slot::Done { attempts, .. }
            | Slot::Exhausted { attempts, .. }
            | Slot::Rejected { attempts, .. } => *attempts,
            Slot::Unresolved => 0,
        }
    }
}

/// Summary of a finished batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    /// Number of workers actually spawned.
    pub workers: usize,
    pub total_attempts: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Results of a batch, aligned with the input targets.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    slots: Vec<Slot>,
    stats: BatchStats,
}

impl BatchOutput {
    /// Number of slots, always equal to the number of input targets.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` for an empty batch.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The slot of the target at `index`.
    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// All slots in input order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Counters for the finished batch.
    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// Iterate over the slots in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, Slot> {
        self.slots.iter()
    }

    /// Payloads in input order, `None` wherever the task did not succeed.
    pub fn into_payloads(self) -> Vec<Option<Payload>> {
        self.slots.into_iter().map(Slot::into_payload).collect()
    }
}

impl IntoIterator for BatchOutput {
    type Item = Slot;
    type IntoIter = std::vec::IntoIter<Slot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}

impl<'a> IntoIterator for &'a BatchOutput {
    type Item = &'a Slot;
    type IntoIter = std::slice::Iter<'a, Slot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

/// Merge per-worker result maps into `total` ordered slots.
///
/// Must only be called after every worker has stopped. Keys are disjoint
/// because each task is owned by one worker when it resolves.
pub(crate) fn aggregate(
    total: usize,
    results: Vec<HashMap<usize, Slot>>,
    workers: usize,
    elapsed: Duration,
) -> BatchOutput {
    let mut merged: HashMap<usize, Slot> = HashMap::with_capacity(total);
    for map in results {
        for (index, slot) in map {
            let previous = merged.insert(index, slot);
            debug_assert!(previous.is_none(), "task {} resolved twice", index);
        }
    }

    let slots: Vec<Slot> = (0..total)
        .map(|index| merged.remove(&index).unwrap_or(Slot::Unresolved))
        .collect();

    let succeeded = slots.iter().filter(|slot| !slot.is_empty()).count();
    let stats = BatchStats {
        workers,
        total_attempts: slots.iter().map(|slot| u64::from(slot.attempts())).sum(),
        succeeded,
        failed: total - succeeded,
        elapsed,
    };

    BatchOutput { slots, stats }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(text: &str, attempts: u32) -> Slot {
        Slot::Done {
            payload: Payload::Raw(text.as_bytes().to_vec()),
            attempts,
        }
    }

    #[test]
    fn merges_disjoint_maps_in_index_order() {
        let first = HashMap::from([(2, done("c", 1)), (0, done("a", 2))]);
        let second = HashMap::from([(
            1,
            Slot::Exhausted {
                attempts: 3,
                last_error: "boom".into(),
            },
        )]);

        let output = aggregate(4, vec![first, second], 2, Duration::from_millis(5));

        assert_eq!(output.len(), 4);
        assert_eq!(output.get(0), Some(&done("a", 2)));
        assert!(output.get(1).unwrap().is_empty());
        assert_eq!(output.get(2), Some(&done("c", 1)));
        assert_eq!(output.get(3), Some(&Slot::Unresolved));

        let stats = output.stats();
        assert_eq!(stats.workers, 2);
        assert_eq!(stats.total_attempts, 6);
        assert_eq!((stats.succeeded, stats.failed), (2, 2));
    }

    #[test]
    fn payload_view_uses_none_for_failures() {
        let results = vec![HashMap::from([
            (0, done("x", 1)),
            (
                1,
                Slot::Rejected {
                    attempts: 1,
                    error: "404".into(),
                },
            ),
        ])];
        let payloads = aggregate(2, results, 1, Duration::ZERO).into_payloads();
        assert_eq!(payloads, vec![Some(Payload::Raw(b"x".to_vec())), None]);
    }

    #[test]
    fn empty_batch() {
        let output = aggregate(0, Vec::new(), 0, Duration::ZERO);
        assert!(output.is_empty());
        assert_eq!(output.stats().succeeded, 0);
    }
}
