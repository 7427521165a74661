//! Shared queue of pending tasks.

use crate::task::{Target, Task};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// FIFO of tasks waiting for a worker.
///
/// A task is either in here or in exactly one worker's hands; ownership moves
/// through `try_pop` and `push`. Nothing ever waits on the queue: a worker
/// that finds it empty stops.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    /// Build a queue holding one fresh task per target, in input order.
    pub fn seeded(targets: Vec<Target>) -> Self {
        let tasks = targets
            .into_iter()
            .enumerate()
            .map(|(index, target)| Task::new(index, target))
            .collect();
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    /// Append a task at the back.
    pub fn push(&self, task: Task) {
        self.tasks.lock().push_back(task);
    }

    /// Remove the front task, or return `None` without blocking.
    pub fn try_pop(&self) -> Option<Task> {
        self.tasks.lock().pop_front()
    }

    /// Number of tasks currently waiting. In-flight tasks are not counted.
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().len()
    }
}
