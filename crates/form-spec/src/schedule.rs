use crate::answers::AnswerValue;

/// Work deferred by the navigator.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    /// Paragraph blocks move on by themselves.
    AutoAdvance { block_id: String },
    /// A confirmed choice advances after the UI had time to show it. The value
    /// travels with the task so the store does not have to have caught up.
    ChoiceAdvance { block_id: String, value: AnswerValue },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub id: u64,
    pub due_at_ms: u64,
    /// Navigation epoch the task was scheduled in.
    pub epoch: u64,
    pub kind: TaskKind,
}

/// Cancellable timers owned by a navigation state.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_at_ms: u64, epoch: u64, kind: TaskKind) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.tasks.push(ScheduledTask {
            id,
            due_at_ms,
            epoch,
            kind,
        });
        id
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn cancel_choice_advances(&mut self) {
        self.tasks
            .retain(|task| !matches!(task.kind, TaskKind::ChoiceAdvance { .. }));
    }

    /// Removes and returns due tasks, earliest first.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<ScheduledTask> {
        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .tasks
            .drain(..)
            .partition(|task| task.due_at_ms <= now_ms);
        self.tasks = pending;
        due.sort_by_key(|task| (task.due_at_ms, task.id));
        due
    }

    pub fn next_due(&self) -> Option<u64> {
        self.tasks.iter().map(|task| task.due_at_ms).min()
    }

    pub fn pending(&self) -> &[ScheduledTask] {
        &self.tasks
    }
}
