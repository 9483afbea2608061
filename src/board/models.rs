use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three fixed board columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::ToDo, Self::InProgress, Self::Done];

    /// Wire label used in the JSON task representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToDo => "ToDo",
            Self::InProgress => "InProgress",
            Self::Done => "Done",
        }
    }

    /// Column heading shown to users.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Column to the right, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::ToDo => Some(Self::InProgress),
            Self::InProgress => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Column to the left, if any.
    pub fn previous(&self) -> Option<Self> {
        match self {
            Self::ToDo => None,
            Self::InProgress => Some(Self::ToDo),
            Self::Done => Some(Self::InProgress),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Accepts the wire labels plus the kebab/snake spellings used on the
    /// command line, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" | "to-do" | "to_do" => Ok(Self::ToDo),
            "inprogress" | "in-progress" | "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// A unit of work on the board.
///
/// `id` is empty until the remote store has accepted the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }
}

/// User input for a new task. The status is not caller-supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The task sent to the store on create: no id, first column.
    pub fn into_task(self) -> Task {
        Task {
            id: String::new(),
            title: self.title,
            description: self.description.unwrap_or_default(),
            status: TaskStatus::ToDo,
        }
    }
}

/// Field changes for an existing task. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Merge onto `task`, producing the full representation sent to the store.
    pub fn apply_to(&self, task: &Task) -> Task {
        Task {
            id: task.id.clone(),
            title: self.title.clone().unwrap_or_else(|| task.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| task.description.clone()),
            status: self.status.unwrap_or(task.status),
        }
    }
}

/// Where a dragged card was released: a column and an index inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub status: TaskStatus,
    pub index: usize,
}

// API view types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnView {
    pub status: TaskStatus,
    pub title: &'static str,
    pub tasks: Vec<Task>,
}
