use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: String,
    #[serde(default)]
    pub completed: bool,
}

/// Raw create-form input. Missing fields deserialize as empty strings so that
/// validation, not the extractor, decides what is acceptable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: String,
}

/// A task that passed validation and can be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    title: String,
    description: String,
    due_date: String,
}

impl NewTask {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn due_date(&self) -> &str {
        &self.due_date
    }
}

impl TryFrom<TaskForm> for NewTask {
    type Error = &'static str;

    fn try_from(form: TaskForm) -> Result<Self, Self::Error> {
        if form.title.trim().is_empty() || form.due_date.trim().is_empty() {
            return Err("Title and due date are required");
        }

        Ok(NewTask {
            title: form.title,
            description: form.description,
            due_date: form.due_date,
        })
    }
}
