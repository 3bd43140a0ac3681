use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{ParseError, Priority, Todo};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(wanted) => wanted == priority,
        }
    }
}

impl From<Priority> for PriorityFilter {
    fn from(priority: Priority) -> Self {
        PriorityFilter::Only(priority)
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityFilter::All => f.write_str("all"),
            PriorityFilter::Only(priority) => priority.fmt(f),
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PriorityFilter::All);
        }

        s.parse()
            .map(PriorityFilter::Only)
            .map_err(|_| ParseError::new("priority filter", s))
    }
}

impl TryFrom<String> for PriorityFilter {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PriorityFilter> for String {
    fn from(filter: PriorityFilter) -> Self {
        filter.to_string()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn matches(self, completed: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !completed,
            StatusFilter::Completed => completed,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
        })
    }
}

impl FromStr for StatusFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            _ => Err(ParseError::new("status filter", s)),
        }
    }
}

impl TryFrom<String> for StatusFilter {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StatusFilter> for String {
    fn from(filter: StatusFilter) -> Self {
        filter.to_string()
    }
}

/// What a view wants to see. The default matches every record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub text: String,
    pub priority: PriorityFilter,
    pub status: StatusFilter,
}

impl FilterCriteria {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn priority(mut self, priority: impl Into<PriorityFilter>) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    /// Case-insensitive title substring AND priority AND status.
    pub fn matches(&self, todo: &Todo) -> bool {
        self.priority.matches(todo.priority)
            && self.status.matches(todo.completed)
            && contains_ignore_case(&todo.title, &self.text)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}
