use std::collections::HashSet;

use dew_api::v1::{normalize_title, Todo};
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Serialize)]
enum DataBorrowed<'a> {
    V1 { todos: &'a [Todo] },
}

#[derive(Deserialize)]
enum DataOwned {
    V1 { todos: Vec<Todo> },
}

/// Serializes the whole collection as RON text.
pub fn encode(todos: &[Todo]) -> eyre::Result<Vec<u8>> {
    let data = DataBorrowed::V1 { todos };
    let text = ron::ser::to_string_pretty(&data, Default::default())?;

    Ok(text.into_bytes())
}

/// Parses a payload written by [`encode`].
///
/// Records that would break the collection's invariants (blank titles,
/// repeated ids, `updated_at` before `created_at`) are repaired or dropped.
pub fn decode(bytes: &[u8]) -> eyre::Result<Vec<Todo>> {
    let text = std::str::from_utf8(bytes).wrap_err("payload is not UTF-8")?;
    let data: DataOwned = ron::from_str(text).wrap_err("payload is not a todo list")?;

    let todos = match data {
        DataOwned::V1 { todos } => todos,
    };

    Ok(sanitize(todos))
}

fn sanitize(todos: Vec<Todo>) -> Vec<Todo> {
    let mut seen = HashSet::with_capacity(todos.len());
    let mut kept = Vec::with_capacity(todos.len());

    for mut todo in todos {
        match normalize_title(&todo.title) {
            Some(title) => todo.title = title,
            None => {
                warn!(id = %todo.id, "dropping todo with empty title");
                continue;
            }
        }

        if !seen.insert(todo.id) {
            warn!(id = %todo.id, "dropping duplicate todo");
            continue;
        }

        if todo.updated_at < todo.created_at {
            todo.updated_at = todo.created_at;
        }

        kept.push(todo);
    }

    kept
}
