use dew_api::v1::{FilterCriteria, Todo};

/// Records in `todos` accepted by `criteria`, in their original order.
pub fn query<'a>(
    todos: &'a [Todo],
    criteria: &'a FilterCriteria,
) -> impl Iterator<Item = &'a Todo> + 'a {
    todos.iter().filter(move |todo| criteria.matches(todo))
}
