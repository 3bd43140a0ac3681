use std::io::Write;

use dew_api::v1::{FilterCriteria, Todo};
use dew_store::TodoStore;

use crate::config::Command;

/// Runs one local subcommand against `store`, printing results to `out`.
pub fn run(store: &mut TodoStore, command: Command, out: &mut impl Write) -> eyre::Result<()> {
    match command {
        Command::List(args) => {
            let todos = store.query(&FilterCriteria::from(args));

            for todo in &todos {
                print_todo(out, todo)?;
            }
        }
        Command::Add(args) => match store.add(args.into()) {
            Some(todo) => print_todo(out, &todo)?,
            None => eyre::bail!("title must not be empty"),
        },
        Command::Toggle { id } => {
            let todo = store
                .toggle_complete(id)
                .ok_or_else(|| eyre::eyre!("no todo with id {id}"))?;
            print_todo(out, &todo)?;
        }
        Command::Update(args) => {
            let id = args.id;
            let todo = store
                .update(id, args.into())
                .ok_or_else(|| eyre::eyre!("no todo with id {id}"))?;
            print_todo(out, &todo)?;
        }
        Command::Delete { id } => {
            if !store.delete(id) {
                eyre::bail!("no todo with id {id}");
            }
        }
        Command::ClearCompleted => {
            let removed = store.delete_completed();
            writeln!(out, "removed {removed} completed todos")?;
        }
        Command::Clear => store.clear(),
        Command::Serve(_) => eyre::bail!("serve is not a local command"),
    }

    Ok(())
}

fn print_todo(out: &mut impl Write, todo: &Todo) -> eyre::Result<()> {
    let check = if todo.completed { 'x' } else { ' ' };

    write!(
        out,
        "[{check}] {id}  {priority:<6}  {title}",
        id = todo.id,
        priority = todo.priority,
        title = todo.title,
    )?;

    if let Some(due) = todo.due_date {
        write!(out, "  (due {})", due.format("%Y-%m-%d %H:%M"))?;
    }

    writeln!(out)?;

    if let Some(description) = &todo.description {
        writeln!(out, "    {description}")?;
    }

    Ok(())
}
