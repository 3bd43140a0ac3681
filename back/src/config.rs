use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use dew_api::v1::{FilterCriteria, NewTodo, Priority, PriorityFilter, StatusFilter, TodoPatch};
use dew_store::{StoreConfig, DEFAULT_KEY};
use uuid::Uuid;

const PORT: u16 = 7890;

#[derive(Debug, Parser)]
#[command(name = "dew", version, about = "Keep track of todos")]
pub struct Config {
    /// Directory the todo list is stored in.
    #[arg(long, env = "DEW_DATA_DIR", default_value = ".", global = true)]
    pub data_dir: PathBuf,

    /// Storage key (file name) of the todo list.
    #[arg(long, env = "DEW_STORAGE_KEY", default_value = DEFAULT_KEY, global = true)]
    pub key: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    pub fn store(&self) -> StoreConfig {
        StoreConfig {
            key: self.key.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print todos, optionally filtered.
    List(ListArgs),
    /// Add a todo.
    Add(AddArgs),
    /// Flip a todo between active and completed.
    Toggle { id: Uuid },
    /// Change fields of a todo.
    Update(UpdateArgs),
    /// Delete a todo.
    Delete { id: Uuid },
    /// Delete every completed todo.
    ClearCompleted,
    /// Delete every todo.
    Clear,
    /// Serve the todo list over HTTP.
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only titles containing this text (case-insensitive).
    #[arg(long, default_value = "")]
    pub text: String,

    #[arg(long, default_value = "all")]
    pub priority: PriorityFilter,

    #[arg(long, default_value = "all")]
    pub status: StatusFilter,
}

impl From<ListArgs> for FilterCriteria {
    fn from(args: ListArgs) -> Self {
        FilterCriteria {
            text: args.text,
            priority: args.priority,
            status: args.status,
        }
    }
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub title: String,

    #[arg(long, short, default_value = "medium")]
    pub priority: Priority,

    #[arg(long, short)]
    pub description: Option<String>,

    /// RFC 3339 timestamp, e.g. 2026-11-01T09:00:00Z
    #[arg(long)]
    pub due: Option<DateTime<Utc>>,
}

impl From<AddArgs> for NewTodo {
    fn from(args: AddArgs) -> Self {
        NewTodo {
            title: args.title,
            priority: args.priority,
            description: args.description,
            due_date: args.due,
        }
    }
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: Uuid,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, short, conflicts_with = "clear_description")]
    pub description: Option<String>,

    #[arg(long)]
    pub clear_description: bool,

    #[arg(long, short)]
    pub priority: Option<Priority>,

    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<DateTime<Utc>>,

    #[arg(long)]
    pub clear_due: bool,

    #[arg(long)]
    pub completed: Option<bool>,
}

impl From<UpdateArgs> for TodoPatch {
    fn from(args: UpdateArgs) -> Self {
        let description = match (args.description, args.clear_description) {
            (_, true) => Some(None),
            (Some(description), false) => Some(Some(description)),
            (None, false) => None,
        };

        let due_date = match (args.due, args.clear_due) {
            (_, true) => Some(None),
            (Some(due), false) => Some(Some(due)),
            (None, false) => None,
        };

        TodoPatch {
            title: args.title,
            description,
            completed: args.completed,
            priority: args.priority,
            due_date,
        }
    }
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "DEW_PORT", default_value_t = PORT)]
    pub port: u16,

    /// PEM certificate; TLS is enabled when this and `--cert-key` are set.
    #[arg(long, env = "SSL_CERT", requires = "cert_key")]
    pub cert: Option<PathBuf>,

    #[arg(long, env = "SSL_KEY", requires = "cert")]
    pub cert_key: Option<PathBuf>,
}

impl ServeArgs {
    pub fn tls(&self) -> Option<(PathBuf, PathBuf)> {
        self.cert.clone().zip(self.cert_key.clone())
    }
}
