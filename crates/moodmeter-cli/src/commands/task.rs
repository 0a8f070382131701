use clap::Subcommand;
use moodmeter_core::weight::{list_segments, weight};
use moodmeter_core::{EditBuffer, Level, Task, TaskPatch};

use super::{level_arg, Context};

#[derive(Subcommand)]
pub enum TaskAction {
    /// List tasks, heaviest first (labels need a valid token)
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a task
    Add {
        /// Task label
        label: String,
        /// Tag value from the catalog
        #[arg(long)]
        tag: Option<String>,
        /// Risk level (1-3)
        #[arg(long, value_parser = level_arg)]
        risk: Option<u8>,
        /// Urgency level (1-3)
        #[arg(long, value_parser = level_arg)]
        urgency: Option<u8>,
        /// Importance level (1-3)
        #[arg(long, value_parser = level_arg)]
        importance: Option<u8>,
    },
    /// Change attributes of a task
    Set {
        /// Task ID
        id: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, value_parser = level_arg)]
        risk: Option<u8>,
        #[arg(long, value_parser = level_arg)]
        urgency: Option<u8>,
        #[arg(long, value_parser = level_arg)]
        importance: Option<u8>,
    },
    /// Remove a task
    Remove {
        /// Task ID
        id: String,
    },
}

fn level(value: Option<u8>) -> Result<Option<Level>, Box<dyn std::error::Error>> {
    Ok(value.map(Level::try_from).transpose()?)
}

fn list(ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let tasks = ctx.repo.load_tasks(ctx.access)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for segment in list_segments(&tasks) {
        let Some(task) = tasks.iter().find(|t| t.id == segment.id) else {
            continue;
        };
        println!(
            "{}  w={:>2}  r{} u{} i{}  [{}]  {}",
            task.id,
            weight(task),
            u8::from(task.risk),
            u8::from(task.urgency),
            u8::from(task.importance),
            task.tag,
            task.label.as_deref().unwrap_or("(hidden)"),
        );
    }
    Ok(())
}

pub fn run(action: TaskAction, token: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(token)?;

    let mut buffer = EditBuffer::new(ctx.repo.load_tasks(ctx.access)?);
    let message = match action {
        TaskAction::List { json } => return list(&ctx, json),
        TaskAction::Add {
            label,
            tag,
            risk,
            urgency,
            importance,
        } => {
            let mut task = Task::new(label);
            TaskPatch {
                label: None,
                tag,
                risk: level(risk)?,
                urgency: level(urgency)?,
                importance: level(importance)?,
            }
            .apply(&mut task);
            format!("Task added: {}", buffer.add_task(task))
        }
        TaskAction::Set {
            id,
            label,
            tag,
            risk,
            urgency,
            importance,
        } => {
            let patch = TaskPatch {
                label,
                tag,
                risk: level(risk)?,
                urgency: level(urgency)?,
                importance: level(importance)?,
            };
            let task = buffer.update_task(&id, patch)?;
            format!("Task updated: {}", task.id)
        }
        TaskAction::Remove { id } => {
            let task = buffer.remove_task(&id)?;
            format!("Task removed: {}", task.id)
        }
    };

    buffer.commit_edit(|tasks| ctx.repo.save_tasks(ctx.access, tasks))?;
    println!("{message}");
    Ok(())
}
