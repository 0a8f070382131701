use clap::Subcommand;

use super::Context;

#[derive(Subcommand)]
pub enum TagAction {
    /// List the tag catalog
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a tag
    Add {
        /// Tag value referenced by tasks
        value: String,
        /// Display label (defaults to the value)
        #[arg(default_value = "")]
        label: String,
    },
    /// Delete a tag (refused while tasks use it and for the default tag)
    Delete {
        /// Tag value
        value: String,
    },
}

pub fn run(action: TagAction, token: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(token)?;

    match action {
        TagAction::List { json } => {
            let tags = ctx.repo.load_tags()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tags)?);
            } else {
                for tag in tags {
                    println!("{:<16} {}", tag.value, tag.label);
                }
            }
        }
        TagAction::Add { value, label } => {
            let tag = ctx.repo.add_tag(ctx.access, &value, &label)?;
            println!("Tag added: {}", tag.value);
        }
        TagAction::Delete { value } => {
            ctx.repo.delete_tag(ctx.access, &value)?;
            println!("Tag deleted: {value}");
        }
    }
    Ok(())
}
