use std::time::Duration;

use chrono::Utc;
use clap::Subcommand;
use moodmeter_core::{Difficulty, EditBuffer, FlowReport};
use tracing::warn;

use super::{level_arg, Context};

/// How often `flow watch` reloads completions from storage.
const RELOAD_EVERY: Duration = Duration::from_secs(1);

#[derive(Subcommand)]
pub enum FlowAction {
    /// List open flow tasks
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a flow task
    Add {
        /// Task label
        label: String,
        /// Difficulty (1 easy, 2 medium, 3 hard)
        #[arg(long, default_value = "2", value_parser = level_arg)]
        difficulty: u8,
    },
    /// Remove a flow task without completing it
    Remove {
        /// Flow task ID
        id: String,
    },
    /// Complete a flow task, granting flow
    Complete {
        /// Flow task ID
        id: String,
    },
    /// Print the current flow level
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Continuously display the decaying flow level
    Watch {
        /// Stop after this many seconds (runs until Ctrl-C otherwise)
        #[arg(long)]
        for_secs: Option<u64>,
    },
}

fn print_report(report: &FlowReport) {
    match report.empty_at {
        Some(empty_at) => println!(
            "Flow: {:.1}%  ({} active, empty at {})",
            report.percent,
            report.active_completions,
            empty_at.with_timezone(&chrono::Local).format("%H:%M:%S")
        ),
        None => println!("Flow: {:.1}%", report.percent),
    }
}

pub fn run(action: FlowAction, token: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(token)?;

    match action {
        FlowAction::List { json } => {
            let state = ctx.repo.load_flow()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&state.tasks)?);
            } else if state.tasks.is_empty() {
                println!("No flow tasks.");
            } else {
                for task in &state.tasks {
                    println!("{}  d{}  {}", task.id, u8::from(task.difficulty), task.label);
                }
            }
        }
        FlowAction::Add { label, difficulty } => {
            let difficulty = Difficulty::try_from(difficulty)?;
            let mut buffer = EditBuffer::new(ctx.repo.load_flow()?.tasks);
            let id = buffer.add_flow_task(label, difficulty);
            buffer.commit_edit(|tasks| ctx.repo.save_flow_tasks(ctx.access, tasks))?;
            println!("Flow task added: {id}");
        }
        FlowAction::Remove { id } => {
            let mut buffer = EditBuffer::new(ctx.repo.load_flow()?.tasks);
            buffer.remove_flow_task(&id)?;
            buffer.commit_edit(|tasks| ctx.repo.save_flow_tasks(ctx.access, tasks))?;
            println!("Flow task removed: {id}");
        }
        FlowAction::Complete { id } => {
            let now = Utc::now();
            ctx.repo.complete_flow_task(ctx.access, &id, now)?;
            let state = ctx.repo.load_flow()?;
            print_report(&FlowReport::compute(&state.completions, now));
        }
        FlowAction::Status { json } => {
            let now = Utc::now();
            let state = ctx.repo.load_flow()?;
            let report = FlowReport::compute(&state.completions, now);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        FlowAction::Watch { for_secs } => {
            let runtime = Context::runtime()?;
            runtime.block_on(watch(&ctx, for_secs))?;
        }
    }
    Ok(())
}

async fn watch(ctx: &Context, for_secs: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let refresh = Duration::from_millis(ctx.config.flow.refresh_interval_ms);
    let mut ticker = tokio::time::interval(refresh);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut reload = tokio::time::interval(RELOAD_EVERY);
    let deadline = for_secs.map(|s| tokio::time::Instant::now() + Duration::from_secs(s));

    let mut completions = ctx.repo.load_flow()?.completions;
    let mut last_shown: Option<i64> = None;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let stop = sleep_until(deadline);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = &mut stop => break,
            _ = reload.tick() => {
                if let Err(e) = ctx.repo.prune_flow(Utc::now()) {
                    warn!(error = %e, "flow prune failed");
                }
                match ctx.repo.load_flow() {
                    Ok(state) => completions = state.completions,
                    Err(e) => warn!(error = %e, "flow reload failed, keeping previous completions"),
                }
            }
            _ = ticker.tick() => {
                let report = FlowReport::compute(&completions, Utc::now());
                // Only redraw when the tenths digit changes.
                let shown = (report.percent * 10.0).round() as i64;
                if last_shown != Some(shown) {
                    last_shown = Some(shown);
                    print_report(&report);
                }
            }
        }
    }

    print_report(&FlowReport::compute(&completions, Utc::now()));
    Ok(())
}

/// Sleep until `deadline`, or forever without one.
async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
