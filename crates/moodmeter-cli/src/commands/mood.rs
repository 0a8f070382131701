use clap::Args;
use moodmeter_core::{Mood, MoodReport};

use super::Context;

/// Width of the rendered load bar in characters.
const BAR_WIDTH: f64 = 40.0;

#[derive(Args)]
pub struct MoodArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn bar(report: &MoodReport) -> String {
    let total = BAR_WIDTH as usize;
    let mut out = String::new();
    let mut used = 0;
    for segment in &report.segments {
        let width = ((segment.percent / 100.0 * BAR_WIDTH).round() as usize).min(total - used);
        used += width;
        let glyph = match segment.mood {
            Mood::Calm => '░',
            Mood::Busy => '▒',
            Mood::Stress => '█',
        };
        out.extend(std::iter::repeat(glyph).take(width));
    }
    out.extend(std::iter::repeat(' ').take(total - used));
    out
}

pub fn run(args: MoodArgs, token: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(token)?;
    let tasks = ctx.repo.load_tasks(ctx.access)?;
    let report = MoodReport::from_tasks(&tasks);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("[{}] {:.0}%", bar(&report), report.load_percent);
    println!("Load: {}  Mood: {}", report.load, report.label);
    Ok(())
}
