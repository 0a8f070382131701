use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Subcommand;
use moodmeter_core::{
    CounterAnimator, CounterSnapshot, CounterTargets, HttpUsageSource, Repository, UsageRefresher,
    UsageTotals,
};
use tracing::{info, warn};
use url::Url;

use super::Context;

/// Animation frame period of `usage watch`.
const FRAME: Duration = Duration::from_millis(50);
/// How often `usage watch` prints the counter.
const DISPLAY_EVERY: Duration = Duration::from_secs(1);

#[derive(Subcommand)]
pub enum UsageAction {
    /// Print the cached usage totals
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record usage totals by hand (never lowers stored values)
    Record {
        #[arg(long)]
        tokens: u64,
        #[arg(long)]
        lines: u64,
    },
    /// Fetch fresh totals from the metering endpoint
    Refresh {
        /// Endpoint URL (defaults to usage.source_url)
        #[arg(long)]
        url: Option<String>,
    },
    /// Run the animated token and line counter
    Watch {
        /// Stop after this many seconds (runs until Ctrl-C otherwise)
        #[arg(long)]
        for_secs: Option<u64>,
    },
}

fn print_totals(totals: &UsageTotals) {
    println!(
        "Tokens: {}  Lines: {}  (fetched {})",
        totals.tokens,
        totals.lines_of_code,
        totals.fetched_at.to_rfc3339()
    );
}

fn print_snapshot(snapshot: &CounterSnapshot) {
    println!(
        "tokens {:>12}  lines {:>8}  [{:?}]",
        snapshot.tokens, snapshot.lines, snapshot.phase
    );
}

fn source_url(ctx: &Context, url: Option<String>) -> Result<Option<Url>, url::ParseError> {
    url.or_else(|| ctx.config.usage.source_url.clone())
        .map(|u| Url::parse(&u))
        .transpose()
}

pub fn run(action: UsageAction, token: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(token)?;

    match action {
        UsageAction::Show { json } => match ctx.repo.poll_usage_totals()? {
            Some(totals) if json => println!("{}", serde_json::to_string_pretty(&totals)?),
            Some(totals) => print_totals(&totals),
            None if json => println!("null"),
            None => println!("No usage recorded yet."),
        },
        UsageAction::Record { tokens, lines } => {
            let totals = ctx.repo.record_usage_totals(
                ctx.access,
                UsageTotals {
                    tokens,
                    lines_of_code: lines,
                    fetched_at: Utc::now(),
                },
            )?;
            print_totals(&totals);
        }
        UsageAction::Refresh { url } => {
            ctx.access.require()?;
            let url = source_url(&ctx, url)?.ok_or("no usage source configured (set usage.source_url)")?;
            let refresher = UsageRefresher::new(HttpUsageSource::new(url), ctx.repo.clone());
            let runtime = Context::runtime()?;
            let totals = runtime.block_on(refresher.refresh())?;
            print_totals(&totals);
        }
        UsageAction::Watch { for_secs } => {
            let runtime = Context::runtime()?;
            runtime.block_on(watch(&ctx, for_secs))?;
        }
    }
    Ok(())
}

/// Fold the latest totals into the targets. Prefers a fresh fetch when a
/// source is configured and falls back to the cached totals.
async fn poll_once(
    repo: &Repository,
    refresher: Option<&UsageRefresher<HttpUsageSource>>,
    targets: &CounterTargets,
    token_buffer: u64,
    line_buffer: u64,
) {
    let fresh = match refresher {
        Some(refresher) => match refresher.refresh().await {
            Ok(totals) => Some(totals),
            Err(e) => {
                warn!(error = %e, "usage refresh failed, using cached totals");
                None
            }
        },
        None => None,
    };
    let totals = match fresh {
        Some(totals) => Some(totals),
        None => match repo.poll_usage_totals() {
            Ok(totals) => totals,
            Err(e) => {
                warn!(error = %e, "usage poll failed, keeping current targets");
                None
            }
        },
    };
    if let Some(totals) = totals {
        targets.apply_poll(&totals, token_buffer, line_buffer);
    }
}

async fn watch(ctx: &Context, for_secs: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let counter_config = ctx.config.counter.clone();
    let targets = CounterTargets::new();

    let floor = match ctx.repo.load_counter_floor() {
        Ok(floor) => floor,
        Err(e) => {
            warn!(error = %e, "could not read counter floor, starting from zero");
            None
        }
    };
    let mut animator = CounterAnimator::new(counter_config.clone(), targets.clone(), floor);

    // The refresh job stores totals, so it only runs with a valid token.
    let refresher = match source_url(ctx, None)? {
        Some(url) if ctx.access.is_authorized() => {
            Some(Arc::new(UsageRefresher::new(HttpUsageSource::new(url), ctx.repo.clone())))
        }
        _ => None,
    };
    poll_once(
        &ctx.repo,
        refresher.as_deref(),
        &targets,
        counter_config.token_buffer,
        counter_config.line_buffer,
    )
    .await;

    let poll_task = {
        let repo = ctx.repo.clone();
        let targets = targets.clone();
        let refresher = refresher.clone();
        let poll_every = Duration::from_secs(ctx.config.usage.poll_interval_secs);
        let (token_buffer, line_buffer) = (counter_config.token_buffer, counter_config.line_buffer);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                poll_once(&repo, refresher.as_deref(), &targets, token_buffer, line_buffer).await;
            }
        })
    };

    let mut frames = tokio::time::interval(FRAME);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut display = tokio::time::interval(DISPLAY_EVERY);
    let deadline = for_secs.map(|s| tokio::time::Instant::now() + Duration::from_secs(s));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let stop = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = &mut stop => break,
            frame = frames.tick() => {
                animator.tick(frame.into_std());
                if let Some(floor) = animator.persist_due() {
                    if let Err(e) = ctx.repo.save_counter_floor(floor) {
                        warn!(error = %e, "could not persist counter floor");
                    }
                }
            }
            _ = display.tick() => print_snapshot(&animator.snapshot()),
        }
    }

    poll_task.abort();
    let floor = animator.persist_now();
    ctx.repo.save_counter_floor(floor)?;
    info!(tokens = floor.tokens, lines = floor.lines, "counter floor saved");
    print_snapshot(&animator.snapshot());
    Ok(())
}
