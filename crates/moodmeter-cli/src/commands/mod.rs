pub mod config;
pub mod flow;
pub mod mood;
pub mod tag;
pub mod task;
pub mod usage;

mod context;

pub use context::Context;

/// Parse a 1..=3 level argument.
pub(crate) fn level_arg(s: &str) -> Result<u8, String> {
    match s.parse::<u8>() {
        Ok(v @ 1..=3) => Ok(v),
        _ => Err(format!("expected 1, 2 or 3, got '{s}'")),
    }
}
