use clap::Subcommand;
use serde_json::json;

use super::{open_app, print_json, CmdResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Raw lifetime statistics
    Show,
    /// Derived analytics
    Dashboard,
}

pub fn run(action: StatsAction) -> CmdResult {
    let app = open_app()?;

    match action {
        StatsAction::Show => {
            let out = app.stats.with_state(|s| {
                json!({
                    "stats": s.stats,
                    "seeds": s.seeds,
                    "postcards": s.postcards.len(),
                })
            });
            print_json(&out)?;
        }
        StatsAction::Dashboard => print_json(&app.dashboard())?,
    }
    Ok(())
}
