use clap::Subcommand;

use super::{open_app, print_json, CmdResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print all settings
    Show,
    /// Get a setting (e.g. "durations.focus", "dailyGoal")
    Get {
        key: String,
    },
    /// Set a setting
    Set {
        key: String,
        value: String,
    },
}

pub fn run(action: SettingsAction) -> CmdResult {
    let app = open_app()?;

    match action {
        SettingsAction::Show => print_json(&app.settings.get_state())?,
        SettingsAction::Get { key } => {
            let value = app
                .settings
                .with_state(|s| s.get(&key))
                .ok_or_else(|| format!("unknown setting: {key}"))?;
            println!("{value}");
        }
        SettingsAction::Set { key, value } => {
            app.set_setting(&key, &value)?;
            println!("ok");
        }
    }
    Ok(())
}
