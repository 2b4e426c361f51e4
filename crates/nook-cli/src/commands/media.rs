use clap::Subcommand;

use super::{open_app, print_json, CmdResult};

#[derive(Subcommand)]
pub enum MediaAction {
    /// Print background and playlist preferences
    Show,
    /// Choose a background by preset name or URL
    Background {
        name_or_url: String,
    },
    /// Set background opacity (0.0 to 1.0)
    Opacity {
        value: f64,
    },
}

pub fn run(action: MediaAction) -> CmdResult {
    let app = open_app()?;

    match action {
        MediaAction::Show => print_json(&app.media.get_state())?,
        MediaAction::Background { name_or_url } => {
            app.media.set_state(|m| m.set_background(&name_or_url))?;
            println!("ok");
        }
        MediaAction::Opacity { value } => {
            app.media.set_state(|m| m.set_opacity(value))?;
            println!("ok");
        }
    }
    Ok(())
}
