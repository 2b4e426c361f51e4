use clap::Subcommand;

use super::{open_app, print_json, CmdResult};

#[derive(Subcommand)]
pub enum JournalAction {
    /// Write an entry
    Add {
        text: String,
    },
    /// List entries, oldest first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: JournalAction) -> CmdResult {
    let app = open_app()?;

    match action {
        JournalAction::Add { text } => {
            let entry = app.add_journal_entry(&text)?;
            println!("Entry added: {}", entry.id);
        }
        JournalAction::List { json } => {
            let entries = app.journal.with_state(|j| j.entries.clone());
            if json {
                print_json(&entries)?;
            } else {
                for entry in &entries {
                    println!("{}  {}", entry.created_at.format("%Y-%m-%d %H:%M"), entry.text);
                }
            }
        }
    }
    Ok(())
}
