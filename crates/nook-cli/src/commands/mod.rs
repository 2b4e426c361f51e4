pub mod config;
pub mod journal;
pub mod media;
pub mod settings;
pub mod stats;
pub mod sync;
pub mod task;
pub mod timer;

use std::error::Error;
use std::rc::Rc;

use nook_core::{App, KeyringSecrets, SqliteStore, SystemClock};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn Error>>;

/// Open the app over the on-disk store and the OS keyring, then catch the
/// timer up with the wall clock, printing anything that happened while no
/// process ran.
pub fn open_app() -> Result<App, Box<dyn Error>> {
    let kv = SqliteStore::open()?;
    let app = App::with_secrets(Rc::new(kv), Rc::new(KeyringSecrets::new()), Rc::new(SystemClock));
    for event in app.tick() {
        if !matches!(event, nook_core::Event::TimerTick { .. }) {
            print_json(&event)?;
        }
    }
    Ok(app)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Build the single-threaded runtime the async commands run on.
pub fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn Error>> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
