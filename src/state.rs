use std::sync::Arc;

use anyhow::Context;

use crate::cli::CommandArgs;
use crate::services::{platform_terminator, Orchestrator, SystemInventory};
use crate::store::JsonFileStore;

pub struct AppStateInner {
    pub orchestrator: Orchestrator,
}

pub type AppState = Arc<AppStateInner>;

pub fn new_state(args: &CommandArgs) -> anyhow::Result<AppState> {
    let store = JsonFileStore::open(&args.store)
        .with_context(|| format!("failed to open process store {}", args.store.display()))?;
    log::info!("Using process store {}", store.path().display());

    let orchestrator = Orchestrator::new(
        Arc::new(store),
        Arc::new(SystemInventory::new()),
        platform_terminator(),
        args.settings(),
    );

    Ok(Arc::new(AppStateInner { orchestrator }))
}
