use crate::commands::Out;
use crate::model::Stores;
use crate::router::Router;
use crate::{api, Config, Result};
use std::sync::Arc;

/// Lists the store table exactly as the `help` chat command would, with the full table as
/// structured output.
pub async fn stores(config: Config) -> Result<Out<Stores>> {
    let stores = config.stores().clone();
    // Help never touches the ledger, so the in-memory one is enough here.
    let router = Router::new(stores.clone(), Arc::new(api::TestLedger::default()));
    Ok(Out::new(router.help(), stores))
}
