//! HTTP server command

use crate::server;
use buddy_core::{BuddyRuntime, Config};
use tracing::info;

pub async fn serve(config: Config, warm_up: bool) -> anyhow::Result<()> {
    let runtime = BuddyRuntime::from_config(config).await?;

    if warm_up || runtime.config().qa.warm_up_on_start {
        let qa = runtime.qa().clone();
        tokio::spawn(async move {
            let questions = qa.warm_up_questions().to_vec();
            let warmed = qa.warm_up(&questions).await;
            info!("Cache warm-up finished: {} answers ready", warmed);
        });
    }

    let address = runtime.config().server.bind_address();
    server::serve(runtime, &address).await
}
