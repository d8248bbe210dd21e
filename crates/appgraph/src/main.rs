use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use appgraph::{
    adapters::HttpSchemaClientFactory,
    storage::{InMemoryGraphRepository, InMemoryUserRepository},
    test_utils::FakeEncryptionService,
    BroadcastNotifier, Collaborators, GraphBuildClient, GraphProcessor, GraphQueue,
    GroupKey, PipelineConfig, QueueService, User, UserRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = PipelineConfig::load().context("Failed to load configuration")?;
    appgraph::init_tracing(&config.log_level);

    let graphs = Arc::new(InMemoryGraphRepository::new());
    let users = Arc::new(InMemoryUserRepository::new());
    let encryption = Arc::new(FakeEncryptionService);
    let notifier = Arc::new(BroadcastNotifier::new(config.notification_buffer));
    let clients = Arc::new(
        HttpSchemaClientFactory::new(config.http_client_config())
            .context("Failed to create remote schema client")?,
    );
    let queue = Arc::new(GraphQueue::new());

    let processor = GraphProcessor::new(
        Collaborators {
            graphs: graphs.clone(),
            users: users.clone(),
            encryption: encryption.clone(),
            clients,
            notifier: notifier.clone(),
        },
        config.max_concurrent_fetches,
    );
    let worker = Arc::new(QueueService::new(
        Arc::clone(&queue),
        Arc::new(processor),
        config.worker_config(),
    ));
    let build_client = GraphBuildClient::new(graphs, users.clone(), encryption, Arc::clone(&queue));

    let cancel = CancellationToken::new();
    let worker_handle = {
        let worker = Arc::clone(&worker);
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(cancel).await })
    };

    if let Ok(api_key) = std::env::var("APPGRAPH_DEMO_API_KEY") {
        start_demo(&build_client, &users, &notifier, &api_key)
            .await
            .context("Failed to start demo build")?;
    }

    info!(
        remote_api_url = %config.remote_api_url,
        "appgraph pipeline running, press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down");
    cancel.cancel();
    match worker_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Worker stopped with an error"),
        Err(e) => error!(error = %e, "Worker task failed"),
    }
    queue.close();
    if !worker.drain(config.shutdown_grace()).await {
        warn!("Exiting with builds still running");
    }
    Ok(())
}

/// Registers a demo owner and graph against the configured remote service and
/// logs the graph's notification stream.
async fn start_demo(
    client: &GraphBuildClient,
    users: &InMemoryUserRepository,
    notifier: &BroadcastNotifier,
    api_key: &str,
) -> Result<()> {
    let owner = User::new("demo", "demo-key-material");
    users.save_user(&owner).await.context("Failed to store demo user")?;

    let graph = client
        .register_graph(owner.id, "Demo graph", api_key)
        .await
        .context("Failed to register demo graph")?;

    // the worker holds the build back for the debounce window, so this
    // subscription sees the whole stream
    let mut events = notifier.subscribe(&GroupKey::new(owner.id, graph.id));
    let graph_id = graph.id;
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(graph_id = %graph_id, event = ?event, "Demo graph event");
            if event.is_terminal() {
                break;
            }
        }
    });

    info!(graph_id = %graph.id, owner_id = %owner.id, "Demo graph registered");
    Ok(())
}
