use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use x402_agent::{AgentConfig, AgentError, TaskRouter};

#[tokio::main]
async fn main() -> Result<(), AgentError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env()?;
    tracing::info!(
        agent_id = %config.agent_id,
        role = %config.role,
        address = %config.client.address(),
        network = %config.client.default_network,
        "starting agent"
    );

    let client = config.client.build_client()?;
    let router = TaskRouter::new(config.role, config.agent_id.clone(), client)
        .with_address(config.client.address());

    tracing::info!(coordinator = %config.coordinator_url, "connecting to coordinator");
    let (socket, _) = tokio_tungstenite::connect_async(config.coordinator_url.as_str()).await?;
    router.run(socket).await
}
