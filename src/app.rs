//! Process bootstrap for the gateway, the backing service, or both.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reservation_db::{
    create_pool, health_check, run_migrations, ReservationRepository,
    SqliteReservationRepository,
};
use reservation_events::{in_memory, HttpRelayChannel, InMemoryChannel, MessageChannel};
use reservation_http::{shutdown::shutdown_signal, start_server};
use reservation_kernel::{InitCtx, ModuleRegistry, Settings, SharedSettings};

use crate::modules::{
    gateway::GatewayModule, message::MessageModule, reservations::ReservationsModule,
};

pub const GATEWAY_TITLE: &str = "Reservation Gateway";
pub const SERVICE_TITLE: &str = "Reservation Service";

/// Which servers this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Gateway,
    Service,
    /// Both servers in one process, joined by an in-memory channel
    Standalone,
}

/// A started backing service, ready to be served.
pub struct Service {
    pub registry: ModuleRegistry,
    /// Producer side of the consumer's queue
    pub inbound: InMemoryChannel,
    pub repository: Arc<dyn ReservationRepository>,
}

/// Open the store, run migrations, seed, and start the consumer.
pub async fn start_service(settings: &SharedSettings) -> anyhow::Result<Service> {
    let snapshot = settings.current();
    let ctx = InitCtx {
        settings: &snapshot,
    };

    let pool = create_pool(&snapshot.database)
        .await
        .context("failed to open reservation store")?;
    health_check(&pool)
        .await
        .context("reservation store is not answering")?;
    let repository: Arc<dyn ReservationRepository> =
        Arc::new(SqliteReservationRepository::new(pool.clone()));
    let (inbound, inbox) = in_memory();

    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(ReservationsModule::new(
        repository.clone(),
        inbound.clone(),
        inbox,
    )));
    registry.register(Arc::new(MessageModule::new(settings.clone())));

    registry.init_modules(&ctx).await?;
    let applied = run_migrations(&pool, &registry.collect_migrations()).await?;
    tracing::info!(applied, "migrations complete");
    registry.start_modules(&ctx).await?;

    Ok(Service {
        registry,
        inbound,
        repository,
    })
}

/// Assemble the gateway around `channel`.
pub async fn start_gateway(
    settings: &Settings,
    channel: Arc<dyn MessageChannel>,
) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(GatewayModule::from_settings(settings, channel)?));

    let ctx = InitCtx { settings };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;
    Ok(registry)
}

/// Channel the gateway publishes on when the service runs elsewhere
pub fn relay_channel(settings: &Settings) -> anyhow::Result<Arc<dyn MessageChannel>> {
    let relay = HttpRelayChannel::new(
        settings.channel.relay_url.clone(),
        Duration::from_millis(settings.gateway.call_timeout_ms),
    )
    .context("failed to build relay channel")?;
    tracing::info!(endpoint = relay.endpoint(), "gateway publishes over HTTP relay");
    Ok(Arc::new(relay))
}

/// Run `role` until a shutdown signal arrives.
pub async fn run(role: Role, settings: SharedSettings) -> anyhow::Result<()> {
    let snapshot = settings.current();
    tracing::info!(?role, env = ?snapshot.environment, "bootstrap starting");

    match role {
        Role::Service => {
            let service = start_service(&settings).await?;
            let served = start_server(
                SERVICE_TITLE,
                &service.registry,
                &snapshot.service.server,
                shutdown_signal(),
            )
            .await;
            service.registry.stop_modules().await?;
            served
        }
        Role::Gateway => {
            let registry = start_gateway(&snapshot, relay_channel(&snapshot)?).await?;
            let served = start_server(
                GATEWAY_TITLE,
                &registry,
                &snapshot.gateway.server,
                shutdown_signal(),
            )
            .await;
            registry.stop_modules().await?;
            served
        }
        Role::Standalone => {
            let service = start_service(&settings).await?;
            let gateway = start_gateway(&snapshot, Arc::new(service.inbound.clone())).await?;

            let served = tokio::try_join!(
                start_server(
                    SERVICE_TITLE,
                    &service.registry,
                    &snapshot.service.server,
                    shutdown_signal(),
                ),
                start_server(
                    GATEWAY_TITLE,
                    &gateway,
                    &snapshot.gateway.server,
                    shutdown_signal(),
                ),
            );

            gateway.stop_modules().await?;
            service.registry.stop_modules().await?;
            served.map(|_| ())
        }
    }
}
