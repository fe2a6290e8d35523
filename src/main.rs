use anyhow::Context;
use reservation_app::Role;
use reservation_kernel::{Settings, SharedSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load reservation settings")?;
    reservation_telemetry::init(&settings.telemetry)?;

    reservation_app::run(Role::Standalone, SharedSettings::new(settings)).await
}
