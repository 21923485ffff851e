use std::sync::Arc;

use anyhow::Context;

use lorecraft_api::config::AppConfig;
use lorecraft_auth::{PasswordHasher, TokenAuthority};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may be set directly.
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().context("invalid configuration")?;
    lorecraft_observability::init(config.profile.log_format());

    let tokens = TokenAuthority::from_base64_pem(&config.private_key, &config.public_key)
        .context("failed to load token signing keys")?;

    let services = lorecraft_api::app::build_services(
        Arc::new(tokens),
        Arc::new(PasswordHasher::new()),
        config.token_expiry,
        config.secure_cookies,
    )
    .context("failed to build services")?;

    let app = lorecraft_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        profile = config.profile.as_str(),
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
