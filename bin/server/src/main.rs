use guild_gate_access::{GuildDirectory, MembershipVerifier, PermissionCache};
use guild_gate_directory::DiscordDirectory;
use guild_gate_server::{
    app,
    auth::{AppState, CookieSettings, OAuthClient},
    config::ServerConfig,
    outbound,
    proxy::ProxyForwarder,
    telemetry,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    telemetry::init_tracing(config.environment);
    config.validate().expect("invalid configuration");
    tracing::info!(environment = ?config.environment, "Loaded configuration");

    let guild_id = config.discord.guild_id().expect("invalid guild id");
    let roles = config
        .discord
        .authorized_roles()
        .expect("invalid authorized roles");

    let identity_http = outbound::identity_client(config.discord.request_timeout())
        .expect("failed to build identity HTTP client");
    let backend_http = outbound::backend_client().expect("failed to build backend HTTP client");

    // Directory client and its roster snapshot, which never outlives the cache TTL
    let directory = Arc::new(
        DiscordDirectory::new(
            identity_http.clone(),
            config.discord.api_base_url.clone(),
            config.discord.bot_token.clone(),
        )
        .with_roster_max_age(config.cache.ttl()),
    );
    match config.roster.refresh_interval() {
        Some(interval) => {
            directory.spawn_roster_refresh(guild_id.clone(), interval);
        }
        None => tracing::info!("Roster refresh disabled, relying on live lookups"),
    }

    // Permission cache and its sweeper
    let cache = Arc::new(PermissionCache::new(config.cache.ttl()));
    cache.spawn_sweeper(config.cache.sweep_interval());

    let verifier = MembershipVerifier::new(
        directory as Arc<dyn GuildDirectory>,
        cache,
        guild_id,
        roles,
    )
    .with_fail_closed(config.cache.fail_closed);

    let oauth = OAuthClient::new(&config.discord, identity_http).expect("invalid OAuth configuration");
    let target = config.target_url().expect("invalid target URL");
    let proxy = ProxyForwarder::new(backend_http, target).expect("invalid target URL");
    tracing::info!(target = %proxy.target(), "Proxying authorized requests");

    let cookies = CookieSettings {
        key: config.session.cookie_key().expect("invalid session secret"),
        secure: !config.environment.is_development(),
        max_age: config.session.max_age(),
    };

    let state = AppState::new(oauth, Arc::new(verifier), proxy, cookies);
    let app = app::router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    tracing::info!("Server stopped");
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
