//! Logging initialization for the session store

/// Initialize logging with an env-filter default scoped to the sessify crates
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sessify_core=debug,sessify_store=debug".into()),
        )
        .init();
}
