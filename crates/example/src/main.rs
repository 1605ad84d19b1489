//! Demo application.
//!
//! Wires the account extensions on top of the default infrastructure,
//! registers a user, then waits for Ctrl-C and shuts everything down.
//!
//! # Usage
//!
//! ```bash
//! TRELLIS_PORT=8080 TRELLIS_MODE=worker trellis-demo ada@example.com Ada
//! ```

use example::{AccountExtensions, MemoryStoreExtension, UserExtension};
use trellis_core::{ConfigExtension, Configuration, DefaultExtensions};
use trellis_system::application::Application;
use trellis_system::extension::ExtensionGroup;

fn port_from_env(key: &str) -> Option<u16> {
    std::env::var(key).ok()?.parse().ok()
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let email = args.get(1).map_or("ada@example.com", String::as_str);
    let name = args.get(2).map_or("Ada", String::as_str);

    // TRELLIS_PORT wins over the platform-provided PORT
    let config = match Configuration::default()
        .with_port_fallback(port_from_env("TRELLIS_PORT"), port_from_env("PORT"))
        .with_mode(std::env::var("TRELLIS_MODE").ok().as_deref())
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let mut app = Application::new();
    app.add_extensions(
        DefaultExtensions
            .build()
            .disable::<ConfigExtension>()
            .add(ConfigExtension::new(config)),
    )
    .add_extensions(AccountExtensions.build());

    if let Err(e) = app.finish() {
        tracing::error!(error = %e, "failed to start");
        if let Err(e) = app.shutdown() {
            tracing::error!(error = %e, "failed to shut down");
        }
        std::process::exit(1);
    }
    if let Some(config) = app.get_resource::<Configuration>() {
        tracing::info!(mode = %config.mode, port = config.port, "started");
    }
    tracing::debug!(extensions = ?app.extension_names(), "extensions");

    if let Some(users) = app.extension::<UserExtension>() {
        match users.register(email, name) {
            Ok(user) => tracing::info!(id = user.id, "demo user created"),
            Err(e) => tracing::warn!(error = %e, "demo user not created"),
        }
    }
    if let Some(store) = app.extension::<MemoryStoreExtension>() {
        match store.export_json() {
            Ok(json) => tracing::info!(users = %json, "store contents"),
            Err(e) => tracing::warn!(error = %e, "could not export users"),
        }
    }

    tracing::info!("press Ctrl-C to stop");
    if let Err(e) = app.run_until(tokio::signal::ctrl_c()).await {
        tracing::error!(error = %e, "shutdown failed");
        std::process::exit(1);
    }
}
