//! Endpoint listing command.

use anyhow::Result;
use console::style;
use probe_core::{endpoint_url, websocket_url, Route};
use std::path::Path;

/// Print every URL the suites call. Performs no network I/O.
pub fn run(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;

    println!("{}", style("Endpoints:").bold());
    for route in Route::ALL {
        let (base, version) = match route {
            Route::Login => (&config.services.auth_url, &config.api.auth_version),
            _ => (&config.services.registry_url, &config.api.registry_version),
        };
        println!(
            "  {:<22} POST {}",
            style(route.path()).cyan(),
            endpoint_url(base, version, route)
        );
    }
    println!(
        "  {:<22} GET  {}",
        style("relay").cyan(),
        websocket_url(&config.services.relay_url, "***TOKEN***")
    );

    Ok(())
}
