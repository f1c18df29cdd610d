//! # Resource API - Entry Point
//! src/main.rs
//!
//! Lee la configuración (CLI + env), inicializa el logging y arranca el servidor.

use clap::Parser;
use resource_api::config::Config;
use resource_api::server::Server;

fn main() {
    let config = Config::parse();
    resource_api::init_tracing(&config.log_level);

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        std::process::exit(2);
    }
    config.log_summary();

    let server = match Server::bind(&config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!(error = %e, "fatal server error");
        std::process::exit(1);
    }
}
