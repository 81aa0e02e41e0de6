use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;

mod api;
mod cli;
mod error;
mod metrics;
mod models;
mod services;
mod state;
mod store;

use cli::CommandArgs;
use state::new_state;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();
    let bind_address = format!("{}:{}", args.address, args.port);

    let state = new_state(&args)?;

    print_banner(&args);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(api::configure)
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {}", bind_address))?
    .run()
    .await
    .context("http server terminated abnormally")
}

fn print_banner(args: &CommandArgs) {
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║      Server Agent v{:<39}║", env!("CARGO_PKG_VERSION"));
    println!("║      Sequenced Process Supervision                        ║");
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("🚀 Server starting on http://{}:{}", args.address, args.port);
    println!("📁 Process store: {}", args.store.display());
    println!();
    println!("📋 Available endpoints:");
    println!("  GET    /api/server/processes               - List process definitions");
    println!("  POST   /api/server/processes               - Create a process definition");
    println!("  POST   /api/server/processes/reorder       - Change the start order");
    println!("  GET    /api/server/processes/{{id}}          - Get a process definition");
    println!("  PUT    /api/server/processes/{{id}}          - Update a process definition");
    println!("  DELETE /api/server/processes/{{id}}          - Delete a stopped process");
    println!("  POST   /api/server/start                   - Start all processes in order");
    println!("  POST   /api/server/stop                    - Stop all processes in reverse order");
    println!("  POST   /api/server/processes/{{id}}/start    - Start one process");
    println!("  POST   /api/server/processes/{{id}}/stop     - Stop one process");
    println!("  GET    /api/server/processes/{{id}}/status   - Process status");
    println!("  GET    /metrics                            - Prometheus metrics");
    println!("  GET    /health                             - Health check");
    println!();
    println!(
        "⏱  Readiness timeout {}s, grace period {}s",
        args.readiness_timeout_secs, args.grace_period_secs
    );
    println!("═══════════════════════════════════════════════════════════");
}
