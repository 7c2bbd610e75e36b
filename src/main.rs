use std::env;
use std::process;

use tokio::net::TcpListener;
use tracing::info;

use hamster::cache::ObjectCache;
use hamster::server;
use hamster::{MAX_CACHE_SIZE, MAX_OBJECT_SIZE};

fn usage(program: &str) -> ! {
    eprintln!("usage: {program} <port>");
    process::exit(1);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hamster=info".parse()?),
        )
        .init();

    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "hamster".to_string());
    let port_arg = match (args.next(), args.next()) {
        (Some(port), None) => port,
        _ => usage(&program),
    };
    let port: u16 = match port_arg.parse() {
        Ok(port) => port,
        Err(_) => usage(&program),
    };

    let cache = ObjectCache::new();
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;

    info!("listening on port {port}");
    info!("cache budget: {MAX_CACHE_SIZE} bytes total, {MAX_OBJECT_SIZE} bytes per object");

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = server::run(listener, cache) => {}
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
    }

    Ok(())
}
