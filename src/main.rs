// Entry point for the ledger node CLI
use clap::Parser;
use gossip_ledger::{wallet, ApiRoutes, Blockchain, Command, Opt, Server, GLOBAL_CONFIG};
use log::{error, info, LevelFilter};
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;

fn main() {
    // Info by default, RUST_LOG still wins
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Createwallet => {
            let wallet_path = GLOBAL_CONFIG.get_wallet_path();
            let wallet = wallet::load_or_create(Path::new(&wallet_path))?;
            println!("Your address: {}", wallet.get_address())
        }
        Command::StartNode {
            peer_port,
            web_port,
            peers,
        } => {
            if let Some(port) = peer_port {
                GLOBAL_CONFIG.set_peer_port(port);
            }
            if let Some(port) = web_port {
                GLOBAL_CONFIG.set_web_port(port);
            }
            start_node(peers)?;
        }
    }
    Ok(())
}

// The peer listener runs on its own thread; the HTTP surface owns the main
// thread through the tokio runtime.
fn start_node(peers: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let wallet_path = GLOBAL_CONFIG.get_wallet_path();
    let wallet = wallet::load_or_create(Path::new(&wallet_path))?;
    info!("Node wallet address: {}", wallet.get_address());

    let endpoint = GLOBAL_CONFIG.get_endpoint();
    let server = Arc::new(Server::new(Blockchain::new()?, wallet, endpoint));

    let listener = std::net::TcpListener::bind(GLOBAL_CONFIG.get_peer_bind_addr())?;
    info!("Listening for peers on {}", server.get_endpoint());
    let listening = Arc::clone(&server);
    thread::spawn(move || listening.listen(listener));

    for peer in peers {
        if let Err(e) = server.connect(&peer) {
            error!("Failed to connect to {peer}: {e}");
        }
    }

    let web_addr = format!(
        "{}:{}",
        GLOBAL_CONFIG.get_peer_address(),
        GLOBAL_CONFIG.get_web_port()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&web_addr).await?;
        info!("HTTP control surface on http://{web_addr}");
        ApiRoutes::serve(server, listener).await
    })?;
    Ok(())
}
