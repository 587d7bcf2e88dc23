use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gossip-ledger")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createwallet", about = "Load or create the node wallet")]
    Createwallet,
    #[command(name = "startnode", about = "Start a ledger node")]
    StartNode {
        #[arg(long = "peer-port", help = "Port for peer connections")]
        peer_port: Option<u16>,
        #[arg(long = "web-port", help = "Port for the HTTP control surface")]
        web_port: Option<u16>,
        #[arg(
            long = "peer",
            help = "Peer endpoint to dial on startup (tcp://ipv4:port), repeatable"
        )]
        peers: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_startnode() {
        let opt = Opt::parse_from([
            "gossip-ledger",
            "startnode",
            "--peer-port",
            "8001",
            "--peer",
            "tcp://127.0.0.1:8000",
            "--peer",
            "tcp://127.0.0.1:8002",
        ]);
        match opt.command {
            Command::StartNode {
                peer_port,
                web_port,
                peers,
            } => {
                assert_eq!(peer_port, Some(8001));
                assert_eq!(web_port, None);
                assert_eq!(peers.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_createwallet() {
        let opt = Opt::parse_from(["gossip-ledger", "createwallet"]);
        assert!(matches!(opt.command, Command::Createwallet));
    }
}
