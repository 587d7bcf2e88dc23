use crate::network::ENDPOINT_SCHEME;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::sync::{PoisonError, RwLock};

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

const DEFAULT_PEER_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PEER_PORT: u16 = 8000;
const DEFAULT_WEB_PORT: u16 = 5000;
const DEFAULT_WALLET_PATH: &str = "wallet/private_key";

const PEER_ADDRESS_KEY: &str = "PEER_ADDRESS";
const PEER_PORT_KEY: &str = "PEER_PORT";
const WEB_PORT_KEY: &str = "WEB_PORT";
const WALLET_PATH_KEY: &str = "WALLET_PATH";

/// Node settings, seeded from the environment and overridable at startup
pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        let mut map = HashMap::new();
        for key in [PEER_ADDRESS_KEY, PEER_PORT_KEY, WEB_PORT_KEY, WALLET_PATH_KEY] {
            if let Ok(value) = env::var(key) {
                map.insert(String::from(key), value);
            }
        }

        Config {
            inner: RwLock::new(map),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(String::from(key), value);
    }

    fn get_port(&self, key: &str, default: u16) -> u16 {
        self.get(key)
            .and_then(|port| port.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_peer_address(&self) -> String {
        self.get(PEER_ADDRESS_KEY)
            .unwrap_or_else(|| DEFAULT_PEER_ADDRESS.to_string())
    }

    pub fn get_peer_port(&self) -> u16 {
        self.get_port(PEER_PORT_KEY, DEFAULT_PEER_PORT)
    }

    pub fn set_peer_port(&self, port: u16) {
        self.set(PEER_PORT_KEY, port.to_string());
    }

    pub fn get_web_port(&self) -> u16 {
        self.get_port(WEB_PORT_KEY, DEFAULT_WEB_PORT)
    }

    pub fn set_web_port(&self, port: u16) {
        self.set(WEB_PORT_KEY, port.to_string());
    }

    pub fn get_wallet_path(&self) -> String {
        self.get(WALLET_PATH_KEY)
            .unwrap_or_else(|| DEFAULT_WALLET_PATH.to_string())
    }

    /// `address:port` the peer listener binds
    pub fn get_peer_bind_addr(&self) -> String {
        format!("{}:{}", self.get_peer_address(), self.get_peer_port())
    }

    /// Endpoint advertised to peers, e.g. `tcp://127.0.0.1:8000`
    pub fn get_endpoint(&self) -> String {
        format!("{ENDPOINT_SCHEME}{}", self.get_peer_bind_addr())
    }
}
