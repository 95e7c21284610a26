use std::net::SocketAddr;
use std::path::PathBuf;

/// Badge models served by default when no `--badges` list is given.
pub const DEFAULT_BADGES: &[&str] = &["mch2022", "troopers23", "why2025"];

/// Default category vocabulary for app metadata and the /categories endpoint.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Uncategorised",
    "Event related",
    "Games",
    "Graphics",
    "Hardware",
    "Utility",
    "Wearable",
    "Data",
    "Silly",
    "Hacking",
    "Troll",
    "Unusable",
    "Adult",
    "Virus",
    "Interpreter",
];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL for external access (e.g. "https://hub.example.com").
    /// Used for file download URLs; relative URLs are served when unset.
    pub base_url: Option<String>,
    /// Seconds between install-count aggregate rebuilds. 0 disables the task.
    pub refresh_interval_secs: u64,
    pub badges: Vec<String>,
    pub categories: Vec<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("hatchery.db")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            data_dir: PathBuf::from("./data"),
            base_url: None,
            refresh_interval_secs: 300,
            badges: DEFAULT_BADGES.iter().map(ToString::to_string).collect(),
            categories: DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect(),
        }
    }
}
