//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The file path comes
//! from `--config`, then `CONFIG_PATH`, then `ibm-volumes-proxy.toml` in the
//! working directory. Only the last one may be absent.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use transport::{DEFAULT_TOKEN_QUERY_PARAM, HeaderInjection, TransportKind};

pub const DEFAULT_CONFIG_PATH: &str = "ibm-volumes-proxy.toml";

/// Storage-broker volume listing endpoint (staging resolver).
pub const DEFAULT_VOLUMES_URL: &str = "https://endpoint-resolver-sds-sb.service-broker-8ce82ab061950a7b6121a1b00b849d81-0000.us-east.containers.appdomain.cloud/v1/volumes/";

/// Software-defined-storage instance CRN the listing is scoped to.
pub const DEFAULT_INSTANCE_ID: &str = "crn:v1:staging:public:software-defined-storage:satloc_dal_cs4d3u52003pfi9feq00:a/3faf73b8d12b47fa6ce87494f8ae7686:7d61cc2f-e772-4c46-bd5f-de44fd67bf77::";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub iam: IamConfig,
    pub volumes: VolumesConfig,
}

/// Listener, static files and token record location
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub dashboard_dir: PathBuf,
    pub token_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            dashboard_dir: PathBuf::from("public"),
            token_file: PathBuf::from(ibm_auth::DEFAULT_TOKEN_FILE),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IamConfig {
    pub url: String,
}

impl Default for IamConfig {
    fn default() -> Self {
        Self {
            url: ibm_auth::DEFAULT_IAM_URL.to_string(),
        }
    }
}

/// Storage-broker upstream settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolumesConfig {
    pub url: String,
    pub instance_id: String,
    pub transport: TransportKind,
    /// Query parameter carrying the token when `transport = "query"`
    pub token_query_param: String,
    /// Per-request timeout; the HTTP client default applies when unset
    pub timeout_secs: Option<u64>,
    /// Fixed protocol headers sent with every listing call
    pub headers: Vec<HeaderInjection>,
}

impl Default for VolumesConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_VOLUMES_URL.to_string(),
            instance_id: DEFAULT_INSTANCE_ID.to_string(),
            transport: TransportKind::default(),
            token_query_param: DEFAULT_TOKEN_QUERY_PARAM.to_string(),
            timeout_secs: None,
            headers: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file that must exist, then overlay
    /// environment variables and validate.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                common::Error::MissingConfig(path.to_path_buf())
            } else {
                common::Error::Io(e)
            }
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load `DEFAULT_CONFIG_PATH` if present, otherwise start from defaults.
    pub fn load_default() -> common::Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load(path)
        } else {
            Self::default().finish()
        }
    }

    pub fn from_toml_str(contents: &str) -> common::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.finish()
    }

    /// Explicitly requested config path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        std::env::var("CONFIG_PATH").ok().map(PathBuf::from)
    }

    fn finish(mut self) -> common::Result<Self> {
        self.apply_env();
        self.validate()?;
        Ok(self)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("IAM_URL") {
            self.iam.url = url;
        }
        if let Ok(url) = std::env::var("VOLUMES_URL") {
            self.volumes.url = url;
        }
        if let Ok(id) = std::env::var("VOLUMES_INSTANCE_ID") {
            self.volumes.instance_id = id;
        }
        if let Ok(path) = std::env::var("TOKEN_FILE") {
            self.server.token_file = PathBuf::from(path);
        }
    }

    fn validate(&self) -> common::Result<()> {
        for (field, url) in [("iam.url", &self.iam.url), ("volumes.url", &self.volumes.url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{field} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.volumes.instance_id.trim().is_empty() {
            return Err(common::Error::Config(
                "volumes.instance_id must not be empty".into(),
            ));
        }

        if self.volumes.timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "volumes.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.volumes.transport == TransportKind::Query
            && self.volumes.token_query_param.trim().is_empty()
        {
            return Err(common::Error::Config(
                "volumes.token_query_param must not be empty with transport = \"query\"".into(),
            ));
        }

        if self.server.token_file.as_os_str().is_empty() {
            return Err(common::Error::Config(
                "server.token_file must not be empty".into(),
            ));
        }

        Ok(())
    }
}
