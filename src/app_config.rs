use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::http_client::HttpClientConfig;
use crate::http_method::HttpMethod;
use crate::proxy_error::ConfigError;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_IMAGE_USER_AGENT: &str = "Mozilla/5.0 (compatible; StorefrontImageProxy/1.0)";

#[derive(Parser, Debug, Default)]
#[command(name = "storefront_proxy", version, about = "Forwards storefront API calls to the backend")]
pub struct CliArgs {
  /// YAML configuration file.
  #[arg(long, env = "PROXY_CONFIG_FILE")]
  pub config_file: Option<PathBuf>,

  /// Backend base url, with or without the trailing `/api`.
  #[arg(long, env = "BACKEND_URL")]
  pub backend_url: Option<String>,

  #[arg(long, env = "HTTP_BIND")]
  pub bind: Option<String>,

  #[arg(long, env = "HTTP_PORT")]
  pub port: Option<u16>,

  #[arg(long, env = "HTTP_WORKER_COUNT")]
  pub workers: Option<usize>,

  #[arg(long, env = "LOG_LEVEL")]
  pub log_level: Option<String>,

  /// Outbound request timeout in seconds.
  #[arg(long, env = "UPSTREAM_TIMEOUT_SECS")]
  pub timeout_secs: Option<u64>,

  #[arg(long, env = "HTTP_PROXY_URL")]
  pub http_proxy: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct ClientSection {
  pub timeout_secs: Option<u64>,
  pub http_proxy: Option<String>,
  pub proxy_user: Option<String>,
  pub proxy_pass: Option<String>,
  pub enable_cookies: bool,
  pub image_user_agent: String,
}

impl Default for ClientSection {
  fn default() -> Self {
    ClientSection {
      timeout_secs: Some(30),
      http_proxy: None,
      proxy_user: None,
      proxy_pass: None,
      enable_cookies: false,
      image_user_agent: DEFAULT_IMAGE_USER_AGENT.into(),
    }
  }
}

impl ClientSection {
  pub fn to_http_client_config(&self) -> HttpClientConfig {
    HttpClientConfig {
      http_proxy: self.http_proxy.clone(),
      user: self.proxy_user.clone(),
      pass: self.proxy_pass.clone(),
      enable_cookies: self.enable_cookies,
      timeout: self.timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs),
      use_system_proxy: true,
    }
  }
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
#[serde(default)]
pub struct CorsSection {
  pub permissive: bool,
  pub allowed_origins: Vec<String>,
}

/// Request bodies matching this route are logged at debug level before forwarding.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct DebugBodyRoute {
  pub path_prefix: String,
  pub method: HttpMethod,
}

impl DebugBodyRoute {
  /// Compares whole path segments, so `parties` does not match `partiesarchive`.
  pub fn matches(&self, method: HttpMethod, path: &str) -> bool {
    self.method == method && path_segments(path).starts_with(&path_segments(&self.path_prefix))
  }
}

fn path_segments(path: &str) -> Vec<&str> {
  path.split('/').filter(|segment| !segment.is_empty()).collect()
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
  pub bind: String,
  pub port: u16,
  pub workers: usize,
  pub backend_url: String,
  pub mount_path: String,
  pub image_path: String,
  pub log_level: String,
  pub client: ClientSection,
  pub cors: CorsSection,
  pub debug_body_routes: Vec<DebugBodyRoute>,
}

impl Default for AppConfig {
  fn default() -> Self {
    AppConfig {
      bind: "0.0.0.0".into(),
      port: 8080,
      workers: 4,
      backend_url: DEFAULT_BACKEND_URL.into(),
      mount_path: "/api/proxy".into(),
      image_path: "/api/fetch-image".into(),
      log_level: "info".into(),
      client: ClientSection::default(),
      cors: CorsSection::default(),
      debug_body_routes: Vec::new(),
    }
  }
}

impl AppConfig {
  pub fn load_from_file(file: &File) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_reader(file)?;
    Ok(config)
  }

  /// Defaults, then the optional YAML file, then flags and environment.
  pub fn load(args: &CliArgs) -> Result<AppConfig, ConfigError> {
    let mut config = match &args.config_file {
      Some(path) => AppConfig::load_from_file(&File::open(path)?)?,
      None => AppConfig::default(),
    };

    config.apply_overrides(args);
    Ok(config)
  }

  pub fn apply_overrides(&mut self, args: &CliArgs) {
    if let Some(backend_url) = &args.backend_url {
      self.backend_url = backend_url.clone();
    }
    if let Some(bind) = &args.bind {
      self.bind = bind.clone();
    }
    if let Some(port) = args.port {
      self.port = port;
    }
    if let Some(workers) = args.workers {
      self.workers = workers;
    }
    if let Some(log_level) = &args.log_level {
      self.log_level = log_level.clone();
    }
    if let Some(timeout_secs) = args.timeout_secs {
      self.client.timeout_secs = Some(timeout_secs);
    }
    if let Some(http_proxy) = &args.http_proxy {
      self.client.http_proxy = Some(http_proxy.clone());
    }
  }

  pub fn log_level_filter(&self) -> LevelFilter {
    self.log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)
  }

  /// Mount path with a leading slash and no trailing slash.
  pub fn normalized_mount_path(&self) -> String {
    format!("/{}", self.mount_path.trim().trim_matches('/'))
  }
}
