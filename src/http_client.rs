use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;

pub struct HttpClientConfig {
  pub http_proxy: Option<String>,
  pub user: Option<String>,
  pub pass: Option<String>,
  pub enable_cookies: bool,
  pub timeout: Option<Duration>,
  pub use_system_proxy: bool,
}

impl Default for HttpClientConfig {
  fn default() -> Self {
    HttpClientConfig {
      http_proxy: None,
      user: None,
      pass: None,
      enable_cookies: false,
      timeout: None,
      use_system_proxy: true,
    }
  }
}

impl HttpClientConfig {
  pub fn to_client(self) -> Result<Client, reqwest::Error> {
    let HttpClientConfig {
      http_proxy,
      user,
      pass,
      enable_cookies,
      timeout,
      use_system_proxy,
    } = self;
    let mut client_builder = reqwest::ClientBuilder::new();

    if let Some(proxy_url) = http_proxy {
      let mut proxy = reqwest::Proxy::all(proxy_url)?;

      if let (Some(user_name), Some(password)) = (user, pass) {
        proxy = proxy.basic_auth(&user_name, &password);
      }

      client_builder = client_builder.proxy(proxy);
    } else if !use_system_proxy {
      client_builder = client_builder.no_proxy();
    }

    if enable_cookies {
      client_builder = client_builder.cookie_store(true);
    }

    if let Some(timeout) = timeout {
      client_builder = client_builder.timeout(timeout);
    }

    let client = client_builder.redirect(Policy::limited(5)).build()?;

    Ok(client)
  }
}
