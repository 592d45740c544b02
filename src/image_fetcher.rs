use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use log::{error, info, warn};
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::proxy_error::ProxyError;
use crate::upstream_target::UpstreamTarget;

const IMAGE_CACHE_CONTROL: &str = "public, max-age=3600";
const FETCH_FAILURE_MESSAGE: &str = "Failed to fetch image";
const DEFAULT_IMAGE_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Deserialize, Debug)]
pub struct ImageQuery {
  pub url: Option<String>,
}

pub struct ImageFetcher {
  target: UpstreamTarget,
  http_client: Client,
  user_agent: Box<str>,
}

impl ImageFetcher {
  pub fn new(target: UpstreamTarget, http_client: Client, user_agent: &str) -> Self {
    Self {
      target,
      http_client,
      user_agent: Box::from(user_agent),
    }
  }

  pub fn resolve(&self, url: &str) -> String {
    self.target.resolve_resource(url)
  }

  pub async fn fetch(&self, url: Option<&str>) -> HttpResponse {
    let url = match url.map(str::trim).filter(|url| !url.is_empty()) {
      Some(url) => url,
      None => return ProxyError::BadRequest("Missing url parameter".into()).error_response(),
    };

    let resolved = self.resolve(url);
    info!("Fetching image {}", resolved);

    let response = match self
      .http_client
      .get(&resolved)
      .header(USER_AGENT, self.user_agent.as_ref())
      .send()
      .await
    {
      Ok(response) => response,
      Err(err) => {
        error!("Image fetch from {} failed {}", resolved, err);
        return HttpResponse::InternalServerError().json(ProxyError::from(err).envelope(FETCH_FAILURE_MESSAGE));
      }
    };

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
      warn!("Image fetch from {} answered {}", resolved, status);
      return HttpResponse::build(status).json(json!({
        "error": FETCH_FAILURE_MESSAGE,
        "status": status.as_u16(),
      }));
    }

    let content_type = response
      .headers()
      .get(CONTENT_TYPE.as_str())
      .and_then(|value| value.to_str().ok())
      .unwrap_or(DEFAULT_IMAGE_CONTENT_TYPE)
      .to_string();

    HttpResponse::build(status)
      .content_type(content_type)
      .insert_header((CACHE_CONTROL, IMAGE_CACHE_CONTROL))
      .streaming(response.bytes_stream())
  }
}

pub async fn fetch_image(query: web::Query<ImageQuery>, fetcher: web::Data<ImageFetcher>) -> HttpResponse {
  fetcher.fetch(query.url.as_deref()).await
}
