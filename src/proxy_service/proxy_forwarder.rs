use std::sync::Arc;

use log::{debug, error, info, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};

use crate::app_config::DebugBodyRoute;
use crate::proxy_error::ProxyError;
use crate::proxy_service::forward_request::{is_json_media_type, media_type, ForwardRequest, RequestBody};
use crate::proxy_service::forward_response::{ForwardResponse, JSON_CONTENT_TYPE};
use crate::upstream_target::UpstreamTarget;

/// Rebuilds one inbound request against the backend API and relays the answer.
pub struct ProxyForwarder {
  target: UpstreamTarget,
  http_client: Client,
  debug_routes: Arc<[DebugBodyRoute]>,
}

impl ProxyForwarder {
  pub fn new(target: UpstreamTarget, http_client: Client, debug_routes: Vec<DebugBodyRoute>) -> Self {
    Self {
      target,
      http_client,
      debug_routes: Arc::from(debug_routes),
    }
  }

  /// Single attempt. Transport failures come back as a 500 envelope, never as `Err`.
  pub async fn forward(&self, request: ForwardRequest) -> ForwardResponse {
    let url = self.target.url_for(request.path_segments(), request.query());
    info!("Proxying {} {}", request.method(), url);

    self.log_outbound_body(&request);

    let builder = self.init_request(&url, request);

    let upstream = match builder.send().await {
      Ok(upstream) => upstream,
      Err(err) => {
        error!("Proxy request to {} failed {}", url, err);
        return ForwardResponse::transport_failure(&ProxyError::from(err));
      }
    };

    debug!("Upstream {} responded {}", url, upstream.status());

    match ForwardResponse::from_upstream(upstream).await {
      Ok(response) => response,
      Err(err) => {
        error!("Reading proxy body from {} failed {}", url, err);
        ForwardResponse::transport_failure(&ProxyError::from(err))
      }
    }
  }

  fn init_request(&self, url: &str, request: ForwardRequest) -> RequestBuilder {
    let (method, headers, body) = request.into_parts();
    let mut builder = self.http_client.request(method.to_reqwest(), url);

    if let Some(authorization) = headers.authorization {
      builder = builder.header(AUTHORIZATION, authorization);
    }

    match body {
      RequestBody::Empty => builder,
      RequestBody::Multipart(form) => builder.multipart(form.into_form()),
      RequestBody::Json(bytes) => builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(bytes),
      RequestBody::Raw(bytes) => {
        let content_type = raw_content_type(headers.content_type.as_deref());
        builder.header(CONTENT_TYPE, content_type).body(bytes)
      }
    }
  }

  fn log_outbound_body(&self, request: &ForwardRequest) {
    if !log::log_enabled!(log::Level::Debug) {
      return;
    }

    let RequestBody::Json(bytes) = request.body() else {
      return;
    };

    let path = request.path();
    if !self.debug_routes.iter().any(|route| route.matches(request.method(), &path)) {
      return;
    }

    match serde_json::from_slice::<serde_json::Value>(bytes) {
      Ok(value) => debug!("Outbound {} /{} body {}", request.method(), path, value),
      Err(err) => warn!("Outbound {} /{} body is not valid JSON: {}", request.method(), path, err),
    }
  }
}

/// Raw bodies default to JSON unless the caller sent an explicit non-JSON type.
fn raw_content_type(inbound: Option<&str>) -> &str {
  match inbound {
    Some(content_type) if !content_type.trim().is_empty() && !is_json_media_type(&media_type(content_type)) => {
      content_type
    }
    _ => JSON_CONTENT_TYPE,
  }
}
