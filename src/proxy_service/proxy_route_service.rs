use std::sync::Arc;

use actix_web::dev::{self, Payload, Service, ServiceRequest, ServiceResponse};
use actix_web::{HttpRequest, ResponseError};
use futures_core::future::LocalBoxFuture;
use log::{debug, warn};

use crate::proxy_service::forward_request::ForwardRequest;
use crate::proxy_service::proxy_forwarder::ProxyForwarder;

pub struct ProxyRouteService {
  pub(super) forwarder: Arc<ProxyForwarder>,
  pub(super) mount_path: Arc<str>,
}

impl Service<ServiceRequest> for ProxyRouteService {
  type Response = ServiceResponse;
  type Error = actix_web::Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  dev::always_ready!();

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let (http_request, payload) = req.into_parts();

    Box::pin(ProxyRouteService::exec(
      self.forwarder.clone(),
      self.mount_path.clone(),
      http_request,
      payload,
    ))
  }
}

impl ProxyRouteService {
  async fn exec(
    forwarder: Arc<ProxyForwarder>,
    mount_path: Arc<str>,
    http: HttpRequest,
    payload: Payload,
  ) -> Result<ServiceResponse, actix_web::Error> {
    let request = match ForwardRequest::from_inbound(&http, payload, &mount_path).await {
      Ok(request) => request,
      Err(err) => {
        warn!("Rejected {} {}: {}", http.method(), http.path(), err);
        return Ok(ServiceResponse::new(http, err.error_response()));
      }
    };

    debug!("Forwarding {} {} as {:?}", http.method(), http.path(), request.body().kind());

    let response = forwarder.forward(request).await;
    Ok(ServiceResponse::new(http, response.into_http_response()))
  }
}
