use std::sync::Arc;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use futures_core::future::LocalBoxFuture;
use crate::proxy_service::proxy_forwarder::ProxyForwarder;
use crate::proxy_service::proxy_route_service::ProxyRouteService;

/// Builds one [`ProxyRouteService`] per worker, all sharing the same forwarder.
pub struct ProxyRouteServiceFactory {
  pub forwarder: Arc<ProxyForwarder>,
  pub mount_path: Arc<str>,
}

impl ServiceFactory<ServiceRequest> for ProxyRouteServiceFactory {
  type Response = ServiceResponse;
  type Error = actix_web::Error;
  type Config = ();
  type Service = ProxyRouteService;
  type InitError = ();
  type Future = LocalBoxFuture<'static, Result<Self::Service, Self::InitError>>;

  fn new_service(&self, _: Self::Config) -> Self::Future {
    let service = ProxyRouteService {
      forwarder: self.forwarder.clone(),
      mount_path: self.mount_path.clone(),
    };

    Box::pin(async move { Ok(service) })
  }
}

impl ProxyRouteServiceFactory {
  pub fn create(forwarder: Arc<ProxyForwarder>, mount_path: &str) -> Self {
    Self {
      forwarder,
      mount_path: Arc::from(mount_path),
    }
  }
}
