pub mod forward_request;
pub mod forward_response;
pub mod proxy_factory;
pub mod proxy_forwarder;
pub mod proxy_route_service;

pub use proxy_factory::ProxyRouteServiceFactory;
pub use proxy_forwarder::ProxyForwarder;
