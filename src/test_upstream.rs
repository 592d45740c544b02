//! In-process backend used by the async tests.

use std::net::TcpListener;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use reqwest::Client;
use serde_json::json;

use crate::http_client::HttpClientConfig;

/// Served by `/api/ordered`: unsorted keys and an integer past u64.
pub const ORDERED_JSON: &str = r#"{"zeta":1,"alpha":2,"id":10000000000000000000001}"#;

pub struct TestUpstream {
  pub base_url: String,
  _handle: ServerHandle,
}

/// Must be called from inside an actix system, e.g. an `#[actix_web::test]`.
pub fn spawn_upstream() -> TestUpstream {
  let server = HttpServer::new(|| {
    App::new()
      .route("/api/malformed", web::get().to(malformed_json))
      .route("/api/ordered", web::get().to(ordered_json))
      .route("/api/slow", web::get().to(slow_reply))
      .route("/api/missing", web::delete().to(missing_party))
      .route("/api/report.pdf", web::get().to(pdf_report))
      .route("/uploads/shoe.png", web::get().to(png_image))
      .route("/api/uploads/gone.png", web::get().to(missing_image))
      .default_service(web::to(echo))
  })
  .workers(1)
  .disable_signals()
  .bind(("127.0.0.1", 0))
  .expect("bind test upstream");

  let addr = server.addrs()[0];
  let running = server.run();
  let handle = running.handle();
  actix_web::rt::spawn(running);

  TestUpstream {
    base_url: format!("http://{}", addr),
    _handle: handle,
  }
}

/// Base url of a port nothing listens on.
pub fn closed_port_url() -> String {
  let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
  let addr = listener.local_addr().expect("local addr");
  drop(listener);
  format!("http://{}", addr)
}

pub fn test_client() -> Client {
  HttpClientConfig {
    use_system_proxy: false,
    ..HttpClientConfig::default()
  }
  .to_client()
  .expect("build test client")
}

pub fn test_client_with_timeout(timeout: Duration) -> Client {
  HttpClientConfig {
    use_system_proxy: false,
    timeout: Some(timeout),
    ..HttpClientConfig::default()
  }
  .to_client()
  .expect("build test client")
}

async fn echo(req: HttpRequest, body: web::Bytes) -> HttpResponse {
  let header = |name: &str| {
    req
      .headers()
      .get(name)
      .and_then(|value| value.to_str().ok())
      .map(String::from)
  };

  HttpResponse::Ok().json(json!({
    "method": req.method().as_str(),
    "path": req.path(),
    "query": req.query_string(),
    "content_type": header("content-type"),
    "authorization": header("authorization"),
    "cookie": header("cookie"),
    "user_agent": header("user-agent"),
    "body": String::from_utf8_lossy(&body),
  }))
}

async fn malformed_json() -> HttpResponse {
  HttpResponse::Ok()
    .content_type("application/json")
    .body("{\"broken\": ")
}

async fn ordered_json() -> HttpResponse {
  HttpResponse::Ok().content_type("application/json").body(ORDERED_JSON)
}

async fn slow_reply() -> HttpResponse {
  actix_web::rt::time::sleep(Duration::from_secs(2)).await;
  HttpResponse::Ok().json(json!({ "late": true }))
}

async fn missing_party() -> HttpResponse {
  HttpResponse::NotFound().json(json!({ "error": "Party not found" }))
}

async fn pdf_report() -> HttpResponse {
  HttpResponse::Ok()
    .content_type("application/pdf")
    .body(&b"%PDF-1.7"[..])
}

async fn png_image() -> HttpResponse {
  HttpResponse::Ok().content_type("image/png").body(&b"\x89PNG"[..])
}

async fn missing_image() -> HttpResponse {
  HttpResponse::NotFound().body("no such file")
}
