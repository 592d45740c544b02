use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
  #[error("{0}")]
  Transport(#[from] reqwest::Error),

  #[error("{0}")]
  BadRequest(String),

  #[error("Invalid multipart payload: {0}")]
  Multipart(String),

  #[error("Unable to read request payload: {0}")]
  Payload(String),

  #[error("Method {0} is not supported by the proxy")]
  UnsupportedMethod(String),
}

impl ProxyError {
  /// `{ "error": <this error>, "message": <message> }`
  pub fn envelope(&self, message: &str) -> Value {
    json!({ "error": self.to_string(), "message": message })
  }
}

impl ResponseError for ProxyError {
  fn status_code(&self) -> StatusCode {
    match self {
      ProxyError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ProxyError::BadRequest(_) | ProxyError::Multipart(_) | ProxyError::Payload(_) => {
        StatusCode::BAD_REQUEST
      }
      ProxyError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
    }
  }

  fn error_response(&self) -> HttpResponse {
    HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
  }
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Unable to read configuration file: {0}")]
  Io(#[from] std::io::Error),

  #[error("Invalid configuration file: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("Backend url '{0}' is not an absolute http(s) url")]
  InvalidBackendUrl(String),

  #[error("Unable to build http client: {0}")]
  Client(#[source] reqwest::Error),
}
