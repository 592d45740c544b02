use std::fmt::{Debug, Display, Formatter};

use actix_web::body::SizedStream;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use bytes::Bytes;
use futures_core::stream::LocalBoxStream;
use futures_util::StreamExt;
use log::warn;
use reqwest::Response;
use serde_json::{json, Value};

use crate::proxy_service::forward_request::{is_json_media_type, media_type};

pub const JSON_CONTENT_TYPE: &str = "application/json";
const DEFAULT_BINARY_CONTENT_TYPE: &str = "application/octet-stream";
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Failed to proxy request to backend";

/// Upstream bytes relayed as they arrive.
pub struct BinaryBody {
  pub length: Option<u64>,
  pub stream: LocalBoxStream<'static, Result<Bytes, reqwest::Error>>,
}

impl Debug for BinaryBody {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BinaryBody").field("length", &self.length).finish()
  }
}

#[derive(Debug)]
pub enum ResponseBody {
  /// `text` is what goes back to the caller; `value` is its parsed form.
  Json { value: Value, text: String },
  Text(String),
  Binary(BinaryBody),
}

impl ResponseBody {
  pub fn json(value: Value) -> ResponseBody {
    let text = value.to_string();
    ResponseBody::Json { value, text }
  }
}

#[derive(Debug)]
pub struct ForwardResponse {
  pub status: u16,
  pub content_type: String,
  pub body: ResponseBody,
}

impl ForwardResponse {
  /// A JSON content-type is read whole and validated; the upstream text is relayed
  /// unchanged, or as a plain string with the upstream status when it does not parse.
  /// Anything else streams through.
  pub async fn from_upstream(response: Response) -> Result<ForwardResponse, reqwest::Error> {
    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(CONTENT_TYPE.as_str())
      .and_then(|value| value.to_str().ok())
      .map(String::from);

    match content_type {
      Some(content_type) if is_json_media_type(&media_type(&content_type)) => {
        let text = response.text().await?;

        let body = match serde_json::from_str::<Value>(&text) {
          Ok(value) => ResponseBody::Json { value, text },
          Err(err) => {
            warn!("Upstream sent malformed JSON with status {}: {}", status, err);
            ResponseBody::Text(text)
          }
        };

        Ok(ForwardResponse {
          status,
          content_type,
          body,
        })
      }
      content_type => Ok(ForwardResponse {
        status,
        content_type: content_type.unwrap_or_else(|| DEFAULT_BINARY_CONTENT_TYPE.into()),
        body: ResponseBody::Binary(BinaryBody {
          length: response.content_length(),
          stream: response.bytes_stream().boxed_local(),
        }),
      }),
    }
  }

  pub fn transport_failure(err: &dyn Display) -> ForwardResponse {
    ForwardResponse {
      status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
      content_type: JSON_CONTENT_TYPE.into(),
      body: ResponseBody::json(json!({
        "error": err.to_string(),
        "message": TRANSPORT_FAILURE_MESSAGE,
      })),
    }
  }

  pub fn into_http_response(self) -> HttpResponse {
    let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);

    match self.body {
      ResponseBody::Json { text, .. } => builder.content_type(JSON_CONTENT_TYPE).body(text),
      ResponseBody::Text(text) => builder
        .content_type(JSON_CONTENT_TYPE)
        .body(Value::String(text).to_string()),
      ResponseBody::Binary(BinaryBody {
        length: Some(length),
        stream,
      }) => builder
        .content_type(self.content_type)
        .body(SizedStream::new(length, stream)),
      ResponseBody::Binary(BinaryBody { length: None, stream }) => {
        builder.content_type(self.content_type).streaming(stream)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;
  use futures_util::stream;

  #[test]
  fn transport_failure_is_a_500_envelope() {
    let response = ForwardResponse::transport_failure(&"connection refused");

    assert_eq!(response.status, 500);
    let ResponseBody::Json { value, .. } = &response.body else {
      panic!("expected json body, got {:?}", response.body);
    };
    assert_eq!(
      value,
      &json!({
        "error": "connection refused",
        "message": "Failed to proxy request to backend",
      })
    );
  }

  #[actix_web::test]
  async fn json_text_is_relayed_byte_for_byte() {
    let text = r#"{"zeta":1,"alpha":2,"id":10000000000000000000001}"#;
    let response = ForwardResponse {
      status: 200,
      content_type: JSON_CONTENT_TYPE.into(),
      body: ResponseBody::Json {
        value: serde_json::from_str(text).unwrap(),
        text: text.into(),
      },
    }
    .into_http_response();

    let body = to_bytes(response.into_body()).await.unwrap();
    assert_eq!(body, Bytes::from(text));
  }

  #[actix_web::test]
  async fn text_fallback_is_rendered_as_json_string() {
    let response = ForwardResponse {
      status: 200,
      content_type: JSON_CONTENT_TYPE.into(),
      body: ResponseBody::Text("<html>oops".into()),
    }
    .into_http_response();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
    let body = to_bytes(response.into_body()).await.unwrap();
    assert_eq!(body, Bytes::from_static(b"\"<html>oops\""));
  }

  #[actix_web::test]
  async fn binary_keeps_upstream_content_type() {
    let chunks: Vec<Result<Bytes, reqwest::Error>> = vec![
      Ok(Bytes::from_static(b"%PDF-")),
      Ok(Bytes::from_static(b"1.7")),
    ];
    let response = ForwardResponse {
      status: 201,
      content_type: "application/pdf".into(),
      body: ResponseBody::Binary(BinaryBody {
        length: Some(8),
        stream: stream::iter(chunks).boxed_local(),
      }),
    }
    .into_http_response();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/pdf");
    let body = to_bytes(response.into_body()).await.unwrap();
    assert_eq!(body, Bytes::from_static(b"%PDF-1.7"));
  }
}
