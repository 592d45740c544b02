use actix_multipart::Multipart;
use actix_web::dev::Payload;
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
use actix_web::HttpRequest;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use log::warn;
use reqwest::multipart::{Form, Part};

use crate::http_method::HttpMethod;
use crate::proxy_error::ProxyError;

/// How the inbound body is carried upstream, picked once from method and content-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
  Json,
  Multipart,
  Raw,
  Empty,
}

impl BodyKind {
  pub fn detect(method: HttpMethod, content_type: Option<&str>) -> BodyKind {
    if !method.allows_body() {
      return BodyKind::Empty;
    }

    match content_type.map(media_type) {
      Some(media) if media == "multipart/form-data" => BodyKind::Multipart,
      Some(media) if is_json_media_type(&media) => BodyKind::Json,
      _ => BodyKind::Raw,
    }
  }
}

/// Lowercased media type without parameters.
pub fn media_type(content_type: &str) -> String {
  content_type
    .split(';')
    .next()
    .unwrap_or_default()
    .trim()
    .to_ascii_lowercase()
}

pub fn is_json_media_type(media: &str) -> bool {
  media == "application/json" || media.ends_with("+json")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
  pub name: String,
  pub filename: Option<String>,
  pub content_type: Option<String>,
  pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
  pub fields: Vec<FormField>,
}

impl MultipartForm {
  pub async fn read(mut multipart: Multipart) -> Result<MultipartForm, ProxyError> {
    let mut fields = Vec::new();

    while let Some(item) = multipart.next().await {
      let mut field = item.map_err(|err| ProxyError::Multipart(err.to_string()))?;

      let disposition = field.content_disposition();
      let name = disposition.get_name().unwrap_or_default().to_string();
      let filename = disposition.get_filename().map(String::from);
      let content_type = field.content_type().map(|mime| mime.to_string());

      let mut data = BytesMut::new();
      while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|err| ProxyError::Multipart(err.to_string()))?;
        data.extend_from_slice(&chunk);
      }

      fields.push(FormField {
        name,
        filename,
        content_type,
        data: data.freeze(),
      });
    }

    Ok(MultipartForm { fields })
  }

  /// Hands the fields to reqwest, which writes its own boundary.
  pub fn into_form(self) -> Form {
    self.fields.into_iter().fold(Form::new(), |form, field| {
      let FormField {
        name,
        filename,
        content_type,
        data,
      } = field;

      let build_part = || {
        let part = Part::bytes(data.to_vec());
        match &filename {
          Some(filename) => part.file_name(filename.clone()),
          None => part,
        }
      };

      let part = match content_type {
        Some(mime) => build_part().mime_str(&mime).unwrap_or_else(|err| {
          warn!("Dropping invalid content type '{}' of form field '{}': {}", mime, name, err);
          build_part()
        }),
        None => build_part(),
      };

      form.part(name, part)
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
  Empty,
  Raw(Bytes),
  Json(Bytes),
  Multipart(MultipartForm),
}

impl RequestBody {
  pub fn kind(&self) -> BodyKind {
    match self {
      RequestBody::Empty => BodyKind::Empty,
      RequestBody::Raw(_) => BodyKind::Raw,
      RequestBody::Json(_) => BodyKind::Json,
      RequestBody::Multipart(_) => BodyKind::Multipart,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardHeaders {
  pub authorization: Option<String>,
  pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRequest {
  method: HttpMethod,
  path_segments: Vec<String>,
  query: String,
  headers: ForwardHeaders,
  body: RequestBody,
}

impl ForwardRequest {
  pub fn new(
    method: HttpMethod,
    path_segments: Vec<String>,
    query: impl Into<String>,
    headers: ForwardHeaders,
    body: RequestBody,
  ) -> ForwardRequest {
    let body = if method.allows_body() { body } else { RequestBody::Empty };

    ForwardRequest {
      method,
      path_segments,
      query: query.into(),
      headers,
      body,
    }
  }

  /// Reads an inbound actix request mounted under `mount_path`.
  pub async fn from_inbound(
    http: &HttpRequest,
    payload: Payload,
    mount_path: &str,
  ) -> Result<ForwardRequest, ProxyError> {
    let method = HttpMethod::try_from(http.method())
      .map_err(|()| ProxyError::UnsupportedMethod(http.method().to_string()))?;

    let headers = ForwardHeaders {
      authorization: header_str(http, AUTHORIZATION.as_str()),
      content_type: header_str(http, CONTENT_TYPE.as_str()),
    };

    let body = match BodyKind::detect(method, headers.content_type.as_deref()) {
      BodyKind::Multipart => {
        let multipart = Multipart::new(http.headers(), payload);
        RequestBody::Multipart(MultipartForm::read(multipart).await?)
      }
      BodyKind::Json => RequestBody::Json(read_payload(payload).await?),
      BodyKind::Raw => {
        let bytes = read_payload(payload).await?;
        if bytes.is_empty() {
          RequestBody::Empty
        } else {
          RequestBody::Raw(bytes)
        }
      }
      BodyKind::Empty => RequestBody::Empty,
    };

    Ok(ForwardRequest::new(
      method,
      path_segments(http.path(), mount_path),
      http.query_string(),
      headers,
      body,
    ))
  }

  pub fn method(&self) -> HttpMethod {
    self.method
  }

  pub fn path_segments(&self) -> &[String] {
    &self.path_segments
  }

  pub fn path(&self) -> String {
    self.path_segments.join("/")
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn headers(&self) -> &ForwardHeaders {
    &self.headers
  }

  pub fn body(&self) -> &RequestBody {
    &self.body
  }

  pub fn into_parts(self) -> (HttpMethod, ForwardHeaders, RequestBody) {
    (self.method, self.headers, self.body)
  }
}

/// Segments of `path` after `mount_path`, empty segments dropped.
pub fn path_segments(path: &str, mount_path: &str) -> Vec<String> {
  let mount = mount_path.trim_end_matches('/');
  let tail = path.strip_prefix(mount).unwrap_or(path);

  tail
    .split('/')
    .filter(|segment| !segment.is_empty())
    .map(String::from)
    .collect()
}

fn header_str(http: &HttpRequest, name: &str) -> Option<String> {
  http
    .headers()
    .get(name)
    .and_then(|value| value.to_str().ok())
    .map(String::from)
}

async fn read_payload(mut payload: Payload) -> Result<Bytes, ProxyError> {
  let mut body_buffer = BytesMut::new();

  while let Some(chunk) = payload.next().await {
    let bytes = chunk.map_err(|err| ProxyError::Payload(err.to_string()))?;
    body_buffer.extend_from_slice(&bytes);
  }

  Ok(body_buffer.freeze())
}
