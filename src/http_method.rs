use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy, Hash, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
  #[default]
  Get,
  Post,
  Put,
  Delete,
  Head,
  Patch,
}

impl HttpMethod {
  /// GET and HEAD never carry a request body upstream.
  pub fn allows_body(&self) -> bool {
    !matches!(self, HttpMethod::Get | HttpMethod::Head)
  }

  pub fn to_reqwest(self) -> reqwest::Method {
    match self {
      HttpMethod::Get => reqwest::Method::GET,
      HttpMethod::Post => reqwest::Method::POST,
      HttpMethod::Put => reqwest::Method::PUT,
      HttpMethod::Delete => reqwest::Method::DELETE,
      HttpMethod::Head => reqwest::Method::HEAD,
      HttpMethod::Patch => reqwest::Method::PATCH,
    }
  }
}

impl TryFrom<&str> for HttpMethod {
  type Error = ();

  fn try_from(value: &str) -> Result<Self, Self::Error> {
    match value.to_lowercase().as_str() {
      "get" => Ok(HttpMethod::Get),
      "post" => Ok(HttpMethod::Post),
      "patch" => Ok(HttpMethod::Patch),
      "put" => Ok(HttpMethod::Put),
      "head" => Ok(HttpMethod::Head),
      "delete" => Ok(HttpMethod::Delete),
      _ => Err(()),
    }
  }
}

impl TryFrom<&actix_web::http::Method> for HttpMethod {
  type Error = ();

  fn try_from(value: &actix_web::http::Method) -> Result<Self, Self::Error> {
    HttpMethod::try_from(value.as_str())
  }
}

impl Display for HttpMethod {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      HttpMethod::Get => f.write_str("GET"),
      HttpMethod::Post => f.write_str("POST"),
      HttpMethod::Put => f.write_str("PUT"),
      HttpMethod::Delete => f.write_str("DELETE"),
      HttpMethod::Head => f.write_str("HEAD"),
      HttpMethod::Patch => f.write_str("PATCH"),
    }
  }
}
