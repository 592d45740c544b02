use crate::proxy_error::ConfigError;
use reqwest::Url;

const API_SUFFIX: &str = "/api";

/// Backend base url, normalized to end in exactly one `/api` segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamTarget {
  base_url: Box<str>,
}

impl UpstreamTarget {
  /// Only the path is normalized; scheme and authority are kept as configured.
  pub fn new(configured: &str) -> UpstreamTarget {
    let (origin, path) = split_origin(configured.trim());
    let mut path = path.trim_end_matches('/');

    while let Some(stripped) = path.strip_suffix(API_SUFFIX) {
      path = stripped.trim_end_matches('/');
    }

    UpstreamTarget {
      base_url: Box::from(format!("{}{}{}", origin, path, API_SUFFIX)),
    }
  }

  /// Like [`UpstreamTarget::new`] but rejects anything that is not an absolute http(s) url.
  pub fn parse(configured: &str) -> Result<UpstreamTarget, ConfigError> {
    let target = UpstreamTarget::new(configured);

    match Url::parse(target.base_url()) {
      Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(target),
      _ => Err(ConfigError::InvalidBackendUrl(configured.to_string())),
    }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Scheme, host and any path prefix in front of `/api`.
  pub fn host(&self) -> &str {
    self.base_url.strip_suffix(API_SUFFIX).unwrap_or(&self.base_url)
  }

  pub fn url_for<S: AsRef<str>>(&self, segments: &[S], query: &str) -> String {
    let path = segments
      .iter()
      .map(|segment| segment.as_ref())
      .collect::<Vec<&str>>()
      .join("/");

    if query.is_empty() {
      format!("{}/{}", self.base_url, path)
    } else {
      format!("{}/{}?{}", self.base_url, path, query)
    }
  }

  /// Resolves an absolute or backend-relative resource url.
  pub fn resolve_resource(&self, url: &str) -> String {
    let url = url.trim();

    if has_scheme(url, "http://") || has_scheme(url, "https://") {
      return url.to_string();
    }

    if url.starts_with("//") {
      return format!("https:{}", url);
    }

    let path = if url.starts_with('/') {
      url.to_string()
    } else {
      format!("/{}", url)
    };

    if is_path_under(&path, API_SUFFIX) || is_path_under(&path, "/uploads") {
      format!("{}{}", self.host(), path)
    } else {
      format!("{}{}", self.base_url, path)
    }
  }
}

/// `scheme://authority` and the path that follows it.
fn split_origin(url: &str) -> (&str, &str) {
  let path_start = match url.find("://") {
    Some(scheme_end) => {
      let authority_start = scheme_end + "://".len();
      url[authority_start..]
        .find('/')
        .map_or(url.len(), |offset| authority_start + offset)
    }
    None => 0,
  };

  url.split_at(path_start)
}

fn has_scheme(url: &str, scheme: &str) -> bool {
  url
    .get(..scheme.len())
    .map_or(false, |head| head.eq_ignore_ascii_case(scheme))
}

fn is_path_under(path: &str, prefix: &str) -> bool {
  match path.strip_prefix(prefix) {
    Some(rest) => rest.is_empty() || rest.starts_with(&['/', '?'][..]),
    None => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalizes_base_with_or_without_api_suffix() {
    for base in [
      "https://example.com",
      "https://example.com/",
      "https://example.com/api",
      "https://example.com/api/",
      "  https://example.com/api//  ",
      "https://example.com/api/api",
    ] {
      assert_eq!(UpstreamTarget::new(base).base_url(), "https://example.com/api", "{}", base);
    }
  }

  #[test]
  fn host_named_api_is_not_stripped() {
    for (base, host) in [
      ("http://api", "http://api"),
      ("http://api/", "http://api"),
      ("http://api/api", "http://api"),
      ("http://api:8000/api/", "http://api:8000"),
    ] {
      let target = UpstreamTarget::new(base);
      assert_eq!(target.host(), host, "{}", base);
      assert_eq!(target.url_for(&["parties"], ""), format!("{}/api/parties", host), "{}", base);
    }
    assert!(UpstreamTarget::parse("http://api").is_ok());
  }

  #[test]
  fn keeps_path_prefix_in_front_of_api() {
    let target = UpstreamTarget::new("http://10.0.0.5:8080/backend/");
    assert_eq!(target.base_url(), "http://10.0.0.5:8080/backend/api");
    assert_eq!(target.host(), "http://10.0.0.5:8080/backend");
  }

  #[test]
  fn builds_upstream_urls_from_segments_and_query() {
    let target = UpstreamTarget::new("https://example.com/");

    assert_eq!(
      target.url_for(&["parties", "42"], ""),
      "https://example.com/api/parties/42"
    );
    assert_eq!(
      target.url_for(&["expenses"], "page=2&sort=date%20desc"),
      "https://example.com/api/expenses?page=2&sort=date%20desc"
    );
    assert_eq!(target.url_for::<&str>(&[], ""), "https://example.com/api/");
  }

  #[test]
  fn parse_rejects_relative_urls() {
    assert!(UpstreamTarget::parse("not a url").is_err());
    assert!(UpstreamTarget::parse("ftp://example.com").is_err());
    assert!(UpstreamTarget::parse("http://localhost:5000").is_ok());
  }

  #[test]
  fn resolves_uploads_against_host() {
    let target = UpstreamTarget::new("https://example.com/api");
    assert_eq!(target.resolve_resource("/uploads/x.png"), "https://example.com/uploads/x.png");
    assert_eq!(target.resolve_resource("uploads/x.png"), "https://example.com/uploads/x.png");
  }

  #[test]
  fn resolves_api_paths_without_doubling_the_suffix() {
    let target = UpstreamTarget::new("https://example.com");
    assert_eq!(
      target.resolve_resource("/api/products/7/image"),
      "https://example.com/api/products/7/image"
    );
  }

  #[test]
  fn resolves_other_relative_paths_against_api_base() {
    let target = UpstreamTarget::new("https://example.com");
    assert_eq!(target.resolve_resource("/images/a.jpg"), "https://example.com/api/images/a.jpg");
    assert_eq!(target.resolve_resource("/apiary.png"), "https://example.com/api/apiary.png");
  }

  #[test]
  fn leaves_absolute_urls_untouched() {
    let target = UpstreamTarget::new("https://example.com");
    assert_eq!(target.resolve_resource("https://cdn.test/a.png"), "https://cdn.test/a.png");
    assert_eq!(target.resolve_resource("//cdn.test/a.png"), "https://cdn.test/a.png");
  }

  #[test]
  fn absolute_scheme_check_ignores_case() {
    let target = UpstreamTarget::new("https://example.com");
    assert_eq!(target.resolve_resource("HTTPS://cdn.test/x.png"), "HTTPS://cdn.test/x.png");
    assert_eq!(target.resolve_resource("Http://cdn.test/x.png"), "Http://cdn.test/x.png");
  }
}
