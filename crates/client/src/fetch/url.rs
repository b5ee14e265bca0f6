//! Mapping between intercepted URLs and manifest resource identifiers.
//!
//! Manifest identifiers are origin-relative paths without a leading slash
//! (`index.html`, `assets/app.css`), with `/` standing for the origin root.

/// Error type for origin and identifier handling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse the deployment origin that identifiers resolve against.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an absolute http(s) URL
/// 3. Drop query and fragment
/// 4. Ensure the path ends with `/` so relative joins stay under it
pub fn canonicalize_origin(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_query(None);
    parsed.set_fragment(None);
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

/// Resolve a resource identifier to the URL the network should be asked for.
///
/// `/` maps to the origin itself; absolute http(s) URLs pass through.
pub fn resolve(origin: &url::Url, resource: &str) -> Result<url::Url, UrlError> {
    let resource = resource.trim();

    if resource.is_empty() {
        return Err(UrlError::Empty);
    }
    if resource == "/" {
        return Ok(origin.clone());
    }
    if resource.contains("://") {
        let url = url::Url::parse(resource).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        return match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
        };
    }

    origin
        .join(resource.trim_start_matches('/'))
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

/// Where an intercepted URL points, relative to the origin.
enum Target {
    Local { path: String, query: Option<String> },
    Foreign(String),
}

fn split_target(origin: &url::Url, raw: &str) -> Result<Target, UrlError> {
    let trimmed = raw.trim();

    if trimmed.contains("://") {
        let mut url = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        url.set_fragment(None);
        if url.origin() != origin.origin() || !url.path().starts_with(origin.path()) {
            return Ok(Target::Foreign(url.to_string()));
        }
        let path = url.path()[origin.path().len()..].to_string();
        return Ok(Target::Local { path, query: url.query().map(str::to_string) });
    }

    let without_fragment = trimmed.split('#').next().unwrap_or_default();
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (without_fragment, None),
    };
    Ok(Target::Local { path: path.trim_start_matches('/').to_string(), query })
}

/// Origin-relative form of an intercepted URL, as it is forwarded to the network.
///
/// Only the origin prefix and the fragment are removed. Path encoding and the
/// full query string are kept as sent. URLs on another origin keep their full
/// text.
pub fn request_path(origin: &url::Url, raw: &str) -> Result<String, UrlError> {
    match split_target(origin, raw)? {
        Target::Foreign(url) => Ok(url),
        Target::Local { path, query } => {
            let mut rest = path;
            if let Some(query) = query {
                rest.push('?');
                rest.push_str(&query);
            }
            if rest.is_empty() { Ok("/".to_string()) } else { Ok(rest) }
        }
    }
}

/// Derive the manifest identifier for an intercepted URL or path.
///
/// - same-origin URLs lose the origin prefix
/// - the path is percent-decoded, so `caf%C3%A9.png` and `café.png` match
/// - the origin root, an empty path, or a bare fragment becomes `/`
/// - fragments and a `?v=` cache-busting suffix are dropped
/// - URLs on another origin keep their full text, so they never match a
///   manifest entry
///
/// The key is only used for store lookups. Requests that reach the network
/// carry [`request_path`] instead.
pub fn resource_key(origin: &url::Url, raw: &str) -> Result<String, UrlError> {
    let (path, query) = match split_target(origin, raw)? {
        Target::Foreign(url) => return Ok(url),
        Target::Local { path, query } => (path, query),
    };

    let decoded = percent_encoding::percent_decode_str(&path)
        .decode_utf8()
        .ok()
        .map(|cow| cow.into_owned());
    let mut key = decoded.unwrap_or(path);
    if let Some(query) = query.filter(|q| !q.starts_with("v=")) {
        key.push('?');
        key.push_str(&query);
    }

    if key.is_empty() { Ok("/".to_string()) } else { Ok(key) }
}
