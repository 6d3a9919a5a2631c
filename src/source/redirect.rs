use url::Url;

/// Extract the local path a redirect location points at.
///
/// Absolute locations keep only their path, and must share scheme, host and
/// port with `origin` when one is given. Absolute paths are taken as they
/// are. Anything else, including an empty or root path, yields `None`.
pub fn resolve_redirect(location: &str, origin: Option<&Url>) -> Option<String> {
    let location = location.trim();

    let path = match Url::parse(location) {
        Ok(url) => {
            if url.cannot_be_a_base() || url.host().is_none() {
                return None;
            }
            if let Some(origin) = origin {
                if url.scheme() != origin.scheme()
                    || url.host() != origin.host()
                    || url.port_or_known_default() != origin.port_or_known_default()
                {
                    return None;
                }
            }
            url.path().to_string()
        }
        Err(url::ParseError::RelativeUrlWithoutBase) if location.starts_with('/') => {
            // Network-path references ("//host/x") carry a host, not a path.
            if location.starts_with("//") {
                return None;
            }
            let base = Url::parse("http://localhost/").ok()?;
            base.join(location).ok()?.path().to_string()
        }
        Err(_) => return None,
    };

    if path.is_empty() || path == "/" {
        None
    } else {
        Some(path)
    }
}
