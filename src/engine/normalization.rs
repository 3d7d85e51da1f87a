use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq)]
pub enum UrlRejection {
    #[error("URL is empty")]
    Empty,

    #[error("URL does not parse: {0}")]
    Malformed(String),

    #[error("Unsupported scheme '{0}', expected http or https")]
    Scheme(String),

    #[error("URL has no host")]
    MissingHost,
}

// * Tracking parameters that never change which document a URL names
// ! Add new tracking params here as they are discovered.
const DROP_PARAMS: [&str; 9] = [
    "utm_source", "utm_medium", "utm_campaign", "utm_term", "utm_content",
    "gclid", "fbclid", "yclid", "_ga",
];

// * Validates a submitted URL and returns its canonical form.
// *
// * 1. Must be absolute http(s) with a host.
// * 2. Strip Fragment (#).
// * 3. Lowercase Hostname.
// * 4. Remove Tracking Parameters (utm_*, gclid, etc.).
// * 5. Sort remaining Query Parameters alphabetically.
pub fn canonicalize_url(input: &str) -> Result<Url, UrlRejection> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlRejection::Empty);
    }

    let mut url = Url::parse(input).map_err(|e| UrlRejection::Malformed(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlRejection::Scheme(url.scheme().to_string()));
    }

    // * Step 2: Strip Fragment
    url.set_fragment(None);

    // * Step 3: Lowercase Hostname
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_lowercase)
        .ok_or(UrlRejection::MissingHost)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlRejection::Malformed(e.to_string()))?;

    // * Step 4 & 5: Filter and Sort Query Params
    if url.query().is_some() {
        let clean_pairs: BTreeMap<String, String> = url
            .query_pairs()
            .filter(|(k, _)| !DROP_PARAMS.contains(&k.to_lowercase().as_str()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if clean_pairs.is_empty() {
            url.set_query(None);
        } else {
            let mut serializer = url.query_pairs_mut();
            serializer.clear();
            for (k, v) in clean_pairs {
                serializer.append_pair(&k, &v);
            }
        }
    }

    Ok(url)
}
