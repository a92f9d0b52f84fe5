use reqwest::{
    Method,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue},
};
use serde::Serialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to encode query string: {0}")]
    QueryEncoding(#[from] serde_urlencoded::ser::Error),

    #[error("failed to encode JSON body: {0}")]
    BodyEncoding(#[from] serde_json::Error),

    #[error("invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] InvalidHeaderName),

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, RequestError>;

/// A request built against the client's base URL, not yet sent.
///
/// Carries at most one body. Reads with parameters put them in the query
/// string and never have a body.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl PendingRequest {
    /// Builds a body-less request for `base_url` followed by `endpoint`.
    ///
    /// The joined string goes through URL parsing, which normalizes it: dot
    /// segments are resolved and characters such as spaces are
    /// percent-encoded, so `/a/../b c` is sent as `/b%20c`.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::InvalidUrl` if the joined string is not an
    /// absolute URL.
    pub fn new(method: Method, base_url: &str, endpoint: &str) -> Result<Self> {
        let target = format!("{base_url}{endpoint}");
        let url = Url::parse(&target).map_err(|source| RequestError::InvalidUrl {
            url: target,
            source,
        })?;

        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    /// Encodes `params` as `key=value` pairs and appends them to the query.
    ///
    /// Pairs keep the order in which `params` serializes its fields. Nothing
    /// is appended when `params` encodes to an empty string.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::QueryEncoding` if `params` is not a struct, map,
    /// or sequence of pairs with scalar values.
    pub fn with_query<P: Serialize + ?Sized>(mut self, params: &P) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(params)?;
        if encoded.is_empty() {
            return Ok(self);
        }

        let query = match self.url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
            _ => encoded,
        };
        self.url.set_query(Some(&query));

        Ok(self)
    }

    /// Attaches a zero-length body.
    #[must_use]
    pub fn with_empty_body(mut self) -> Self {
        self.body = Some(Vec::new());
        self
    }

    /// Serializes `params` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::BodyEncoding` if `params` cannot be serialized.
    pub fn with_json<P: Serialize + ?Sized>(mut self, params: &P) -> Result<Self> {
        let body = serde_json::to_vec(params)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(body);
        Ok(self)
    }

    /// Adds a header, replacing any earlier value under the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or value is not a valid HTTP header.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::try_from(name)?;
        let value = HeaderValue::try_from(value)?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde::ser::{self, Serializer};

    use super::*;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(ser::Error::custom("refusing to serialize"))
        }
    }

    #[test]
    fn test_new_joins_base_and_endpoint() {
        let request = PendingRequest::new(Method::GET, "http://localhost:3000", "/items").unwrap();

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url.as_str(), "http://localhost:3000/items");
        assert!(request.headers.is_empty());
        assert!(request.body.is_none());
    }

    #[test]
    fn test_new_normalizes_endpoint() {
        let request = PendingRequest::new(Method::GET, "http://localhost", "/a/../b c").unwrap();

        assert_eq!(request.url.as_str(), "http://localhost/b%20c");
    }

    #[test]
    fn test_with_empty_body_sets_zero_length_body() {
        let request = PendingRequest::new(Method::POST, "http://localhost", "/items")
            .unwrap()
            .with_empty_body();

        assert_eq!(request.body.as_deref(), Some(b"".as_slice()));
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_new_rejects_relative_base() {
        let result = PendingRequest::new(Method::GET, "not a url", "/items");

        assert_matches!(result, Err(RequestError::InvalidUrl { url, .. }) if url == "not a url/items");
    }

    #[test]
    fn test_new_rejects_invalid_host() {
        let result = PendingRequest::new(Method::POST, "http://exa mple.com", "/items");

        assert_matches!(result, Err(RequestError::InvalidUrl { .. }));
    }

    #[test]
    fn test_with_query_preserves_field_order() {
        #[derive(Serialize)]
        struct Filter {
            b: u32,
            a: u32,
        }

        let request = PendingRequest::new(Method::GET, "http://localhost", "/items")
            .unwrap()
            .with_query(&Filter { b: 2, a: 1 })
            .unwrap();

        assert_eq!(request.url.as_str(), "http://localhost/items?b=2&a=1");
    }

    #[test]
    fn test_with_query_uses_serde_renames_and_escapes_values() {
        #[derive(Serialize)]
        struct Search {
            #[serde(rename = "q")]
            term: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            page: Option<u32>,
        }

        let params = Search {
            term: "red & blue".to_string(),
            page: None,
        };
        let request = PendingRequest::new(Method::GET, "http://localhost", "/search")
            .unwrap()
            .with_query(&params)
            .unwrap();

        assert_eq!(request.url.query(), Some("q=red+%26+blue"));
    }

    #[test]
    fn test_with_query_extends_existing_query() {
        let request = PendingRequest::new(Method::GET, "http://localhost", "/items?sort=asc")
            .unwrap()
            .with_query(&[("limit", "10")])
            .unwrap();

        assert_eq!(request.url.query(), Some("sort=asc&limit=10"));
    }

    #[test]
    fn test_with_query_empty_params_leaves_url_untouched() {
        let empty: [(&str, &str); 0] = [];
        let request = PendingRequest::new(Method::GET, "http://localhost", "/items")
            .unwrap()
            .with_query(&empty)
            .unwrap();

        assert_eq!(request.url.as_str(), "http://localhost/items");
    }

    #[test]
    fn test_with_query_rejects_scalar_params() {
        let result = PendingRequest::new(Method::GET, "http://localhost", "/items")
            .unwrap()
            .with_query(&5);

        assert_matches!(result, Err(RequestError::QueryEncoding(_)));
    }

    #[test]
    fn test_with_json_sets_body_and_content_type() {
        let request = PendingRequest::new(Method::PATCH, "http://localhost", "/items/1")
            .unwrap()
            .with_json(&serde_json::json!({"name": "widget"}))
            .unwrap();

        assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(request.body.as_deref(), Some(br#"{"name":"widget"}"#.as_slice()));
    }

    #[test]
    fn test_with_json_surfaces_serialization_failure() {
        let result = PendingRequest::new(Method::PUT, "http://localhost", "/items/1")
            .unwrap()
            .with_json(&Unserializable);

        assert_matches!(result, Err(RequestError::BodyEncoding(_)));
    }

    #[test]
    fn test_header_replaces_existing_value() {
        let request = PendingRequest::new(Method::GET, "http://localhost", "/items")
            .unwrap()
            .header("x-trace", "one")
            .unwrap()
            .header("x-trace", "two")
            .unwrap();

        let values: Vec<_> = request.headers.get_all("x-trace").iter().collect();
        assert_eq!(values, vec!["two"]);
    }

    #[test]
    fn test_header_rejects_invalid_name() {
        let result = PendingRequest::new(Method::GET, "http://localhost", "/items")
            .unwrap()
            .header("bad header", "value");

        assert_matches!(result, Err(RequestError::InvalidHeaderName(_)));
    }
}
