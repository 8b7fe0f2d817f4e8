// Operation descriptors: verb + path segments + optional query and UUID.
//
// Built either with the typed builder or parsed from a symbolic name such as
// `patch_tss_<id>_admin?foo=1`.

use std::str::FromStr;

use strum::{AsRefStr, Display, EnumString};
use url::Url;
use uuid::Uuid;

use crate::error::Error;

/// Authentication resource.
pub const AUTH: &str = "auth";
/// Device (TSS) collection.
pub const TSS: &str = "tss";
/// Admin sub-resource of a TSS.
pub const ADMIN: &str = "admin";
/// Admin authentication sub-resource of a TSS.
pub const ADMIN_AUTH: &str = "admin_auth";

/// HTTP verbs accepted by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn method(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One request against the service, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    verb: Verb,
    segments: Vec<String>,
    query: Option<String>,
    inject_uuid: bool,
}

impl Operation {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            segments: Vec::new(),
            query: None,
            inject_uuid: false,
        }
    }

    pub fn get() -> Self {
        Self::new(Verb::Get)
    }

    pub fn post() -> Self {
        Self::new(Verb::Post)
    }

    pub fn put() -> Self {
        Self::new(Verb::Put)
    }

    pub fn patch() -> Self {
        Self::new(Verb::Patch)
    }

    pub fn delete() -> Self {
        Self::new(Verb::Delete)
    }

    /// `POST auth`
    pub fn auth() -> Self {
        Self::post().segment(AUTH)
    }

    /// Append one path segment.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Set the query string. A leading `?` is dropped; an empty string clears it.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        let query = query.strip_prefix('?').unwrap_or(&query);
        self.query = (!query.is_empty()).then(|| query.to_owned());
        self
    }

    /// Append a fresh v4 UUID as the last path segment when sent.
    pub fn with_uuid(mut self, inject: bool) -> Self {
        self.inject_uuid = inject;
        self
    }

    /// Parse a symbolic name: `<verb>_<seg1>_<seg2>...[?query]`.
    ///
    /// Verb and segments are case-insensitive (normalized to lowercase); the
    /// query string is kept verbatim.
    pub fn parse(name: &str) -> Result<Self, Error> {
        let (head, query) = match name.split_once('?') {
            Some((head, query)) => (head, Some(query)),
            None => (name, None),
        };
        let head = head.to_lowercase();
        let mut parts = head.split('_');

        let verb = parts
            .next()
            .and_then(|v| Verb::from_str(v).ok())
            .ok_or_else(|| Error::UnsupportedOperation {
                name: name.to_owned(),
            })?;

        let mut op = Self::new(verb);
        op.segments = parts
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        op.query = query.filter(|q| !q.is_empty()).map(str::to_owned);
        Ok(op)
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn injects_uuid(&self) -> bool {
        self.inject_uuid
    }

    /// Requested path, without any injected UUID or query.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    pub fn is_auth(&self) -> bool {
        self.verb == Verb::Post && self.segments.len() == 1 && self.segments[0] == AUTH
    }

    /// Absolute URL under `base`, generating the UUID segment if requested.
    ///
    /// Each segment is percent-encoded as a single path segment, so `/`, `?`
    /// and `#` inside a segment never leave the base path; `.` and `..` are
    /// skipped.
    pub fn url(&self, base: &Url) -> Result<Url, Error> {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            path.pop_if_empty().extend(&self.segments);
            if self.inject_uuid {
                path.push(&Uuid::new_v4().to_string());
            }
        }
        url.set_query(self.query.as_deref());
        Ok(url)
    }
}
