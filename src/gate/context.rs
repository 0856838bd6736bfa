//! Per-request inputs to the decision.

use super::ip::SourceValues;

/// Names of the query parameters present on a request.
///
/// Only presence matters to the gate. Names are decoded the way
/// `application/x-www-form-urlencoded` is (`+` is a space, `%XX` escapes
/// are UTF-8), and a parameter written without `=` (`?secret`) is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    names: Vec<String>,
}

impl QueryParams {
    /// Decode the parameter names of a raw query string.
    pub fn parse(query: Option<&str>) -> Self {
        let names = form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .map(|(name, _)| name.into_owned())
            .filter(|name| !name.is_empty())
            .collect();

        Self { names }
    }

    /// Whether a parameter with this name occurs at all.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|key| key == name)
    }
}

/// Everything the gate needs to know about one request.
///
/// Built fresh per request by the host adapter and read-only to the core.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_sources: SourceValues,
    pub query_params: QueryParams,
    pub is_admin_surface: bool,
    pub already_authorized: bool,
}

impl RequestContext {
    /// Context for an admin request with nothing else set.
    pub fn admin() -> Self {
        Self {
            is_admin_surface: true,
            ..Self::default()
        }
    }

    pub fn with_sources(mut self, sources: SourceValues) -> Self {
        self.ip_sources = sources;
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query_params = QueryParams::parse(Some(query));
        self
    }

    pub fn with_authorized(mut self, authorized: bool) -> Self {
        self.already_authorized = authorized;
        self
    }
}
