//! GraphQL wire format.
//!
//! Request: `{"query": FIND_VERSION_QUERY, "variables": {"slug": ...}}`
//!
//! Response: `{"data": {"findVersion": {"latestVersion", "software": {"slug",
//! "name"}} | null}}`. A null `findVersion` is a clean "not found"; anything
//! that does not fit this shape is a [`LookupError::Decode`].

use serde::{Deserialize, Serialize};

use crate::{LookupError, LookupResult, Release};

/// The `FindVersion` query document.
pub const FIND_VERSION_QUERY: &str = "
query FindVersion($slug: String!) {
	findVersion(slug: $slug) {
		latestVersion
		software {
			slug
			name
		}
	}
}
";

/// Request body for one GraphQL operation.
#[derive(Debug, Serialize)]
pub struct Operation<'a> {
    /// Query document.
    pub query: &'static str,
    /// Query variables.
    pub variables: Variables<'a>,
}

impl<'a> Operation<'a> {
    /// Build the `FindVersion` operation for `slug`.
    pub fn find_version(slug: &'a str) -> Self {
        Self { query: FIND_VERSION_QUERY, variables: Variables { slug } }
    }
}

/// Variables of the `FindVersion` operation.
#[derive(Debug, Serialize)]
pub struct Variables<'a> {
    /// Software slug as typed by the user.
    pub slug: &'a str,
}

#[derive(Debug, Deserialize)]
struct FindVersionResponse {
    #[serde(default)]
    data: Option<Data>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct Data {
    #[serde(rename = "findVersion", default)]
    find_version: Option<FindVersion>,
}

#[derive(Debug, Deserialize)]
struct FindVersion {
    #[serde(rename = "latestVersion")]
    latest_version: String,
    software: Software,
}

#[derive(Debug, Deserialize)]
struct Software {
    slug: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Decode a response body into a lookup outcome.
pub fn decode_response(body: &[u8]) -> LookupResult {
    let response: FindVersionResponse =
        serde_json::from_slice(body).map_err(|e| LookupError::Decode(e.to_string()))?;

    match response.data {
        Some(Data { find_version: Some(found) }) => Ok(Some(Release {
            slug: found.software.slug,
            name: found.software.name,
            version: found.latest_version,
        })),
        Some(Data { find_version: None }) => Ok(None),
        None => match response.errors.and_then(|errors| errors.into_iter().next()) {
            Some(error) => Err(LookupError::Graphql(error.message)),
            None => Err(LookupError::Decode("response has no data".into())),
        },
    }
}
