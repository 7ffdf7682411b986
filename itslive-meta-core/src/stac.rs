//! STAC item ingest: create, and on conflict optionally replace.
//!
//! ```text
//! Create ──201/200──▶ Created
//!   │ 409 && exists_ok        409 && !exists_ok ──▶ CatalogConflict (fatal)
//!   ▼                         other ──▶ CatalogRequestFailed (fatal)
//! Update ──2xx──▶ Created
//!   └─ other ──▶ CatalogRequestFailed (fatal)
//! ```
//!
//! Endpoint shape and credentials are validated before any request is sent.
//! No request is retried.

use serde_json::Value;
use tracing::{info, warn};

use crate::contract::{CatalogResponse, CatalogTransport};
use crate::error::{PublishError, Result};

/// Environment variable holding the catalog API key.
pub const STAC_API_TOKEN_ENV: &str = "STAC_API_TOKEN";

/// HTTP status the catalog uses for "item already exists".
pub const CONFLICT_STATUS: u16 = 409;

/// Classification of a single catalog reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOutcome {
    /// The item is now present and current.
    Created,
    /// An item with the same id already exists.
    Conflict,
    /// Any other non-success reply.
    Failed { status: u16, body: String },
}

impl From<CatalogResponse> for CatalogOutcome {
    fn from(response: CatalogResponse) -> Self {
        match response.status {
            200..=299 => CatalogOutcome::Created,
            CONFLICT_STATUS => CatalogOutcome::Conflict,
            status => CatalogOutcome::Failed {
                status,
                body: response.body,
            },
        }
    }
}

/// Strips a trailing slash and checks the endpoint ends in `/items`.
pub fn ensure_items_endpoint(endpoint: &str) -> Result<String> {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.ends_with("/items") {
        Ok(trimmed.to_string())
    } else {
        Err(PublishError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
        })
    }
}

/// Reads the catalog API key from [`STAC_API_TOKEN_ENV`].
pub fn api_token_from_env() -> Option<String> {
    std::env::var(STAC_API_TOKEN_ENV)
        .ok()
        .filter(|token| !token.is_empty())
}

/// The item's catalog key.
pub fn item_id(item: &Value) -> Result<&str> {
    item.get("id").and_then(Value::as_str).ok_or_else(|| {
        PublishError::InvalidArgument("STAC item has no string `id` field".to_string())
    })
}

/// Adds `item` to the collection behind `items_endpoint`.
///
/// With `exists_ok`, a 409 on create is followed by a single `PUT
/// <endpoint>/<id>`. Success in either step yields [`CatalogOutcome::Created`].
pub async fn upsert<T>(
    transport: &T,
    item: &Value,
    items_endpoint: &str,
    api_token: Option<&str>,
    exists_ok: bool,
) -> Result<CatalogOutcome>
where
    T: CatalogTransport + ?Sized,
{
    let endpoint = ensure_items_endpoint(items_endpoint)?;
    let api_token = api_token.ok_or(PublishError::MissingCredentials {
        variable: STAC_API_TOKEN_ENV,
    })?;
    let id = item_id(item)?;

    info!(item_id = id, endpoint = %endpoint, "Adding STAC item");
    let created = transport
        .create_item(&endpoint, api_token, item)
        .await
        .map_err(|source| PublishError::CatalogUnreachable {
            url: endpoint.clone(),
            source,
        })?;

    match (CatalogOutcome::from(created), exists_ok) {
        (CatalogOutcome::Created, _) => Ok(CatalogOutcome::Created),
        (CatalogOutcome::Conflict, true) => {
            let item_url = format!("{endpoint}/{id}");
            info!(item_id = id, url = %item_url, "STAC item exists, updating");
            let updated = transport
                .update_item(&item_url, api_token, item)
                .await
                .map_err(|source| PublishError::CatalogUnreachable {
                    url: item_url.clone(),
                    source,
                })?;
            match CatalogOutcome::from(updated) {
                CatalogOutcome::Created => Ok(CatalogOutcome::Created),
                CatalogOutcome::Conflict => Err(PublishError::CatalogRequestFailed {
                    url: item_url,
                    status: CONFLICT_STATUS,
                    body: String::new(),
                }),
                CatalogOutcome::Failed { status, body } => {
                    Err(PublishError::CatalogRequestFailed {
                        url: item_url,
                        status,
                        body,
                    })
                }
            }
        }
        (CatalogOutcome::Conflict, false) => {
            warn!(item_id = id, endpoint = %endpoint, "STAC item already exists and updates are not allowed");
            Err(PublishError::CatalogConflict {
                item_id: id.to_string(),
                endpoint,
            })
        }
        (CatalogOutcome::Failed { status, body }, _) => Err(PublishError::CatalogRequestFailed {
            url: endpoint,
            status,
            body,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_must_end_in_items() {
        assert_eq!(
            ensure_items_endpoint("https://cat.example/collections/c/items/").unwrap(),
            "https://cat.example/collections/c/items"
        );
        assert!(matches!(
            ensure_items_endpoint("https://cat.example/collections/c"),
            Err(PublishError::InvalidEndpoint { .. })
        ));
        assert!(ensure_items_endpoint("https://cat.example/collections/c/itemsx").is_err());
    }

    #[test]
    fn responses_are_classified_by_status() {
        let resp = |status| CatalogResponse {
            status,
            body: "b".into(),
        };
        assert_eq!(CatalogOutcome::from(resp(201)), CatalogOutcome::Created);
        assert_eq!(CatalogOutcome::from(resp(200)), CatalogOutcome::Created);
        assert_eq!(CatalogOutcome::from(resp(409)), CatalogOutcome::Conflict);
        assert_eq!(
            CatalogOutcome::from(resp(500)),
            CatalogOutcome::Failed {
                status: 500,
                body: "b".into()
            }
        );
    }

    #[test]
    fn item_id_requires_string() {
        assert_eq!(item_id(&serde_json::json!({"id": "G1"})).unwrap(), "G1");
        assert!(item_id(&serde_json::json!({"id": 3})).is_err());
    }
}
