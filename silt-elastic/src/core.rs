use serde_json::Value;
use silt_config::shared::EsConnectionConfig;
use tracing::debug;

use silt::destination::{BulkResponse, Destination};
use silt::error::SiltResult;
use silt::types::Action;

use crate::client::EsClient;
use crate::encoding::encode_bulk_body;

/// Elasticsearch [`Destination`] over the HTTP bulk protocol.
#[derive(Debug, Clone)]
pub struct EsDestination {
    client: EsClient,
}

impl EsDestination {
    pub fn new(config: &EsConnectionConfig) -> Self {
        Self {
            client: EsClient::new(config),
        }
    }
}

impl Destination for EsDestination {
    fn name() -> &'static str {
        "elasticsearch"
    }

    async fn bulk(&self, actions: Vec<Action>) -> SiltResult<BulkResponse> {
        debug!(actions = actions.len(), "submitting bulk request");
        let body = encode_bulk_body(&actions);
        self.client.bulk(body).await
    }

    async fn index_exists(&self, index: &str) -> SiltResult<bool> {
        self.client.index_exists(index).await
    }

    async fn create_index(&self, index: &str, settings: Value) -> SiltResult<()> {
        self.client.create_index(index, settings).await
    }
}
