use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};

use crate::{
    command,
    config::{QueryMode, WalletConfig},
    record::CapData,
    transport, Error, InternalResult,
};

pub const VSTORAGE_DATA_PATH: &str = "/custom/vstorage/data";

/// Fetches the records published under a vstorage path.
#[automock]
#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn fetch_records(&self, path: &str) -> InternalResult<Vec<CapData>>;
}

/// Queries through the `agd` binary.
#[derive(Debug, Clone)]
pub struct AgdQuery {
    bin: String,
    chain_id: String,
    home: String,
    node: String,
    timeout: Duration,
}

impl AgdQuery {
    pub fn from_config(config: &WalletConfig) -> Self {
        Self {
            bin: config.agd_bin.clone(),
            chain_id: config.chain_id.clone(),
            home: config.home_dir(),
            node: config.rpc_url.clone(),
            timeout: config.command_timeout,
        }
    }

    pub fn args(&self, path: &str) -> Vec<String> {
        [
            "query",
            "vstorage",
            "data",
            path,
            "--chain-id",
            self.chain_id.as_str(),
            "--home",
            self.home.as_str(),
            "--node",
            self.node.as_str(),
            "--output",
            "json",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
    }
}

#[async_trait]
impl QuerySource for AgdQuery {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_records(&self, path: &str) -> InternalResult<Vec<CapData>> {
        let output = command::run(&self.bin, &self.args(path), self.timeout)
            .await
            .map_err(|e| Error::Query(e.to_string()))?;
        transport::records_from_cli(&output.combined())
    }
}

/// Queries the node's `abci_query` endpoint directly.
#[derive(Debug, Clone)]
pub struct RpcQuery {
    client: Client,
    rpc_url: String,
}

impl RpcQuery {
    pub fn from_config(config: &WalletConfig) -> InternalResult<Self> {
        let client = Client::builder()
            .timeout(config.command_timeout)
            .build()
            .map_err(|e| Error::Query(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            rpc_url: config.rpc_url.trim_end_matches('/').to_string(),
        })
    }

    fn query_path(path: &str) -> String {
        format!("\"{}/{}\"", VSTORAGE_DATA_PATH, path)
    }
}

#[async_trait]
impl QuerySource for RpcQuery {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_records(&self, path: &str) -> InternalResult<Vec<CapData>> {
        let url = format!("{}/abci_query", self.rpc_url);
        let response = self
            .client
            .get(&url)
            .query(&[("path", Self::query_path(path))])
            .send()
            .await
            .map_err(|e| Error::Query(format!("Request to {} failed: {}", url, e)))?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| Error::Query(format!("Failed to read response: {}", e)))?;
                debug!("abci_query returned {} bytes", body.len());
                transport::records_from_abci(&body)
            }
            status => Err(Error::Query(format!("RPC error: {}", status))),
        }
    }
}

/// Picks the query collaborator named by the config.
pub fn from_config(config: &WalletConfig) -> InternalResult<Box<dyn QuerySource>> {
    info!("using {} query", config.query_mode);
    Ok(match config.query_mode {
        QueryMode::Cli => Box::new(AgdQuery::from_config(config)),
        QueryMode::Rpc => Box::new(RpcQuery::from_config(config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config(rpc_url: &str) -> WalletConfig {
        WalletConfig {
            rpc_url: rpc_url.to_string(),
            command_timeout: Duration::from_secs(5),
            ..WalletConfig::default()
        }
        .with_overrides(None, Some("agoriclocal".to_string()))
    }

    fn published() -> String {
        let cell = json!({
            "blockHeight": "12",
            "values": [json!({
                "body": r##"#[["treasury","$0.Alleged: instance"]]"##,
                "slots": ["board0074"],
            }).to_string()],
        });
        json!({ "value": cell.to_string() }).to_string()
    }

    #[test]
    fn test_agd_args() {
        let query = AgdQuery::from_config(&config("http://localhost:26657"));
        assert_eq!(
            query.args("published.agoricNames.instance"),
            vec![
                "query",
                "vstorage",
                "data",
                "published.agoricNames.instance",
                "--chain-id",
                "agoriclocal",
                "--home",
                "/state/agoriclocal",
                "--node",
                "http://localhost:26657",
                "--output",
                "json",
            ]
        );
    }

    #[tokio::test]
    async fn test_agd_query_failure() {
        let mut config = config("http://localhost:26657");
        config.agd_bin = "definitely-not-agd".to_string();

        assert!(matches!(
            AgdQuery::from_config(&config).fetch_records("x").await,
            Err(Error::Query(_))
        ));
    }

    #[tokio::test]
    async fn test_rpc_query() {
        let mut server = mockito::Server::new_async().await;
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": -1,
            "result": { "response": { "code": 0, "value": STANDARD.encode(published()) } }
        });

        let mock = server
            .mock("GET", "/abci_query")
            .match_query(Matcher::UrlEncoded(
                "path".into(),
                "\"/custom/vstorage/data/published.agoricNames.instance\"".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(envelope.to_string())
            .create_async()
            .await;

        let query = RpcQuery::from_config(&config(&server.url())).unwrap();
        let records = query
            .fetch_records("published.agoricNames.instance")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(records[0].slots, vec!["board0074"]);
    }

    #[tokio::test]
    async fn test_rpc_query_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/abci_query")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let query = RpcQuery::from_config(&config(&server.url())).unwrap();
        assert!(matches!(
            query.fetch_records("published.agoricNames.instance").await,
            Err(Error::Query(_))
        ));
    }

    #[test]
    fn test_from_config_selects_mode() {
        let mut config = config("http://localhost:26657");
        assert!(from_config(&config).is_ok());
        config.query_mode = QueryMode::Rpc;
        assert!(from_config(&config).is_ok());
    }
}
