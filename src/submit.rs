use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use mockall::automock;
use tracing::{debug, info, instrument, warn};

use crate::{command, config::WalletConfig, payload::OutboundPayload, Error, InternalResult};

/// Hands a built offer to the chain on behalf of `from`.
#[automock]
#[async_trait]
pub trait OfferSubmitter: Send + Sync {
    async fn submit(&self, payload: &OutboundPayload, from: &str) -> InternalResult<String>;
}

/// Submits through `agoric wallet send`, staging the offer in a file.
#[derive(Debug, Clone)]
pub struct WalletSend {
    bin: String,
    home: String,
    keyring_backend: String,
    offer_file: PathBuf,
    timeout: Duration,
}

impl WalletSend {
    pub fn from_config(config: &WalletConfig) -> Self {
        Self {
            bin: config.agoric_bin.clone(),
            home: config.home_dir(),
            keyring_backend: config.keyring_backend.clone(),
            offer_file: PathBuf::from(&config.offer_file),
            timeout: config.command_timeout,
        }
    }

    pub fn args(&self, from: &str) -> Vec<String> {
        vec![
            "wallet".to_string(),
            "send".to_string(),
            "--home".to_string(),
            self.home.clone(),
            "--keyring-backend".to_string(),
            self.keyring_backend.clone(),
            "--from".to_string(),
            from.to_string(),
            "--offer".to_string(),
            self.offer_file.to_string_lossy().into_owned(),
        ]
    }

    pub async fn write_offer(&self, payload: &OutboundPayload) -> InternalResult<()> {
        let wire = payload.to_wire()?;
        tokio::fs::write(&self.offer_file, wire).await?;
        debug!("offer written to {}", self.offer_file.display());
        Ok(())
    }

    async fn remove_offer(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.offer_file).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.offer_file.display(), e);
            }
        }
    }
}

#[async_trait]
impl OfferSubmitter for WalletSend {
    #[instrument(level = "debug", skip(self, payload))]
    async fn submit(&self, payload: &OutboundPayload, from: &str) -> InternalResult<String> {
        let result = match self.write_offer(payload).await {
            Ok(()) => command::run(&self.bin, &self.args(from), self.timeout)
                .await
                .map(|output| output.combined())
                .map_err(|e| Error::Submit(e.to_string())),
            Err(e) => Err(e),
        };

        self.remove_offer().await;

        if result.is_ok() {
            info!("offer submitted from {}", from);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codec::parse_reference, correlate::Resolution, payload::PayloadBuilder, record::CapData};
    use pretty_assertions::assert_eq;

    fn payload() -> OutboundPayload {
        let resolution = Resolution {
            id: "board0074".to_string(),
            token: parse_reference("$0.Alleged: instance").unwrap(),
        };
        PayloadBuilder::new().build(&resolution, "makeOffer", &[])
    }

    fn submitter(dir: &tempfile::TempDir, bin: &str) -> WalletSend {
        let mut config = WalletConfig::default().with_overrides(None, Some("agoriclocal".to_string()));
        config.agoric_bin = bin.to_string();
        config.offer_file = dir.path().join("offer.json").to_string_lossy().into_owned();
        config.command_timeout = Duration::from_secs(5);
        WalletSend::from_config(&config)
    }

    #[test]
    fn test_args() {
        let dir = tempfile::tempdir().unwrap();
        let send = submitter(&dir, "agoric");
        let offer = dir.path().join("offer.json").to_string_lossy().into_owned();

        assert_eq!(
            send.args("agoric1sender"),
            vec![
                "wallet".to_string(),
                "send".to_string(),
                "--home".to_string(),
                "/state/agoriclocal".to_string(),
                "--keyring-backend".to_string(),
                "test".to_string(),
                "--from".to_string(),
                "agoric1sender".to_string(),
                "--offer".to_string(),
                offer,
            ]
        );
    }

    #[tokio::test]
    async fn test_write_offer() {
        let dir = tempfile::tempdir().unwrap();
        let send = submitter(&dir, "agoric");
        let payload = payload();

        send.write_offer(&payload).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("offer.json")).unwrap();
        let cap_data: CapData = serde_json::from_str(&written).unwrap();
        assert_eq!(cap_data, payload.to_cap_data());
    }

    #[tokio::test]
    async fn test_submit_runs_command_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let send = submitter(&dir, "echo");

        let output = send.submit(&payload(), "agoric1sender").await.unwrap();

        assert!(output.starts_with("wallet send --home /state/agoriclocal"));
        assert!(output.contains("--from agoric1sender"));
        assert!(!dir.path().join("offer.json").exists());
    }

    #[tokio::test]
    async fn test_submit_failure_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let send = submitter(&dir, "false");

        assert!(matches!(
            send.submit(&payload(), "agoric1sender").await,
            Err(Error::Submit(_))
        ));
        assert!(!dir.path().join("offer.json").exists());
    }
}
