use tracing::{info, instrument};

use crate::{
    config::WalletConfig,
    correlate::resolve_in,
    error::MarshalResult,
    payload::{OutboundPayload, PayloadBuilder},
    query::{self, QuerySource},
    record::CapData,
    submit::{OfferSubmitter, WalletSend},
    transport::decode_records,
    value::Value,
    InternalResult,
};

/// What the caller wants executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferRequest {
    /// Name of the contract instance as published.
    pub instance: String,
    pub public_invitation_maker: String,
    pub args: Vec<String>,
    /// Wallet address the offer is sent from.
    pub from: String,
}

impl OfferRequest {
    pub fn offer_args(&self) -> Vec<Value> {
        self.args.iter().map(|arg| Value::string(arg.as_str())).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub payload: OutboundPayload,
    pub output: String,
}

/// Decode → correlate → build over already fetched records.
///
/// Nothing is returned unless every stage succeeds.
pub fn prepare_offer(
    raw: &[CapData],
    instance: &str,
    public_invitation_maker: &str,
    offer_args: &[Value],
    builder: &PayloadBuilder,
) -> MarshalResult<OutboundPayload> {
    let records = decode_records(raw)?;
    let resolution = resolve_in(&records, instance)?;
    Ok(builder.build(&resolution, public_invitation_maker, offer_args))
}

pub struct WalletAction {
    query: Box<dyn QuerySource>,
    submitter: Box<dyn OfferSubmitter>,
    builder: PayloadBuilder,
    instance_path: String,
}

impl WalletAction {
    pub fn new(
        query: Box<dyn QuerySource>,
        submitter: Box<dyn OfferSubmitter>,
        builder: PayloadBuilder,
        instance_path: impl Into<String>,
    ) -> Self {
        Self {
            query,
            submitter,
            builder,
            instance_path: instance_path.into(),
        }
    }

    pub fn from_config(config: &WalletConfig) -> InternalResult<Self> {
        config.validate()?;
        Ok(Self::new(
            query::from_config(config)?,
            Box::new(WalletSend::from_config(config)),
            PayloadBuilder::new().with_offer_id_prefix(config.offer_id_prefix.as_str()),
            config.instance_path.as_str(),
        ))
    }

    /// Fetches the published instances and builds the offer without sending it.
    #[instrument(level = "debug", skip(self), fields(instance = %request.instance))]
    pub async fn prepare(&self, request: &OfferRequest) -> InternalResult<OutboundPayload> {
        let raw = self.query.fetch_records(&self.instance_path).await?;
        info!("fetched {} records from {}", raw.len(), self.instance_path);

        let payload = prepare_offer(
            &raw,
            &request.instance,
            &request.public_invitation_maker,
            &request.offer_args(),
            &self.builder,
        )?;
        info!(
            "resolved {} to {}",
            request.instance,
            payload.identifiers.join(",")
        );
        Ok(payload)
    }

    pub async fn execute(&self, request: &OfferRequest) -> InternalResult<Submission> {
        let payload = self.prepare(request).await?;
        let output = self.submitter.submit(&payload, &request.from).await?;
        Ok(Submission { payload, output })
    }
}
