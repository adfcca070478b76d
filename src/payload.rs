use std::convert::Infallible;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::{
    codec::{self, EncodedToken, LITERAL_MARKER},
    correlate::Resolution,
    error::{MarshalError, MarshalResult},
    record::{CapData, CapabilityId},
    value::{walk, Value},
};

pub const EXECUTE_OFFER: &str = "executeOffer";
pub const CONTRACT_SOURCE: &str = "contract";
pub const DEFAULT_OFFER_ID_PREFIX: &str = "wa-";

/// Action description referencing exactly one capability.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPayload {
    pub action: Value,
    pub identifiers: Vec<CapabilityId>,
}

impl OutboundPayload {
    /// The action in literal form: string leaves run through
    /// [`codec::encode_leaf`], the whole tree behind the literal marker.
    pub fn body(&self) -> String {
        let encoded = match walk(self.action.clone(), &mut |leaf: String| {
            Ok::<_, Infallible>(Value::String(codec::encode_leaf(leaf)))
        }) {
            Ok(encoded) => encoded,
            Err(never) => match never {},
        };
        codec::encode(&encoded)
    }

    pub fn to_cap_data(&self) -> CapData {
        CapData::new(self.body(), self.identifiers.clone())
    }

    /// JSON text handed to the submission collaborator.
    pub fn to_wire(&self) -> MarshalResult<String> {
        let cap_data = self.to_cap_data();
        serde_json::to_string(&cap_data).map_err(|e| MarshalError::encoding(cap_data.body, e))
    }
}

/// Decodes an encoded action body and every literal leaf inside it.
pub fn decode_action(cap_data: &CapData) -> MarshalResult<Value> {
    let literal = match EncodedToken::classify(&cap_data.body) {
        EncodedToken::Literal(_) => codec::decode(&cap_data.body)?,
        _ => {
            return Err(MarshalError::encoding(
                cap_data.body.as_str(),
                format!("action body must start with {:?}", LITERAL_MARKER),
            ))
        }
    };
    walk(literal, &mut |leaf: String| codec::decode(&leaf))
}

/// Builds `executeOffer` actions for a public invitation maker.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    offer_id_prefix: String,
    clock: fn() -> DateTime<Utc>,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self {
            offer_id_prefix: DEFAULT_OFFER_ID_PREFIX.to_string(),
            clock: Utc::now,
        }
    }
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offer_id_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.offer_id_prefix = prefix.into();
        self
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn offer_id(&self) -> String {
        format!(
            "{}{}",
            self.offer_id_prefix,
            (self.clock)().timestamp_millis()
        )
    }

    #[instrument(level = "debug", skip(self, resolution, offer_args), fields(id = %resolution.id))]
    pub fn build(
        &self,
        resolution: &Resolution,
        public_invitation_maker: &str,
        offer_args: &[Value],
    ) -> OutboundPayload {
        let invitation_args = offer_args
            .iter()
            .map(|arg| Value::String(codec::encode(arg)))
            .collect();

        let invitation_spec = Value::Mapping(vec![
            (
                "instance".to_string(),
                Value::String(resolution.rewritten_token()),
            ),
            (
                "invitationArgs".to_string(),
                Value::Sequence(invitation_args),
            ),
            (
                "publicInvitationMaker".to_string(),
                Value::string(public_invitation_maker),
            ),
            ("source".to_string(), Value::string(CONTRACT_SOURCE)),
        ]);

        let offer = Value::Mapping(vec![
            ("id".to_string(), Value::String(self.offer_id())),
            ("invitationSpec".to_string(), invitation_spec),
            ("proposal".to_string(), Value::Mapping(vec![])),
        ]);

        let action = Value::Mapping(vec![
            ("method".to_string(), Value::string(EXECUTE_OFFER)),
            ("offer".to_string(), offer),
        ]);

        debug!("built {} offer with {} args", public_invitation_maker, offer_args.len());

        OutboundPayload {
            action,
            identifiers: vec![resolution.id.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_reference;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
    }

    fn resolution() -> Resolution {
        Resolution {
            id: "treasury_slot".to_string(),
            token: parse_reference("$0.Alleged: instance").unwrap(),
        }
    }

    fn args() -> Vec<Value> {
        vec![Value::from("x"), Value::from("y")]
    }

    #[test]
    fn test_build_payload() {
        let payload = PayloadBuilder::new()
            .with_clock(fixed_clock)
            .build(&resolution(), "makeOffer", &args());

        assert_eq!(payload.identifiers, vec!["treasury_slot".to_string()]);
        assert_eq!(
            payload.body(),
            concat!(
                r##"#{"method":"executeOffer","offer":{"id":"wa-1700000000123","##,
                r##""invitationSpec":{"instance":"$0.Alleged: instance","##,
                r##""invitationArgs":["#\"x\"","#\"y\""],"##,
                r##""publicInvitationMaker":"makeOffer","source":"contract"},"##,
                r##""proposal":{}}}"##
            )
        );
    }

    #[test]
    fn test_offer_id_prefix() {
        let builder = PayloadBuilder::new()
            .with_offer_id_prefix("offer-")
            .with_clock(fixed_clock);
        assert_eq!(builder.offer_id(), "offer-1700000000123");
    }

    #[test]
    fn test_default_prefix_matches_config() {
        let config = crate::config::WalletConfig::default();
        let builder = PayloadBuilder::default().with_clock(fixed_clock);
        assert_eq!(
            builder.offer_id(),
            format!("{}1700000000123", config.offer_id_prefix)
        );
        assert_eq!(builder.offer_id(), "wa-1700000000123");
    }

    #[test]
    fn test_to_wire() {
        let payload = PayloadBuilder::new()
            .with_clock(fixed_clock)
            .build(&resolution(), "makeOffer", &[]);
        let wire: CapData = serde_json::from_str(&payload.to_wire().unwrap()).unwrap();

        assert_eq!(wire.slots, vec!["treasury_slot".to_string()]);
        assert_eq!(wire.body, payload.body());
    }

    #[test]
    fn test_decode_action_round_trip() {
        let payload = PayloadBuilder::new()
            .with_clock(fixed_clock)
            .build(&resolution(), "makeOffer", &[Value::from("x"), Value::from(7)]);

        let action = decode_action(&payload.to_cap_data()).unwrap();
        let spec = action
            .get("offer")
            .and_then(|offer| offer.get("invitationSpec"))
            .unwrap();

        assert_eq!(spec.get("instance"), Some(&Value::from("$0.Alleged: instance")));
        assert_eq!(
            spec.get("invitationArgs"),
            Some(&Value::Sequence(vec![Value::from("x"), Value::from(7)]))
        );
        assert_eq!(action.get("method"), Some(&Value::from(EXECUTE_OFFER)));
    }

    #[test]
    fn test_decode_action_requires_literal_body() {
        let cap_data = CapData::new("{}", vec![]);
        assert!(matches!(
            decode_action(&cap_data),
            Err(MarshalError::Encoding { .. })
        ));
    }
}
