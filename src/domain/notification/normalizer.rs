//! Notification normalizer: platform payload in, canonical event out.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::foundation::{Platform, Timestamp};
use crate::domain::lifecycle::LifecycleEvent;
use crate::ports::SignatureVerifier;

use super::{apple, google, ParseError};

/// Inbound notification as delivered by the transport layer.
#[derive(Debug, Clone)]
pub struct InboundNotification {
    pub platform: Platform,
    pub raw_payload: Value,
    pub received_at: Timestamp,
}

/// Application identity checks applied during decoding.
#[derive(Debug, Clone, Default)]
pub struct NormalizerSettings {
    pub google_package_name: Option<String>,
    pub apple_bundle_id: Option<String>,
}

/// Converts platform payloads into [`LifecycleEvent`]s.
///
/// Pure apart from the signature check, which is delegated to the verifier.
#[derive(Clone)]
pub struct NotificationNormalizer {
    verifier: Arc<dyn SignatureVerifier>,
    settings: NormalizerSettings,
}

impl NotificationNormalizer {
    pub fn new(verifier: Arc<dyn SignatureVerifier>, settings: NormalizerSettings) -> Self {
        Self { verifier, settings }
    }

    pub fn normalize(&self, inbound: &InboundNotification) -> Result<LifecycleEvent, ParseError> {
        let fields = match inbound.platform {
            Platform::GooglePlay => google::decode(
                &inbound.raw_payload,
                inbound.received_at,
                self.settings.google_package_name.as_deref(),
            )?,
            Platform::AppStore => apple::decode(
                &inbound.raw_payload,
                inbound.received_at,
                self.settings.apple_bundle_id.as_deref(),
                self.verifier.as_ref(),
            )?,
        };
        Ok(LifecycleEvent::new(fields)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::EventKind;
    use crate::domain::notification::apple::test_support::{signed_notification, transaction_info};
    use crate::domain::notification::google::test_support::{
        push_envelope, subscription_notification,
    };
    use crate::domain::notification::jws::test_support::FixedSignatureVerifier;

    fn normalizer() -> NotificationNormalizer {
        NotificationNormalizer::new(Arc::new(FixedSignatureVerifier), NormalizerSettings::default())
    }

    #[test]
    fn routes_by_platform() {
        let google = InboundNotification {
            platform: Platform::GooglePlay,
            raw_payload: push_envelope("m-1", &subscription_notification(13, "tok")),
            received_at: Timestamp::now(),
        };
        let event = normalizer().normalize(&google).unwrap();
        assert_eq!(event.platform(), Platform::GooglePlay);
        assert_eq!(event.kind(), EventKind::Expiration);

        let apple = InboundNotification {
            platform: Platform::AppStore,
            raw_payload: signed_notification(
                "EXPIRED",
                None,
                "u-1",
                &transaction_info("o-1", "t-1"),
                "valid",
            ),
            received_at: Timestamp::now(),
        };
        let event = normalizer().normalize(&apple).unwrap();
        assert_eq!(event.platform(), Platform::AppStore);
        assert_eq!(event.kind(), EventKind::Expiration);
    }

    #[test]
    fn payload_for_wrong_platform_fails_to_parse() {
        let inbound = InboundNotification {
            platform: Platform::AppStore,
            raw_payload: push_envelope("m-1", &subscription_notification(2, "tok")),
            received_at: Timestamp::now(),
        };
        assert!(normalizer().normalize(&inbound).is_err());
    }
}
