//! Google Play real-time developer notification decoding.
//!
//! Notifications arrive as Pub/Sub push envelopes whose `message.data` is a
//! base64-encoded `DeveloperNotification`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::domain::foundation::{Platform, Timestamp};
use crate::domain::lifecycle::{EventKind, NewLifecycleEvent};

use super::fields::{object, opt_i64, opt_millis, opt_str, req_str};
use super::ParseError;

/// Maps `subscriptionNotification.notificationType`.
pub fn subscription_kind(notification_type: i64) -> EventKind {
    match notification_type {
        1 | 2 => EventKind::Renewal, // RECOVERED, RENEWED
        3 => EventKind::Cancellation,
        4 => EventKind::Purchase,
        5 => EventKind::GracePeriodEnd, // ON_HOLD
        6 => EventKind::GracePeriodStart,
        7 => EventKind::Resume, // RESTARTED
        10 => EventKind::Pause,
        12 => EventKind::Refund, // REVOKED
        13 => EventKind::Expiration,
        _ => EventKind::Unknown,
    }
}

/// Maps `oneTimeProductNotification.notificationType`.
pub fn one_time_kind(notification_type: i64) -> EventKind {
    match notification_type {
        1 => EventKind::Purchase,
        2 => EventKind::Cancellation,
        _ => EventKind::Unknown,
    }
}

/// Decodes a Pub/Sub push body into event fields.
pub fn decode(
    raw: &Value,
    received_at: Timestamp,
    expected_package: Option<&str>,
) -> Result<NewLifecycleEvent, ParseError> {
    let envelope = object(raw, "envelope")?;
    let message = envelope
        .get("message")
        .ok_or_else(|| ParseError::missing("message"))
        .and_then(|m| object(m, "message"))?;

    let message_id = req_str(message, "messageId", "message.messageId")
        .or_else(|_| req_str(message, "message_id", "message.messageId"))?;
    let data = req_str(message, "data", "message.data")?;

    let decoded = STANDARD
        .decode(data)
        .map_err(|e| ParseError::InvalidBase64 {
            field: "message.data".to_string(),
            reason: e.to_string(),
        })?;
    let notification: Value =
        serde_json::from_slice(&decoded).map_err(|e| ParseError::InvalidJson {
            field: "message.data".to_string(),
            reason: e.to_string(),
        })?;
    let body = object(&notification, "message.data")?;

    let package_name = req_str(body, "packageName", "packageName")?;
    if let Some(expected) = expected_package {
        if expected != package_name {
            return Err(ParseError::ApplicationMismatch {
                expected: expected.to_string(),
                actual: package_name.to_string(),
            });
        }
    }

    let occurred_at = match opt_millis(body, "eventTimeMillis", "eventTimeMillis")? {
        Some(ts) => ts,
        None => opt_str(message, "publishTime")
            .and_then(Timestamp::parse_rfc3339)
            .ok_or_else(|| ParseError::missing("eventTimeMillis"))?,
    };

    let (kind, token, product_ref, transaction_ref, one_time) =
        if let Some(sub) = body.get("subscriptionNotification") {
            let sub = object(sub, "subscriptionNotification")?;
            let code_path = "subscriptionNotification.notificationType";
            let code = opt_i64(sub, "notificationType", code_path)?
                .ok_or_else(|| ParseError::missing(code_path))?;
            (
                subscription_kind(code),
                req_str(sub, "purchaseToken", "subscriptionNotification.purchaseToken")?,
                opt_str(sub, "subscriptionId"),
                None,
                false,
            )
        } else if let Some(one_time) = body.get("oneTimeProductNotification") {
            let one_time = object(one_time, "oneTimeProductNotification")?;
            let code_path = "oneTimeProductNotification.notificationType";
            let code = opt_i64(one_time, "notificationType", code_path)?
                .ok_or_else(|| ParseError::missing(code_path))?;
            (
                one_time_kind(code),
                req_str(one_time, "purchaseToken", "oneTimeProductNotification.purchaseToken")?,
                opt_str(one_time, "sku"),
                None,
                true,
            )
        } else if let Some(voided) = body.get("voidedPurchaseNotification") {
            let voided = object(voided, "voidedPurchaseNotification")?;
            (
                EventKind::Refund,
                req_str(voided, "purchaseToken", "voidedPurchaseNotification.purchaseToken")?,
                None,
                opt_str(voided, "orderId"),
                false,
            )
        } else if body.contains_key("testNotification") {
            (EventKind::Unknown, "test", None, None, false)
        } else {
            return Err(ParseError::InvalidEnvelope(
                "notification carries no known payload".to_string(),
            ));
        };

    Ok(NewLifecycleEvent {
        platform: Platform::GooglePlay,
        kind,
        entity_ref: token.to_string(),
        source_token: token.to_string(),
        platform_notification_id: message_id.to_string(),
        transaction_ref: transaction_ref.map(str::to_string),
        product_ref: product_ref.map(str::to_string),
        amount: None,
        expiry_at: None,
        one_time,
        payload: body.clone(),
        occurred_at,
        received_at,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::{push_envelope, subscription_notification};
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_subscription_renewal() {
        let raw = push_envelope("msg-1", &subscription_notification(2, "tok-1"));
        let event = decode(&raw, Timestamp::now(), Some("com.example.app")).unwrap();

        assert_eq!(event.kind, EventKind::Renewal);
        assert_eq!(event.source_token, "tok-1");
        assert_eq!(event.platform_notification_id, "msg-1");
        assert_eq!(event.product_ref.as_deref(), Some("plan.monthly"));
        assert_eq!(event.occurred_at.as_unix_millis(), 1_704_067_200_000);
        assert_eq!(event.payload["packageName"], "com.example.app");
    }

    #[test]
    fn notification_codes_map_to_kinds() {
        assert_eq!(subscription_kind(4), EventKind::Purchase);
        assert_eq!(subscription_kind(6), EventKind::GracePeriodStart);
        assert_eq!(subscription_kind(5), EventKind::GracePeriodEnd);
        assert_eq!(subscription_kind(7), EventKind::Resume);
        assert_eq!(subscription_kind(12), EventKind::Refund);
        assert_eq!(subscription_kind(20), EventKind::Unknown);
        assert_eq!(one_time_kind(2), EventKind::Cancellation);
    }

    #[test]
    fn voided_purchase_carries_order_id() {
        let notification = json!({
            "packageName": "com.example.app",
            "eventTimeMillis": 1704067200000_i64,
            "voidedPurchaseNotification": {
                "purchaseToken": "tok-9",
                "orderId": "GPA.1",
                "productType": 1
            }
        });
        let event = decode(&push_envelope("msg-2", &notification), Timestamp::now(), None).unwrap();
        assert_eq!(event.kind, EventKind::Refund);
        assert_eq!(event.transaction_ref.as_deref(), Some("GPA.1"));
        assert!(!event.one_time);
    }

    #[test]
    fn one_time_product_purchase_is_flagged() {
        let notification = json!({
            "packageName": "com.example.app",
            "eventTimeMillis": "1704067200000",
            "oneTimeProductNotification": {
                "notificationType": 1,
                "purchaseToken": "tok-5",
                "sku": "coins.100"
            }
        });
        let event = decode(&push_envelope("msg-4", &notification), Timestamp::now(), None).unwrap();
        assert_eq!(event.kind, EventKind::Purchase);
        assert!(event.one_time);
        assert_eq!(event.product_ref.as_deref(), Some("coins.100"));
    }

    #[test]
    fn test_notification_is_unknown_kind() {
        let notification = json!({
            "packageName": "com.example.app",
            "eventTimeMillis": "1704067200000",
            "testNotification": {"version": "1.0"}
        });
        let event = decode(&push_envelope("msg-3", &notification), Timestamp::now(), None).unwrap();
        assert_eq!(event.kind, EventKind::Unknown);
    }

    #[test]
    fn wrong_package_is_rejected() {
        let raw = push_envelope("msg-1", &subscription_notification(2, "tok-1"));
        assert!(matches!(
            decode(&raw, Timestamp::now(), Some("com.other.app")),
            Err(ParseError::ApplicationMismatch { .. })
        ));
    }

    #[test]
    fn missing_purchase_token_is_rejected() {
        let notification = json!({
            "packageName": "com.example.app",
            "eventTimeMillis": "1704067200000",
            "subscriptionNotification": {"notificationType": 2}
        });
        assert_eq!(
            decode(&push_envelope("m", &notification), Timestamp::now(), None).unwrap_err(),
            ParseError::missing("subscriptionNotification.purchaseToken")
        );
    }

    #[test]
    fn non_base64_data_is_rejected() {
        let raw = json!({"message": {"data": "%%%", "messageId": "m"}});
        assert!(matches!(
            decode(&raw, Timestamp::now(), None),
            Err(ParseError::InvalidBase64 { .. })
        ));
    }

    #[test]
    fn falls_back_to_publish_time() {
        let notification = json!({
            "packageName": "com.example.app",
            "subscriptionNotification": {"notificationType": 3, "purchaseToken": "tok"}
        });
        let event = decode(&push_envelope("m", &notification), Timestamp::now(), None).unwrap();
        assert_eq!(event.occurred_at.to_string(), "2024-01-01T00:00:05+00:00");
    }
}
