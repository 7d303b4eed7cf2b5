//! App Store server notification (v2) decoding.
//!
//! The body is `{"signedPayload": "<JWS>"}`. The decoded payload nests a
//! second JWS, `data.signedTransactionInfo`, which is verified the same way.

use serde_json::Value;

use crate::domain::foundation::{Currency, Money, Platform, Timestamp};
use crate::domain::lifecycle::{EventKind, NewLifecycleEvent};
use crate::ports::SignatureVerifier;

use super::fields::{object, opt_i64, opt_millis, opt_str, req_str};
use super::jws::decode_verified;
use super::ParseError;

/// Maps `notificationType` and `subtype` to an event kind.
pub fn event_kind(notification_type: &str, subtype: Option<&str>) -> EventKind {
    match (notification_type, subtype) {
        ("SUBSCRIBED", _) => EventKind::Purchase,
        ("DID_RENEW", _) => EventKind::Renewal,
        ("DID_CHANGE_RENEWAL_STATUS", Some("AUTO_RENEW_DISABLED")) => EventKind::Cancellation,
        ("DID_FAIL_TO_RENEW", Some("GRACE_PERIOD")) => EventKind::GracePeriodStart,
        ("DID_FAIL_TO_RENEW", _) => EventKind::GracePeriodEnd,
        ("GRACE_PERIOD_EXPIRED", _) => EventKind::GracePeriodEnd,
        ("EXPIRED", _) => EventKind::Expiration,
        ("REFUND", _) | ("REVOKE", _) => EventKind::Refund,
        ("ONE_TIME_CHARGE", _) => EventKind::Purchase,
        _ => EventKind::Unknown,
    }
}

/// Verifies and decodes a signed notification into event fields.
pub fn decode(
    raw: &Value,
    received_at: Timestamp,
    expected_bundle: Option<&str>,
    verifier: &dyn SignatureVerifier,
) -> Result<NewLifecycleEvent, ParseError> {
    let envelope = object(raw, "envelope")?;
    let signed_payload = req_str(envelope, "signedPayload", "signedPayload")?;

    let payload = decode_verified(signed_payload, "signedPayload", verifier)?;
    let body = object(&payload, "signedPayload")?;

    let notification_type = req_str(body, "notificationType", "notificationType")?;
    let subtype = opt_str(body, "subtype");
    let notification_uuid = req_str(body, "notificationUUID", "notificationUUID")?;
    let occurred_at = opt_millis(body, "signedDate", "signedDate")?
        .ok_or_else(|| ParseError::missing("signedDate"))?;

    let data = body
        .get("data")
        .ok_or_else(|| ParseError::missing("data"))
        .and_then(|d| object(d, "data"))?;

    if let (Some(expected), Some(actual)) = (expected_bundle, opt_str(data, "bundleId")) {
        if expected != actual {
            return Err(ParseError::ApplicationMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
    }

    let signed_transaction = req_str(data, "signedTransactionInfo", "data.signedTransactionInfo")?;
    let transaction = decode_verified(signed_transaction, "data.signedTransactionInfo", verifier)?;
    let txn = object(&transaction, "data.signedTransactionInfo")?;

    let original_transaction_id = req_str(
        txn,
        "originalTransactionId",
        "data.signedTransactionInfo.originalTransactionId",
    )?;

    let amount = match (
        opt_i64(txn, "price", "data.signedTransactionInfo.price")?,
        opt_str(txn, "currency"),
    ) {
        (Some(price), Some(code)) => Some(Money::from_milliunits(price, Currency::new(code)?)),
        _ => None,
    };

    let mut stored = body.clone();
    stored.insert("transactionInfo".to_string(), transaction.clone());

    Ok(NewLifecycleEvent {
        platform: Platform::AppStore,
        kind: event_kind(notification_type, subtype),
        entity_ref: original_transaction_id.to_string(),
        source_token: original_transaction_id.to_string(),
        platform_notification_id: notification_uuid.to_string(),
        transaction_ref: opt_str(txn, "transactionId").map(str::to_string),
        product_ref: opt_str(txn, "productId").map(str::to_string),
        amount,
        expiry_at: opt_millis(txn, "expiresDate", "data.signedTransactionInfo.expiresDate")?,
        one_time: notification_type == "ONE_TIME_CHARGE",
        payload: stored,
        occurred_at,
        received_at,
    })
}
