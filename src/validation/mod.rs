//! Structural validation of payment method details.
//!
//! Validators are pure and never panic for bad input: failures come back as
//! field-level error lists. A tag/payload shape mismatch is a distinct error
//! from field-level failures.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::errors::PaymentError;
use crate::types::payment::{PaymentDetails, PaymentMethod, RecurrenceSchedule};

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Offending field, dotted for nested fields.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

static BILLER_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3,10}$").expect("biller code pattern"));
static BSB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}-\d{3}$").expect("bsb pattern"));
static ACCOUNT_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6,10}$").expect("account number pattern"));

/// Maximum PayID description length.
const MAX_PAYID_DESCRIPTION: usize = 280;

/// Parses a raw detail payload against the declared method tag. A payload
/// whose shape does not match the tag is a [`PaymentError::DetailMismatch`],
/// not a field-level failure.
pub fn parse_details(method: PaymentMethod, raw: &Value) -> Result<PaymentDetails, PaymentError> {
    let Value::Object(map) = raw else {
        return Err(PaymentError::DetailMismatch {
            method,
            reason: "payment details must be a JSON object".to_string(),
        });
    };
    let mut tagged = map.clone();
    tagged.insert("method".to_string(), Value::String(method.as_str().to_string()));
    serde_json::from_value(Value::Object(tagged))
        .map_err(|e| PaymentError::DetailMismatch { method, reason: e.to_string() })
}

/// Validates a parsed detail payload. The dispatch is exhaustive over the
/// closed sum, so a new rail cannot ship without a validator.
#[must_use]
pub fn validate_details(
    details: &PaymentDetails,
    expected_amount: Decimal,
    now: DateTime<Utc>,
) -> Vec<FieldError> {
    let mut errors = match details {
        PaymentDetails::Bpay { biller_code, reference, amount, expires_at } => {
            validate_bpay(biller_code, reference, *amount, *expires_at, now)
        }
        PaymentDetails::Payid { identifier, description, amount, .. } => {
            validate_payid(identifier, description.as_deref(), *amount)
        }
        PaymentDetails::DirectDebit { account_name, bsb, account_number, amount, recurrence } => {
            let mut errors = validate_bank_account(account_name, bsb, account_number, *amount);
            if let Some(recurrence) = recurrence {
                errors.extend(validate_recurrence(recurrence));
            }
            errors
        }
        PaymentDetails::BankTransfer { account_name, bsb, account_number, amount, reference } => {
            let mut errors = validate_bank_account(account_name, bsb, account_number, *amount);
            if !(3..=18).contains(&reference.chars().count()) {
                errors.push(FieldError::new("reference", "must be 3-18 characters"));
            }
            errors
        }
    };

    if details.amount() != expected_amount {
        errors.push(FieldError::new("amount", "must match the payment amount"));
    }
    errors
}

/// Parses and validates in one step; the usual entry point.
pub fn validate_payment_details(
    method: PaymentMethod,
    raw: &Value,
    expected_amount: Decimal,
    now: DateTime<Utc>,
) -> Result<PaymentDetails, PaymentError> {
    let details = parse_details(method, raw)?;
    let errors = validate_details(&details, expected_amount, now);
    if errors.is_empty() {
        Ok(details)
    } else {
        Err(PaymentError::Validation(errors))
    }
}

fn validate_bpay(
    biller_code: &str,
    reference: &str,
    amount: Decimal,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !BILLER_CODE_RE.is_match(biller_code) {
        errors.push(FieldError::new("billerCode", "must be 3-10 digits"));
    }
    if !(6..=20).contains(&reference.chars().count()) {
        errors.push(FieldError::new("reference", "must be 6-20 characters"));
    }
    if amount <= Decimal::ZERO {
        errors.push(FieldError::new("amount", "must be greater than zero"));
    }
    if expires_at < now {
        errors.push(FieldError::new("expiresAt", "must not be in the past"));
    }
    errors
}

fn validate_payid(identifier: &str, description: Option<&str>, amount: Decimal) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if identifier.trim().chars().count() < 5 {
        errors.push(FieldError::new("identifier", "must be at least 5 characters"));
    }
    if let Some(description) = description {
        if description.chars().count() > MAX_PAYID_DESCRIPTION {
            errors.push(FieldError::new("description", "must be at most 280 characters"));
        }
    }
    if amount <= Decimal::ZERO {
        errors.push(FieldError::new("amount", "must be greater than zero"));
    }
    errors
}

fn validate_bank_account(
    account_name: &str,
    bsb: &str,
    account_number: &str,
    amount: Decimal,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if account_name.trim().chars().count() < 2 {
        errors.push(FieldError::new("accountName", "must be at least 2 characters"));
    }
    if !BSB_RE.is_match(bsb) {
        errors.push(FieldError::new("bsb", "must match NNN-NNN"));
    }
    if !ACCOUNT_NUMBER_RE.is_match(account_number) {
        errors.push(FieldError::new("accountNumber", "must be 6-10 digits"));
    }
    if amount <= Decimal::ZERO {
        errors.push(FieldError::new("amount", "must be greater than zero"));
    }
    errors
}

fn validate_recurrence(recurrence: &RecurrenceSchedule) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if let Some(end_date) = recurrence.end_date {
        if end_date <= recurrence.start_date {
            errors.push(FieldError::new(
                "recurrence.endDate",
                "must fall after the start date",
            ));
        }
    }
    if recurrence.max_payments == Some(0) {
        errors.push(FieldError::new(
            "recurrence.maxPayments",
            "must be a positive count",
        ));
    }
    errors
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn bpay_details(biller_code: &str) -> PaymentDetails {
        PaymentDetails::Bpay {
            biller_code: biller_code.to_string(),
            reference: "REF123456".to_string(),
            amount: dec!(500.00),
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn bpay_biller_code_boundaries() {
        let now = Utc::now();
        for code in ["123", "1234567890"] {
            let errors = validate_details(&bpay_details(code), dec!(500.00), now);
            assert!(errors.is_empty(), "{code} should be accepted: {errors:?}");
        }
        for code in ["12", "12345678901", "12a"] {
            let errors = validate_details(&bpay_details(code), dec!(500.00), now);
            assert!(fields(&errors).contains(&"billerCode"), "{code} should be rejected");
        }
    }

    #[test]
    fn bpay_reference_length_and_expiry() {
        let now = Utc::now();
        let details = PaymentDetails::Bpay {
            biller_code: "12345".to_string(),
            reference: "SHORT".to_string(),
            amount: dec!(500.00),
            expires_at: now - Duration::hours(1),
        };
        let errors = validate_details(&details, dec!(500.00), now);
        assert!(fields(&errors).contains(&"reference"));
        assert!(fields(&errors).contains(&"expiresAt"));
    }

    #[test]
    fn bpay_rejects_non_positive_amount() {
        let now = Utc::now();
        let details = PaymentDetails::Bpay {
            biller_code: "12345".to_string(),
            reference: "REF123456".to_string(),
            amount: dec!(0),
            expires_at: now + Duration::days(1),
        };
        let errors = validate_details(&details, dec!(0), now);
        assert!(fields(&errors).contains(&"amount"));
    }

    #[test]
    fn bsb_requires_hyphenated_form() {
        let now = Utc::now();
        let make = |bsb: &str| PaymentDetails::BankTransfer {
            account_name: "Alex Chan".to_string(),
            bsb: bsb.to_string(),
            account_number: "12345678".to_string(),
            amount: dec!(500.00),
            reference: "WATT-1234".to_string(),
        };
        assert!(validate_details(&make("123-456"), dec!(500.00), now).is_empty());
        let errors = validate_details(&make("123456"), dec!(500.00), now);
        assert!(fields(&errors).contains(&"bsb"));
    }

    #[test]
    fn account_number_boundaries() {
        let now = Utc::now();
        let make = |account: &str| PaymentDetails::BankTransfer {
            account_name: "Alex Chan".to_string(),
            bsb: "123-456".to_string(),
            account_number: account.to_string(),
            amount: dec!(500.00),
            reference: "WATT-1234".to_string(),
        };
        assert!(validate_details(&make("123456"), dec!(500.00), now).is_empty());
        assert!(validate_details(&make("1234567890"), dec!(500.00), now).is_empty());
        assert!(fields(&validate_details(&make("12345"), dec!(500.00), now))
            .contains(&"accountNumber"));
        assert!(fields(&validate_details(&make("12345678901"), dec!(500.00), now))
            .contains(&"accountNumber"));
    }

    #[test]
    fn bank_transfer_reference_length() {
        let now = Utc::now();
        let make = |reference: &str| PaymentDetails::BankTransfer {
            account_name: "Alex Chan".to_string(),
            bsb: "123-456".to_string(),
            account_number: "12345678".to_string(),
            amount: dec!(500.00),
            reference: reference.to_string(),
        };
        assert!(validate_details(&make("ABC"), dec!(500.00), now).is_empty());
        assert!(fields(&validate_details(&make("AB"), dec!(500.00), now)).contains(&"reference"));
        assert!(fields(&validate_details(&make("A234567890123456789"), dec!(500.00), now))
            .contains(&"reference"));
    }

    #[test]
    fn payid_identifier_and_description() {
        let now = Utc::now();
        let make = |identifier: &str, description: Option<String>| PaymentDetails::Payid {
            identifier: identifier.to_string(),
            payid_type: crate::types::payment::PayIdType::Email,
            amount: dec!(500.00),
            description,
        };
        assert!(validate_details(&make("alex@example.com", None), dec!(500.00), now).is_empty());
        assert!(fields(&validate_details(&make("ab", None), dec!(500.00), now))
            .contains(&"identifier"));
        let long = "x".repeat(281);
        assert!(fields(&validate_details(&make("alex@example.com", Some(long)), dec!(500.00), now))
            .contains(&"description"));
    }

    #[test]
    fn recurrence_end_must_follow_start() {
        let now = Utc::now();
        let details = PaymentDetails::DirectDebit {
            account_name: "Alex Chan".to_string(),
            bsb: "123-456".to_string(),
            account_number: "12345678".to_string(),
            amount: dec!(500.00),
            recurrence: Some(RecurrenceSchedule {
                frequency: crate::types::payment::RecurrenceFrequency::Monthly,
                start_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
                end_date: chrono::NaiveDate::from_ymd_opt(2026, 2, 1),
                max_payments: Some(0),
            }),
        };
        let errors = validate_details(&details, dec!(500.00), now);
        assert!(fields(&errors).contains(&"recurrence.endDate"));
        assert!(fields(&errors).contains(&"recurrence.maxPayments"));
    }

    #[test]
    fn detail_amount_must_match_payment_amount() {
        let now = Utc::now();
        let errors = validate_details(&bpay_details("12345"), dec!(499.99), now);
        assert!(fields(&errors).contains(&"amount"));
    }

    #[test]
    fn tag_payload_mismatch_is_distinct_from_field_errors() {
        let payid_payload = json!({
            "identifier": "alex@example.com",
            "payidType": "email",
            "amount": "500.00"
        });
        let err = validate_payment_details(
            PaymentMethod::Bpay,
            &payid_payload,
            dec!(500.00),
            Utc::now(),
        )
        .expect_err("shape mismatch");
        assert!(matches!(err, PaymentError::DetailMismatch { method: PaymentMethod::Bpay, .. }));
    }

    #[test]
    fn unknown_payid_type_is_a_shape_mismatch() {
        let payload = json!({
            "identifier": "alex@example.com",
            "payidType": "carrier_pigeon",
            "amount": "500.00"
        });
        let err =
            validate_payment_details(PaymentMethod::Payid, &payload, dec!(500.00), Utc::now())
                .expect_err("unknown type tag");
        assert!(matches!(err, PaymentError::DetailMismatch { .. }));
    }

    #[test]
    fn well_formed_payload_parses_and_validates() {
        let payload = json!({
            "billerCode": "123456",
            "reference": "CRN00042",
            "amount": "500.00",
            "expiresAt": (Utc::now() + Duration::days(7)).to_rfc3339()
        });
        let details =
            validate_payment_details(PaymentMethod::Bpay, &payload, dec!(500.00), Utc::now())
                .expect("valid payload");
        assert_eq!(details.method(), PaymentMethod::Bpay);
    }
}
