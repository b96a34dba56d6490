pub mod config;
pub mod error;
pub mod records;
pub mod sequence;

pub use config::*;
pub use error::*;
pub use records::*;
pub use sequence::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_serializes_rfc3339_time() {
        let payment = Payment {
            source: "GSOURCE".to_string(),
            destination: "GDEST".to_string(),
            amount: 150_000,
            memo_text: Some("1-test-order".to_string()),
            tx_hash: "ab".repeat(32),
            op_index: 0,
            ledger_sequence: 100,
            time: chrono::DateTime::from_timestamp(1_546_300_800, 0).unwrap(),
        };

        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["time"], "2019-01-01T00:00:00Z");
        let back: Payment = serde_json::from_value(json).unwrap();
        assert_eq!(back, payment);
    }

    #[test]
    fn test_error_shape_deny_unknown_fields() {
        let json = r#"{"error_message":"x","error_type":"y","stack_trace":[]}"#;
        let result: Result<ErrorShape, _> = serde_json::from_str(json);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unknown field"));
    }
}
