//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed};

/// Maximum number of mail IDs accepted by a batch operation.
pub const MAX_BATCH_IDS: u64 = 500;

/// Batch of mail IDs for read marking and deletion.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MailIdsRequest {
    /// Target mail IDs.
    #[serde(alias = "mail_ids")]
    #[validate(length(min = 1, max = 500, message = "Select between 1 and 500 mails"))]
    pub mail_ids: Vec<String>,
}

/// Change address request.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangeAddressRequest {
    /// New address, either `name` or `name@domain`.
    #[validate(
        length(max = 128, message = "Address is too long"),
        custom(function = "address_input")
    )]
    pub address: String,
}

fn address_input(value: &str) -> Result<(), validator::ValidationError> {
    not_empty_trimmed(value)?;
    no_control_chars(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mail_ids_accepts_both_spellings() {
        let req: MailIdsRequest = serde_json::from_str(r#"{"mailIds":["a","b"]}"#).unwrap();
        assert_eq!(req.mail_ids, vec!["a", "b"]);

        let req: MailIdsRequest = serde_json::from_str(r#"{"mail_ids":["c"]}"#).unwrap();
        assert_eq!(req.mail_ids, vec!["c"]);
    }

    #[test]
    fn test_mail_ids_bounds() {
        let empty = MailIdsRequest { mail_ids: vec![] };
        assert!(empty.validate().is_err());

        let max = MailIdsRequest {
            mail_ids: (0..MAX_BATCH_IDS).map(|i| i.to_string()).collect(),
        };
        assert!(max.validate().is_ok());

        let over = MailIdsRequest {
            mail_ids: (0..=MAX_BATCH_IDS).map(|i| i.to_string()).collect(),
        };
        assert!(over.validate().is_err());
    }

    #[test]
    fn test_change_address_validation() {
        let ok = ChangeAddressRequest {
            address: "alice@suimail".into(),
        };
        assert!(ok.validate().is_ok());

        let blank = ChangeAddressRequest {
            address: "   ".into(),
        };
        assert!(blank.validate().is_err());

        let control = ChangeAddressRequest {
            address: "ali\x07ce".into(),
        };
        assert!(control.validate().is_err());
    }
}
