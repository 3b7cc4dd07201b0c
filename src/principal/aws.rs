use {lazy_static::lazy_static, regex::Regex, serde_json::Value};

lazy_static! {
    static ref AWS_ACCOUNT_ID: Regex = Regex::new(r"^\d{12}$").unwrap();
}

#[inline]
pub(crate) fn is_account_id(s: &str) -> bool {
    AWS_ACCOUNT_ID.is_match(s)
}

/// The root user ARN of an account.
pub(crate) fn account_root_arn(partition: &str, account_id: &str) -> String {
    format!("arn:{}:iam::{}:root", partition, account_id)
}

/// The CloudFormation reference to the deploying account.
pub(crate) fn current_account() -> Value {
    serde_json::json!({"Ref": "AWS::AccountId"})
}

/// Extracts the account id of a principal value if it is a literal account id or an ARN with a 12-digit account
/// field. Intrinsic references and wildcards yield `None`.
pub(crate) fn account_of(value: &Value) -> Option<String> {
    let s = value.as_str()?;
    if is_account_id(s) {
        return Some(s.to_string());
    }

    let parts = s.splitn(6, ':').collect::<Vec<&str>>();
    match parts.as_slice() {
        ["arn", _, _, _, account_id, _] if is_account_id(account_id) => Some(account_id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{account_of, account_root_arn, current_account, is_account_id},
        pretty_assertions::assert_eq,
        serde_json::json,
    };

    #[test_log::test]
    fn test_account_ids() {
        assert!(is_account_id("123456789012"));
        assert!(!is_account_id("12345678901"));
        assert!(!is_account_id("12345678901a"));
        assert_eq!(account_root_arn("aws", "123456789012"), "arn:aws:iam::123456789012:root");
        assert_eq!(current_account(), json!({"Ref": "AWS::AccountId"}));
    }

    #[test_log::test]
    fn test_account_of() {
        assert_eq!(account_of(&json!("123456789012")), Some("123456789012".to_string()));
        assert_eq!(account_of(&json!("arn:aws:iam::123456789012:role/Admin")), Some("123456789012".to_string()));
        assert_eq!(account_of(&json!("arn:aws:s3:::bucket")), None);
        assert_eq!(account_of(&json!("*")), None);
        assert_eq!(account_of(&json!({"Ref": "AWS::AccountId"})), None);
    }
}
