use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

#[derive(Debug, Eq, PartialEq)]
pub enum PolicyError {
    ConditionalComposite(String),
    ConditionalCompositeMember(String),
    DuplicatePolicyName(String),
    GrantUnsuccessful(String),
    InvalidPolicy(String),
    InvalidPolicyVersion(String),
}

impl Display for PolicyError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::ConditionalComposite(principal) => {
                write!(f, "A CompositePrincipal cannot carry conditions of its own: {}", principal)
            }
            Self::ConditionalCompositeMember(principal) => {
                write!(f, "Cannot add a principal with conditions to a CompositePrincipal: {}", principal)
            }
            Self::DuplicatePolicyName(name) => write!(f, "A policy named {} is already attached", name),
            Self::GrantUnsuccessful(description) => {
                write!(f, "{} could not be added on either identity or resource policy.", description)
            }
            Self::InvalidPolicy(message) => write!(f, "Invalid policy: {}", message),
            Self::InvalidPolicyVersion(version) => write!(f, "Invalid policy version: {}", version),
        }
    }
}

impl Error for PolicyError {}

impl From<serde_json::Error> for PolicyError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidPolicy(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::PolicyError,
        pretty_assertions::{assert_eq, assert_ne},
    };

    #[test_log::test]
    fn test_display() {
        let _ = format!("{:?}", PolicyError::InvalidPolicyVersion("foo".to_string()));
        assert_eq!(PolicyError::InvalidPolicyVersion("foo".to_string()).to_string(), "Invalid policy version: foo");
        assert_eq!(PolicyError::InvalidPolicy("bad".to_string()).to_string(), "Invalid policy: bad");
        assert_eq!(
            PolicyError::ConditionalComposite("{}".to_string()).to_string(),
            "A CompositePrincipal cannot carry conditions of its own: {}"
        );
        assert_eq!(
            PolicyError::DuplicatePolicyName("Reader".to_string()).to_string(),
            "A policy named Reader is already attached"
        );
        assert_eq!(
            PolicyError::GrantUnsuccessful("Permissions for 'x' to call 's3:GetObject' on '*'".to_string())
                .to_string(),
            "Permissions for 'x' to call 's3:GetObject' on '*' could not be added on either identity or resource policy."
        );
    }

    #[test_log::test]
    fn test_from_serde() {
        let e = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let pe = PolicyError::from(e);
        assert!(matches!(pe, PolicyError::InvalidPolicy(_)));
        assert_ne!(pe, PolicyError::InvalidPolicy(String::new()));
    }
}
