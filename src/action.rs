use {lazy_static::lazy_static, log::debug, regex::Regex};

lazy_static! {
    static ref ACTION: Regex = Regex::new(r"^(\*|[a-zA-Z0-9-]+:[a-zA-Z0-9*]+)$").unwrap();
}

/// Checks the shape of an action string: either `*` or `service:ActionName`, where the action name may contain
/// wildcards.
pub(crate) fn is_valid_action(action: &str) -> bool {
    let valid = ACTION.is_match(action);
    if !valid {
        debug!("Action does not match the service:action pattern: {}", action);
    }
    valid
}

pub(crate) fn invalid_action_message(action: &str) -> String {
    format!(
        "Action '{}' is invalid. An action string consists of a service namespace, a colon, and the name of an \
         action. Action names can include wildcards.",
        action
    )
}

#[cfg(test)]
mod tests {
    use {
        super::{invalid_action_message, is_valid_action},
        pretty_assertions::assert_eq,
    };

    #[test_log::test]
    fn test_valid_actions() {
        assert!(is_valid_action("*"));
        assert!(is_valid_action("s3:GetObject"));
        assert!(is_valid_action("s3:Get*"));
        assert!(is_valid_action("ec2-instance-connect:SendSSHPublicKey"));
        assert!(is_valid_action("ecs:*"));
    }

    #[test_log::test]
    fn test_invalid_actions() {
        assert!(!is_valid_action(""));
        assert!(!is_valid_action("ec2:"));
        assert!(!is_valid_action(":RunInstances"));
        assert!(!is_valid_action("s3"));
        assert!(!is_valid_action("s3:Get Object"));
        assert!(!is_valid_action("s3:GetObject:extra"));
    }

    #[test_log::test]
    fn test_message() {
        assert_eq!(
            invalid_action_message("ec2:"),
            "Action 'ec2:' is invalid. An action string consists of a service namespace, a colon, and the name of an \
             action. Action names can include wildcards."
        );
    }
}
