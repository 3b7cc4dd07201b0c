pub(crate) mod aws;
mod composite;
mod fragment;

pub use {composite::CompositePrincipal, fragment::PrincipalPolicyFragment};

use {
    crate::{display_json, serutil::value_to_list, Conditions, PolicyDocument, PolicyError, PolicyStatement},
    fragment::{AWS, CANONICAL_USER, FEDERATED, SERVICE, STAR},
    log::debug,
    serde::{ser::Serializer, Serialize},
    serde_json::{json, Value},
};

pub const ASSUME_ROLE: &str = "sts:AssumeRole";
pub const ASSUME_ROLE_WITH_SAML: &str = "sts:AssumeRoleWithSAML";
pub const ASSUME_ROLE_WITH_WEB_IDENTITY: &str = "sts:AssumeRoleWithWebIdentity";
pub const TAG_SESSION: &str = "sts:TagSession";

const SAML_SIGNIN_URL: &str = "https://signin.aws.amazon.com/saml";

/// An entity that a statement can apply to, or that can assume a role.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Principal {
    /// An AWS principal given by ARN (or any value IAM accepts under `AWS`, including intrinsic references).
    Arn(Value),

    /// The root of the given account.
    Account(String),

    /// The root of the account the policy is deployed into.
    AccountRoot,

    Service {
        service: String,
        conditions: Conditions,
    },

    /// Any principal in the given AWS Organization.
    Organization(String),

    /// Any AWS principal (`{"AWS": "*"}`).
    Any,

    /// Every principal (`"*"`), including anonymous ones.
    Star,

    CanonicalUser(String),

    Federated {
        federated: String,
        conditions: Conditions,
        assume_role_action: String,
    },

    Saml {
        provider_arn: String,
        conditions: Conditions,
    },

    /// A SAML provider used for console sign-in.
    SamlConsole {
        provider_arn: String,
        conditions: Conditions,
    },

    WebIdentity {
        identity_provider: String,
        conditions: Conditions,
    },

    OpenIdConnect {
        provider_arn: String,
        conditions: Conditions,
    },

    Composite(CompositePrincipal),

    WithConditions(Box<Principal>, Conditions),

    /// A principal allowed to pass session tags when assuming a role, optionally restricted to a set of tag keys.
    WithSessionTags(Box<Principal>, Vec<String>),
}

impl Principal {
    pub fn arn<V: Into<Value>>(arn: V) -> Self {
        Self::Arn(arn.into())
    }

    pub fn account<S: Into<String>>(account_id: S) -> Self {
        Self::Account(account_id.into())
    }

    pub fn account_root() -> Self {
        Self::AccountRoot
    }

    pub fn service<S: Into<String>>(service: S) -> Self {
        Self::Service {
            service: service.into(),
            conditions: Conditions::new(),
        }
    }

    pub fn organization<S: Into<String>>(organization_id: S) -> Self {
        Self::Organization(organization_id.into())
    }

    pub fn any() -> Self {
        Self::Any
    }

    pub fn star() -> Self {
        Self::Star
    }

    pub fn canonical_user<S: Into<String>>(canonical_user_id: S) -> Self {
        Self::CanonicalUser(canonical_user_id.into())
    }

    pub fn federated<S: Into<String>>(federated: S, conditions: Conditions) -> Self {
        Self::Federated {
            federated: federated.into(),
            conditions,
            assume_role_action: ASSUME_ROLE.to_string(),
        }
    }

    pub fn federated_with_action<S: Into<String>, A: Into<String>>(
        federated: S,
        conditions: Conditions,
        assume_role_action: A,
    ) -> Self {
        Self::Federated {
            federated: federated.into(),
            conditions,
            assume_role_action: assume_role_action.into(),
        }
    }

    pub fn saml<S: Into<String>>(provider_arn: S, conditions: Conditions) -> Self {
        Self::Saml {
            provider_arn: provider_arn.into(),
            conditions,
        }
    }

    pub fn saml_console<S: Into<String>>(provider_arn: S, conditions: Conditions) -> Self {
        Self::SamlConsole {
            provider_arn: provider_arn.into(),
            conditions,
        }
    }

    pub fn web_identity<S: Into<String>>(identity_provider: S, conditions: Conditions) -> Self {
        Self::WebIdentity {
            identity_provider: identity_provider.into(),
            conditions,
        }
    }

    pub fn open_id_connect<S: Into<String>>(provider_arn: S, conditions: Conditions) -> Self {
        Self::OpenIdConnect {
            provider_arn: provider_arn.into(),
            conditions,
        }
    }

    pub fn composite<I: IntoIterator<Item = Principal>>(principals: I) -> Result<Self, PolicyError> {
        Ok(Self::Composite(CompositePrincipal::new(principals)?))
    }

    /// Wraps this principal so that it carries extra conditions. Conditions are merged per operator and key, later
    /// values winning. Composite principals cannot carry conditions; put them on the members instead.
    pub fn with_conditions(self, conditions: Conditions) -> Result<Self, PolicyError> {
        if self.is_composite() {
            return Err(PolicyError::ConditionalComposite(self.policy_fragment().to_json().to_string()));
        }

        Ok(match self {
            Self::WithConditions(inner, mut existing) => {
                existing.merge_all(&conditions);
                Self::WithConditions(inner, existing)
            }
            other => Self::WithConditions(Box::new(other), conditions),
        })
    }

    fn is_composite(&self) -> bool {
        match self {
            Self::Composite(_) => true,
            Self::WithConditions(inner, _) | Self::WithSessionTags(inner, _) => inner.is_composite(),
            _ => false,
        }
    }

    /// Wraps this principal so that assuming a role also permits `sts:TagSession`.
    pub fn with_session_tags(self) -> Self {
        Self::WithSessionTags(Box::new(self), Vec::new())
    }

    /// Like [`Principal::with_session_tags`], but only the given tag keys may be passed.
    pub fn with_session_tag_keys<I, S>(self, tag_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::WithSessionTags(Box::new(self), tag_keys.into_iter().map(Into::into).collect())
    }

    /// Renders this principal into its `Principal` element and required conditions.
    pub fn policy_fragment(&self) -> PrincipalPolicyFragment {
        match self {
            Self::Arn(arn) => PrincipalPolicyFragment::single(AWS, arn.clone()),
            Self::Account(account_id) => {
                PrincipalPolicyFragment::single(AWS, aws::account_root_arn("aws", account_id))
            }
            Self::AccountRoot => PrincipalPolicyFragment::single(AWS, aws::current_account()),
            Self::Service {
                service,
                conditions,
            } => PrincipalPolicyFragment::single(SERVICE, service.as_str()).with_conditions(conditions.clone()),
            Self::Organization(organization_id) => {
                let mut conditions = Conditions::new();
                conditions.set("StringEquals", json!({ "aws:PrincipalOrgID": organization_id }));
                PrincipalPolicyFragment::single(AWS, "*").with_conditions(conditions)
            }
            Self::Any => PrincipalPolicyFragment::single(AWS, "*"),
            Self::Star => PrincipalPolicyFragment::single(STAR, "*"),
            Self::CanonicalUser(id) => PrincipalPolicyFragment::single(CANONICAL_USER, id.as_str()),
            Self::Federated {
                federated: provider,
                conditions,
                ..
            }
            | Self::Saml {
                provider_arn: provider,
                conditions,
            }
            | Self::WebIdentity {
                identity_provider: provider,
                conditions,
            }
            | Self::OpenIdConnect {
                provider_arn: provider,
                conditions,
            } => PrincipalPolicyFragment::single(FEDERATED, provider.as_str()).with_conditions(conditions.clone()),
            Self::SamlConsole {
                provider_arn,
                conditions,
            } => {
                let mut audience = Conditions::new();
                audience.set("StringEquals", json!({ "SAML:aud": SAML_SIGNIN_URL }));
                PrincipalPolicyFragment::single(FEDERATED, provider_arn.as_str())
                    .with_conditions(conditions.clone())
                    .with_conditions(audience)
            }
            Self::Composite(composite) => composite.policy_fragment(),
            Self::WithConditions(inner, conditions) => inner.policy_fragment().with_conditions(conditions.clone()),
            Self::WithSessionTags(inner, tag_keys) => {
                let fragment = inner.policy_fragment();
                if tag_keys.is_empty() {
                    fragment
                } else {
                    fragment.with_conditions(tag_key_conditions(tag_keys))
                }
            }
        }
    }

    #[inline]
    pub fn has_conditions(&self) -> bool {
        !self.policy_fragment().conditions().is_empty()
    }

    /// The action a trust policy must allow for this principal to assume a role.
    pub fn assume_role_action(&self) -> &str {
        match self {
            Self::Saml {
                ..
            }
            | Self::SamlConsole {
                ..
            } => ASSUME_ROLE_WITH_SAML,
            Self::WebIdentity {
                ..
            }
            | Self::OpenIdConnect {
                ..
            } => ASSUME_ROLE_WITH_WEB_IDENTITY,
            Self::Federated {
                assume_role_action,
                ..
            } => assume_role_action.as_str(),
            Self::Composite(composite) => match composite.principals().first() {
                Some(first) => first.assume_role_action(),
                None => ASSUME_ROLE,
            },
            Self::WithConditions(inner, _) | Self::WithSessionTags(inner, _) => inner.assume_role_action(),
            _ => ASSUME_ROLE,
        }
    }

    /// The account this principal belongs to, when it is known without deploying anything.
    pub fn principal_account(&self) -> Option<String> {
        match self {
            Self::Account(account_id) => Some(account_id.clone()),
            Self::Arn(arn) => aws::account_of(arn),
            Self::WithConditions(inner, _) | Self::WithSessionTags(inner, _) => inner.principal_account(),
            _ => None,
        }
    }

    /// Adds the statements a role's trust policy needs so this principal can assume the role.
    pub fn add_to_assume_role_policy(&self, document: &mut PolicyDocument) {
        match self {
            Self::Composite(composite) => {
                for principal in composite.principals() {
                    principal.add_to_assume_role_policy(document);
                }
            }
            Self::WithSessionTags(inner, tag_keys) => {
                let mut inner_document = PolicyDocument::new();
                inner.add_to_assume_role_policy(&mut inner_document);
                for statement in inner_document.into_statements() {
                    let mut statement = statement.borrow().clone();
                    statement.add_actions([TAG_SESSION]);
                    if !tag_keys.is_empty() {
                        statement.add_conditions(&tag_key_conditions(tag_keys));
                    }
                    document.add_statements([statement]);
                }
            }
            _ => {
                let mut statement = PolicyStatement::new();
                statement.add_actions([self.assume_role_action()]);
                statement.add_principals([self.clone()]);
                document.add_statements([statement]);
            }
        }
    }
}

fn tag_key_conditions(tag_keys: &[String]) -> Conditions {
    let mut conditions = Conditions::new();
    conditions.set("ForAllValues:StringEquals", json!({ "aws:TagKeys": tag_keys }));
    conditions
}

display_json!(Principal);

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.policy_fragment().serialize(serializer)
    }
}

impl From<CompositePrincipal> for Principal {
    fn from(composite: CompositePrincipal) -> Self {
        Self::Composite(composite)
    }
}

/// Parses a `Principal` or `NotPrincipal` element into one principal per value.
pub(crate) fn principals_from_json(value: Value) -> Result<Vec<Principal>, String> {
    match value {
        Value::String(s) if s == STAR => Ok(vec![Principal::Star]),
        Value::Object(map) => {
            let mut principals = Vec::new();
            for (kind, values) in map {
                for value in value_to_list(values) {
                    principals.push(principal_from_json(&kind, value)?);
                }
            }
            Ok(principals)
        }
        other => {
            debug!("Unrecognized principal element: {}", other);
            Err(format!("Invalid principal: {}", other))
        }
    }
}

fn principal_from_json(kind: &str, value: Value) -> Result<Principal, String> {
    match (kind, value) {
        (AWS, Value::String(s)) if s == "*" => Ok(Principal::Any),
        (AWS, value @ (Value::String(_) | Value::Object(_))) => Ok(Principal::Arn(value)),
        (SERVICE, Value::String(s)) => Ok(Principal::service(s)),
        (FEDERATED, Value::String(s)) => Ok(Principal::federated(s, Conditions::new())),
        (CANONICAL_USER, Value::String(s)) => Ok(Principal::canonical_user(s)),
        (kind, value) => Err(format!("Invalid principal: {}: {}", kind, value)),
    }
}
