use {
    crate::{
        action::{invalid_action_message, is_valid_action},
        display_json, from_str_json,
        principal::principals_from_json,
        serutil::StringList,
        Conditions, Effect, PolicyError, Principal, PrincipalPolicyFragment,
    },
    derive_builder::Builder,
    lazy_static::lazy_static,
    regex::Regex,
    serde::{
        de::{self, Deserializer, MapAccess, Visitor},
        ser::Serializer,
        Deserialize, Serialize,
    },
    serde_json::{json, Map, Value},
    std::{
        cell::RefCell,
        fmt::{Formatter, Result as FmtResult},
        rc::Rc,
    },
};

lazy_static! {
    static ref SID: Regex = Regex::new(r"^[0-9A-Za-z]*$").unwrap();
}

/// A statement that may be recorded in more than one place and refined after it was added, e.g. by the [`Grant`]
/// that created it.
///
/// [`Grant`]: crate::Grant
pub type SharedStatement = Rc<RefCell<PolicyStatement>>;

/// Initial values for a [`PolicyStatement`]. Fields left unset take the statement defaults (Allow, no elements).
#[derive(Builder, Clone, Debug, Default, Eq, PartialEq)]
pub struct PolicyStatementProps {
    #[builder(setter(into, strip_option), default)]
    sid: Option<String>,

    #[builder(setter(into, strip_option), default)]
    effect: Option<Effect>,

    #[builder(setter(into, strip_option), default)]
    actions: Option<Vec<String>>,

    #[builder(setter(into, strip_option), default)]
    not_actions: Option<Vec<String>>,

    #[builder(setter(into, strip_option), default)]
    resources: Option<Vec<String>>,

    #[builder(setter(into, strip_option), default)]
    not_resources: Option<Vec<String>>,

    #[builder(setter(into, strip_option), default)]
    principals: Option<Vec<Principal>>,

    #[builder(setter(into, strip_option), default)]
    not_principals: Option<Vec<Principal>>,

    #[builder(setter(into, strip_option), default)]
    conditions: Option<Conditions>,
}

impl PolicyStatementProps {
    pub fn builder() -> PolicyStatementPropsBuilder {
        PolicyStatementPropsBuilder::default()
    }
}

/// A single IAM policy statement.
///
/// Statements are mutable until they are rendered. List elements keep insertion order and are not deduplicated; IAM
/// treats them as sets.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PolicyStatement {
    sid: Option<String>,
    effect: Effect,
    actions: Vec<String>,
    not_actions: Vec<String>,
    resources: Vec<String>,
    not_resources: Vec<String>,
    principals: Vec<Principal>,
    not_principals: Vec<Principal>,
    conditions: Conditions,
}

impl PolicyStatement {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn builder() -> PolicyStatementPropsBuilder {
        PolicyStatementProps::builder()
    }

    pub fn from_props(props: PolicyStatementProps) -> Self {
        let mut statement = Self::new();
        statement.sid = props.sid;
        statement.effect = props.effect.unwrap_or_default();
        statement.add_actions(props.actions.unwrap_or_default());
        statement.add_not_actions(props.not_actions.unwrap_or_default());
        statement.add_principals(props.principals.unwrap_or_default());
        statement.add_not_principals(props.not_principals.unwrap_or_default());
        statement.add_resources(props.resources.unwrap_or_default());
        statement.add_not_resources(props.not_resources.unwrap_or_default());
        if let Some(conditions) = props.conditions {
            statement.add_conditions(&conditions);
        }
        statement
    }

    /// Parses a statement from its JSON form.
    pub fn from_json(value: Value) -> Result<Self, PolicyError> {
        Ok(serde_json::from_value(value)?)
    }

    #[inline]
    pub fn into_shared(self) -> SharedStatement {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn set_sid<S: Into<String>>(&mut self, sid: S) -> &mut Self {
        self.sid = Some(sid.into());
        self
    }

    #[inline]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn set_effect(&mut self, effect: Effect) -> &mut Self {
        self.effect = effect;
        self
    }

    #[inline]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    #[inline]
    pub fn not_actions(&self) -> &[String] {
        &self.not_actions
    }

    #[inline]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    #[inline]
    pub fn not_resources(&self) -> &[String] {
        &self.not_resources
    }

    #[inline]
    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    #[inline]
    pub fn not_principals(&self) -> &[Principal] {
        &self.not_principals
    }

    #[inline]
    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    pub fn add_actions<I, S>(&mut self, actions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn add_not_actions<I, S>(&mut self, actions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn add_resources<I, S>(&mut self, arns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(arns.into_iter().map(Into::into));
        self
    }

    pub fn add_not_resources<I, S>(&mut self, arns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_resources.extend(arns.into_iter().map(Into::into));
        self
    }

    /// Adds `"*"` as a resource.
    pub fn add_all_resources(&mut self) -> &mut Self {
        self.add_resources(["*"])
    }

    /// Adds principals. Conditions the principals carry are merged into this statement's conditions.
    pub fn add_principals<I: IntoIterator<Item = Principal>>(&mut self, principals: I) -> &mut Self {
        for principal in principals {
            let fragment = principal.policy_fragment();
            self.conditions.merge_all(fragment.conditions());
            self.principals.push(principal);
        }
        self
    }

    /// Adds principals to `NotPrincipal`. A principal with conditions is recorded as-is and reported by
    /// [`PolicyStatement::validate_for_any_policy`].
    pub fn add_not_principals<I: IntoIterator<Item = Principal>>(&mut self, principals: I) -> &mut Self {
        self.not_principals.extend(principals);
        self
    }

    pub fn add_arn_principal<V: Into<Value>>(&mut self, arn: V) -> &mut Self {
        self.add_principals([Principal::arn(arn)])
    }

    pub fn add_service_principal<S: Into<String>>(&mut self, service: S) -> &mut Self {
        self.add_principals([Principal::service(service)])
    }

    pub fn add_aws_account_principal<S: Into<String>>(&mut self, account_id: S) -> &mut Self {
        self.add_principals([Principal::account(account_id)])
    }

    pub fn add_account_root_principal(&mut self) -> &mut Self {
        self.add_principals([Principal::account_root()])
    }

    pub fn add_canonical_user_principal<S: Into<String>>(&mut self, canonical_user_id: S) -> &mut Self {
        self.add_principals([Principal::canonical_user(canonical_user_id)])
    }

    pub fn add_federated_principal<S: Into<String>>(&mut self, federated: S, conditions: Conditions) -> &mut Self {
        self.add_principals([Principal::federated(federated, conditions)])
    }

    pub fn add_any_principal(&mut self) -> &mut Self {
        self.add_principals([Principal::any()])
    }

    /// Merges the keys in `value` into the condition block for `operator`. A key already present under the operator
    /// is overwritten; other keys, including those folded in from principals, are kept.
    pub fn add_condition<S: Into<String>>(&mut self, operator: S, value: Value) -> &mut Self {
        self.conditions.merge(operator, value);
        self
    }

    /// Calls [`PolicyStatement::add_condition`] for every operator in `conditions`.
    pub fn add_conditions(&mut self, conditions: &Conditions) -> &mut Self {
        self.conditions.merge_all(conditions);
        self
    }

    /// Restricts the statement to callers presenting `account_id` as their external id.
    pub fn add_account_condition<S: Into<String>>(&mut self, account_id: S) -> &mut Self {
        self.add_condition("StringEquals", json!({ "sts:ExternalId": account_id.into() }))
    }

    #[inline]
    pub fn has_principal(&self) -> bool {
        !self.principals.is_empty() || !self.not_principals.is_empty()
    }

    #[inline]
    pub fn has_resource(&self) -> bool {
        !self.resources.is_empty() || !self.not_resources.is_empty()
    }

    /// True when the statement uses any of `NotAction`, `NotResource` or `NotPrincipal`.
    #[inline]
    pub fn has_negations(&self) -> bool {
        !self.not_actions.is_empty() || !self.not_resources.is_empty() || !self.not_principals.is_empty()
    }

    /// The merged `Principal` element.
    pub fn principal_fragment(&self) -> PrincipalPolicyFragment {
        merged_fragment(&self.principals)
    }

    /// The merged `NotPrincipal` element.
    pub fn not_principal_fragment(&self) -> PrincipalPolicyFragment {
        merged_fragment(&self.not_principals)
    }

    /// Problems that make this statement invalid in any kind of policy. An empty list means valid.
    pub fn validate_for_any_policy(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.actions.is_empty() && self.not_actions.is_empty() {
            errors.push("A PolicyStatement must specify at least one 'action' or 'notAction'.".to_string());
        }

        for action in self.actions.iter().chain(self.not_actions.iter()) {
            if !is_valid_action(action) {
                errors.push(invalid_action_message(action));
            }
        }

        if let Some(sid) = &self.sid {
            if !SID.is_match(sid) {
                errors.push(format!(
                    "Statement ID (sid) must be alphanumeric. Got '{}'. The Sid element supports ASCII uppercase \
                     letters (A-Z), lowercase letters (a-z), and numbers (0-9).",
                    sid
                ));
            }
        }

        if self.not_principals.iter().any(Principal::has_conditions) {
            errors.push("Cannot add a NotPrincipal with conditions to a PolicyStatement.".to_string());
        }

        errors
    }

    /// Problems that make this statement invalid in an identity-based policy.
    pub fn validate_for_identity_policy(&self) -> Vec<String> {
        let mut errors = self.validate_for_any_policy();

        if self.has_principal() {
            errors.push(
                "A PolicyStatement used in an identity-based policy cannot specify any IAM principals.".to_string(),
            );
        }

        if !self.has_resource() {
            errors.push(
                "A PolicyStatement used in an identity-based policy must specify at least one resource.".to_string(),
            );
        }

        errors
    }

    /// Problems that make this statement invalid in a resource-based (or trust) policy.
    pub fn validate_for_resource_policy(&self) -> Vec<String> {
        let mut errors = self.validate_for_any_policy();

        if !self.has_principal() {
            errors.push(
                "A PolicyStatement used in a resource-based policy must specify at least one IAM principal."
                    .to_string(),
            );
        }

        errors
    }

    /// Renders the statement. Empty elements are omitted and one-element lists are written bare.
    pub fn to_statement_json(&self) -> Value {
        let mut map = Map::new();

        if let Some(sid) = &self.sid {
            map.insert("Sid".to_string(), Value::String(sid.clone()));
        }

        map.insert("Effect".to_string(), Value::String(self.effect.to_string()));
        insert_list(&mut map, "Action", &self.actions);
        insert_list(&mut map, "NotAction", &self.not_actions);
        insert_list(&mut map, "Resource", &self.resources);
        insert_list(&mut map, "NotResource", &self.not_resources);

        if !self.principals.is_empty() {
            map.insert("Principal".to_string(), self.principal_fragment().to_json());
        }

        if !self.not_principals.is_empty() {
            map.insert("NotPrincipal".to_string(), self.not_principal_fragment().to_json());
        }

        if !self.conditions.is_empty() {
            map.insert("Condition".to_string(), conditions_json(&self.conditions));
        }

        Value::Object(map)
    }

    /// A new statement equal to this one except for the fields set in `overrides`. List-valued overrides replace the
    /// original list.
    pub fn copy(&self, overrides: PolicyStatementProps) -> Self {
        Self::from_props(PolicyStatementProps {
            sid: overrides.sid.or_else(|| self.sid.clone()),
            effect: overrides.effect.or(Some(self.effect)),
            actions: overrides.actions.or_else(|| Some(self.actions.clone())),
            not_actions: overrides.not_actions.or_else(|| Some(self.not_actions.clone())),
            resources: overrides.resources.or_else(|| Some(self.resources.clone())),
            not_resources: overrides.not_resources.or_else(|| Some(self.not_resources.clone())),
            principals: overrides.principals.or_else(|| Some(self.principals.clone())),
            not_principals: overrides.not_principals.or_else(|| Some(self.not_principals.clone())),
            conditions: overrides.conditions.or_else(|| Some(self.conditions.clone())),
        })
    }

    pub(crate) fn principals_mut(&mut self) -> &mut Vec<Principal> {
        &mut self.principals
    }

    pub(crate) fn actions_mut(&mut self) -> &mut Vec<String> {
        &mut self.actions
    }

    pub(crate) fn resources_mut(&mut self) -> &mut Vec<String> {
        &mut self.resources
    }

    pub(crate) fn clear_sid(&mut self) {
        self.sid = None;
    }
}

fn merged_fragment(principals: &[Principal]) -> PrincipalPolicyFragment {
    let mut fragment = PrincipalPolicyFragment::new();
    for principal in principals {
        fragment.merge(&principal.policy_fragment());
    }
    fragment
}

fn insert_list(map: &mut Map<String, Value>, key: &str, values: &[String]) {
    match values {
        [] => (),
        [single] => {
            map.insert(key.to_string(), Value::String(single.clone()));
        }
        many => {
            map.insert(key.to_string(), Value::Array(many.iter().cloned().map(Value::String).collect()));
        }
    }
}

fn conditions_json(conditions: &Conditions) -> Value {
    let mut map = Map::new();
    for (operator, value) in conditions.iter() {
        map.insert(operator.clone(), value.clone());
    }
    Value::Object(map)
}

display_json!(PolicyStatement);
from_str_json!(PolicyStatement);

impl Serialize for PolicyStatement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_statement_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PolicyStatement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PolicyStatementVisitor {})
    }
}

struct PolicyStatementVisitor;

impl<'de> Visitor<'de> for PolicyStatementVisitor {
    type Value = PolicyStatement;

    fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("a map of statement properties")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PolicyStatement, A::Error> {
        let mut statement = PolicyStatement::new();
        let mut sid_seen = false;
        let mut effect_seen = false;
        let mut action_seen = false;
        let mut not_action_seen = false;
        let mut resource_seen = false;
        let mut not_resource_seen = false;
        let mut principal_seen = false;
        let mut not_principal_seen = false;
        let mut condition_seen = false;

        while let Some(key) = access.next_key::<String>()? {
            match key.as_str() {
                "Sid" => {
                    if sid_seen {
                        return Err(de::Error::duplicate_field("Sid"));
                    }

                    sid_seen = true;
                    statement.set_sid(access.next_value::<String>()?);
                }
                "Effect" => {
                    if effect_seen {
                        return Err(de::Error::duplicate_field("Effect"));
                    }

                    effect_seen = true;
                    statement.set_effect(access.next_value::<Effect>()?);
                }
                "Action" => {
                    if action_seen {
                        return Err(de::Error::duplicate_field("Action"));
                    }

                    action_seen = true;
                    statement.add_actions(access.next_value::<StringList>()?.into_vec());
                }
                "NotAction" => {
                    if not_action_seen {
                        return Err(de::Error::duplicate_field("NotAction"));
                    }

                    not_action_seen = true;
                    statement.add_not_actions(access.next_value::<StringList>()?.into_vec());
                }
                "Resource" => {
                    if resource_seen {
                        return Err(de::Error::duplicate_field("Resource"));
                    }

                    resource_seen = true;
                    statement.add_resources(access.next_value::<StringList>()?.into_vec());
                }
                "NotResource" => {
                    if not_resource_seen {
                        return Err(de::Error::duplicate_field("NotResource"));
                    }

                    not_resource_seen = true;
                    statement.add_not_resources(access.next_value::<StringList>()?.into_vec());
                }
                "Principal" => {
                    if principal_seen {
                        return Err(de::Error::duplicate_field("Principal"));
                    }

                    principal_seen = true;
                    let principals = principals_from_json(access.next_value()?).map_err(de::Error::custom)?;
                    statement.add_principals(principals);
                }
                "NotPrincipal" => {
                    if not_principal_seen {
                        return Err(de::Error::duplicate_field("NotPrincipal"));
                    }

                    not_principal_seen = true;
                    let principals = principals_from_json(access.next_value()?).map_err(de::Error::custom)?;
                    statement.add_not_principals(principals);
                }
                "Condition" => {
                    if condition_seen {
                        return Err(de::Error::duplicate_field("Condition"));
                    }

                    condition_seen = true;
                    statement.add_conditions(&access.next_value::<Conditions>()?);
                }
                _ => {
                    return Err(de::Error::unknown_field(
                        &key,
                        &[
                            "Sid",
                            "Effect",
                            "Action",
                            "NotAction",
                            "Resource",
                            "NotResource",
                            "Principal",
                            "NotPrincipal",
                            "Condition",
                        ],
                    ));
                }
            }
        }

        if !effect_seen {
            return Err(de::Error::missing_field("Effect"));
        }

        Ok(statement)
    }
}
