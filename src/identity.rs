use {
    crate::{
        principal::aws, AddToPrincipalPolicyResult, Conditions, DependableRef, Grant, GrantOptions, Grantee,
        PolicyDocument, PolicyError, PolicyStatement, Principal, SharedStatement,
    },
    derive_builder::Builder,
    log::debug,
    serde_json::{json, Map, Value},
};

pub const PASS_ROLE: &str = "iam:PassRole";

/// A named policy document attached inline to roles.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Policy {
    name: String,
    document: PolicyDocument,
    roles: Vec<String>,
}

impl Policy {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_document<S: Into<String>>(name: S, document: PolicyDocument) -> Self {
        Self {
            name: name.into(),
            document,
            roles: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    #[inline]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn add_statements<I: IntoIterator<Item = PolicyStatement>>(&mut self, statements: I) -> &mut Self {
        self.document.add_statements(statements);
        self
    }

    pub fn add_shared_statement(&mut self, statement: SharedStatement) -> &mut Self {
        self.document.add_shared_statement(statement);
        self
    }

    /// Attaches the policy to a role by name. Attaching to the same role twice has no effect.
    pub fn attach_to_role<S: Into<String>>(&mut self, role_name: S) {
        let role_name = role_name.into();
        if !self.roles.contains(&role_name) {
            self.roles.push(role_name);
        }
    }

    #[inline]
    pub fn dependable(&self) -> DependableRef {
        DependableRef::new(self.name.as_str())
    }

    pub fn validate(&self) -> Vec<String> {
        self.document.validate_for_identity_policy()
    }

    pub fn to_cfn_properties(&self) -> Value {
        let mut map = Map::new();
        map.insert("PolicyName".to_string(), Value::String(self.name.clone()));
        map.insert("PolicyDocument".to_string(), self.document.resolve());
        if !self.roles.is_empty() {
            map.insert("Roles".to_string(), json!(self.roles));
        }
        Value::Object(map)
    }
}

/// A standalone policy that can be attached to any number of identities by ARN.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ManagedPolicy {
    name: String,
    description: Option<String>,
    path: String,
    account: Option<String>,
    document: PolicyDocument,
}

impl ManagedPolicy {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            ..Default::default()
        }
    }

    /// The ARN of a policy managed by AWS, e.g. `ReadOnlyAccess`.
    pub fn aws_managed_policy_arn(name: &str) -> String {
        format!("arn:aws:iam::aws:policy/{}", name)
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_account<S: Into<String>>(mut self, account: S) -> Self {
        self.account = Some(account.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[inline]
    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    /// The policy ARN. Without a known account the account is written as the `${AWS::AccountId}` substitution.
    pub fn arn(&self) -> String {
        format!("arn:aws:iam::{}:policy{}{}", account_or_substitution(&self.account), self.path, self.name)
    }

    /// The ARN as written into templates. See [`template_arn`].
    #[inline]
    pub fn arn_value(&self) -> Value {
        template_arn(&self.arn())
    }

    pub fn add_statements<I: IntoIterator<Item = PolicyStatement>>(&mut self, statements: I) -> &mut Self {
        self.document.add_statements(statements);
        self
    }

    pub fn validate(&self) -> Vec<String> {
        self.document.validate_for_identity_policy()
    }

    pub fn to_cfn_properties(&self) -> Value {
        let mut map = Map::new();
        map.insert("ManagedPolicyName".to_string(), Value::String(self.name.clone()));
        if let Some(description) = &self.description {
            map.insert("Description".to_string(), Value::String(description.clone()));
        }
        map.insert("Path".to_string(), Value::String(self.path.clone()));
        map.insert("PolicyDocument".to_string(), self.document.resolve());
        Value::Object(map)
    }
}

fn account_or_substitution(account: &Option<String>) -> &str {
    account.as_deref().unwrap_or("${AWS::AccountId}")
}

/// An ARN containing the `${AWS::AccountId}` substitution is wrapped in `Fn::Sub`; any other ARN is a plain string.
pub fn template_arn(arn: &str) -> Value {
    if arn.contains("${AWS::AccountId}") {
        json!({ "Fn::Sub": arn })
    } else {
        Value::String(arn.to_string())
    }
}

/// Initial values for a [`Role`].
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
pub struct RoleProps {
    #[builder(setter(into))]
    role_name: String,

    /// Who may assume the role.
    #[builder(setter(into))]
    assumed_by: Principal,

    #[builder(setter(into, strip_option), default)]
    account: Option<String>,

    #[builder(setter(into, strip_option), default)]
    description: Option<String>,

    /// Values the assuming party must present as `sts:ExternalId`.
    #[builder(setter(into), default)]
    external_ids: Vec<String>,

    #[builder(setter(into), default)]
    managed_policy_arns: Vec<String>,

    #[builder(setter(into), default)]
    inline_policies: Vec<Policy>,
}

impl RoleProps {
    pub fn builder() -> RolePropsBuilder {
        RolePropsBuilder::default()
    }
}

/// An IAM role: a trust policy naming who may assume it, plus the identity policies granting it permissions.
///
/// Statements granted to the role go to a single default policy created on first use. Roles imported by ARN have no
/// trust policy here and, unless imported as mutable, silently accept and discard statements.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Role {
    name: String,
    account: Option<String>,
    arn: String,
    description: Option<String>,
    assume_role_policy: Option<PolicyDocument>,
    default_policy: Option<Policy>,
    default_policy_name: String,
    inline_policies: Vec<Policy>,
    managed_policy_arns: Vec<String>,
    mutable: bool,
}

impl Role {
    pub fn new<S: Into<String>>(name: S, assumed_by: Principal) -> Self {
        let name = name.into();
        let arn = role_arn(&None, &name);
        let default_policy_name = format!("{}DefaultPolicy", name);

        Self {
            assume_role_policy: Some(trust_policy(&assumed_by, &[])),
            name,
            account: None,
            arn,
            description: None,
            default_policy: None,
            default_policy_name,
            inline_policies: Vec::new(),
            managed_policy_arns: Vec::new(),
            mutable: true,
        }
    }

    pub fn with_props(props: RoleProps) -> Result<Self, PolicyError> {
        let mut role = Self::new(props.role_name, props.assumed_by.clone());
        role.arn = role_arn(&props.account, &role.name);
        role.account = props.account;
        role.description = props.description;
        role.assume_role_policy = Some(trust_policy(&props.assumed_by, &props.external_ids));

        for arn in props.managed_policy_arns {
            role.add_managed_policy(arn);
        }

        for policy in props.inline_policies {
            role.attach_inline_policy(policy)?;
        }

        Ok(role)
    }

    /// A role defined elsewhere. The name and account are taken from the ARN. Statements granted to an immutable
    /// role are reported as added but recorded nowhere.
    pub fn from_role_arn<S: Into<String>>(arn: S, mutable: bool) -> Self {
        let arn = arn.into();
        let resource = arn.splitn(6, ':').nth(5).unwrap_or_default();
        let name = resource.rsplit('/').next().unwrap_or_default().to_string();

        Self {
            account: aws::account_of(&Value::String(arn.clone())),
            default_policy_name: format!("{}Policy", name),
            name,
            arn,
            description: None,
            assume_role_policy: None,
            default_policy: None,
            inline_policies: Vec::new(),
            managed_policy_arns: Vec::new(),
            mutable,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn arn(&self) -> &str {
        &self.arn
    }

    /// The ARN as written into policies and templates. See [`template_arn`].
    #[inline]
    pub fn arn_value(&self) -> Value {
        template_arn(&self.arn)
    }

    #[inline]
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// The trust policy. Imported roles have none.
    #[inline]
    pub fn assume_role_policy(&self) -> Option<&PolicyDocument> {
        self.assume_role_policy.as_ref()
    }

    #[inline]
    pub fn default_policy(&self) -> Option<&Policy> {
        self.default_policy.as_ref()
    }

    #[inline]
    pub fn inline_policies(&self) -> &[Policy] {
        &self.inline_policies
    }

    #[inline]
    pub fn managed_policy_arns(&self) -> &[String] {
        &self.managed_policy_arns
    }

    /// Adds a statement to the role's default policy. Returns whether the statement was accepted.
    pub fn add_to_policy(&mut self, statement: PolicyStatement) -> bool {
        self.add_to_principal_policy(statement.into_shared()).statement_added
    }

    pub fn attach_inline_policy(&mut self, mut policy: Policy) -> Result<(), PolicyError> {
        let taken = policy.name() == self.default_policy_name
            || self.inline_policies.iter().any(|existing| existing.name() == policy.name());
        if taken {
            return Err(PolicyError::DuplicatePolicyName(policy.name().to_string()));
        }

        policy.attach_to_role(self.name.as_str());
        self.inline_policies.push(policy);
        Ok(())
    }

    /// Attaches a managed policy by ARN. Attaching the same ARN twice has no effect.
    pub fn add_managed_policy<S: Into<String>>(&mut self, arn: S) {
        let arn = arn.into();
        if !self.managed_policy_arns.contains(&arn) {
            self.managed_policy_arns.push(arn);
        }
    }

    /// Grants `actions` on this role to `grantee`.
    pub fn grant<I, S>(&self, grantee: &mut dyn Grantee, actions: I) -> Grant
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = GrantOptions::new(actions.into_iter().map(Into::into).collect(), vec![self.arn.clone()]);
        Grant::add_to_principal(grantee, options)
    }

    /// Allows `grantee` to pass this role to a service.
    pub fn grant_pass_role(&self, grantee: &mut dyn Grantee) -> Grant {
        self.grant(grantee, [PASS_ROLE])
    }

    /// Allows `grantee` to assume this role. The trust policy must also admit the grantee.
    pub fn grant_assume_role(&self, grantee: &mut dyn Grantee) -> Grant {
        self.grant(grantee, [crate::principal::ASSUME_ROLE])
    }

    /// Problems with the role's policies. The trust policy is checked as a resource policy, everything else as
    /// identity policies.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(trust) = &self.assume_role_policy {
            errors.extend(trust.validate_for_resource_policy());
        }
        for policy in self.default_policy.iter().chain(self.inline_policies.iter()) {
            errors.extend(policy.validate());
        }
        errors
    }

    /// The role's own properties. The default policy is a separate policy and is not included here; see
    /// [`Role::default_policy`].
    pub fn to_cfn_properties(&self) -> Value {
        let mut map = Map::new();
        map.insert("RoleName".to_string(), Value::String(self.name.clone()));
        if let Some(trust) = &self.assume_role_policy {
            map.insert("AssumeRolePolicyDocument".to_string(), trust.resolve());
        }
        if let Some(description) = &self.description {
            map.insert("Description".to_string(), Value::String(description.clone()));
        }
        if !self.inline_policies.is_empty() {
            let policies = self
                .inline_policies
                .iter()
                .map(|policy| json!({"PolicyName": policy.name(), "PolicyDocument": policy.document().resolve()}))
                .collect();
            map.insert("Policies".to_string(), Value::Array(policies));
        }
        if !self.managed_policy_arns.is_empty() {
            let arns = self.managed_policy_arns.iter().map(|arn| template_arn(arn)).collect();
            map.insert("ManagedPolicyArns".to_string(), Value::Array(arns));
        }
        Value::Object(map)
    }
}

impl Grantee for Role {
    fn grant_principal(&self) -> Principal {
        Principal::arn(self.arn_value())
    }

    fn add_to_principal_policy(&mut self, statement: SharedStatement) -> AddToPrincipalPolicyResult {
        if !self.mutable {
            debug!("Role {} is immutable; not recording statement", self.arn);
            return AddToPrincipalPolicyResult::added(None);
        }

        let role_name = &self.name;
        let policy_name = &self.default_policy_name;
        let default_policy = self.default_policy.get_or_insert_with(|| {
            debug!("Creating default policy {} for role {}", policy_name, role_name);
            let mut policy = Policy::new(policy_name.as_str());
            policy.attach_to_role(role_name.as_str());
            policy
        });

        default_policy.add_shared_statement(statement);
        AddToPrincipalPolicyResult::added(Some(default_policy.dependable()))
    }

    fn principal_account(&self) -> Option<String> {
        self.account.clone()
    }
}

fn role_arn(account: &Option<String>, name: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", account_or_substitution(account), name)
}

fn trust_policy(assumed_by: &Principal, external_ids: &[String]) -> PolicyDocument {
    let mut document = PolicyDocument::new();
    document.set_minimize(true);
    assumed_by.add_to_assume_role_policy(&mut document);

    if !external_ids.is_empty() {
        let external_id = match external_ids {
            [single] => json!(single),
            many => json!(many),
        };
        let mut conditions = Conditions::new();
        conditions.set("StringEquals", json!({ "sts:ExternalId": external_id }));
        for statement in document.statements() {
            statement.borrow_mut().add_conditions(&conditions);
        }
    }

    document
}
