use {
    crate::{PolicyDocument, SharedStatement},
    log::debug,
    serde_json::Value,
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// A handle to something that must exist before a dependent can be deployed, e.g. the policy a statement was
/// recorded in.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DependableRef(String);

impl DependableRef {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl Display for DependableRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Outcome of offering a statement to a resource policy.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AddToResourcePolicyResult {
    pub statement_added: bool,
    pub policy_dependable: Option<DependableRef>,
}

impl AddToResourcePolicyResult {
    pub fn added(policy_dependable: Option<DependableRef>) -> Self {
        Self {
            statement_added: true,
            policy_dependable,
        }
    }

    pub fn not_added() -> Self {
        Self::default()
    }
}

/// A resource that carries its own policy (bucket policy, queue policy, key policy, ...).
pub trait ResourceWithPolicy {
    /// Records `statement` on the resource's policy if the resource accepts it.
    fn add_to_resource_policy(&mut self, statement: SharedStatement) -> AddToResourcePolicyResult;

    /// The account the resource lives in, when known.
    fn account(&self) -> Option<String> {
        None
    }
}

/// A resource identified by ARN whose policy document is created the first time a statement is added.
///
/// Imported resources (see [`ResourcePolicy::imported`]) refuse every statement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourcePolicy {
    arn: String,
    account: Option<String>,
    document: Option<PolicyDocument>,
    mutable: bool,
}

impl ResourcePolicy {
    pub fn new<S: Into<String>>(arn: S) -> Self {
        Self {
            arn: arn.into(),
            account: None,
            document: None,
            mutable: true,
        }
    }

    /// A resource defined elsewhere whose policy cannot be changed from here.
    pub fn imported<S: Into<String>>(arn: S) -> Self {
        Self {
            mutable: false,
            ..Self::new(arn)
        }
    }

    pub fn with_account<S: Into<String>>(mut self, account: S) -> Self {
        self.account = Some(account.into());
        self
    }

    #[inline]
    pub fn arn(&self) -> &str {
        &self.arn
    }

    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// The resource's policy, if any statement has been added.
    #[inline]
    pub fn document(&self) -> Option<&PolicyDocument> {
        self.document.as_ref()
    }

    /// The dependable that stands for this resource's policy.
    pub fn policy_dependable(&self) -> DependableRef {
        DependableRef::new(format!("{}/Policy", self.arn))
    }

    /// The rendered policy, if any statement has been added.
    pub fn policy_json(&self) -> Option<Value> {
        self.document.as_ref().map(PolicyDocument::resolve)
    }
}

impl ResourceWithPolicy for ResourcePolicy {
    fn add_to_resource_policy(&mut self, statement: SharedStatement) -> AddToResourcePolicyResult {
        if !self.mutable {
            debug!("Not adding statement to policy of imported resource {}", self.arn);
            return AddToResourcePolicyResult::not_added();
        }

        self.document.get_or_insert_with(PolicyDocument::new).add_shared_statement(statement);
        AddToResourcePolicyResult::added(Some(self.policy_dependable()))
    }

    fn account(&self) -> Option<String> {
        self.account.clone()
    }
}
