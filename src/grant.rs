use {
    crate::{
        AddToResourcePolicyResult, Conditions, DependableRef, PolicyError, PolicyStatement, Principal,
        ResourceWithPolicy, SharedStatement,
    },
    derive_builder::Builder,
    log::{debug, warn},
};

/// Outcome of offering a statement to a principal's identity policy.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AddToPrincipalPolicyResult {
    pub statement_added: bool,
    pub policy_dependable: Option<DependableRef>,
}

impl AddToPrincipalPolicyResult {
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

/// Something permissions can be granted to.
pub trait Grantee {
    /// The principal that resource policies should name for this grantee.
    fn grant_principal(&self) -> Principal;

    /// Records `statement` on the grantee's identity policy if it has one.
    fn add_to_principal_policy(&mut self, statement: SharedStatement) -> AddToPrincipalPolicyResult;

    /// The account the grantee lives in, when known.
    fn principal_account(&self) -> Option<String> {
        self.grant_principal().principal_account()
    }
}

/// Bare principals have no identity policy of their own.
impl Grantee for Principal {
    fn grant_principal(&self) -> Principal {
        self.clone()
    }

    fn add_to_principal_policy(&mut self, _statement: SharedStatement) -> AddToPrincipalPolicyResult {
        AddToPrincipalPolicyResult::not_added()
    }
}

/// What a grant allows.
#[derive(Builder, Clone, Debug, Default, Eq, PartialEq)]
pub struct GrantOptions {
    #[builder(setter(into))]
    actions: Vec<String>,

    /// ARNs named in the identity policy statement (and in the resource statement unless `resource_self_arns` is
    /// set).
    #[builder(setter(into), default)]
    resource_arns: Vec<String>,

    #[builder(setter(into, strip_option), default)]
    conditions: Option<Conditions>,

    /// ARNs a resource policy uses to refer to the resource itself, e.g. `"*"`.
    #[builder(setter(into, strip_option), default)]
    resource_self_arns: Option<Vec<String>>,

    /// Principal to name in the resource policy instead of the grantee's own principal.
    #[builder(setter(into, strip_option), default)]
    resource_policy_principal: Option<Principal>,
}

impl GrantOptions {
    pub fn new(actions: Vec<String>, resource_arns: Vec<String>) -> Self {
        Self {
            actions,
            resource_arns,
            ..Default::default()
        }
    }

    pub fn builder() -> GrantOptionsBuilder {
        GrantOptionsBuilder::default()
    }

    #[inline]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    #[inline]
    pub fn resource_arns(&self) -> &[String] {
        &self.resource_arns
    }

    #[inline]
    pub fn conditions(&self) -> Option<&Conditions> {
        self.conditions.as_ref()
    }

    #[inline]
    pub fn resource_self_arns(&self) -> Option<&[String]> {
        self.resource_self_arns.as_deref()
    }

    #[inline]
    pub fn resource_policy_principal(&self) -> Option<&Principal> {
        self.resource_policy_principal.as_ref()
    }

    fn principal_statement(&self) -> PolicyStatement {
        let mut statement = PolicyStatement::new();
        statement.add_actions(self.actions.iter().cloned()).add_resources(self.resource_arns.iter().cloned());
        if let Some(conditions) = &self.conditions {
            statement.add_conditions(conditions);
        }
        statement
    }

    fn resource_statement(&self, principal: Principal) -> PolicyStatement {
        let resources = self.resource_self_arns.as_ref().unwrap_or(&self.resource_arns);
        let mut statement = PolicyStatement::new();
        statement.add_actions(self.actions.iter().cloned()).add_resources(resources.iter().cloned());
        statement.add_principals([principal]);
        if let Some(conditions) = &self.conditions {
            statement.add_conditions(conditions);
        }
        statement
    }
}

/// A dependency recorded by [`Grant::apply_before`]: `dependent` may only be deployed after `dependency`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DependencyEdge {
    pub dependent: String,
    pub dependency: DependableRef,
}

/// The result of granting permissions: which statements were recorded, and where.
#[derive(Clone, Debug)]
pub struct Grant {
    grantee: Principal,
    options: GrantOptions,
    intent: Option<String>,
    principal_statement: Option<SharedStatement>,
    resource_statement: Option<SharedStatement>,
    dependables: Vec<DependableRef>,
    dependency_edges: Vec<DependencyEdge>,
}

impl Grant {
    fn empty(grantee: Principal, options: GrantOptions) -> Self {
        Self {
            grantee,
            options,
            intent: None,
            principal_statement: None,
            resource_statement: None,
            dependables: Vec::new(),
            dependency_edges: Vec::new(),
        }
    }

    /// Grants the permissions on the grantee's identity policy only.
    pub fn add_to_principal(grantee: &mut dyn Grantee, options: GrantOptions) -> Self {
        let statement = options.principal_statement().into_shared();
        let result = grantee.add_to_principal_policy(statement.clone());
        let mut grant = Self::empty(grantee.grant_principal(), options);

        if result.statement_added {
            grant.principal_statement = Some(statement);
            grant.dependables.extend(result.policy_dependable);
        }

        grant
    }

    /// Grants the permissions on the grantee's identity policy if possible. The resource's policy is used when the
    /// grantee could not take the statement, or when both accounts are known and differ.
    pub fn add_to_principal_or_resource(
        grantee: &mut dyn Grantee,
        resource: &mut dyn ResourceWithPolicy,
        options: GrantOptions,
    ) -> Self {
        let mut grant = Self::add_to_principal(grantee, options);

        let cross_account = match (grantee.principal_account(), resource.account()) {
            (Some(principal_account), Some(resource_account)) => principal_account != resource_account,
            _ => false,
        };

        if grant.principal_statement.is_some() && !cross_account {
            return grant;
        }

        debug!("Adding grant for {} to the resource policy", grant.describe());
        let statement = grant.options.resource_statement(grantee.grant_principal());
        grant.record_resource_statement(resource, statement);

        if !grant.success() {
            warn!("{} could not be recorded on either identity or resource policy", grant.describe());
        }

        grant
    }

    /// Grants the permissions on both the grantee's identity policy and the resource's policy.
    pub fn add_to_principal_and_resource(
        grantee: &mut dyn Grantee,
        resource: &mut dyn ResourceWithPolicy,
        options: GrantOptions,
    ) -> Self {
        let mut grant = Self::add_to_principal(grantee, options);
        let principal = match grant.options.resource_policy_principal() {
            Some(principal) => principal.clone(),
            None => grantee.grant_principal(),
        };

        let statement = grant.options.resource_statement(principal);
        grant.record_resource_statement(resource, statement);
        grant
    }

    /// A grant that records nothing, for resources that can take permissions in neither place.
    pub fn drop<S: Into<String>>(grantee: &dyn Grantee, intent: S) -> Self {
        let mut grant = Self::empty(grantee.grant_principal(), GrantOptions::default());
        grant.intent = Some(intent.into());
        grant
    }

    /// Merges two grants. Statements of `self` take precedence; dependables and dependency edges of both are kept.
    pub fn combine(self, other: Grant) -> Self {
        let mut grant = self;
        grant.principal_statement = grant.principal_statement.or(other.principal_statement);
        grant.resource_statement = grant.resource_statement.or(other.resource_statement);
        grant.dependables.extend(other.dependables);
        grant.dependency_edges.extend(other.dependency_edges);
        grant
    }

    fn record_resource_statement(&mut self, resource: &mut dyn ResourceWithPolicy, statement: PolicyStatement) {
        let statement = statement.into_shared();
        let AddToResourcePolicyResult {
            statement_added,
            policy_dependable,
        } = resource.add_to_resource_policy(statement.clone());

        if statement_added {
            self.resource_statement = Some(statement);
            self.dependables.extend(policy_dependable);
        }
    }

    /// True when at least one statement was recorded.
    #[inline]
    pub fn success(&self) -> bool {
        self.principal_statement.is_some() || self.resource_statement.is_some()
    }

    #[inline]
    pub fn principal_statement(&self) -> Option<&SharedStatement> {
        self.principal_statement.as_ref()
    }

    #[inline]
    pub fn resource_statement(&self) -> Option<&SharedStatement> {
        self.resource_statement.as_ref()
    }

    #[inline]
    pub fn options(&self) -> &GrantOptions {
        &self.options
    }

    /// What a dropped grant was meant to allow.
    #[inline]
    pub fn intent(&self) -> Option<&str> {
        self.intent.as_deref()
    }

    #[inline]
    pub fn grantee(&self) -> &Principal {
        &self.grantee
    }

    #[inline]
    pub fn dependables(&self) -> &[DependableRef] {
        &self.dependables
    }

    #[inline]
    pub fn dependency_edges(&self) -> &[DependencyEdge] {
        &self.dependency_edges
    }

    pub fn assert_success(&self) -> Result<(), PolicyError> {
        if self.success() {
            Ok(())
        } else {
            Err(PolicyError::GrantUnsuccessful(self.describe()))
        }
    }

    /// Declares that each of `constructs` depends on every policy this grant recorded a statement in.
    pub fn apply_before<I, S>(&mut self, constructs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for construct in constructs {
            let construct = construct.into();
            for dependable in self.dependables.iter() {
                let edge = DependencyEdge {
                    dependent: construct.clone(),
                    dependency: dependable.clone(),
                };
                if !self.dependency_edges.contains(&edge) {
                    self.dependency_edges.push(edge);
                }
            }
        }
    }

    fn describe(&self) -> String {
        if let Some(intent) = &self.intent {
            return format!("Permissions for '{}' to {}", self.grantee.policy_fragment().to_json(), intent);
        }

        format!(
            "Permissions for '{}' to call '{}' on '{}'",
            self.grantee.policy_fragment().to_json(),
            self.options.actions.join(","),
            self.options.resource_arns.join(",")
        )
    }
}
