use {
    super::{Principal, PrincipalPolicyFragment},
    crate::PolicyError,
    log::debug,
};

/// Several principals acting as one. The rendered fragment is the same as if each member had been added to a
/// statement individually.
///
/// Members cannot carry conditions of their own: a single statement cannot scope a condition to only some of its
/// principals.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompositePrincipal {
    principals: Vec<Principal>,
}

impl CompositePrincipal {
    pub fn new<I: IntoIterator<Item = Principal>>(principals: I) -> Result<Self, PolicyError> {
        let mut composite = Self::default();
        composite.add_principals(principals)?;
        Ok(composite)
    }

    /// Adds members. Fails on the first member that carries conditions; members before it are kept.
    pub fn add_principals<I: IntoIterator<Item = Principal>>(&mut self, principals: I) -> Result<(), PolicyError> {
        for principal in principals {
            if principal.has_conditions() {
                let rendered = serde_json::to_string(&principal.policy_fragment())?;
                debug!("Rejecting conditional principal from composite: {}", rendered);
                return Err(PolicyError::ConditionalCompositeMember(rendered));
            }
            self.principals.push(principal);
        }
        Ok(())
    }

    #[inline]
    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    pub(crate) fn policy_fragment(&self) -> PrincipalPolicyFragment {
        let mut fragment = PrincipalPolicyFragment::new();
        for principal in self.principals.iter() {
            fragment.merge(&principal.policy_fragment());
        }
        fragment
    }
}
