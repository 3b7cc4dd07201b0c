#![warn(clippy::all)]

//! Authoring of AWS IAM policy documents and resolution of permission grants.
//!
//! Statements are built up incrementally, collected into [`PolicyDocument`]s and rendered to the IAM JSON policy
//! grammar. A [`Grant`] decides whether a permission is recorded on the grantee's identity policy, on the resource's
//! policy, on both, or nowhere.

pub(crate) mod action;
pub(crate) mod condition;
pub(crate) mod effect;
pub(crate) mod error;
pub(crate) mod grant;
pub(crate) mod identity;
pub(crate) mod merge;
pub(crate) mod policy;
pub(crate) mod principal;
pub(crate) mod resource;
pub(crate) mod statement;

#[macro_use]
pub(crate) mod serutil;

pub use {
    condition::{ConditionMap, Conditions},
    effect::Effect,
    error::PolicyError,
    grant::{
        AddToPrincipalPolicyResult, DependencyEdge, Grant, GrantOptions, GrantOptionsBuilder,
        GrantOptionsBuilderError, Grantee,
    },
    identity::{
        template_arn, ManagedPolicy, Policy, Role, RoleProps, RolePropsBuilder, RolePropsBuilderError, PASS_ROLE,
    },
    policy::{
        PolicyDocument, PolicyDocumentProps, PolicyDocumentPropsBuilder, PolicyDocumentPropsBuilderError,
        PolicyVersion,
    },
    principal::{
        CompositePrincipal, Principal, PrincipalPolicyFragment, ASSUME_ROLE, ASSUME_ROLE_WITH_SAML,
        ASSUME_ROLE_WITH_WEB_IDENTITY, TAG_SESSION,
    },
    resource::{AddToResourcePolicyResult, DependableRef, ResourcePolicy, ResourceWithPolicy},
    serutil::StringList,
    statement::{
        PolicyStatement, PolicyStatementProps, PolicyStatementPropsBuilder, PolicyStatementPropsBuilderError,
        SharedStatement,
    },
};
