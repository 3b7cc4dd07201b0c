use {
    iam_grant::{
        AddToPrincipalPolicyResult, Grant, GrantOptions, Grantee, PolicyDocument, PolicyDocumentProps, PolicyStatement,
        Principal, ResourcePolicy, Role, SharedStatement,
    },
    pretty_assertions::assert_eq,
    serde_json::json,
};

/// A grantee whose identity policy never takes statements.
struct Anonymous;

impl Grantee for Anonymous {
    fn grant_principal(&self) -> Principal {
        Principal::arn("arn:aws:iam::111111111111:user/anonymous")
    }

    fn add_to_principal_policy(&mut self, _statement: SharedStatement) -> AddToPrincipalPolicyResult {
        AddToPrincipalPolicyResult::not_added()
    }
}

fn options(actions: &[&str], resources: &[&str]) -> GrantOptions {
    GrantOptions::new(
        actions.iter().map(|s| s.to_string()).collect(),
        resources.iter().map(|s| s.to_string()).collect(),
    )
}

#[test_log::test]
fn test_bucket_policy_document() {
    let mut statement = PolicyStatement::new();
    statement
        .add_actions(["s3:GetObject"])
        .add_resources(["arn:aws:s3:::bucket/*"])
        .add_principals([Principal::account_root()]);

    let mut document = PolicyDocument::new();
    document.add_statements([statement]);

    assert_eq!(
        document.to_json().to_string(),
        r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":"s3:GetObject","Resource":"arn:aws:s3:::bucket/*","Principal":{"AWS":{"Ref":"AWS::AccountId"}}}]}"#
    );
    assert!(document.validate_for_resource_policy().is_empty());

    let parsed = PolicyDocument::from_json(document.resolve()).unwrap();
    assert_eq!(parsed.resolve(), document.resolve());
}

#[test_log::test]
fn test_rendering_is_deterministic() {
    let build = || {
        let mut document = PolicyDocument::with_props(PolicyDocumentProps::builder().minimize(true).build().unwrap());
        for resource in ["arn:aws:s3:::a/*", "arn:aws:s3:::b/*", "arn:aws:s3:::a/*"] {
            let mut statement = PolicyStatement::new();
            statement.add_actions(["s3:GetObject"]).add_resources([resource]);
            document.add_statements([statement]);
        }
        document
    };

    let document = build();
    assert_eq!(document.to_string(), document.to_string());
    assert_eq!(document.to_string(), build().to_string());
    assert_eq!(document.is_empty(), document.statement_count() == 0);
    assert_eq!(
        document.resolve()["Statement"],
        json!([{"Effect": "Allow", "Action": "s3:GetObject", "Resource": ["arn:aws:s3:::a/*", "arn:aws:s3:::b/*"]}])
    );
}

#[test_log::test]
fn test_not_resource_never_minimized() {
    let mut plain = PolicyStatement::new();
    plain.add_actions(["s3:GetObject"]).add_resources(["A"]);
    let mut negated = PolicyStatement::new();
    negated.add_actions(["s3:GetObject"]).add_not_resources(["A"]);

    let document = PolicyDocument::with_props(
        PolicyDocumentProps::builder().minimize(true).statements(vec![plain, negated.clone(), negated]).build().unwrap(),
    );
    assert_eq!(document.resolve()["Statement"].as_array().map(Vec::len), Some(3));
}

#[test_log::test]
fn test_grant_falls_back_to_resource() {
    let mut grantee = Anonymous;
    let mut bucket = ResourcePolicy::new("arn:aws:s3:::bucket");
    let grant = Grant::add_to_principal_or_resource(
        &mut grantee,
        &mut bucket,
        options(&["s3:GetObject"], &["arn:aws:s3:::bucket/*"]),
    );

    assert!(grant.success());
    assert!(grant.principal_statement().is_none());
    assert_eq!(
        bucket.policy_json(),
        Some(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Action": "s3:GetObject",
                "Resource": "arn:aws:s3:::bucket/*",
                "Principal": {"AWS": "arn:aws:iam::111111111111:user/anonymous"}
            }]
        }))
    );
}

#[test_log::test]
fn test_grant_drop_attaches_nothing() {
    let grantee = Anonymous;
    let bucket = ResourcePolicy::new("arn:aws:s3:::bucket");
    let grant = Grant::drop(&grantee, "read");

    assert!(!grant.success());
    assert!(grant.principal_statement().is_none());
    assert!(grant.resource_statement().is_none());
    assert!(bucket.document().is_none());
    assert!(grant.assert_success().is_err());
}

#[test_log::test]
fn test_role_granted_access_to_foreign_bucket() {
    let mut role = Role::with_props(
        iam_grant::RoleProps::builder()
            .role_name("Reader")
            .assumed_by(Principal::service("lambda.amazonaws.com"))
            .account("123456789012")
            .build()
            .unwrap(),
    )
    .unwrap();
    let mut bucket = ResourcePolicy::new("arn:aws:s3:::shared").with_account("210987654321");

    let mut grant = Grant::add_to_principal_or_resource(
        &mut role,
        &mut bucket,
        options(&["s3:GetObject"], &["arn:aws:s3:::shared/*"]),
    );
    grant.assert_success().unwrap();
    grant.apply_before(["ReaderFunction"]);

    assert_eq!(grant.dependency_edges().len(), 2);
    assert_eq!(
        role.default_policy().unwrap().document().resolve()["Statement"][0],
        json!({"Effect": "Allow", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::shared/*"})
    );
    assert_eq!(
        bucket.policy_json().unwrap()["Statement"][0]["Principal"],
        json!({"AWS": "arn:aws:iam::123456789012:role/Reader"})
    );
}

#[test_log::test]
fn test_role_grant_with_unresolved_accounts_stays_on_role() {
    let mut role = Role::new("Reader", Principal::service("lambda.amazonaws.com"));
    let mut bucket = ResourcePolicy::new("arn:aws:s3:::bucket");

    let grant = Grant::add_to_principal_or_resource(
        &mut role,
        &mut bucket,
        options(&["s3:GetObject"], &["arn:aws:s3:::bucket/*"]),
    );

    assert!(grant.success());
    assert!(grant.principal_statement().is_some());
    assert!(grant.resource_statement().is_none());
    assert!(bucket.policy_json().is_none());
    assert_eq!(role.default_policy().unwrap().document().statement_count(), 1);
}
