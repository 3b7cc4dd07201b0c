use {
    crate::{
        serutil::{same_elements, union_into},
        PolicyStatement,
    },
    log::trace,
};

/// The one element in which two otherwise identical statements differ.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Difference {
    None,
    Principals,
    Resources,
    Actions,
}

/// Combines statements that differ in at most one of their principals, resources or actions.
///
/// Statements with a Sid or with any `NotAction`, `NotResource` or `NotPrincipal` element are passed through
/// untouched. Combined statements take the position of the first statement of their group; the differing element is
/// the union of the group's elements in the order first seen. Passes repeat until nothing more combines.
pub(crate) fn minimize_statements(statements: Vec<PolicyStatement>) -> Vec<PolicyStatement> {
    let mut current = statements;

    loop {
        let before = current.len();
        let mut merged: Vec<PolicyStatement> = Vec::with_capacity(before);

        'next: for statement in current {
            for (index, existing) in merged.iter_mut().enumerate() {
                if let Some(difference) = difference(existing, &statement) {
                    trace!("Combining statement into position {} ({:?} differ)", index, difference);
                    combine(existing, &statement, difference);
                    continue 'next;
                }
            }

            merged.push(statement);
        }

        if merged.len() == before {
            return merged;
        }

        trace!("Minimization pass reduced {} statements to {}", before, merged.len());
        current = merged;
    }
}

fn is_mergeable(statement: &PolicyStatement) -> bool {
    statement.sid().is_none() && !statement.has_negations()
}

/// Returns which element differs if `a` and `b` may be combined, or `None` if they may not.
fn difference(a: &PolicyStatement, b: &PolicyStatement) -> Option<Difference> {
    if !is_mergeable(a) || !is_mergeable(b) {
        return None;
    }

    if a.effect() != b.effect() || a.conditions() != b.conditions() {
        return None;
    }

    let principals_differ = !a.principal_fragment().same_principals(&b.principal_fragment());
    let resources_differ = !same_elements(a.resources(), b.resources());
    let actions_differ = !same_elements(a.actions(), b.actions());

    match (principals_differ, resources_differ, actions_differ) {
        (false, false, false) => Some(Difference::None),
        (true, false, false) => Some(Difference::Principals),
        (false, true, false) => Some(Difference::Resources),
        (false, false, true) => Some(Difference::Actions),
        _ => None,
    }
}

fn combine(target: &mut PolicyStatement, other: &PolicyStatement, difference: Difference) {
    match difference {
        Difference::None => (),
        Difference::Principals => union_into(target.principals_mut(), other.principals()),
        Difference::Resources => union_into(target.resources_mut(), other.resources()),
        Difference::Actions => union_into(target.actions_mut(), other.actions()),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::minimize_statements,
        crate::{Effect, PolicyStatement},
        pretty_assertions::assert_eq,
        serde_json::{json, Value},
    };

    fn statement(actions: &[&str], resources: &[&str]) -> PolicyStatement {
        let mut s = PolicyStatement::new();
        s.add_actions(actions.iter().copied()).add_resources(resources.iter().copied());
        s
    }

    fn render(statements: Vec<PolicyStatement>) -> Vec<Value> {
        minimize_statements(statements).iter().map(PolicyStatement::to_statement_json).collect()
    }

    #[test_log::test]
    fn test_resources_differ() {
        assert_eq!(
            render(vec![statement(&["s3:GetObject"], &["A"]), statement(&["s3:GetObject"], &["B"])]),
            vec![json!({"Effect": "Allow", "Action": "s3:GetObject", "Resource": ["A", "B"]})]
        );
    }

    #[test_log::test]
    fn test_actions_differ_and_duplicates_drop() {
        assert_eq!(
            render(vec![
                statement(&["s3:GetObject"], &["A"]),
                statement(&["s3:PutObject", "s3:GetObject"], &["A"]),
                statement(&["s3:GetObject"], &["A"]),
            ]),
            vec![json!({"Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"], "Resource": "A"})]
        );
    }

    #[test_log::test]
    fn test_principals_differ() {
        let mut a = statement(&["sts:AssumeRole"], &[]);
        a.add_service_principal("lambda.amazonaws.com");
        let mut b = statement(&["sts:AssumeRole"], &[]);
        b.add_service_principal("ec2.amazonaws.com");

        assert_eq!(
            render(vec![a, b]),
            vec![json!({
                "Effect": "Allow",
                "Action": "sts:AssumeRole",
                "Principal": {"Service": ["lambda.amazonaws.com", "ec2.amazonaws.com"]}
            })]
        );
    }

    #[test_log::test]
    fn test_multiple_differences_not_combined() {
        let statements = vec![statement(&["s3:GetObject"], &["A"]), statement(&["s3:PutObject"], &["B"])];
        assert_eq!(minimize_statements(statements.clone()), statements);
    }

    #[test_log::test]
    fn test_exclusions() {
        let mut not_resource = statement(&["s3:GetObject"], &[]);
        not_resource.add_not_resources(["B"]);
        let mut with_sid = statement(&["s3:GetObject"], &["C"]);
        with_sid.set_sid("Keep");
        let mut deny = statement(&["s3:GetObject"], &["D"]);
        deny.set_effect(Effect::Deny);
        let mut conditional = statement(&["s3:GetObject"], &["E"]);
        conditional.add_condition("Bool", json!({"aws:SecureTransport": "true"}));

        let statements = vec![statement(&["s3:GetObject"], &["A"]), not_resource, with_sid, deny, conditional];
        assert_eq!(minimize_statements(statements.clone()), statements);
    }

    #[test_log::test]
    fn test_first_occurrence_order() {
        assert_eq!(
            render(vec![
                statement(&["s3:GetObject"], &["A"]),
                statement(&["sqs:SendMessage"], &["Q"]),
                statement(&["s3:GetObject"], &["B"]),
                statement(&["sqs:SendMessage"], &["R"]),
            ]),
            vec![
                json!({"Effect": "Allow", "Action": "s3:GetObject", "Resource": ["A", "B"]}),
                json!({"Effect": "Allow", "Action": "sqs:SendMessage", "Resource": ["Q", "R"]}),
            ]
        );
    }

    #[test_log::test]
    fn test_repeats_until_stable() {
        // The second statement only becomes combinable with the first after the third has been folded in.
        assert_eq!(
            render(vec![
                statement(&["s3:GetObject"], &["A"]),
                statement(&["s3:GetObject", "s3:PutObject"], &["A", "B"]),
                statement(&["s3:GetObject"], &["B"]),
            ]),
            vec![json!({"Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"], "Resource": ["A", "B"]})]
        );
        assert!(minimize_statements(Vec::new()).is_empty());
    }
}
