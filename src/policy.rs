use {
    crate::{
        display_json, from_str_json, merge::minimize_statements, PolicyError, PolicyStatement, SharedStatement,
    },
    derive_builder::Builder,
    log::trace,
    serde::{
        de::{self, Deserializer, MapAccess, Visitor},
        ser::Serializer,
        Deserialize, Serialize,
    },
    serde_json::{Map, Value},
    std::{
        collections::HashSet,
        fmt::{Display, Formatter, Result as FmtResult},
        str::FromStr,
    },
};

/// Policy versions.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PolicyVersion {
    None,
    V2008_10_17,
    V2012_10_17,
}

impl PolicyVersion {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[inline]
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }
}

/// New documents are written with the current grammar version.
impl Default for PolicyVersion {
    fn default() -> Self {
        Self::V2012_10_17
    }
}

impl Display for PolicyVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::None => Ok(()),
            Self::V2008_10_17 => f.write_str("2008-10-17"),
            Self::V2012_10_17 => f.write_str("2012-10-17"),
        }
    }
}

impl<'de> Deserialize<'de> for PolicyVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        PolicyVersion::from_str(&value).map_err(de::Error::custom)
    }
}

impl FromStr for PolicyVersion {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2008-10-17" => Ok(Self::V2008_10_17),
            "2012-10-17" => Ok(Self::V2012_10_17),
            _ => Err(PolicyError::InvalidPolicyVersion(s.to_string())),
        }
    }
}

impl Serialize for PolicyVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Construction options for a [`PolicyDocument`].
#[derive(Builder, Clone, Debug, Default, Eq, PartialEq)]
pub struct PolicyDocumentProps {
    /// Give every statement without a Sid its index in the rendered document as Sid.
    #[builder(setter(into, strip_option), default)]
    assign_sids: Option<bool>,

    /// Combine statements that differ in only one of their principals, resources or actions when rendering.
    #[builder(setter(into, strip_option), default)]
    minimize: Option<bool>,

    #[builder(setter(into, strip_option), default)]
    statements: Option<Vec<PolicyStatement>>,
}

impl PolicyDocumentProps {
    pub fn builder() -> PolicyDocumentPropsBuilder {
        PolicyDocumentPropsBuilder::default()
    }
}

/// An ordered collection of statements rendered as an IAM policy document.
///
/// Statements are held as [`SharedStatement`]s: a statement recorded here may still be refined by whoever added it,
/// and the change shows up the next time the document is rendered. Cloning a document shares its statements.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PolicyDocument {
    version: PolicyVersion,
    id: Option<String>,
    statements: Vec<SharedStatement>,
    assign_sids: bool,
    minimize: bool,
}

impl PolicyDocument {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn builder() -> PolicyDocumentPropsBuilder {
        PolicyDocumentProps::builder()
    }

    pub fn with_props(props: PolicyDocumentProps) -> Self {
        let mut document = Self {
            assign_sids: props.assign_sids.unwrap_or(false),
            minimize: props.minimize.unwrap_or(false),
            ..Default::default()
        };
        document.add_statements(props.statements.unwrap_or_default());
        document
    }

    /// Parses a document from its JSON form. `Statement` may be a list or a single statement object.
    pub fn from_json(value: Value) -> Result<Self, PolicyError> {
        Ok(serde_json::from_value(value)?)
    }

    #[inline]
    pub fn version(&self) -> PolicyVersion {
        self.version
    }

    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id<S: Into<String>>(&mut self, id: S) -> &mut Self {
        self.id = Some(id.into());
        self
    }

    #[inline]
    pub fn assign_sids(&self) -> bool {
        self.assign_sids
    }

    #[inline]
    pub fn minimize(&self) -> bool {
        self.minimize
    }

    pub fn set_assign_sids(&mut self, assign_sids: bool) -> &mut Self {
        self.assign_sids = assign_sids;
        self
    }

    pub fn set_minimize(&mut self, minimize: bool) -> &mut Self {
        self.minimize = minimize;
        self
    }

    pub fn add_statements<I: IntoIterator<Item = PolicyStatement>>(&mut self, statements: I) -> &mut Self {
        self.statements.extend(statements.into_iter().map(PolicyStatement::into_shared));
        self
    }

    /// Records a statement the caller keeps a handle to.
    pub fn add_shared_statement(&mut self, statement: SharedStatement) -> &mut Self {
        self.statements.push(statement);
        self
    }

    #[inline]
    pub fn statements(&self) -> &[SharedStatement] {
        &self.statements
    }

    #[inline]
    pub fn into_statements(self) -> Vec<SharedStatement> {
        self.statements
    }

    #[inline]
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// The statements as they will be rendered: minimized first (if enabled), then given Sids (if enabled). An
    /// assigned Sid is the statement's output index, or the next unused number when an explicit Sid already has that
    /// value. The stored statements are not changed.
    pub fn rendered_statements(&self) -> Vec<PolicyStatement> {
        let mut statements: Vec<PolicyStatement> =
            self.statements.iter().map(|statement| statement.borrow().clone()).collect();

        if self.minimize {
            statements = minimize_statements(statements);
        }

        if self.assign_sids {
            let mut taken: HashSet<String> =
                statements.iter().filter_map(|statement| statement.sid().map(str::to_string)).collect();

            for (index, statement) in statements.iter_mut().enumerate() {
                if statement.sid().is_some() {
                    continue;
                }

                let mut candidate = index;
                while taken.contains(&candidate.to_string()) {
                    candidate += 1;
                }

                trace!("Assigning Sid {} to statement {} without one", candidate, index);
                taken.insert(candidate.to_string());
                statement.set_sid(candidate.to_string());
            }
        }

        statements
    }

    /// Renders the document.
    pub fn resolve(&self) -> Value {
        let mut map = Map::new();
        if self.version.is_some() {
            map.insert("Version".to_string(), Value::String(self.version.to_string()));
        }

        if let Some(id) = &self.id {
            map.insert("Id".to_string(), Value::String(id.clone()));
        }

        let statements = self.rendered_statements().iter().map(PolicyStatement::to_statement_json).collect();
        map.insert("Statement".to_string(), Value::Array(statements));
        Value::Object(map)
    }

    #[inline]
    pub fn to_json(&self) -> Value {
        self.resolve()
    }

    pub fn validate_for_any_policy(&self) -> Vec<String> {
        self.validate_with(PolicyStatement::validate_for_any_policy)
    }

    pub fn validate_for_identity_policy(&self) -> Vec<String> {
        self.validate_with(PolicyStatement::validate_for_identity_policy)
    }

    pub fn validate_for_resource_policy(&self) -> Vec<String> {
        self.validate_with(PolicyStatement::validate_for_resource_policy)
    }

    fn validate_with(&self, check: fn(&PolicyStatement) -> Vec<String>) -> Vec<String> {
        let mut errors = Vec::new();
        let mut sids = HashSet::new();

        for statement in self.statements.iter() {
            let statement = statement.borrow();
            errors.extend(check(&statement));

            if let Some(sid) = statement.sid() {
                if !sids.insert(sid.to_string()) {
                    errors.push(format!("Statement IDs (SIDs) in a single policy must be unique. Duplicate: '{}'", sid));
                }
            }
        }

        errors
    }
}

display_json!(PolicyDocument);
from_str_json!(PolicyDocument);

impl Serialize for PolicyDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.resolve().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PolicyDocument {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<PolicyDocument, D::Error> {
        d.deserialize_map(PolicyDocumentVisitor {})
    }
}

struct PolicyDocumentVisitor;

impl<'de> Visitor<'de> for PolicyDocumentVisitor {
    type Value = PolicyDocument;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str("policy")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut document = PolicyDocument {
            version: PolicyVersion::None,
            ..Default::default()
        };
        let mut version_seen = false;
        let mut id_seen = false;
        let mut statement_seen = false;

        while let Some(key) = access.next_key::<String>()? {
            match key.as_str() {
                "Version" => {
                    if version_seen {
                        return Err(de::Error::duplicate_field("Version"));
                    }
                    version_seen = true;
                    document.version = access.next_value::<PolicyVersion>()?;
                }
                "Id" => {
                    if id_seen {
                        return Err(de::Error::duplicate_field("Id"));
                    }
                    id_seen = true;
                    document.id = Some(access.next_value::<String>()?);
                }
                "Statement" => {
                    if statement_seen {
                        return Err(de::Error::duplicate_field("Statement"));
                    }
                    statement_seen = true;
                    let statements = match access.next_value::<Value>()? {
                        Value::Array(items) => items,
                        single @ Value::Object(_) => vec![single],
                        other => {
                            return Err(de::Error::custom(format!(
                                "Statement must be an object or a list of objects: {}",
                                other
                            )))
                        }
                    };

                    for statement in statements {
                        let statement =
                            serde_json::from_value::<PolicyStatement>(statement).map_err(de::Error::custom)?;
                        document.add_statements([statement]);
                    }
                }
                _ => return Err(de::Error::unknown_field(&key, &["Version", "Id", "Statement"])),
            }
        }

        if !statement_seen {
            return Err(de::Error::missing_field("Statement"));
        }

        Ok(document)
    }
}
