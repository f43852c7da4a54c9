//! Policy documents
//!
//! A [`PolicyDocument`] is the serializable form of a policy: a name, a
//! version, the host types its rules refer to, and the rules themselves.
//! Deserialization goes through an intermediate struct so that every
//! document name is checked before it is handed out. Rule counts are an
//! engine limit (`EngineConfig::max_rules`), checked when the rules load.
//!
//! ```toml
//! name = "widgets"
//! version = 3
//!
//! [[types]]
//! name = "Widget"
//! attributes = ["company"]
//!
//! [[rules]]
//! name = "allow"
//! args = [{ var = "_actor" }, { lit = "read" }, { match = { type = "Widget" } }]
//! ```

use crate::error::{PolicyError, Result};
use crate::registry::{TypeDecl, TypeRegistry};
use crate::rule::Rule;
use crate::MAX_PREDICATE_NAME_LENGTH;
use serde::{Deserialize, Serialize};

fn default_version() -> u64 {
    1
}

/// Serializable policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolicyDocumentRaw")]
pub struct PolicyDocument {
    name: String,
    version: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    types: Vec<TypeDecl>,
    rules: Vec<Rule>,
}

#[derive(Debug, Clone, Deserialize)]
struct PolicyDocumentRaw {
    name: String,
    #[serde(default = "default_version")]
    version: u64,
    #[serde(default)]
    types: Vec<TypeDecl>,
    #[serde(default)]
    rules: Vec<Rule>,
}

impl TryFrom<PolicyDocumentRaw> for PolicyDocument {
    type Error = PolicyError;

    fn try_from(raw: PolicyDocumentRaw) -> Result<Self> {
        Self::new(raw.name, raw.version, raw.types, raw.rules)
    }
}

impl PolicyDocument {
    /// Create a document
    ///
    /// # Errors
    ///
    /// - `PolicyNameTooLong` if the name exceeds `MAX_PREDICATE_NAME_LENGTH`
    /// - `Serialization` if the name is empty
    pub fn new(
        name: impl Into<String>,
        version: u64,
        types: Vec<TypeDecl>,
        rules: Vec<Rule>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(PolicyError::Serialization(
                "policy name cannot be empty".to_string(),
            ));
        }
        if name.len() > MAX_PREDICATE_NAME_LENGTH {
            return Err(PolicyError::PolicyNameTooLong {
                max: MAX_PREDICATE_NAME_LENGTH,
                length: name.len(),
            });
        }
        Ok(Self {
            name,
            version,
            types,
            rules,
        })
    }

    /// Policy name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Author-assigned version
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Declared host types, in declaration order
    #[must_use]
    pub fn types(&self) -> &[TypeDecl] {
        &self.types
    }

    /// Rules, in load order
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Consume the document, keeping only the rules
    #[must_use]
    pub fn into_rules(self) -> Vec<Rule> {
        self.rules
    }

    /// Declare this document's types on top of `registry`
    ///
    /// Declarations carry no constructor. A constructor the host already
    /// registered under the same name is kept.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidType` for the first declaration the
    /// registry rejects
    pub fn declare_types(&self, registry: &mut TypeRegistry) -> Result<()> {
        self.types
            .iter()
            .cloned()
            .try_for_each(|decl| registry.declare(decl))
    }

    /// A fresh registry with the built-ins plus this document's types
    ///
    /// # Errors
    ///
    /// See [`PolicyDocument::declare_types`]
    pub fn registry(&self) -> Result<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        self.declare_types(&mut registry)?;
        Ok(registry)
    }

    /// Load a document from TOML
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::Serialization` for malformed TOML, or the
    /// limit errors listed on [`PolicyDocument::new`]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to TOML
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::Serialization` if TOML serialization fails
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| PolicyError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Goal;
    use crate::term::Term;

    const WIDGETS: &str = r#"
name = "widgets"
version = 2

[[types]]
name = "Company"
methods = { role = 1 }

[[rules]]
name = "allow"
args = [{ var = "_actor" }, { lit = "read" }, { match = { type = "Company" } }]

[[rules]]
name = "allow"
args = [{ var = "actor" }, { lit = "create" }, { var = "company" }]
body = [{ method = { receiver = { var = "company" }, method = "role", args = [{ var = "actor" }], bound_to = { lit = "admin" } } }]
"#;

    #[test]
    fn test_from_toml() {
        let doc = PolicyDocument::from_toml(WIDGETS).unwrap();
        assert_eq!(doc.name(), "widgets");
        assert_eq!(doc.version(), 2);
        assert_eq!(doc.rules().len(), 2);
        assert_eq!(
            doc.rules()[1].body[0],
            Goal::method(
                Term::var("company"),
                "role",
                [Term::var("actor")],
                Term::string("admin")
            )
        );

        let registry = doc.registry().unwrap();
        assert_eq!(registry.method_arity("Company", "role"), Some(1));
    }

    #[test]
    fn test_version_defaults_to_one() {
        let doc = PolicyDocument::from_toml("name = \"empty\"").unwrap();
        assert_eq!(doc.version(), 1);
        assert!(doc.rules().is_empty());
    }

    #[test]
    fn test_name_limit_enforced_on_deserialize() {
        let long = format!("name = \"{}\"", "p".repeat(129));
        assert!(matches!(
            PolicyDocument::from_toml(&long),
            Err(PolicyError::Serialization(msg)) if msg.contains("maximum 128")
        ));
        assert!(PolicyDocument::from_toml("name = \"\"").is_err());
    }

    #[test]
    fn test_json_document() {
        let doc: PolicyDocument = serde_json::from_str(
            r#"{"name": "p", "rules": [{"name": "allow", "args": [{"var": "_a"}, {"lit": "read"}, {"var": "_r"}]}]}"#,
        )
        .unwrap();
        assert_eq!(doc.rules()[0].to_string(), r#"allow(_a, "read", _r);"#);
    }

    #[test]
    fn test_rule_count_is_not_a_document_limit() {
        let mut toml = String::from("name = \"many\"\n");
        for i in 0..1100 {
            toml.push_str(&format!("[[rules]]\nname = \"fact\"\nargs = [{{ lit = {} }}]\n", i));
        }
        let doc = PolicyDocument::from_toml(&toml).unwrap();
        assert_eq!(doc.rules().len(), 1100);
    }
}
