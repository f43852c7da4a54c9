//! # Type Registry
//!
//! Maps symbolic type names used in rule patterns to host-side capability
//! descriptors: which types a type specializes, which attributes are
//! readable, which methods are invokable (and with how many arguments), and
//! how to construct a value of the type.
//!
//! Built-in types (`String`, `Integer`, `Boolean`, `List`, `Dictionary`,
//! `Class`) are always present.
//!
//! ## Usage Example
//!
//! ```rust
//! use core_logic::registry::{TypeDescriptor, TypeRegistry};
//!
//! let mut registry = TypeRegistry::new();
//! registry.register(TypeDescriptor::new("User").attribute("name"));
//! registry.register(
//!     TypeDescriptor::new("Admin")
//!         .specializes("User")
//!         .method("can_impersonate", 1),
//! );
//!
//! assert!(registry.is_subtype("Admin", "User"));
//! assert!(!registry.is_subtype("User", "Admin"));
//!
//! // Attributes are inherited from supertypes
//! assert!(registry.has_attribute("Admin", "name"));
//! assert_eq!(registry.method_arity("Admin", "can_impersonate"), Some(1));
//! ```

use crate::error::{HostError, PolicyError};
use crate::term::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Built-in type names registered in every [`TypeRegistry`]
pub const BUILTIN_TYPES: [&str; 6] = ["Boolean", "Class", "Dictionary", "Integer", "List", "String"];

/// Host constructor: builds a value from resolved arguments
pub type Constructor = Arc<dyn Fn(&[Value]) -> Result<Value, HostError> + Send + Sync>;

/// Capabilities of one host type
#[derive(Clone)]
pub struct TypeDescriptor {
    /// Type name used in patterns
    pub name: String,
    /// Types this one may stand in for
    pub specializes: Vec<String>,
    /// Readable attributes
    pub attributes: BTreeSet<String>,
    /// Invokable methods and their arity
    pub methods: BTreeMap<String, usize>,
    /// Optional constructor used by `Construct` goals
    pub constructor: Option<Constructor>,
}

impl TypeDescriptor {
    /// Descriptor with no capabilities
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specializes: Vec::new(),
            attributes: BTreeSet::new(),
            methods: BTreeMap::new(),
            constructor: None,
        }
    }

    /// Declare that this type may be used where `parent` is expected
    #[must_use]
    pub fn specializes(mut self, parent: impl Into<String>) -> Self {
        self.specializes.push(parent.into());
        self
    }

    /// Declare a readable attribute
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into());
        self
    }

    /// Declare an invokable method
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, arity: usize) -> Self {
        self.methods.insert(name.into(), arity);
        self
    }

    /// Attach a constructor
    #[must_use]
    pub fn constructor<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("specializes", &self.specializes)
            .field("attributes", &self.attributes)
            .field("methods", &self.methods)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

/// Serializable type declaration (no constructor)
///
/// Lets policy documents and tooling describe host types without host code.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Type name
    pub name: String,
    /// Supertypes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specializes: Vec<String>,
    /// Readable attributes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    /// Methods and their arity
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub methods: BTreeMap<String, usize>,
}

impl From<TypeDecl> for TypeDescriptor {
    fn from(decl: TypeDecl) -> Self {
        Self {
            name: decl.name,
            specializes: decl.specializes,
            attributes: decl.attributes.into_iter().collect(),
            methods: decl.methods,
            constructor: None,
        }
    }
}

/// Registry of host types
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// Registry containing only the built-in types
    #[must_use]
    pub fn new() -> Self {
        let types = BUILTIN_TYPES
            .iter()
            .map(|name| (name.to_string(), TypeDescriptor::new(*name)))
            .collect();
        Self { types }
    }

    /// Register (or replace) a type
    ///
    /// # Returns
    ///
    /// `Some(old)` if a descriptor with the same name was replaced
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Option<TypeDescriptor> {
        self.types.insert(descriptor.name.clone(), descriptor)
    }

    /// Register a serializable declaration
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidType` if the name is empty, redeclares a
    /// built-in, or specializes an unknown type. Supertypes must be declared
    /// first. Redeclaring a registered type replaces its attributes, methods
    /// and supertypes but keeps its constructor.
    pub fn declare(&mut self, decl: TypeDecl) -> Result<(), PolicyError> {
        if decl.name.is_empty() {
            return Err(PolicyError::InvalidType {
                type_name: decl.name,
                reason: "type name cannot be empty".to_string(),
            });
        }
        if BUILTIN_TYPES.contains(&decl.name.as_str()) {
            return Err(PolicyError::InvalidType {
                reason: "built-in types cannot be redeclared".to_string(),
                type_name: decl.name,
            });
        }
        if let Some(parent) = decl
            .specializes
            .iter()
            .find(|p| !self.has_type(p) && **p != decl.name)
        {
            return Err(PolicyError::InvalidType {
                reason: format!("specializes unknown type `{}`", parent),
                type_name: decl.name,
            });
        }
        // A constructor registered by the host survives redeclaration
        let constructor = self
            .types
            .get(&decl.name)
            .and_then(|desc| desc.constructor.clone());
        let mut descriptor = TypeDescriptor::from(decl);
        descriptor.constructor = constructor;
        self.register(descriptor);
        Ok(())
    }

    /// Remove a type
    pub fn unregister(&mut self, name: &str) -> Option<TypeDescriptor> {
        self.types.remove(name)
    }

    /// Whether `name` is registered
    #[must_use]
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Look up a descriptor
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// `name` followed by every type reachable through `specializes`, breadth first
    #[must_use]
    pub fn ancestors(&self, name: &str) -> Vec<&str> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        if let Some(desc) = self.types.get(name) {
            queue.push_back(desc.name.as_str());
        }
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            if let Some(desc) = self.types.get(current) {
                for parent in &desc.specializes {
                    if let Some(parent_desc) = self.types.get(parent) {
                        queue.push_back(parent_desc.name.as_str());
                    }
                }
            }
        }
        order
    }

    /// Whether a value of type `actual` may be used where `expected` is required
    #[must_use]
    pub fn is_subtype(&self, actual: &str, expected: &str) -> bool {
        actual == expected || self.ancestors(actual).contains(&expected)
    }

    /// Whether `value` matches the type `expected`
    #[must_use]
    pub fn value_is_a(&self, value: &Value, expected: &str) -> bool {
        self.is_subtype(value.type_name(), expected)
    }

    /// Whether `attribute` is readable on `type_name` or one of its supertypes
    #[must_use]
    pub fn has_attribute(&self, type_name: &str, attribute: &str) -> bool {
        self.ancestors(type_name)
            .into_iter()
            .filter_map(|t| self.types.get(t))
            .any(|desc| desc.attributes.contains(attribute))
    }

    /// Arity of `method` on `type_name`, searching supertypes in order
    #[must_use]
    pub fn method_arity(&self, type_name: &str, method: &str) -> Option<usize> {
        self.ancestors(type_name)
            .into_iter()
            .filter_map(|t| self.types.get(t))
            .find_map(|desc| desc.methods.get(method).copied())
    }

    /// Types whose `specializes` chain leads back to themselves
    #[must_use]
    pub fn specialization_cycles(&self) -> Vec<String> {
        self.types
            .values()
            .filter(|desc| {
                desc.specializes
                    .iter()
                    .any(|parent| self.ancestors(parent).contains(&desc.name.as_str()))
            })
            .map(|desc| desc.name.clone())
            .collect()
    }

    /// Lists all registered type names
    #[must_use]
    pub fn list_types(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    /// Counts registered types, built-ins included
    #[must_use]
    pub fn count(&self) -> usize {
        self.types.len()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new_has_builtins() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.count(), BUILTIN_TYPES.len());
        assert!(registry.has_type("Dictionary"));
        assert!(registry.value_is_a(&Value::string("x"), "String"));
        assert!(registry.value_is_a(&Value::dict([("sub", Value::string("a"))]), "Dictionary"));
        assert!(!registry.value_is_a(&Value::integer(1), "String"));
    }

    #[test]
    fn test_register_duplicate_replaces() {
        let mut registry = TypeRegistry::new();

        let old = registry.register(TypeDescriptor::new("Actor"));
        assert!(old.is_none());

        let old = registry.register(TypeDescriptor::new("Actor").attribute("name"));
        assert!(old.is_some());
        assert!(registry.has_attribute("Actor", "name"));
    }

    #[test]
    fn test_unregister() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDescriptor::new("Actor"));

        assert!(registry.unregister("Actor").is_some());
        assert!(registry.unregister("Actor").is_none());
        assert!(!registry.has_type("Actor"));
    }

    #[test]
    fn test_transitive_subtype() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDescriptor::new("Resource").method("owner", 0));
        registry.register(TypeDescriptor::new("Document").specializes("Resource"));
        registry.register(TypeDescriptor::new("Invoice").specializes("Document"));

        assert!(registry.is_subtype("Invoice", "Resource"));
        assert_eq!(registry.method_arity("Invoice", "owner"), Some(0));
        assert_eq!(
            registry.ancestors("Invoice"),
            vec!["Invoice", "Document", "Resource"]
        );
    }

    #[test]
    fn test_unregistered_type_is_only_itself() {
        let registry = TypeRegistry::new();
        assert!(registry.is_subtype("Ghost", "Ghost"));
        assert!(!registry.is_subtype("Ghost", "String"));
        assert!(registry.ancestors("Ghost").is_empty());
    }

    #[test]
    fn test_cycles_terminate_and_are_reported() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDescriptor::new("A").specializes("B"));
        registry.register(TypeDescriptor::new("B").specializes("A"));
        registry.register(TypeDescriptor::new("C").specializes("A"));

        assert!(registry.is_subtype("C", "B"));
        assert_eq!(registry.specialization_cycles(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_declare_validates() {
        let mut registry = TypeRegistry::new();

        assert!(registry
            .declare(TypeDecl {
                name: "String".into(),
                ..TypeDecl::default()
            })
            .is_err());
        assert!(registry
            .declare(TypeDecl {
                name: "Admin".into(),
                specializes: vec!["User".into()],
                ..TypeDecl::default()
            })
            .is_err());

        registry
            .declare(TypeDecl {
                name: "User".into(),
                attributes: vec!["name".into()],
                ..TypeDecl::default()
            })
            .unwrap();
        registry
            .declare(TypeDecl {
                name: "Admin".into(),
                specializes: vec!["User".into()],
                ..TypeDecl::default()
            })
            .unwrap();
        assert!(registry.has_attribute("Admin", "name"));
    }

    #[test]
    fn test_declare_keeps_host_constructor() {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDescriptor::new("Actor").constructor(|_| Ok(Value::string("actor"))),
        );

        registry
            .declare(TypeDecl {
                name: "Actor".into(),
                attributes: vec!["name".into()],
                ..TypeDecl::default()
            })
            .unwrap();

        let actor = registry.get("Actor").unwrap();
        assert!(actor.constructor.is_some());
        assert!(actor.attributes.contains("name"));
    }

    #[test]
    fn test_list_types_sorted() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDescriptor::new("Widget"));
        registry.register(TypeDescriptor::new("Actor"));

        let list = registry.list_types();
        assert!(list.windows(2).all(|w| w[0] <= w[1]));
        assert!(list.contains(&"Widget".to_string()));
    }
}
