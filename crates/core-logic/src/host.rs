//! # Host Bridge
//!
//! The narrow interface the resolver uses to look inside application objects.
//!
//! Host objects implement [`HostObject`] and are wrapped in an [`Instance`].
//! The engine never inspects them directly: every attribute read, method call
//! and constructor invocation goes through [`HostBridge`], which first checks
//! the call against the [`TypeRegistry`].
//!
//! ## Example
//!
//! ```rust
//! use core_logic::host::{HostBridge, HostObject, Instance};
//! use core_logic::{HostError, TypeDescriptor, TypeRegistry, Value};
//!
//! #[derive(Debug)]
//! struct Actor {
//!     name: String,
//! }
//!
//! impl HostObject for Actor {
//!     fn type_name(&self) -> &str {
//!         "Actor"
//!     }
//!
//!     fn attribute(&self, name: &str) -> Result<Value, HostError> {
//!         match name {
//!             "name" => Ok(Value::string(&self.name)),
//!             _ => Err(HostError::Failed(format!("no attribute {}", name))),
//!         }
//!     }
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register(TypeDescriptor::new("Actor").attribute("name"));
//!
//! let bridge = HostBridge::new(&registry);
//! let actor = Value::from(Instance::new(Actor { name: "alice".into() }));
//! assert_eq!(bridge.attribute(&actor, "name").unwrap(), Value::string("alice"));
//! assert!(bridge.attribute(&actor, "email").is_err());
//! ```

use crate::error::HostError;
use crate::registry::TypeRegistry;
use crate::term::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Object-safe access to `Any`, implemented for every `'static` type
pub trait AsAny {
    /// Upcast to `&dyn Any` for downcasting in [`HostObject::equals`]
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Application object visible to policies
///
/// Implementations must be side-effect free from the engine's point of view:
/// the engine only reads.
pub trait HostObject: AsAny + fmt::Debug + Send + Sync {
    /// Registered type name of this object
    fn type_name(&self) -> &str;

    /// Read an attribute
    fn attribute(&self, name: &str) -> Result<Value, HostError> {
        Err(HostError::MissingAttribute {
            type_name: self.type_name().to_string(),
            attribute: name.to_string(),
        })
    }

    /// Invoke a method with already-resolved arguments
    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, HostError> {
        let _ = args;
        Err(HostError::MissingMethod {
            type_name: self.type_name().to_string(),
            method: name.to_string(),
        })
    }

    /// Host-defined equality; identity is always checked first
    fn equals(&self, other: &dyn HostObject) -> bool {
        let _ = other;
        false
    }
}

/// Shared handle to a host object
#[derive(Clone)]
pub struct Instance {
    object: Arc<dyn HostObject>,
}

impl Instance {
    /// Wrap a host object
    pub fn new(object: impl HostObject + 'static) -> Self {
        Self {
            object: Arc::new(object),
        }
    }

    /// Wrap an already shared host object
    #[must_use]
    pub fn from_arc(object: Arc<dyn HostObject>) -> Self {
        Self { object }
    }

    /// Runtime type name reported by the object
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.object.type_name()
    }

    /// Borrow the underlying object
    #[must_use]
    pub fn object(&self) -> &dyn HostObject {
        self.object.as_ref()
    }

    /// Downcast to a concrete host type
    #[must_use]
    pub fn downcast_ref<T: HostObject + 'static>(&self) -> Option<&T> {
        self.object.as_ref().as_any().downcast_ref::<T>()
    }

    /// Same allocation, or equal according to the host
    #[must_use]
    pub fn same_as(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.object, &other.object) || self.object.equals(other.object.as_ref())
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.object.as_ref(), f)
    }
}

/// Registry-checked access to host values
#[derive(Debug, Clone, Copy)]
pub struct HostBridge<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> HostBridge<'a> {
    /// Create a bridge over a registry
    #[must_use]
    pub const fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Read `name` from a value
    ///
    /// Dictionaries answer by key. Instances must belong to a registered type
    /// that declares the attribute (directly or through a supertype).
    ///
    /// # Errors
    ///
    /// - `ContractViolation` if the instance's type is not registered
    /// - `MissingAttribute` if the attribute is not declared or not present
    /// - whatever the host object itself returns
    pub fn attribute(&self, receiver: &Value, name: &str) -> Result<Value, HostError> {
        match receiver {
            Value::Dict(entries) => {
                entries
                    .get(name)
                    .cloned()
                    .ok_or_else(|| HostError::MissingAttribute {
                        type_name: "Dictionary".to_string(),
                        attribute: name.to_string(),
                    })
            }
            Value::Instance(instance) => {
                let type_name = self.registered_type(instance)?;
                if !self.registry.has_attribute(type_name, name) {
                    return Err(HostError::MissingAttribute {
                        type_name: type_name.to_string(),
                        attribute: name.to_string(),
                    });
                }
                instance.object().attribute(name)
            }
            other => Err(HostError::MissingAttribute {
                type_name: other.type_name().to_string(),
                attribute: name.to_string(),
            }),
        }
    }

    /// Invoke `name(args)` on a value
    ///
    /// # Errors
    ///
    /// - `ContractViolation` if the instance's type is not registered
    /// - `MissingMethod` if the method is not declared
    /// - `TypeMismatch` if the argument count differs from the declared arity
    /// - whatever the host object itself returns
    pub fn call_method(
        &self,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> Result<Value, HostError> {
        let Value::Instance(instance) = receiver else {
            return Err(HostError::MissingMethod {
                type_name: receiver.type_name().to_string(),
                method: name.to_string(),
            });
        };

        let type_name = self.registered_type(instance)?;
        match self.registry.method_arity(type_name, name) {
            None => Err(HostError::MissingMethod {
                type_name: type_name.to_string(),
                method: name.to_string(),
            }),
            Some(arity) if arity != args.len() => Err(HostError::TypeMismatch(format!(
                "{}.{} takes {} argument(s), got {}",
                type_name,
                name,
                arity,
                args.len()
            ))),
            Some(_) => instance.object().call_method(name, args),
        }
    }

    /// Build a value of `type_name` through its registered constructor
    ///
    /// # Errors
    ///
    /// - `ContractViolation` if the type is unknown or has no constructor
    /// - whatever the constructor returns
    pub fn construct(&self, type_name: &str, args: &[Value]) -> Result<Value, HostError> {
        let constructor = self
            .registry
            .get(type_name)
            .and_then(|desc| desc.constructor.clone())
            .ok_or_else(|| {
                HostError::ContractViolation(format!("type `{}` has no constructor", type_name))
            })?;
        constructor(args)
    }

    fn registered_type<'i>(&self, instance: &'i Instance) -> Result<&'i str, HostError> {
        let type_name = instance.type_name();
        if self.registry.has_type(type_name) {
            Ok(type_name)
        } else {
            Err(HostError::ContractViolation(format!(
                "instance of unregistered type `{}`",
                type_name
            )))
        }
    }
}
