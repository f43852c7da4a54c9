//! Widget Authorization Flow Example
//!
//! This example walks through the widget/company sample policy:
//!
//! 1. Describe the host types (actors, companies, widgets)
//! 2. Load the rules from `demos/widget_policy.yaml`
//! 3. Ask `is_allowed` and `allowed_fields` for a few requests
//!
//! Run with: cargo run --example widget_flow

use gatehouse::documents::{PolicyParser, YamlParser};
use gatehouse::policy::host::AsAny;
use gatehouse::policy::{
    Decision, EngineConfig, HostError, HostObject, Instance, Literal, Policy, TypeDescriptor,
    TypeRegistry, Value,
};
use std::collections::BTreeMap;

const POLICY: &str = include_str!("widget_policy.yaml");

#[derive(Debug)]
struct Actor {
    name: String,
}

impl HostObject for Actor {
    fn type_name(&self) -> &str {
        "Actor"
    }

    fn attribute(&self, name: &str) -> Result<Value, HostError> {
        match name {
            "name" => Ok(Value::string(&self.name)),
            _ => Err(HostError::Failed(format!("Actor.{}", name))),
        }
    }

    fn equals(&self, other: &dyn HostObject) -> bool {
        other
            .as_any()
            .downcast_ref::<Actor>()
            .is_some_and(|o| o.name == self.name)
    }
}

#[derive(Debug)]
struct Company {
    name: String,
    roles: BTreeMap<String, String>,
}

impl HostObject for Company {
    fn type_name(&self) -> &str {
        "Company"
    }

    fn attribute(&self, name: &str) -> Result<Value, HostError> {
        match name {
            "name" => Ok(Value::string(&self.name)),
            _ => Err(HostError::Failed(format!("Company.{}", name))),
        }
    }

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, HostError> {
        match (name, args) {
            ("role", [Value::Instance(actor)]) => {
                let actor = actor
                    .downcast_ref::<Actor>()
                    .ok_or_else(|| HostError::TypeMismatch("role expects an Actor".into()))?;
                self.roles
                    .get(&actor.name)
                    .map(Value::string)
                    .ok_or_else(|| HostError::Failed(format!("{} has no role", actor.name)))
            }
            _ => Err(HostError::TypeMismatch(format!("Company.{}", name))),
        }
    }
}

#[derive(Debug)]
struct Widget {
    name: String,
    company: Instance,
}

impl HostObject for Widget {
    fn type_name(&self) -> &str {
        "Widget"
    }

    fn attribute(&self, name: &str) -> Result<Value, HostError> {
        match name {
            "name" => Ok(Value::string(&self.name)),
            "company" => Ok(Value::Instance(self.company.clone())),
            _ => Err(HostError::Failed(format!("Widget.{}", name))),
        }
    }
}

fn actor(name: &str) -> Value {
    Value::from(Instance::new(Actor {
        name: name.to_string(),
    }))
}

fn main() -> anyhow::Result<()> {
    println!("Gatehouse - Widget Authorization Flow");
    println!("-------------------------------------");
    println!();

    // -------------------------------------------------------------------------
    // Step 1: Host types
    // -------------------------------------------------------------------------
    // The policy document declares the shape of Actor, Company and Widget.
    // Only the host can build values, so the Actor constructor is registered
    // here; the document's declaration keeps it.

    let mut registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new("Actor").constructor(|args| match args {
        [Value::Literal(Literal::String(name))] => Ok(actor(name)),
        _ => Err(HostError::TypeMismatch("Actor(name: String)".into())),
    }));

    // -------------------------------------------------------------------------
    // Step 2: Load the policy
    // -------------------------------------------------------------------------

    let document = YamlParser.parse(POLICY)?;
    let (policy, report) = Policy::from_document(document, registry, EngineConfig::default())?;

    println!(
        "Loaded policy v{}: {} rules over {} predicates, {} warning(s)",
        report.version,
        report.rules,
        report.predicates,
        report.warnings.len()
    );
    println!();

    // -------------------------------------------------------------------------
    // Step 3: Decisions
    // -------------------------------------------------------------------------

    let acme = Instance::new(Company {
        name: "acme".into(),
        roles: BTreeMap::from([
            ("alice".to_string(), "admin".to_string()),
            ("bob".to_string(), "member".to_string()),
        ]),
    });
    let widget = Value::from(Instance::new(Widget {
        name: "sprocket".into(),
        company: acme.clone(),
    }));
    let company = Value::Instance(acme);

    let requests = [
        ("alice", actor("alice"), "create", company.clone()),
        ("bob", actor("bob"), "create", company.clone()),
        ("guest", Value::string("guest"), "read", widget.clone()),
        (
            "{sub: auditor}",
            Value::dict([("sub", Value::string("auditor"))]),
            "list",
            Value::class("Company"),
        ),
        ("bob", actor("bob"), "delete", widget.clone()),
    ];

    println!("Access decisions:");
    for (who, subject, action, resource) in requests {
        let decision = policy.decide(subject, action, resource.clone());
        let mark = match decision {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
            Decision::Indeterminate(_) => "ERROR",
        };
        println!("  [{}] {} {} {}", mark, who, action, resource);
    }
    println!();

    println!("Field permissions:");
    for name in ["alice", "bob", "eve"] {
        for action in ["read", "update"] {
            let fields = policy.allowed_fields(actor(name), action, widget.clone())?;
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            println!("  {} {}: [{}]", name, action, fields.join(", "));
        }
    }

    Ok(())
}
