//! Shared host model and sample widget policy for integration tests

#![allow(dead_code)]

use core_logic::host::{AsAny, HostObject};
use core_logic::{
    Goal, HostError, Instance, InstanceMatch, Literal, Policy, Rule, Term, TypeDescriptor,
    TypeRegistry, Value,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Actor {
    pub name: String,
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

#[derive(Debug, Clone, Default)]
pub struct Company {
    pub name: String,
    pub roles: BTreeMap<String, String>,
    /// Every `role` call fails, as if the backing store were down
    pub unavailable: bool,
}

impl Company {
    pub fn with_role(mut self, actor: &str, role: &str) -> Self {
        self.roles.insert(actor.to_string(), role.to_string());
        self
    }
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
        if self.unavailable {
            return Err(HostError::Failed("role store unavailable".into()));
        }
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

#[derive(Debug, Clone)]
pub struct Widget {
    pub name: String,
    pub company: Instance,
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

pub fn actor(name: &str) -> Value {
    Value::from(Instance::new(Actor {
        name: name.to_string(),
    }))
}

pub fn company(company: Company) -> Value {
    Value::from(Instance::new(company))
}

pub fn widget(name: &str, company: Company) -> Value {
    Value::from(Instance::new(Widget {
        name: name.to_string(),
        company: Instance::new(company),
    }))
}

/// Company "acme" where alice is admin and bob is member
pub fn acme() -> Company {
    Company {
        name: "acme".into(),
        ..Company::default()
    }
    .with_role("alice", "admin")
    .with_role("bob", "member")
}

pub fn subject(key: &str, name: &str) -> Value {
    Value::dict([(key, Value::string(name))])
}

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register(
        TypeDescriptor::new("Actor")
            .attribute("name")
            .constructor(|args| match args {
                [Value::Literal(Literal::String(name))] => Ok(actor(name)),
                _ => Err(HostError::TypeMismatch("Actor(name: String)".into())),
            }),
    );
    registry.register(
        TypeDescriptor::new("Company")
            .attribute("name")
            .method("role", 1),
    );
    registry.register(
        TypeDescriptor::new("Widget")
            .attribute("name")
            .attribute("company"),
    );
    registry
}

/// `pred(Dictionary{key: name}, rest...) if actor = new Actor(name) and pred(actor, rest...)`
fn normalize_subject(pred: &str, key: &str, rest: &[&str]) -> Rule {
    let mut head = vec![Term::Pattern(
        InstanceMatch::new("Dictionary").field(key, Term::var("name")),
    )];
    head.extend(rest.iter().map(|v| Term::var(*v)));

    let mut call = vec![Term::var("actor")];
    call.extend(rest.iter().map(|v| Term::var(*v)));

    Rule::new(
        pred,
        head,
        vec![
            Goal::construct("Actor", [Term::var("name")], Term::var("actor")),
            Goal::call(pred, call),
        ],
    )
}

/// `pred("guest", rest...) if actor = new Actor("guest") and pred(actor, rest...)`
fn normalize_guest(pred: &str, rest: &[&str]) -> Rule {
    let mut head = vec![Term::string("guest")];
    head.extend(rest.iter().map(|v| Term::var(*v)));

    let mut call = vec![Term::var("actor")];
    call.extend(rest.iter().map(|v| Term::var(*v)));

    Rule::new(
        pred,
        head,
        vec![
            Goal::construct("Actor", [Term::string("guest")], Term::var("actor")),
            Goal::call(pred, call),
        ],
    )
}

/// The widget/company sample policy
pub fn widget_rules() -> Vec<Rule> {
    let allow_rest = ["action", "resource"];
    let field_rest = ["action", "resource", "field"];

    vec![
        normalize_subject("allow", "sub", &allow_rest),
        normalize_subject("allow", "username", &allow_rest),
        normalize_guest("allow", &allow_rest),
        // allow(_actor: Actor, "read", _widget: Widget);
        Rule::new(
            "allow",
            vec![
                Term::typed("_actor", "Actor"),
                Term::string("read"),
                Term::typed("_widget", "Widget"),
            ],
            vec![],
        ),
        // allow(actor: Actor, "create", company: Company) if company.role(actor) = "admin";
        Rule::new(
            "allow",
            vec![
                Term::typed("actor", "Actor"),
                Term::string("create"),
                Term::typed("company", "Company"),
            ],
            vec![Goal::method(
                Term::var("company"),
                "role",
                [Term::var("actor")],
                Term::string("admin"),
            )],
        ),
        // allow(actor: Actor, "list", Company) if actor.name = "auditor";
        Rule::new(
            "allow",
            vec![
                Term::typed("actor", "Actor"),
                Term::string("list"),
                Term::class("Company"),
            ],
            vec![Goal::attribute(
                Term::var("actor"),
                "name",
                Term::string("auditor"),
            )],
        ),
        normalize_subject("allow_field", "sub", &field_rest),
        normalize_subject("allow_field", "username", &field_rest),
        normalize_guest("allow_field", &field_rest),
        // allow_field(_actor: Actor, "read", _widget: Widget, field) if field in ["name", "purpose"];
        Rule::new(
            "allow_field",
            vec![
                Term::typed("_actor", "Actor"),
                Term::string("read"),
                Term::typed("_widget", "Widget"),
                Term::var("field"),
            ],
            vec![Goal::member(
                Term::var("field"),
                Term::strings(["name", "purpose"]),
            )],
        ),
        // allow_field(actor: Actor, "read", widget: Widget, field) if
        //     widget.company = company and company.role(actor) = "member" and field in ["private_field"];
        Rule::new(
            "allow_field",
            vec![
                Term::typed("actor", "Actor"),
                Term::string("read"),
                Term::typed("widget", "Widget"),
                Term::var("field"),
            ],
            vec![
                Goal::attribute(Term::var("widget"), "company", Term::var("company")),
                Goal::method(
                    Term::var("company"),
                    "role",
                    [Term::var("actor")],
                    Term::string("member"),
                ),
                Goal::member(Term::var("field"), Term::strings(["private_field"])),
            ],
        ),
        // allow_field(actor: Actor, "update", widget: Widget, field) if
        //     widget.company = company and company.role(actor) = "admin"
        //     and field in ["name", "purpose", "private_field"];
        Rule::new(
            "allow_field",
            vec![
                Term::typed("actor", "Actor"),
                Term::string("update"),
                Term::typed("widget", "Widget"),
                Term::var("field"),
            ],
            vec![
                Goal::attribute(Term::var("widget"), "company", Term::var("company")),
                Goal::method(
                    Term::var("company"),
                    "role",
                    [Term::var("actor")],
                    Term::string("admin"),
                ),
                Goal::member(
                    Term::var("field"),
                    Term::strings(["name", "purpose", "private_field"]),
                ),
            ],
        ),
        // allow_field(actor: Actor, "read", widget: Widget, field) if
        //     allow_field(actor, "update", widget, field);
        Rule::new(
            "allow_field",
            vec![
                Term::typed("actor", "Actor"),
                Term::string("read"),
                Term::typed("widget", "Widget"),
                Term::var("field"),
            ],
            vec![Goal::call(
                "allow_field",
                [
                    Term::var("actor"),
                    Term::string("update"),
                    Term::var("widget"),
                    Term::var("field"),
                ],
            )],
        ),
    ]
}

pub fn widget_policy() -> Policy {
    let policy = Policy::new(registry());
    policy.load(widget_rules()).unwrap();
    policy
}
