//! Capability decorators attached to scene nodes.
//!
//! A decorator grants a node named capabilities without subclassing. Callers
//! never inspect decorator types; they ask a node whether it
//! [supports](crate::SceneNode::supports) a capability and dispatch through
//! [`Scene::call_decoration`](crate::Scene::call_decoration), which returns
//! `None` when no attached decorator implements it.

use std::fmt;

use meridian_core::math::Vec3;

use crate::node::NodeId;

/// Argument or return value of a decoration call.
#[derive(Debug, Clone, PartialEq)]
pub enum DecorationValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Node(NodeId),
    Vector(Vec3),
}

impl DecorationValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }
}

/// An attachable capability provider.
///
/// `name` identifies the decorator on a node (at most one per name);
/// `capabilities` lists the capability names [`call`](Self::call) answers.
pub trait SceneNodeDecorator: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> &'static [&'static str];

    /// Invokes `capability`. Returns `None` for capabilities this decorator
    /// does not implement or arguments it cannot use.
    fn call(&mut self, capability: &str, args: &[DecorationValue]) -> Option<DecorationValue>;
}

/// Marks a node as a group of its children.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupDecorator;

impl SceneNodeDecorator for GroupDecorator {
    fn name(&self) -> &'static str {
        "group"
    }

    fn capabilities(&self) -> &'static [&'static str] {
        &["isGroup"]
    }

    fn call(&mut self, capability: &str, _args: &[DecorationValue]) -> Option<DecorationValue> {
        match capability {
            "isGroup" => Some(DecorationValue::Bool(true)),
            _ => None,
        }
    }
}

/// Marks a node as a camera and stores its projection mode.
#[derive(Debug, Clone, Copy)]
pub struct CameraDecorator {
    perspective: bool,
}

impl CameraDecorator {
    pub fn new(perspective: bool) -> Self {
        Self { perspective }
    }

    pub fn is_perspective(&self) -> bool {
        self.perspective
    }
}

impl Default for CameraDecorator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SceneNodeDecorator for CameraDecorator {
    fn name(&self) -> &'static str {
        "camera"
    }

    fn capabilities(&self) -> &'static [&'static str] {
        &["isCamera", "isPerspective", "setPerspective"]
    }

    fn call(&mut self, capability: &str, args: &[DecorationValue]) -> Option<DecorationValue> {
        match capability {
            "isCamera" => Some(DecorationValue::Bool(true)),
            "isPerspective" => Some(DecorationValue::Bool(self.perspective)),
            "setPerspective" => {
                self.perspective = args.first()?.as_bool()?;
                Some(DecorationValue::Bool(self.perspective))
            }
            _ => None,
        }
    }
}
