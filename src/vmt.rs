//! Minimal material (`.vmt`) writer
//!
//! Produces the flat `"shader" { "$key" "value" }` form used by the skybox
//! materials. Parameters keep insertion order; empty values are not written.

use indexmap::IndexMap;
use std::fmt;

/// A parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum VmtValue {
    Text(String),
    Int(i64),
    Float(f64),
    /// Written as `[a b c]`
    Vector(Vec<f64>),
}

impl VmtValue {
    fn is_empty(&self) -> bool {
        match self {
            VmtValue::Text(s) => s.trim().is_empty(),
            VmtValue::Vector(v) => v.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for VmtValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmtValue::Text(s) => f.write_str(s),
            VmtValue::Int(n) => write!(f, "{}", n),
            VmtValue::Float(x) => write!(f, "{}", x),
            VmtValue::Vector(v) => {
                let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(" "))
            }
        }
    }
}

impl From<&str> for VmtValue {
    fn from(s: &str) -> Self {
        VmtValue::Text(s.to_string())
    }
}

impl From<String> for VmtValue {
    fn from(s: String) -> Self {
        VmtValue::Text(s)
    }
}

impl From<i64> for VmtValue {
    fn from(n: i64) -> Self {
        VmtValue::Int(n)
    }
}

impl From<i32> for VmtValue {
    fn from(n: i32) -> Self {
        VmtValue::Int(n.into())
    }
}

impl From<f64> for VmtValue {
    fn from(x: f64) -> Self {
        VmtValue::Float(x)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub shader: String,
    params: IndexMap<String, VmtValue>,
}

impl Material {
    pub fn new(shader: &str) -> Self {
        Self {
            shader: shader.to_string(),
            params: IndexMap::new(),
        }
    }

    /// Set `$key`, replacing an earlier value in place
    pub fn set(mut self, key: &str, value: impl Into<VmtValue>) -> Self {
        self.params.insert(key.trim_start_matches('$').to_string(), value.into());
        self
    }

    /// Set `$key` only when `value` is present
    pub fn set_opt(self, key: &str, value: Option<impl Into<VmtValue>>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&VmtValue> {
        self.params.get(key.trim_start_matches('$'))
    }

    /// Render to material text
    pub fn to_vmt(&self) -> String {
        let mut out = format!("\"{}\"\n{{", self.shader);
        for (key, value) in &self.params {
            if key.trim().is_empty() || value.is_empty() {
                continue;
            }
            out.push_str(&format!("\n\t\"${}\" \"{}\"", key, value));
        }
        out.push_str("\n}");
        out
    }
}
