//! Argument registry.
//!
//! Arguments reach a filter either by position (the host calling convention:
//! filter name at 0, image at 1, filter parameters after that) or by name.
//! A filter registers every argument it understands before reading it, and
//! every read goes through a typed accessor that falls back to the caller's
//! default when the argument is absent or explicitly empty.

use std::collections::BTreeMap;

use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::{
    array::AnyArray,
    error::{FilterError, Result},
    pixel::Pixel,
    volume::Volume,
};

/// A dynamically typed argument value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicitly empty; reads fall back to the default
    #[default]
    Empty,
    Bool(bool),
    Scalar(f64),
    Vector(Vec<f64>),
    Text(String),
    Array(AnyArray),
    Volume(Volume),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Bool(_) => "boolean",
            Value::Scalar(_) => "scalar",
            Value::Vector(_) => "row vector",
            Value::Text(_) => "string",
            Value::Array(_) => "array",
            Value::Volume(_) => "image record",
        }
    }

    /// Converts a JSON parameter value. Nested number arrays become a double
    /// array whose shape is the nesting depth, and must be rectangular.
    pub fn from_json(name: &str, json: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;

        match json {
            Json::Null => Ok(Value::Empty),
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => n
                .as_f64()
                .map(Value::Scalar)
                .ok_or_else(|| FilterError::malformed(name, "number out of range")),
            Json::String(s) => Ok(Value::Text(s.clone())),
            Json::Array(items) if items.iter().all(Json::is_number) => Ok(Value::Vector(
                items.iter().filter_map(Json::as_f64).collect(),
            )),
            Json::Array(_) => {
                let mut flat = Flattened::default();
                flatten_json(name, json, 0, &mut flat)?;
                let array = ArrayD::from_shape_vec(IxDyn(&flat.shape), flat.values)?;
                Ok(Value::Array(AnyArray::Double(array)))
            }
            Json::Object(_) => Err(FilterError::malformed(name, "objects are not accepted")),
        }
    }
}

#[derive(Default)]
struct Flattened {
    shape: Vec<usize>,
    values: Vec<f64>,
    leaf_depth: Option<usize>,
}

fn flatten_json(name: &str, json: &serde_json::Value, depth: usize, out: &mut Flattened) -> Result<()> {
    let ragged = || FilterError::malformed(name, "nested arrays are not rectangular");
    match json {
        serde_json::Value::Array(items) => {
            if out.leaf_depth.is_some_and(|leaf| leaf <= depth) {
                return Err(ragged());
            }
            if out.shape.len() == depth {
                out.shape.push(items.len());
            } else if out.shape.get(depth) != Some(&items.len()) {
                return Err(ragged());
            }
            for item in items {
                flatten_json(name, item, depth + 1, out)?;
            }
            Ok(())
        }
        serde_json::Value::Number(n) => {
            match out.leaf_depth {
                Some(leaf) if leaf != depth => return Err(ragged()),
                _ => out.leaf_depth = Some(depth),
            }
            out.values.push(n.as_f64().unwrap_or(f64::NAN));
            Ok(())
        }
        _ => Err(FilterError::malformed(name, "nested arrays must hold numbers only")),
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Scalar(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::Vector(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<AnyArray> for Value {
    fn from(value: AnyArray) -> Self {
        Value::Array(value)
    }
}

impl<T: Pixel> From<ArrayD<T>> for Value {
    fn from(value: ArrayD<T>) -> Self {
        Value::Array(value.into())
    }
}

impl From<Volume> for Value {
    fn from(value: Volume) -> Self {
        Value::Volume(value)
    }
}

/// Handle returned by [`ArgumentRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgHandle {
    pub index: usize,
    pub name: &'static str,
}

#[derive(Debug, Default)]
pub struct ArgumentRegistry {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
    registered: Vec<ArgHandle>,
}

impl ArgumentRegistry {
    pub fn new(positional: Vec<Value>, named: BTreeMap<String, Value>) -> Self {
        Self {
            positional,
            named,
            registered: Vec::new(),
        }
    }

    /// Number of arguments the caller supplied, positional and named
    pub fn supplied(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn check_number_of_arguments(&self, min: usize, max: usize) -> Result<()> {
        if self.supplied() < min {
            return Err(FilterError::ArgumentCount(format!(
                "at least {min} input arguments required, {} given",
                self.supplied()
            )));
        }
        if self.positional.len() > max {
            return Err(FilterError::ArgumentCount(format!(
                "at most {max} input arguments accepted, {} given",
                self.positional.len()
            )));
        }
        Ok(())
    }

    pub fn register(&mut self, index: usize, name: &'static str) -> ArgHandle {
        let handle = ArgHandle { index, name };
        if !self.registered.contains(&handle) {
            self.registered.push(handle);
        }
        handle
    }

    /// Handle of an argument registered earlier under `name`.
    ///
    /// # Panics
    ///
    /// Panics if nothing was registered under `name`; that is a bug in the
    /// calling filter, not a caller error.
    pub fn registered(&self, name: &str) -> ArgHandle {
        match self.registered.iter().find(|handle| handle.name == name) {
            Some(handle) => *handle,
            None => panic!("argument {name} read before it was registered"),
        }
    }

    /// Named arguments that no registration claimed
    pub fn unclaimed_names(&self) -> Vec<&str> {
        self.named
            .keys()
            .filter(|key| !self.registered.iter().any(|handle| handle.name == key.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Value supplied for `handle`, `None` when absent or empty
    pub fn get(&self, handle: ArgHandle) -> Result<Option<&Value>> {
        let positional = self.positional.get(handle.index).filter(|v| **v != Value::Empty);
        let named = self.named.get(handle.name).filter(|v| **v != Value::Empty);
        match (positional, named) {
            (Some(_), Some(_)) => Err(FilterError::malformed(
                handle.name,
                "supplied both by position and by name",
            )),
            (Some(value), None) | (None, Some(value)) => Ok(Some(value)),
            (None, None) => Ok(None),
        }
    }

    pub fn is_supplied(&self, handle: ArgHandle) -> Result<bool> {
        Ok(self.get(handle)?.is_some())
    }

    pub fn read_string(&self, handle: ArgHandle, default: &str) -> Result<String> {
        match self.get(handle)? {
            None => Ok(default.to_string()),
            Some(Value::Text(text)) => Ok(text.clone()),
            Some(other) => Err(mismatch(handle, "a string", other)),
        }
    }

    pub fn read_scalar(&self, handle: ArgHandle, default: f64) -> Result<f64> {
        let value = match self.get(handle)? {
            None => return Ok(default),
            Some(Value::Scalar(v)) => *v,
            Some(Value::Bool(b)) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Some(Value::Vector(v)) if v.len() == 1 => v[0],
            Some(Value::Array(a)) if a.len() == 1 => a.to_f64_vec()[0],
            Some(other) => return Err(mismatch(handle, "a scalar", other)),
        };
        debug!(argument = handle.name, value, "read scalar");
        Ok(value)
    }

    /// Scalar that must be a non-negative count; non-integers are floored.
    pub fn read_count(&self, handle: ArgHandle, default: usize) -> Result<usize> {
        let value = self.read_scalar(handle, default as f64)?;
        to_count(handle.name, value)
    }

    pub fn read_flag(&self, handle: ArgHandle, default: bool) -> Result<bool> {
        match self.get(handle)? {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Ok(self.read_scalar(handle, 0.0)? != 0.0),
        }
    }

    /// Row vector; when `expected_len` is given the length must match exactly.
    pub fn read_row_vector(
        &self,
        handle: ArgHandle,
        default: Vec<f64>,
        expected_len: Option<usize>,
    ) -> Result<Vec<f64>> {
        let values = match self.get(handle)? {
            None => return Ok(default),
            Some(Value::Vector(v)) => v.clone(),
            Some(Value::Scalar(v)) => vec![*v],
            Some(Value::Array(a)) if is_row_shaped(a.shape()) => a.to_f64_vec(),
            Some(other) => return Err(mismatch(handle, "a row vector", other)),
        };
        if let Some(len) = expected_len {
            if values.len() != len {
                return Err(FilterError::malformed(
                    handle.name,
                    format!("expected a row vector with {len} elements, got {}", values.len()),
                ));
            }
        }
        Ok(values)
    }

    /// Per-axis counts; non-integers are floored.
    pub fn read_counts(&self, handle: ArgHandle, default: Vec<usize>) -> Result<Vec<usize>> {
        let len = default.len();
        let defaults = default.iter().map(|&v| v as f64).collect();
        self.read_row_vector(handle, defaults, Some(len))?
            .into_iter()
            .map(|v| to_count(handle.name, v))
            .collect()
    }

    /// Array argument of any shape, `None` when absent
    pub fn read_array(&self, handle: ArgHandle) -> Result<Option<AnyArray>> {
        match self.get(handle)? {
            None => Ok(None),
            Some(Value::Array(a)) => Ok(Some(a.clone())),
            Some(Value::Vector(v)) => {
                let array = ArrayD::from_shape_vec(IxDyn(&[1, v.len()]), v.clone())?;
                Ok(Some(AnyArray::Double(array)))
            }
            Some(other) => Err(mismatch(handle, "an array", other)),
        }
    }
}

fn is_row_shaped(shape: &[usize]) -> bool {
    shape.iter().filter(|&&n| n != 1).count() <= 1
}

fn to_count(name: &str, value: f64) -> Result<usize> {
    if !value.is_finite() || value < 0.0 {
        return Err(FilterError::malformed(
            name,
            format!("expected a non-negative number, got {value}"),
        ));
    }
    Ok(value.floor() as usize)
}

fn mismatch(handle: ArgHandle, expected: &str, got: &Value) -> FilterError {
    FilterError::malformed(handle.name, format!("expected {expected}, got {}", got.kind()))
}
