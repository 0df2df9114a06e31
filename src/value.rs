//! Abstract JavaScript values.
//!
//! A [`JsValue`] is what the engine knows about one binding: a literal, a
//! plain object, an array, or a lazily populated prototype object. Containers
//! hold [`Wrapper`]s, so object graphs may be cyclic; anything that walks a
//! container goes through [`FormatGuard`] to terminate on cycles.

use crate::wrapper::Wrapper;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Longest array the engine tracks element-by-element.
pub const MAX_ARRAY_LENGTH: usize = 100_000;

/// Longest string the engine folds. Longer results become unknown.
pub const MAX_STRING_LENGTH: usize = 1 << 20;

/// Printed in place of a container that is already being formatted.
pub const RECURSION_SENTINEL: &str = "(recursion)";

/// A JavaScript primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Regex(String),
}

impl Literal {
    /// Read the literal carried by an ESTree `Literal` node.
    pub fn from_estree(node: &Value) -> Self {
        if let Some(regex) = node.get("regex") {
            let pattern = regex.get("pattern").and_then(Value::as_str).unwrap_or("");
            let flags = regex.get("flags").and_then(Value::as_str).unwrap_or("");
            return Literal::Regex(format!("/{pattern}/{flags}"));
        }
        if let Some(bigint) = node.get("bigint").and_then(Value::as_str) {
            return Literal::Number(bigint.parse().unwrap_or(f64::NAN));
        }
        match node.get("value") {
            Some(Value::String(s)) => Literal::String(s.clone()),
            Some(Value::Bool(b)) => Literal::Bool(*b),
            Some(Value::Number(n)) => Literal::Number(n.as_f64().unwrap_or(f64::NAN)),
            Some(Value::Null) | None => Literal::Null,
            Some(_) => Literal::Undefined,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// `ToString` as JavaScript performs it.
    pub fn to_js_string(&self) -> String {
        match self {
            Literal::Undefined => "undefined".to_string(),
            Literal::Null => "null".to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Number(n) => format_number(*n),
            Literal::String(s) => s.clone(),
            Literal::Regex(r) => r.clone(),
        }
    }

    /// `ToNumber` as JavaScript performs it.
    pub fn to_number(&self) -> f64 {
        match self {
            Literal::Undefined | Literal::Regex(_) => f64::NAN,
            Literal::Null => 0.0,
            Literal::Bool(b) => f64::from(u8::from(*b)),
            Literal::Number(n) => *n,
            Literal::String(s) => string_to_number(s),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Literal::Undefined | Literal::Null => false,
            Literal::Bool(b) => *b,
            Literal::Number(n) => *n != 0.0 && !n.is_nan(),
            Literal::String(s) => !s.is_empty(),
            Literal::Regex(_) => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Literal::Undefined => "undefined",
            Literal::Null | Literal::Regex(_) => "object",
            Literal::Bool(_) => "boolean",
            Literal::Number(_) => "number",
            Literal::String(_) => "string",
        }
    }

    pub fn strict_eq(&self, other: &Literal) -> bool {
        match (self, other) {
            (Literal::Number(a), Literal::Number(b)) => a == b,
            (Literal::Regex(_), Literal::Regex(_)) => false,
            _ => self == other,
        }
    }

    pub fn loose_eq(&self, other: &Literal) -> bool {
        match (self, other) {
            (Literal::Undefined | Literal::Null, Literal::Undefined | Literal::Null) => true,
            (Literal::Undefined | Literal::Null, _) | (_, Literal::Undefined | Literal::Null) => {
                false
            }
            (Literal::String(a), Literal::String(b)) => a == b,
            (Literal::Regex(_), _) | (_, Literal::Regex(_)) => false,
            _ => self.to_number() == other.to_number(),
        }
    }

    /// Fold a binary operator over two known operands.
    ///
    /// Returns `None` for operators whose result is not a primitive the
    /// engine tracks (`instanceof`, `in`).
    pub fn binary(&self, op: &str, rhs: &Literal) -> Option<Literal> {
        let num = |f: fn(f64, f64) -> f64| Some(Literal::Number(f(self.to_number(), rhs.to_number())));
        let int = |f: fn(i32, i32) -> i32| {
            Some(Literal::Number(f64::from(f(
                to_int32(self.to_number()),
                to_int32(rhs.to_number()),
            ))))
        };
        match op {
            "+" => match (self, rhs) {
                (Literal::String(_), _)
                | (_, Literal::String(_))
                | (Literal::Regex(_), _)
                | (_, Literal::Regex(_)) => {
                    let (lhs, rhs) = (self.to_js_string(), rhs.to_js_string());
                    if lhs.len() + rhs.len() > MAX_STRING_LENGTH {
                        return None;
                    }
                    Some(Literal::String(lhs + &rhs))
                }
                _ => num(|a, b| a + b),
            },
            "-" => num(|a, b| a - b),
            "*" => num(|a, b| a * b),
            "/" => num(|a, b| a / b),
            "%" => num(|a, b| a % b),
            "**" => num(f64::powf),
            "==" => Some(Literal::Bool(self.loose_eq(rhs))),
            "!=" => Some(Literal::Bool(!self.loose_eq(rhs))),
            "===" => Some(Literal::Bool(self.strict_eq(rhs))),
            "!==" => Some(Literal::Bool(!self.strict_eq(rhs))),
            "<" | ">" | "<=" | ">=" => Some(Literal::Bool(self.compare(op, rhs))),
            "&" => int(|a, b| a & b),
            "|" => int(|a, b| a | b),
            "^" => int(|a, b| a ^ b),
            "<<" => int(|a, b| a.wrapping_shl(b as u32 & 31)),
            ">>" => int(|a, b| a.wrapping_shr(b as u32 & 31)),
            ">>>" => {
                let a = to_int32(self.to_number()) as u32;
                let b = to_int32(rhs.to_number()) as u32 & 31;
                Some(Literal::Number(f64::from(a >> b)))
            }
            _ => None,
        }
    }

    fn compare(&self, op: &str, rhs: &Literal) -> bool {
        if let (Literal::String(a), Literal::String(b)) = (self, rhs) {
            return match op {
                "<" => a < b,
                ">" => a > b,
                "<=" => a <= b,
                _ => a >= b,
            };
        }
        let (a, b) = (self.to_number(), rhs.to_number());
        match op {
            "<" => a < b,
            ">" => a > b,
            "<=" => a <= b,
            _ => a >= b,
        }
    }

    /// Fold a unary operator. `typeof`, `delete` and `void` are handled by
    /// the caller since they do not need a known operand.
    pub fn unary(&self, op: &str) -> Option<Literal> {
        match op {
            "!" => Some(Literal::Bool(!self.truthy())),
            "-" => Some(Literal::Number(-self.to_number())),
            "+" => Some(Literal::Number(self.to_number())),
            "~" => Some(Literal::Number(f64::from(!to_int32(self.to_number())))),
            _ => None,
        }
    }

    /// Rendering used by aggregate output: strings are quoted.
    fn output(&self) -> String {
        match self {
            Literal::String(s) => format!("{s:?}"),
            other => other.to_js_string(),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    (n.trunc() as i64 & 0xFFFF_FFFF) as u32 as i32
}

/// Parse a property name as an array index.
pub fn array_index(name: &str) -> Option<usize> {
    if !name.bytes().all(|b| b.is_ascii_digit()) || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    name.parse().ok()
}

/// Marks a container as "currently formatting" for the guard's lifetime.
pub struct FormatGuard<'a>(&'a Cell<bool>);

impl<'a> FormatGuard<'a> {
    /// Returns `None` if the container is already being formatted.
    pub fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for FormatGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Plain object: property name -> wrapper.
#[derive(Default)]
pub struct JsObject {
    properties: RefCell<BTreeMap<String, Wrapper>>,
    formatting: Cell<bool>,
}

impl JsObject {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn get(&self, name: &str) -> Option<Wrapper> {
        self.properties.borrow().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.properties.borrow().contains_key(name)
    }

    pub fn insert(&self, name: impl Into<String>, value: Wrapper) {
        self.properties.borrow_mut().insert(name.into(), value);
    }

    pub fn keys(&self) -> Vec<String> {
        self.properties.borrow().keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Wrapper)> {
        self.properties
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.properties.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.borrow().is_empty()
    }

    fn output(&self) -> String {
        let Some(_guard) = FormatGuard::enter(&self.formatting) else {
            return RECURSION_SENTINEL.to_string();
        };
        let body: Vec<String> = self
            .entries()
            .into_iter()
            .map(|(key, value)| format!("{key}: {}", value.output()))
            .collect();
        format!("{{{}}}", body.join(", "))
    }
}

/// Array with optional (hole) elements, capped at [`MAX_ARRAY_LENGTH`].
#[derive(Default)]
pub struct JsArray {
    elements: RefCell<Vec<Option<Wrapper>>>,
    formatting: Cell<bool>,
}

impl JsArray {
    pub fn new(elements: Vec<Option<Wrapper>>) -> Rc<Self> {
        let mut elements = elements;
        elements.truncate(MAX_ARRAY_LENGTH);
        Rc::new(Self {
            elements: RefCell::new(elements),
            formatting: Cell::new(false),
        })
    }

    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Wrapper> {
        self.elements.borrow().get(index).cloned().flatten()
    }

    /// Store an element. Indices at or past the cap are dropped; returns
    /// whether the element was stored.
    pub fn set(&self, index: usize, value: Wrapper) -> bool {
        if index >= MAX_ARRAY_LENGTH {
            return false;
        }
        let mut elements = self.elements.borrow_mut();
        if index >= elements.len() {
            elements.resize(index + 1, None);
        }
        elements[index] = Some(value);
        true
    }

    /// `Array.prototype.join(",")` over known elements. `None` if any
    /// element is unknown.
    pub fn join(&self) -> Option<String> {
        let Some(_guard) = FormatGuard::enter(&self.formatting) else {
            return Some(RECURSION_SENTINEL.to_string());
        };
        let elements: Vec<Option<Wrapper>> = self.elements.borrow().clone();
        let mut parts = Vec::with_capacity(elements.len());
        let mut length = elements.len().saturating_sub(1);
        for element in elements {
            let part = match element {
                None => String::new(),
                Some(wrapper) => match wrapper.literal_value()? {
                    Literal::Undefined | Literal::Null => String::new(),
                    other => other.to_js_string(),
                },
            };
            length += part.len();
            if length > MAX_STRING_LENGTH {
                return None;
            }
            parts.push(part);
        }
        Some(parts.join(","))
    }

    fn output(&self) -> String {
        let Some(_guard) = FormatGuard::enter(&self.formatting) else {
            return RECURSION_SENTINEL.to_string();
        };
        let elements: Vec<Option<Wrapper>> = self.elements.borrow().clone();
        let body: Vec<String> = elements
            .iter()
            .map(|e| e.as_ref().map(Wrapper::output).unwrap_or_default())
            .collect();
        format!("[{}]", body.join(", "))
    }
}

/// The concrete shape of a value.
#[derive(Clone)]
pub enum JsValue {
    Literal(Literal),
    Object(Rc<JsObject>),
    Array(Rc<JsArray>),
    /// `.prototype` object, created empty on first access.
    Prototype(Rc<JsObject>),
}

impl JsValue {
    pub fn object() -> Self {
        JsValue::Object(JsObject::new())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            JsValue::Literal(_) => "literal",
            JsValue::Object(_) => "object",
            JsValue::Array(_) => "array",
            JsValue::Prototype(_) => "prototype",
        }
    }

    /// Object-like payload (plain objects and prototypes).
    pub fn as_object(&self) -> Option<&Rc<JsObject>> {
        match self {
            JsValue::Object(obj) | JsValue::Prototype(obj) => Some(obj),
            _ => None,
        }
    }

    /// Identity for containers, strict equality for literals.
    pub fn same_as(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Literal(a), JsValue::Literal(b)) => a.strict_eq(b),
            (JsValue::Object(a), JsValue::Object(b))
            | (JsValue::Prototype(a), JsValue::Prototype(b)) => Rc::ptr_eq(a, b),
            (JsValue::Array(a), JsValue::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `key in value`: index bounds for arrays, key presence for objects.
    pub fn contains(&self, key: &Literal) -> Option<bool> {
        match self {
            JsValue::Array(array) => {
                let index = key.to_number();
                Some(index >= 0.0 && index.fract() == 0.0 && (index as usize) < array.len())
            }
            JsValue::Object(obj) | JsValue::Prototype(obj) => Some(obj.has(&key.to_js_string())),
            JsValue::Literal(_) => None,
        }
    }

    /// Best-effort aggregate rendering; cycles print [`RECURSION_SENTINEL`].
    pub fn output(&self) -> String {
        match self {
            JsValue::Literal(lit) => lit.output(),
            JsValue::Object(obj) | JsValue::Prototype(obj) => obj.output(),
            JsValue::Array(array) => array.output(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting_matches_js() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn binary_folding() {
        let s = Literal::from("ev");
        assert_eq!(s.binary("+", &Literal::from("al")), Some(Literal::from("eval")));
        assert_eq!(
            Literal::Number(1.0).binary("+", &Literal::from("2")),
            Some(Literal::from("12"))
        );
        assert_eq!(
            Literal::Number(7.0).binary("%", &Literal::Number(4.0)),
            Some(Literal::Number(3.0))
        );
        assert_eq!(
            Literal::Null.binary("==", &Literal::Undefined),
            Some(Literal::Bool(true))
        );
        assert_eq!(
            Literal::Null.binary("===", &Literal::Undefined),
            Some(Literal::Bool(false))
        );
        assert_eq!(
            Literal::Number(-1.0).binary(">>>", &Literal::Number(28.0)),
            Some(Literal::Number(15.0))
        );
        assert_eq!(Literal::from("a").binary("instanceof", &Literal::Null), None);
    }

    #[test]
    fn loose_equality_coerces_strings() {
        assert!(Literal::from("1").loose_eq(&Literal::Number(1.0)));
        assert!(Literal::Bool(true).loose_eq(&Literal::Number(1.0)));
        assert!(!Literal::Null.loose_eq(&Literal::Number(0.0)));
    }

    #[test]
    fn array_indices_are_plain_digits() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("12"), Some(12));
        assert_eq!(array_index("012"), None);
        assert_eq!(array_index("length"), None);
        assert_eq!(array_index("+1"), None);
        assert_eq!(array_index(" 1"), None);
    }

    #[test]
    fn array_storage_is_capped() {
        let array = JsArray::new(Vec::new());
        assert!(!array.set(MAX_ARRAY_LENGTH, Wrapper::literal(1.0)));
        assert!(array.set(2, Wrapper::literal(1.0)));
        assert_eq!(array.len(), 3);
        assert_eq!(array.join().as_deref(), Some(",,1"));
    }

    #[test]
    fn string_concatenation_is_capped() {
        let half = Literal::String("a".repeat(MAX_STRING_LENGTH / 2));
        let full = half.binary("+", &half).expect("fits exactly");
        assert_eq!(full.to_js_string().len(), MAX_STRING_LENGTH);
        assert_eq!(full.binary("+", &Literal::from("b")), None);
        assert_eq!(
            Literal::Number(1.0).binary("+", &Literal::Number(2.0)),
            Some(Literal::Number(3.0))
        );
    }

    #[test]
    fn format_guard_resets_on_drop() {
        let flag = Cell::new(false);
        {
            let _guard = FormatGuard::enter(&flag).expect("first entry");
            assert!(FormatGuard::enter(&flag).is_none());
        }
        assert!(!flag.get());
    }
}
