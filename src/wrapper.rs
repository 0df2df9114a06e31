//! The engine's handle on one binding: a [`JsValue`] plus analysis flags.
//!
//! Wrappers are shared (`Rc`) so that a scope binding, an object property
//! and an expression result can all refer to the same slot. `set` mutates the
//! slot in place, which is how reassignment becomes visible to every alias.

use crate::catalog::GlobalRef;
use crate::diagnostics::{ErrorId, Report};
use crate::traverser::Traverser;
use crate::value::{JsArray, JsObject, JsValue, Literal, MAX_ARRAY_LENGTH, array_index};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Mutation hook run before a value is stored into a slot. It may return a
/// different value to store instead.
pub type Setter = for<'a> fn(&mut Traverser<'a>, &Wrapper, Wrapper) -> Wrapper;

/// Anything that can be assigned into a wrapper.
pub enum Assignment {
    Value(Wrapper),
    Literal(Literal),
    /// Computed with the current traverser at assignment time.
    Lazy(Box<dyn for<'a> FnOnce(&mut Traverser<'a>) -> Wrapper>),
}

impl From<Wrapper> for Assignment {
    fn from(value: Wrapper) -> Self {
        Assignment::Value(value)
    }
}

impl From<&Wrapper> for Assignment {
    fn from(value: &Wrapper) -> Self {
        Assignment::Value(value.clone())
    }
}

impl From<Literal> for Assignment {
    fn from(value: Literal) -> Self {
        Assignment::Literal(value)
    }
}

impl From<&str> for Assignment {
    fn from(value: &str) -> Self {
        Assignment::Literal(Literal::from(value))
    }
}

impl From<f64> for Assignment {
    fn from(value: f64) -> Self {
        Assignment::Literal(Literal::Number(value))
    }
}

impl From<bool> for Assignment {
    fn from(value: bool) -> Self {
        Assignment::Literal(Literal::Bool(value))
    }
}

struct WrapperData {
    value: JsValue,
    /// Set for wrappers materialized from the hazard catalog. The value is
    /// then always an (initially empty) object, never a literal.
    global: Option<GlobalRef>,
    /// The catalog's own slot, as opposed to a binding that aliases it.
    catalog_slot: bool,
    /// Property name, for slots that live inside an object.
    name: Option<String>,
    is_const: bool,
    is_lazy: bool,
    is_dirty: bool,
    callable: bool,
    setter: Option<Setter>,
}

impl WrapperData {
    fn new(value: JsValue) -> Self {
        Self {
            value,
            global: None,
            catalog_slot: false,
            name: None,
            is_const: false,
            is_lazy: false,
            is_dirty: false,
            callable: false,
            setter: None,
        }
    }
}

#[derive(Clone)]
pub struct Wrapper(Rc<RefCell<WrapperData>>);

impl Wrapper {
    fn from_data(data: WrapperData) -> Self {
        Self(Rc::new(RefCell::new(data)))
    }

    pub fn new(value: JsValue) -> Self {
        Self::from_data(WrapperData::new(value))
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        Self::new(JsValue::Literal(value.into()))
    }

    pub fn undefined() -> Self {
        Self::literal(Literal::Undefined)
    }

    /// A value the engine could not determine.
    pub fn dirty() -> Self {
        let mut data = WrapperData::new(JsValue::object());
        data.is_dirty = true;
        Self::from_data(data)
    }

    pub fn object() -> Self {
        Self::new(JsValue::object())
    }

    pub fn from_object(object: Rc<JsObject>) -> Self {
        Self::new(JsValue::Object(object))
    }

    pub fn array(elements: Vec<Option<Wrapper>>) -> Self {
        Self::new(JsValue::Array(JsArray::new(elements)))
    }

    /// A function value. Calling it yields an unknown result.
    pub fn function() -> Self {
        let mut data = WrapperData::new(JsValue::object());
        data.callable = true;
        Self::from_data(data)
    }

    pub fn global(global: GlobalRef, lazy: bool) -> Self {
        let mut data = WrapperData::new(JsValue::object());
        data.global = Some(global);
        data.catalog_slot = true;
        data.is_lazy = lazy;
        Self::from_data(data)
    }

    /// Fresh slot holding the same payload. Containers stay shared.
    pub fn copy_of(other: &Wrapper) -> Self {
        let src = other.0.borrow();
        let mut data = WrapperData::new(src.value.clone());
        data.global = src.global.clone();
        data.is_lazy = src.is_lazy;
        data.is_dirty = src.is_dirty;
        data.callable = src.callable;
        Self::from_data(data)
    }

    pub(crate) fn property(name: &str, setter: Option<Setter>) -> Self {
        let mut data = WrapperData::new(JsValue::Literal(Literal::Undefined));
        data.name = Some(name.to_string());
        data.setter = setter;
        Self::from_data(data)
    }

    pub fn ptr_eq(&self, other: &Wrapper) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn value(&self) -> JsValue {
        self.0.borrow().value.clone()
    }

    pub fn global_ref(&self) -> Option<GlobalRef> {
        self.0.borrow().global.clone()
    }

    pub fn is_global(&self) -> bool {
        self.0.borrow().global.is_some()
    }

    pub fn is_const(&self) -> bool {
        self.0.borrow().is_const
    }

    pub fn is_lazy(&self) -> bool {
        self.0.borrow().is_lazy
    }

    pub fn is_dirty(&self) -> bool {
        self.0.borrow().is_dirty
    }

    pub fn is_callable(&self) -> bool {
        self.0.borrow().callable
    }

    pub fn property_name(&self) -> Option<String> {
        self.0.borrow().name.clone()
    }

    pub fn mark_const(&self) {
        self.0.borrow_mut().is_const = true;
    }

    pub fn mark_dirty(&self) {
        self.0.borrow_mut().is_dirty = true;
    }

    pub fn is_literal(&self) -> bool {
        let data = self.0.borrow();
        !data.is_dirty && data.global.is_none() && matches!(data.value, JsValue::Literal(_))
    }

    /// Known primitive value. Containers produce their string form (arrays
    /// join their elements, objects print as `[object Object]`).
    pub fn literal_value(&self) -> Option<Literal> {
        let value = {
            let data = self.0.borrow();
            if data.is_dirty || data.global.is_some() || data.callable {
                return None;
            }
            data.value.clone()
        };
        match value {
            JsValue::Literal(lit) => Some(lit),
            JsValue::Array(array) => array.join().map(Literal::String),
            JsValue::Object(_) | JsValue::Prototype(_) => {
                Some(Literal::String("[object Object]".to_string()))
            }
        }
    }

    /// Known string primitive (not a coerced container).
    pub fn string_value(&self) -> Option<String> {
        if !self.is_literal() {
            return None;
        }
        match self.literal_value()? {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_of(&self) -> Option<&'static str> {
        let data = self.0.borrow();
        if data.callable {
            return Some("function");
        }
        if data.is_dirty || data.global.is_some() {
            return None;
        }
        match &data.value {
            JsValue::Literal(lit) => Some(lit.type_of()),
            _ => Some("object"),
        }
    }

    /// `key in self`, when the receiver is known.
    pub fn contains(&self, key: &Literal) -> Option<bool> {
        let data = self.0.borrow();
        if data.is_dirty || data.global.is_some() {
            return None;
        }
        data.value.contains(key)
    }

    /// Aggregate rendering, safe on cyclic graphs.
    pub fn output(&self) -> String {
        let (value, global) = {
            let data = self.0.borrow();
            (data.value.clone(), data.global.clone())
        };
        match global {
            Some(global) => format!("<global {}>", global.path),
            None => value.output(),
        }
    }

    /// Same value as `other` without being the same slot.
    fn holds_same(&self, other: &Wrapper) -> bool {
        let (a, b) = (self.0.borrow(), other.0.borrow());
        if a.is_dirty || b.is_dirty {
            return false;
        }
        match (&a.global, &b.global) {
            (Some(x), Some(y)) => x.path == y.path,
            (None, None) => a.callable == b.callable && a.value.same_as(&b.value),
            _ => false,
        }
    }

    /// Property or index read.
    pub fn get(&self, tr: &mut Traverser<'_>, name: &str) -> Wrapper {
        if let Some(reader) = tr.catalog().property(name).and_then(|p| p.on_read) {
            reader(tr, self, name);
        }

        let (value, global, dirty) = {
            let data = self.0.borrow();
            (data.value.clone(), data.global.clone(), data.is_dirty)
        };

        if let Some(global) = global {
            if let Some(written) = value.as_object().and_then(|o| o.get(name)) {
                return written;
            }
            return tr.global_member(&global, name);
        }

        match value {
            JsValue::Literal(Literal::String(s)) => {
                if name == "length" {
                    return Wrapper::literal(s.chars().count() as f64);
                }
                match array_index(name).and_then(|i| s.chars().nth(i)) {
                    Some(c) => Wrapper::literal(c.to_string()),
                    None => Wrapper::dirty(),
                }
            }
            JsValue::Literal(_) => Wrapper::dirty(),
            JsValue::Array(array) => {
                if name == "length" && !dirty {
                    return Wrapper::literal(array.len() as f64);
                }
                array_index(name)
                    .and_then(|i| array.get(i))
                    .unwrap_or_else(Wrapper::dirty)
            }
            JsValue::Object(obj) | JsValue::Prototype(obj) => {
                if let Some(existing) = obj.get(name) {
                    return existing;
                }
                if name == "prototype" {
                    let proto = Wrapper::new(JsValue::Prototype(JsObject::new()));
                    obj.insert("prototype", proto.clone());
                    return proto;
                }
                Wrapper::dirty()
            }
        }
    }

    /// Replace the value held by this slot.
    ///
    /// Writes to read-only globals are reported and dropped. Constants are
    /// reported unless `overwrite_const` is set, then replaced anyway.
    pub fn set(&self, tr: &mut Traverser<'_>, value: impl Into<Assignment>, overwrite_const: bool) {
        let value = match value.into() {
            Assignment::Value(wrapper) => wrapper,
            Assignment::Literal(lit) => Wrapper::literal(lit),
            Assignment::Lazy(compute) => compute(tr),
        };
        if self.ptr_eq(&value) || self.holds_same(&value) {
            return;
        }

        let catalog_slot = self.0.borrow().catalog_slot;
        if catalog_slot
            && let Some(global) = self.global_ref()
            && tr.catalog().is_read_only(&global.path)
        {
            tr.report_global_overwrite(&global.path);
            return;
        }

        let setter = self.0.borrow().setter;
        let value = match setter {
            Some(setter) => setter(tr, self, value),
            None => value,
        };
        if self.ptr_eq(&value) {
            return;
        }

        if self.is_const() && !overwrite_const {
            let name = self.property_name().unwrap_or_default();
            tr.warning(
                Report::new(
                    ErrorId::js("wrapper_set", "const_overwrite"),
                    "Overwritten constant value",
                )
                .description([
                    "A variable declared as constant has been overwritten.".to_string(),
                    format!("Replaced value: {}", self.output()),
                ])
                .description((!name.is_empty()).then(|| format!("Constant: {name}"))),
            );
        }

        let src = value.0.borrow();
        let mut dst = self.0.borrow_mut();
        dst.value = src.value.clone();
        dst.global = src.global.clone();
        dst.callable = src.callable;
        dst.is_lazy = src.is_lazy;
        dst.is_dirty = src.is_dirty && !matches!(src.value, JsValue::Literal(_));
    }

    /// Property or index write (`self[name] = value`).
    pub fn set_property(&self, tr: &mut Traverser<'_>, name: &str, value: Wrapper) {
        let (target, global) = {
            let data = self.0.borrow();
            (data.value.clone(), data.global.clone())
        };
        if let Some(global) = &global
            && tr.set_global_member(global, name, &value)
        {
            return;
        }

        match target {
            JsValue::Literal(_) => {}
            JsValue::Array(array) => {
                let Some(index) = array_index(name) else {
                    return;
                };
                match array.get(index) {
                    Some(existing) => existing.set(tr, value, false),
                    None if index < MAX_ARRAY_LENGTH => {
                        array.set(index, Wrapper::copy_of(&value));
                    }
                    None => {}
                }
            }
            JsValue::Object(obj) | JsValue::Prototype(obj) => {
                let setter = tr.catalog().property(name).and_then(|p| p.on_set);
                let slot = match obj.get(name) {
                    Some(existing) => {
                        if setter.is_some() {
                            existing.0.borrow_mut().setter = setter;
                        }
                        existing
                    }
                    None => {
                        let slot = Wrapper::property(name, setter);
                        obj.insert(name, slot.clone());
                        slot
                    }
                };
                slot.set(tr, value, false);
            }
        }
    }
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow on purpose: payloads may be cyclic.
        let data = self.0.borrow();
        let mut dbg = f.debug_struct("Wrapper");
        match &data.value {
            JsValue::Literal(lit) => dbg.field("literal", lit),
            other => dbg.field("kind", &other.kind_name()),
        };
        if let Some(global) = &data.global {
            dbg.field("global", &global.path);
        }
        dbg.field("const", &data.is_const)
            .field("dirty", &data.is_dirty)
            .field("callable", &data.callable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::ErrorBundle;
    use crate::value::RECURSION_SENTINEL;

    #[test]
    fn mutually_referencing_objects_render_once_per_cycle() {
        let a = JsObject::new();
        let b = JsObject::new();
        a.insert("b", Wrapper::from_object(b.clone()));
        b.insert("a", Wrapper::from_object(a.clone()));

        let rendered = Wrapper::from_object(a).output();
        assert_eq!(rendered, "{b: {a: (recursion)}}");
        assert_eq!(rendered.matches(RECURSION_SENTINEL).count(), 1);
    }

    #[test]
    fn self_containing_array_joins_with_sentinel() {
        let array = Wrapper::array(vec![Some(Wrapper::literal(1.0))]);
        if let JsValue::Array(inner) = array.value() {
            inner.set(1, array.clone());
        }
        assert_eq!(
            array.literal_value(),
            Some(Literal::String(format!("1,{RECURSION_SENTINEL}")))
        );
    }

    #[test]
    fn set_runs_lazy_assignments_and_clears_dirty() {
        let mut bundle = ErrorBundle::new();
        let mut tr = Traverser::new(&mut bundle);

        let slot = Wrapper::dirty();
        let lazy = Assignment::Lazy(Box::new(|_: &mut Traverser<'_>| Wrapper::literal("ok")));
        slot.set(&mut tr, lazy, false);
        assert!(!slot.is_dirty());
        assert_eq!(slot.string_value().as_deref(), Some("ok"));

        slot.set(&mut tr, 3.0, false);
        assert_eq!(slot.literal_value(), Some(Literal::Number(3.0)));
        drop(tr);
        assert!(bundle.diagnostics().is_empty());
    }

    #[test]
    fn equal_assignment_skips_hooks() {
        fn counting(tr: &mut Traverser<'_>, _slot: &Wrapper, value: Wrapper) -> Wrapper {
            tr.metadata_mut().set("hook_ran", true);
            value
        }

        let mut bundle = ErrorBundle::new();
        let mut tr = Traverser::new(&mut bundle);
        let slot = Wrapper::property("x", Some(counting));
        slot.set(&mut tr, "v", false);
        assert!(tr.metadata().flag("hook_ran"));

        tr.metadata_mut().set("hook_ran", false);
        slot.set(&mut tr, "v", false);
        assert!(!tr.metadata().flag("hook_ran"));
    }

    #[test]
    fn const_overwrite_with_override_is_silent() {
        let mut bundle = ErrorBundle::new();
        let mut tr = Traverser::new(&mut bundle);
        let slot = Wrapper::literal(1.0);
        slot.mark_const();

        slot.set(&mut tr, 2.0, true);
        slot.set(&mut tr, 3.0, false);
        drop(tr);
        assert_eq!(bundle.diagnostics().len(), 1);
        assert!(
            bundle.diagnostics()[0]
                .id
                .is("javascript", "wrapper_set", "const_overwrite")
        );
    }
}
