//! Hooks keyed by property or method name that fire on any receiver.

use super::{CallHook, CallSite, PropertyHook};
use crate::compat::VersionRange;
use crate::diagnostics::{ErrorId, Report};
use crate::level::{Severity, SigningSeverity};
use crate::traverser::Traverser;
use crate::wrapper::{Setter, Wrapper};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static EVENT_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<[^>]*\son[a-z]+\s*="#).expect("event attribute pattern is valid")
});

static SCRIPT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*script\b").expect("script tag pattern is valid"));

/// `handleEvent` listener objects assigned to `on*` properties changed
/// behaviour in this release.
const HANDLE_EVENT_CHANGED: &[VersionRange] = &[VersionRange::firefox("18.0a1")];

pub(super) fn property_hooks() -> HashMap<&'static str, PropertyHook> {
    HashMap::from([
        ("innerHTML", setter(set_inner_html)),
        ("outerHTML", setter(set_outer_html)),
        ("__proto__", setter(set_proto)),
        ("contentScript", setter(set_content_script)),
        (
            "wrappedJSObject",
            PropertyHook {
                on_set: None,
                on_read: Some(read_wrapped_js_object),
            },
        ),
    ])
}

pub(super) fn event_handler_hook() -> PropertyHook {
    setter(set_event_handler)
}

fn setter(on_set: Setter) -> PropertyHook {
    PropertyHook {
        on_set: Some(on_set),
        on_read: None,
    }
}

pub(super) fn call_hooks() -> HashMap<&'static str, CallHook> {
    HashMap::from([
        ("createElement", create_element as CallHook),
        ("createElementNS", create_element as CallHook),
        ("setAttribute", set_attribute as CallHook),
        ("insertAdjacentHTML", insert_adjacent_html as CallHook),
        ("addEventListener", add_event_listener as CallHook),
        ("QueryInterface", query_interface as CallHook),
        ("getInterface", query_interface as CallHook),
    ])
}

/// Flag markup written into the document. Shared by the innerHTML family
/// and `insertAdjacentHTML`.
fn check_markup(tr: &mut Traverser<'_>, function: &'static str, sink: &str, value: &Wrapper) {
    if let Some(markup) = value.string_value() {
        let reason = if EVENT_ATTRIBUTE.is_match(&markup) {
            "event_assignment"
        } else if SCRIPT_TAG.is_match(&markup) {
            "script_assignment"
        } else {
            return;
        };
        let message = match reason {
            "event_assignment" => format!("Event handler assignment via {sink}"),
            _ => format!("Script injection via {sink}"),
        };
        tr.warning(
            Report::new(ErrorId::js(function, reason), message)
                .description([format!(
                    "Markup assigned to {sink} must not contain inline scripts or event handler attributes."
                )])
                .signing(SigningSeverity::Medium),
        );
        return;
    }
    if value.is_literal() {
        return;
    }
    tr.warning(
        Report::new(
            ErrorId::js(function, "variable_assignment"),
            format!("Markup should not be passed to {sink} dynamically"),
        )
        .description([
            format!("Values assigned to {sink} are parsed as HTML and may carry unsanitized input."),
            "Build DOM nodes with createElement() and textContent instead.".to_string(),
        ])
        .signing(SigningSeverity::Medium),
    );
}

fn set_inner_html(tr: &mut Traverser<'_>, _slot: &Wrapper, value: Wrapper) -> Wrapper {
    check_markup(tr, "set_innerHTML", "innerHTML", &value);
    value
}

fn set_outer_html(tr: &mut Traverser<'_>, _slot: &Wrapper, value: Wrapper) -> Wrapper {
    check_markup(tr, "set_outerHTML", "outerHTML", &value);
    value
}

fn set_proto(tr: &mut Traverser<'_>, _slot: &Wrapper, value: Wrapper) -> Wrapper {
    tr.warning(
        Report::new(
            ErrorId::js("set__proto__", "__proto__"),
            "Assignment to __proto__ changes the prototype chain",
        )
        .description(["Use Object.create() or Object.setPrototypeOf() instead."]),
    );
    value
}

fn set_content_script(tr: &mut Traverser<'_>, _slot: &Wrapper, value: Wrapper) -> Wrapper {
    if !value.is_literal() {
        tr.warning(
            Report::new(
                ErrorId::js("set_contentScript", "variable_assignment"),
                "contentScript set to a dynamic value",
            )
            .description(["Content scripts should be static strings or files packaged with the add-on."])
            .signing(SigningSeverity::Medium),
        );
    }
    value
}

fn set_event_handler(tr: &mut Traverser<'_>, slot: &Wrapper, value: Wrapper) -> Wrapper {
    let name = slot.property_name().unwrap_or_else(|| "on*".to_string());
    if value.string_value().is_some() {
        tr.warning(
            Report::new(
                ErrorId::js("set_on_event", "string_assignment"),
                format!("{name} set to a string"),
            )
            .description(["Event handlers must be functions; strings are compiled as code."])
            .signing(SigningSeverity::Medium),
        );
        return value;
    }

    let has_handle_event = value
        .value()
        .as_object()
        .is_some_and(|obj| obj.has("handleEvent"));
    if has_handle_event
        && let Some(info) = tr.compat().compat_info(HANDLE_EVENT_CHANGED, Severity::Warning)
    {
        tr.warning(
            Report::new(
                ErrorId::js("set_on_event", "handleEvent"),
                format!("{name} set to an object with handleEvent"),
            )
            .description(["Objects with handleEvent are no longer accepted as event handler properties."])
            .compatibility(info),
        );
    }
    value
}

fn read_wrapped_js_object(tr: &mut Traverser<'_>, receiver: &Wrapper, _name: &str) {
    if receiver.global_ref().is_some_and(|g| g.is_content()) {
        tr.warning(
            Report::new(
                ErrorId::js("wrappedJSObject", "content"),
                "wrappedJSObject on content objects bypasses security wrappers",
            )
            .description(["Content objects accessed this way can run content code with chrome privileges."])
            .signing(SigningSeverity::High),
        );
    }
}

fn create_element(tr: &mut Traverser<'_>, call: &CallSite) -> Option<Wrapper> {
    let tag_index = usize::from(call.method == "createElementNS");
    let tag = call.args.get(tag_index)?;
    match tag.string_value() {
        Some(name) if name.trim().eq_ignore_ascii_case("script") => tr.warning(
            Report::new(
                ErrorId::js("create_element", "script"),
                "Dynamic creation of script elements",
            )
            .description(["Injected scripts run with the privileges of the document."])
            .signing(SigningSeverity::Medium),
        ),
        Some(_) => {}
        None if !tag.is_literal() => tr.notice(Report::new(
            ErrorId::js("create_element", "variable_tag"),
            format!("{} called with a dynamic tag name", call.method),
        )),
        None => {}
    }
    None
}

fn set_attribute(tr: &mut Traverser<'_>, call: &CallSite) -> Option<Wrapper> {
    let name = call.args.first()?.string_value()?;
    let is_handler = name.len() > 2 && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on"));
    if is_handler {
        tr.warning(
            Report::new(
                ErrorId::js("set_attribute", "event_handler"),
                format!("Event handler attribute `{name}` set with setAttribute"),
            )
            .description(["Attach listeners with addEventListener() instead."])
            .signing(SigningSeverity::Medium),
        );
    }
    None
}

fn insert_adjacent_html(tr: &mut Traverser<'_>, call: &CallSite) -> Option<Wrapper> {
    let markup = call.args.get(1)?;
    check_markup(tr, "insertAdjacentHTML", "insertAdjacentHTML", markup);
    None
}

fn add_event_listener(tr: &mut Traverser<'_>, call: &CallSite) -> Option<Wrapper> {
    let untrusted = call.args.get(3)?.literal_value()?;
    if untrusted.truthy() {
        tr.warning(
            Report::new(
                ErrorId::js("add_event_listener", "wants_untrusted"),
                "addEventListener accepting untrusted events",
            )
            .description(["Listeners that accept untrusted events can be triggered by web content."]),
        );
    }
    None
}

/// `QueryInterface(Ci.nsIFoo)` evaluates to the interface wrapper.
fn query_interface(_tr: &mut Traverser<'_>, call: &CallSite) -> Option<Wrapper> {
    let global = call.args.first()?.global_ref()?;
    Some(Wrapper::global(global, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_patterns() {
        assert!(EVENT_ATTRIBUTE.is_match(r#"<div onclick="foo"></div>"#));
        assert!(EVENT_ATTRIBUTE.is_match("<img src=x ONERROR = alert(1)>"));
        assert!(!EVENT_ATTRIBUTE.is_match("<div>onclick=</div>"));
        assert!(SCRIPT_TAG.is_match("<SCRIPT src=x>"));
        assert!(!SCRIPT_TAG.is_match("<div>script</div>"));
    }
}
