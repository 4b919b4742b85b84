#![cfg(target_arch = "wasm32")]
use pagecue_core::{Document, Selector};
use pagecue_wasm::{abi_version, DomDocument, PageCue};
use serde_wasm_bindgen as swb;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const PAGE: &str = r#"
<nav id="navbar"></nav>
<div id="m1" class="modal">
  <div class="modal-content">
    <button class="modal-close">x</button>
    <div id="m1Body"></div>
  </div>
</div>
<div id="m2" class="modal"><div id="m2Body"></div></div>
<span class="stat-number" data-counter="10">0</span>
"#;

fn mount() -> web_sys::Document {
    let document = web_sys::window().unwrap().document().unwrap();
    document.body().unwrap().set_inner_html(PAGE);
    document
}

#[wasm_bindgen_test]
fn abi_is_1() {
    assert_eq!(abi_version(), 1);
}

#[wasm_bindgen_test]
fn construct_with_defaults_and_config() {
    mount();
    assert!(PageCue::new(JsValue::UNDEFINED).is_ok());
    let cfg = swb::to_value(&serde_json::json!({ "index_mode": "snapshot" })).unwrap();
    assert!(PageCue::new(cfg).is_ok());
}

#[wasm_bindgen_test]
fn invalid_config_errors() {
    mount();
    let cfg = swb::to_value(&serde_json::json!({ "counters": { "threshold": 3.0 } })).unwrap();
    assert!(PageCue::new(cfg).is_err());
    assert!(PageCue::new(JsValue::from_f64(1.0)).is_err());
}

#[wasm_bindgen_test]
fn init_registers_observers() {
    mount();
    let mut cue = PageCue::new(JsValue::NULL).unwrap();
    cue.init().unwrap();
    cue.init().unwrap();
    let observers = js_sys::Array::from(&cue.observers().unwrap());
    assert_eq!(observers.length(), 1);
    assert_eq!(cue.native_observers(), 1);
    let body = web_sys::window().unwrap().document().unwrap().body().unwrap();
    assert!(body.class_list().contains("page-loaded"));
    cue.teardown();
    assert_eq!(cue.pending_tasks(), 0);
    assert_eq!(cue.native_observers(), 0);
}

#[wasm_bindgen_test]
fn modals_stack_and_escape() {
    let document = mount();
    let mut cue = PageCue::new(JsValue::NULL).unwrap();
    assert!(cue.open_modal("m1".into(), None));
    assert!(cue.open_modal("m2".into(), Some("<b>hi</b>".into())));
    assert!(!cue.open_modal("nope".into(), None));
    assert_eq!(cue.open_modals(), vec!["m1".to_string(), "m2".to_string()]);
    let m2_body = document.get_element_by_id("m2Body").unwrap();
    assert_eq!(m2_body.inner_html(), "<b>hi</b>");

    let escape = swb::to_value(&serde_json::json!({ "type": "key_down", "key": "Escape" })).unwrap();
    let outcome = cue.handle_event(escape.clone()).unwrap();
    assert_eq!(outcome.as_string().as_deref(), Some("handled"));
    assert_eq!(cue.open_modals(), vec!["m1".to_string()]);

    let body = document.body().unwrap();
    assert_eq!(body.style().get_property_value("overflow").unwrap(), "hidden");
    cue.handle_event(escape).unwrap();
    assert!(cue.open_modals().is_empty());
    assert_eq!(body.style().get_property_value("overflow").unwrap(), "");
}

#[wasm_bindgen_test]
fn dom_document_ids_are_stable() {
    let document = mount();
    let window = web_sys::window().unwrap();
    let mut doc = DomDocument::new(window, document);
    let sel = Selector::parse(".modal").unwrap();
    let first = doc.query_all(&sel);
    let second = doc.query_all(&sel);
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(doc.by_id("m1"), Some(first[0]));
    assert_eq!(doc.dom_id(first[1]).as_deref(), Some("m2"));

    doc.add_class(first[0], "active");
    assert!(doc.has_class(first[0], "active"));
    doc.remove(first[0]);
    assert!(!doc.is_attached(first[0]));
    // writes to detached elements are harmless
    doc.add_class(first[0], "late");
}
