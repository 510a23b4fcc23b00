use std::collections::BTreeMap;

use flyweb_client::events::dispatch_keyed;
use flyweb_client::{
    CapturedEvent, EventBinding, EventData, HandlerClass, HeadlessPage, KeyboardData, MouseData,
};
use keyboard_types::{Code, Key};
use serde_json::json;

fn click_on(target_id: &str, target_value: Option<&str>, data: EventData) -> CapturedEvent {
    CapturedEvent {
        event_type: "click".to_string(),
        target_id: target_id.to_string(),
        target_value: target_value.map(str::to_string),
        data,
    }
}

#[test]
fn mouse_message_has_exactly_the_documented_fields() {
    let binding = EventBinding::new(HandlerClass::MouseEvent, Some("row-3".to_string()));
    let event = click_on(
        "btn",
        Some("v"),
        EventData::Mouse(MouseData {
            detail: 2,
            button: 1,
            buttons: 4,
        }),
    );

    let value = serde_json::to_value(binding.message(&event)).expect("serialize");
    assert_eq!(
        value,
        json!({
            "type": "click",
            "target_id": "btn",
            "target_value": "v",
            "handler_key": "row-3",
            "detail": 2,
            "button": 1,
            "buttons": 4
        })
    );
}

#[test]
fn handler_key_is_absent_unless_bound() {
    let binding = EventBinding::new(HandlerClass::MouseEvent, None);
    let event = click_on("btn", None, EventData::Mouse(MouseData::default()));

    let value = serde_json::to_value(binding.message(&event)).expect("serialize");
    let object = value.as_object().expect("object");
    assert!(!object.contains_key("handler_key"));
    // target_value is always on the wire, null when the element has none.
    assert_eq!(object.get("target_value"), Some(&json!(null)));
}

#[test]
fn basic_classes_carry_identity_fields_only() {
    for class in [
        HandlerClass::NoArgs,
        HandlerClass::Event,
        HandlerClass::FocusEvent,
    ] {
        let binding = EventBinding::new(class, None);
        let event = CapturedEvent {
            event_type: "blur".to_string(),
            target_id: "field".to_string(),
            target_value: Some("typed".to_string()),
            data: EventData::Basic,
        };
        let value = serde_json::to_value(binding.message(&event)).expect("serialize");
        assert_eq!(
            value,
            json!({
                "type": "blur",
                "target_id": "field",
                "target_value": "typed"
            }),
            "unexpected shape for {class:?}"
        );
    }
}

#[test]
fn keyboard_message_carries_key_identity() {
    let binding = EventBinding::new(HandlerClass::KeyboardEvent, None);
    let event = CapturedEvent {
        event_type: "keydown".to_string(),
        target_id: "field".to_string(),
        target_value: Some("so far".to_string()),
        data: EventData::Keyboard(KeyboardData {
            detail: 0,
            key: Key::Enter,
            code: Code::Enter,
            key_code: 13,
        }),
    };

    let value = serde_json::to_value(binding.message(&event)).expect("serialize");
    assert_eq!(
        value,
        json!({
            "type": "keydown",
            "target_id": "field",
            "target_value": "so far",
            "detail": 0,
            "code": "Enter",
            "key": "Enter",
            "keyCode": 13
        })
    );
}

#[test]
fn each_dispatch_emits_exactly_one_ordered_message() {
    let page = HeadlessPage::new();
    let binding = EventBinding::new(HandlerClass::MouseEvent, None);

    for n in 0..3 {
        let event = click_on(
            "btn",
            None,
            EventData::Mouse(MouseData {
                detail: n,
                button: 0,
                buttons: 0,
            }),
        );
        binding.dispatch(&event, &page).expect("dispatch");
    }

    let messages = page.messages();
    assert_eq!(messages.len(), 3);
    let details: Vec<_> = messages
        .iter()
        .map(|message| message.params.get("detail").cloned())
        .collect();
    assert_eq!(details, vec![Some(json!(0)), Some(json!(1)), Some(json!(2))]);
}

#[test]
fn keyed_dispatch_fires_only_the_matching_key() {
    let page = HeadlessPage::new();
    let mut handlers = BTreeMap::new();
    handlers.insert(
        "Enter".to_string(),
        EventBinding::new(HandlerClass::KeyboardEvent, Some("add/onkeydown".to_string())),
    );

    let keydown = |key: Key, code: Code| CapturedEvent {
        event_type: "keydown".to_string(),
        target_id: "add".to_string(),
        target_value: Some("new item".to_string()),
        data: EventData::Keyboard(KeyboardData {
            detail: 0,
            key,
            code,
            key_code: 0,
        }),
    };

    let fired = dispatch_keyed(&handlers, &keydown(Key::Escape, Code::Escape), &page)
        .expect("dispatch");
    assert!(!fired);
    assert!(page.messages().is_empty());

    let fired =
        dispatch_keyed(&handlers, &keydown(Key::Enter, Code::Enter), &page).expect("dispatch");
    assert!(fired);

    let messages = page.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].handler_key.as_deref(), Some("add/onkeydown"));
    assert_eq!(messages[0].target_value.as_deref(), Some("new item"));
}

#[test]
fn non_keyboard_capture_never_matches_a_key_map() {
    let page = HeadlessPage::new();
    let mut handlers = BTreeMap::new();
    handlers.insert(
        "Enter".to_string(),
        EventBinding::new(HandlerClass::KeyboardEvent, None),
    );

    let fired = dispatch_keyed(
        &handlers,
        &click_on("add", None, EventData::Mouse(MouseData::default())),
        &page,
    )
    .expect("dispatch");
    assert!(!fired);
    assert!(page.messages().is_empty());
}
