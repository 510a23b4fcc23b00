//! Drives a counter page end-to-end against the headless harness: queued
//! messages through the session driver, then a click dispatched from live
//! state. Run with `RUST_LOG=debug` to watch the pipeline.

use flyweb_client::{driver, EventData, HeadlessPage, MouseData, PropValue};
use serde_json::{json, Value as JsonValue};
use tracing_subscriber::EnvFilter;

fn render(count: u32) -> JsonValue {
    json!({
        "tag": "div",
        "props": { "id": "app" },
        "children": [
            {
                "tag": "span",
                "props": { "id": "count-label" },
                "children": [format!("count: {count}")]
            },
            {
                "tag": "button",
                "props": {
                    "id": "increment",
                    "onclick": ["_flyweb_event_handler", "mouse_event", "counter/increment"]
                },
                "children": ["INCREMENT"]
            }
        ]
    })
}

fn main() {
    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    let page = HeadlessPage::new();
    let session = page.session().expect("session");

    // Queue connection + first render, then let the driver drain in order.
    let (handle, rx) = driver::channel();
    handle.connection_opened();
    handle.update(render(0));
    drop(handle);
    let mut session = rt.block_on(driver::drive(session, rx));

    tracing::info!(connected = page.connected(), "initial render applied");

    // Click the increment button the way the embedder would: binding from
    // the current tree, event snapshot from live state.
    let binding = session
        .current_tree()
        .and_then(|tree| tree.find_element("increment"))
        .and_then(|element| element.props.get("onclick"))
        .and_then(PropValue::as_handler)
        .cloned()
        .expect("increment binding");
    let event = page
        .captured(
            "increment",
            "click",
            EventData::Mouse(MouseData {
                detail: 1,
                button: 0,
                buttons: 0,
            }),
        )
        .expect("captured click");
    session.dispatch(&binding, &event);

    // The server would answer the event with a fresh snapshot.
    session.handle_update(&render(1));

    for message in page.messages() {
        tracing::info!(message = %json!(message), "outbound event");
    }
    let label = session
        .current_tree()
        .and_then(|tree| tree.find_element("count-label"))
        .and_then(|element| element.children.first())
        .cloned();
    tracing::info!(?label, "final label");
}
