use std::sync::Arc;

use action_recorder::{
    Action, ActionKind, AssertionType, CommandReply, DomEvent, ManualClock, Recorder,
    RecorderCommand, RecorderConfig, RecorderError, RecorderState, RecordingSession, ValuePayload,
    WireAction, PASSWORD_MASK,
};
use perceiver_context::{FrameRegistry, FrameTracer};
use pretty_assertions::assert_eq;
use soulrecorder_dom::{NodeId, Page, WindowId};
use soulrecorder_event_bus::InMemoryBus;

struct Harness {
    page: Page,
    clock: Arc<ManualClock>,
    session: RecordingSession,
    recorders: Vec<Recorder>,
}

impl Harness {
    fn new(html: &str) -> Self {
        Self::with_page(Page::parse(html, "https://shop.example/cart").unwrap())
    }

    fn with_page(page: Page) -> Self {
        let clock = ManualClock::starting_at(1_700_000_000_000);
        let bus = InMemoryBus::new(256);
        let session = RecordingSession::start(bus, page.window(page.top_window()).url(), 0);
        let transport = Arc::new(session.transport());
        let frames = Arc::new(FrameTracer::with_handshake(FrameRegistry::new()));
        let recorders = page
            .windows()
            .map(|window| {
                Recorder::new(
                    window,
                    RecorderConfig::default(),
                    frames.clone(),
                    transport.clone(),
                    clock.clone(),
                )
            })
            .collect();
        Self {
            page,
            clock,
            session,
            recorders,
        }
    }

    fn command_all(&mut self, command: RecorderCommand) {
        for recorder in &mut self.recorders {
            recorder.handle_command(&self.page, command.clone()).unwrap();
        }
    }

    fn recorder_for(&mut self, window: WindowId) -> &mut Recorder {
        self.recorders
            .iter_mut()
            .find(|recorder| recorder.window() == window)
            .unwrap()
    }

    fn command(&mut self, window: WindowId, command: RecorderCommand) -> CommandReply {
        let page = &self.page;
        let recorder = self
            .recorders
            .iter_mut()
            .find(|recorder| recorder.window() == window)
            .unwrap();
        recorder.handle_command(page, command).unwrap()
    }

    fn fire(&mut self, event: DomEvent) -> Vec<Action> {
        self.fire_after(500, event)
    }

    fn fire_after(&mut self, gap_ms: u64, event: DomEvent) -> Vec<Action> {
        self.clock.advance(gap_ms);
        let window = self.page.window_of(event.target.unwrap()).unwrap();
        let page = &self.page;
        let recorder = self
            .recorders
            .iter_mut()
            .find(|recorder| recorder.window() == window)
            .unwrap();
        recorder.dispatch(page, &event).unwrap()
    }

    fn find(&self, window: WindowId, xpath: &str) -> NodeId {
        let doc = self.page.document(window);
        let found = self.page.evaluate_xpath(xpath, doc).unwrap();
        assert_eq!(found.len(), 1, "{xpath}");
        found[0]
    }

    fn type_text(&mut self, input: NodeId, text: &str) {
        let mut typed = String::new();
        for ch in text.chars() {
            typed.push(ch);
            self.page.set_value(input, &typed).unwrap();
            self.fire(DomEvent::input(input));
        }
    }

    fn actions(&mut self) -> Vec<Action> {
        self.session.collect().unwrap();
        self.session
            .recording()
            .actions()
            .iter()
            .filter(|action| action.kind != ActionKind::PageMarker)
            .cloned()
            .collect()
    }
}

fn shadow_descend(page: &Page, hosts: &[&str]) -> NodeId {
    let mut scope = page.document(page.top_window());
    for host in hosts {
        let found = page.evaluate_xpath(&format!(".//{host}"), scope).unwrap()[0];
        scope = page.open_shadow_root(found).unwrap();
    }
    scope
}

#[test]
fn plain_click_scenario() {
    let mut h = Harness::new(r#"<html><body><button id="submit">Go</button></body></html>"#);
    h.command_all(RecorderCommand::StartRecording);
    let button = h.find(h.page.top_window(), "//button");
    h.fire(DomEvent::click(button));

    let actions = h.actions();
    assert_eq!(actions.len(), 1);
    let wire = WireAction::from(&actions[0]);
    assert_eq!(wire.kind, ActionKind::Click);
    assert_eq!(wire.xpath.as_deref(), Some(r#"//button[@id="submit"]"#));
    assert_eq!(wire.element.tag, "button");
    assert_eq!(wire.iframe, None);
    assert_eq!(wire.shadow, None);

    let json = serde_json::to_value(&wire).unwrap();
    assert_eq!(json["type"], "click");
    assert_eq!(json["fullXPath"], "/html[1]/body[1]/button[1]");
    assert!(json["iframe"].is_null());
    assert!(json["shadow"].is_null());
    assert!(json["frameIndex"].is_null());
    assert_eq!(json["description"], "Clicked the \"Go\" button");
}

#[test]
fn page_marker_opens_the_recording() {
    let mut h = Harness::new(r#"<html><body><p>x</p></body></html>"#);
    h.command_all(RecorderCommand::StartRecording);
    h.session.collect().unwrap();
    let first = &h.session.recording().actions()[0];
    assert_eq!(first.kind, ActionKind::PageMarker);
    assert_eq!(
        first.payload,
        ValuePayload::Page {
            url: "https://shop.example/cart".into()
        }
    );
}

#[test]
fn iframe_input_scenario() {
    let mut h = Harness::new(
        r#"<html><body><iframe name="f1" srcdoc="<input name=&quot;q&quot;>"></iframe></body></html>"#,
    );
    h.command_all(RecorderCommand::StartRecording);
    let child = h.page.windows().nth(1).unwrap();
    let input = h.find(child, "//input");

    h.type_text(input, "abc");
    assert!(h.actions().is_empty(), "keystrokes stay pending until commit");
    h.fire(DomEvent::focusout(input));

    let actions = h.actions();
    assert_eq!(actions.len(), 1);
    let action = &actions[0];
    assert_eq!(action.kind, ActionKind::Input);
    assert_eq!(action.payload, ValuePayload::Text { value: "abc".into() });
    assert_eq!(action.frame_context.len(), 1);
    assert_eq!(action.frame_context[0].name.as_deref(), Some("f1"));
    assert!(action.element.in_iframe);

    let wire = WireAction::from(action);
    assert_eq!(wire.value.as_deref(), Some("abc"));
    assert_eq!(wire.frame_index, Some(0));
}

#[test]
fn nested_shadow_click_scenario() {
    let mut h = Harness::new(
        r#"<html><body><x-outer><template shadowrootmode="open"><x-inner><template shadowrootmode="open"><button>Buy</button></template></x-inner></template></x-outer></body></html>"#,
    );
    h.command_all(RecorderCommand::StartRecording);
    let inner_root = shadow_descend(&h.page, &["x-outer", "x-inner"]);
    let button = h.page.evaluate_xpath(".//button", inner_root).unwrap()[0];
    h.fire(DomEvent::click(button));

    let actions = h.actions();
    assert_eq!(actions.len(), 1);
    let shadow = &actions[0].shadow_context;
    assert_eq!(shadow.len(), 2);
    assert_eq!(shadow[0].host_tag, "x-outer");
    assert_eq!(shadow[1].host_tag, "x-inner");
    assert_eq!(actions[0].element.tag, "button");
    assert!(actions[0].element.in_shadow_dom);
}

#[test]
fn text_assertion_scenario() {
    let mut h = Harness::new(
        r#"<html><body><div id="summary"><span>Total: $42</span></div></body></html>"#,
    );
    h.command_all(RecorderCommand::StartRecording);
    let top = h.page.top_window();
    h.command(
        top,
        RecorderCommand::EnterAssertionMode {
            assertion_type: AssertionType::Text,
        },
    );
    assert_eq!(h.recorder_for(top).state(), RecorderState::AssertionPending);

    let summary = h.find(top, "//div");
    h.fire(DomEvent::click(summary));

    let actions = h.actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Assertion);
    match &actions[0].payload {
        ValuePayload::Assertion {
            assertion_type,
            expected_value,
        } => {
            assert_eq!(*assertion_type, AssertionType::Text);
            assert!(expected_value.as_deref().unwrap().contains("Total: $42"));
        }
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(h.recorder_for(top).state(), RecorderState::Recording);
    assert_eq!(h.session.completed_assertions(), &[AssertionType::Text]);

    // Back to normal semantics: the next click is a click.
    h.fire(DomEvent::click(summary));
    assert_eq!(h.actions().last().unwrap().kind, ActionKind::Click);
}

#[test]
fn cancelled_assertion_mode_records_a_click() {
    let mut h = Harness::new(r#"<html><body><a href="/help">Help</a></body></html>"#);
    h.command_all(RecorderCommand::StartRecording);
    h.command_all(RecorderCommand::EnterAssertionMode {
        assertion_type: AssertionType::Element,
    });
    h.command_all(RecorderCommand::ExitAssertionMode);
    let link = h.find(h.page.top_window(), "//a");
    h.fire(DomEvent::click(link));
    assert_eq!(h.actions()[0].kind, ActionKind::Click);
}

#[test]
fn password_is_never_emitted_raw() {
    let mut h = Harness::new(
        r#"<html><body><input type="password" name="pw"><button id="login">Log in</button></body></html>"#,
    );
    h.command_all(RecorderCommand::StartRecording);
    let top = h.page.top_window();
    let pw = h.find(top, "//input");
    h.type_text(pw, "hunter2");
    h.fire(DomEvent::keydown(pw, "Enter"));

    let actions = h.actions();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].kind, ActionKind::Input);
    assert_eq!(actions[1].kind, ActionKind::Keypress);
    for action in &actions {
        let json = serde_json::to_string(&WireAction::from(action)).unwrap();
        assert!(!json.contains("hunter2"), "raw password leaked: {json}");
        let internal = serde_json::to_string(action).unwrap();
        assert!(!internal.contains("hunter2"));
    }
    assert_eq!(
        actions[0].payload,
        ValuePayload::Text {
            value: PASSWORD_MASK.into()
        }
    );
}

#[test]
fn dedup_law() {
    let mut h = Harness::new(r#"<html><body><button id="buy">Buy</button></body></html>"#);
    h.command_all(RecorderCommand::StartRecording);
    let button = h.find(h.page.top_window(), "//button");

    assert_eq!(h.fire(DomEvent::click(button)).len(), 1);
    assert!(
        h.fire_after(120, DomEvent::click(button)).is_empty(),
        "second click within 300ms collapses"
    );
    assert_eq!(
        h.fire_after(300, DomEvent::click(button)).len(),
        1,
        "300ms after the last emitted click is a new action"
    );
    assert_eq!(h.actions().len(), 2);
}

#[test]
fn stop_flushes_pending_input() {
    let mut h = Harness::new(r#"<html><body><textarea name="note"></textarea></body></html>"#);
    h.command_all(RecorderCommand::StartRecording);
    let area = h.find(h.page.top_window(), "//textarea");
    h.type_text(area, "draft");
    assert_eq!(h.recorders[0].status().pending_inputs, 1);

    h.command_all(RecorderCommand::StopRecording);
    let actions = h.actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].payload, ValuePayload::Text { value: "draft".into() });
    assert_eq!(h.recorders[0].state(), RecorderState::Idle);
}

#[test]
fn checkbox_and_select_changes() {
    let mut h = Harness::new(
        r#"<html><body><input type="checkbox" name="terms"><select name="size"><option value="s">Small</option><option value="l">Large</option></select></body></html>"#,
    );
    h.command_all(RecorderCommand::StartRecording);
    let top = h.page.top_window();
    let checkbox = h.find(top, "//input");
    let select = h.find(top, "//select");

    h.page.set_checked(checkbox, true).unwrap();
    assert!(h.fire(DomEvent::click(checkbox)).is_empty());
    h.fire(DomEvent::change(checkbox));
    h.page.set_value(select, "l").unwrap();
    h.fire(DomEvent::change(select));

    let actions = h.actions();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].payload, ValuePayload::Checked { checked: true });
    assert_eq!(
        actions[1].payload,
        ValuePayload::Selected {
            value: "l".into(),
            label: "Large".into()
        }
    );
}

#[test]
fn shadow_roots_added_after_start_are_observed() {
    let mut h = Harness::new(r#"<html><body><div id="mount"></div></body></html>"#);
    h.command_all(RecorderCommand::StartRecording);
    let top = h.page.top_window();
    let mount = h.find(top, "//div");
    h.page
        .insert_html(
            mount,
            r#"<x-widget><template shadowrootmode="open"><x-field><template shadowrootmode="open"><select><option>a</option><option>b</option></select></template></x-field></template></x-widget>"#,
        )
        .unwrap();
    let records = h.page.take_mutations();
    let page = &h.page;
    let attached = h.recorders[0].on_mutations(page, &records);
    assert_eq!(attached, 2);
    assert_eq!(h.recorders[0].status().observed_roots, 3);

    // `change` does not cross shadow boundaries, so it is only seen
    // because the nested root now carries listeners.
    let root = shadow_descend(&h.page, &["x-widget", "x-field"]);
    let select = h.page.evaluate_xpath(".//select", root).unwrap()[0];
    h.page.set_value(select, "b").unwrap();
    h.fire(DomEvent::change(select));

    let actions = h.actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Select);
    assert_eq!(actions[0].shadow_context.len(), 2);
}

#[test]
fn closed_shadow_click_is_recorded_on_the_host() {
    let mut h = Harness::new(
        r#"<html><body><x-pay id="pay"><template shadowrootmode="closed"><button>Pay</button></template></x-pay></body></html>"#,
    );
    h.command_all(RecorderCommand::StartRecording);
    let host = h.find(h.page.top_window(), "//x-pay");
    let root = h.page.shadow_root_any(host).unwrap();
    let button = h.page.element_children(root)[0];
    h.fire(DomEvent::click(button));

    let actions = h.actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].element.tag, "x-pay");
    assert_eq!(actions[0].locator.primary.as_deref(), Some(r#"//x-pay[@id="pay"]"#));
    assert!(actions[0].shadow_context.is_empty());
}

#[test]
fn every_primary_locator_resolves_to_its_target() {
    let mut h = Harness::new(
        r#"<html><body><form><input name="q" placeholder="Search"><button>Search</button><button>Search</button></form><a data-testid="cart">Cart</a></body></html>"#,
    );
    h.command_all(RecorderCommand::StartRecording);
    let top = h.page.top_window();
    let doc = h.page.document(top);
    let targets = h.page.descendants(doc);
    for target in &targets {
        h.fire(DomEvent::click(*target));
    }
    for action in h.actions() {
        if let Some(primary) = &action.locator.primary {
            let found = h.page.evaluate_xpath(primary, doc).unwrap();
            assert_eq!(found.len(), 1, "{primary}");
            let full = h.page.evaluate_xpath(&action.locator.full_path, doc).unwrap();
            assert_eq!(found, full);
        }
    }
}

#[test]
fn events_before_start_and_after_stop_are_ignored() {
    let mut h = Harness::new(r#"<html><body><button id="b">B</button></body></html>"#);
    let button = h.find(h.page.top_window(), "//button");
    assert!(h.fire(DomEvent::click(button)).is_empty());
    h.command_all(RecorderCommand::StartRecording);
    h.command_all(RecorderCommand::StopRecording);
    assert!(h.fire(DomEvent::click(button)).is_empty());
    assert!(h.actions().is_empty());
}

#[test]
fn missing_target_is_a_no_op() {
    let mut h = Harness::new(r#"<html><body></body></html>"#);
    h.command_all(RecorderCommand::StartRecording);
    let page = &h.page;
    let event = DomEvent {
        kind: action_recorder::DomEventKind::Click,
        target: None,
    };
    assert!(h.recorders[0].dispatch(page, &event).unwrap().is_empty());
}

#[test]
fn command_errors() {
    let mut h = Harness::new(r#"<html><body></body></html>"#);
    let page = &h.page;
    let recorder = &mut h.recorders[0];
    assert!(matches!(
        recorder.handle_command(page, RecorderCommand::StopRecording),
        Err(RecorderError::NotRecording)
    ));
    assert!(matches!(
        recorder.handle_command(
            page,
            RecorderCommand::EnterAssertionMode {
                assertion_type: AssertionType::Text
            }
        ),
        Err(RecorderError::NotRecording)
    ));
    recorder.handle_command(page, RecorderCommand::StartRecording).unwrap();
    assert!(matches!(
        recorder.handle_command(page, RecorderCommand::StartRecording),
        Err(RecorderError::AlreadyRecording)
    ));
    match recorder.handle_command(page, RecorderCommand::GetStatus).unwrap() {
        CommandReply::Status(status) => assert_eq!(status.state, RecorderState::Recording),
        other => panic!("unexpected reply {other:?}"),
    }
}

#[test]
fn sealed_recording_after_finish() {
    let mut h = Harness::new(r#"<html><body><button id="b">B</button></body></html>"#);
    h.command_all(RecorderCommand::StartRecording);
    let button = h.find(h.page.top_window(), "//button");
    h.fire(DomEvent::click(button));
    h.command_all(RecorderCommand::StopRecording);
    let Harness { session, .. } = h;
    let recording = session.finish(99).unwrap();
    assert!(recording.is_sealed());
    assert_eq!(recording.len(), 2);
}

#[test]
fn start_announces_children_and_rejected_start_changes_nothing() {
    let mut h = Harness::new(
        r#"<html><body><iframe name="pay" srcdoc="<input name='card'>"></iframe></body></html>"#,
    );
    let top = h.page.top_window();
    let child = h.page.windows().nth(1).unwrap();
    let idle = h.recorder_for(top).status();
    assert_eq!(idle.state, RecorderState::Idle);
    assert_eq!(idle.observed_roots, 0);

    h.command(top, RecorderCommand::StartRecording);
    let started = h.recorder_for(top).status();
    assert_eq!(started.state, RecorderState::Recording);
    assert!(started.observed_roots >= 1);

    let page = &h.page;
    let recorder = h
        .recorders
        .iter_mut()
        .find(|recorder| recorder.window() == top)
        .unwrap();
    assert!(matches!(
        recorder.handle_command(page, RecorderCommand::StartRecording),
        Err(RecorderError::AlreadyRecording)
    ));
    assert_eq!(recorder.status(), started);
    assert_eq!(h.recorder_for(child).state(), RecorderState::Idle);
}
