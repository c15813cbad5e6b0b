//! Drives per-window recorders through a scripted session.
//!
//! The harness plays the user and the browser: it owns the page, fires the
//! DOM events a real interaction would produce (focus changes included) and
//! routes them to the recorder of the window they happen in. Virtual time
//! advances by the configured step gap before each interaction.

use std::sync::Arc;

use action_locator::{LocatorPair, LocatorSynthesizer};
use action_recorder::{
    AssertionType, BusTransport, Clock, CommandReply, DomEvent, ManualClock, Recorder, RecorderCommand,
    RecorderState, RecorderStatus, Recording, RecordingSession, SystemClock,
};
use perceiver_context::{
    trace_shadow_context, FrameDescriptor, FrameRegistry, FrameTracer, ShadowHostDescriptor,
};
use serde::Serialize;
use soulrecorder_dom::{DomError, NodeId, Page, WindowId};
use soulrecorder_event_bus::InMemoryBus;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::ScriptError;
use crate::script::{SessionScript, Step, TargetRef};

/// Virtual time between two typed characters.
const KEYSTROKE_MS: u64 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStatus {
    pub window: usize,
    pub url: String,
    #[serde(flatten)]
    pub status: RecorderStatus,
}

/// Everything a finished script produced.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub recording: Recording,
    pub statuses: Vec<WindowStatus>,
    pub assertions: Vec<AssertionType>,
}

/// Diagnostics for one element, as `locate` prints them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementReport {
    pub locator: LocatorPair,
    pub frames: Vec<FrameDescriptor>,
    pub shadow: Vec<ShadowHostDescriptor>,
}

pub struct SessionHarness {
    config: Config,
    page: Page,
    clock: Arc<ManualClock>,
    frames: Arc<FrameTracer>,
    session: RecordingSession,
    transport: Arc<BusTransport>,
    recorders: Vec<Recorder>,
    focused: Option<NodeId>,
    statuses: Vec<WindowStatus>,
}

impl SessionHarness {
    /// Builds the page (top document plus frame fixtures) and one recorder
    /// per window. Nothing is recording until a `start` step runs.
    pub fn load(script: &SessionScript, config: Config) -> Result<Self, ScriptError> {
        let mut page = Page::parse(&script.page.html, &script.page.url)?;
        for fixture in &script.frames {
            let frame = resolve(&page, &fixture.frame)?;
            let window = page.load_frame(frame, &fixture.html, &fixture.url)?;
            debug!(%window, url = %fixture.url, "frame document loaded");
        }
        page.take_mutations();

        let clock = ManualClock::starting_at(SystemClock.now_ms());
        let frames = Arc::new(if config.cross_origin_handshake {
            FrameTracer::with_handshake(FrameRegistry::new())
        } else {
            FrameTracer::same_origin_only()
        });
        let bus = InMemoryBus::new(config.bus_capacity);
        let session = RecordingSession::start(bus, script.page.url.clone(), clock.now_ms());
        let transport = Arc::new(session.transport());
        let recorders: Vec<Recorder> = page
            .windows()
            .map(|window| {
                Recorder::new(
                    window,
                    config.recorder_config(),
                    frames.clone(),
                    transport.clone(),
                    clock.clone(),
                )
            })
            .collect();
        info!(windows = recorders.len(), url = %script.page.url, "session harness ready");

        Ok(Self {
            config,
            page,
            clock,
            frames,
            session,
            transport,
            recorders,
            focused: None,
            statuses: Vec::new(),
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn run(&mut self, steps: &[Step]) -> Result<(), ScriptError> {
        for (index, step) in steps.iter().enumerate() {
            debug!(index, step = step.name(), "running step");
            if step.is_interaction() {
                self.clock.advance(self.config.step_gap_ms);
            }
            let completed = self.session.completed_assertions().len();
            self.step(index, step)?;
            self.session.collect()?;
            if self.session.completed_assertions().len() > completed {
                // One frame captured the assertion; the others leave the mode.
                self.command_where(
                    |state| *state == RecorderState::AssertionPending,
                    RecorderCommand::ExitAssertionMode,
                )?;
            }
        }
        Ok(())
    }

    fn step(&mut self, index: usize, step: &Step) -> Result<(), ScriptError> {
        match step {
            Step::Start => {
                for recorder in &mut self.recorders {
                    recorder.handle_command(&self.page, RecorderCommand::StartRecording)?;
                }
            }
            Step::Stop => self.stop_all()?,
            Step::Assert { assertion_type } => {
                let assertion_type = assertion_type.unwrap_or(AssertionType::Element);
                self.command_where(RecorderState::is_active, RecorderCommand::EnterAssertionMode {
                    assertion_type,
                })?;
            }
            Step::CancelAssert => {
                self.command_where(
                    |state| *state == RecorderState::AssertionPending,
                    RecorderCommand::ExitAssertionMode,
                )?;
            }
            Step::Status => {
                for recorder in &mut self.recorders {
                    if let CommandReply::Status(status) =
                        recorder.handle_command(&self.page, RecorderCommand::GetStatus)?
                    {
                        self.statuses.push(WindowStatus {
                            window: recorder.window().index(),
                            url: self.page.window(recorder.window()).url().to_string(),
                            status,
                        });
                    }
                }
            }
            Step::Click { target } => {
                let element = resolve(&self.page, target)?;
                self.focus(element);
                self.fire(DomEvent::click(element));
            }
            Step::Type { target, text } => {
                let element = resolve(&self.page, target)?;
                self.focus(element);
                let mut typed = self.page.value(element).unwrap_or_default();
                for ch in text.chars() {
                    typed.push(ch);
                    self.page.set_value(element, &typed)?;
                    self.fire(DomEvent::input(element));
                    self.clock.advance(KEYSTROKE_MS);
                }
            }
            Step::Key { target, key } => {
                let element = match target {
                    Some(target) => resolve(&self.page, target)?,
                    None => self.focused.ok_or(ScriptError::NoTarget {
                        index,
                        step: step.name(),
                    })?,
                };
                self.fire(DomEvent::keydown(element, key.clone()));
            }
            Step::Blur => {
                if let Some(element) = self.focused.take() {
                    self.fire(DomEvent::focusout(element));
                }
            }
            Step::Check { target, checked } => {
                let element = resolve(&self.page, target)?;
                self.focus(element);
                let next = checked.unwrap_or_else(|| !self.page.checked(element));
                self.page.set_checked(element, next)?;
                self.fire(DomEvent::click(element));
                self.fire(DomEvent::change(element));
            }
            Step::Select { target, value } => {
                let element = resolve(&self.page, target)?;
                self.focus(element);
                self.page.set_value(element, value)?;
                self.fire(DomEvent::input(element));
                self.fire(DomEvent::change(element));
            }
            Step::Wait { ms } => {
                self.clock.advance(*ms);
            }
            Step::Insert { target, html } => {
                let parent = resolve(&self.page, target)?;
                self.page.insert_html(parent, html)?;
                let records = self.page.take_mutations();
                for recorder in &mut self.recorders {
                    recorder.on_mutations(&self.page, &records);
                }
                self.adopt_new_windows()?;
            }
        }
        Ok(())
    }

    fn command_where(
        &mut self,
        filter: impl Fn(&RecorderState) -> bool,
        command: RecorderCommand,
    ) -> Result<(), ScriptError> {
        for recorder in &mut self.recorders {
            if filter(&recorder.state()) {
                recorder.handle_command(&self.page, command.clone())?;
            }
        }
        Ok(())
    }

    /// Gives every window created since load (an inserted `srcdoc` iframe)
    /// its own recorder. While a session is live the parent re-announces its
    /// children and the newcomer starts recording straight away.
    fn adopt_new_windows(&mut self) -> Result<(), ScriptError> {
        let fresh: Vec<WindowId> = self
            .page
            .windows()
            .filter(|window| !self.recorders.iter().any(|r| r.window() == *window))
            .collect();
        if fresh.is_empty() {
            return Ok(());
        }
        let live = self.recorders.iter().any(|r| r.state().is_active());
        for window in fresh {
            let mut recorder = Recorder::new(
                window,
                self.config.recorder_config(),
                self.frames.clone(),
                self.transport.clone(),
                self.clock.clone(),
            );
            if live {
                if let Some(parent) = self.page.parent_window(window) {
                    self.frames.announce_children(&self.page, parent)?;
                }
                recorder.handle_command(&self.page, RecorderCommand::StartRecording)?;
            }
            debug!(%window, live, "recorder attached to new window");
            self.recorders.push(recorder);
        }
        Ok(())
    }

    fn stop_all(&mut self) -> Result<(), ScriptError> {
        self.command_where(RecorderState::is_active, RecorderCommand::StopRecording)
    }

    /// Moves focus to `element`, firing `focusout` on the previous owner.
    fn focus(&mut self, element: NodeId) {
        match self.focused.replace(element) {
            Some(previous) if previous != element => self.fire(DomEvent::focusout(previous)),
            _ => {}
        }
    }

    /// Delivers `event` to the recorder of the window it happens in.
    /// Listener failures are logged and do not abort the session.
    fn fire(&mut self, event: DomEvent) {
        let Some(window) = event.target.and_then(|target| self.page.window_of(target)) else {
            return;
        };
        let page = &self.page;
        for recorder in self.recorders.iter_mut().filter(|recorder| recorder.window() == window) {
            match recorder.dispatch(page, &event) {
                Ok(actions) => {
                    for action in actions {
                        debug!(kind = %action.kind, description = %action.description, "captured");
                    }
                }
                Err(err) => warn!(event = event.kind.name(), error = %err, "listener failed"),
            }
        }
    }

    /// Reports locator and context for `target` as a recorder would see it.
    pub fn describe(&self, target: &TargetRef) -> Result<ElementReport, ScriptError> {
        let element = resolve(&self.page, target)?;
        let window = window_of(&self.page, element)?;
        for frame_window in self.page.windows() {
            self.frames.announce_children(&self.page, frame_window)?;
        }
        let synthesizer = LocatorSynthesizer::new();
        Ok(ElementReport {
            locator: synthesizer.synthesize(&self.page, element)?,
            frames: self.frames.trace(&self.page, window)?,
            shadow: trace_shadow_context(&self.page, &synthesizer, element)?,
        })
    }

    /// Stops whatever is still recording and seals the recording.
    pub fn finish(mut self) -> Result<SessionOutcome, ScriptError> {
        self.stop_all()?;
        self.session.collect()?;
        let assertions = self.session.completed_assertions().to_vec();
        let recording = self.session.finish(self.clock.now_ms())?;
        Ok(SessionOutcome {
            recording,
            statuses: self.statuses,
            assertions,
        })
    }
}

fn window_of(page: &Page, element: NodeId) -> Result<WindowId, ScriptError> {
    page.window_of(element)
        .ok_or_else(|| DomError::InvalidNode(format!("{element} is not connected")).into())
}

fn unique(page: &Page, xpath: &str, context: NodeId) -> Result<NodeId, ScriptError> {
    let found = page.evaluate_xpath(xpath, context)?;
    match found.as_slice() {
        [node] => Ok(*node),
        _ => Err(ScriptError::Target {
            xpath: xpath.to_string(),
            count: found.len(),
        }),
    }
}

/// Walks the frame chain, then the shadow-host chain, then evaluates the
/// final XPath. Closed shadow roots are entered too: the harness acts for
/// the user, who can reach them.
pub fn resolve(page: &Page, target: &TargetRef) -> Result<NodeId, ScriptError> {
    let mut window = page.top_window();
    for frame in target.frames() {
        let element = unique(page, frame, page.document(window))?;
        window = page
            .content_window(element)
            .ok_or_else(|| ScriptError::NotAFrame(frame.clone()))?;
    }
    let mut scope = page.document(window);
    for host in target.shadow_hosts() {
        let element = unique(page, host, scope)?;
        scope = page
            .shadow_root_any(element)
            .ok_or_else(|| ScriptError::NoShadowRoot(host.clone()))?;
    }
    unique(page, target.xpath(), scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_recorder::{ActionKind, ValuePayload};
    use pretty_assertions::assert_eq;

    fn harness(yaml: &str) -> SessionHarness {
        let script = SessionScript::from_yaml(yaml).unwrap();
        let mut harness = SessionHarness::load(&script, Config::default()).unwrap();
        harness.run(&script.steps).unwrap();
        harness
    }

    #[test]
    fn inserted_iframe_click_is_recorded() {
        let outcome = harness(
            r#"
page:
  url: https://a.example/shop
  html: <html><body><div id="mount"></div></body></html>
steps:
  - do: start
  - do: insert
    target: //div[@id="mount"]
    html: <iframe name="late" srcdoc="<button id='buy'>Buy</button>"></iframe>
  - do: click
    target:
      frames: ['//iframe[@name="late"]']
      xpath: //button[@id="buy"]
  - do: status
  - do: stop
"#,
        )
        .finish()
        .unwrap();

        let actions = outcome.recording.actions();
        let kinds: Vec<ActionKind> = actions.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::PageMarker, ActionKind::Click]);
        assert_eq!(actions[1].frame_context.len(), 1);
        assert_eq!(actions[1].frame_context[0].name.as_deref(), Some("late"));
        assert_eq!(outcome.statuses.len(), 2);
        assert_eq!(outcome.statuses[1].status.state, RecorderState::Recording);
        assert_eq!(outcome.statuses[1].status.action_count, 1);
    }

    #[test]
    fn clicking_elsewhere_commits_typed_text() {
        let outcome = harness(
            r#"
page:
  url: https://a.example/login
  html: <html><body><input name="user"><button id="go">Go</button></body></html>
steps:
  - do: start
  - do: type
    target: //input
    text: ada
  - do: click
    target: //button
"#,
        )
        .finish()
        .unwrap();

        let kinds: Vec<ActionKind> = outcome.recording.actions().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::PageMarker, ActionKind::Input, ActionKind::Click]);
        assert_eq!(
            outcome.recording.actions()[1].payload,
            ValuePayload::Text { value: "ada".into() }
        );
        assert!(outcome.recording.is_sealed());
    }

    #[test]
    fn resolves_into_closed_shadow_roots() {
        let h = harness(
            r#"
page:
  url: https://a.example/
  html: <html><body><x-pin><template shadowrootmode="closed"><input id="pin"></template></x-pin></body></html>
"#,
        );
        let target = TargetRef::Scoped(crate::script::ScopedTarget {
            frames: Vec::new(),
            shadow: vec!["//x-pin".into()],
            xpath: ".//input".into(),
        });
        let input = resolve(h.page(), &target).unwrap();
        assert_eq!(h.page().attr(input, "id"), Some("pin"));
    }

    #[test]
    fn ambiguous_target_is_an_error() {
        let h = harness("page: {url: 'https://a.example/', html: '<p>a</p><p>b</p>'}\n");
        let err = resolve(h.page(), &TargetRef::XPath("//p".into())).unwrap_err();
        assert!(matches!(err, ScriptError::Target { count: 2, .. }));
    }

    #[test]
    fn status_steps_snapshot_every_window() {
        let outcome = harness(
            r#"
page:
  url: https://a.example/
  html: <html><body><iframe name="inner" srcdoc="<button>x</button>"></iframe></body></html>
steps:
  - do: start
  - do: status
  - do: stop
"#,
        )
        .finish()
        .unwrap();
        assert_eq!(outcome.statuses.len(), 2);
        assert!(outcome
            .statuses
            .iter()
            .all(|s| s.status.state == RecorderState::Recording));
    }
}
