//! Capture component for one window.
//!
//! Each frame owns a [`Recorder`]: its own state machine, listener set and
//! pending-input buffer. Nothing is shared across frames except the
//! outbound transport and the frame registry used for the identity
//! handshake.

use std::sync::Arc;

use perceiver_context::FrameTracer;
use soulrecorder_dom::{MutationRecord, NodeId, Page, WindowId};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::RecorderConfig;
use crate::errors::RecorderError;
use crate::events::{is_commit_key, is_recorded_key, DomEvent, DomEventKind};
use crate::model::{Action, ActionKind, AssertionType, ValuePayload};
use crate::normalizer::ActionNormalizer;
use crate::observer::ObservationManager;
use crate::pending::{PendingInput, PendingInputs};
use crate::protocol::{CommandReply, RecorderCommand, RecorderEvent, RecorderStatus};
use crate::state::{RecorderState, StateMachine};
use crate::transport::{deliver, Transport};
use crate::value::{assertion_text, recorded_value};

pub struct Recorder {
    window: WindowId,
    config: RecorderConfig,
    machine: StateMachine,
    observer: ObservationManager,
    pending: PendingInputs,
    normalizer: ActionNormalizer,
    frames: Arc<FrameTracer>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    assertion_type: Option<AssertionType>,
    recorded: usize,
}

fn input_type(page: &Page, element: NodeId) -> Option<String> {
    if page.tag(element) != Some("input") {
        return None;
    }
    Some(
        page.attr(element, "type")
            .unwrap_or("text")
            .trim()
            .to_ascii_lowercase(),
    )
}

fn is_toggle(page: &Page, element: NodeId) -> bool {
    matches!(input_type(page, element).as_deref(), Some("checkbox" | "radio"))
}

impl Recorder {
    pub fn new(
        window: WindowId,
        config: RecorderConfig,
        frames: Arc<FrameTracer>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let normalizer =
            ActionNormalizer::new(frames.clone(), config.dedup_window_ms, config.text_limit);
        Self {
            window,
            config,
            machine: StateMachine::new(),
            observer: ObservationManager::new(),
            pending: PendingInputs::new(),
            normalizer,
            frames,
            transport,
            clock,
            assertion_type: None,
            recorded: 0,
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn state(&self) -> RecorderState {
        self.machine.current()
    }

    pub fn status(&self) -> RecorderStatus {
        RecorderStatus {
            state: self.machine.current(),
            action_count: self.recorded,
            pending_inputs: self.pending.len(),
            observed_roots: self.observer.len(),
        }
    }

    pub fn handle_command(
        &mut self,
        page: &Page,
        command: RecorderCommand,
    ) -> Result<CommandReply, RecorderError> {
        match command {
            RecorderCommand::StartRecording => self.start(page)?,
            RecorderCommand::StopRecording => self.stop(page)?,
            RecorderCommand::EnterAssertionMode { assertion_type } => {
                self.enter_assertion_mode(assertion_type)?
            }
            RecorderCommand::ExitAssertionMode => self.exit_assertion_mode()?,
            RecorderCommand::GetStatus => return Ok(CommandReply::Status(self.status())),
        }
        Ok(CommandReply::Ack)
    }

    fn start(&mut self, page: &Page) -> Result<(), RecorderError> {
        if self.machine.current().is_active() {
            return Err(RecorderError::AlreadyRecording);
        }
        // Announce before any state changes so a failure leaves the recorder idle.
        let announced = self.frames.announce_children(page, self.window)?;
        self.machine.transition(RecorderState::Recording)?;
        self.normalizer.reset();
        self.recorded = 0;
        let roots = self.observer.attach(page, page.document(self.window));
        info!(
            target: "action_recorder",
            window = %self.window,
            roots,
            announced,
            "recording started"
        );
        if self.config.emit_page_marker && page.is_top(self.window) {
            let marker = self
                .normalizer
                .page_marker(page, self.window, self.clock.now_ms());
            self.emit(marker);
        }
        Ok(())
    }

    fn stop(&mut self, page: &Page) -> Result<(), RecorderError> {
        if !self.machine.current().is_active() {
            return Err(RecorderError::NotRecording);
        }
        // Commit in-progress text entry while delivery may still retry.
        for entry in self.pending.drain() {
            if let Err(err) = self.finalize(page, entry) {
                warn!(target: "action_recorder", error = %err, "pending input lost at stop");
            }
        }
        self.assertion_type = None;
        self.machine.transition(RecorderState::Idle)?;
        self.observer.detach();
        deliver(
            self.transport.as_ref(),
            &RecorderEvent::RecordingStopped {
                action_count: self.recorded,
            },
            false,
        );
        info!(target: "action_recorder", window = %self.window, actions = self.recorded, "recording stopped");
        Ok(())
    }

    fn enter_assertion_mode(&mut self, assertion_type: AssertionType) -> Result<(), RecorderError> {
        if !self.machine.current().is_active() {
            return Err(RecorderError::NotRecording);
        }
        self.machine.transition(RecorderState::AssertionPending)?;
        self.assertion_type = Some(assertion_type);
        Ok(())
    }

    fn exit_assertion_mode(&mut self) -> Result<(), RecorderError> {
        if !self.machine.current().is_active() {
            return Err(RecorderError::NotRecording);
        }
        self.machine.transition(RecorderState::Recording)?;
        self.assertion_type = None;
        Ok(())
    }

    /// Structural observer callback.
    pub fn on_mutations(&mut self, page: &Page, records: &[MutationRecord]) -> usize {
        if !self.machine.current().is_active() {
            return 0;
        }
        self.observer.on_mutations(page, records)
    }

    /// Capture-phase listener. Returns the actions emitted for this event.
    pub fn dispatch(&mut self, page: &Page, event: &DomEvent) -> Result<Vec<Action>, RecorderError> {
        if !self.machine.current().is_active() {
            return Ok(Vec::new());
        }
        let Some(original) = event.target else {
            debug!(target: "action_recorder", event = event.kind.name(), "event without target ignored");
            return Ok(Vec::new());
        };
        let Some(target) = self.observer.listener_target(page, &event.kind, original) else {
            return Ok(Vec::new());
        };
        if page.window_of(target) != Some(self.window) {
            return Ok(Vec::new());
        }
        let now = self.clock.now_ms();

        let mut emitted = Vec::new();
        match &event.kind {
            DomEventKind::Click => {
                if self.machine.current() == RecorderState::AssertionPending {
                    emitted.extend(self.capture_assertion(page, target, now)?);
                } else if !is_toggle(page, target) {
                    emitted.extend(self.record(page, ActionKind::Click, target, ValuePayload::None, now)?);
                }
            }
            DomEventKind::Input => {
                if !is_toggle(page, target) && page.tag(target) != Some("select") {
                    self.pending.update(target, recorded_value(page, target), now);
                }
            }
            DomEventKind::Change => {
                if is_toggle(page, target) {
                    let payload = ValuePayload::Checked {
                        checked: page.checked(target),
                    };
                    emitted.extend(self.record(page, ActionKind::Check, target, payload, now)?);
                } else if page.tag(target) == Some("select") {
                    if let Some((value, label)) = page.selected_option(target) {
                        let payload = ValuePayload::Selected { value, label };
                        emitted.extend(self.record(page, ActionKind::Select, target, payload, now)?);
                    }
                } else if let Some(entry) = self.pending.take(target) {
                    emitted.extend(self.finalize(page, entry)?);
                }
            }
            DomEventKind::Keydown { key } => {
                if is_recorded_key(key) {
                    if is_commit_key(key) {
                        if let Some(entry) = self.pending.take(target) {
                            emitted.extend(self.finalize(page, entry)?);
                        }
                    }
                    let payload = ValuePayload::Key { key: key.clone() };
                    emitted.extend(self.record(page, ActionKind::Keypress, target, payload, now)?);
                }
            }
            DomEventKind::Focusout => {
                if let Some(entry) = self.pending.take(target) {
                    emitted.extend(self.finalize(page, entry)?);
                }
            }
        }
        Ok(emitted)
    }

    fn record(
        &mut self,
        page: &Page,
        kind: ActionKind,
        element: NodeId,
        payload: ValuePayload,
        at_ms: u64,
    ) -> Result<Option<Action>, RecorderError> {
        let action = self
            .normalizer
            .normalize(page, self.window, kind, element, payload, at_ms)?;
        Ok(action.map(|action| self.emit(action)))
    }

    fn finalize(&mut self, page: &Page, entry: PendingInput) -> Result<Option<Action>, RecorderError> {
        if !page.is_connected(entry.element) {
            debug!(target: "action_recorder", element = %entry.element, "pending input target detached");
            return Ok(None);
        }
        let payload = ValuePayload::Text {
            value: entry.value.unwrap_or_default(),
        };
        let now = self.clock.now_ms();
        self.record(page, ActionKind::Input, entry.element, payload, now)
    }

    fn capture_assertion(
        &mut self,
        page: &Page,
        target: NodeId,
        at_ms: u64,
    ) -> Result<Option<Action>, RecorderError> {
        let assertion_type = self.assertion_type.unwrap_or(AssertionType::Element);
        let expected_value = match assertion_type {
            AssertionType::Text => Some(assertion_text(page, target)),
            AssertionType::Element => None,
        };
        let payload = ValuePayload::Assertion {
            assertion_type,
            expected_value,
        };
        let action = self.record(page, ActionKind::Assertion, target, payload, at_ms)?;
        self.machine.transition(RecorderState::Recording)?;
        self.assertion_type = None;
        deliver(
            self.transport.as_ref(),
            &RecorderEvent::AssertionComplete { assertion_type },
            true,
        );
        Ok(action)
    }

    fn emit(&mut self, action: Action) -> Action {
        self.recorded += 1;
        debug!(
            target: "action_recorder",
            kind = %action.kind,
            locator = action.locator.preferred(),
            "action recorded"
        );
        let still_recording = self.machine.current().is_active();
        deliver(
            self.transport.as_ref(),
            &RecorderEvent::ActionRecorded {
                action: Box::new(action.clone()),
            },
            still_recording,
        );
        action
    }
}
