//! Capture pipeline for one recording session.
//!
//! DOM event -> [`Recorder`] (per window) -> [`ActionNormalizer`] asks the
//! locator synthesizer, the context tracers and the value extractor ->
//! [`Action`] -> transport -> [`RecordingSession`].

pub mod clock;
pub mod config;
pub mod describe;
pub mod errors;
pub mod events;
pub mod model;
pub mod normalizer;
pub mod observer;
pub mod pending;
pub mod protocol;
pub mod recorder;
pub mod session;
pub mod state;
pub mod transport;
pub mod value;
pub mod wire;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RecorderConfig;
pub use errors::{RecorderError, TransportError};
pub use events::{DomEvent, DomEventKind, RECORDED_KEYS};
pub use model::{Action, ActionKind, AssertionType, ElementSnapshot, Recording, ValuePayload};
pub use normalizer::ActionNormalizer;
pub use observer::ObservationManager;
pub use pending::{PendingInput, PendingInputs};
pub use protocol::{CommandReply, RecorderCommand, RecorderEvent, RecorderStatus};
pub use recorder::Recorder;
pub use session::RecordingSession;
pub use state::{RecorderState, StateMachine};
pub use transport::{deliver, BusTransport, Transport};
pub use value::{extract_value, recorded_value, PASSWORD_MASK};
pub use wire::WireAction;
