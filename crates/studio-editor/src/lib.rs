pub mod history;
pub mod hit;
pub mod input;
pub mod keyboard;
pub mod persist;
pub mod session;
pub mod shortcuts;
pub mod store;
pub mod tools;

pub use history::History;
pub use input::{FocusTarget, InputEvent, KeyEvent, Modifiers};
pub use keyboard::{KeyBus, KeySubscription, KeyTarget, KeyboardRouter};
pub use persist::{OpAck, OpLedger, OpOutcome, OpSink, OpStatus, PendingOp, RecordingSink, RemoteOp};
pub use session::{Selection, StudioSession};
pub use store::{LayerStore, LoadedLayer, StoreSnapshot};
