pub mod controller;
pub mod generation;
pub mod state;

pub use controller::{ConfirmOutcome, ControllerSettings, SwapLifecycleController};
pub use generation::RequestGeneration;
pub use state::{QuoteInput, SwapErrorInfo, SwapState, SwapStatus, TransitionRecord};
