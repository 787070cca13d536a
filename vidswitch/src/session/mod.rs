pub mod controller;
pub mod error;
pub mod state;

pub use controller::Controller;
pub use error::SessionError;
pub use state::{Outcome, StatusEvent};
