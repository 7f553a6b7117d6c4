// Services layer for business logic
// Services own domain validation, calling storage directly

pub mod event;
pub mod session;

pub use event::EventService;
pub use session::SessionService;
