// Explicit post-commit notifications
//
// Services publish here after a settlement, reversal or rebuild has been stored.
// Nothing is emitted implicitly from persistence.

pub use bus::EventBus;
pub use events::LadderEvent;

mod bus;
mod events;
