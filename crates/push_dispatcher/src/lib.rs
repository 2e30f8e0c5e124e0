/// MatchdayWatcher — Push Dispatcher
///
/// Turns a detected `Event` into a push:
///   1. `compose`  : title/body/data payload (pure)
///   2. `targeting`: topics or one OR-condition
///   3. transport  : FCM HTTP v1, or a dry-run logger without credentials
///
/// A failed send is logged per target and never rolls back the idempotency
/// claim here; the caller decides what to do with the `DispatchReport`.

pub mod auth;
pub mod compose;
pub mod dispatcher;
pub mod fcm;
pub mod targeting;
pub mod transport;

pub use auth::{ServiceAccount, TokenSource};
pub use compose::{compose, ComposedPush, Notification};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use fcm::FcmTransport;
pub use targeting::{Target, TargetMode, Targeting};
pub use transport::{DispatchError, DryRunTransport, PushTransport};
