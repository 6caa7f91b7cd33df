//! Turns notification intents into sink messages.
//!
//! The [`Dispatcher`] owns the process-lifetime de-duplication cache and the
//! reply-level relevance gate; transports implement [`NotificationSink`].

pub mod dispatcher;
pub mod notice;
pub mod sink;

pub use dispatcher::{DEFAULT_DEDUPE_CAPACITY, DispatchReport, Dispatcher};
pub use notice::{Channel, NEW_THREAD_COLOR, Notice, NoticeField, UPDATE_COLOR};
pub use sink::{NotificationSink, SinkError};
