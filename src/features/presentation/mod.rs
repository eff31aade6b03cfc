//! # Presentation Feature
//!
//! Shows and speaks fired reminders. Presentation is fire-and-forget: a
//! failing presenter never affects reminder bookkeeping.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: true

pub mod notification;
pub mod speech;

pub use notification::{CompositePresenter, Notification, NotificationPresenter, Presenter};
pub use speech::SpeechPresenter;
