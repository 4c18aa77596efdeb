//! Change notification for usage updates.
//!
//! Every recorded read produces a trigger; subscribers such as a report view
//! only need to know that usage changed, not about each individual read.
//! Triggers are coalesced on the trailing edge: the subscriber is called once
//! the trigger stream has been quiet for the configured window, with the last
//! hint received.
//!
//! # Example
//!
//! ```ignore
//! let notifier = Notifier::new(Duration::from_millis(10))?;
//! notifier.set_subscriber(|hint| println!("usage changed near `{hint}`"));
//! notifier.notify("todos.0.text");
//! ```

mod debounce;

pub use debounce::{ChangeCallback, Notifier};
