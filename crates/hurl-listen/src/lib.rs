//! Index synchronization for the hurl package repository.
//!
//! Whoever updates the repository (a post-receive hook) sends one
//! notification per changed package or deleted branch. The [`Listener`]
//! consumes them one at a time and applies each to the search index,
//! flushing after every mutation. It is the only steady-state writer of
//! the index.
//!
//! A notification travels as `(text, kind)`:
//!
//! | kind | meaning          | text             |
//! |------|------------------|------------------|
//! | 1    | `CHANGED`        | `branch/package` |
//! | 2    | `DELETED`        | `branch/package` |
//! | 3    | `BRANCH_DELETED` | `branch`         |

pub mod error;
pub mod listener;
pub mod notification;
pub mod source;

pub use error::{ListenError, ListenResult};
pub use listener::Listener;
pub use notification::{Notification, NotificationKind, RawMessage};
pub use source::{channel, ChannelNotifier, ChannelSource, NotificationSource, SocketNotifier, SocketSource};
