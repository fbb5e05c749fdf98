//! Identifier types for streams, viewer sessions and subscribers
//!
//! All three are opaque strings. A `SessionId` is only unique within one
//! stream, so anything keyed across streams uses `SessionKey`.

use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a live stream
    StreamId
);

string_id!(
    /// Identifier of one viewer connection, unique within its stream
    SessionId
);

string_id!(
    /// Stable identity of the account behind one or more sessions
    SubscriberId
);

/// A session scoped by the stream it watches
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub stream: StreamId,
    pub session: SessionId,
}

impl SessionKey {
    pub fn new(stream: StreamId, session: SessionId) -> Self {
        Self { stream, session }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stream, self.session)
    }
}
