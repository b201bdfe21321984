//! Status values observed while polling a resource.
//!
//! APIs report state as a bare string. Resource families map those strings to a
//! closed enum at the boundary so goal and failure lists are checked by the
//! compiler instead of by string comparison.
//!
//! # Example
//!
//! ```
//! use std::borrow::Cow;
//! use std::fmt;
//! use provider_waiters::status::Status;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum VpcStatus {
//!     Pending,
//!     Available,
//!     Unknown(String),
//! }
//!
//! impl fmt::Display for VpcStatus {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         f.write_str(&self.as_wire())
//!     }
//! }
//!
//! impl Status for VpcStatus {
//!     fn from_wire(s: &str) -> Self {
//!         match s {
//!             "Pending" => Self::Pending,
//!             "Available" => Self::Available,
//!             other => Self::Unknown(other.to_string()),
//!         }
//!     }
//!
//!     fn as_wire(&self) -> Cow<'_, str> {
//!         match self {
//!             Self::Pending => Cow::Borrowed("Pending"),
//!             Self::Available => Cow::Borrowed("Available"),
//!             Self::Unknown(s) => Cow::Borrowed(s.as_str()),
//!         }
//!     }
//! }
//!
//! assert_eq!(VpcStatus::from_wire("Available"), VpcStatus::Available);
//! assert_eq!(VpcStatus::from_wire("available"), VpcStatus::Unknown("available".into()));
//! ```

use std::borrow::Cow;
use std::fmt::{Debug, Display};

/// A resource state mapped from its wire string.
///
/// `from_wire` is total: strings outside the known set should land in a
/// catch-all variant rather than being dropped.
pub trait Status: Clone + PartialEq + Debug + Display + Send + Sync {
    /// Map a wire string to a status. Matching is case-sensitive.
    fn from_wire(s: &str) -> Self;

    /// The wire string for this status.
    fn as_wire(&self) -> Cow<'_, str>;
}

impl Status for String {
    fn from_wire(s: &str) -> Self {
        s.to_string()
    }

    fn as_wire(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}
