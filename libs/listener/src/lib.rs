//! # slb-listener
//!
//! Canonical listener model for cloud load balancer reconciliation.
//!
//! ## Pipeline
//!
//! ```text
//! declared Listener ──validate──▶ build ──▶ ListenerRequest ──▶ remote API
//!                                                                  │
//! canonical Listener ◀──normalize── ListenerAttributes ◀──describe─┘
//! ```
//!
//! - [`Listener`] is the single protocol-agnostic shape both sides meet in.
//! - [`validate`] enforces the conditional http/https fields.
//! - [`build`] projects a listener into one of four protocol requests.
//! - [`normalize`] flattens one of four described shapes back into a listener.
//!
//! Nothing in this crate performs I/O.

#[macro_use]
mod macros;

mod error;
mod model;
mod remote;
mod request;
mod validate;

pub use error::{ListenerParseError, ValidationError, ValidationErrorKind};
pub use model::{
    Flag, HealthCheckType, HttpCode, HttpCodes, Listener, ListenerKey, Protocol, Scheduler,
    StickySessionType,
};
pub use remote::{
    normalize, HttpListenerAttributes, HttpsListenerAttributes, ListenerAttributes,
    ListenerStatus, TcpListenerAttributes, UdpListenerAttributes,
};
pub use request::{
    build, HttpListenerArgs, HttpsListenerArgs, ListenerRequest, TcpListenerArgs, UdpListenerArgs,
};
pub use validate::validate;
