//! Client library for the club event portal.
//!
//! ARCHITECTURE
//! ============
//! Layered the way a portal front end is: the [`router`] guard decides what
//! may render, the [`auth`] context owns login and the stored [`session`],
//! and the [`api`] client talks to the server with the bearer token attached.
//! [`token`] reads expiry out of the JWT, [`watch`] re-checks it on a timer,
//! and [`dashboard`] turns the event list into a role-scoped summary.

pub mod api;
pub mod auth;
pub mod dashboard;
pub mod router;
pub mod session;
pub mod token;
pub mod watch;

pub use api::{ApiClient, ApiError, ApiResult, Download, FileUpload};
pub use auth::{AuthContext, AuthStatus};
pub use dashboard::{Dashboard, ProposalSummary};
pub use router::{GuardError, Navigation, Route};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionError, SessionStore};
pub use watch::{TokenStatus, TokenWatch};
