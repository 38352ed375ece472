//! A blocking client for session authenticated JSON admin APIs.
//!
//! [`Client`] logs in with a username and password, carries the session
//! cookie returned by the server across subsequent requests, and reports the
//! outcome of every call both as a return value and through
//! [`Client::succeeded`] and [`Client::last_error`].
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! rsadmin_client::global_init();
//! let mut client = rsadmin_client::Client::builder("https://server.example.com/api/2.0").build()?;
//! if client.login("admin", "hunter2") {
//!     let users = client.do_get("realm/base/users")?;
//!     println!("{users:?}");
//!     client.logout();
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod response;
mod transport;

pub use client::{Client, ClientBuilder};
pub use error::Error;
pub use transport::{
    global_init, HttpTransport, RawResponse, Request, Transport, TransportSettings,
};
