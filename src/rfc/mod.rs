//! Connection provider abstraction
//!
//! The collector only talks to remote systems through [`Connector`] and [`RfcSession`].
//! The shipped implementation is [`gateway::HttpGateway`], which speaks JSON to an RFC
//! gateway service; tests plug in in-memory fakes.

pub mod gateway;

use crate::error::{CallError, ConnectionError};
use crate::models::CallParams;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

pub use gateway::HttpGateway;

/// Function module returning the application servers of a system
pub const TOPOLOGY_FUNCTION: &str = "TH_SERVER_LIST";

/// Nested result of a remote function call: parameter name to value
///
/// Tables are arrays of objects, structures are objects, scalars are strings or numbers.
pub type NestedResult = serde_json::Map<String, serde_json::Value>;

/// Where to connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerCoordinates {
    /// Application server host
    pub ashost: String,
    /// Instance number
    pub sysnr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mshost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msserv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saprouter: Option<String>,
}

impl ServerCoordinates {
    /// Coordinates of one specific application server of the same system
    ///
    /// Message-server settings are cleared so the logon goes to exactly that host; the
    /// router string is kept.
    pub fn application_server(&self, host: &str, sysnr: &str) -> Self {
        Self {
            ashost: host.to_string(),
            sysnr: sysnr.to_string(),
            mshost: None,
            msserv: None,
            group: None,
            saprouter: self.saprouter.clone(),
        }
    }
}

/// A decrypted logon password
///
/// Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Logon data for one system, independent of the server
#[derive(Debug, Clone, Copy)]
pub struct Logon<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub client: &'a str,
    pub lang: &'a str,
    pub credential: &'a Credential,
}

/// Opens sessions to remote systems
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session to the server at `coordinates`
    async fn open(
        &self,
        logon: Logon<'_>,
        coordinates: &ServerCoordinates,
    ) -> Result<Box<dyn RfcSession>, ConnectionError>;
}

/// An open session
///
/// Owned by exactly one task; `close` is called once when the task is done with it.
#[async_trait]
pub trait RfcSession: Send {
    async fn invoke(
        &mut self,
        function: &str,
        params: &CallParams,
    ) -> Result<NestedResult, CallError>;

    /// Release the session; failures are logged by the implementation
    async fn close(&mut self);
}

/// A named, exclusively owned session
///
/// `close` takes `self`, so a handle cannot be used after it was closed.
pub struct ServerHandle {
    name: String,
    session: Box<dyn RfcSession>,
}

impl ServerHandle {
    pub fn new(name: impl Into<String>, session: Box<dyn RfcSession>) -> Self {
        Self {
            name: name.into(),
            session,
        }
    }

    /// Server label value (lower case)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn invoke(
        &mut self,
        function: &str,
        params: &CallParams,
    ) -> Result<NestedResult, CallError> {
        self.session.invoke(function, params).await
    }

    pub async fn close(mut self) {
        self.session.close().await;
    }
}

impl fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
