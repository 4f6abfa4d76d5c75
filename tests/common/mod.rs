//! Shared fixtures for integration tests
//!
//! `FakeConnector` answers function calls from a script keyed by system, host and
//! function name, and counts how many sessions were opened and closed.

#![allow(dead_code)]

use async_trait::async_trait;
use nwrfc_exporter::config::SystemConfig;
use nwrfc_exporter::error::{CallError, ConnectionError};
use nwrfc_exporter::models::{CallParams, SystemDefinition};
use nwrfc_exporter::rfc::{
    Connector, Logon, NestedResult, RfcSession, ServerCoordinates, TOPOLOGY_FUNCTION,
};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Matches any host of a system
pub const ANY_HOST: &str = "*";

/// How a scripted call answers
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Value),
    Fail(String),
    /// Sleep this long, then answer with the inner reply
    Delay(Duration, Box<Reply>),
}

#[derive(Default)]
struct Script {
    replies: HashMap<(String, String, String), Reply>,
    refused: HashSet<(String, String)>,
    open_delay: HashMap<String, Duration>,
    calls: Vec<(String, String, String)>,
}

/// Scripted connector
#[derive(Clone, Default)]
pub struct FakeConnector {
    script: Arc<Mutex<Script>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `function` on `host` of `system`; use [`ANY_HOST`] for every host
    pub fn reply(self, system: &str, host: &str, function: &str, reply: Reply) -> Self {
        self.script.lock().unwrap().replies.insert(
            (system.to_string(), host.to_string(), function.to_string()),
            reply,
        );
        self
    }

    pub fn ok(self, system: &str, host: &str, function: &str, value: Value) -> Self {
        self.reply(system, host, function, Reply::Ok(value))
    }

    /// Script the server list of `system` from `<host>_<SID>_<sysnr>` names
    pub fn topology(self, system: &str, names: &[&str]) -> Self {
        let rows: Vec<Value> = names.iter().map(|name| json!({ "NAME": name })).collect();
        self.ok(system, ANY_HOST, TOPOLOGY_FUNCTION, json!({ "LIST": rows }))
    }

    /// Refuse logons to `host` of `system`
    pub fn refuse(self, system: &str, host: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .refused
            .insert((system.to_string(), host.to_string()));
        self
    }

    /// Delay every logon to `system`
    pub fn slow_open(self, system: &str, delay: Duration) -> Self {
        self.script
            .lock()
            .unwrap()
            .open_delay
            .insert(system.to_string(), delay);
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Every call made so far as (system, host, function)
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn calls_of(&self, function: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(_, _, called)| called == function)
            .count()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(
        &self,
        logon: Logon<'_>,
        coordinates: &ServerCoordinates,
    ) -> Result<Box<dyn RfcSession>, ConnectionError> {
        let system = logon.system.to_string();
        let host = coordinates.ashost.clone();

        let (refused, delay) = {
            let script = self.script.lock().unwrap();
            (
                script.refused.contains(&(system.clone(), host.clone()))
                    || script.refused.contains(&(system.clone(), ANY_HOST.to_string())),
                script.open_delay.get(&system).copied(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if refused {
            return Err(ConnectionError {
                system,
                server: host,
                reason: "logon refused".to_string(),
            });
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            system,
            host,
            script: Arc::clone(&self.script),
            closed: Arc::clone(&self.closed),
            is_closed: false,
        }))
    }
}

struct FakeSession {
    system: String,
    host: String,
    script: Arc<Mutex<Script>>,
    closed: Arc<AtomicUsize>,
    is_closed: bool,
}

#[async_trait]
impl RfcSession for FakeSession {
    async fn invoke(
        &mut self,
        function: &str,
        _params: &CallParams,
    ) -> Result<NestedResult, CallError> {
        assert!(!self.is_closed, "call on a closed session");
        let reply = {
            let mut script = self.script.lock().unwrap();
            script
                .calls
                .push((self.system.clone(), self.host.clone(), function.to_string()));
            script
                .replies
                .get(&(self.system.clone(), self.host.clone(), function.to_string()))
                .or_else(|| {
                    script.replies.get(&(
                        self.system.clone(),
                        ANY_HOST.to_string(),
                        function.to_string(),
                    ))
                })
                .cloned()
        };

        let mut reply = reply.unwrap_or_else(|| Reply::Fail(format!("{} not scripted", function)));
        loop {
            match reply {
                Reply::Ok(Value::Object(map)) => return Ok(map),
                Reply::Ok(other) => {
                    return Err(CallError {
                        function: function.to_string(),
                        reason: format!("not an object: {}", other),
                    });
                }
                Reply::Fail(reason) => {
                    return Err(CallError {
                        function: function.to_string(),
                        reason,
                    });
                }
                Reply::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }

    async fn close(&mut self) {
        assert!(!self.is_closed, "session closed twice");
        self.is_closed = true;
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A system with the given name, primary host and tags
pub fn system(name: &str, host: &str, tags: &[&str]) -> SystemDefinition {
    SystemDefinition::from_config(&system_config(name, host, tags)).expect("valid system")
}

pub fn system_config(name: &str, host: &str, tags: &[&str]) -> SystemConfig {
    SystemConfig {
        name: name.to_string(),
        usage: "development".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        user: "monitor".to_string(),
        lang: "en".to_string(),
        client: "100".to_string(),
        server: host.to_string(),
        sysnr: "00".to_string(),
        ..Default::default()
    }
}
