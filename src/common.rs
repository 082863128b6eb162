use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::*;

/// Port used when none is given.
pub const DEFAULT_PORT: u32 = 7777;
/// Per exchange timeout used when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// What to query and how long to wait for each reply.
///
/// The port is kept wider than the wire field so that bad input is
/// rejected by [QueryOptions::validate] instead of silently wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub host: String,
    pub port: u32,
    pub timeout: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            host: String::new(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl QueryOptions {
    pub fn new<H: Into<String>>(host: H) -> Self {
        QueryOptions {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn port(mut self, port: u32) -> Self {
        self.port = port;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks the options before any packet is sent.
    pub fn validate(&self) -> Result<Target> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(RequestError::InvalidArguments("missing host".into()));
        }
        let port = match self.port {
            1..=65535 => self.port as u16,
            p => {
                return Err(RequestError::InvalidArguments(format!(
                    "port {} out of range 1-65535",
                    p
                )))
            }
        };
        if self.timeout == Duration::from_millis(0) {
            return Err(RequestError::InvalidArguments(
                "timeout must be positive".into(),
            ));
        }
        Ok(Target {
            host: host.to_owned(),
            port,
            timeout: self.timeout,
        })
    }
}

/// Accepts `"host"` or `"host:port"`.
impl FromStr for QueryOptions {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u32>().map_err(|e| {
                    RequestError::InvalidArguments(format!("bad port '{}': {}", port, e))
                })?;
                Ok(QueryOptions::new(host).port(port))
            }
            None => Ok(QueryOptions::new(s)),
        }
    }
}

/// Validated [QueryOptions].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

/// Decoded info response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub passworded: bool,
    pub players: u16,
    pub max_players: u16,
    pub hostname: String,
    pub gamemode: String,
    pub mapname: String,
}

/// Value of a server rule after the well known ones are coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValue {
    Text(String),
    Bool(bool),
    Int(i32),
}

impl RuleValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuleValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Server rules in the order the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<(String, RuleValue)>,
    index: HashMap<String, usize>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a rule, replacing the value in place if the name was already present.
    pub fn insert<N: Into<String>>(&mut self, name: N, value: RuleValue) {
        let name = name.into();
        match self.index.get(&name).copied() {
            Some(i) => self.rules[i].1 = value,
            None => {
                self.index.insert(name.clone(), self.rules.len());
                self.rules.push((name, value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RuleValue> {
        self.index.get(name).map(|&i| &self.rules[i].1)
    }

    pub fn lagcomp(&self) -> Option<bool> {
        match self.get("lagcomp") {
            Some(RuleValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn weather(&self) -> Option<i32> {
        match self.get("weather") {
            Some(RuleValue::Int(w)) => Some(*w),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleValue)> {
        self.rules.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Player info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: u8,
    pub name: String,
    pub score: u16,
    pub ping: u16,
}

/// Everything a query found out about a server.
///
/// `players` may be shorter or longer than `online`, servers misreport,
/// and it is always empty for servers with more than 100 players online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub address: String,
    pub hostname: String,
    pub gamemode: String,
    pub mapname: String,
    pub passworded: bool,
    pub maxplayers: u16,
    pub online: u16,
    pub rules: RuleSet,
    pub players: Vec<Player>,
}
