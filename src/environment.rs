//! Environment lookups and the enrichment they feed.
//!
//! The library never discovers its surroundings on its own. Request ids,
//! client addresses, hostnames and the like are asked of an `Environment`
//! handed in by the caller, and an `Enricher` copies them into tags and
//! metadata without ever overwriting what is already there.

use constants;
use error::Error;
use metric::{MetadataBag, TagMap};
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref SERVER_TYPE: Regex = Regex::new(constants::SERVER_TYPE_REGEX).unwrap();
}

/// How much context a full metric is enriched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Request id, client address and country as metadata; host, domain,
    /// server type, env, api key and version as tags.
    Required,
    /// `Required` plus the environment's extended metadata and tags.
    Extended,
}

/// Opaque lookups of the context a metric is enriched with.
///
/// Every method defaults to "unknown", so an implementation only provides
/// what it actually has.
pub trait Environment {
    /// The id of the request being served.
    fn request_id(&self) -> Option<String> {
        None
    }
    /// The address of the client being served.
    fn client_ip(&self) -> Option<String> {
        None
    }
    /// The country code of the client being served.
    fn country_code(&self) -> Option<String> {
        None
    }
    /// The api key the client presented.
    fn api_key(&self) -> Option<String> {
        None
    }
    /// The deployment environment, e.g. `production`.
    fn environment(&self) -> Option<String> {
        None
    }
    /// The running application's version.
    fn version(&self) -> Option<String> {
        None
    }
    /// The fully qualified name of this host.
    fn hostname(&self) -> Option<String> {
        None
    }
    /// Metadata added at the extended tier.
    fn extended_metadata(&self) -> Map<String, Value> {
        Map::new()
    }
    /// Tags added at the extended tier.
    fn extended_tags(&self) -> TagMap {
        TagMap::default()
    }
}

/// An `Environment` of fixed values, usually built from configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticEnvironment {
    /// See `Environment::request_id`.
    pub request_id: Option<String>,
    /// See `Environment::client_ip`.
    pub client_ip: Option<String>,
    /// See `Environment::country_code`.
    pub country_code: Option<String>,
    /// See `Environment::api_key`.
    pub api_key: Option<String>,
    /// See `Environment::environment`.
    pub environment: Option<String>,
    /// See `Environment::version`.
    pub version: Option<String>,
    /// See `Environment::hostname`.
    pub hostname: Option<String>,
    /// See `Environment::extended_metadata`.
    pub metadata: Map<String, Value>,
    /// See `Environment::extended_tags`.
    pub tags: TagMap,
}

impl Environment for StaticEnvironment {
    fn request_id(&self) -> Option<String> {
        self.request_id.clone()
    }
    fn client_ip(&self) -> Option<String> {
        self.client_ip.clone()
    }
    fn country_code(&self) -> Option<String> {
        self.country_code.clone()
    }
    fn api_key(&self) -> Option<String> {
        self.api_key.clone()
    }
    fn environment(&self) -> Option<String> {
        self.environment.clone()
    }
    fn version(&self) -> Option<String> {
        self.version.clone()
    }
    fn hostname(&self) -> Option<String> {
        self.hostname.clone()
    }
    fn extended_metadata(&self) -> Map<String, Value> {
        self.metadata.clone()
    }
    fn extended_tags(&self) -> TagMap {
        self.tags.clone()
    }
}

/// An `Environment` that knows nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEnvironment;

impl Environment for NullEnvironment {}

fn add_tag_if_absent(tags: &mut TagMap, key: &str, value: Option<String>) {
    match value {
        Some(ref v) if !v.is_empty() => {
            if tags.insert_if_absent(key.to_string(), v.clone()) {
                trace!("enriched tag {}={}", key, v);
            }
        }
        _ => {}
    }
}

fn add_metadata_if_absent(metadata: &mut Map<String, Value>, key: &str, value: Value) {
    if is_blank(&value) || metadata.contains_key(key) {
        return;
    }
    trace!("enriched metadata {}", key);
    metadata.insert(key.to_string(), value);
}

fn is_blank(value: &Value) -> bool {
    match *value {
        Value::Null => true,
        Value::String(ref s) => s.is_empty(),
        Value::Array(ref a) => a.is_empty(),
        Value::Object(ref o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Copies environment context into tags and metadata.
///
/// Existing keys always win and empty values are never added, so enriching
/// twice is the same as enriching once.
#[derive(Clone, Debug)]
pub struct Enricher {
    server_type: Regex,
    unknown: String,
}

impl Default for Enricher {
    fn default() -> Enricher {
        Enricher {
            server_type: SERVER_TYPE.clone(),
            unknown: constants::DEFAULT_UNKNOWN.to_string(),
        }
    }
}

impl Enricher {
    /// Build an enricher with a custom server type expression and unknown
    /// sentinel.
    pub fn new(server_type: &str, unknown: &str) -> Result<Enricher, Error> {
        let server_type =
            Regex::new(server_type).map_err(|e| Error::InvalidRegex(e.to_string()))?;
        Ok(Enricher {
            server_type: server_type,
            unknown: unknown.to_string(),
        })
    }

    /// The value `server_type` takes when the hostname gives no answer.
    pub fn unknown(&self) -> &str {
        &self.unknown
    }

    /// Add request, client and, at the extended tier, the environment's own
    /// metadata.
    pub fn enrich_metadata(
        &self,
        metadata: &mut Map<String, Value>,
        env: &dyn Environment,
        tier: Tier,
    ) {
        let required = [
            ("request_id", env.request_id()),
            ("ip_addr", env.client_ip()),
            ("country_code", env.country_code()),
        ];
        for &(key, ref value) in &required {
            if let Some(ref v) = *value {
                add_metadata_if_absent(metadata, key, Value::String(v.clone()));
            }
        }
        if tier == Tier::Extended {
            for (key, value) in env.extended_metadata() {
                add_metadata_if_absent(metadata, &key, value);
            }
        }
    }

    /// Add host derived, deployment and, at the extended tier, the
    /// environment's own tags.
    pub fn enrich_tags(&self, tags: &mut TagMap, env: &dyn Environment, tier: Tier) {
        if let Some(hostname) = env.hostname() {
            self.host_tags(&hostname, tags);
        }
        add_tag_if_absent(tags, "env", env.environment());
        add_tag_if_absent(tags, "api_key", env.api_key());
        add_tag_if_absent(tags, "version", env.version());
        if tier == Tier::Extended {
            for &(ref key, ref value) in env.extended_tags().iter() {
                add_tag_if_absent(tags, key, Some(value.clone()));
            }
        }
    }

    /// Derive `domain`, `host` and `server_type` from a hostname.
    ///
    /// `web-01.prod.example.com` gives host `web-01`, domain
    /// `prod.example.com` and server type `web-`. A bare hostname has no
    /// domain. When the expression finds nothing the server type is the
    /// unknown sentinel.
    pub fn host_tags(&self, hostname: &str, tags: &mut TagMap) {
        let mut parts = hostname.split('.');
        let host = parts.next().map(|s| s.to_string());
        let domain: Vec<&str> = parts.collect();
        if !domain.is_empty() {
            add_tag_if_absent(tags, "domain", Some(domain.join(".")));
        }
        add_tag_if_absent(tags, "host", host);
        if !tags.contains_key("server_type") {
            let server_type = match self.server_type.find(hostname) {
                Some(m) => m.as_str().to_string(),
                None => self.unknown.clone(),
            };
            add_tag_if_absent(tags, "server_type", Some(server_type));
        }
    }

    /// Enrich both halves of a bag.
    pub fn enrich(&self, bag: &mut MetadataBag, env: &dyn Environment, tier: Tier) {
        self.enrich_metadata(&mut bag.metadata, env, tier);
        self.enrich_tags(&mut bag.tags, env, tier);
    }
}
