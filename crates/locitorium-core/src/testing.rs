//! In-process capability fakes for tests (`testing` feature).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::capabilities::{Gazetteer, LanguageModel};
use crate::error::{Error, Result};
use crate::types::{Candidate, Scalar};

/// Build a candidate with just the fields the pipeline looks at.
pub fn candidate(rank: u32, display_name: &str, country_code: Option<&str>) -> Candidate {
    Candidate {
        rank,
        osm_type: "relation".into(),
        osm_id: Scalar::from(i64::from(rank) * 1000),
        display_name: display_name.into(),
        lat: Scalar::from("35.0"),
        lon: Scalar::from("139.0"),
        bbox: vec![
            Scalar::from("34.0"),
            Scalar::from("36.0"),
            Scalar::from("138.0"),
            Scalar::from("140.0"),
        ],
        country_code: crate::types::normalize_country_code(country_code),
        category: Some("boundary".into()),
        place_rank: Some(16),
        importance: Some(0.5),
    }
}

enum Reply {
    Object(Value),
    Invalid(String),
}

/// One recorded `generate` call.
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub prompt: String,
    pub schema: Value,
    pub tag: String,
}

/// Language model that replays queued replies in order.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<GenerateCall>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Queue a reply. Non-object values are reported as invalid output.
    pub fn reply(self, value: Value) -> Self {
        self.replies.lock().push_back(Reply::Object(value));
        self
    }

    /// Queue an `InvalidOutput` failure.
    pub fn fail(self, message: &str) -> Self {
        self.replies.lock().push_back(Reply::Invalid(message.into()));
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().clone()
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str, schema: &Value, tag: &str) -> Result<Map<String, Value>> {
        self.calls.lock().push(GenerateCall {
            prompt: prompt.into(),
            schema: schema.clone(),
            tag: tag.into(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Object(Value::Object(map))) => Ok(map),
            Some(Reply::Object(other)) => Err(Error::InvalidOutput(format!(
                "expected a JSON object, got {}",
                other
            ))),
            Some(Reply::Invalid(message)) => Err(Error::InvalidOutput(message)),
            None => Err(Error::InvalidOutput("no scripted reply left".into())),
        }
    }
}

/// Gazetteer answering from a fixed table; unknown queries match nothing.
pub struct StaticGazetteer {
    entries: HashMap<String, Vec<Candidate>>,
    unavailable: HashSet<String>,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StaticGazetteer {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            unavailable: HashSet::new(),
            delay: None,
            queries: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, query: &str, candidates: Vec<Candidate>) -> Self {
        self.entries.insert(query.into(), candidates);
        self
    }

    /// Make `query` fail as if the gazetteer returned a 5xx.
    pub fn unavailable_for(mut self, query: &str) -> Self {
        self.unavailable.insert(query.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// Highest number of searches observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for StaticGazetteer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gazetteer for StaticGazetteer {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        self.queries.lock().push(query.into());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unavailable.contains(query) {
            return Err(Error::UpstreamUnavailable(format!(
                "gazetteer server error for {:?}",
                query
            )));
        }
        Ok(self.entries.get(query).cloned().unwrap_or_default())
    }
}
