//! Turns untyped transport input into an [`AnalysisRequest`].
//!
//! Nothing here touches the engine: a request that fails validation never
//! reaches the shared session.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{AnalysisRequest, DEFAULT_DEPTH, MAX_DEPTH};

/// Query string of `GET /analyze`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    pub fen: Option<String>,
    pub depth: Option<String>,
}

/// Builds params from raw query pairs. A repeated key keeps its first value;
/// unknown keys are ignored.
impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut params = QueryParams::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "fen" => &mut params.fen,
                "depth" => &mut params.depth,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }
}

/// Analysis parameters, tagged by the transport they arrived on.
#[derive(Debug, Clone)]
pub enum AnalyzeParams {
    Query(QueryParams),
    Body(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthPolicy {
    pub default_depth: u8,
    pub max_depth: u8,
}

impl Default for DepthPolicy {
    fn default() -> Self {
        Self {
            default_depth: DEFAULT_DEPTH,
            max_depth: MAX_DEPTH,
        }
    }
}

impl DepthPolicy {
    pub fn new(default_depth: u8, max_depth: u8) -> Result<Self> {
        if max_depth == 0 || default_depth == 0 || default_depth > max_depth {
            return Err(Error::Config(format!(
                "default depth {} must be within 1..={}",
                default_depth, max_depth
            )));
        }
        Ok(Self {
            default_depth,
            max_depth,
        })
    }

    /// Non-positive depths fall back to the default; depths past the limit
    /// are capped at the limit.
    pub fn clamp(&self, depth: i64) -> u8 {
        if depth < 1 {
            self.default_depth
        } else if depth > i64::from(self.max_depth) {
            self.max_depth
        } else {
            depth as u8
        }
    }

    /// Resolves a parsed depth, falling back to the default on any parse error.
    pub fn resolve(&self, parsed: Result<i64>) -> u8 {
        match parsed {
            Ok(depth) => self.clamp(depth),
            Err(_) => self.default_depth,
        }
    }
}

/// Clamps with the stock policy (default 20, max 30).
pub fn clamp_depth(raw: Option<&Value>) -> u8 {
    DepthPolicy::default().resolve(parse_json_depth(raw))
}

pub fn parse_text_depth(raw: Option<&str>) -> Result<i64> {
    let text = raw.ok_or_else(|| Error::InvalidDepth("missing".into()))?;
    text.trim()
        .parse::<i64>()
        .map_err(|_| Error::InvalidDepth(text.to_string()))
}

/// Accepts integers, floats (truncated) and numeric strings.
pub fn parse_json_depth(raw: Option<&Value>) -> Result<i64> {
    match raw {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| Error::InvalidDepth(n.to_string())),
        Some(Value::String(s)) => parse_text_depth(Some(s)),
        Some(other) => Err(Error::InvalidDepth(other.to_string())),
        None => Err(Error::InvalidDepth("missing".into())),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestValidator {
    policy: DepthPolicy,
}

impl RequestValidator {
    pub fn new(policy: DepthPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DepthPolicy {
        &self.policy
    }

    pub fn validate(&self, params: AnalyzeParams) -> Result<AnalysisRequest> {
        let (fen, depth) = match params {
            AnalyzeParams::Query(query) => {
                let depth = self.policy.resolve(parse_text_depth(query.depth.as_deref()));
                (query.fen, depth)
            }
            AnalyzeParams::Body(body) => {
                let object = match body {
                    Value::Object(map) if !map.is_empty() => map,
                    _ => return Err(Error::MissingBody),
                };
                let depth = self.policy.resolve(parse_json_depth(object.get("depth")));
                let fen = object
                    .get("fen")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                (fen, depth)
            }
        };

        let fen = fen
            .filter(|f| !f.is_empty())
            .ok_or(Error::MissingPosition)?;

        Ok(AnalysisRequest::new(fen).with_depth(depth))
    }
}
