use std::fmt;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;
use crate::http_client::build_http_client;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Season metadata: elements, teams, element types, events.
    BootstrapStatic,
    EventLive { gameweek: u32 },
    DraftChoices { league_id: u32 },
    LeagueDetails { league_id: u32 },
    EntryEvent { entry_id: i64, gameweek: u32 },
}

impl Endpoint {
    pub fn template(&self) -> &'static str {
        match self {
            Endpoint::BootstrapStatic => "bootstrap-static",
            Endpoint::EventLive { .. } => "event/{gameweek}/live",
            Endpoint::DraftChoices { .. } => "draft/{league_id}/choices",
            Endpoint::LeagueDetails { .. } => "league/{league_id}/details",
            Endpoint::EntryEvent { .. } => "entry/{entry_id}/event/{gameweek}",
        }
    }

    pub fn path(&self) -> String {
        let mut path = self.template().to_string();
        match *self {
            Endpoint::BootstrapStatic => {}
            Endpoint::EventLive { gameweek } => {
                path = path.replace("{gameweek}", &gameweek.to_string());
            }
            Endpoint::DraftChoices { league_id } | Endpoint::LeagueDetails { league_id } => {
                path = path.replace("{league_id}", &league_id.to_string());
            }
            Endpoint::EntryEvent { entry_id, gameweek } => {
                path = path
                    .replace("{entry_id}", &entry_id.to_string())
                    .replace("{gameweek}", &gameweek.to_string());
            }
        }
        path
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    Status(u16),
    Transport(String),
    Body(String),
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::Status(code) => write!(f, "http {code}"),
            EmptyReason::Transport(err) => write!(f, "transport: {err}"),
            EmptyReason::Body(err) => write!(f, "body: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Data(Value),
    Empty(EmptyReason),
}

impl FetchOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, FetchOutcome::Empty(_))
    }

    pub fn into_data(self) -> Option<Value> {
        match self {
            FetchOutcome::Data(value) => Some(value),
            FetchOutcome::Empty(_) => None,
        }
    }
}

/// Source of upstream payloads. [`FplClient`] is the network implementation.
pub trait UpstreamApi {
    fn fetch(&self, endpoint: &Endpoint) -> FetchOutcome;
}

#[derive(Debug, Clone)]
pub struct FplClient {
    client: Client,
    base_url: String,
}

impl FplClient {
    pub fn new(config: &ApiConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl UpstreamApi for FplClient {
    fn fetch(&self, endpoint: &Endpoint) -> FetchOutcome {
        let url = endpoint.url(&self.base_url);
        debug!(%url, "GET");

        let resp = match self.client.get(&url).send() {
            Ok(resp) => resp,
            Err(err) => return FetchOutcome::Empty(EmptyReason::Transport(err.to_string())),
        };
        let status = resp.status();
        if !status.is_success() {
            return FetchOutcome::Empty(EmptyReason::Status(status.as_u16()));
        }
        match resp.text() {
            Ok(body) => parse_body(&body),
            Err(err) => FetchOutcome::Empty(EmptyReason::Transport(err.to_string())),
        }
    }
}

/// Decodes a response body; blank and `null` bodies count as empty.
pub fn parse_body(raw: &str) -> FetchOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return FetchOutcome::Empty(EmptyReason::Body("empty body".to_string()));
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => FetchOutcome::Data(value),
        Err(err) => FetchOutcome::Empty(EmptyReason::Body(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_fill_parameters() {
        assert_eq!(Endpoint::BootstrapStatic.path(), "bootstrap-static");
        assert_eq!(Endpoint::EventLive { gameweek: 7 }.path(), "event/7/live");
        assert_eq!(
            Endpoint::DraftChoices { league_id: 4193 }.path(),
            "draft/4193/choices"
        );
        assert_eq!(
            Endpoint::LeagueDetails { league_id: 4193 }.path(),
            "league/4193/details"
        );
        assert_eq!(
            Endpoint::EntryEvent {
                entry_id: 1201,
                gameweek: 3
            }
            .path(),
            "entry/1201/event/3"
        );
    }

    #[test]
    fn url_joins_without_double_slash() {
        let endpoint = Endpoint::EventLive { gameweek: 2 };
        assert_eq!(
            endpoint.url("https://draft.premierleague.com/api/"),
            "https://draft.premierleague.com/api/event/2/live"
        );
    }

    #[test]
    fn body_parsing() {
        assert!(parse_body("").is_empty());
        assert!(parse_body(" null ").is_empty());
        assert!(matches!(
            parse_body("{not json"),
            FetchOutcome::Empty(EmptyReason::Body(_))
        ));
        assert_eq!(
            parse_body(r#"{"a":1}"#).into_data(),
            Some(serde_json::json!({"a": 1}))
        );
    }
}
