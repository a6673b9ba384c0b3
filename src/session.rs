//! Explicit registry of live scoring sessions, one engine per camera.

use anyhow::{anyhow, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::config::EngineConfig;
use crate::context::ScoringContext;
use crate::detect::DetectionFrame;
use crate::engine::{RiskAssessment, RiskEngine};

pub fn validate_session_id(session_id: &str) -> Result<()> {
    static SESSION_ID_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let re = SESSION_ID_RE
        .get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_:-]{0,63}$"))
        .as_ref()
        .map_err(|e| anyhow!("session id pattern failed to compile: {}", e))?;

    if !re.is_match(session_id) {
        return Err(anyhow!(
            "session id '{}' must match ^[a-z0-9][a-z0-9_:-]{{0,63}}$",
            session_id
        ));
    }
    Ok(())
}

pub struct SessionRegistry {
    config: EngineConfig,
    sessions: BTreeMap<String, RiskEngine>,
}

impl SessionRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sessions: BTreeMap::new(),
        }
    }

    /// Start a new session with a fresh, uncalibrated engine.
    pub fn open(&mut self, session_id: &str) -> Result<&mut RiskEngine> {
        validate_session_id(session_id)?;
        if self.sessions.contains_key(session_id) {
            return Err(anyhow!("session '{}' is already open", session_id));
        }
        log::info!("opening risk session {}", session_id);
        let engine = RiskEngine::new(self.config.clone());
        Ok(self.sessions.entry(session_id.to_string()).or_insert(engine))
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut RiskEngine> {
        self.sessions.get_mut(session_id)
    }

    pub fn calculate_risk(
        &mut self,
        session_id: &str,
        frame: DetectionFrame,
        context: Option<&ScoringContext>,
    ) -> Result<RiskAssessment> {
        let engine = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| anyhow!("no open session '{}'", session_id))?;
        engine.calculate_risk(frame, context)
    }

    /// Returns false if the session was not open.
    pub fn close(&mut self, session_id: &str) -> bool {
        let closed = self.sessions.remove(session_id).is_some();
        if closed {
            log::info!("closed risk session {}", session_id);
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    /// Independent engine for offline analysis. It calibrates on its own and
    /// never touches a live session's baseline or history.
    pub fn forensic_engine(&self) -> RiskEngine {
        RiskEngine::new(self.config.clone())
    }
}
