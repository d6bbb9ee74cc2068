use tracing::warn;

/// Lifecycle of one send: `queued → in_flight → committed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    /// Waiting for a session to exist.
    Queued,
    /// User message shown, agent call outstanding.
    InFlight,
    Committed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    session_id: Option<String>,
    phase: SendPhase,
}

impl PendingSend {
    pub fn queued() -> Self {
        Self { session_id: None, phase: SendPhase::Queued }
    }

    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.phase, SendPhase::Committed | SendPhase::Failed)
    }

    pub fn dispatch(&mut self, session_id: &str) -> bool {
        if !self.transition(SendPhase::Queued, SendPhase::InFlight) {
            return false;
        }
        self.session_id = Some(session_id.to_string());
        true
    }

    pub fn commit(&mut self) -> bool {
        self.transition(SendPhase::InFlight, SendPhase::Committed)
    }

    /// Session creation (queued) or the agent call (in flight) failed.
    pub fn fail(&mut self) -> bool {
        if self.is_settled() {
            warn!("Ignoring failure of an already settled send ({:?})", self.phase);
            return false;
        }
        self.phase = SendPhase::Failed;
        true
    }

    fn transition(&mut self, from: SendPhase, to: SendPhase) -> bool {
        if self.phase != from {
            warn!("Ignoring send transition {:?} -> {:?} from {:?}", from, to, self.phase);
            return false;
        }
        self.phase = to;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut send = PendingSend::queued();
        assert!(send.dispatch("s1"));
        assert_eq!(send.session_id(), Some("s1"));
        assert!(send.commit());
        assert!(send.is_settled());
        assert_eq!(send.phase(), SendPhase::Committed);
    }

    #[test]
    fn cannot_commit_before_dispatch_or_fail_after_commit() {
        let mut send = PendingSend::queued();
        assert!(!send.commit());
        assert!(send.fail());
        assert!(!send.dispatch("s1"));
        assert_eq!(send.phase(), SendPhase::Failed);

        let mut send = PendingSend::queued();
        send.dispatch("s1");
        send.commit();
        assert!(!send.fail());
    }
}
