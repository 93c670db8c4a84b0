//! Keyword intent classification
//!
//! Decides, per incoming message, whether the active agent keeps the
//! conversation or control moves to another agent. Each routable agent owns
//! an ordered list of trigger phrases. The message is case-folded and the
//! agents are scanned in registration order; the first agent with a trigger
//! that occurs as a substring of the message is the target.
//!
//! This is plain substring matching, not semantic intent detection. Ties are
//! resolved by registration order alone, so the same message against the same
//! active agent always yields the same decision.

use tracing::debug;

use crate::agents::AgentRegistry;
use crate::types::RoutingDecision;

/// Trigger phrases for one target agent
#[derive(Debug, Clone)]
struct Route {
    agent: String,
    triggers: Vec<String>,
}

impl Route {
    fn matches(&self, normalized: &str) -> Option<&str> {
        self.triggers
            .iter()
            .find(|t| normalized.contains(t.as_str()))
            .map(String::as_str)
    }
}

/// Maps message text to a [`RoutingDecision`]
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    routes: Vec<Route>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build routes from every registry agent that has trigger phrases,
    /// keeping registration order
    pub fn from_registry(registry: &AgentRegistry) -> Self {
        registry
            .iter()
            .filter(|agent| agent.is_routable())
            .fold(Self::new(), |classifier, agent| {
                classifier.with_route(agent.name.clone(), agent.triggers.iter().cloned())
            })
    }

    /// Append a route. Routes added earlier win ties.
    pub fn with_route<I, S>(mut self, agent: impl Into<String>, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for trigger in triggers {
            // Case-folded only; surrounding spaces are part of the phrase
            let t = trigger.into().to_lowercase();
            if !t.trim().is_empty() && !normalized.contains(&t) {
                normalized.push(t);
            }
        }
        self.routes.push(Route {
            agent: agent.into(),
            triggers: normalized,
        });
        self
    }

    /// Classify `message` for a session whose active agent is `current_agent`.
    ///
    /// Pure: no state is read or written besides the route table.
    pub fn classify(&self, message: &str, current_agent: &str) -> RoutingDecision {
        let normalized = message.to_lowercase();
        if normalized.trim().is_empty() {
            return RoutingDecision::stay();
        }

        for route in &self.routes {
            if let Some(trigger) = route.matches(&normalized) {
                if route.agent == current_agent {
                    debug!(
                        "Trigger '{}' matched active agent '{}', staying",
                        trigger, current_agent
                    );
                    return RoutingDecision::stay();
                }
                debug!(
                    "Trigger '{}' routes '{}' → '{}'",
                    trigger, current_agent, route.agent
                );
                return RoutingDecision::transfer_to(route.agent.clone());
            }
        }

        RoutingDecision::stay()
    }

    /// Agent names with routes, in scan order
    pub fn targets(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.agent.as_str()).collect()
    }

    /// Normalized trigger phrases for an agent
    pub fn triggers_for(&self, agent: &str) -> Option<&[String]> {
        self.routes
            .iter()
            .find(|r| r.agent == agent)
            .map(|r| r.triggers.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentProfile;

    const TRIAGE: &str = "Triage Agent";
    const CAREER: &str = "Career Agent";
    const JOB: &str = "Job Agent";

    fn classifier() -> IntentClassifier {
        IntentClassifier::new()
            .with_route(CAREER, ["career", "suggest career", "find best career", "find career"])
            .with_route(
                JOB,
                ["job", "suggest job", "find the job", "LinkedIn job", "indeed job"],
            )
    }

    #[test]
    fn test_transfer_from_triage_to_career() {
        let decision = classifier().classify("I need career advice", TRIAGE);
        assert_eq!(decision, RoutingDecision::transfer_to(CAREER));
    }

    #[test]
    fn test_transfer_from_career_to_job() {
        let decision = classifier().classify("can you suggest a job for me", CAREER);
        assert_eq!(decision, RoutingDecision::transfer_to(JOB));
    }

    #[test]
    fn test_no_keyword_stays() {
        let decision = classifier().classify("thanks, tell me more", JOB);
        assert_eq!(decision, RoutingDecision::stay());
    }

    #[test]
    fn test_no_self_transfer() {
        let decision = classifier().classify("more career ideas please", CAREER);
        assert!(!decision.transfer);
        assert_eq!(decision.target(), None);
    }

    #[test]
    fn test_case_folded_match() {
        let decision = classifier().classify("FIND CAREER PATHS", TRIAGE);
        assert_eq!(decision.target(), Some(CAREER));
    }

    #[test]
    fn test_triggers_are_case_folded_too() {
        let decision = classifier().classify("any linkedin job openings?", TRIAGE);
        assert_eq!(decision.target(), Some(JOB));
        assert_eq!(
            classifier().triggers_for(JOB).unwrap()[3],
            "linkedin job".to_string()
        );
    }

    #[test]
    fn test_empty_and_whitespace_never_transfer() {
        assert_eq!(classifier().classify("", TRIAGE), RoutingDecision::stay());
        assert_eq!(classifier().classify("   \n\t", TRIAGE), RoutingDecision::stay());
    }

    #[test]
    fn test_earlier_route_wins_tie() {
        let c = classifier();
        // "career" and "job" both occur; career was registered first
        for _ in 0..5 {
            let decision = c.classify("is a job or a career better?", TRIAGE);
            assert_eq!(decision.target(), Some(CAREER));
        }
    }

    #[test]
    fn test_tie_when_earlier_is_active_stays() {
        let decision = classifier().classify("career or job?", CAREER);
        assert_eq!(decision, RoutingDecision::stay());
    }

    #[test]
    fn test_substring_match_inside_words() {
        // substring semantics: "jobs" contains "job"
        let decision = classifier().classify("any jobs around?", TRIAGE);
        assert_eq!(decision.target(), Some(JOB));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let c = classifier();
        let first = c.classify("suggest job openings", TRIAGE);
        let second = c.classify("suggest job openings", TRIAGE);
        assert_eq!(first, second);
    }

    #[test]
    fn test_blank_and_duplicate_triggers_dropped() {
        let c = IntentClassifier::new().with_route(JOB, ["", "  ", "job", "JOB"]);
        assert_eq!(c.triggers_for(JOB).unwrap(), &["job".to_string()]);
        assert_eq!(c.classify("hello there", TRIAGE), RoutingDecision::stay());
    }

    #[test]
    fn test_padded_trigger_keeps_its_spaces() {
        let c = IntentClassifier::new().with_route(CAREER, [" AI "]);
        assert_eq!(c.triggers_for(CAREER).unwrap(), &[" ai ".to_string()]);
        assert_eq!(c.classify("check my email please", TRIAGE), RoutingDecision::stay());
        assert_eq!(
            c.classify("is an AI career for me?", TRIAGE).target(),
            Some(CAREER)
        );
    }

    #[test]
    fn test_from_registry_keeps_order_and_skips_untriggered() {
        let mut registry = AgentRegistry::new(AgentProfile::new(TRIAGE, ""));
        registry
            .register(AgentProfile::new(JOB, "").with_triggers(["job"]))
            .unwrap();
        registry
            .register(AgentProfile::new(CAREER, "").with_triggers(["career"]))
            .unwrap();

        let c = IntentClassifier::from_registry(&registry);
        assert_eq!(c.targets(), vec![JOB, CAREER]);
        assert_eq!(
            c.classify("career or job?", TRIAGE).target(),
            Some(JOB)
        );
    }

    #[test]
    fn test_empty_classifier_always_stays() {
        let c = IntentClassifier::new();
        assert!(c.is_empty());
        assert_eq!(c.classify("career job", TRIAGE), RoutingDecision::stay());
    }
}
