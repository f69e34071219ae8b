//! Routing rule engine.
//!
//! Active rules are evaluated in ascending priority. A matching rule applies
//! its action to a working copy of the candidate list: `route_to` and
//! `failover` can short-circuit with a venue, `avoid` shrinks the working
//! copy, `load_balance` hands the working copy to the balancer. The
//! registry's own candidate listing is never touched.

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::domain::{
    ActionKind, ConditionError, RoutingRule, RuleAction, RuleContext, RuleId, VenueId,
};

/// Services a rule action may call on.
pub trait RuleDelegate {
    /// Pick one of `candidates`, as the load balancer would.
    fn balance(&self, candidates: &[VenueId]) -> Option<VenueId>;

    /// The failover controller's current best backup.
    fn failover_target(&self) -> Option<VenueId>;
}

/// Outcome of evaluating the rule set for one order.
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluation {
    /// Venue chosen by a rule, if any rule short-circuited.
    pub venue: Option<VenueId>,
    /// Rule whose action chose `venue`.
    pub decided_by: Option<RuleId>,
    /// Rules whose conditions held, in evaluation order.
    pub matched: Vec<RuleId>,
    /// Candidates left after `avoid` actions.
    pub candidates: Vec<VenueId>,
    /// Rules skipped because their condition could not be evaluated.
    pub skipped: Vec<(RuleId, ConditionError)>,
}

enum Applied {
    Selected(VenueId),
    Reduced,
    NoEffect,
}

/// Ordered rule set with usage counters.
pub struct RuleEngine {
    rules: RwLock<Vec<RoutingRule>>,
}

impl RuleEngine {
    /// Build an engine; rules are ordered by priority, ties keep input order.
    #[must_use]
    pub fn new(mut rules: Vec<RoutingRule>) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// Copy of the rule set with current counters.
    #[must_use]
    pub fn rules(&self) -> Vec<RoutingRule> {
        self.rules.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Activate or deactivate a rule. Returns false for an unknown id.
    pub fn set_active(&self, id: &RuleId, active: bool) -> bool {
        let mut rules = self.rules.write();
        match rules.iter_mut().find(|r| &r.id == id) {
            Some(rule) => {
                rule.active = active;
                rule.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Evaluate every active rule against `ctx` over `candidates`.
    pub fn evaluate(
        &self,
        ctx: &RuleContext<'_>,
        candidates: Vec<VenueId>,
        delegate: &dyn RuleDelegate,
    ) -> RuleEvaluation {
        let mut eval = RuleEvaluation {
            candidates,
            ..RuleEvaluation::default()
        };

        {
            let rules = self.rules.read();
            for rule in rules.iter().filter(|r| r.active) {
                match apply_rule(rule, ctx, &mut eval.candidates, delegate) {
                    Err(e) => {
                        warn!(rule = %rule.id, error = %e, "Rule condition invalid, rule skipped");
                        eval.skipped.push((rule.id.clone(), e));
                    }
                    Ok(None) => {}
                    Ok(Some(applied)) => {
                        eval.matched.push(rule.id.clone());
                        if let Applied::Selected(venue) = applied {
                            debug!(rule = %rule.id, venue = %venue, "Rule selected venue");
                            eval.venue = Some(venue);
                            eval.decided_by = Some(rule.id.clone());
                            break;
                        }
                    }
                }
            }
        }

        if !eval.matched.is_empty() {
            let mut rules = self.rules.write();
            for rule in rules.iter_mut().filter(|r| eval.matched.contains(&r.id)) {
                rule.hit_count += 1;
            }
        }
        eval
    }

    /// Credit matched rules whose order went on to execute successfully.
    pub fn record_outcome(&self, matched: &[RuleId], success: bool) {
        if !success || matched.is_empty() {
            return;
        }
        let mut rules = self.rules.write();
        for rule in rules.iter_mut().filter(|r| matched.contains(&r.id)) {
            rule.success_count += 1;
        }
    }
}

/// `Ok(None)` when the condition does not hold.
fn apply_rule(
    rule: &RoutingRule,
    ctx: &RuleContext<'_>,
    candidates: &mut Vec<VenueId>,
    delegate: &dyn RuleDelegate,
) -> Result<Option<Applied>, ConditionError> {
    if let ActionKind::Avoid { venue: None } = rule.action.kind {
        return avoid_matching(rule, ctx, candidates);
    }

    if !rule.condition.evaluate(ctx, rule.action.target())? {
        return Ok(None);
    }
    Ok(Some(apply_action(&rule.action, candidates, delegate)))
}

/// Targetless `avoid`: drop every candidate the condition holds for.
fn avoid_matching(
    rule: &RoutingRule,
    ctx: &RuleContext<'_>,
    candidates: &mut Vec<VenueId>,
) -> Result<Option<Applied>, ConditionError> {
    let mut keep = Vec::with_capacity(candidates.len());
    for candidate in candidates.iter() {
        keep.push(!rule.condition.evaluate(ctx, Some(candidate))?);
    }
    if keep.iter().all(|k| *k) {
        return Ok(None);
    }
    let mut flags = keep.into_iter();
    candidates.retain(|_| flags.next().unwrap_or(true));
    Ok(Some(Applied::Reduced))
}

fn apply_action(
    action: &RuleAction,
    candidates: &mut Vec<VenueId>,
    delegate: &dyn RuleDelegate,
) -> Applied {
    let applied = match &action.kind {
        ActionKind::RouteTo { venue } => {
            if candidates.contains(venue) {
                Applied::Selected(venue.clone())
            } else {
                Applied::NoEffect
            }
        }
        ActionKind::Avoid { venue: Some(venue) } => {
            let before = candidates.len();
            candidates.retain(|c| c != venue);
            if candidates.len() < before {
                Applied::Reduced
            } else {
                Applied::NoEffect
            }
        }
        // Targetless avoid inside a fallback has no subject to drop.
        ActionKind::Avoid { venue: None } => Applied::NoEffect,
        ActionKind::LoadBalance => delegate
            .balance(candidates)
            .map_or(Applied::NoEffect, Applied::Selected),
        ActionKind::Failover => delegate
            .failover_target()
            .filter(|v| candidates.contains(v))
            .map_or(Applied::NoEffect, Applied::Selected),
    };

    match (applied, &action.fallback) {
        (Applied::NoEffect, Some(fallback)) => apply_action(fallback, candidates, delegate),
        (applied, _) => applied,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::domain::{Condition, Operator, VenueStatus};
    use crate::testkit::domain::{always, avoid, route_when_healthy, venue_id};

    struct Stub {
        backup: Option<VenueId>,
    }

    impl RuleDelegate for Stub {
        fn balance(&self, candidates: &[VenueId]) -> Option<VenueId> {
            candidates.last().cloned()
        }

        fn failover_target(&self) -> Option<VenueId> {
            self.backup.clone()
        }
    }

    fn statuses() -> HashMap<VenueId, VenueStatus> {
        ["binance", "okx", "bybit"]
            .into_iter()
            .map(|v| (venue_id(v), VenueStatus::initial(venue_id(v), 1_000.0)))
            .collect()
    }

    fn ctx(statuses: &HashMap<VenueId, VenueStatus>) -> RuleContext<'_> {
        RuleContext {
            symbol: "BTCUSDT",
            order_type: "LIMIT",
            statuses,
            now: Utc::now(),
        }
    }

    fn candidates() -> Vec<VenueId> {
        vec![venue_id("binance"), venue_id("okx"), venue_id("bybit")]
    }

    const NO_BACKUP: Stub = Stub { backup: None };

    #[test]
    fn route_to_short_circuits_in_priority_order() {
        let engine = RuleEngine::new(vec![
            route_when_healthy("second", 20, "okx", 0.5),
            route_when_healthy("first", 10, "binance", 0.5),
        ]);
        let s = statuses();
        let eval = engine.evaluate(&ctx(&s), candidates(), &NO_BACKUP);

        assert_eq!(eval.venue, Some(venue_id("binance")));
        assert_eq!(eval.decided_by, Some(RuleId::new("first")));
        assert_eq!(eval.matched, vec![RuleId::new("first")]);
        assert_eq!(engine.rules()[0].hit_count, 1);
        assert_eq!(engine.rules()[1].hit_count, 0);
    }

    #[test]
    fn route_to_unhealthy_target_does_not_match() {
        let engine = RuleEngine::new(vec![route_when_healthy("primary", 1, "binance", 0.9)]);
        let mut s = statuses();
        s.get_mut(&venue_id("binance")).unwrap().health_score = 0.5;
        let eval = engine.evaluate(&ctx(&s), candidates(), &NO_BACKUP);
        assert!(eval.venue.is_none());
        assert!(eval.matched.is_empty());
    }

    #[test]
    fn avoid_reduces_working_set_only() {
        let engine = RuleEngine::new(vec![avoid("no-okx", 1, "okx")]);
        let s = statuses();
        let original = candidates();
        let eval = engine.evaluate(&ctx(&s), original.clone(), &NO_BACKUP);

        assert_eq!(eval.candidates, vec![venue_id("binance"), venue_id("bybit")]);
        assert_eq!(original.len(), 3);
        assert!(eval.venue.is_none());
        assert_eq!(eval.matched, vec![RuleId::new("no-okx")]);
    }

    #[test]
    fn targetless_avoid_checks_each_candidate() {
        let rule = RoutingRule::new(
            "slow",
            1,
            Condition::VenueLatency {
                venue: None,
                operator: Operator::GreaterThan,
                value_ms: 100.0,
            },
            RuleAction::new(ActionKind::Avoid { venue: None }),
        );
        let engine = RuleEngine::new(vec![rule]);
        let mut s = statuses();
        s.get_mut(&venue_id("okx")).unwrap().latency = Duration::from_millis(250);
        let eval = engine.evaluate(&ctx(&s), candidates(), &NO_BACKUP);
        assert_eq!(eval.candidates, vec![venue_id("binance"), venue_id("bybit")]);
    }

    #[test]
    fn fallback_applies_when_target_missing() {
        let rule = RoutingRule::new(
            "to-kraken",
            1,
            Condition::Always,
            RuleAction::new(ActionKind::RouteTo {
                venue: venue_id("kraken"),
            })
            .or_else(RuleAction::new(ActionKind::LoadBalance)),
        );
        let engine = RuleEngine::new(vec![rule]);
        let s = statuses();
        let eval = engine.evaluate(&ctx(&s), candidates(), &NO_BACKUP);
        assert_eq!(eval.venue, Some(venue_id("bybit")));
    }

    #[test]
    fn failover_action_uses_backup_only_if_candidate() {
        let engine = RuleEngine::new(vec![always("fo", 1, ActionKind::Failover)]);
        let s = statuses();

        let eval = engine.evaluate(
            &ctx(&s),
            candidates(),
            &Stub {
                backup: Some(venue_id("okx")),
            },
        );
        assert_eq!(eval.venue, Some(venue_id("okx")));

        let eval = engine.evaluate(
            &ctx(&s),
            vec![venue_id("binance")],
            &Stub {
                backup: Some(venue_id("okx")),
            },
        );
        assert!(eval.venue.is_none());
    }

    #[test]
    fn malformed_condition_skips_rule() {
        let bad = RoutingRule::new(
            "bad",
            1,
            Condition::VenueHealth {
                venue: None,
                operator: Operator::LessThan,
                value: 0.5,
            },
            RuleAction::new(ActionKind::LoadBalance),
        );
        let engine = RuleEngine::new(vec![bad, route_when_healthy("good", 2, "okx", 0.5)]);
        let s = statuses();
        let eval = engine.evaluate(&ctx(&s), candidates(), &NO_BACKUP);
        assert_eq!(eval.skipped.len(), 1);
        assert_eq!(eval.venue, Some(venue_id("okx")));
    }

    #[test]
    fn inactive_rules_are_ignored_and_outcomes_counted() {
        let engine = RuleEngine::new(vec![
            route_when_healthy("off", 1, "binance", 0.5).inactive(),
            route_when_healthy("on", 2, "okx", 0.5),
        ]);
        let s = statuses();
        let eval = engine.evaluate(&ctx(&s), candidates(), &NO_BACKUP);
        assert_eq!(eval.venue, Some(venue_id("okx")));

        engine.record_outcome(&eval.matched, true);
        let on = engine
            .rules()
            .into_iter()
            .find(|r| r.id == RuleId::new("on"))
            .unwrap();
        assert_eq!((on.hit_count, on.success_count), (1, 1));

        assert!(engine.set_active(&RuleId::new("on"), false));
        let eval = engine.evaluate(&ctx(&s), candidates(), &NO_BACKUP);
        assert!(eval.venue.is_none());
    }
}
