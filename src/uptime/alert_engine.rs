//! Alert Decision Engine.
//!
//! Decides whether a probe fires a down, recovery or slow-response alert.
//! Pure: the pipeline supplies all inputs and performs the dispatch.

use chrono::{DateTime, Duration, Utc};

use super::probe::ProbeOutcome;
use super::tracker::FailureUpdate;
use crate::db::models::{AlertSettings, MonitoredTarget};
use crate::notifications::models::AlertKind;

/// Server-wide fallbacks for thresholds a target and its owner leave unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertDefaults {
    pub min_downtime_seconds: i64,
    pub consecutive_failures: u32,
    pub cooldown_minutes: i64,
}

impl Default for AlertDefaults {
    fn default() -> Self {
        Self {
            min_downtime_seconds: 0,
            consecutive_failures: 1,
            cooldown_minutes: 15,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertThresholds {
    pub min_downtime: Duration,
    pub consecutive_failures: u32,
    pub cooldown: Duration,
}

impl AlertThresholds {
    /// Target value, then the owner's alert settings, then `defaults`.
    pub fn resolve(
        target: &MonitoredTarget,
        settings: Option<&AlertSettings>,
        defaults: &AlertDefaults,
    ) -> Self {
        let non_negative = |v: &i32| *v >= 0;

        let min_downtime_seconds = target
            .min_downtime_seconds
            .filter(non_negative)
            .or_else(|| settings.and_then(|s| s.default_min_downtime_seconds.filter(non_negative)))
            .map(i64::from)
            .unwrap_or(defaults.min_downtime_seconds);
        let consecutive_failures = target
            .consecutive_failures
            .filter(|v| *v >= 1)
            .or_else(|| settings.and_then(|s| s.default_consecutive_failures.filter(|v| *v >= 1)))
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(defaults.consecutive_failures);
        let cooldown_minutes = target
            .alert_cooldown_minutes
            .filter(non_negative)
            .or_else(|| settings.and_then(|s| s.default_alert_cooldown_minutes.filter(non_negative)))
            .map(i64::from)
            .unwrap_or(defaults.cooldown_minutes);

        Self {
            min_downtime: Duration::seconds(min_downtime_seconds),
            consecutive_failures: consecutive_failures.max(1),
            cooldown: Duration::minutes(cooldown_minutes),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuppressReason {
    NotifyDisabled,
    RecoveryAlertsDisabled,
    IgnoredStatusCode,
    StatusCodeNotSelected,
    AlreadyAnnounced,
    BelowFailureThreshold,
    BelowDowntimeThreshold,
    Cooldown,
    EmailAlertsDisabled,
    NoRecipient,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertDecision {
    Fire(AlertKind),
    /// Nothing alert-worthy happened.
    Quiet,
    /// An alert condition exists but a gate held it back.
    Suppressed(AlertKind, SuppressReason),
}

pub struct AlertInput<'a> {
    pub target: &'a MonitoredTarget,
    pub outcome: &'a ProbeOutcome,
    pub prev_up: Option<bool>,
    /// Tracker state after this probe.
    pub failure: &'a FailureUpdate,
    pub last_alert_at: Option<DateTime<Utc>>,
    pub thresholds: &'a AlertThresholds,
    /// The owner opted in and has a notification address.
    pub has_recipient: bool,
    pub send_recovery_alerts: bool,
    pub now: DateTime<Utc>,
}

impl AlertInput<'_> {
    fn cooldown_expired(&self) -> bool {
        self.last_alert_at
            .map_or(true, |at| self.now - at >= self.thresholds.cooldown)
    }

    /// No alert was sent since the current outage began.
    fn outage_unannounced(&self) -> bool {
        match (self.last_alert_at, self.failure.state.first_failure_at) {
            (Some(alerted), Some(first)) => alerted < first,
            _ => true,
        }
    }

    fn channel_gate(&self, kind: AlertKind) -> AlertDecision {
        if !self.target.email_alerts_enabled {
            AlertDecision::Suppressed(kind, SuppressReason::EmailAlertsDisabled)
        } else if !self.has_recipient {
            AlertDecision::Suppressed(kind, SuppressReason::NoRecipient)
        } else {
            AlertDecision::Fire(kind)
        }
    }
}

pub fn evaluate(input: &AlertInput<'_>) -> AlertDecision {
    if !input.outcome.up {
        evaluate_down(input)
    } else if input.prev_up == Some(false) {
        evaluate_recovery(input)
    } else {
        evaluate_slow_response(input)
    }
}

fn evaluate_down(input: &AlertInput<'_>) -> AlertDecision {
    let kind = AlertKind::Down;
    let target = input.target;
    if !target.notify_on_down {
        return AlertDecision::Suppressed(kind, SuppressReason::NotifyDisabled);
    }
    if let Some(code) = input.outcome.status_code {
        if target.ignore_status_codes.contains(&code) {
            return AlertDecision::Suppressed(kind, SuppressReason::IgnoredStatusCode);
        }
        if !target.alert_on_status_codes.is_empty() && !target.alert_on_status_codes.contains(&code) {
            return AlertDecision::Suppressed(kind, SuppressReason::StatusCodeNotSelected);
        }
    }
    if !input.outage_unannounced() {
        return AlertDecision::Suppressed(kind, SuppressReason::AlreadyAnnounced);
    }
    if input.failure.state.current_failure_count < input.thresholds.consecutive_failures {
        return AlertDecision::Suppressed(kind, SuppressReason::BelowFailureThreshold);
    }
    let downtime = input.failure.downtime.unwrap_or_else(Duration::zero);
    if downtime < input.thresholds.min_downtime {
        return AlertDecision::Suppressed(kind, SuppressReason::BelowDowntimeThreshold);
    }
    if !input.cooldown_expired() {
        return AlertDecision::Suppressed(kind, SuppressReason::Cooldown);
    }
    input.channel_gate(kind)
}

fn evaluate_recovery(input: &AlertInput<'_>) -> AlertDecision {
    let kind = AlertKind::Recovery;
    if !input.target.notify_on_recovery {
        return AlertDecision::Suppressed(kind, SuppressReason::NotifyDisabled);
    }
    if !input.send_recovery_alerts {
        return AlertDecision::Suppressed(kind, SuppressReason::RecoveryAlertsDisabled);
    }
    if !input.cooldown_expired() {
        return AlertDecision::Suppressed(kind, SuppressReason::Cooldown);
    }
    input.channel_gate(kind)
}

fn evaluate_slow_response(input: &AlertInput<'_>) -> AlertDecision {
    let kind = AlertKind::SlowResponse;
    let target = input.target;
    let Some(threshold_ms) = target
        .slow_response_threshold_ms
        .filter(|ms| target.alert_on_slow_response && *ms > 0)
    else {
        return AlertDecision::Quiet;
    };
    if input.outcome.latency_ms < u64::try_from(threshold_ms).unwrap_or(u64::MAX) {
        return AlertDecision::Quiet;
    }
    if !input.cooldown_expired() {
        return AlertDecision::Suppressed(kind, SuppressReason::Cooldown);
    }
    input.channel_gate(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::FailureState;
    use crate::uptime::tracker::{advance, Transition};
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn target() -> MonitoredTarget {
        let mut target = MonitoredTarget::new(1, 1, "api", "https://example.com");
        target.email_alerts_enabled = true;
        target
    }

    fn down(status: Option<u16>) -> ProbeOutcome {
        ProbeOutcome::down(15, status, None)
    }

    struct Case {
        target: MonitoredTarget,
        outcome: ProbeOutcome,
        prev_up: Option<bool>,
        failure: FailureUpdate,
        last_alert_at: Option<DateTime<Utc>>,
        thresholds: AlertThresholds,
        has_recipient: bool,
        send_recovery_alerts: bool,
        now: DateTime<Utc>,
    }

    impl Case {
        fn new(outcome: ProbeOutcome, prev_up: Option<bool>, prior: FailureState, now: DateTime<Utc>) -> Self {
            let failure = advance(&prior, prev_up, outcome.up, now);
            Self {
                target: target(),
                outcome,
                prev_up,
                failure,
                last_alert_at: None,
                thresholds: AlertThresholds::resolve(&target(), None, &AlertDefaults::default()),
                has_recipient: true,
                send_recovery_alerts: true,
                now,
            }
        }

        fn decide(&self) -> AlertDecision {
            evaluate(&AlertInput {
                target: &self.target,
                outcome: &self.outcome,
                prev_up: self.prev_up,
                failure: &self.failure,
                last_alert_at: self.last_alert_at,
                thresholds: &self.thresholds,
                has_recipient: self.has_recipient,
                send_recovery_alerts: self.send_recovery_alerts,
                now: self.now,
            })
        }
    }

    #[test]
    fn thresholds_resolve_target_then_settings_then_defaults() {
        let mut target = target();
        let mut settings = AlertSettings::new(1);
        settings.default_consecutive_failures = Some(4);
        settings.default_alert_cooldown_minutes = Some(30);
        target.alert_cooldown_minutes = Some(5);

        let defaults = AlertDefaults {
            min_downtime_seconds: 60,
            ..Default::default()
        };
        let resolved = AlertThresholds::resolve(&target, Some(&settings), &defaults);
        assert_eq!(resolved.cooldown, Duration::minutes(5));
        assert_eq!(resolved.consecutive_failures, 4);
        assert_eq!(resolved.min_downtime, Duration::seconds(60));

        let builtin = AlertThresholds::resolve(&MonitoredTarget::new(1, 1, "a", "b"), None, &AlertDefaults::default());
        assert_eq!(builtin.min_downtime, Duration::zero());
        assert_eq!(builtin.consecutive_failures, 1);
        assert_eq!(builtin.cooldown, Duration::minutes(15));
    }

    #[test]
    fn first_down_fires_with_default_thresholds() {
        let case = Case::new(down(Some(500)), Some(true), FailureState::default(), t(0));
        assert_eq!(case.failure.transition, Transition::WentDown);
        assert_eq!(case.decide(), AlertDecision::Fire(AlertKind::Down));
    }

    #[test]
    fn consecutive_failure_threshold_delays_the_alert() {
        let mut prior = FailureState::default();
        let mut prev = Some(true);
        let mut decisions = Vec::new();
        for secs in [0, 30, 60] {
            let mut case = Case::new(down(None), prev, prior, t(secs));
            case.target.consecutive_failures = Some(3);
            case.thresholds = AlertThresholds::resolve(&case.target, None, &AlertDefaults::default());
            decisions.push(case.decide());
            prior = case.failure.state;
            prev = Some(false);
        }
        assert_eq!(
            decisions,
            vec![
                AlertDecision::Suppressed(AlertKind::Down, SuppressReason::BelowFailureThreshold),
                AlertDecision::Suppressed(AlertKind::Down, SuppressReason::BelowFailureThreshold),
                AlertDecision::Fire(AlertKind::Down),
            ]
        );
    }

    #[test]
    fn announced_outage_does_not_fire_again() {
        let prior = FailureState {
            current_failure_count: 1,
            first_failure_at: Some(t(0)),
        };
        let mut case = Case::new(down(None), Some(false), prior, t(3600));
        case.last_alert_at = Some(t(0));
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::Down, SuppressReason::AlreadyAnnounced)
        );
        // A failed dispatch left no alert timestamp: retry.
        case.last_alert_at = None;
        assert_eq!(case.decide(), AlertDecision::Fire(AlertKind::Down));
    }

    #[test]
    fn minimum_downtime_gates_down_alerts() {
        let prior = FailureState {
            current_failure_count: 1,
            first_failure_at: Some(t(0)),
        };
        let mut case = Case::new(down(None), Some(false), prior, t(90));
        case.thresholds.min_downtime = Duration::seconds(120);
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::Down, SuppressReason::BelowDowntimeThreshold)
        );
        case.now = t(120);
        case.failure = advance(&prior, Some(false), false, t(120));
        assert_eq!(case.decide(), AlertDecision::Fire(AlertKind::Down));
    }

    #[test]
    fn new_outage_inside_cooldown_is_held_back() {
        let mut case = Case::new(down(None), Some(true), FailureState::default(), t(600));
        case.last_alert_at = Some(t(0));
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::Down, SuppressReason::Cooldown)
        );
    }

    #[test]
    fn status_code_filters() {
        let mut case = Case::new(down(Some(503)), Some(true), FailureState::default(), t(0));
        case.target.ignore_status_codes = vec![503];
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::Down, SuppressReason::IgnoredStatusCode)
        );

        case.target.ignore_status_codes.clear();
        case.target.alert_on_status_codes = vec![500];
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::Down, SuppressReason::StatusCodeNotSelected)
        );

        // Transport errors carry no status code and are not restricted.
        case.outcome = ProbeOutcome::down(10_000, None, Some("Request timed out".into()));
        assert_eq!(case.decide(), AlertDecision::Fire(AlertKind::Down));
    }

    #[test]
    fn recovery_ignores_failure_thresholds() {
        let prior = FailureState {
            current_failure_count: 1,
            first_failure_at: Some(t(0)),
        };
        let mut case = Case::new(ProbeOutcome::up(20, 200), Some(false), prior, t(1200));
        case.target.consecutive_failures = Some(3);
        case.thresholds = AlertThresholds::resolve(&case.target, None, &AlertDefaults::default());
        assert_eq!(case.decide(), AlertDecision::Fire(AlertKind::Recovery));

        case.last_alert_at = Some(t(600));
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::Recovery, SuppressReason::Cooldown)
        );

        case.last_alert_at = None;
        case.send_recovery_alerts = false;
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::Recovery, SuppressReason::RecoveryAlertsDisabled)
        );
    }

    #[test]
    fn up_without_prior_down_is_quiet() {
        assert_eq!(
            Case::new(ProbeOutcome::up(20, 200), Some(true), FailureState::default(), t(0)).decide(),
            AlertDecision::Quiet
        );
        assert_eq!(
            Case::new(ProbeOutcome::up(20, 200), None, FailureState::default(), t(0)).decide(),
            AlertDecision::Quiet
        );
    }

    #[test]
    fn channel_gates_suppress_silently() {
        let mut case = Case::new(down(None), Some(true), FailureState::default(), t(0));
        case.has_recipient = false;
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::Down, SuppressReason::NoRecipient)
        );
        case.target.email_alerts_enabled = false;
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::Down, SuppressReason::EmailAlertsDisabled)
        );
        case.target.notify_on_down = false;
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::Down, SuppressReason::NotifyDisabled)
        );
    }

    #[test]
    fn slow_response_alerts() {
        let mut case = Case::new(ProbeOutcome::up(900, 200), Some(true), FailureState::default(), t(0));
        assert_eq!(case.decide(), AlertDecision::Quiet);

        case.target.alert_on_slow_response = true;
        case.target.slow_response_threshold_ms = Some(1000);
        assert_eq!(case.decide(), AlertDecision::Quiet);

        case.outcome = ProbeOutcome::up(1000, 200);
        assert_eq!(case.decide(), AlertDecision::Fire(AlertKind::SlowResponse));

        case.last_alert_at = Some(t(-60));
        assert_eq!(
            case.decide(),
            AlertDecision::Suppressed(AlertKind::SlowResponse, SuppressReason::Cooldown)
        );
    }
}
