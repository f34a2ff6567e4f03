//! Multi-signal priority scoring.
//!
//! A score is the sum of five weighted components, each in `[0, 1]` before
//! weighting:
//! - Priority label (urgent > high > medium > low > none)
//! - Due-date proximity (overdue = 1, 14+ days out = 0)
//! - Effort (shorter items score higher, 8h+ = 0)
//! - Habit streak risk
//! - Meeting cadence pressure
//!
//! Every score carries a breakdown and a human-readable explanation so that a
//! ranking can be audited after the fact.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::SchedulableItem;

/// Days out at which the due component reaches zero.
pub const DUE_HORIZON_DAYS: f64 = 14.0;

/// Hours at which the effort component reaches zero.
pub const EFFORT_HORIZON_HOURS: f64 = 8.0;

/// User-assigned priority label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLabel {
    Urgent,
    High,
    Medium,
    Low,
    /// Explicit "none". Scores a small floor above a missing label.
    #[serde(rename = "none")]
    Unprioritized,
}

impl PriorityLabel {
    /// Numeric weight of the label in `[0, 1]`.
    pub fn weight(&self) -> f64 {
        match self {
            PriorityLabel::Urgent => 1.0,
            PriorityLabel::High => 0.75,
            PriorityLabel::Medium => 0.5,
            PriorityLabel::Low => 0.25,
            PriorityLabel::Unprioritized => 0.05,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLabel::Urgent => "urgent",
            PriorityLabel::High => "high",
            PriorityLabel::Medium => "medium",
            PriorityLabel::Low => "low",
            PriorityLabel::Unprioritized => "none",
        }
    }
}

impl std::fmt::Display for PriorityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PriorityLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "urgent" => Ok(Self::Urgent),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "none" => Ok(Self::Unprioritized),
            _ => Err(format!("Unknown priority label: {}", s)),
        }
    }
}

/// Per-signal weights. Each is applied to a component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    #[serde(default = "default_priority_weight")]
    pub priority: f64,
    #[serde(default = "default_due_weight")]
    pub due: f64,
    #[serde(default = "default_effort_weight")]
    pub effort: f64,
    #[serde(default = "default_streak_weight")]
    pub streak: f64,
    #[serde(default = "default_cadence_weight")]
    pub cadence: f64,
}

fn default_priority_weight() -> f64 {
    0.35
}
fn default_due_weight() -> f64 {
    0.30
}
fn default_effort_weight() -> f64 {
    0.15
}
fn default_streak_weight() -> f64 {
    0.10
}
fn default_cadence_weight() -> f64 {
    0.10
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            priority: default_priority_weight(),
            due: default_due_weight(),
            effort: default_effort_weight(),
            streak: default_streak_weight(),
            cadence: default_cadence_weight(),
        }
    }
}

/// Inputs to the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritySignals {
    pub priority_label: Option<PriorityLabel>,
    pub due_date: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    /// Risk of breaking a habit streak, expected in `[0, 1]`
    #[serde(default)]
    pub streak_risk: f64,
    /// How overdue a recurring meeting is relative to its cadence, expected in `[0, 1]`
    #[serde(default)]
    pub meeting_cadence: f64,
}

impl PrioritySignals {
    pub fn new(priority_label: Option<PriorityLabel>, duration_minutes: i64) -> Self {
        Self {
            priority_label,
            due_date: None,
            duration_minutes,
            streak_risk: 0.0,
            meeting_cadence: 0.0,
        }
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_streak_risk(mut self, streak_risk: f64) -> Self {
        self.streak_risk = streak_risk;
        self
    }

    pub fn with_meeting_cadence(mut self, meeting_cadence: f64) -> Self {
        self.meeting_cadence = meeting_cadence;
        self
    }
}

/// Weighted components of a score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub priority: f64,
    pub due: f64,
    pub effort: f64,
    pub streak: f64,
    pub cadence: f64,
}

impl ScoreBreakdown {
    /// Sum of the components, rounded to two decimals.
    pub fn total(&self) -> f64 {
        round2(self.priority + self.due + self.effort + self.streak + self.cadence)
    }
}

/// A score with its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityScore {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub explanation: String,
}

/// A candidate for ranking: the item plus the signals it is scored on.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub item: SchedulableItem,
    pub signals: PrioritySignals,
}

/// A ranked item. `item.priority` holds the rank (0 = most urgent).
#[derive(Debug, Clone)]
pub struct RankedItem {
    pub item: SchedulableItem,
    pub score: PriorityScore,
}

/// Priority scorer.
#[derive(Debug, Clone)]
pub struct PriorityScorer {
    weights: PriorityWeights,
    now: DateTime<Utc>,
}

impl PriorityScorer {
    /// Create a scorer with default weights, evaluated at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            weights: PriorityWeights::default(),
            now,
        }
    }

    /// Create with custom weights
    pub fn with_weights(weights: PriorityWeights, now: DateTime<Utc>) -> Self {
        Self { weights, now }
    }

    pub fn weights(&self) -> &PriorityWeights {
        &self.weights
    }

    /// Score one item. Never fails: out-of-range signals saturate.
    pub fn score(&self, signals: &PrioritySignals) -> PriorityScore {
        let label_weight = signals.priority_label.map(|l| l.weight()).unwrap_or(0.0);
        let due = self.due_component(signals.due_date);
        let effort = effort_component(signals.duration_minutes);
        let streak = clamp01(signals.streak_risk);
        let cadence = clamp01(signals.meeting_cadence);

        let breakdown = ScoreBreakdown {
            priority: label_weight * self.weights.priority,
            due: due * self.weights.due,
            effort: effort * self.weights.effort,
            streak: streak * self.weights.streak,
            cadence: cadence * self.weights.cadence,
        };
        let score = breakdown.total();

        let label = signals
            .priority_label
            .map(|l| l.as_str())
            .unwrap_or("unset");
        let explanation = format!(
            "priority {:.2} ({} x {:.2}) + due {:.2} ({:.2} x {:.2}) + effort {:.2} ({}m, {:.2} x {:.2}) \
             + streak {:.2} ({:.2} x {:.2}) + cadence {:.2} ({:.2} x {:.2}) = {:.2}",
            breakdown.priority,
            label,
            self.weights.priority,
            breakdown.due,
            due,
            self.weights.due,
            breakdown.effort,
            signals.duration_minutes.max(0),
            effort,
            self.weights.effort,
            breakdown.streak,
            streak,
            self.weights.streak,
            breakdown.cadence,
            cadence,
            self.weights.cadence,
            score,
        );

        PriorityScore {
            score,
            breakdown,
            explanation,
        }
    }

    /// Score and rank candidates, highest score first.
    ///
    /// Equal scores keep their input order. Each returned item's `priority`
    /// is overwritten with its rank.
    pub fn rank(&self, candidates: Vec<Candidate>) -> Vec<RankedItem> {
        let mut scored: Vec<RankedItem> = candidates
            .into_iter()
            .map(|c| RankedItem {
                score: self.score(&c.signals),
                item: c.item,
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.score.score.total_cmp(&a.score.score));

        for (rank, ranked) in scored.iter_mut().enumerate() {
            ranked.item.priority = rank as i32;
        }
        scored
    }

    /// 0 without due date, 1 when overdue, linear between 14 days out and now.
    fn due_component(&self, due_date: Option<DateTime<Utc>>) -> f64 {
        let Some(due) = due_date else {
            return 0.0;
        };
        let remaining = due.signed_duration_since(self.now);
        if remaining <= Duration::zero() {
            return 1.0;
        }
        let days = remaining.num_seconds() as f64 / 86_400.0;
        clamp01(1.0 - days / DUE_HORIZON_DAYS)
    }
}

fn effort_component(duration_minutes: i64) -> f64 {
    if duration_minutes <= 0 {
        return 1.0;
    }
    let hours = duration_minutes as f64 / 60.0;
    clamp01(1.0 - hours / EFFORT_HORIZON_HOURS)
}

/// Clamp to `[0, 1]`. NaN saturates to 0.
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ItemType;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
    }

    fn scorer() -> PriorityScorer {
        PriorityScorer::new(now())
    }

    #[test]
    fn test_label_ordering() {
        let s = scorer();
        let score = |label| s.score(&PrioritySignals::new(label, 60)).score;

        assert!(score(Some(PriorityLabel::Urgent)) > score(Some(PriorityLabel::High)));
        assert!(score(Some(PriorityLabel::High)) > score(Some(PriorityLabel::Medium)));
        assert!(score(Some(PriorityLabel::Medium)) > score(Some(PriorityLabel::Low)));
        assert!(score(Some(PriorityLabel::Low)) > score(Some(PriorityLabel::Unprioritized)));
        assert!(score(Some(PriorityLabel::Unprioritized)) > score(None));
    }

    #[test]
    fn test_due_component() {
        let s = scorer();
        let due = |d| s.score(&PrioritySignals::new(None, 60).with_due_date(d)).breakdown.due;

        assert_eq!(due(now() - Duration::hours(1)), 0.30, "overdue is maximum");
        assert_eq!(due(now()), 0.30, "due now is maximum");
        assert_eq!(due(now() + Duration::days(14)), 0.0);
        assert_eq!(due(now() + Duration::days(30)), 0.0);
        assert!((due(now() + Duration::days(7)) - 0.15).abs() < 1e-9);
        assert_eq!(s.score(&PrioritySignals::new(None, 60)).breakdown.due, 0.0);
    }

    #[test]
    fn test_effort_component() {
        let s = scorer();
        let effort = |m| s.score(&PrioritySignals::new(None, m)).breakdown.effort;

        assert_eq!(effort(0), 0.15, "zero duration is a quick win");
        assert!((effort(240) - 0.075).abs() < 1e-9);
        assert_eq!(effort(480), 0.0);
        assert_eq!(effort(600), 0.0);
        assert!(effort(15) > effort(90));
    }

    #[test]
    fn test_signals_clamp() {
        let s = scorer();
        let base = PrioritySignals::new(Some(PriorityLabel::Medium), 30);

        let high = s.score(&base.clone().with_streak_risk(1.0).with_meeting_cadence(1.0));
        let over = s.score(&base.clone().with_streak_risk(7.5).with_meeting_cadence(2.0));
        assert_eq!(high.score, over.score);

        let zero = s.score(&base.clone());
        let under = s.score(&base.clone().with_streak_risk(-3.0).with_meeting_cadence(f64::NAN));
        assert_eq!(zero.score, under.score);
    }

    #[test]
    fn test_score_rounded_to_two_decimals() {
        let s = scorer();
        let score = s
            .score(
                &PrioritySignals::new(Some(PriorityLabel::High), 37)
                    .with_due_date(now() + Duration::hours(50))
                    .with_streak_risk(0.333),
            )
            .score;
        assert_eq!(score, (score * 100.0).round() / 100.0);
    }

    #[test]
    fn test_explanation_lists_every_component() {
        let result = scorer().score(
            &PrioritySignals::new(Some(PriorityLabel::Urgent), 30)
                .with_due_date(now() + Duration::days(1)),
        );
        for part in ["priority", "due", "effort", "streak", "cadence", "urgent"] {
            assert!(
                result.explanation.contains(part),
                "explanation missing {part}: {}",
                result.explanation
            );
        }
        assert!(result.explanation.ends_with(&format!("= {:.2}", result.score)));
    }

    #[test]
    fn test_custom_weights() {
        let weights = PriorityWeights {
            priority: 0.0,
            due: 0.0,
            effort: 0.0,
            streak: 2.0,
            cadence: 0.0,
        };
        let s = PriorityScorer::with_weights(weights, now());
        let score = s.score(&PrioritySignals::new(Some(PriorityLabel::Urgent), 10).with_streak_risk(0.5));
        assert_eq!(score.score, 1.0);
    }

    #[test]
    fn test_rank_orders_by_score_and_is_stable() {
        let item = |id: &str| SchedulableItem::new(id, ItemType::Task, id, 30);
        let candidates = vec![
            Candidate {
                item: item("low"),
                signals: PrioritySignals::new(Some(PriorityLabel::Low), 30),
            },
            Candidate {
                item: item("urgent"),
                signals: PrioritySignals::new(Some(PriorityLabel::Urgent), 30),
            },
            Candidate {
                item: item("low-twin"),
                signals: PrioritySignals::new(Some(PriorityLabel::Low), 30),
            },
        ];

        let ranked = scorer().rank(candidates);
        let ids: Vec<_> = ranked.iter().map(|r| r.item.id.as_str()).collect();
        assert_eq!(ids, vec!["urgent", "low", "low-twin"]);
        let ranks: Vec<_> = ranked.iter().map(|r| r.item.priority).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
    }
}
