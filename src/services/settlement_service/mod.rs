pub mod data_layer;
pub mod error;
pub mod models;
pub mod settings;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use log::{debug, error, info, warn};
use rand::{thread_rng, Rng};

use crate::calendar::today_in;
use crate::models::combat_models::{CombatInstance, CombatantState, StatusEffect};

use self::data_layer::SettlementDataLayer;
use self::error::{Result, SettlementServiceError};
use self::models::{
    InstanceReport, NarrativeRecord, PendingSubmission, SettledLine, SettledOutcome, SettlementReport, UserSettlement,
};
use self::settings::SettlementSettings;

use super::boss_service::BossService;
use super::effects_service::{
    boosted_xp, combo_multiplier, incoming_damage, outgoing_damage, prune_expired, resolve_effects, ComboMultiplier,
};
use super::narration_service::models::{CombatantSnapshot, DaySummary, NarrativeInput, PlayerDay, QuestLine};
use super::narration_service::{Narrator, TemplateNarrator};
use super::scoring_service::models::{CombatantContext, Outcome, Quality};
use super::scoring_service::ScoringService;
use super::tournament_service::TournamentService;

///
/// The daily batch that turns pending submissions into damage, experience
/// and narratives
///
#[async_trait]
pub trait SettlementService: Send + Sync {
    ///
    /// Settles every active combat instance for `date` (default: yesterday in
    /// the game timezone), along with any earlier day whose submissions are
    /// still unsettled. Safe to re-run: only still-unsettled submissions
    /// are processed. A fault in one instance does not stop the others.
    ///
    async fn run(&self, date: Option<NaiveDate>) -> Result<SettlementReport>;
    ///
    /// Lists the latest narratives of an instance the user takes part in
    ///
    async fn narratives(&self, user_id: i64, instance_id: i64) -> Result<Vec<NarrativeRecord>>;
    ///
    /// Restores an instance to its starting state, discarding its submissions
    ///
    async fn reset_instance(&self, instance_id: i64) -> Result<()>;
}

///
/// What one user achieved on the settled day, after every modifier
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTally {
    ///
    /// Quests the user reported as completed, whatever their grade
    ///
    pub completed: usize,
    pub combo: ComboMultiplier,
    pub damage: i64,
    pub xp: i64,
    pub critical_hits: usize,
}

///
/// Sums a user's outcomes for the day, then applies the combo bonus and the
/// effects active on both sides. The combo counts `completed` quests, while
/// only outcomes above the failed tier add damage and experience. Effects
/// produced by these outcomes are not part of `attacker`/`defender` and only
/// count from the next day.
///
pub fn tally_day(
    outcomes: &[Outcome],
    completed: usize,
    attacker: &[StatusEffect],
    defender: &[StatusEffect],
) -> DayTally {
    let landed: Vec<&Outcome> = outcomes.iter().filter(|o| o.quality != Quality::Failed).collect();
    let base_damage: i64 = landed.iter().map(|o| o.damage).sum();
    let base_xp: i64 = landed.iter().map(|o| o.xp).sum();

    let combo = combo_multiplier(completed, attacker);
    let damage = outgoing_damage(base_damage + combo.bonus(base_damage), attacker);

    DayTally {
        completed,
        combo,
        damage: incoming_damage(damage, defender),
        xp: boosted_xp(base_xp + combo.bonus(base_xp), attacker),
        critical_hits: outcomes.iter().filter(|o| o.is_critical).count(),
    }
}

fn next_streak(streak: i64, tally: &DayTally) -> i64 {
    if tally.completed > 0 { streak + 1 } else { (streak - 1).max(0) }
}

///
/// Clears the in-process run flag however the run ends
///
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CoreSettlementService {
    data_layer: Arc<dyn SettlementDataLayer>,
    scoring: Arc<dyn ScoringService>,
    narrator: Arc<dyn Narrator>,
    tournament: Arc<dyn TournamentService>,
    boss: Arc<dyn BossService>,
    settings: SettlementSettings,
    running: AtomicBool,
}

impl CoreSettlementService {
    pub fn new(
        data_layer: Arc<dyn SettlementDataLayer>,
        scoring: Arc<dyn ScoringService>,
        narrator: Arc<dyn Narrator>,
        tournament: Arc<dyn TournamentService>,
        boss: Arc<dyn BossService>,
        settings: SettlementSettings,
    ) -> Self {
        Self { data_layer, scoring, narrator, tournament, boss, settings, running: AtomicBool::new(false) }
    }

    ///
    /// Yesterday, in the game timezone
    ///
    pub fn default_date(&self) -> NaiveDate {
        today_in(self.settings.game_tz()) - Duration::days(1)
    }
}

#[async_trait]
impl SettlementService for CoreSettlementService {
    async fn run(&self, date: Option<NaiveDate>) -> Result<SettlementReport> {
        if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            warn!("Settlement requested while a run is already in progress");
            return Err(SettlementServiceError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let date = date.unwrap_or_else(|| self.default_date());

        // An unreachable store aborts the whole run
        self.data_layer.ping().await?;

        let holder = format!("{}-{:016x}", std::process::id(), thread_rng().gen::<u64>());
        let now = Utc::now().naive_utc();
        if !self.data_layer.try_acquire_lock(&holder, now, now - self.settings.lock_stale_after()).await? {
            warn!("Settlement lock for {date} is held by another runner");
            return Err(SettlementServiceError::LockHeld);
        }

        info!("Settling {date} (lock holder {holder})");
        let report = self.settle_all(date).await;

        if let Err(e) = self.data_layer.release_lock(&holder).await {
            error!("Failed to release settlement lock {holder}: {:?}", e);
        }
        report
    }

    async fn narratives(&self, user_id: i64, instance_id: i64) -> Result<Vec<NarrativeRecord>> {
        let instance = self.data_layer.get_instance(instance_id).await?
            .ok_or(SettlementServiceError::InstanceNotFound(instance_id))?;
        if !instance.is_participant(user_id) {
            return Err(SettlementServiceError::NotParticipant(instance_id));
        }
        Ok(self.data_layer.get_narratives(instance_id).await?)
    }

    async fn reset_instance(&self, instance_id: i64) -> Result<()> {
        if !self.data_layer.reset_instance(instance_id).await? {
            return Err(SettlementServiceError::InstanceNotFound(instance_id));
        }
        info!("Combat instance {instance_id} was reset");
        Ok(())
    }
}

impl CoreSettlementService {
    async fn settle_all(&self, date: NaiveDate) -> Result<SettlementReport> {
        let instances = self.data_layer.get_active_instances().await?;
        let mut report = SettlementReport::new(date);

        for instance in &instances {
            match self.settle_instance(instance, date).await {
                Ok(instance_report) => report.record(&instance_report),
                Err(e) => {
                    report.instances_failed += 1;
                    error!("Settlement of instance {} for {date} failed: {:?}", instance.id, e);
                }
            }
        }

        match self.boss.status(date).await {
            Ok(boss) => report.boss = Some(boss),
            Err(e) => error!("Boss recompute for {date} failed: {:?}", e),
        }

        info!(
            "Settled {date}: {} instance(s), {} failed, {} submission(s), {} narrative(s), {} completed",
            report.instances_processed, report.instances_failed, report.submissions_settled,
            report.narratives_created, report.instances_completed
        );
        Ok(report)
    }

    ///
    /// Settles every day of the instance that still has pending submissions,
    /// oldest first, then `date` itself. A day left pending by a faulted run
    /// is picked up here once ingestion has moved past it.
    ///
    async fn settle_instance(&self, instance: &CombatInstance, date: NaiveDate) -> Result<InstanceReport> {
        let mut days: BTreeMap<NaiveDate, Vec<PendingSubmission>> = BTreeMap::new();
        for p in self.data_layer.get_pending_submissions(instance.id, date).await? {
            days.entry(p.submission.date).or_default().push(p);
        }
        days.entry(date).or_default();

        let mut report = InstanceReport { instance_id: instance.id, ..Default::default() };
        for (day, pending) in &days {
            if *day < date {
                info!("Instance {}: settling {} leftover submission(s) from {day}", instance.id, pending.len());
            }
            self.settle_day(instance, *day, pending, &mut report).await?;
            if report.completed {
                break;
            }
        }

        self.data_layer.mark_settled_through(instance.id, date).await?;
        Ok(report)
    }

    async fn settle_day(
        &self,
        instance: &CombatInstance,
        date: NaiveDate,
        pending: &[PendingSubmission],
        report: &mut InstanceReport,
    ) -> Result<()> {
        let mut before = HashMap::new();
        for user_id in instance.participants() {
            before.insert(user_id, self.data_layer.get_combatant(instance.id, user_id).await?);
        }

        let mut tallies = HashMap::new();

        for user_id in instance.participants() {
            let mine: Vec<&PendingSubmission> = pending.iter().filter(|p| p.submission.user_id == user_id).collect();
            if mine.is_empty() {
                // Absent: stale effects go and the streak decays
                self.data_layer.prune_effects(instance.id, user_id, date).await?;
                if self.data_layer.decay_absent_streak(instance.id, user_id, date).await? {
                    debug!("Instance {}: user {user_id} was absent on {date}, streak decayed", instance.id);
                }
                continue;
            }

            let opponent_id = if user_id == instance.user_a { instance.user_b } else { instance.user_a };
            let (settlement, tally) = self.settle_user(date, &before[&user_id], &before[&opponent_id], opponent_id, &mine).await;

            if self.data_layer.commit_user(&settlement).await? {
                debug!(
                    "Instance {}: user {} dealt {} damage, gained {} XP ({} submission(s))",
                    instance.id, user_id, tally.damage, tally.xp, settlement.outcomes.len()
                );
                report.submissions_settled += settlement.outcomes.len();
                tallies.insert(user_id, tally);
            } else {
                warn!("Submissions of user {user_id} in instance {} were settled by another runner", instance.id);
            }
        }

        let lines = self.data_layer.get_settled_lines(instance.id, date).await?;
        if !lines.is_empty() && !self.data_layer.has_narrative(instance.id, date).await? {
            let mut after = HashMap::new();
            for user_id in instance.participants() {
                after.insert(user_id, self.data_layer.get_combatant(instance.id, user_id).await?);
            }

            let input = NarrativeInput::DailyBattle(build_summary(instance, date, &before, &after, &tallies, &lines));
            let (body, fallback) = match self.narrator.summarize(&input).await {
                Ok(text) => (text, false),
                Err(e) => {
                    warn!("Narration failed for instance {} on {date}: {e}. Using template", instance.id);
                    (TemplateNarrator.render(&input), true)
                }
            };
            if self.data_layer.insert_narrative(instance.id, date, &body, fallback).await? {
                report.narratives_created += 1;
            }
        }

        report.completed = self.data_layer.complete_instance(instance.id).await?;
        if report.completed {
            info!("Combat instance {} completed on {date}", instance.id);
        }

        self.data_layer.mark_settled_through(instance.id, date).await?;

        if date.weekday() == Weekday::Sun {
            match self.tournament.resolve_week(instance, date).await {
                Ok(Some(_)) => report.weekly_results_created += 1,
                Ok(None) => {}
                Err(e) => error!("Weekly resolution for instance {} failed: {:?}", instance.id, e),
            }
        }

        Ok(())
    }

    async fn settle_user(
        &self,
        date: NaiveDate,
        state: &CombatantState,
        opponent: &CombatantState,
        opponent_id: i64,
        mine: &[&PendingSubmission],
    ) -> (UserSettlement, DayTally) {
        let active = prune_expired(state.effects.clone(), date);
        let opponent_active = prune_expired(opponent.effects.clone(), date);

        let ctx = CombatantContext { streak: state.streak, hp: state.hp, max_hp: state.max_hp, effects: active.clone() };

        let mut outcomes = Vec::with_capacity(mine.len());
        for p in mine {
            outcomes.push(self.scoring.evaluate(&p.quest, &p.submission, &ctx).await);
        }

        let completed = mine.iter().filter(|p| p.submission.completed).count();
        let tally = tally_day(&outcomes, completed, &active, &opponent_active);
        let produced: Vec<_> = outcomes.iter().flat_map(|o| o.effects.iter().cloned()).collect();

        let settlement = UserSettlement {
            instance_id: state.instance_id,
            user_id: state.user_id,
            opponent_id,
            date,
            outcomes: mine
                .iter()
                .zip(outcomes)
                .map(|(p, outcome)| SettledOutcome {
                    submission_id: p.submission.id,
                    outcome: Outcome { multiplier: tally.combo.as_f64(), ..outcome },
                })
                .collect(),
            xp_gained: tally.xp,
            damage_to_opponent: tally.damage,
            streak: next_streak(state.streak, &tally),
            effects: resolve_effects(active, &produced, date),
            settled_at: Utc::now().naive_utc(),
        };

        (settlement, tally)
    }
}

///
/// Assembles the narrative input of a settled day. Users settled by an
/// earlier, interrupted run are summarized from their stored outcomes.
///
fn build_summary(
    instance: &CombatInstance,
    date: NaiveDate,
    before: &HashMap<i64, CombatantState>,
    after: &HashMap<i64, CombatantState>,
    tallies: &HashMap<i64, DayTally>,
    lines: &[SettledLine],
) -> DaySummary {
    let players: Vec<PlayerDay> = instance
        .participants()
        .iter()
        .filter_map(|user_id| {
            let (before, after) = (before.get(user_id)?, after.get(user_id)?);
            let own: Vec<&SettledLine> = lines.iter().filter(|l| l.user_id == *user_id).collect();

            let (damage_dealt, xp_gained, critical_hits, multiplier) = match tallies.get(user_id) {
                Some(t) => (t.damage, t.xp, t.critical_hits, t.combo.as_f64()),
                None => (
                    own.iter().filter(|l| l.quality != Quality::Failed.as_str()).map(|l| l.damage_dealt).sum(),
                    own.iter().filter(|l| l.quality != Quality::Failed.as_str()).map(|l| l.xp_gained).sum(),
                    own.iter().filter(|l| l.is_critical).count(),
                    ComboMultiplier::NONE.as_f64(),
                ),
            };

            Some(PlayerDay {
                user_id: *user_id,
                submitted: !own.is_empty() || tallies.contains_key(user_id),
                damage_dealt,
                xp_gained,
                critical_hits,
                multiplier,
                before: CombatantSnapshot::from(before),
                after: CombatantSnapshot::from(after),
            })
        })
        .collect();

    let winner_id = match players.as_slice() {
        [a, b] if a.damage_dealt > b.damage_dealt => Some(a.user_id),
        [a, b] if b.damage_dealt > a.damage_dealt => Some(b.user_id),
        _ => None,
    };

    DaySummary {
        instance_id: instance.id,
        date,
        both_submitted: players.iter().all(|p| p.submitted),
        winner_id,
        quests: lines
            .iter()
            .map(|l| QuestLine {
                user_id: l.user_id,
                quest_title: l.quest_title.clone(),
                completed: l.completed,
                quality: Quality::parse(&l.quality).unwrap_or(Quality::Failed),
                damage: l.damage_dealt,
                xp: l.xp_gained,
                is_critical: l.is_critical,
            })
            .collect(),
        players,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::combat_models::{CombatStatus, EffectKind, Polarity};

    fn outcome(quality: Quality, damage: i64, xp: i64) -> Outcome {
        Outcome { quality, damage, xp, is_critical: false, effects: vec![], multiplier: 1.0, used_fallback: false }
    }

    fn effect(kind: EffectKind) -> StatusEffect {
        StatusEffect {
            name: "fx".to_string(), polarity: Polarity::Debuff, kind,
            expires_on: NaiveDate::from_ymd_opt(2024, 5, 16).unwrap(),
        }
    }

    fn combatant(user_id: i64, hp: i64) -> CombatantState {
        CombatantState {
            instance_id: 1, user_id, hp, max_hp: 100, xp: 0, level: 1, streak: 0,
            effects: vec![], total_damage_dealt: 0, last_action_on: None,
        }
    }

    #[test]
    fn three_quests_earn_the_full_combo() {
        let outcomes = [
            outcome(Quality::Average, 10, 10),
            outcome(Quality::Average, 10, 10),
            outcome(Quality::Average, 10, 10),
        ];
        let tally = tally_day(&outcomes, 3, &[], &[]);
        assert_eq!(tally.combo, ComboMultiplier(150));
        assert_eq!(tally.damage, 45);
        assert_eq!(tally.xp, 45);
    }

    #[test]
    fn failed_outcomes_contribute_nothing() {
        let outcomes = [outcome(Quality::Good, 15, 20), outcome(Quality::Failed, 0, 0)];
        let tally = tally_day(&outcomes, 1, &[], &[]);
        assert_eq!(tally.combo, ComboMultiplier::NONE);
        assert_eq!(tally.damage, 15);
        assert_eq!(next_streak(3, &tally), 4);
    }

    #[test]
    fn completed_quest_graded_failed_still_counts_toward_combo() {
        let outcomes = [
            outcome(Quality::Good, 15, 20),
            outcome(Quality::Good, 15, 20),
            outcome(Quality::Failed, 0, 0),
        ];
        let tally = tally_day(&outcomes, 3, &[], &[]);
        assert_eq!(tally.combo, ComboMultiplier(150));
        // 30 + 15 combo bonus; the failed grade adds no damage of its own
        assert_eq!(tally.damage, 45);
        assert_eq!(tally.xp, 60);

        let all_failed = tally_day(&[outcome(Quality::Failed, 0, 0)], 1, &[], &[]);
        assert_eq!(all_failed.damage, 0);
        assert_eq!(next_streak(2, &all_failed), 3);
    }

    #[test]
    fn combo_block_and_damage_modifiers_apply() {
        let outcomes = [outcome(Quality::Average, 10, 10), outcome(Quality::Average, 10, 10)];

        let blocked = tally_day(&outcomes, 2, &[effect(EffectKind::ComboBlock)], &[]);
        assert_eq!(blocked.damage, 20);

        let drowsy = tally_day(&outcomes, 2, &[effect(EffectKind::DamageDealt { percent: -25 })], &[]);
        // 20 + 4 combo bonus, then -25%
        assert_eq!(drowsy.damage, 18);

        let exposed = tally_day(&outcomes, 2, &[], &[effect(EffectKind::DamageTaken { percent: 25 })]);
        assert_eq!(exposed.damage, 30);
    }

    #[test]
    fn streak_decays_toward_zero() {
        let idle = tally_day(&[outcome(Quality::Failed, 0, 0)], 0, &[], &[]);
        assert_eq!(next_streak(2, &idle), 1);
        assert_eq!(next_streak(0, &idle), 0);
    }

    #[test]
    fn tied_damage_has_no_daily_winner() {
        let instance = CombatInstance { id: 1, user_a: 1, user_b: 2, status: CombatStatus::Active, last_settled_on: None };
        let date = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let states: HashMap<i64, CombatantState> = [(1, combatant(1, 90)), (2, combatant(2, 90))].into();
        let tally = tally_day(&[outcome(Quality::Average, 10, 10)], 1, &[], &[]);
        let tallies: HashMap<i64, DayTally> = [(1, tally), (2, tally)].into();

        let summary = build_summary(&instance, date, &states, &states, &tallies, &[]);
        assert_eq!(summary.winner_id, None);

        let only_one: HashMap<i64, DayTally> = [(1, tally)].into();
        let summary = build_summary(&instance, date, &states, &states, &only_one, &[]);
        assert_eq!(summary.winner_id, Some(1));
        assert!(!summary.both_submitted);
    }
}
