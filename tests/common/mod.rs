#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use quest_duel::{
    ai::DisabledLlmClient,
    bootstrap::Services,
    resources::game_resources::{BaseValues, BossTemplate, DifficultyTable, Resources},
    services::{
        scoring_service::settings::ScoringSettings,
        settlement_service::settings::SettlementSettings,
        submission_service::{
            models::{QuestEntry, SubmissionRequest, SubmissionResponse},
            SubmissionService,
        },
    },
};

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;

pub fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

///
/// A single-connection in-memory database, so every query sees the same data
///
pub async fn pool() -> SqlitePool {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&db).await.unwrap();
    db
}

pub fn resources(boss_hp: i64) -> Arc<Resources> {
    Arc::new(Resources {
        bosses: vec![BossTemplate {
            name: "The Procrastination Hydra".to_string(),
            max_hp: boss_hp,
            reward: "Hydra Slayer badge".to_string(),
            xp_bonus: 100,
        }],
        difficulty_table: DifficultyTable {
            light: BaseValues { damage: 10, xp: 10 },
            medium: BaseValues { damage: 15, xp: 20 },
            heavy: BaseValues { damage: 25, xp: 35 },
        },
    })
}

///
/// Every service over `db`, with the language model disabled so scoring and
/// narration are deterministic
///
pub fn services(db: &SqlitePool) -> Services {
    Services::build(
        db.clone(),
        resources(1000),
        Arc::new(DisabledLlmClient),
        ScoringSettings { crit_chance: 0.0 },
        SettlementSettings::default(),
    )
}

pub async fn create_instance(db: &SqlitePool, user_a: i64, user_b: i64) -> i64 {
    sqlx::query("INSERT INTO combat_instances (user_a, user_b) VALUES (?, ?)")
        .bind(user_a)
        .bind(user_b)
        .execute(db)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn create_quest(db: &SqlitePool, user_id: i64, title: &str, quest_type: &str, recurrence: &str, difficulty: &str) -> i64 {
    sqlx::query("INSERT INTO quests (user_id, title, quest_type, recurrence, difficulty) VALUES (?, ?, ?, ?, ?)")
        .bind(user_id)
        .bind(title)
        .bind(quest_type)
        .bind(recurrence)
        .bind(difficulty)
        .execute(db)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn submit(
    services: &Services,
    user_id: i64,
    instance_id: i64,
    date: NaiveDate,
    quests: &[(i64, bool)],
) -> SubmissionResponse {
    let request = SubmissionRequest {
        instance_id,
        date: Some(date),
        quests: quests.iter().map(|&(quest_id, completed)| QuestEntry { quest_id, completed, value: None }).collect(),
    };
    services.submission_service.submit(user_id, request).await.unwrap()
}

#[derive(Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct CombatantRow {
    pub hp: i64,
    pub xp: i64,
    pub level: i64,
    pub streak: i64,
    pub total_damage_dealt: i64,
}

pub async fn combatant(db: &SqlitePool, instance_id: i64, user_id: i64) -> CombatantRow {
    sqlx::query_as::<_, CombatantRow>(
        "SELECT hp, xp, level, streak, total_damage_dealt FROM combatants WHERE instance_id = ? AND user_id = ?",
    )
    .bind(instance_id)
    .bind(user_id)
    .fetch_one(db)
    .await
    .unwrap()
}

pub async fn count(db: &SqlitePool, table: &str, instance_id: i64) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table} WHERE instance_id = ?"))
        .bind(instance_id)
        .fetch_one(db)
        .await
        .unwrap();
    n
}
