use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use thiserror::Error;

use crate::models::quest_models::Difficulty;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Could not load resource file {0}: {1}")]
    Io(String, std::io::Error),
    #[error("Could not parse resource file {0}: {1}")]
    Parse(String, serde_json::Error),
    #[error("Boss roster is empty")]
    EmptyBossRoster,
}

pub struct ResourceLoader;

impl ResourceLoader {
    pub fn load(folder_path: &str) -> Result<Resources, ResourceError> {
        let bosses: Vec<BossTemplate> = Self::parse_file(folder_path, "bosses.json")?;
        let difficulty_table = Self::parse_file(folder_path, "difficulty_table.json")?;

        if bosses.is_empty() {
            return Err(ResourceError::EmptyBossRoster);
        }

        Ok(Resources { bosses, difficulty_table })
    }

    fn parse_file<T: for<'de> Deserialize<'de>>(folder_path: &str, file_name: &str) -> Result<T, ResourceError> {
        let mut path = PathBuf::from(folder_path);
        path.push(file_name);

        let contents = fs::read_to_string(&path).map_err(|e| ResourceError::Io(file_name.to_string(), e))?;
        serde_json::from_str(&contents).map_err(|e| ResourceError::Parse(file_name.to_string(), e))
    }
}

///
/// Static game data shared by every service
///
#[derive(Clone)]
pub struct Resources {
    pub bosses: Vec<BossTemplate>,
    pub difficulty_table: DifficultyTable,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BossTemplate {
    pub name: String,
    pub max_hp: i64,
    pub reward: String,
    pub xp_bonus: i64,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseValues {
    pub damage: i64,
    pub xp: i64,
}

///
/// Deterministic damage/XP bases used when the scorer is unavailable
///
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DifficultyTable {
    pub light: BaseValues,
    pub medium: BaseValues,
    pub heavy: BaseValues,
}

impl DifficultyTable {
    pub fn base_for(&self, difficulty: Difficulty) -> BaseValues {
        match difficulty {
            Difficulty::Light => self.light,
            Difficulty::Medium => self.medium,
            Difficulty::Heavy => self.heavy,
        }
    }
}

impl Default for DifficultyTable {
    fn default() -> Self {
        Self {
            light: BaseValues { damage: 8, xp: 10 },
            medium: BaseValues { damage: 15, xp: 20 },
            heavy: BaseValues { damage: 25, xp: 35 },
        }
    }
}
