use eyre::{Result, WrapErr, ensure};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub matcher: MatcherConfig,
    pub loader: LoaderConfig,
}

impl Config {
    pub fn load(file_name: &Path) -> Result<Config> {
        let content = fs::read_to_string(file_name)
            .wrap_err_with(|| format!("cannot load configuration file {}", file_name.display()))?;
        Self::parse(&content)
            .wrap_err_with(|| format!("invalid configuration file {}", file_name.display()))
    }

    pub fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        config.matcher.validate()?;
        Ok(config)
    }
}

/// How incomplete preference lists are padded.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum PaddingPolicy {
    /// Append the least popular workshops not listed yet.
    #[default]
    LeastPopular,
    /// Append "no preference" markers.
    Placeholder,
}

/// How the session of a workshop is chosen for a student.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum SlotPolicy {
    /// Least filled session among those whose time slot is free.
    #[default]
    LeastFull,
    /// Session at the student's first free time slot, without searching.
    /// Workshops are assigned in preference order, so as long as no
    /// assignment fails the n-th assigned preference lands at time slot n.
    /// Unlike a strict "slot = preference rank" rule, a student whose
    /// earlier preference could not be assigned still gets the next free
    /// slot rather than leaving it empty.
    PreferenceOrder,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatcherConfig {
    pub sessions_per_workshop: usize,
    pub minimum_workshop_fill: f64,
    pub required_preferences: usize,
    /// Score of an assignment by preference rank (lower is better).
    pub scorer_points: Vec<u32>,
    pub unpreferred_score: u32,
    /// Popularity given to a workshop by preference rank.
    pub popularity_points: Vec<u32>,
    pub padding: PaddingPolicy,
    pub slot_selection: SlotPolicy,
    pub seed: Option<u64>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            sessions_per_workshop: 3,
            minimum_workshop_fill: 0.7,
            required_preferences: 6,
            scorer_points: vec![1, 3, 5, 10, 11, 12],
            unpreferred_score: 20,
            popularity_points: vec![1, 1, 1, 1, 1, 1],
            padding: PaddingPolicy::default(),
            slot_selection: SlotPolicy::default(),
            seed: None,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.sessions_per_workshop > 0,
            "matcher.sessions_per_workshop must be positive"
        );
        ensure!(
            self.minimum_workshop_fill > 0.0 && self.minimum_workshop_fill <= 1.0,
            "matcher.minimum_workshop_fill must be in (0, 1], got {}",
            self.minimum_workshop_fill
        );
        ensure!(
            self.required_preferences > 0,
            "matcher.required_preferences must be positive"
        );
        ensure!(
            self.scorer_points.len() >= self.required_preferences,
            "matcher.scorer_points has {} entries for {} required preferences",
            self.scorer_points.len(),
            self.required_preferences
        );
        ensure!(
            self.popularity_points.len() >= self.required_preferences,
            "matcher.popularity_points has {} entries for {} required preferences",
            self.popularity_points.len(),
            self.required_preferences
        );
        Ok(())
    }

    /// Score of a student who got none of their preferences.
    pub fn worst_score(&self) -> u32 {
        self.unpreferred_score * self.sessions_per_workshop as u32
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LoaderConfig {
    Csv(CsvConfig),
    Database(DatabaseConfig),
}

#[derive(Clone, Debug, Deserialize)]
pub struct CsvConfig {
    pub workshops: PathBuf,
    pub responses: PathBuf,
    pub preassigned: Option<PathBuf>,
    #[serde(default = "default_schedule")]
    pub schedule: PathBuf,
    pub fill_report: Option<PathBuf>,
}

fn default_schedule() -> PathBuf {
    PathBuf::from("schedule.csv")
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}
