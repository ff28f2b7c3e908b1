use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::{ScoreboardError, ScoreboardResult};
use crate::models::{Filter, Outcome, ProblemId, StandingRow, Submission, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContestConfig {
    pub duration: u32,
    pub problem_count: usize,
}

/// Contest-wide flags, owned by one scoreboard instance
#[derive(Debug, Clone, Default)]
pub struct ContestContext {
    pub started: bool,
    pub frozen: bool,
    pub config: Option<ContestConfig>,
}

impl ContestContext {
    pub fn problem_count(&self) -> usize {
        self.config.map(|config| config.problem_count).unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub struct Scoreboard {
    pub(crate) teams: HashMap<String, Team>,
    /// Team names in rank order as of the last flush
    pub(crate) standings: Vec<String>,
    pub(crate) rank_index: HashMap<String, usize>,
    /// Rows published by the last flush
    published: Vec<StandingRow>,
    pub(crate) context: ContestContext,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &ContestContext {
        &self.context
    }

    pub fn is_frozen(&self) -> bool {
        self.context.frozen
    }

    pub fn register_team(&mut self, name: &str) -> ScoreboardResult<()> {
        if self.context.started {
            warn!("Rejecting team {} registered after start", name);
            return Err(ScoreboardError::AlreadyStarted);
        }
        if self.teams.contains_key(name) {
            warn!("Rejecting duplicated team {}", name);
            return Err(ScoreboardError::DuplicateName(name.to_string()));
        }

        self.teams.insert(name.to_string(), Team::new(name));
        info!("Added new team {}", name);
        Ok(())
    }

    pub fn start_contest(&mut self, duration: u32, problem_count: usize) -> ScoreboardResult<()> {
        if self.context.started {
            return Err(ScoreboardError::AlreadyStarted);
        }

        if ProblemId::from_index(problem_count.saturating_sub(1)).is_none() {
            warn!(
                "Problem count {} exceeds the available problem labels, extra columns are not shown",
                problem_count
            );
        }

        self.context.started = true;
        self.context.config = Some(ContestConfig {
            duration,
            problem_count,
        });
        info!(
            "Contest started: duration {} problems {} teams {}",
            duration,
            problem_count,
            self.teams.len()
        );
        Ok(())
    }

    /// Teams are created on their first submission if they were never registered.
    pub fn record_submission(
        &mut self,
        team_name: &str,
        problem: ProblemId,
        outcome: Outcome,
        time: u32,
    ) {
        let frozen = self.context.frozen;
        let team = self.teams.entry(team_name.to_string()).or_insert_with(|| {
            info!("Creating team {} from its first submission", team_name);
            Team::new(team_name)
        });
        team.record_submission(problem, outcome, time, frozen);
        debug!(
            "Submission {} {} {} at {} (frozen: {})",
            team_name, problem, outcome, time, frozen
        );
    }

    /// Recompute every team's public metrics and publish a new ranking.
    pub fn flush(&mut self) -> Vec<StandingRow> {
        self.recompute_standings();
        self.published = self.build_rows();
        self.published.clone()
    }

    pub(crate) fn recompute_standings(&mut self) {
        for team in self.teams.values_mut() {
            team.project_metrics(false);
        }

        let mut ordered: Vec<&Team> = self.teams.values().collect();
        ordered.sort();
        let standings: Vec<String> = ordered.into_iter().map(|team| team.name.clone()).collect();
        let rank_index = standings
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();

        self.standings = standings;
        self.rank_index = rank_index;

        for (rank, name) in self.standings.iter().enumerate() {
            if let Some(team) = self.teams.get(name) {
                debug!(
                    "Rank {:0>3} Solved {} Penalty {} TeamName: {}",
                    rank + 1,
                    team.metrics.solved_count,
                    team.metrics.penalty_time,
                    team.name
                );
            }
        }
    }

    /// Rows of the last published ranking, without recomputing anything
    pub fn snapshot(&self) -> &[StandingRow] {
        &self.published
    }

    fn build_rows(&self) -> Vec<StandingRow> {
        let problems: Vec<ProblemId> = (0..self.context.problem_count())
            .map_while(ProblemId::from_index)
            .collect();

        self.standings
            .iter()
            .filter_map(|name| self.teams.get(name))
            .enumerate()
            .map(|(index, team)| StandingRow {
                team_name: team.name.clone(),
                rank: index + 1,
                solved_count: team.metrics.solved_count,
                penalty_time: team.metrics.penalty_time,
                problems: problems
                    .iter()
                    .map(|problem| team.problem_display(*problem))
                    .collect(),
            })
            .collect()
    }

    pub fn freeze(&mut self) -> ScoreboardResult<()> {
        if self.context.frozen {
            return Err(ScoreboardError::AlreadyFrozen);
        }
        self.context.frozen = true;
        info!("Scoreboard frozen");
        Ok(())
    }

    /// 1-based rank in the last published ranking. Teams missing from it
    /// follow every ranked team in name order, which before the first flush
    /// is plain lexicographic order.
    pub fn rank_of(&self, team_name: &str) -> ScoreboardResult<usize> {
        if !self.teams.contains_key(team_name) {
            return Err(ScoreboardError::UnknownTeam(team_name.to_string()));
        }

        if let Some(index) = self.rank_index.get(team_name) {
            return Ok(index + 1);
        }

        let mut unranked: Vec<&str> = self
            .teams
            .keys()
            .map(String::as_str)
            .filter(|name| !self.rank_index.contains_key(*name))
            .collect();
        unranked.sort_unstable();
        let position = unranked
            .iter()
            .position(|name| *name == team_name)
            .unwrap_or_default();
        Ok(self.standings.len() + position + 1)
    }

    pub fn latest_submission(
        &self,
        team_name: &str,
        problem: Filter<ProblemId>,
        outcome: Filter<Outcome>,
    ) -> ScoreboardResult<Option<&Submission>> {
        let team = self
            .teams
            .get(team_name)
            .ok_or_else(|| ScoreboardError::UnknownTeam(team_name.to_string()))?;
        Ok(team.latest_submission(&problem, &outcome))
    }
}
