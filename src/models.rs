use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Penalty time charged for every counted rejected attempt on a solved problem
pub const PENALTY_PER_WRONG_ATTEMPT: u64 = 20;

/// Wire keyword matching any value in a query filter
pub const FILTER_ANY: &str = "ALL";

/// Problem label, `A` for the first problem of the contest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProblemId(char);

impl ProblemId {
    pub fn from_index(index: usize) -> Option<Self> {
        let offset = u8::try_from(index).ok().filter(|offset| *offset < 26)?;
        Some(Self(char::from(b'A' + offset)))
    }
}

impl FromStr for ProblemId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(label), None) if label.is_ascii_uppercase() => Ok(Self(label)),
            _ => Err(ParseError::InvalidProblem(s.to_string())),
        }
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Judging outcome of a single submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Wrong_Answer")]
    WrongAnswer,
    #[serde(rename = "Runtime_Error")]
    RuntimeError,
    #[serde(rename = "Time_Limit_Exceed")]
    TimeLimitExceed,
}

impl Outcome {
    pub fn is_solved(self) -> bool {
        matches!(self, Outcome::Accepted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Accepted => "Accepted",
            Outcome::WrongAnswer => "Wrong_Answer",
            Outcome::RuntimeError => "Runtime_Error",
            Outcome::TimeLimitExceed => "Time_Limit_Exceed",
        }
    }
}

impl FromStr for Outcome {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Accepted" => Ok(Outcome::Accepted),
            "Wrong_Answer" => Ok(Outcome::WrongAnswer),
            "Runtime_Error" => Ok(Outcome::RuntimeError),
            "Time_Limit_Exceed" => Ok(Outcome::TimeLimitExceed),
            other => Err(ParseError::InvalidOutcome(other.to_string())),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either a wildcard or one exact value to match against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter<T> {
    Any,
    Only(T),
}

impl<T: PartialEq> Filter<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Filter::Any => true,
            Filter::Only(expected) => expected == value,
        }
    }
}

impl<T> FromStr for Filter<T>
where
    T: FromStr<Err = ParseError>,
{
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == FILTER_ANY {
            Ok(Filter::Any)
        } else {
            s.parse().map(Filter::Only)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub problem: ProblemId,
    pub outcome: Outcome,
    pub time: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProblemStatus {
    pub wrong_before_freeze: u32,
    /// Judging events recorded during the freeze. An accepted submission made
    /// while frozen is counted here too and netted out again on unfreeze.
    pub wrong_after_freeze: u32,
    pub solved_time: Option<u32>,
    pub is_frozen: bool,
}

impl ProblemStatus {
    pub fn is_solved(&self) -> bool {
        self.solved_time.is_some()
    }

    fn apply(&mut self, outcome: Outcome, time: u32, board_frozen: bool) {
        // A solved problem is closed for scoring
        if self.is_solved() {
            return;
        }

        if outcome.is_solved() {
            self.solved_time = Some(time);
        }

        if board_frozen {
            self.is_frozen = true;
            self.wrong_after_freeze += 1;
        } else if !outcome.is_solved() {
            self.wrong_before_freeze += 1;
        }
    }

    /// Reveal the hidden results. Returns whether the problem turned out solved.
    pub fn unfreeze(&mut self) -> bool {
        let hidden_wrong = if self.is_solved() {
            self.wrong_after_freeze.saturating_sub(1)
        } else {
            self.wrong_after_freeze
        };
        self.wrong_before_freeze += hidden_wrong;
        self.wrong_after_freeze = 0;
        self.is_frozen = false;
        self.is_solved()
    }

    fn counted_wrong(&self, include_frozen: bool) -> u32 {
        if include_frozen {
            self.wrong_before_freeze + self.wrong_after_freeze
        } else {
            self.wrong_before_freeze
        }
    }
}

impl fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_frozen {
            if self.wrong_before_freeze == 0 {
                write!(f, "0/{}", self.wrong_after_freeze)
            } else {
                write!(f, "-{}/{}", self.wrong_before_freeze, self.wrong_after_freeze)
            }
        } else if self.is_solved() {
            if self.wrong_before_freeze == 0 {
                f.write_str("+")
            } else {
                write!(f, "+{}", self.wrong_before_freeze)
            }
        } else if self.wrong_before_freeze == 0 {
            f.write_str(".")
        } else {
            write!(f, "-{}", self.wrong_before_freeze)
        }
    }
}

/// Ranking inputs derived from a team's problem statuses at flush time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamMetrics {
    pub solved_count: u32,
    pub penalty_time: u64,
    /// Sorted descending
    pub solve_times: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct Team {
    pub name: String,
    pub problems: BTreeMap<ProblemId, ProblemStatus>,
    pub submissions: Vec<Submission>,
    pub metrics: TeamMetrics,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            problems: BTreeMap::new(),
            submissions: Vec::new(),
            metrics: TeamMetrics::default(),
        }
    }

    pub fn record_submission(
        &mut self,
        problem: ProblemId,
        outcome: Outcome,
        time: u32,
        board_frozen: bool,
    ) {
        self.submissions.push(Submission {
            problem,
            outcome,
            time,
        });
        self.problems
            .entry(problem)
            .or_default()
            .apply(outcome, time, board_frozen);
    }

    pub fn project_metrics(&mut self, include_frozen: bool) {
        let mut metrics = TeamMetrics::default();
        for status in self.problems.values() {
            let Some(solved_time) = status.solved_time else {
                continue;
            };
            if status.is_frozen && !include_frozen {
                continue;
            }

            metrics.solved_count += 1;
            metrics.penalty_time += u64::from(solved_time)
                + PENALTY_PER_WRONG_ATTEMPT * u64::from(status.counted_wrong(include_frozen));
            metrics.solve_times.push(solved_time);
        }
        metrics.solve_times.sort_unstable_by(|a, b| b.cmp(a));
        self.metrics = metrics;
    }

    pub fn has_frozen_problem(&self) -> bool {
        self.problems.values().any(|status| status.is_frozen)
    }

    /// Smallest problem id still hiding results
    pub fn next_frozen_problem(&self) -> Option<ProblemId> {
        self.problems
            .iter()
            .find(|(_, status)| status.is_frozen)
            .map(|(problem, _)| *problem)
    }

    pub fn problem_display(&self, problem: ProblemId) -> String {
        self.problems
            .get(&problem)
            .map(ToString::to_string)
            .unwrap_or_else(|| ProblemStatus::default().to_string())
    }

    pub fn latest_submission(
        &self,
        problem: &Filter<ProblemId>,
        outcome: &Filter<Outcome>,
    ) -> Option<&Submission> {
        self.submissions
            .iter()
            .rev()
            .find(|submission| problem.matches(&submission.problem) && outcome.matches(&submission.outcome))
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Team {}

impl PartialOrd for Team {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Team {
    /// `Less` means ranked ahead
    fn cmp(&self, other: &Self) -> Ordering {
        // Sort by solved problem count
        if self.metrics.solved_count != other.metrics.solved_count {
            return other.metrics.solved_count.cmp(&self.metrics.solved_count);
        }
        // Sort by penalty time
        if self.metrics.penalty_time != other.metrics.penalty_time {
            return self.metrics.penalty_time.cmp(&other.metrics.penalty_time);
        }
        // Sort by latest solve times, largest first
        if let Some((mine, theirs)) = self
            .metrics
            .solve_times
            .iter()
            .zip(&other.metrics.solve_times)
            .find(|(mine, theirs)| mine != theirs)
        {
            return mine.cmp(theirs);
        }
        self.name.cmp(&other.name)
    }
}

/// One line of a published ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingRow {
    pub team_name: String,
    /// 1-based
    pub rank: usize,
    pub solved_count: u32,
    pub penalty_time: u64,
    pub problems: Vec<String>,
}

/// A team climbing the board after one of its problems was revealed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankChange {
    pub team_name: String,
    /// Team now directly below the climber
    pub displaced_team: String,
    pub solved_count: u32,
    pub penalty_time: u64,
    pub old_rank: usize,
    pub new_rank: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrollReport {
    pub before: Vec<StandingRow>,
    pub changes: Vec<RankChange>,
    pub after: Vec<StandingRow>,
}
