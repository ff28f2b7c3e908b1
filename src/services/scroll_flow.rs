use tracing::{debug, info};
use tracing_unwrap::OptionExt;

use crate::error::{ScoreboardError, ScoreboardResult};
use crate::models::{ProblemId, RankChange, ScrollReport};
use crate::services::scoreboard::Scoreboard;

impl Scoreboard {
    /// Reveal every frozen result one problem at a time, lowest ranked team
    /// first, and lift the freeze once nothing is hidden anymore.
    pub fn scroll(&mut self) -> ScoreboardResult<ScrollReport> {
        if !self.context.frozen {
            return Err(ScoreboardError::NotFrozen);
        }

        let pending_teams = self
            .teams
            .values()
            .filter(|team| team.has_frozen_problem())
            .count();
        info!("Scroll started: {} teams with hidden results", pending_teams);
        let before = self.flush();
        let mut changes = Vec::new();
        let mut reveals = 0usize;

        while let Some((team_name, problem_id)) = find_next_reveal_target(self) {
            let old_index = rank_index_of(self, &team_name);
            let solved = reveal_problem_result(self, &team_name, problem_id);
            reveals += 1;
            debug!(
                "Revealed {} of {} at rank {} (solved: {})",
                problem_id,
                team_name,
                old_index + 1,
                solved
            );

            self.recompute_standings();

            let new_index = rank_index_of(self, &team_name);
            if new_index < old_index {
                let change = build_rank_change(self, &team_name, old_index, new_index);
                debug!(
                    "Team {} moved {} -> {} passing {}",
                    change.team_name, change.old_rank, change.new_rank, change.displaced_team
                );
                changes.push(change);
            }
        }

        let after = self.flush();
        self.context.frozen = false;
        info!(
            "Scroll finished: {} reveals, {} rank changes",
            reveals,
            changes.len()
        );

        Ok(ScrollReport {
            before,
            changes,
            after,
        })
    }
}

/// Lowest ranked team with a frozen problem, and its smallest frozen problem
fn find_next_reveal_target(board: &Scoreboard) -> Option<(String, ProblemId)> {
    board.standings.iter().rev().find_map(|team_name| {
        board
            .teams
            .get(team_name)
            .and_then(|team| team.next_frozen_problem())
            .map(|problem_id| (team_name.clone(), problem_id))
    })
}

fn rank_index_of(board: &Scoreboard, team_name: &str) -> usize {
    *board
        .rank_index
        .get(team_name)
        .expect_or_log("Scroll target missing from standings")
}

fn reveal_problem_result(board: &mut Scoreboard, team_name: &str, problem_id: ProblemId) -> bool {
    board
        .teams
        .get_mut(team_name)
        .and_then(|team| team.problems.get_mut(&problem_id))
        .map(|status| status.unfreeze())
        .unwrap_or_default()
}

fn build_rank_change(
    board: &Scoreboard,
    team_name: &str,
    old_index: usize,
    new_index: usize,
) -> RankChange {
    let team = board
        .teams
        .get(team_name)
        .expect_or_log("Scroll target missing from teams");
    // A team that moved up always has someone right below it
    let displaced_team = board
        .standings
        .get(new_index + 1)
        .cloned()
        .expect_or_log("No team below a team that moved up");

    RankChange {
        team_name: team.name.clone(),
        displaced_team,
        solved_count: team.metrics.solved_count,
        penalty_time: team.metrics.penalty_time,
        old_rank: old_index + 1,
        new_rank: new_index + 1,
    }
}
