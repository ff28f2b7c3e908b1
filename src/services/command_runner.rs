use std::io::{BufRead, Write};
use std::ops::ControlFlow;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::error::ScoreboardError;
use crate::models::{Filter, Outcome, ProblemId, RankChange, StandingRow};
use crate::services::command_parser::{Command, parse_command_line};
use crate::services::scoreboard::Scoreboard;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_read: u64,
    pub error_count: u64,
    /// False when the input ran out before an END command
    pub ended: bool,
}

/// Drives a scoreboard from protocol lines and writes the textual replies.
pub struct CommandRunner<W: Write> {
    board: Scoreboard,
    out: W,
}

impl<W: Write> CommandRunner<W> {
    pub fn new(out: W) -> Self {
        Self {
            board: Scoreboard::new(),
            out,
        }
    }

    pub fn board(&self) -> &Scoreboard {
        &self.board
    }

    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for line_result in reader.lines() {
            let line = line_result.context("Failed while reading command stream")?;
            summary.lines_read += 1;

            let command = match parse_command_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(err) => {
                    warn!("Skipping line {}: {}", summary.lines_read, err);
                    summary.error_count += 1;
                    continue;
                }
            };

            if let ControlFlow::Break(()) = self.execute(command)? {
                summary.ended = true;
                break;
            }
        }

        self.out.flush().context("Failed to flush output")?;
        info!(
            "Command stream done: {} lines, {} skipped, ended: {}",
            summary.lines_read, summary.error_count, summary.ended
        );
        Ok(summary)
    }

    pub fn execute(&mut self, command: Command) -> Result<ControlFlow<()>> {
        match command {
            Command::AddTeam { team_name } => match self.board.register_team(&team_name) {
                Ok(()) => self.reply("[Info]Add successfully.")?,
                Err(ScoreboardError::AlreadyStarted) => {
                    self.reply("[Error]Add failed: competition has started.")?
                }
                Err(ScoreboardError::DuplicateName(_)) => {
                    self.reply("[Error]Add failed: duplicated team name.")?
                }
                Err(
                    err @ (ScoreboardError::AlreadyFrozen
                    | ScoreboardError::NotFrozen
                    | ScoreboardError::UnknownTeam(_)),
                ) => return Err(err).context("Unexpected failure while adding a team"),
            },
            Command::Start {
                duration,
                problem_count,
            } => match self.board.start_contest(duration, problem_count) {
                Ok(()) => self.reply("[Info]Competition starts.")?,
                Err(_) => self.reply("[Error]Start failed: competition has started.")?,
            },
            Command::Submit {
                problem,
                team_name,
                outcome,
                time,
            } => self
                .board
                .record_submission(&team_name, problem, outcome, time),
            Command::Flush => {
                self.board.flush();
                self.reply("[Info]Flush scoreboard.")?;
            }
            Command::Freeze => match self.board.freeze() {
                Ok(()) => self.reply("[Info]Freeze scoreboard.")?,
                Err(_) => self.reply("[Error]Freeze failed: scoreboard has been frozen.")?,
            },
            Command::Scroll => self.scroll()?,
            Command::QueryRanking { team_name } => self.query_ranking(&team_name)?,
            Command::QuerySubmission {
                team_name,
                problem,
                outcome,
            } => self.query_submission(&team_name, problem, outcome)?,
            Command::End => {
                self.reply("[Info]Competition ends.")?;
                return Ok(ControlFlow::Break(()));
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    fn scroll(&mut self) -> Result<()> {
        let report = match self.board.scroll() {
            Ok(report) => report,
            Err(_) => return self.reply("[Error]Scroll failed: scoreboard has not been frozen."),
        };

        self.reply("[Info]Scroll scoreboard.")?;
        self.write_board(&report.before)?;
        for change in &report.changes {
            self.write_rank_change(change)?;
        }
        self.write_board(&report.after)
    }

    fn query_ranking(&mut self, team_name: &str) -> Result<()> {
        let rank = match self.board.rank_of(team_name) {
            Ok(rank) => rank,
            Err(_) => return self.reply("[Error]Query ranking failed: cannot find the team."),
        };

        self.reply("[Info]Complete query ranking.")?;
        if self.board.is_frozen() {
            self.reply(
                "[Warning]Scoreboard is frozen. The ranking may be inaccurate until it were scrolled.",
            )?;
        }
        writeln!(self.out, "{} NOW AT RANKING {}", team_name, rank)?;
        Ok(())
    }

    fn query_submission(
        &mut self,
        team_name: &str,
        problem: Filter<ProblemId>,
        outcome: Filter<Outcome>,
    ) -> Result<()> {
        let found = match self.board.latest_submission(team_name, problem, outcome) {
            Ok(found) => found.cloned(),
            Err(_) => return self.reply("[Error]Query submission failed: cannot find the team."),
        };

        self.reply("[Info]Complete query submission.")?;
        match found {
            Some(submission) => writeln!(
                self.out,
                "{} {} {} {}",
                team_name, submission.problem, submission.outcome, submission.time
            )?,
            None => self.reply("Cannot find any submission.")?,
        }
        Ok(())
    }

    fn reply(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "{message}")?;
        Ok(())
    }

    fn write_board(&mut self, rows: &[StandingRow]) -> Result<()> {
        for row in rows {
            write!(
                self.out,
                "{} {} {} {}",
                row.team_name, row.rank, row.solved_count, row.penalty_time
            )?;
            for display in &row.problems {
                write!(self.out, " {display}")?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn write_rank_change(&mut self, change: &RankChange) -> Result<()> {
        writeln!(
            self.out,
            "{} {} {} {}",
            change.team_name, change.displaced_team, change.solved_count, change.penalty_time
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_script(script: &str) -> (String, RunSummary) {
        let mut runner = CommandRunner::new(Vec::new());
        let summary = runner.run(script.as_bytes()).unwrap();
        (String::from_utf8(runner.out).unwrap(), summary)
    }

    #[test]
    fn test_registration_and_start_replies() {
        let (output, summary) = run_script(
            "ADDTEAM a\nADDTEAM a\nSTART DURATION 100 PROBLEM 2\nSTART DURATION 100 PROBLEM 2\nADDTEAM b\nEND\n",
        );
        assert_eq!(
            output,
            "[Info]Add successfully.\n\
             [Error]Add failed: duplicated team name.\n\
             [Info]Competition starts.\n\
             [Error]Start failed: competition has started.\n\
             [Error]Add failed: competition has started.\n\
             [Info]Competition ends.\n"
        );
        assert!(summary.ended);
        assert_eq!(summary.error_count, 0);
    }

    #[test]
    fn test_add_team_error_kinds_map_to_their_own_replies() {
        let mut runner = CommandRunner::new(Vec::new());
        let add = |team_name: &str| Command::AddTeam {
            team_name: team_name.to_string(),
        };

        runner.execute(add("a")).unwrap();
        runner.execute(add("a")).unwrap();
        runner
            .execute(Command::Start {
                duration: 10,
                problem_count: 1,
            })
            .unwrap();
        // started wins over duplicated name
        runner.execute(add("a")).unwrap();

        assert_eq!(
            String::from_utf8(runner.out).unwrap(),
            "[Info]Add successfully.\n\
             [Error]Add failed: duplicated team name.\n\
             [Info]Competition starts.\n\
             [Error]Add failed: competition has started.\n"
        );
    }

    #[test]
    fn test_huge_problem_count_still_flushes() {
        let (output, _) = run_script(
            "ADDTEAM a\nSTART DURATION 1 PROBLEM 18446744073709551615\nFLUSH\nSCROLL\nFREEZE\nSCROLL\n",
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[2], "[Info]Flush scoreboard.");
        assert_eq!(lines[6], format!("a 1 0 0{}", " .".repeat(26)));
    }

    #[test]
    fn test_full_contest_with_scroll() {
        let script = "\
ADDTEAM a
ADDTEAM b
ADDTEAM c
QUERY_RANKING b
START DURATION 300 PROBLEM 2
SUBMIT A BY a WITH Accepted AT 10
SUBMIT A BY b WITH Accepted AT 20
FREEZE
FREEZE
SUBMIT A BY c WITH Wrong_Answer AT 200
SUBMIT A BY c WITH Accepted AT 210
SUBMIT B BY c WITH Accepted AT 220
SUBMIT B BY b WITH Wrong_Answer AT 230
FLUSH
QUERY_RANKING c
SCROLL
SCROLL
QUERY_RANKING c
END
SUBMIT A BY a WITH Accepted AT 1
";
        let (output, summary) = run_script(script);
        let expected = "\
[Info]Add successfully.
[Info]Add successfully.
[Info]Add successfully.
[Info]Complete query ranking.
b NOW AT RANKING 2
[Info]Competition starts.
[Info]Freeze scoreboard.
[Error]Freeze failed: scoreboard has been frozen.
[Info]Flush scoreboard.
[Info]Complete query ranking.
[Warning]Scoreboard is frozen. The ranking may be inaccurate until it were scrolled.
c NOW AT RANKING 3
[Info]Scroll scoreboard.
a 1 1 10 + .
b 2 1 20 + 0/1
c 3 0 0 0/2 0/1
c a 2 450
c 1 2 450 +1 +
a 2 1 10 + .
b 3 1 20 + -1
[Error]Scroll failed: scoreboard has not been frozen.
[Info]Complete query ranking.
c NOW AT RANKING 1
[Info]Competition ends.
";
        assert_eq!(output, expected);
        assert!(summary.ended);
        assert_eq!(summary.lines_read, 19);
    }

    #[test]
    fn test_query_submission_replies() {
        let script = "\
ADDTEAM t
START DURATION 100 PROBLEM 3
SUBMIT A BY t WITH Wrong_Answer AT 5
SUBMIT B BY t WITH Runtime_Error AT 9
QUERY_SUBMISSION t WHERE PROBLEM=ALL AND STATUS=ALL
QUERY_SUBMISSION t WHERE PROBLEM=A AND STATUS=ALL
QUERY_SUBMISSION t WHERE PROBLEM=ALL AND STATUS=Accepted
QUERY_SUBMISSION x WHERE PROBLEM=ALL AND STATUS=ALL
QUERY_RANKING x
";
        let (output, summary) = run_script(script);
        let expected = "\
[Info]Add successfully.
[Info]Competition starts.
[Info]Complete query submission.
t B Runtime_Error 9
[Info]Complete query submission.
t A Wrong_Answer 5
[Info]Complete query submission.
Cannot find any submission.
[Error]Query submission failed: cannot find the team.
[Error]Query ranking failed: cannot find the team.
";
        assert_eq!(output, expected);
        assert!(!summary.ended);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (output, summary) = run_script("\nBOGUS\nSTART DURATION x PROBLEM 1\nFLUSH\n");
        assert_eq!(output, "[Info]Flush scoreboard.\n");
        assert_eq!(summary.lines_read, 4);
        assert_eq!(summary.error_count, 2);
    }
}
