use std::str::{FromStr, SplitWhitespace};

use crate::error::ParseError;
use crate::models::{Filter, Outcome, ProblemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddTeam {
        team_name: String,
    },
    Start {
        duration: u32,
        problem_count: usize,
    },
    Submit {
        problem: ProblemId,
        team_name: String,
        outcome: Outcome,
        time: u32,
    },
    Flush,
    Freeze,
    Scroll,
    QueryRanking {
        team_name: String,
    },
    QuerySubmission {
        team_name: String,
        problem: Filter<ProblemId>,
        outcome: Filter<Outcome>,
    },
    End,
}

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn next(&mut self, name: &'static str) -> Result<&'a str, ParseError> {
        self.inner.next().ok_or(ParseError::MissingToken(name))
    }

    fn keyword(&mut self, expected: &'static str) -> Result<(), ParseError> {
        let found = self.next(expected)?;
        if found != expected {
            return Err(ParseError::UnexpectedKeyword {
                expected,
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn number<T: FromStr>(&mut self, name: &'static str) -> Result<T, ParseError> {
        let raw = self.next(name)?;
        raw.parse()
            .map_err(|_| ParseError::InvalidNumber(raw.to_string()))
    }
}

/// Parse one protocol line. Blank lines yield `Ok(None)`.
pub fn parse_command_line(line: &str) -> Result<Option<Command>, ParseError> {
    let mut tokens = Tokens {
        inner: line.split_whitespace(),
    };
    let Some(keyword) = tokens.inner.next() else {
        return Ok(None);
    };

    let command = match keyword {
        "ADDTEAM" => Command::AddTeam {
            team_name: tokens.next("team name")?.to_string(),
        },
        "START" => {
            tokens.keyword("DURATION")?;
            let duration = tokens.number("duration")?;
            tokens.keyword("PROBLEM")?;
            let problem_count = tokens.number("problem count")?;
            Command::Start {
                duration,
                problem_count,
            }
        }
        "SUBMIT" => {
            let problem = tokens.next("problem")?.parse()?;
            tokens.keyword("BY")?;
            let team_name = tokens.next("team name")?.to_string();
            tokens.keyword("WITH")?;
            let outcome = tokens.next("status")?.parse()?;
            tokens.keyword("AT")?;
            let time = tokens.number("time")?;
            Command::Submit {
                problem,
                team_name,
                outcome,
                time,
            }
        }
        "FLUSH" => Command::Flush,
        "FREEZE" => Command::Freeze,
        "SCROLL" => Command::Scroll,
        "QUERY_RANKING" => Command::QueryRanking {
            team_name: tokens.next("team name")?.to_string(),
        },
        "QUERY_SUBMISSION" => {
            let team_name = tokens.next("team name")?.to_string();
            tokens.keyword("WHERE")?;
            let problem = parse_condition(tokens.next("problem condition")?, "PROBLEM=")?;
            tokens.keyword("AND")?;
            let outcome = parse_condition(tokens.next("status condition")?, "STATUS=")?;
            Command::QuerySubmission {
                team_name,
                problem,
                outcome,
            }
        }
        "END" => Command::End,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    Ok(Some(command))
}

fn parse_condition<T>(raw: &str, prefix: &'static str) -> Result<Filter<T>, ParseError>
where
    T: FromStr<Err = ParseError>,
{
    raw.strip_prefix(prefix)
        .ok_or_else(|| ParseError::InvalidCondition(raw.to_string()))?
        .parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command_line("FLUSH"), Ok(Some(Command::Flush)));
        assert_eq!(parse_command_line("  FREEZE  "), Ok(Some(Command::Freeze)));
        assert_eq!(parse_command_line("SCROLL"), Ok(Some(Command::Scroll)));
        assert_eq!(parse_command_line("END"), Ok(Some(Command::End)));
        assert_eq!(parse_command_line(""), Ok(None));
        assert_eq!(parse_command_line("   "), Ok(None));
        assert_eq!(
            parse_command_line("ADDTEAM Shanghai_1"),
            Ok(Some(Command::AddTeam {
                team_name: "Shanghai_1".to_string()
            }))
        );
    }

    #[test]
    fn test_parse_start_and_submit() {
        assert_eq!(
            parse_command_line("START DURATION 300 PROBLEM 12"),
            Ok(Some(Command::Start {
                duration: 300,
                problem_count: 12
            }))
        );
        assert_eq!(
            parse_command_line("SUBMIT C BY team_x WITH Time_Limit_Exceed AT 77"),
            Ok(Some(Command::Submit {
                problem: "C".parse().unwrap(),
                team_name: "team_x".to_string(),
                outcome: Outcome::TimeLimitExceed,
                time: 77,
            }))
        );
    }

    #[test]
    fn test_parse_query_submission() {
        assert_eq!(
            parse_command_line("QUERY_SUBMISSION t WHERE PROBLEM=ALL AND STATUS=Accepted"),
            Ok(Some(Command::QuerySubmission {
                team_name: "t".to_string(),
                problem: Filter::Any,
                outcome: Filter::Only(Outcome::Accepted),
            }))
        );
        assert_eq!(
            parse_command_line("QUERY_SUBMISSION t WHERE PROBLEM=B AND STATUS=ALL"),
            Ok(Some(Command::QuerySubmission {
                team_name: "t".to_string(),
                problem: Filter::Only("B".parse().unwrap()),
                outcome: Filter::Any,
            }))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_command_line("RESET"),
            Err(ParseError::UnknownCommand("RESET".to_string()))
        );
        assert_eq!(
            parse_command_line("START DURATION abc PROBLEM 3"),
            Err(ParseError::InvalidNumber("abc".to_string()))
        );
        assert_eq!(
            parse_command_line("SUBMIT A BY t WITH Compile_Error AT 3"),
            Err(ParseError::InvalidOutcome("Compile_Error".to_string()))
        );
        assert_eq!(
            parse_command_line("SUBMIT A BY t"),
            Err(ParseError::MissingToken("WITH"))
        );
        assert_eq!(
            parse_command_line("START TIME 3 PROBLEM 3"),
            Err(ParseError::UnexpectedKeyword {
                expected: "DURATION",
                found: "TIME".to_string()
            })
        );
        assert_eq!(
            parse_command_line("QUERY_SUBMISSION t WHERE STATUS=ALL AND PROBLEM=ALL"),
            Err(ParseError::InvalidCondition("STATUS=ALL".to_string()))
        );
    }
}
