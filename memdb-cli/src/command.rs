//! Text command layer
//!
//! Turns one line of text into a [`Command`], runs it against a [`Store`] and
//! renders the outcome with the usual conventions:
//!
//! | Outcome | Rendered as |
//! |---------|-------------|
//! | success without data | `OK` |
//! | absence | `(nil)` |
//! | number | base-10 text |
//! | range | members joined by one space |
//! | failure | message starting with `ERR`, `Invalid` or `Unknown` |
//!
//! Verbs are case-insensitive. Keys, values and members are restricted to
//! ASCII letters, digits, `-` and `_`.

use memdb::{CollectionEvictionPolicy, ScalarEvictionPolicy, Store};
use std::fmt;
use thiserror::Error;

/// Why a key or value token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProblem {
    /// The token is empty.
    Empty,
    /// The token has a character outside `[A-Za-z0-9_-]`.
    Charset,
}

impl fmt::Display for TokenProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenProblem::Empty => f.write_str("cannot be empty"),
            TokenProblem::Charset => {
                f.write_str("can only contain letters, numbers, hyphens, and underscores")
            }
        }
    }
}

/// A command that could not be parsed or executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Invalid command")]
    Empty,
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Invalid {0} command")]
    Arity(&'static str),
    #[error("Invalid key: Key {0}")]
    InvalidKey(TokenProblem),
    #[error("Invalid value: Value {0}")]
    InvalidValue(TokenProblem),
    #[error("Invalid EX seconds value")]
    InvalidExpiry,
    #[error("ERR EX seconds must be greater than zero")]
    NonPositiveExpiry,
    #[error("ERR score is not a valid float")]
    InvalidScore,
    #[error("ERR start or end is not a valid integer")]
    InvalidRange,
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
}

/// One parsed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set {
        key: String,
        value: String,
        ttl_secs: Option<u64>,
    },
    Get {
        key: String,
    },
    Del {
        key: String,
    },
    DbSize,
    Incr {
        key: String,
    },
    ZAdd {
        collection: String,
        score: f64,
        member: String,
    },
    ZCard {
        collection: String,
    },
    ZRank {
        collection: String,
        member: String,
    },
    ZRange {
        collection: String,
        start: i64,
        end: i64,
    },
}

/// The result of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Nil,
    Integer(i64),
    Value(String),
    Members(Vec<String>),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => f.write_str("OK"),
            Reply::Nil => f.write_str("(nil)"),
            Reply::Integer(n) => write!(f, "{n}"),
            Reply::Value(value) => f.write_str(value),
            Reply::Members(members) => f.write_str(&members.join(" ")),
        }
    }
}

/// Rendered outcome of one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub is_error: bool,
}

impl Response {
    fn ok(reply: Reply) -> Self {
        Self {
            text: reply.to_string(),
            is_error: false,
        }
    }

    fn error(error: CommandError) -> Self {
        Self {
            text: error.to_string(),
            is_error: true,
        }
    }
}

fn check_token(token: &str) -> Result<(), TokenProblem> {
    if token.is_empty() {
        return Err(TokenProblem::Empty);
    }
    if token
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        Ok(())
    } else {
        Err(TokenProblem::Charset)
    }
}

fn key(token: &str) -> Result<String, CommandError> {
    check_token(token).map_err(CommandError::InvalidKey)?;
    Ok(token.to_owned())
}

fn value(token: &str) -> Result<String, CommandError> {
    check_token(token).map_err(CommandError::InvalidValue)?;
    Ok(token.to_owned())
}

fn to_i64<T: TryInto<i64>>(n: T) -> i64 {
    n.try_into().unwrap_or(i64::MAX)
}

impl Command {
    /// Parses one whitespace-separated command line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return Err(CommandError::Empty);
        };
        let verb = first.to_uppercase();

        let expect = |n: usize, name: &'static str| {
            if parts.len() == n {
                Ok(())
            } else {
                Err(CommandError::Arity(name))
            }
        };

        match verb.as_str() {
            "SET" => {
                if parts.len() < 3 {
                    return Err(CommandError::Arity("SET"));
                }
                let key = key(parts[1])?;
                let value = value(parts[2])?;
                // anything other than exactly `EX <n>` after the value is ignored
                let ttl_secs = if parts.len() == 5 && parts[3].eq_ignore_ascii_case("EX") {
                    let secs: i64 = parts[4]
                        .parse()
                        .map_err(|_| CommandError::InvalidExpiry)?;
                    if secs <= 0 {
                        return Err(CommandError::NonPositiveExpiry);
                    }
                    Some(secs.unsigned_abs())
                } else {
                    None
                };
                Ok(Command::Set {
                    key,
                    value,
                    ttl_secs,
                })
            }
            "GET" => {
                expect(2, "GET")?;
                Ok(Command::Get {
                    key: key(parts[1])?,
                })
            }
            "DEL" => {
                expect(2, "DEL")?;
                Ok(Command::Del {
                    key: key(parts[1])?,
                })
            }
            "DBSIZE" => {
                expect(1, "DBSIZE")?;
                Ok(Command::DbSize)
            }
            "INCR" => {
                expect(2, "INCR")?;
                Ok(Command::Incr {
                    key: key(parts[1])?,
                })
            }
            "ZADD" => {
                expect(4, "ZADD")?;
                let collection = key(parts[1])?;
                let member = value(parts[3])?;
                let score: f64 = parts[2].parse().map_err(|_| CommandError::InvalidScore)?;
                if !score.is_finite() {
                    return Err(CommandError::InvalidScore);
                }
                Ok(Command::ZAdd {
                    collection,
                    score,
                    member,
                })
            }
            "ZCARD" => {
                expect(2, "ZCARD")?;
                Ok(Command::ZCard {
                    collection: key(parts[1])?,
                })
            }
            "ZRANK" => {
                expect(3, "ZRANK")?;
                Ok(Command::ZRank {
                    collection: key(parts[1])?,
                    member: value(parts[2])?,
                })
            }
            "ZRANGE" => {
                expect(4, "ZRANGE")?;
                let collection = key(parts[1])?;
                let (Ok(start), Ok(end)) = (parts[2].parse::<i64>(), parts[3].parse::<i64>())
                else {
                    return Err(CommandError::InvalidRange);
                };
                Ok(Command::ZRange {
                    collection,
                    start,
                    end,
                })
            }
            _ => Err(CommandError::Unknown(verb)),
        }
    }

    /// Upper-case verb of this command.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Del { .. } => "DEL",
            Command::DbSize => "DBSIZE",
            Command::Incr { .. } => "INCR",
            Command::ZAdd { .. } => "ZADD",
            Command::ZCard { .. } => "ZCARD",
            Command::ZRank { .. } => "ZRANK",
            Command::ZRange { .. } => "ZRANGE",
        }
    }

    /// Runs the command against `store`.
    ///
    /// `INCR` reads the current value first and refuses to touch a value that
    /// is not a base-10 integer below `i64::MAX`.
    pub fn execute<P, C>(&self, store: &Store<P, C>) -> Result<Reply, CommandError>
    where
        P: ScalarEvictionPolicy,
        C: CollectionEvictionPolicy,
    {
        let reply = match self {
            Command::Set {
                key,
                value,
                ttl_secs,
            } => {
                store.set(key, value, ttl_secs.unwrap_or(0));
                Reply::Ok
            }
            Command::Get { key } => store.get(key).map_or(Reply::Nil, Reply::Value),
            Command::Del { key } => {
                if store.del(key) {
                    Reply::Ok
                } else {
                    Reply::Nil
                }
            }
            Command::DbSize => Reply::Integer(to_i64(store.db_size())),
            Command::Incr { key } => {
                if let Some(current) = store.get(key) {
                    match current.parse::<i64>() {
                        Ok(n) if n < i64::MAX => {}
                        _ => return Err(CommandError::NotAnInteger),
                    }
                }
                Reply::Integer(store.incr(key))
            }
            Command::ZAdd {
                collection,
                score,
                member,
            } => {
                store.zadd(collection, *score, member);
                Reply::Ok
            }
            Command::ZCard { collection } => Reply::Integer(to_i64(store.zcard(collection))),
            Command::ZRank { collection, member } => store
                .zrank(collection, member)
                .map_or(Reply::Nil, |rank| Reply::Integer(to_i64(rank))),
            Command::ZRange {
                collection,
                start,
                end,
            } => Reply::Members(store.zrange(collection, *start, *end)),
        };
        Ok(reply)
    }
}

/// Parses, runs and renders one command line.
pub fn execute_line<P, C>(store: &Store<P, C>, line: &str) -> Response
where
    P: ScalarEvictionPolicy,
    C: CollectionEvictionPolicy,
{
    match Command::parse(line).and_then(|command| command.execute(store)) {
        Ok(reply) => Response::ok(reply),
        Err(error) => {
            tracing::debug!(%error, line, "command rejected");
            Response::error(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(store: &Store, line: &str) -> String {
        execute_line(store, line).text
    }

    #[test]
    fn test_parse_verbs_case_insensitive() {
        assert_eq!(
            Command::parse("get foo"),
            Ok(Command::Get {
                key: "foo".to_string()
            })
        );
        assert_eq!(Command::parse("DbSize"), Ok(Command::DbSize));
    }

    #[test]
    fn test_parse_empty_and_unknown() {
        assert_eq!(Command::parse(""), Err(CommandError::Empty));
        assert_eq!(Command::parse("   \t "), Err(CommandError::Empty));
        assert_eq!(
            Command::parse("flushall now"),
            Err(CommandError::Unknown("FLUSHALL".to_string()))
        );
    }

    #[test]
    fn test_parse_arity() {
        assert_eq!(Command::parse("SET a"), Err(CommandError::Arity("SET")));
        assert_eq!(Command::parse("GET"), Err(CommandError::Arity("GET")));
        assert_eq!(Command::parse("DEL a b"), Err(CommandError::Arity("DEL")));
        assert_eq!(Command::parse("DBSIZE x"), Err(CommandError::Arity("DBSIZE")));
        assert_eq!(Command::parse("ZADD z 1"), Err(CommandError::Arity("ZADD")));
        assert_eq!(Command::parse("ZRANK z"), Err(CommandError::Arity("ZRANK")));
        assert_eq!(Command::parse("ZRANGE z 0"), Err(CommandError::Arity("ZRANGE")));
    }

    #[test]
    fn test_parse_set_with_expiry() {
        assert_eq!(
            Command::parse("set k v ex 10"),
            Ok(Command::Set {
                key: "k".to_string(),
                value: "v".to_string(),
                ttl_secs: Some(10),
            })
        );
        assert_eq!(
            Command::parse("SET k v EX ten"),
            Err(CommandError::InvalidExpiry)
        );
        assert_eq!(
            Command::parse("SET k v EX 0"),
            Err(CommandError::NonPositiveExpiry)
        );
        assert_eq!(
            Command::parse("SET k v EX -3"),
            Err(CommandError::NonPositiveExpiry)
        );
    }

    #[test]
    fn test_parse_set_ignores_trailing_tokens() {
        let expected = Ok(Command::Set {
            key: "k".to_string(),
            value: "v".to_string(),
            ttl_secs: None,
        });
        assert_eq!(Command::parse("SET k v EX"), expected);
        assert_eq!(Command::parse("SET k v PX 10"), expected);
        assert_eq!(Command::parse("SET k v EX 10 extra"), expected);
    }

    #[test]
    fn test_token_validation() {
        assert_eq!(
            Command::parse("GET bad.key"),
            Err(CommandError::InvalidKey(TokenProblem::Charset))
        );
        assert_eq!(
            Command::parse("SET k v@lue"),
            Err(CommandError::InvalidValue(TokenProblem::Charset))
        );
        assert!(Command::parse("SET under_score-and-dash 123").is_ok());
        assert_eq!(
            CommandError::InvalidKey(TokenProblem::Charset).to_string(),
            "Invalid key: Key can only contain letters, numbers, hyphens, and underscores"
        );
    }

    #[test]
    fn test_parse_scores_and_ranges() {
        assert_eq!(
            Command::parse("ZADD z 1.5 m"),
            Ok(Command::ZAdd {
                collection: "z".to_string(),
                score: 1.5,
                member: "m".to_string(),
            })
        );
        assert_eq!(Command::parse("ZADD z abc m"), Err(CommandError::InvalidScore));
        assert_eq!(Command::parse("ZADD z inf m"), Err(CommandError::InvalidScore));
        assert_eq!(Command::parse("ZADD z NaN m"), Err(CommandError::InvalidScore));
        assert_eq!(Command::parse("ZRANGE z 0 x"), Err(CommandError::InvalidRange));
        assert_eq!(Command::parse("ZRANGE z 1.5 2"), Err(CommandError::InvalidRange));
    }

    #[test]
    fn test_execute_scalar_commands() {
        let store = Store::new();
        assert_eq!(run(&store, "SET a 1"), "OK");
        assert_eq!(run(&store, "GET a"), "1");
        assert_eq!(run(&store, "INCR a"), "2");
        assert_eq!(run(&store, "DBSIZE"), "1");
        assert_eq!(run(&store, "DEL a"), "OK");
        assert_eq!(run(&store, "DEL a"), "(nil)");
        assert_eq!(run(&store, "GET a"), "(nil)");
        assert_eq!(run(&store, "DBSIZE"), "0");
    }

    #[test]
    fn test_incr_rejects_non_integer() {
        let store = Store::new();
        store.set("word", "abc", 0);
        let response = execute_line(&store, "INCR word");
        assert!(response.is_error);
        assert_eq!(response.text, "ERR value is not an integer or out of range");
        assert_eq!(store.get("word").as_deref(), Some("abc"));

        store.set("max", &i64::MAX.to_string(), 0);
        assert!(execute_line(&store, "INCR max").is_error);
    }

    #[test]
    fn test_execute_sorted_commands() {
        let store = Store::new();
        assert_eq!(run(&store, "ZADD z 1 p1"), "OK");
        assert_eq!(run(&store, "ZADD z 2 p2"), "OK");
        assert_eq!(run(&store, "ZCARD z"), "2");
        assert_eq!(run(&store, "ZRANK z p1"), "0");
        assert_eq!(run(&store, "ZRANK z nope"), "(nil)");
        assert_eq!(run(&store, "ZRANGE z 0 1"), "p1 p2");
        assert_eq!(run(&store, "ZRANGE z 5 9"), "");
        assert_eq!(run(&store, "ZCARD missing"), "0");
    }

    #[test]
    fn test_error_responses_flagged() {
        let store = Store::new();
        for line in ["", "NOPE", "GET", "SET k v EX 0", "ZADD z x m"] {
            let response = execute_line(&store, line);
            assert!(response.is_error, "{line:?} should fail");
            assert!(
                ["ERR", "Invalid", "Unknown"]
                    .iter()
                    .any(|prefix| response.text.starts_with(prefix)),
                "unexpected error text {:?}",
                response.text
            );
        }
    }
}
