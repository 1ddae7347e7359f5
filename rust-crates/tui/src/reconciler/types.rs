use std::fmt;

/// Address of the connected wallet as known to the wallet provider and the
/// game program.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First and last few characters, for narrow panels.
    pub fn short(&self) -> String {
        const KEEP: usize = 6;
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= KEEP * 2 + 2 {
            return self.0.clone();
        }
        let head: String = chars[..KEEP + 2].iter().collect();
        let tail: String = chars[chars.len() - KEEP..].iter().collect();
        format!("{head}…{tail}")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the three choices the program accepts. What each choice means is
/// up to the program; the client only knows its position and the label the
/// program's interface gives it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    First,
    Second,
    Third,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::First, Move::Second, Move::Third];

    pub fn index(self) -> usize {
        match self {
            Move::First => 0,
            Move::Second => 1,
            Move::Third => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Move> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Move {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Move {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Win,
    Lose,
    Draw,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Win, Outcome::Lose, Outcome::Draw];

    pub fn index(self) -> usize {
        match self {
            Outcome::Win => 0,
            Outcome::Lose => 1,
            Outcome::Draw => 2,
        }
    }
}

/// A past round as reported by the program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundRecord {
    pub player: Identity,
    pub player_move: Move,
    pub program_move: Move,
    pub outcome: Outcome,
}

/// Proof that a submitted move was committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_id: Option<String>,
    pub outcome: Option<Outcome>,
}

/// Opaque failure reason from a collaborator, kept verbatim for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cause(String);

impl Cause {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Flattens an eyre report and its sources into one line.
    pub fn from_report(report: &color_eyre::eyre::Report) -> Self {
        let chain: Vec<String> = report.chain().map(|e| e.to_string()).collect();
        Self(chain.join(": "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ActionOutcome {
    #[default]
    Idle,
    PendingConfirmation(Move),
    Failed(Cause),
}

impl ActionOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, ActionOutcome::PendingConfirmation(_))
    }
}

/// Static description of the program's published interface. The session
/// manager owns one and checks the program's digest against it once per
/// connect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramInterface {
    pub name: &'static str,
    pub move_labels: [&'static str; 3],
    pub outcome_labels: [&'static str; 3],
    pub digest: String,
}

impl ProgramInterface {
    pub fn new(
        name: &'static str,
        move_labels: [&'static str; 3],
        outcome_labels: [&'static str; 3],
        digest: impl Into<String>,
    ) -> Self {
        Self {
            name,
            move_labels,
            outcome_labels,
            digest: digest.into(),
        }
    }

    pub fn move_label(&self, player_move: Move) -> &'static str {
        self.move_labels[player_move.index()]
    }

    pub fn outcome_label(&self, outcome: Outcome) -> &'static str {
        self.outcome_labels[outcome.index()]
    }

    pub fn matches_digest(&self, digest: &str) -> bool {
        self.digest.eq_ignore_ascii_case(digest.trim())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn next__wraps_after_last_move() {
        assert_eq!(Move::First.next(), Move::Second);
        assert_eq!(Move::Third.next(), Move::First);
    }

    #[test]
    fn prev__wraps_before_first_move() {
        assert_eq!(Move::First.prev(), Move::Third);
        assert_eq!(Move::Second.prev(), Move::First);
    }

    #[test]
    fn from_index__out_of_range__is_none() {
        assert_eq!(Move::from_index(2), Some(Move::Third));
        assert_eq!(Move::from_index(3), None);
    }

    #[test]
    fn short__long_address__keeps_prefix_and_suffix() {
        // given
        let identity = Identity::new(format!("0x{}", "ab".repeat(32)));

        // when
        let short = identity.short();

        // then
        assert_eq!(short, "0xababab…ababab");
    }

    #[test]
    fn short__short_identity__is_unchanged() {
        assert_eq!(Identity::new("0xABC").short(), "0xABC");
    }

    #[test]
    fn matches_digest__ignores_case_and_whitespace() {
        // given
        let interface = ProgramInterface::new(
            "rps",
            ["Rock", "Paper", "Scissors"],
            ["Win", "Lose", "Draw"],
            "abcd",
        );

        // then
        assert!(interface.matches_digest(" ABCD\n"));
        assert!(!interface.matches_digest("abce"));
        assert_eq!(interface.move_label(Move::Second), "Paper");
        assert_eq!(interface.outcome_label(Outcome::Draw), "Draw");
    }

    #[test]
    fn from_report__joins_error_chain() {
        // given
        use color_eyre::eyre::{
            WrapErr,
            eyre,
        };
        let report = Err::<(), _>(eyre!("connection refused"))
            .wrap_err("node unreachable")
            .unwrap_err();

        // when
        let cause = Cause::from_report(&report);

        // then
        assert_eq!(cause.as_str(), "node unreachable: connection refused");
    }
}
