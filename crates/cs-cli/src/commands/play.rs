use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use colored::Colorize;

use cs_core::countdown::CountdownTick;
use cs_core::describe::DescribePhase;
use cs_core::evaluate::Verdict;
use cs_core::round::LockChange;
use cs_core::{
    Attribute, GameMode, GameSession, ParticipantId, RoundLimit, RoundResult, SessionConfig,
};

pub struct PlayOptions {
    pub mode: Option<String>,
    pub seed: Option<u64>,
    pub decks: Option<PathBuf>,
    pub players: Option<Vec<String>>,
    pub time_limit: Option<u32>,
    pub rounds: Option<u32>,
    pub config: Option<PathBuf>,
}

pub fn run(options: PlayOptions) -> Result<(), String> {
    let mut config = match &options.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("{}: {e}", path.display()))?;
            SessionConfig::from_json(&text).map_err(|e| e.to_string())?
        }
        None => SessionConfig::default(),
    };
    if let Some(mode) = options.mode {
        let mode: GameMode = mode.parse().map_err(|e: cs_core::SenseError| e.to_string())?;
        config = config.with_mode(mode);
    }
    if let Some(seed) = options.seed {
        config = config.with_seed(seed);
    }
    if let Some(players) = options.players {
        config = config.with_players(players);
    }
    if let Some(seconds) = options.time_limit {
        config = config.with_time_limit(seconds);
    }
    if let Some(rounds) = options.rounds {
        config = config.with_round_limit(RoundLimit::Rounds(rounds));
    }

    let decks = super::load_decks(options.decks.as_deref())?;
    let mut session =
        GameSession::new(config).map_err(|e| format!("failed to start session: {e}"))?;
    session.install_decks(decks);
    let mut console = PlayConsole::new(session);

    println!("  {} Common Sense", "Starting".bold());
    println!(
        "  Mode: {} | Seed: {}",
        console.session.mode(),
        console.session.config().seed
    );
    println!("  Type 'help' for commands, 'quit' to exit.\n");

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break, // EOF
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match console.process(input) {
            Ok(output) => {
                if !output.is_empty() {
                    println!("{output}\n");
                }
                if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("q") {
                    break;
                }
            }
            Err(e) => {
                println!("{}\n", e.yellow());
            }
        }
    }

    Ok(())
}

const HELP: &str = "\
Commands:
  draw                          start the next round
  set <player> <attr> <value>   answer one attribute
  clear <player>                clear a player's answers
  lock <player>                 lock or unlock a player's answers
  guess <object>                guess the described object
  tick [n]                      advance the countdown by n seconds
  mode <mode>                   switch mode and reset the game
  status                        show the round and the scores
  history                       show recent rounds
  help                          show this help
  quit                          leave the game
Players can be named or numbered from 1.";

/// Line-oriented driver over a [`GameSession`].
pub struct PlayConsole {
    session: GameSession,
}

impl PlayConsole {
    pub fn new(session: GameSession) -> Self {
        Self { session }
    }

    /// Run one command and return the text to show.
    pub fn process(&mut self, input: &str) -> Result<String, String> {
        let mut words = input.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        match command.as_str() {
            "draw" | "next" => self.draw(),
            "set" => match args.as_slice() {
                [player, attribute, value @ ..] if !value.is_empty() => {
                    self.set(player, attribute, &value.join(" "))
                }
                _ => Err("usage: set <player> <attribute> <value>".into()),
            },
            "clear" => match args.as_slice() {
                [player] => self.clear(player),
                _ => Err("usage: clear <player>".into()),
            },
            "lock" => match args.as_slice() {
                [player] => self.lock(player),
                _ => Err("usage: lock <player>".into()),
            },
            "guess" if !args.is_empty() => self.guess(&args.join(" ")),
            "guess" => Err("usage: guess <object>".into()),
            "tick" => {
                let seconds = match args.first() {
                    Some(n) => n.parse::<u32>().map_err(|_| format!("not a number: {n}"))?,
                    None => 1,
                };
                self.tick(seconds)
            }
            "mode" => match args.as_slice() {
                [mode] => self.switch_mode(mode),
                _ => Err(format!(
                    "usage: mode <{}>",
                    GameMode::ALL
                        .iter()
                        .filter(|m| **m != GameMode::Networked)
                        .map(|m| m.name())
                        .collect::<Vec<_>>()
                        .join("|")
                )),
            },
            "status" => Ok(self.status()),
            "history" => Ok(self.history()),
            "help" | "?" => Ok(HELP.to_string()),
            "quit" | "q" => Ok(format!("Final score\n{}", self.score_line())),
            other => Err(format!("Unknown command '{other}'. Type 'help' for commands.")),
        }
    }

    fn draw(&mut self) -> Result<String, String> {
        let number = self.session.start_round().map_err(|e| e.to_string())?.number();
        let mut out = String::new();
        match self.session.describe() {
            Some(describe) => {
                let describer = self.name(describe.describer());
                let guesser = self.name(describe.guesser());
                let _ = writeln!(out, "Round {number}: {describer} describes, {guesser} guesses");
                let _ = writeln!(out, "Secret object for {describer}: {}", describe.target());
                let _ = write!(out, "{describer}: set attributes, then lock.");
            }
            None => {
                if let Some(round) = self.session.round() {
                    let prompt = round.prompt().map(|p| p.text()).unwrap_or_default();
                    let _ = writeln!(out, "Round {number}: {prompt}");
                    let _ = write!(out, "Senses: {}", round.relevant());
                }
            }
        }
        if let Some(seconds) = self.session.remaining_secs() {
            let _ = write!(out, "\nTime limit: {seconds}s");
        }
        Ok(out)
    }

    fn set(&mut self, player: &str, attribute: &str, value: &str) -> Result<String, String> {
        let id = self.player(player)?;
        let attribute: Attribute = attribute
            .parse()
            .map_err(|e: cs_core::SenseError| e.to_string())?;
        let value = attribute.canonical_value(value).map_err(|e| e.to_string())?;
        self.session
            .submit(&id, attribute, value)
            .map_err(|e| e.to_string())?;
        Ok(format!("{}: {attribute} = {value}", self.name(&id)))
    }

    fn clear(&mut self, player: &str) -> Result<String, String> {
        let id = self.player(player)?;
        self.session.clear(&id).map_err(|e| e.to_string())?;
        Ok(format!("{}: answers cleared", self.name(&id)))
    }

    fn lock(&mut self, player: &str) -> Result<String, String> {
        let id = self.player(player)?;
        let report = self.session.lock(&id).map_err(|e| e.to_string())?;
        let mut out = match report.change {
            LockChange::Locked => format!("{} locked in", self.name(&id)),
            LockChange::Unlocked => format!("{} unlocked", self.name(&id)),
        };
        if let Some(result) = report.resolution {
            out.push('\n');
            out.push_str(&self.render_result(&result));
        } else if let Some(describe) = self
            .session
            .describe()
            .filter(|d| d.phase() == DescribePhase::Guessing)
        {
            let _ = write!(
                out,
                "\n{}, which object was described? {}",
                self.name(describe.guesser()),
                describe.choices().join(", ")
            );
        }
        Ok(out)
    }

    fn guess(&mut self, choice: &str) -> Result<String, String> {
        let result = self.session.guess(choice).map_err(|e| e.to_string())?;
        Ok(self.render_result(&result))
    }

    fn tick(&mut self, seconds: u32) -> Result<String, String> {
        let mut out = String::new();
        for _ in 0..seconds {
            let report = self.session.tick().map_err(|e| e.to_string())?;
            match report.tick {
                CountdownTick::Running(left) => {
                    out = format!("{left}s left");
                }
                CountdownTick::Expired => {
                    out = "Time's up!".to_string();
                    if !report.forced.is_empty() {
                        let names: Vec<String> =
                            report.forced.iter().map(|id| self.name(id)).collect();
                        let _ = write!(out, " Locked: {}", names.join(", "));
                    }
                    if let Some(result) = report.resolution {
                        out.push('\n');
                        out.push_str(&self.render_result(&result));
                    }
                    break;
                }
                CountdownTick::Inactive => {
                    if out.is_empty() {
                        out = "No countdown running".to_string();
                    }
                    break;
                }
            }
        }
        Ok(out)
    }

    fn switch_mode(&mut self, mode: &str) -> Result<String, String> {
        let mode: GameMode = mode.parse().map_err(|e: cs_core::SenseError| e.to_string())?;
        if mode == GameMode::Networked {
            return Err("networked mode needs a host; try 'common-sense simulate'".into());
        }
        self.session.set_mode(mode);
        Ok(format!("Mode: {mode}. Scores reset."))
    }

    fn status(&self) -> String {
        let mut out = format!("Mode: {}", self.session.mode());
        match self.session.round() {
            Some(round) => {
                let _ = write!(out, " | Round {} ({})", round.number(), round.status());
                if let Some(prompt) = round.prompt() {
                    let _ = write!(out, "\nPrompt: {}", prompt.text());
                    let _ = write!(out, "\nSenses: {}", round.relevant());
                }
                for id in round.expected() {
                    let locked = round.is_locked(id).unwrap_or(false);
                    let answers: Vec<String> = round
                        .submission(id)
                        .map(|s| s.non_empty_values().map(|(a, v)| format!("{a}={v}")).collect())
                        .unwrap_or_default();
                    let _ = write!(
                        out,
                        "\n  {}{}: {}",
                        self.name(id),
                        if locked { " [locked]" } else { "" },
                        if answers.is_empty() {
                            "-".to_string()
                        } else {
                            answers.join(", ")
                        }
                    );
                }
            }
            None => out.push_str(" | No round in progress"),
        }
        if let Some(seconds) = self.session.remaining_secs() {
            let _ = write!(out, "\nTime left: {seconds}s");
        }
        let _ = write!(out, "\n{}", self.score_line());
        if self.session.is_over() {
            out.push_str("\nGame over.");
        }
        out
    }

    fn history(&self) -> String {
        let history = self.session.history();
        if history.is_empty() {
            return "No rounds played yet.".into();
        }
        history
            .entries()
            .map(|e| {
                format!(
                    "  Round {}: {} [{}]",
                    e.round,
                    e.summary,
                    if e.matched { "match" } else { "no match" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn score_line(&self) -> String {
        let board = self.session.scoreboard();
        let mut line = format!(
            "Correct: {} | Incorrect: {} | Match rate: {}%",
            board.correct(),
            board.incorrect(),
            board.match_rate()
        );
        if self.session.policy().tracks_streak {
            let _ = write!(line, " | Streak: {} (best {})", board.streak(), board.best_streak());
        }
        if self.session.mode() == GameMode::Describe {
            let scores: Vec<String> = board
                .leaderboard()
                .iter()
                .map(|(id, score)| format!("{} {score}", self.name(id)))
                .collect();
            let _ = write!(line, "\nPoints: {}", scores.join(", "));
        }
        line
    }

    fn render_result(&self, result: &RoundResult) -> String {
        let mut out = String::new();
        match result {
            RoundResult::Pair { evaluation, .. } => {
                out.push_str(if evaluation.outcome.is_match() {
                    "MATCH! Common sense prevails."
                } else {
                    "No match."
                });
                for c in &evaluation.comparisons {
                    let mark = match c.verdict {
                        Verdict::Match => "=",
                        Verdict::Mismatch => "x",
                        Verdict::Missing => "?",
                    };
                    let _ = write!(
                        out,
                        "\n  {mark} {}: {} / {}",
                        c.attribute,
                        blank(&c.left),
                        blank(&c.right)
                    );
                }
            }
            RoundResult::Describe { result, .. } => {
                if result.correct {
                    let _ = write!(out, "Correct! It was {}.", result.target);
                } else {
                    let _ = write!(
                        out,
                        "Wrong: {} guessed {}, it was {}.",
                        self.name(&result.guesser),
                        result.guess,
                        result.target
                    );
                }
            }
            RoundResult::Group { evaluation, .. } => {
                let _ = write!(
                    out,
                    "{} ({}/{})",
                    evaluation.consensus, evaluation.earned, evaluation.maximum
                );
            }
        }
        let _ = write!(out, "\n{}", self.score_line());
        if self.session.is_over() {
            out.push_str("\nGame over.");
        }
        out
    }

    /// Resolve a player by 1-based number or case-insensitive name.
    fn player(&self, token: &str) -> Result<ParticipantId, String> {
        let participants = self.session.participants();
        let numbered = token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| participants.get(i));
        if let Some(p) = numbered {
            return Ok(p.id.clone());
        }
        participants
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(token))
            .map(|p| p.id.clone())
            .ok_or_else(|| format!("unknown player: {token}"))
    }

    fn name(&self, id: &ParticipantId) -> String {
        self.session
            .participant_name(id)
            .unwrap_or(id.as_str())
            .to_string()
    }
}

fn blank(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
