use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use futures::StreamExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use cs_core::{Consensus, Decks, RoundLimit, Submission};
use cs_net::schema;
use cs_net::{
    GameRecord, GameStatus, HistoryStats, HistoryTracker, Host, HostConfig, MemoryStore, NetResult,
    PlayerClient, RoundResultRecord, SharedStore,
};

/// Bots only pick among the first few values of each attribute so that
/// rounds regularly reach some consensus.
const BOT_CHOICES: usize = 3;
const GAME_TIMEOUT: Duration = Duration::from_secs(60);

struct Outcome {
    code: String,
    record: GameRecord,
    leaderboard: Vec<(String, u32)>,
    results: Vec<RoundResultRecord>,
    csv: String,
    stats: HistoryStats,
}

pub fn run(
    players: usize,
    rounds: u32,
    seed: u64,
    decks: Option<&Path>,
    export: bool,
) -> Result<(), String> {
    if players < 2 {
        return Err("a networked game needs at least 2 players".into());
    }
    if rounds == 0 {
        return Err("--rounds must be at least 1".into());
    }
    let decks = super::load_decks(decks)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;
    let outcome = runtime
        .block_on(simulate(players, rounds, seed, decks))
        .map_err(|e| format!("simulation failed: {e}"))?;

    println!(
        "  {} room {} {}",
        "Simulation".bold(),
        outcome.code,
        format!("({players} bots, {rounds} rounds, seed={seed})").dimmed()
    );
    println!();

    for result in &outcome.results {
        let label = match result.consensus_status {
            Consensus::Common => "COMMON".green().bold(),
            Consensus::Partial => "PARTIAL".yellow().bold(),
            Consensus::Nonsensical => "NONSENSICAL".red().bold(),
        };
        println!(
            "  Round {:>2}  {label} {}",
            result.round,
            format!("({}/{} points)", result.earned, result.maximum).dimmed()
        );
    }
    println!();

    println!("  {}", "Leaderboard".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Rank", "Player", "Score"]);
    for (rank, (name, score)) in outcome.leaderboard.iter().enumerate() {
        table.add_row(vec![(rank + 1).to_string(), name.clone(), score.to_string()]);
    }
    println!("{table}");
    println!();

    let status = match outcome.record.status {
        GameStatus::Completed => "completed".green(),
        GameStatus::Incomplete => "incomplete".yellow(),
    };
    println!(
        "  Game {status} after {} of {} rounds",
        outcome.record.rounds_completed, outcome.record.total_rounds
    );

    if export {
        println!();
        println!("  {}", "Game History".bold().underline());
        println!();
        println!("{}", outcome.stats);
        println!();
        print!("{}", outcome.csv);
    }

    Ok(())
}

async fn simulate(players: usize, rounds: u32, seed: u64, decks: Decks) -> NetResult<Outcome> {
    let store = MemoryStore::new();
    let config = HostConfig::default()
        .with_seed(seed)
        .with_round_limit(RoundLimit::Rounds(rounds));
    let mut host = Host::create(store.clone(), config, decks).await?;
    let code = host.code().to_string();

    let (results_tx, mut results_rx) = mpsc::unbounded_channel();
    let result_path = schema::round_result(&code);
    let mut spectator = store.subscribe(&result_path).await?;
    let watcher = tokio::spawn(async move {
        let mut last = 0;
        while let Some(value) = spectator.next().await {
            let Some(record) = value
                .and_then(|v| schema::decode::<RoundResultRecord>(&result_path, v).ok())
            else {
                continue;
            };
            if record.round != last {
                last = record.round;
                if results_tx.send(record).is_err() {
                    break;
                }
            }
        }
    });

    let mut bots = JoinSet::new();
    let mut clients = Vec::with_capacity(players);
    for n in 1..=players {
        clients.push(PlayerClient::join(store.clone(), &code, &format!("Bot {n}")).await?);
    }
    host.start_game().await?;
    for (n, client) in clients.into_iter().enumerate() {
        let rng = StdRng::seed_from_u64(seed.wrapping_add(n as u64 + 1));
        bots.spawn(play_bot(client, rng));
    }

    let record = match tokio::time::timeout(GAME_TIMEOUT, host.run()).await {
        Ok(record) => record?,
        Err(_) => {
            debug!("simulation timed out; closing the room");
            host.finish().await?
        }
    };
    bots.abort_all();

    // Drain what the watcher saw, up to the final round.
    let final_round = host.session().rounds_completed();
    let mut results = Vec::new();
    while results.last().is_none_or(|r: &RoundResultRecord| r.round < final_round) {
        match tokio::time::timeout(Duration::from_secs(1), results_rx.recv()).await {
            Ok(Some(result)) => results.push(result),
            _ => break,
        }
    }
    watcher.abort();

    let session = host.session();
    let leaderboard = session
        .scoreboard()
        .leaderboard()
        .into_iter()
        .map(|(id, score)| {
            let name = session.participant_name(&id).unwrap_or(id.as_str()).to_string();
            (name, score)
        })
        .collect();

    let tracker = HistoryTracker::new(store);
    let csv = tracker.to_csv().await?;
    let stats = tracker.stats().await?;

    Ok(Outcome {
        code,
        record,
        leaderboard,
        results,
        csv,
        stats,
    })
}

async fn play_bot<S: SharedStore>(client: PlayerClient<S>, mut rng: StdRng) -> NetResult<()> {
    let mut rounds = client.rounds().await?;
    while let Some(round) = rounds.next().await {
        let mut answer = Submission::new();
        for attribute in &round.senses {
            let values = &attribute.domain()[1..];
            if let Some(value) = values[..values.len().min(BOT_CHOICES)].choose(&mut rng) {
                answer.set(*attribute, value)?;
            }
        }
        client.submit(&round, &answer).await?;
        debug!(bot = client.name(), round = round.number, "bot answered");
    }
    Ok(())
}
