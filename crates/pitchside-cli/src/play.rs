//! The line-oriented game loop behind `pitchside play`.

use std::{path::Path, sync::Arc};

use anyhow::{Context as _, bail};
use pitchside_core::{
  gateway::SyncTrigger,
  matcher::normalize,
  puzzle::{PlayerRef, PuzzleContent},
  session::{
    FormationGame, GameMachine, GameResult, GuessOutcome, LinkChainGame, RecallGame, Session,
    SlotGuess,
  },
  sync::Syncer,
};
use pitchside_remote::RemoteClient;
use pitchside_store_sqlite::SqliteStore;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::settings::AppConfig;

type Store = SqliteStore;

/// Seconds between printed clock updates.
const CLOCK_EVERY: u32 = 10;

pub async fn run(
  puzzle_path: &Path,
  cfg: &AppConfig,
  store: Arc<Store>,
  remote: Option<RemoteClient>,
) -> anyhow::Result<()> {
  let raw = std::fs::read_to_string(puzzle_path)
    .with_context(|| format!("reading puzzle file {}", puzzle_path.display()))?;
  let content: PuzzleContent = serde_json::from_str(&raw).context("parsing puzzle file")?;
  content.validate()?;

  let syncer = remote
    .clone()
    .map(|remote| Arc::new(Syncer::new(Arc::clone(&store), remote, cfg.sync_policy())));
  // Starting a game counts as coming to the foreground.
  if let Some(syncer) = &syncer {
    syncer.request_sync();
  }
  let trigger = syncer.clone().map(|s| s as Arc<dyn SyncTrigger>);
  let options = cfg.session_options();

  match content {
    PuzzleContent::Recall(puzzle) => {
      let session = Session::mount(RecallGame::new(puzzle)?, store, options).await;
      play(attach(session, trigger), RecallFrontend).await?;
    }
    PuzzleContent::Formation(puzzle) => {
      let session = Session::mount(FormationGame::new(puzzle)?, store, options).await;
      play(attach(session, trigger), FormationFrontend { selected: None }).await?;
    }
    PuzzleContent::LinkChain(puzzle) => {
      let Some(remote) = remote else {
        bail!("link puzzles need remote.base_url to check links");
      };
      let session = Session::mount(LinkChainGame::new(puzzle)?, store, options).await;
      play(attach(session, trigger), LinkFrontend { remote }).await?;
    }
  }

  if let Some(syncer) = syncer {
    syncer.on_foreground().await;
  }
  Ok(())
}

fn attach<M: GameMachine>(
  session: Session<M, Store>,
  trigger: Option<Arc<dyn SyncTrigger>>,
) -> Session<M, Store> {
  match trigger {
    Some(trigger) => session.with_sync_trigger(trigger),
    None => session,
  }
}

// ─── Loop ────────────────────────────────────────────────────────────────────

/// How one game mode turns input lines into guesses and draws its board.
trait Frontend<M: GameMachine> {
  fn render(&self, game: &M);

  /// Handle a non-command line; returns the guess outcome if one was made.
  async fn submit(&mut self, session: &mut Session<M, Store>, line: &str) -> Option<GuessOutcome>;

  /// Mode-specific `:command`; returns `false` if unknown.
  fn command(&mut self, _game: &M, _command: &str, _arg: &str) -> bool { false }
}

async fn play<M, F>(mut session: Session<M, Store>, mut frontend: F) -> anyhow::Result<()>
where
  M: GameMachine,
  F: Frontend<M>,
{
  if session.restored() {
    println!("Resuming your attempt ({} found so far).", session.machine().found_count());
    session.resume_clock();
  } else {
    session.start();
  }
  frontend.render(session.machine());
  print_clock(session.time_remaining());

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  while session.machine().core().is_playing() {
    tokio::select! {
      line = lines.next_line() => {
        let Some(line) = line.context("reading stdin")? else { break };
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        match command {
          "" => {}
          ":quit" => break,
          ":giveup" => session.give_up(),
          ":undo" => {
            session.undo_last();
            frontend.render(session.machine());
          }
          _ if command.starts_with(':') => {
            if !frontend.command(session.machine(), command, arg.trim()) {
              println!("Commands: :slot N, :undo, :giveup, :quit");
            }
          }
          _ => {
            let outcome = frontend.submit(&mut session, line).await;
            print_outcome(outcome);
            if outcome == Some(GuessOutcome::Correct) {
              frontend.render(session.machine());
            }
            session.dismiss_outcome();
          }
        }
      }
      remaining = session.next_tick() => {
        if remaining % CLOCK_EVERY == 0 {
          print_clock(Some(remaining));
        }
      }
    }
  }

  match session.result() {
    Some(result) => print_result(&result),
    None => println!("Progress saved; run the same puzzle again to pick up where you left off."),
  }
  session.teardown().wait().await;
  Ok(())
}

fn print_clock(remaining: Option<u32>) {
  if let Some(secs) = remaining {
    println!("[{}:{:02} left]", secs / 60, secs % 60);
  }
}

fn print_outcome(outcome: Option<GuessOutcome>) {
  match outcome {
    Some(GuessOutcome::Correct) => println!("Correct!"),
    Some(GuessOutcome::Incorrect) => println!("Not quite."),
    Some(GuessOutcome::Duplicate) => println!("You already have that one."),
    Some(GuessOutcome::WrongSlot { slot }) => println!("Right name, but not for slot {slot}."),
    None => {}
  }
}

fn print_result(result: &GameResult) {
  let score = &result.score;
  println!();
  println!("{}: {}", score.label, score.display);
  println!("{} points ({})", score.points, if score.won { "won" } else { result.status.as_ref() });
}

// ─── Recall ──────────────────────────────────────────────────────────────────

struct RecallFrontend;

impl Frontend<RecallGame> for RecallFrontend {
  fn render(&self, game: &RecallGame) {
    let puzzle = game.puzzle();
    println!(
      "{} v {}: name the {} goalscorers.",
      puzzle.home_team,
      puzzle.away_team,
      game.total()
    );
    let found = game.found_scorers();
    if !found.is_empty() {
      println!("Found: {}", found.join(", "));
    }
  }

  async fn submit(&mut self, session: &mut Session<RecallGame, Store>, line: &str) -> Option<GuessOutcome> {
    session.guess(line.to_owned())
  }
}

// ─── Formation ───────────────────────────────────────────────────────────────

struct FormationFrontend {
  selected: Option<usize>,
}

impl Frontend<FormationGame> for FormationFrontend {
  fn render(&self, game: &FormationGame) {
    let puzzle = game.puzzle();
    println!("{} ({})", puzzle.team, puzzle.formation);
    for (idx, slot) in game.slots().iter().enumerate() {
      let name = if game.is_revealed(idx) { slot.player.as_str() } else { "???" };
      let marker = if self.selected == Some(idx) { ">" } else { " " };
      println!("{marker}{idx:>2} {:<4} {name}", slot.position);
    }
  }

  async fn submit(&mut self, session: &mut Session<FormationGame, Store>, line: &str) -> Option<GuessOutcome> {
    let Some(slot) = self.selected else {
      println!("Pick a slot first with :slot N.");
      return None;
    };
    let outcome = session.guess(SlotGuess::new(slot, line));
    if outcome == Some(GuessOutcome::Correct) {
      self.selected = None;
    }
    outcome
  }

  fn command(&mut self, game: &FormationGame, command: &str, arg: &str) -> bool {
    if command != ":slot" {
      return false;
    }
    match arg.parse::<usize>() {
      Ok(idx) if game.slots().get(idx).is_some_and(|s| s.hidden) && !game.is_revealed(idx) => {
        self.selected = Some(idx);
        println!("Slot {idx} ({}) selected.", game.slots()[idx].position);
      }
      _ => println!("Slot must be the number of a hidden, unnamed position."),
    }
    true
  }
}

// ─── Link chain ──────────────────────────────────────────────────────────────

struct LinkFrontend {
  remote: RemoteClient,
}

/// `id=Name`, or a bare name whose normalised form is the id.
fn parse_player(line: &str) -> Option<PlayerRef> {
  let (id, name) = match line.split_once('=') {
    Some((id, name)) => (id.trim().to_owned(), name.trim()),
    None => (normalize(line), line.trim()),
  };
  (!id.is_empty() && !name.is_empty()).then(|| PlayerRef { id, name: name.to_owned() })
}

impl Frontend<LinkChainGame> for LinkFrontend {
  fn render(&self, game: &LinkChainGame) {
    let chain: Vec<String> = game
      .chain()
      .iter()
      .map(|link| match link.via.as_ref().and_then(|via| via.name.as_deref()) {
        Some(club) => format!("({club}) {}", link.player.name),
        None => link.player.name.clone(),
      })
      .collect();
    let end = &game.puzzle().end;
    if game.tail().id == end.id {
      println!("{}", chain.join(" -> "));
    } else {
      println!("{} -> ... -> {}  (par {})", chain.join(" -> "), end.name, game.puzzle().par);
    }
  }

  async fn submit(&mut self, session: &mut Session<LinkChainGame, Store>, line: &str) -> Option<GuessOutcome> {
    let Some(candidate) = parse_player(line) else {
      println!("Enter a player as `id=Name` or just a name.");
      return None;
    };
    println!("Checking {}...", candidate.name);
    session.submit_link(&self.remote, candidate).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn players_parse_with_or_without_ids() {
    let explicit = parse_player("p-1042 = Xabi Alonso").unwrap();
    assert_eq!(explicit.id, "p-1042");
    assert_eq!(explicit.name, "Xabi Alonso");

    let bare = parse_player("  Kaká ").unwrap();
    assert_eq!(bare.id, "kaka");
    assert_eq!(bare.name, "Kaká");

    assert!(parse_player("=Nobody").is_none());
    assert!(parse_player("   ").is_none());
  }
}
