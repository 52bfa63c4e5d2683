//! Headless mode for the Love Simulator.
//!
//! This module provides a simple text-based interface for running the game
//! without a TUI. It drives the same engine as the TUI and is designed for
//! scripting and automated testing.

use lovesim_api::RankingFilter;
use lovesim_core::{
    AchievementTracker, EngineError, GameEngine, Outcome, PlayStatistics, Progress, SaveStore,
    Scene, ScenarioBackend,
};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// How the headless session begins.
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub scenario: String,
    /// Resume the saved game instead of starting a new one.
    pub resume: bool,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            scenario: "female-friend".to_string(),
            resume: false,
        }
    }
}

/// Whether to keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Quit,
}

pub struct HeadlessGame<B, S> {
    engine: GameEngine<B, S>,
    achievements: Arc<Mutex<AchievementTracker>>,
    stats: Arc<Mutex<PlayStatistics>>,
}

impl<B: ScenarioBackend, S: SaveStore> HeadlessGame<B, S> {
    pub async fn new(mut engine: GameEngine<B, S>) -> Self {
        let stats = Arc::new(Mutex::new(PlayStatistics::load(engine.save_store()).await));
        let achievements = Arc::new(Mutex::new(AchievementTracker::new()));
        engine.subscribe(Arc::clone(&stats));
        engine.subscribe(Arc::clone(&achievements));

        Self {
            engine,
            achievements,
            stats,
        }
    }

    pub fn engine(&self) -> &GameEngine<B, S> {
        &self.engine
    }

    /// Start or resume according to `options` and print the first scene.
    pub async fn begin<W: Write>(&mut self, options: &HeadlessOptions, out: &mut W) -> io::Result<()> {
        if options.resume {
            match self.engine.resume_saved().await {
                Ok(progress) => {
                    writeln!(out, "[RESUMED] Continuing your saved game")?;
                    return self.report(&progress, out).await;
                }
                Err(e) => writeln!(out, "[INFO] {e}, starting a new game")?,
            }
        }
        self.start(&options.scenario, out).await
    }

    async fn start<W: Write>(&mut self, scenario: &str, out: &mut W) -> io::Result<()> {
        let title = self.engine.catalog().title_for(scenario).to_string();
        writeln!(out, "[START] {title}")?;
        let progress = self.engine.start_new_game(scenario).await;
        self.report(&progress, out).await
    }

    /// Handle one line of input.
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<LineOutcome> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(LineOutcome::Continue);
        }

        if let Some(command) = line.strip_prefix('#') {
            let (name, rest) = match command.split_once(char::is_whitespace) {
                Some((name, rest)) => (name, rest.trim()),
                None => (command, ""),
            };
            match name {
                "quit" | "exit" => {
                    writeln!(out, "Goodbye!")?;
                    return Ok(LineOutcome::Quit);
                }
                "status" => self.print_status(out)?,
                "pause" => self.toggle_pause(out)?,
                "rank" => self.submit_ranking(rest, out).await?,
                "rankings" => self.print_rankings(rest, out).await?,
                "scenarios" => self.print_scenarios(out).await?,
                "new" => {
                    let scenario = if rest.is_empty() {
                        self.engine
                            .session()
                            .map(|s| s.scenario_id().to_string())
                            .unwrap_or_else(|| HeadlessOptions::default().scenario)
                    } else {
                        rest.to_string()
                    };
                    self.start(&scenario, out).await?;
                }
                "stats" => self.print_stats(out)?,
                "help" => print_help(out)?,
                _ => writeln!(out, "[ERROR] Unknown command. Type #help for help.")?,
            }
            out.flush()?;
            return Ok(LineOutcome::Continue);
        }

        match line.parse::<usize>() {
            Ok(number) if number >= 1 => match self.engine.choose(number - 1).await {
                Ok(progress) => self.report(&progress, out).await?,
                Err(EngineError::InvalidChoice { available, .. }) => {
                    writeln!(out, "[ERROR] Pick a choice between 1 and {available}")?
                }
                Err(e) => writeln!(out, "[ERROR] {e}")?,
            },
            _ => writeln!(
                out,
                "[ERROR] Enter a choice number or a #command. Type #help for help."
            )?,
        }
        out.flush()?;
        Ok(LineOutcome::Continue)
    }

    async fn report<W: Write>(&mut self, progress: &Progress, out: &mut W) -> io::Result<()> {
        self.print_achievements(out)?;
        match progress {
            Progress::Continue(scene) => {
                let favorability = self
                    .engine
                    .session()
                    .map(|s| s.favorability().value())
                    .unwrap_or_default();
                print_scene(scene, out)?;
                writeln!(out, "[FAVORABILITY] {favorability}")?;
            }
            Progress::Finished(outcome) => {
                print_outcome(outcome, out)?;
                self.save_stats().await;
            }
        }
        Ok(())
    }

    fn print_achievements<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let unlocked = match self.achievements.lock() {
            Ok(mut tracker) => tracker.take_new(),
            Err(_) => Vec::new(),
        };
        for achievement in unlocked {
            writeln!(
                out,
                "[ACHIEVEMENT] {}: {}",
                achievement.title(),
                achievement.description()
            )?;
        }
        Ok(())
    }

    async fn save_stats(&self) {
        let snapshot = match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(_) => return,
        };
        if let Err(e) = snapshot.save(self.engine.save_store()).await {
            warn!(error = %e, "failed to save statistics");
        }
    }

    fn print_status<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Some(session) = self.engine.session() else {
            return writeln!(out, "[STATUS] No game in progress");
        };
        writeln!(out, "[STATUS]")?;
        writeln!(
            out,
            "  Scenario: {} ({})",
            self.engine.catalog().title_for(session.scenario_id()),
            session.scenario_id()
        )?;
        writeln!(out, "  Scene: {}", session.current_scene_id())?;
        writeln!(out, "  Favorability: {}", session.favorability())?;
        writeln!(out, "  Choices made: {}", session.history().len())?;
        writeln!(
            out,
            "  Paused: {}",
            if session.is_paused() { "yes" } else { "no" }
        )?;
        writeln!(out, "  Phase: {:?}", self.engine.phase())
    }

    fn toggle_pause<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let result = if self.engine.is_paused() {
            self.engine.resume().map(|()| "[RESUMED]")
        } else {
            self.engine.pause().map(|()| "[PAUSED]")
        };
        match result {
            Ok(tag) => writeln!(out, "{tag}"),
            Err(e) => writeln!(out, "[ERROR] {e}"),
        }
    }

    async fn submit_ranking<W: Write>(&mut self, nickname: &str, out: &mut W) -> io::Result<()> {
        match self.engine.submit_ranking(nickname).await {
            Ok(receipt) => {
                write!(out, "[RANKED] #{}", receipt.rank)?;
                match receipt.message {
                    Some(message) => writeln!(out, " {message}"),
                    None => writeln!(out),
                }
            }
            Err(EngineError::Api(e)) => match e.server_message() {
                Some(message) => writeln!(out, "[ERROR] {message}"),
                None => writeln!(out, "[ERROR] {e}"),
            },
            Err(e @ EngineError::Validation(_)) => writeln!(out, "[WARNING] {e}"),
            Err(e) => writeln!(out, "[ERROR] {e}"),
        }
    }

    async fn print_rankings<W: Write>(&self, arg: &str, out: &mut W) -> io::Result<()> {
        let filter = match (arg, self.engine.session()) {
            ("all", _) | (_, None) => None,
            (_, Some(session)) => Some(RankingFilter::for_scenario(
                self.engine.catalog().title_for(session.scenario_id()),
            )),
        };

        match self.engine.rankings(filter.as_ref()).await {
            Ok(entries) => {
                match &filter {
                    Some(f) => writeln!(out, "[RANKINGS] {}", f.scenario_title)?,
                    None => writeln!(out, "[RANKINGS] All scenarios")?,
                }
                if entries.is_empty() {
                    writeln!(out, "  (no entries yet)")?;
                }
                for (i, entry) in entries.iter().enumerate() {
                    writeln!(
                        out,
                        "  {:>2}. {} - {} ({})",
                        i + 1,
                        entry.nickname,
                        entry.score,
                        entry.scenario_title
                    )?;
                }
                Ok(())
            }
            Err(e) => writeln!(out, "[ERROR] {e}"),
        }
    }

    async fn print_scenarios<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "[SCENARIOS]")?;
        for scenario in self.engine.scenarios().await {
            match &scenario.description {
                Some(description) => writeln!(
                    out,
                    "  {} - {}: {}",
                    scenario.name, scenario.title, description
                )?,
                None => writeln!(out, "  {} - {}", scenario.name, scenario.title)?,
            }
        }
        Ok(())
    }

    fn print_stats<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Ok(stats) = self.stats.lock() else {
            return Ok(());
        };
        writeln!(out, "[STATS]")?;
        writeln!(out, "  Games played: {}", stats.games_played)?;
        writeln!(out, "  Highest score: {}", stats.highest_score)?;
        writeln!(out, "  Total choices: {}", stats.total_choices)?;
        writeln!(out, "  Total play time: {}s", stats.total_play_time_secs)?;
        writeln!(
            out,
            "  Completed scenarios: {}",
            stats.completed_scenarios.join(", ")
        )
    }
}

fn print_scene<W: Write>(scene: &Scene, out: &mut W) -> io::Result<()> {
    match &scene.character_mood {
        Some(mood) => writeln!(out, "[SCENE] ({mood})")?,
        None => writeln!(out, "[SCENE]")?,
    }
    writeln!(out, "{}", scene.ai_line)?;
    writeln!(out, "[CHOICES]")?;
    for (i, choice) in scene.user_cards.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, choice.text)?;
    }
    Ok(())
}

fn print_outcome<W: Write>(outcome: &Outcome, out: &mut W) -> io::Result<()> {
    if let Some(scene) = &outcome.final_scene {
        writeln!(out, "[SCENE]")?;
        writeln!(out, "{}", scene.ai_line)?;
    }
    if let lovesim_core::EndReason::LoadFailed(message) = &outcome.reason {
        writeln!(out, "[WARNING] The story could not continue: {message}")?;
    }

    let result = &outcome.result;
    writeln!(out, "[END] {}", result.title)?;
    writeln!(out, "  Score: {}", result.score)?;
    writeln!(out, "  {}", result.advice)?;
    if let Some(best) = &result.best_choice {
        writeln!(out, "  Best choice: \"{}\" (+{})", best.text, best.favorability_delta)?;
    }
    if let Some(worst) = &result.worst_choice {
        writeln!(out, "  Worst choice: \"{}\" ({})", worst.text, worst.favorability_delta)?;
    }
    writeln!(
        out,
        "  Play time: {}s, choices: {}",
        result.play_time_secs, result.choices_count
    )?;
    writeln!(out, "Submit your score with #rank <nickname>, or #new to play again.")
}

fn print_help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "[HELP]")?;
    writeln!(out, "  1..n              - Pick a choice")?;
    writeln!(out, "  #status           - Show current game status")?;
    writeln!(out, "  #pause            - Pause or resume")?;
    writeln!(out, "  #rank <nickname>  - Submit a finished game to the leaderboard")?;
    writeln!(out, "  #rankings [all]   - Show the leaderboard")?;
    writeln!(out, "  #scenarios        - List scenarios")?;
    writeln!(out, "  #new [scenario]   - Start a new game")?;
    writeln!(out, "  #stats            - Show play statistics")?;
    writeln!(out, "  #quit             - Exit the game")?;
    writeln!(out, "  #help             - Show this help")
}

/// Run the game in headless mode on stdin/stdout.
///
/// This provides a simple line-oriented protocol:
/// - Numbers pick a choice of the current scene
/// - Lines starting with `#` are commands
/// - Output lines are tagged (`[SCENE]`, `[CHOICES]`, `[END]`, `[ERROR]`, ...)
pub async fn run_headless<B: ScenarioBackend, S: SaveStore>(
    engine: GameEngine<B, S>,
    options: HeadlessOptions,
) -> io::Result<()> {
    let mut game = HeadlessGame::new(engine).await;
    let mut stdout = io::stdout();

    writeln!(stdout, "=== Love Simulator Headless Mode ===")?;
    writeln!(stdout, "Type #help for commands.")?;
    writeln!(stdout)?;
    game.begin(&options, &mut stdout).await?;
    stdout.flush()?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };
        if game.handle_line(&line, &mut stdout).await? == LineOutcome::Quit {
            break;
        }
    }

    Ok(())
}

/// Parse headless options from command line arguments.
pub fn parse_options_from_args(args: &[String]) -> HeadlessOptions {
    let mut options = HeadlessOptions::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                if let Some(scenario) = args.get(i + 1) {
                    options.scenario = scenario.clone();
                    i += 1;
                }
            }
            "--continue" => options.resume = true,
            _ => {}
        }
        i += 1;
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovesim_core::testing::{ending, scene, MockFailure};
    use lovesim_core::{Choice, GameRules, MemorySaveStore, MockBackend};

    fn backend() -> MockBackend {
        MockBackend::new()
            .with_scene(
                "teacher",
                1,
                scene(
                    "Any questions before the exam?",
                    vec![
                        Choice::new("Could you explain attention again?", 20, 2),
                        Choice::new("No, I'm good", -5, 2),
                    ],
                ),
            )
            .with_scene("teacher", 2, ending("Good luck tomorrow."))
    }

    async fn game(backend: MockBackend) -> HeadlessGame<MockBackend, MemorySaveStore> {
        let engine = GameEngine::new(backend, MemorySaveStore::new(), GameRules::default());
        HeadlessGame::new(engine).await
    }

    fn teacher() -> HeadlessOptions {
        HeadlessOptions {
            scenario: "teacher".into(),
            resume: false,
        }
    }

    async fn send(game: &mut HeadlessGame<MockBackend, MemorySaveStore>, line: &str) -> String {
        let mut out = Vec::new();
        game.handle_line(line, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_play_through() {
        let mut game = game(backend()).await;
        let mut out = Vec::new();
        game.begin(&teacher(), &mut out).await.unwrap();
        let start = String::from_utf8(out).unwrap();
        assert!(start.contains("[START] 김민수 선생님의 최애가 되기"));
        assert!(start.contains("  1. Could you explain attention again?"));
        assert!(start.contains("[FAVORABILITY] 50"));

        let end = send(&mut game, "1").await;
        assert!(end.contains("[ACHIEVEMENT] First Step"));
        assert!(end.contains("Good luck tomorrow."));
        assert!(end.contains("[END]"));
        assert!(end.contains("Score: 70"));

        let ranked = send(&mut game, "#rank 민수팬").await;
        assert_eq!(ranked.trim(), "[RANKED] #1 Ranking registered");
    }

    #[tokio::test]
    async fn test_bad_input() {
        let mut game = game(backend()).await;
        game.begin(&teacher(), &mut Vec::new()).await.unwrap();

        assert!(send(&mut game, "7").await.contains("between 1 and 2"));
        assert!(send(&mut game, "0").await.starts_with("[ERROR]"));
        assert!(send(&mut game, "hello").await.starts_with("[ERROR]"));
        assert!(send(&mut game, "#dance").await.contains("Unknown command"));
        assert!(send(&mut game, "#rank me").await.contains("not ended"));
    }

    #[tokio::test]
    async fn test_status_and_pause() {
        let mut game = game(backend()).await;
        game.begin(&teacher(), &mut Vec::new()).await.unwrap();

        assert_eq!(send(&mut game, "#pause").await.trim(), "[PAUSED]");
        let status = send(&mut game, "#status").await;
        assert!(status.contains("Favorability: 50"));
        assert!(status.contains("Paused: yes"));
        assert_eq!(send(&mut game, "#pause").await.trim(), "[RESUMED]");
    }

    #[tokio::test]
    async fn test_rejected_ranking_shows_server_message() {
        let backend = backend().with_submit_failure(MockFailure::Status {
            status: 400,
            message: "invalid score".into(),
        });
        let mut game = game(backend).await;
        game.begin(&teacher(), &mut Vec::new()).await.unwrap();
        send(&mut game, "2").await;

        assert_eq!(send(&mut game, "#rank player").await.trim(), "[ERROR] invalid score");
        assert!(send(&mut game, "#rank x").await.starts_with("[WARNING] Nickname"));
    }

    #[tokio::test]
    async fn test_resume_without_save_starts_new_game() {
        let mut game = game(backend()).await;
        let mut out = Vec::new();
        let options = HeadlessOptions {
            resume: true,
            ..teacher()
        };
        game.begin(&options, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[INFO] No saved game to resume"));
        assert!(text.contains("[START]"));
    }

    #[tokio::test]
    async fn test_quit() {
        let mut game = game(backend()).await;
        let outcome = game.handle_line("#quit", &mut Vec::new()).await.unwrap();
        assert_eq!(outcome, LineOutcome::Quit);
    }

    #[test]
    fn test_parse_options() {
        let args: Vec<String> = ["lovesim", "--headless", "--scenario", "male-friend", "--continue"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let options = parse_options_from_args(&args);
        assert_eq!(options.scenario, "male-friend");
        assert!(options.resume);
    }
}
