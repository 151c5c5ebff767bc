//! Step Tutor CLI
//!
//! Interactive terminal front end over the tutoring client library. Streams
//! assistant replies to stdout as they arrive and exposes the session
//! lifecycle through slash commands.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use step_tutor::utils::paths;
use step_tutor::{
    AppError, FileStore, GuidanceMode, LeaderboardService, TopicService, TutorEvent, TutorPhase,
    TutorRepository, TutorService, User,
};
use step_tutor_gateway::{GatewayConfig, HttpGateway};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("step_tutor=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let base_url = std::env::var("STEP_TUTOR_GATEWAY_URL")
        .context("STEP_TUTOR_GATEWAY_URL must be set to the tutoring endpoint URL")?;
    let api_key = std::env::var("STEP_TUTOR_API_KEY").unwrap_or_default();

    let data_dir = paths::ensure_step_tutor_dir()?;
    let store = FileStore::new(&data_dir)
        .with_context(|| format!("could not open data directory {}", data_dir.display()))?;
    let repo = TutorRepository::new(Arc::new(store));

    LeaderboardService::new(repo.clone()).seed_demo_data();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let user = resolve_user(&repo, &mut lines).await?;
    println!("Welcome, {}!", user.name);

    let gateway = Arc::new(HttpGateway::new(GatewayConfig { base_url, api_key }));
    let (events_tx, events_rx) = mpsc::channel(64);
    let tutor = Arc::new(TutorService::new(gateway, repo.clone(), events_tx, user));
    tokio::spawn(print_events(events_rx));

    println!("Commands: /new /practice /end /leaderboard /topics /quit");
    run_repl(&tutor, &repo, &mut lines).await
}

/// Load the resuming user or register a new one.
async fn resolve_user(
    repo: &TutorRepository,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<User> {
    if let Some(user) = repo.current_user() {
        return Ok(user);
    }
    let name = loop {
        let line = prompt("Your name: ", lines).await?;
        if !line.is_empty() {
            break line;
        }
    };
    let user = repo.create_user(name);
    repo.set_current_user(&user.id);
    Ok(user)
}

/// Render orchestrator events as they arrive.
async fn print_events(mut events: mpsc::Receiver<TutorEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            TutorEvent::AssistantDelta { content, .. } => {
                print!("{content}");
                let _ = std::io::stdout().flush();
            }
            TutorEvent::AssistantDone { .. } => println!(),
            TutorEvent::TopicDetected { topic, .. } => {
                println!("\n  (topic: {topic})");
            }
            TutorEvent::SessionCompleted { .. } => {
                println!("  Problem solved!");
            }
            TutorEvent::Celebration {
                points,
                previous_rank,
                new_rank,
            } => {
                println!("  +{points} points! Rank {previous_rank} -> {new_rank}");
            }
            TutorEvent::Notice { message } => eprintln!("  ! {message}"),
        }
    }
}

async fn run_repl(
    tutor: &Arc<TutorService>,
    repo: &TutorRepository,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    loop {
        let input = match tutor.phase() {
            TutorPhase::ModeSelection => {
                let line = prompt("mode (guided/soft)> ", lines).await?;
                match line.as_str() {
                    "/quit" => return Ok(()),
                    "guided" => {
                        report(tutor.select_mode(GuidanceMode::Guided));
                        continue;
                    }
                    "soft" => {
                        report(tutor.select_mode(GuidanceMode::Soft));
                        continue;
                    }
                    _ => {
                        println!("Pick guided (step by step) or soft (auto-advancing).");
                        continue;
                    }
                }
            }
            TutorPhase::ProblemIntake => prompt("problem> ", lines).await?,
            TutorPhase::Tutoring => prompt("you> ", lines).await?,
            TutorPhase::Completed => prompt("done (/new /practice /end)> ", lines).await?,
        };
        if input.is_empty() {
            continue;
        }

        match input.split_whitespace().next().unwrap_or_default() {
            "/quit" => return Ok(()),
            "/leaderboard" => print_leaderboard(repo),
            "/topics" => print_topics(repo),
            "/new" => report(tutor.start_new_problem()),
            "/practice" => {
                if tutor.phase() == TutorPhase::Completed {
                    report(tutor.practice_similar().await);
                } else if let Some(topic) = input.strip_prefix("/practice").map(str::trim) {
                    if topic.is_empty() {
                        let topics = TopicService::new(repo.clone()).available_topics();
                        if topics.is_empty() {
                            println!("No topics seen yet. Usage: /practice <topic>");
                        } else {
                            println!("Topics: {}", topics.join(", "));
                        }
                    } else {
                        report(tutor.start_practice(topic.to_string()).await);
                    }
                }
            }
            "/end" => report(tutor.end_session()),
            _ if input.starts_with('/') => println!("Unknown command: {input}"),
            _ => match tutor.phase() {
                TutorPhase::ProblemIntake => report(tutor.start_with_text(input).await),
                TutorPhase::Tutoring => report(tutor.send_message(input).await),
                _ => {}
            },
        }
    }
}

async fn prompt(text: &str, lines: &mut Lines<BufReader<Stdin>>) -> Result<String> {
    print!("{text}");
    std::io::stdout().flush()?;
    let line = lines
        .next_line()
        .await?
        .context("stdin closed")?;
    Ok(line.trim().to_string())
}

/// Print a user-facing notice for failures; successes are silent.
fn report<T>(result: std::result::Result<T, AppError>) {
    if let Err(err) = result {
        eprintln!("  ! {}", err.user_message());
    }
}

fn print_leaderboard(repo: &TutorRepository) {
    let service = LeaderboardService::new(repo.clone());
    for (position, entry) in service.leaderboard().iter().enumerate() {
        println!("  {:>2}. {:<20} {:>6}", position + 1, entry.user_name, entry.score);
    }
}

fn print_topics(repo: &TutorRepository) {
    let service = TopicService::new(repo.clone());
    let Some(user) = repo.current_user() else {
        println!("  No registered user.");
        return;
    };
    let stats = service.user_topic_stats(&user.id);
    if stats.is_empty() {
        println!("  No topics yet.");
        return;
    }
    for entry in &stats {
        println!(
            "  {:<24} {}/{} correct",
            entry.topic, entry.correctly_answered, entry.total_questions
        );
    }
    let (correct, total, percent) = service.overall_accuracy(&user.id);
    println!("  Overall: {correct}/{total} ({percent}%)");
}
