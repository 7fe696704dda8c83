//! Fablegen - batch illustration engine for illustrated storybook projects
//!
//! A configuration-driven layer over a hosted text-to-image API:
//! - Hero shots (single character references)
//! - Group shots (multiple characters)
//! - Scene/page illustrations and book covers
//! - Sequential rate-limited batches with partial-failure tolerance
//! - A companion JSON dashboard (`fablegen serve`)

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::application::dto::{BatchSummary, GenerationResult};
use crate::application::services::{
    BatchOrchestrator, BookBatchRequest, CoverRequest, GenerationEngine, GroupShotRequest,
    HeroShotRequest, SceneRequest,
};
use crate::cli::{Cli, Command};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::config_store::ConfigStore;
use crate::infrastructure::flux::FluxClient;
use crate::infrastructure::http;
use crate::infrastructure::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fablegen=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(path) = &cli.config {
        config.config_path = path.clone();
    }

    match cli.command {
        Command::Hero {
            character_id,
            all,
            characters,
            reference,
            location,
            output,
        } => {
            let store = load_store(&config)?;
            let engine = build_engine(&config, &store)?;
            if all {
                let ids = if characters.is_empty() {
                    None
                } else {
                    Some(characters)
                };
                let results = BatchOrchestrator::new(&engine, &store)
                    .all_hero_shots(reference.as_deref(), ids)
                    .await;
                report_batch(&results)?;
            } else {
                let character_id = character_id.context("character id is required without --all")?;
                let result = engine
                    .hero_shot(
                        &store,
                        HeroShotRequest {
                            character_id,
                            reference_image: reference,
                            location_id: location,
                            custom_prompt: None,
                            output_name: output,
                        },
                    )
                    .await;
                report_single(&result)?;
            }
        }

        Command::Group {
            character_ids,
            reference,
            location,
            output,
        } => {
            let store = load_store(&config)?;
            let engine = build_engine(&config, &store)?;
            let result = engine
                .group_shot(
                    &store,
                    GroupShotRequest {
                        character_ids,
                        reference_image: reference,
                        location_id: location,
                        custom_prompt: None,
                        output_name: output,
                    },
                )
                .await;
            report_single(&result)?;
        }

        Command::Scene {
            prompt,
            characters,
            reference,
            location,
            output,
            notes,
        } => {
            let store = load_store(&config)?;
            let engine = build_engine(&config, &store)?;
            let result = engine
                .scene(
                    &store,
                    SceneRequest {
                        scene_prompt: prompt,
                        character_ids: characters,
                        reference_image: reference,
                        location_id: location,
                        output_name: output,
                        output_dir: None,
                        additional_notes: notes,
                    },
                )
                .await;
            report_single(&result)?;
        }

        Command::Cover {
            book_id,
            reference,
            output,
        } => {
            let store = load_store(&config)?;
            let engine = build_engine(&config, &store)?;
            let result = engine
                .cover(
                    &store,
                    CoverRequest {
                        book_id,
                        reference_image: reference,
                        custom_prompt: None,
                        output_name: output,
                        output_dir: None,
                    },
                )
                .await;
            report_single(&result)?;
        }

        Command::Book {
            book_id,
            reference,
            pages,
            no_cover,
        } => {
            let store = load_store(&config)?;
            let engine = build_engine(&config, &store)?;
            let results = BatchOrchestrator::new(&engine, &store)
                .book(BookBatchRequest {
                    book_id: book_id.clone(),
                    reference_image: reference,
                    include_cover: !no_cover,
                    page_range: pages,
                })
                .await;
            if results.is_empty() {
                anyhow::bail!("nothing to generate for book '{book_id}' (unknown id or no scenes)");
            }
            report_batch(&results)?;
        }

        Command::List { kind } => {
            let store = load_store(&config)?;
            list_entities(&store, &kind)?;
        }

        Command::Config {
            summary,
            get,
            set,
            style,
            export,
        } => {
            let mut store = load_store(&config)?;
            let mut handled = false;

            if let Some(path) = get {
                match store.get_value(&path) {
                    Some(value) => println!("{value}"),
                    None => println!("(not set)"),
                }
                handled = true;
            }
            if let Some((path, value)) = set {
                store.set_value(&path, value)?;
                store.save(None)?;
                println!("Set {path}");
                handled = true;
            }
            if let Some(style_id) = style {
                if !store.set_active_style(&style_id) {
                    anyhow::bail!("unknown style preset: {style_id}");
                }
                store.save(None)?;
                let name = store
                    .style_preset(&style_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| style_id.clone());
                println!("Active style: {style_id} ({name})");
                handled = true;
            }
            if export {
                println!("{}", serde_json::to_string_pretty(&store.export())?);
                handled = true;
            }
            if summary || !handled {
                print_summary(&store);
            }
        }

        Command::Serve { port } => {
            let store = load_store(&config)?;
            let client = FluxClient::from_env(&config.synthesis_base_url, store.api_model())?;
            let port = port.unwrap_or(config.server_port);
            let state = Arc::new(AppState::new(config, store, Arc::new(client)));

            let app = http::create_routes()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(TraceLayer::new_for_http())
                .with_state(state);

            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            tracing::info!("Listening on {}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

fn load_store(config: &AppConfig) -> anyhow::Result<ConfigStore> {
    ConfigStore::load(&config.config_path)
        .with_context(|| format!("loading project configuration from {}", config.config_path))
}

fn build_engine(config: &AppConfig, store: &ConfigStore) -> anyhow::Result<GenerationEngine> {
    let client = FluxClient::from_env(&config.synthesis_base_url, store.api_model())?;
    Ok(GenerationEngine::new(
        Arc::new(client),
        config.persist_outputs,
    ))
}

fn report_single(result: &GenerationResult) -> anyhow::Result<()> {
    if !result.success {
        anyhow::bail!(
            "generation failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    if let Some(url) = &result.image_url {
        println!("Image: {url}");
    }
    if let Some(path) = &result.output_path {
        println!("Saved: {}", path.display());
    }
    println!(
        "Cost: ${:.2} | Time: {:.1}s",
        result.cost,
        result.generation_time.as_secs_f64()
    );
    Ok(())
}

fn report_batch(results: &[GenerationResult]) -> anyhow::Result<()> {
    for result in results {
        match &result.error {
            None => {
                let target = result
                    .output_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .or_else(|| result.image_url.clone())
                    .unwrap_or_default();
                println!("  ok   {target}");
            }
            Some(error) => println!("  FAIL {error}"),
        }
    }

    let summary = BatchSummary::from_results(results);
    println!(
        "Complete: {}/{} generated | Total cost: ${:.2}",
        summary.successful, summary.attempted, summary.total_cost
    );
    if summary.attempted > 0 && summary.successful == 0 {
        anyhow::bail!("all generations failed");
    }
    Ok(())
}

fn list_entities(store: &ConfigStore, kind: &str) -> anyhow::Result<()> {
    let all = kind == "all";
    let mut matched = all;

    if all || kind == "characters" {
        matched = true;
        println!("Characters:");
        for character in store.characters() {
            println!("  {} - {} ({})", character.id, character.name, character.role);
        }
    }
    if all || kind == "locations" {
        matched = true;
        println!("Locations:");
        for location in store.locations() {
            println!("  {} - {}", location.id, location.name);
        }
    }
    if all || kind == "books" {
        matched = true;
        println!("Books:");
        for book in store.books() {
            println!(
                "  {} - Book {}: {} ({})",
                book.id, book.book_number, book.title, book.virtue
            );
        }
    }
    if all || kind == "styles" {
        matched = true;
        println!("Styles:");
        let active = store.active_style();
        for style in store.style_presets() {
            let marker = if style.id == active { " *" } else { "" };
            println!("  {} - {}{marker}", style.id, style.name);
        }
    }

    if !matched {
        anyhow::bail!("unknown list kind '{kind}' (characters, locations, books, styles, all)");
    }
    Ok(())
}

fn print_summary(store: &ConfigStore) {
    println!("Project: {}", store.project_name());
    println!("Config file: {}", store.path().display());
    println!("Characters: {}", store.characters().count());
    println!("Locations: {}", store.locations().count());
    println!("Books: {}", store.books().len());
    println!("Style presets: {}", store.style_presets().count());
    println!("Active style: {}", store.active_style());
    println!("API model: {}", store.api_model());
    println!("Cost per image: ${}", store.cost_per_image());
}
