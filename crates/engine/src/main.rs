//! Almanac Engine - Demo entry point.
//!
//! Seeds the Calendar of Harptos with one event and one phenomenon, advances
//! time by the configured step and logs what happened.

use almanac_domain::{
    create_single_event, CalendarSchema, CalendarTimestamp, EffectType, HookDescriptor, HookType,
    Phenomenon, PhenomenonCategory, PhenomenonEffect, RepeatRule,
};
use almanac_engine::{config, AlmanacConfig, App};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root.
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config::log_filter_from_env().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AlmanacConfig::from_env();

    tracing::info!(
        upcoming_limit = config.limits.upcoming,
        range_limit = config.limits.range,
        "Starting Almanac Engine"
    );

    let amount = config.advance_amount;
    let unit = config.advance_unit;
    let app = App::in_memory(config);
    seed(&app).await?;

    let outcome = app.use_cases.time.advance.execute(amount, unit).await?;
    for occurrence in &outcome.triggered {
        tracing::info!(
            source_id = %occurrence.source_id,
            label = %occurrence.label,
            start = %occurrence.start.format(None),
            "Triggered"
        );
    }
    for resolution in outcome.resolutions.iter().filter(|r| !r.suppressed().is_empty()) {
        tracing::info!(
            active = %resolution.active().source_id,
            suppressed = resolution.suppressed().len(),
            "Conflict resolved"
        );
    }

    let listing = app.use_cases.upcoming.occurrences.execute(None).await?;
    for occurrence in &listing.occurrences {
        tracing::info!(
            source_id = %occurrence.source_id,
            label = %occurrence.label,
            start = %occurrence.start.format(None),
            "Upcoming"
        );
    }

    Ok(())
}

async fn seed(app: &App) -> anyhow::Result<()> {
    let harptos = CalendarSchema::harptos();
    app.repositories.calendar.save(&harptos).await?;
    app.repositories
        .calendar_state
        .set_active_calendar(harptos.id())
        .await?;

    let fair = create_single_event(
        "greengrass-fair",
        harptos.id(),
        "Greengrass Fair",
        CalendarTimestamp::at_day(harptos.id(), 1492, "greengrass", 1),
    )
    .with_priority(5)
    .with_hooks(vec![HookDescriptor::new(
        "announce-fair",
        HookType::CartographerEvent,
    )]);
    app.repositories.event.save(&fair.into()).await?;

    let equinox = Phenomenon::new(
        "spring-equinox",
        "Spring Equinox",
        PhenomenonCategory::Season,
        RepeatRule::monthly_position("ches", 19),
    )
    .with_effects(vec![PhenomenonEffect::new(EffectType::Narrative)
        .with_payload("text", json!("Day and night stand equal."))])
    .with_hooks(vec![HookDescriptor::new("equinox-webhook", HookType::Webhook)
        .with_config("url", json!("http://localhost:8080/equinox"))]);
    app.repositories.phenomenon.save(&equinox).await?;

    tracing::info!(calendar_id = %harptos.id(), "Seeded sample calendar");
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
