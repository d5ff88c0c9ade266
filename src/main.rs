use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use linkleads::app::App;
use linkleads::config::Config;
use linkleads::leads::{
    export, find_duplicates, format_age, share_url, suggest_related, ExportFormat, LeadError,
    SharePlatform,
};
use linkleads::storage::{
    CategoryFilter, Database, KeyValueStore, LeadUpdate, StoreError, Theme,
};
use linkleads::util::{absolute_form, fit_to_width, sanitize_line};

const TITLE_WIDTH: usize = 40;

/// Get the config directory path (~/.config/linkleads/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("linkleads"))
}

/// Create the config directory if needed and restrict it to the current user.
fn prepare_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "linkleads", about = "Save, tag and triage URLs to read later", version)]
struct Args {
    /// Database file (default: ~/.config/linkleads/leads.db)
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    /// Config file (default: ~/.config/linkleads/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a URL (bare domains like "docs.rs" are accepted)
    Add {
        url: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Save a page with its title, reading time and suggested tags
    Tab {
        url: String,
        /// Title to use if the page has none
        #[arg(long)]
        title: Option<String>,
    },
    /// Show saved leads, newest first
    List {
        /// Match against title, URL and tags (case-insensitive)
        #[arg(short, long, default_value = "")]
        query: String,
        /// all, documentation, social, shopping, news, media or general
        #[arg(short, long, default_value = "all")]
        category: CategoryFilter,
        /// Skip the link check even if check_links_on_load is enabled
        #[arg(long)]
        no_check: bool,
    },
    /// Open a lead in the browser and count the visit
    Open {
        url: String,
        /// Count the visit without launching a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Edit the title, tags or notes of a lead
    Edit {
        url: String,
        #[arg(long)]
        title: Option<String>,
        /// Comma-separated tags, replacing the existing ones
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove one or more leads
    Rm {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Remove every lead
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Probe every lead and mark unreachable ones as broken
    Check,
    /// Write all leads to a file
    Export {
        /// json or text (default from config)
        #[arg(short, long)]
        format: Option<ExportFormat>,
        /// Output path (default: linkleads-export.json / .txt in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or change settings
    Settings {
        #[arg(long)]
        theme: Option<Theme>,
        #[arg(long, conflicts_with = "theme")]
        toggle_theme: bool,
        #[arg(long)]
        auto_save_bookmarks: Option<bool>,
        #[arg(long)]
        check_links_on_load: Option<bool>,
    },
    /// Deliver a browser event
    Event {
        #[command(subcommand)]
        kind: EventKind,
    },
    /// Import a legacy export (array of URL strings or {url, title} objects)
    ImportLegacy { file: PathBuf },
    /// Show saved leads related to a page
    Suggest { url: String },
    /// Print (or open) a share link for a lead
    Share {
        url: String,
        #[arg(short, long)]
        platform: SharePlatform,
        #[arg(long)]
        open: bool,
    },
    /// List leads whose URL appears more than once
    Dupes,
    /// Show counts by category and link health
    Stats,
}

#[derive(Subcommand, Debug)]
enum EventKind {
    /// A browser bookmark was created
    Bookmark {
        url: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// "Save to LinkLeads" was picked from a context menu
    ContextMenu {
        url: String,
        #[arg(long)]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    prepare_config_dir(&config_dir)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = args.db.clone().unwrap_or_else(|| config_dir.join("leads.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(StoreError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of linkleads appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    let mut app = App::open(db, &config)
        .await
        .context("Failed to load leads")?;

    run(&mut app, args.command, &config).await
}

fn read_legacy_file(file: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read legacy file: {}", file.display()))?;
    let blob: serde_json::Value =
        serde_json::from_str(&content).context("Legacy file is not valid JSON")?;
    if !blob.is_array() {
        anyhow::bail!("Legacy file must contain a JSON array");
    }
    Ok(blob)
}

async fn run<S: KeyValueStore>(app: &mut App<S>, command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Add { url, title } => {
            let lead = report(app.add(&url, title.as_deref()).await)?;
            println!("Saved {} [{}]", lead.url, lead.category);
        }
        Command::Tab { url, title } => {
            let lead = report(app.capture_tab(&url, title.as_deref()).await)?;
            println!("Saved \"{}\" [{}]", lead.display_title(), lead.category);
            if !lead.tags.is_empty() {
                println!("  tags: {}", lead.tags.join(", "));
            }
            if let Some(minutes) = lead.reading_time.filter(|m| *m > 0) {
                println!("  ~{} min read", minutes);
            }
        }
        Command::List {
            query,
            category,
            no_check,
        } => {
            if !no_check && app.startup_link_check().await? {
                tracing::debug!("Startup link check finished");
            }
            app.set_query(query);
            app.set_category(category);
            print_view(app);
        }
        Command::Open { url, no_browser } => {
            if !app.record_visit(&url).await? {
                anyhow::bail!("No lead saved for {}", url);
            }
            if !no_browser {
                open::that(absolute_form(&url).into_owned())
                    .with_context(|| format!("Failed to open {} in browser", url))?;
            }
        }
        Command::Edit {
            url,
            title,
            tags,
            notes,
        } => {
            let changes = LeadUpdate {
                title,
                tags: tags.map(|t| t.split(',').map(str::to_owned).collect()),
                notes,
            };
            if changes.is_empty() {
                anyhow::bail!("Nothing to change: pass --title, --tags or --notes");
            }
            let lead = report(app.update(&url, changes).await)?;
            println!("Updated {}", lead.url);
        }
        Command::Rm { urls } => {
            for url in &urls {
                if !app.selection().contains(url) {
                    app.toggle_selection(url);
                }
            }
            let removed = app.delete_selected().await?;
            println!("Removed {} of {} lead(s)", removed, urls.len());
        }
        Command::Clear { yes } => {
            if !yes {
                anyhow::bail!("This deletes every lead; re-run with --yes to confirm");
            }
            let removed = app.delete_all().await?;
            println!("Removed {} lead(s)", removed);
        }
        Command::Check => {
            app.check_links().await?;
            let broken: Vec<_> = app.leads().iter().filter(|l| l.is_broken()).collect();
            println!(
                "Checked {} lead(s), {} broken",
                app.leads().len(),
                broken.len()
            );
            for lead in broken {
                println!("  ✗ {}", lead.url);
            }
        }
        Command::Export { format, output } => {
            let format = format.unwrap_or(config.export_format);
            let output = output.unwrap_or_else(|| PathBuf::from(format.file_name()));
            let data = export(app.leads(), format)?;
            std::fs::write(&output, data)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Exported {} lead(s) to {}", app.leads().len(), output.display());
        }
        Command::Settings {
            theme,
            toggle_theme,
            auto_save_bookmarks,
            check_links_on_load,
        } => {
            if toggle_theme {
                app.toggle_theme().await?;
            }
            let mut settings = *app.settings();
            let before = settings;
            if let Some(theme) = theme {
                settings.theme = theme;
            }
            if let Some(value) = auto_save_bookmarks {
                settings.auto_save_bookmarks = value;
            }
            if let Some(value) = check_links_on_load {
                settings.check_links_on_load = value;
            }
            if settings != before {
                app.save_settings(settings).await?;
            }

            let settings = app.settings();
            println!("theme               = {}", settings.theme);
            println!("auto_save_bookmarks = {}", settings.auto_save_bookmarks);
            println!("check_links_on_load = {}", settings.check_links_on_load);
        }
        Command::Event { kind } => {
            let saved = match kind {
                EventKind::Bookmark { url, title } => {
                    app.on_bookmark_created(&url, title.as_deref()).await?
                }
                EventKind::ContextMenu { url, title } => {
                    app.on_context_menu(&url, title.as_deref()).await?
                }
            };
            match saved {
                Some(lead) => println!("Saved {} [{}]", lead.url, lead.category),
                None => println!("Ignored"),
            }
        }
        Command::ImportLegacy { file } => {
            let blob = read_legacy_file(&file)?;
            match report(app.import_legacy(&blob).await)? {
                Some(count) => println!("Imported {} lead(s)", count),
                None => println!(
                    "Skipped: {} lead(s) already saved, legacy import only runs on an empty list",
                    app.leads().len()
                ),
            }
        }
        Command::Suggest { url } => {
            let related = suggest_related(&url, app.leads());
            if related.is_empty() {
                println!("No related leads");
            }
            for lead in related {
                println!("{}\t{}", sanitize_line(lead.display_title()), lead.url);
            }
        }
        Command::Share {
            url,
            platform,
            open,
        } => {
            let lead = app
                .repository()
                .get(&url)
                .ok_or_else(|| LeadError::NotFound(url.clone()))?;
            let link = share_url(&absolute_form(&lead.url), lead.display_title(), platform);
            if open {
                open::that(&link).with_context(|| format!("Failed to open {} share link", platform))?;
            }
            println!("{}", link);
        }
        Command::Dupes => {
            let dupes = find_duplicates(app.leads());
            if dupes.is_empty() {
                println!("No duplicates");
            }
            for lead in dupes {
                println!("{}", lead.url);
            }
        }
        Command::Stats => {
            let stats = app.stats();
            println!("total  {}", stats.total);
            println!("broken {}", stats.broken);
            for (category, count) in stats.by_category {
                println!("  {:<14}{}", category.to_string(), count);
            }
        }
    }

    Ok(())
}

/// Prints the friendly message for input errors and exits non-zero.
fn report<T>(result: Result<T, LeadError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e @ (LeadError::InvalidUrl { .. } | LeadError::Duplicate(_) | LeadError::NotFound(_))) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

fn print_view<S: KeyValueStore>(app: &App<S>) {
    let now = chrono::Utc::now().timestamp_millis();
    let stats = app.stats();

    for lead in app.view() {
        let marker = if lead.is_broken() { "✗" } else { " " };
        let selected = if app.selection().contains(&lead.url) { "*" } else { " " };
        println!(
            "{}{} {}  {:<13} {:>10}  {}",
            marker,
            selected,
            fit_to_width(&sanitize_line(lead.display_title()), TITLE_WIDTH),
            lead.category.to_string(),
            format_age(lead.timestamp, now),
            lead.url
        );
        if !lead.tags.is_empty() {
            println!("      #{}", lead.tags.join(" #"));
        }
    }

    println!(
        "{} of {} lead(s){}",
        stats.visible,
        stats.total,
        if stats.broken > 0 {
            format!(", {} broken", stats.broken)
        } else {
            String::new()
        }
    );
}
