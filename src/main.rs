mod config;
mod contact;
mod db;
mod export;
mod filter;
mod logging;
mod parser;
mod review;
mod share;
mod store;
mod summary;
mod ui;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use config::Config;
use contact::ContactPatch;
use db::Database;
use filter::{ContactFilter, InviteTab};
use store::{ContactStore, SlotStore};
use summary::ContactSummary;

#[derive(Parser, Debug)]
#[command(name = "guestlist", version, about = "Review and sort a wedding guest list")]
struct Cli {
    /// Configuration file (default: <config dir>/guestlist/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Store file, overriding `store_path` from the configuration
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the full-screen reviewer
    Ui,
    /// Replace the guest list with a comma or tab delimited file
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print review progress
    Summary,
    /// Print the contacts that pass the filters
    List(FilterArgs),
    /// Write the contacts that pass the filters as TSV
    Export(ExportArgs),
    /// Change one contact by its 1-based position
    Set(SetArgs),
    /// Print the position of the first contact missing intimacy or group
    NextIncomplete,
    /// Print a link that carries the whole list
    Share {
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
    },
    /// Replace the guest list with the one in a share link
    Import {
        #[arg(value_name = "LINK_OR_DATA")]
        link: String,
    },
    /// Write the stored list as JSON
    Backup {
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Replace the guest list with a JSON backup
    Restore {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Delete the stored list
    Reset {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Name (case-insensitive) or phone substring
    #[arg(long)]
    search: Option<String>,

    #[arg(long, value_name = "1-5")]
    intimacy: Option<String>,

    #[arg(long)]
    group: Option<String>,

    #[arg(long, value_enum, default_value_t = InviteTab::All)]
    tab: InviteTab,
}

impl FilterArgs {
    fn into_filter(self) -> ContactFilter {
        ContactFilter {
            search: self.search.unwrap_or_default(),
            intimacy: self.intimacy.filter(|v| !v.trim().is_empty()),
            group: self.group.filter(|v| !v.trim().is_empty()),
            tab: self.tab,
        }
    }
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Output file, `-` for stdout (default: `export.csv_file_name`)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SetArgs {
    /// 1-based position in the list
    #[arg(value_name = "N")]
    position: usize,

    #[arg(long, value_name = "1-5")]
    intimacy: Option<String>,

    #[arg(long)]
    group: Option<String>,

    #[arg(long, value_enum)]
    invited: Option<YesNo>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum YesNo {
    Yes,
    No,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    let _log_guard = match logging::init(&config.log_file, &config.log_level) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    info!(config = %config.config_path.display(), "loaded configuration");
    for warning in &config.warnings {
        eprintln!("warning: {}: {warning}", config.config_path.display());
        warn!(config = %config.config_path.display(), %warning, "configuration");
    }

    let store_path = cli.store.unwrap_or_else(|| config.store_path.clone());
    let mut store = SlotStore::new(Database::open_at(&store_path)?);
    info!(store = %store.backend().path().display(), "opened store");

    match cli.command.unwrap_or(Command::Ui) {
        Command::Ui => {
            let mut app = ui::app::App::new(&mut store, &config);
            app.run()?;
        }
        Command::Upload { file } => handle_upload(&mut store, &file)?,
        Command::Summary => handle_summary(&mut store)?,
        Command::List(args) => handle_list(&mut store, args.into_filter())?,
        Command::Export(args) => handle_export(&mut store, &config, args)?,
        Command::Set(args) => handle_set(&mut store, args)?,
        Command::NextIncomplete => handle_next_incomplete(&mut store)?,
        Command::Share { base_url } => {
            let base_url = base_url.unwrap_or_else(|| config.share_base_url.clone());
            handle_share(&mut store, &base_url)?
        }
        Command::Import { link } => {
            let count = share::import_link(&mut store, &link)?;
            println!("Imported {} contacts.", count);
        }
        Command::Backup { output } => {
            let path = output.unwrap_or_else(|| PathBuf::from(&config.export.json_file_name));
            handle_backup(&mut store, &path)?
        }
        Command::Restore { file } => handle_restore(&mut store, &file)?,
        Command::Reset { yes } => handle_reset(&mut store, yes)?,
    }

    Ok(())
}

fn handle_upload(store: &mut dyn ContactStore, file: &Path) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let parsed = parser::parse_upload(&text)
        .with_context(|| format!("could not load contacts from {}", file.display()))?;

    store.replace_all(&parsed.contacts)?;
    info!(
        file = %file.display(),
        count = parsed.contacts.len(),
        skipped = parsed.skipped_lines.len(),
        "uploaded contact list"
    );

    println!("Uploaded {} contacts.", parsed.contacts.len());
    if !parsed.skipped_lines.is_empty() {
        let lines: Vec<String> = parsed.skipped_lines.iter().map(|n| n.to_string()).collect();
        println!(
            "Skipped {} lines with fewer than two columns: {}",
            lines.len(),
            lines.join(", ")
        );
    }
    Ok(())
}

fn handle_summary(store: &mut dyn ContactStore) -> Result<()> {
    let contacts = store.load()?;
    let summary = ContactSummary::of(&contacts);
    if summary.total == 0 {
        println!("No contacts uploaded.");
        return Ok(());
    }

    for (label, count) in summary.lines() {
        if label == "total" {
            println!("{:<14}{}", label, count);
        } else {
            println!("{:<14}{} ({}%)", label, count, summary.percent(count));
        }
    }
    Ok(())
}

fn handle_list(store: &mut dyn ContactStore, filter: ContactFilter) -> Result<()> {
    let contacts = store.load()?;
    let rows = filter.apply(&contacts);

    // Results: position<TAB>name<TAB>phone<TAB>intimacy<TAB>group<TAB>invited
    for row in &rows {
        let c = row.contact;
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.index + 1,
            c.name,
            c.phone,
            c.intimacy,
            c.group,
            export::invited_mark(c.invited)
        );
    }

    if rows.is_empty() {
        eprintln!("No contacts match.");
    }
    Ok(())
}

fn handle_export(store: &mut dyn ContactStore, config: &Config, args: ExportArgs) -> Result<()> {
    let contacts = store.load()?;
    let filter = args.filter.into_filter();
    let rows = filter.apply(&contacts);
    let tsv = export::to_tsv(rows.iter().map(|r| r.contact));

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.export.csv_file_name));
    export::write_output(&path, &tsv)?;
    info!(count = rows.len(), path = %path.display(), "exported contacts");

    if path.as_os_str() != "-" {
        println!("Exported {} contacts to {}", rows.len(), path.display());
    }
    Ok(())
}

fn handle_set(store: &mut dyn ContactStore, args: SetArgs) -> Result<()> {
    if args.position == 0 {
        bail!("positions start at 1");
    }

    let patch = ContactPatch {
        intimacy: args.intimacy,
        group: args.group,
        invited: args.invited.map(|v| matches!(v, YesNo::Yes)),
    };
    if patch.is_empty() {
        bail!("nothing to change: pass --intimacy, --group or --invited");
    }

    let updated = store.update_at(args.position - 1, &patch)?;
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        args.position,
        updated.name,
        updated.phone,
        updated.intimacy,
        updated.group,
        export::invited_mark(updated.invited)
    );
    Ok(())
}

fn handle_next_incomplete(store: &mut dyn ContactStore) -> Result<()> {
    let contacts = store.load()?;
    if contacts.is_empty() {
        println!("No contacts uploaded.");
        return Ok(());
    }

    match review::find_incomplete(&contacts) {
        Some(index) => {
            let c = &contacts[index];
            println!("{}\t{}\t{}", index + 1, c.name, c.phone);
        }
        None => println!("All {} contacts are complete.", contacts.len()),
    }
    Ok(())
}

fn handle_share(store: &mut dyn ContactStore, base_url: &str) -> Result<()> {
    let raw = stored_document(store)?.context("no contacts to share; upload a list first")?;
    let link = share::encode_link(base_url, &raw);
    info!(bytes = link.len(), "built share link");
    println!("{}", link);
    Ok(())
}

fn handle_backup(store: &mut dyn ContactStore, path: &Path) -> Result<()> {
    let raw = stored_document(store)?.context("no contacts to back up")?;
    export::write_output(path, &raw)?;
    info!(path = %path.display(), "wrote backup");
    if path.as_os_str() != "-" {
        println!("Backed up to {}", path.display());
    }
    Ok(())
}

/// The stored document, once it has been checked to hold at least one contact.
fn stored_document(store: &mut dyn ContactStore) -> Result<Option<String>> {
    if store.load()?.is_empty() {
        return Ok(None);
    }
    Ok(store.raw()?)
}

fn handle_restore(store: &mut dyn ContactStore, file: &Path) -> Result<()> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let contacts = export::parse_backup(&raw)?;
    if contacts.is_empty() {
        bail!("{} contains no contacts", file.display());
    }

    store.replace_all(&contacts)?;
    info!(file = %file.display(), count = contacts.len(), "restored backup");
    println!("Restored {} contacts.", contacts.len());
    Ok(())
}

fn handle_reset(store: &mut dyn ContactStore, yes: bool) -> Result<()> {
    let count = store.load().map(|c| c.len()).unwrap_or(0);
    if !yes {
        bail!("refusing to delete {} contacts without --yes", count);
    }
    store.clear()?;
    println!("Deleted {} contacts.", count);
    Ok(())
}
