//! Command dispatch: wire CLI arguments to the services

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::debug;

use crate::application::services::{CloneService, LinkService};
use crate::application::{ApplicationError, CloneContext};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::Settings;
use crate::domain::rewriter::IdentifierMaps;
use crate::domain::{Capacity, CapacityKind, LinkedField, Reference};
use crate::infrastructure::{JsonFileStore, TreeStore};

pub fn execute_command(cli: &Cli, settings: &Settings) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };

    match command {
        Commands::Copy {
            kind,
            id,
            node,
            suffix,
            map_nodes,
        } => run_copy(cli, settings, kind, id, node, *suffix, map_nodes),
        Commands::Scan { kind, id } => run_scan(cli, settings, kind, id),
        Commands::Links { node } => run_links(cli, settings, node),
        Commands::Relink { kind, id } => run_relink(cli, settings, kind, id, true),
        Commands::Unlink { kind, id } => run_relink(cli, settings, kind, id, false),
        Commands::Config { command } => run_config(command, settings),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

fn store_path(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.file
        .clone()
        .unwrap_or_else(|| settings.store_path.clone())
}

fn open_store(cli: &Cli, settings: &Settings) -> CliResult<Arc<JsonFileStore>> {
    let path = store_path(cli, settings);
    debug!("open_store: {}", path.display());
    Ok(Arc::new(JsonFileStore::open(path)?))
}

fn parse_kind(kind: &str) -> CliResult<CapacityKind> {
    kind.parse::<CapacityKind>()
        .map_err(|e| CliError::Application(ApplicationError::Domain(e)))
}

fn load_capacity(
    store: &Arc<JsonFileStore>,
    kind: CapacityKind,
    id: &str,
) -> CliResult<Capacity> {
    store
        .find_capacity(kind, id)?
        .ok_or_else(|| CliError::Application(ApplicationError::not_found(kind, id)))
}

fn run_copy(
    cli: &Cli,
    settings: &Settings,
    kind: &str,
    id: &str,
    node: &str,
    suffix: u32,
    map_nodes: &[String],
) -> CliResult<()> {
    let kind = parse_kind(kind)?;
    let store = open_store(cli, settings)?;

    let mut maps = IdentifierMaps::new();
    for pair in map_nodes {
        let (old, new) = pair.split_once('=').ok_or_else(|| {
            CliError::InvalidArgs(format!("--map-node wants OLD=NEW, got '{}'", pair))
        })?;
        maps.record_node(old, new);
    }

    let service = CloneService::with_strict_rewrite(
        store.clone() as Arc<dyn TreeStore>,
        settings.strict_rewrite,
    );
    let mut ctx = CloneContext::with_maps(suffix, maps);
    let outcome = service.clone_capacity(kind, id, node, &mut ctx)?;
    store.flush()?;

    output::success(&format!("{} {} -> {}", kind, id, outcome.new_id));
    output::detail(&format!("owner node: {}", node));
    output::detail(&format!(
        "{} capacit{} cloned in this operation",
        ctx.cache.len(),
        if ctx.cache.len() == 1 { "y" } else { "ies" }
    ));
    Ok(())
}

fn run_scan(cli: &Cli, settings: &Settings, kind: &str, id: &str) -> CliResult<()> {
    let kind = parse_kind(kind)?;
    let store = open_store(cli, settings)?;
    let capacity = load_capacity(&store, kind, id)?;

    let refs = crate::domain::scanner::scan(&capacity.payload);
    output::header(&format!("{} {}: {} reference(s)", kind, id, refs.len()));
    for reference in &refs {
        output::detail(&format!(
            "{:<10} {}",
            reference_label(reference),
            reference.raw_id()
        ));
    }
    Ok(())
}

fn reference_label(reference: &Reference) -> &'static str {
    match reference {
        Reference::Node(_) => "node",
        Reference::Formula(_) => "formula",
        Reference::Condition(_) => "condition",
        Reference::Table(_) => "table",
        Reference::Shared(_) => "shared",
    }
}

fn run_links(cli: &Cli, settings: &Settings, node_id: &str) -> CliResult<()> {
    let store = open_store(cli, settings)?;
    let node = store.find_node(node_id)?.ok_or_else(|| {
        CliError::InvalidArgs(format!("node not found: {}", node_id))
    })?;

    output::header(&node.id);
    for field in [
        LinkedField::Condition,
        LinkedField::Formula,
        LinkedField::Table,
        LinkedField::Variable,
    ] {
        let ids = node.linked_ids(field);
        if ids.is_empty() {
            continue;
        }
        output::detail(&format!(
            "{}: {}",
            field.as_str(),
            ids.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    Ok(())
}

fn run_relink(cli: &Cli, settings: &Settings, kind: &str, id: &str, add: bool) -> CliResult<()> {
    let kind = parse_kind(kind)?;
    let store = open_store(cli, settings)?;
    let capacity = load_capacity(&store, kind, id)?;

    let linker = LinkService::new(store.clone() as Arc<dyn TreeStore>);
    let updated = if add {
        linker.relink(kind, &capacity.id, &capacity.payload)?
    } else {
        linker.unlink(kind, &capacity.id, &capacity.payload)?
    };
    store.flush()?;

    output::success(&format!(
        "{} {}: {} node(s) {}",
        kind,
        id,
        updated,
        if add { "linked" } else { "unlinked" }
    ));
    Ok(())
}

fn run_config(command: &ConfigCommands, settings: &Settings) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&settings.to_toml().map_err(CliError::Application)?);
            Ok(())
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
            Ok(())
        }
    }
}
