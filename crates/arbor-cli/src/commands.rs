use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use arbor_db::{Arbor, ArborConfig, Database, Format, LoadedDatabase, NullAssetResolver};
use arbor_schema::{Schema, SchemaFile};
use arbor_types::FolderId;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use tracing::debug;
use walkdir::WalkDir;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let arbor = open_arbor(cli.schema.as_deref(), cli.config.as_deref())?;
    match cli.command {
        Command::Inspect(args) => cmd_inspect(&arbor, args, &cli.format),
        Command::Convert(args) => cmd_convert(&arbor, args),
        Command::Checksum(args) => cmd_checksum(&arbor, args),
        Command::Verify(args) => cmd_verify(&arbor, args),
        Command::Diff(args) => cmd_diff(&arbor, args),
    }
}

fn open_arbor(schema: Option<&Path>, config: Option<&Path>) -> anyhow::Result<Arbor> {
    let schema = match schema {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading schema {}", path.display()))?;
            SchemaFile::parse(&text)
                .and_then(SchemaFile::into_schema)
                .with_context(|| format!("invalid schema {}", path.display()))?
        }
        None => Schema::new(),
    };
    let config = match config {
        Some(path) => ArborConfig::load(path)?,
        None => ArborConfig::default(),
    };
    Ok(Arbor::new(schema).with_config(config))
}

fn load(arbor: &Arbor, path: &Path) -> anyhow::Result<LoadedDatabase> {
    arbor.load(path).map_err(|e| {
        let trail = e.breadcrumbs().join("\n  in ");
        anyhow::anyhow!("failed to load {}:\n  in {trail}", path.display())
    })
}

fn cmd_inspect(arbor: &Arbor, args: InspectArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let loaded = load(arbor, &args.file)?;
    let db = &loaded.database;
    match format {
        OutputFormat::Json => {
            let summary = tree_summary(db, db.root());
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            for line in render_tree(db, args.entities) {
                println!("{line}");
            }
            println!(
                "\n{} folders, {} entities, checksum {}",
                db.folder_count().to_string().bold(),
                db.entity_count().to_string().bold(),
                format!("{:016x}", loaded.computed_checksum).cyan()
            );
        }
    }
    report_diagnostics(&loaded);
    Ok(())
}

/// One line per folder, indented by depth.
fn render_tree(db: &Database, with_entities: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for id in db.walk() {
        let folder = &db[id];
        let indent = "  ".repeat(folder.depth as usize);
        lines.push(format!(
            "{indent}{} {} ({} entities)",
            folder.name.bold(),
            folder.guid.to_string().dimmed(),
            folder.objects.len()
        ));
        if with_entities {
            for entity in folder.objects.iter().filter_map(|e| db.entity(*e)) {
                let state = if entity.enabled { "" } else { " [disabled]" };
                lines.push(format!(
                    "{indent}  - {} : {}{state}",
                    entity.name,
                    entity.type_name.as_str().yellow()
                ));
            }
        }
    }
    lines
}

fn tree_summary(db: &Database, id: FolderId) -> serde_json::Value {
    let folder = &db[id];
    let entities: Vec<serde_json::Value> = folder
        .objects
        .iter()
        .filter_map(|e| db.entity(*e))
        .map(|e| {
            serde_json::json!({
                "name": e.name,
                "type": e.type_name.as_str(),
                "id": e.guid.to_string(),
                "enabled": e.enabled,
            })
        })
        .collect();
    let folders: Vec<serde_json::Value> = folder
        .sub_folders
        .iter()
        .map(|child| tree_summary(db, *child))
        .collect();
    serde_json::json!({
        "name": folder.name,
        "id": folder.guid.to_string(),
        "depth": folder.depth,
        "entities": entities,
        "folders": folders,
    })
}

fn cmd_convert(arbor: &Arbor, args: ConvertArgs) -> anyhow::Result<()> {
    let from = Format::from_path(&args.input)?;
    let to = Format::from_path(&args.output)?;
    let loaded = load(arbor, &args.input)?;
    report_diagnostics(&loaded);
    let saved = arbor.save(&loaded.database, &args.output)?;
    println!(
        "{} Converted {} ({from}) → {} ({to}), {} bytes",
        "✓".green().bold(),
        args.input.display(),
        args.output.display().to_string().bold(),
        saved.bytes.len()
    );
    Ok(())
}

fn cmd_checksum(arbor: &Arbor, args: ChecksumArgs) -> anyhow::Result<()> {
    let loaded = load(arbor, &args.file)?;
    let stored = loaded
        .stored_checksum
        .map_or_else(|| "(none)".to_string(), |c| format!("{c:016x}"));
    println!("  Stored:   {}", stored.cyan());
    println!("  Computed: {}", format!("{:016x}", loaded.computed_checksum).cyan());
    if loaded.is_stale() {
        println!("{} Structure changed since the checksum was written", "!".yellow().bold());
    } else {
        println!("{} Checksum matches", "✓".green().bold());
    }
    Ok(())
}

/// Database files under `path`: the file itself, or every `.json` and
/// `.bin` file below a directory in name order.
fn collect_files(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("{} does not exist", path.display());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && Format::from_path(entry.path()).is_ok() {
            files.push(entry.into_path());
        }
    }
    debug!(root = %path.display(), files = files.len(), "collected database files");
    Ok(files)
}

fn cmd_verify(arbor: &Arbor, args: VerifyArgs) -> anyhow::Result<()> {
    let files = collect_files(&args.path)?;
    let mut failed = 0usize;
    for file in &files {
        match load(arbor, file) {
            Ok(loaded) => {
                let status = if loaded.is_stale() {
                    "stale".yellow()
                } else if loaded.diagnostics.is_empty() {
                    "ok".green()
                } else {
                    "degraded".yellow()
                };
                println!(
                    "{} {} ({} folders, {} entities)",
                    status.bold(),
                    file.display(),
                    loaded.database.folder_count(),
                    loaded.database.entity_count()
                );
                report_diagnostics(&loaded);
            }
            Err(e) => {
                failed += 1;
                println!("{} {}", "failed".red().bold(), file.display());
                println!("  {e}");
            }
        }
    }
    println!(
        "\n{} files checked, {} failed",
        files.len().to_string().bold(),
        failed
    );
    if failed > 0 {
        bail!("{failed} database file(s) failed to load");
    }
    Ok(())
}

/// Pretty text rendering of a loaded database, used as the diff baseline.
fn canonical_text(arbor: &Arbor, db: &Database) -> anyhow::Result<String> {
    let config = ArborConfig {
        pretty_text: true,
        ..arbor.config().clone()
    };
    debug!("rendering canonical text");
    let canonical = Arbor::new(arbor.schema().clone())
        .with_codecs(arbor.codecs().clone())
        .with_config(config);
    let saved = canonical.save_to_bytes(db, Format::Text, &NullAssetResolver)?;
    Ok(String::from_utf8(saved.bytes)?)
}

fn cmd_diff(arbor: &Arbor, args: DiffArgs) -> anyhow::Result<()> {
    let old = canonical_text(arbor, &load(arbor, &args.old)?.database)?;
    let new = canonical_text(arbor, &load(arbor, &args.new)?.database)?;
    if old == new {
        println!("No differences.");
        return Ok(());
    }
    let diff = TextDiff::from_lines(&old, &new);
    for (i, group) in diff.grouped_ops(args.context).iter().enumerate() {
        if i > 0 {
            println!("{}", "...".dimmed());
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let line = change.to_string_lossy();
                let line = line.trim_end_matches('\n');
                match change.tag() {
                    ChangeTag::Delete => println!("{}", format!("-{line}").red()),
                    ChangeTag::Insert => println!("{}", format!("+{line}").green()),
                    ChangeTag::Equal => println!(" {line}"),
                }
            }
        }
    }
    Ok(())
}

fn report_diagnostics(loaded: &LoadedDatabase) {
    for diagnostic in &loaded.diagnostics {
        println!("  {} {diagnostic}", "warning:".yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_db::Entity;
    use arbor_types::{Guid, TypeName};

    const SCHEMA: &str = r#"
[[types]]
name = "Crate"
kind = "entity"
fields = [{ name = "weight", type = "float" }]
"#;

    fn arbor() -> Arbor {
        Arbor::new(SchemaFile::parse(SCHEMA).unwrap().into_schema().unwrap())
    }

    fn sample() -> Database {
        let mut db = Database::with_root("Root", Guid::from_u128(1));
        let shed = db
            .add_folder_with_guid(db.root(), "Shed", Guid::from_u128(2))
            .unwrap();
        db.add_entity(
            shed,
            Entity::new("box", TypeName::from_static("Crate"))
                .with_guid(Guid::from_u128(3))
                .with_field("weight", 2.5f64),
        )
        .unwrap();
        db
    }

    #[test]
    fn tree_lines_follow_depth() {
        colored::control::set_override(false);
        let lines = render_tree(&sample(), true);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Root "));
        assert!(lines[1].starts_with("  Shed "));
        assert!(lines[1].ends_with("(1 entities)"));
        assert_eq!(lines[2], "    - box : Crate");
    }

    #[test]
    fn json_summary_nests_folders() {
        let db = sample();
        let summary = tree_summary(&db, db.root());
        assert_eq!(summary["folders"][0]["name"], "Shed");
        assert_eq!(summary["folders"][0]["depth"], 1);
        assert_eq!(summary["folders"][0]["entities"][0]["type"], "Crate");
    }

    #[test]
    fn verify_walks_database_files_only() {
        let arbor = arbor();
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("saves");
        std::fs::create_dir(&nested).unwrap();
        arbor.save(&sample(), &dir.path().join("a.json")).unwrap();
        arbor.save(&sample(), &nested.join("b.bin")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a database").unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().is_some()
            && f.extension().unwrap() != "txt"));
        cmd_verify(&arbor, VerifyArgs { path: dir.path().to_path_buf() }).unwrap();
    }

    #[test]
    fn canonical_text_ignores_backend() {
        let arbor = arbor();
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("w.bin");
        let json = dir.path().join("w.json");
        arbor.save(&sample(), &bin).unwrap();
        arbor.save(&sample(), &json).unwrap();
        let a = canonical_text(&arbor, &arbor.load(&bin).unwrap().database).unwrap();
        let b = canonical_text(&arbor, &arbor.load(&json).unwrap().database).unwrap();
        assert_eq!(a, b);
        assert!(a.contains('\n'));
    }

    #[test]
    fn missing_schema_types_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.json");
        arbor().save(&sample(), &path).unwrap();
        let bare = open_arbor(None, None).unwrap();
        let err = load(&bare, &path).unwrap_err();
        assert!(err.to_string().contains("Crate"));
    }
}
