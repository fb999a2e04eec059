//! gcasset CLI - Command-line tool for SET, ONE and HGO game asset files.
//!
//! This is the main entry point for the gcasset command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::{MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use walkdir::WalkDir;

use gcasset::prelude::*;

/// gcasset - game asset container tool
#[derive(Parser)]
#[command(name = "gcasset")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of a ONE archive
    OneList {
        /// Path to the ONE file
        #[arg(short, long, env = "INPUT_ONE")]
        input: PathBuf,

        /// Decompress every entry and show unpacked sizes
        #[arg(short, long)]
        detailed: bool,
    },

    /// Extract files from a ONE archive
    OneExtract {
        /// Path to the ONE file
        #[arg(short, long, env = "INPUT_ONE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, env = "OUTPUT_FOLDER")]
        output: PathBuf,

        /// Filter pattern (glob-style, case-insensitive)
        #[arg(short, long)]
        filter: Option<String>,

        /// Write payloads as stored, without PRS decompression
        #[arg(long)]
        raw: bool,
    },

    /// Pack every file in a directory into a ONE archive
    OnePack {
        /// Directory holding the files to pack
        #[arg(short, long, env = "INPUT_FOLDER")]
        input: PathBuf,

        /// Output ONE file
        #[arg(short, long)]
        output: PathBuf,

        /// Store payloads without PRS compression
        #[arg(long)]
        raw: bool,
    },

    /// Show the objects in a SET file
    SetInfo {
        /// Input SET file
        #[arg(short, long)]
        input: PathBuf,

        /// Dump the decoded document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the sections of an HGO file
    HgoInfo {
        /// Input HGO file
        #[arg(short, long)]
        input: PathBuf,

        /// Dump the decoded scene as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode and re-encode every recognised file under a directory
    Verify {
        /// Directory to scan
        #[arg(env = "INPUT_FOLDER")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::OneList { input, detailed } => {
            cmd_one_list(&input, detailed)?;
        }
        Commands::OneExtract {
            input,
            output,
            filter,
            raw,
        } => {
            cmd_one_extract(&input, &output, filter.as_deref(), raw)?;
        }
        Commands::OnePack { input, output, raw } => {
            cmd_one_pack(&input, &output, raw)?;
        }
        Commands::SetInfo { input, json } => {
            cmd_set_info(&input, json)?;
        }
        Commands::HgoInfo { input, json } => {
            cmd_hgo_info(&input, json)?;
        }
        Commands::Verify { dir } => {
            cmd_verify(&dir)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn cmd_one_list(input: &Path, detailed: bool) -> Result<()> {
    let data = fs::read(input).context("Failed to read ONE file")?;
    let archive = Archive::parse(&data, false).context("Failed to parse ONE archive")?;

    for entry in &archive.entries {
        if detailed {
            let unpacked = Prs
                .decompress(&entry.data)
                .with_context(|| format!("Failed to decompress {}", entry.name))?;
            println!(
                "{:>5} {:>10} {:>10} {:08x} {}",
                entry.index,
                entry.data.len(),
                unpacked.len(),
                entry.opaque,
                entry.name
            );
        } else {
            println!("{}", entry.name);
        }
    }

    println!("\nTotal: {} entries", archive.len());

    Ok(())
}

fn cmd_one_extract(input: &Path, output: &Path, filter: Option<&str>, raw: bool) -> Result<()> {
    println!("Opening ONE archive: {}", input.display());

    let start = Instant::now();
    let data = fs::read(input).context("Failed to read ONE file")?;
    let mut archive = Archive::parse(&data, !raw).context("Failed to parse ONE archive")?;

    println!("Loaded {} entries in {:?}", archive.len(), start.elapsed());

    if let Some(pattern) = filter {
        let pattern = Pattern::new(pattern).context("Invalid filter pattern")?;
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };
        archive
            .entries
            .retain(|e| pattern.matches_with(&e.name, options));
    }

    println!("Extracting {} entries...", archive.len());
    archive
        .extract(output)
        .with_context(|| format!("Failed to extract to {}", output.display()))?;

    println!("Extraction completed");

    Ok(())
}

fn cmd_one_pack(input: &Path, output: &Path, raw: bool) -> Result<()> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(input).context("Failed to read input directory")? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    println!("Packing {} files from {}", paths.len(), input.display());

    let mut archive = Archive::new();
    for path in &paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Non UTF-8 file name: {}", path.display()))?;
        let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        archive
            .push(name, data)
            .with_context(|| format!("Failed to add {}", path.display()))?;
    }

    let start = Instant::now();
    archive
        .write_to_file(output, !raw)
        .context("Failed to write ONE archive")?;

    println!("Wrote {} in {:?}", output.display(), start.elapsed());

    Ok(())
}

fn cmd_set_info(input: &Path, json: bool) -> Result<()> {
    let doc = SetDocument::from_file(input).context("Failed to parse SET file")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    for (i, object) in doc.objects.iter().enumerate() {
        let (label, prefab) = match object.kind() {
            Some(kind) => match kind.variant {
                Some(variant) => (kind.label, format!("{}:{}", kind.prefab, variant)),
                None => (kind.label, kind.prefab.to_string()),
            },
            None => ("?", String::new()),
        };
        println!(
            "{:>4} {:02x}/{:02x} {:<28} {:<28} ({:>9.2}, {:>9.2}, {:>9.2}) link {:>3} params {}",
            i,
            object.object_type,
            object.object_list,
            label,
            prefab,
            object.position.x,
            object.position.y,
            object.position.z,
            object.link_id,
            object.misc_data.len()
        );
    }

    let known = doc.objects.iter().filter(|o| o.kind().is_some()).count();
    println!("\nTotal: {} objects ({} catalogued)", doc.objects.len(), known);

    Ok(())
}

fn cmd_hgo_info(input: &Path, json: bool) -> Result<()> {
    let data = fs::read(input).context("Failed to read HGO file")?;
    let scene = Scene::parse(&data).context("Failed to parse HGO file")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scene)?);
        return Ok(());
    }

    for section in &scene.sections {
        match section {
            Section::Instances(table) => {
                println!(
                    "{}: {} transforms, {} parameter sets",
                    section.tag(),
                    table.transforms.len(),
                    table.params.len()
                );
                for (i, transform) in table.transforms.iter().enumerate() {
                    let t = transform.matrix.translation();
                    println!(
                        "  [{}] matrix {:>3} at ({:>9.2}, {:>9.2}, {:>9.2})",
                        i, transform.matrix_index, t.x, t.y, t.z
                    );
                }
            }
            Section::Geometry(set) => {
                println!("{}: {} geometries", section.tag(), set.geometries.len());
                for (i, geometry) in set.geometries.iter().enumerate() {
                    println!(
                        "  [{}] kind {}: {} meshes, {} vertices",
                        i,
                        geometry.kind(),
                        geometry.mesh_count(),
                        geometry.vertex_count()
                    );
                    if let Geometry::Mesh(meshes) = geometry {
                        for mesh in meshes {
                            let layout = match &mesh.primitive {
                                Primitive::FaceList(_) => "list".to_string(),
                                Primitive::TriangleStrips(strips) => format!("{} strips", strips.len()),
                            };
                            println!(
                                "      material {:>3}: {:>5} vertices, {:>5} triangles ({})",
                                mesh.material_index,
                                mesh.vertices.len(),
                                mesh.primitive.triangle_count(),
                                layout
                            );
                        }
                    }
                }
            }
            Section::Raw { tag, body } => {
                println!("{}: {} bytes (not decoded)", tag, body.len());
            }
        }
    }

    Ok(())
}

/// Result of round-tripping one file.
enum Outcome {
    /// Re-encoding reproduced the input bytes.
    Exact,
    /// Re-encoding decodes to the same document but different bytes.
    Equivalent,
    /// The re-encoded file decodes to a different document.
    Mismatch,
}

fn round_trip<T: PartialEq>(
    data: &[u8],
    decode: impl Fn(&[u8]) -> Result<T>,
    encode: impl Fn(&T) -> Result<Vec<u8>>,
) -> Result<Outcome> {
    let first = decode(data)?;
    let bytes = encode(&first)?;
    if bytes == data {
        return Ok(Outcome::Exact);
    }
    let second = decode(&bytes).context("Re-encoded output failed to decode")?;
    Ok(if first == second {
        Outcome::Equivalent
    } else {
        Outcome::Mismatch
    })
}

fn verify_file(path: &Path) -> Result<Option<Outcome>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let outcome = match extension.as_deref() {
        Some("set") => {
            let data = fs::read(path)?;
            round_trip(
                &data,
                |d| Ok(SetDocument::parse(d)?),
                |doc| Ok(doc.to_bytes()?),
            )?
        }
        Some("one") => {
            let data = fs::read(path)?;
            round_trip(
                &data,
                |d| Ok(Archive::parse(d, false)?),
                |archive| Ok(archive.to_bytes(false)?),
            )?
        }
        Some("hgo") => {
            let data = fs::read(path)?;
            round_trip(&data, |d| Ok(Scene::parse(d)?), |scene| Ok(scene.to_bytes()?))?
        }
        _ => return Ok(None),
    };

    Ok(Some(outcome))
}

fn cmd_verify(dir: &Path) -> Result<()> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    println!("Scanning {} files under {}", files.len(), dir.display());

    let pb = progress_bar(files.len())?;
    let start = Instant::now();

    let results: Vec<(PathBuf, Result<Option<Outcome>>)> = files
        .into_par_iter()
        .map(|path| {
            let result = verify_file(&path);
            pb.inc(1);
            (path, result)
        })
        .collect();

    pb.finish_with_message("Done");

    let mut exact = 0;
    let mut equivalent = 0;
    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(None) => {}
            Ok(Some(Outcome::Exact)) => exact += 1,
            Ok(Some(Outcome::Equivalent)) => {
                tracing::debug!(path = %path.display(), "round trip changed bytes");
                equivalent += 1;
            }
            Ok(Some(Outcome::Mismatch)) => {
                eprintln!("Mismatch: {}", path.display());
                failed += 1;
            }
            Err(e) => {
                eprintln!("Error in {}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    println!(
        "Verified {} files in {:?}: {} byte-exact, {} equivalent, {} failed",
        exact + equivalent + failed,
        start.elapsed(),
        exact,
        equivalent,
        failed
    );

    if failed > 0 {
        anyhow::bail!("{} files failed verification", failed);
    }

    Ok(())
}
