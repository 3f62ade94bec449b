use anyhow::{Context, Result};
use clap::Parser;
use class_world::archive::JarHandle;
use class_world::classpath::ClassPathLoader;
use class_world::cli::{Cli, Commands, OutputFormat};
use class_world::config::resolve_classpath;
use class_world::loader::ClassLoader;
use class_world::mask::MaskingLoader;
use class_world::scan::extract_version_from_maven_path;
use class_world::world::{ParallelWorldLoader, catalog_world, detect_world_prefixes};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.clone() {
        Commands::Resolve {
            class_name,
            jars,
            world,
            masks,
            format,
        } => {
            let class_name = normalize_class_name(&class_name);
            let report = resolve(&cli, &jars, &class_name, &world, &masks)?;
            write_resolve_output(&report, format)?;
        }
        Commands::Catalog { jar, world } => {
            let handle = JarHandle::open(&jar)?;
            let classes = catalog_world(&handle, &world);
            eprintln!(
                "[class-world] {} classes under prefix {:?} in {}",
                classes.len(),
                world,
                jar.display()
            );
            for class in classes {
                println!("{class}");
            }
        }
        Commands::Worlds { jar } => {
            let handle = JarHandle::open(&jar)?;
            let worlds = detect_world_prefixes(&handle);
            if worlds.is_empty() {
                eprintln!("[class-world] no parallel worlds in {}", jar.display());
            }
            for world in worlds {
                println!("{world}");
            }
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct ResolveReport {
    class_name: String,
    package: Option<String>,
    world: String,
    masks: Vec<String>,
    origin_jar: Option<String>,
    maven_version: Option<String>,
    size: usize,
    sha256: String,
    class_file_major: u16,
    defined_by: class_world::loader::LoaderId,
    searched_jars: usize,
    duration_ms: u64,
}

fn resolve(
    cli: &Cli,
    jars: &[PathBuf],
    class_name: &str,
    world: &str,
    masks: &[String],
) -> Result<ResolveReport> {
    let start = Instant::now();

    let classpath = resolve_classpath(cli, jars, class_name)?;
    eprintln!(
        "[class-world] building chain over {} jar(s), world={world:?}, masks={masks:?}",
        classpath.len()
    );

    let ambient: Arc<dyn ClassLoader> = Arc::new(
        ClassPathLoader::new(None, &classpath)
            .with_context(|| "failed to open class path roots")?,
    );
    let masked: Arc<dyn ClassLoader> =
        Arc::new(MaskingLoader::new(ambient, masks.iter().cloned()));
    let chain = ParallelWorldLoader::new(masked, world.to_string());

    let definition = chain
        .load_class(class_name)
        .with_context(|| format!("failed to resolve {class_name}"))?;

    // release whatever the lookup pinned open
    chain.close()?;

    let origin_jar = definition.origin.as_ref().map(|p| p.display().to_string());
    let maven_version = definition
        .origin
        .as_deref()
        .and_then(extract_version_from_maven_path);

    Ok(ResolveReport {
        class_name: definition.name,
        package: definition.package,
        world: world.to_string(),
        masks: masks.to_vec(),
        origin_jar,
        maven_version,
        size: definition.size,
        sha256: definition.sha256,
        class_file_major: definition.major_version,
        defined_by: definition.defined_by,
        searched_jars: classpath.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

fn write_resolve_output(report: &ResolveReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!("class_name: {}", report.class_name);
            println!("world: {:?}", report.world);
            println!("origin_jar: {:?}", report.origin_jar);
            println!("maven_version: {:?}", report.maven_version);
            println!("sha256: {}", report.sha256);
            println!("class_file_major: {}", report.class_file_major);
            println!("defined_by: {}", report.defined_by);
            println!("duration_ms: {}", report.duration_ms);
        }
    }
    Ok(())
}

fn normalize_class_name(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("import") {
        s = rest.trim();
    }
    if s.ends_with(';') {
        s = s.trim_end_matches(';').trim();
    }
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
