use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use jk_tools_lib::archive::{file_name, Archive};
use jk_tools_lib::scene::material::{MaterialKind, MaterialSummary};
use jk_tools_lib::scene::{asset_stem, Diagnostic, ImportOptions, Scene, SceneAssembler};
use jk_tools_lib::text::FormatEdition;
use jk_tools_lib::texture::{decode_bm, AlphaSource, Palette, RasterImage};

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  export_cli list <archive>");
    eprintln!("  export_cli extract <archive> <entry> <out>");
    eprintln!("  export_cli texture <archive> <mat|bm> <colormap> <out.png> [options]");
    eprintln!("  export_cli level <archive> <level.jkl> <out.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --edition jk|mots   record layout (default jk)");
    eprintln!("  --scale <f32>       position multiplier (default 1.0)");
    eprintln!("  --options <path>    JSON import options, applied before the flags above");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  export_cli list ./Resource/Res2.gob");
    eprintln!("  export_cli texture ./Resource/Res2.gob dflt.mat dflt.cmp ./dflt.png");
    eprintln!("  export_cli level ./Episode/JK1.GOB 01narshadda.jkl ./narshadda.json --scale 0.1");
    std::process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        usage();
    }

    let result = match (args[1].as_str(), &args[2..]) {
        ("list", [archive, ..]) => list(Path::new(archive)),
        ("extract", [archive, entry, out, ..]) => extract(Path::new(archive), entry, Path::new(out)),
        ("texture", [archive, texture, colormap, out, rest @ ..]) => parse_options(rest)
            .and_then(|options| {
                export_texture(Path::new(archive), texture, colormap, Path::new(out), &options)
            }),
        ("level", [archive, level, out, rest @ ..]) => parse_options(rest)
            .and_then(|options| export_level(Path::new(archive), level, Path::new(out), options)),
        _ => usage(),
    };

    if let Err(e) = result {
        eprintln!("Export failed: {:?}", e);
        std::process::exit(1);
    }
}

fn parse_options(flags: &[String]) -> Result<ImportOptions> {
    let mut options = ImportOptions::default();
    let mut edition = None;
    let mut scale = None;

    let mut i = 0;
    while i < flags.len() {
        let value = flags
            .get(i + 1)
            .with_context(|| format!("{} requires a value", flags[i]))?;
        match flags[i].as_str() {
            "--edition" => {
                edition = Some(
                    FormatEdition::parse(value)
                        .with_context(|| format!("unknown edition '{value}', expected jk or mots"))?,
                );
            }
            "--scale" => {
                scale = Some(
                    value
                        .parse::<f32>()
                        .with_context(|| format!("invalid scale '{value}'"))?,
                );
            }
            "--options" => {
                let path = PathBuf::from(value);
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                options = serde_json::from_str(&json)
                    .with_context(|| format!("parsing {}", path.display()))?;
            }
            other => bail!("unknown option '{other}'"),
        }
        i += 2;
    }

    if let Some(edition) = edition {
        options.edition = edition;
    }
    if let Some(scale) = scale {
        options.scale = scale;
    }
    Ok(options)
}

fn open_archive(path: &Path) -> Result<Archive> {
    Archive::open_file(path).with_context(|| format!("opening archive {}", path.display()))
}

fn list(path: &Path) -> Result<()> {
    let archive = open_archive(path)?;
    for (name, size) in archive.list_entries() {
        println!("{size:>10}  {name}");
    }
    eprintln!("Total entries: {}", archive.entries().len());
    Ok(())
}

fn extract(path: &Path, entry: &str, out: &Path) -> Result<()> {
    let archive = open_archive(path)?;
    let bytes = archive.extract(entry)?;
    std::fs::write(out, bytes).with_context(|| format!("writing {}", out.display()))?;
    eprintln!("Extracted {} ({} bytes) to {}", entry, bytes.len(), out.display());
    Ok(())
}

fn export_texture(
    path: &Path,
    texture: &str,
    colormap: &str,
    out: &Path,
    options: &ImportOptions,
) -> Result<()> {
    let archive = open_archive(path)?;
    let palette = Palette::decode(archive.extract(colormap)?)
        .with_context(|| format!("decoding colormap {colormap}"))?;
    let bytes = archive.extract(texture)?;

    let alpha = if options.import_alpha && palette.has_transparency() {
        AlphaSource::TransparencyTable
    } else {
        AlphaSource::TransparentIndex
    };
    let image: RasterImage = if texture.to_ascii_lowercase().ends_with(".bm") {
        decode_bm(bytes, Some(&palette), alpha)?
    } else {
        let assembler = SceneAssembler::new(&archive, options.clone());
        let mut diagnostics = Vec::new();
        let material = assembler.resolve_material(texture, Some(&palette), alpha, &mut diagnostics);
        if let Some(diagnostic) = diagnostics.first() {
            bail!("{}: {}", diagnostic.asset, diagnostic.message);
        }
        match &material.kind {
            MaterialKind::Texture(image) => image.clone(),
            _ => bail!("{texture} is a flat color material, nothing to write"),
        }
    };

    image
        .to_rgba8()
        .save(out)
        .with_context(|| format!("writing {}", out.display()))?;
    eprintln!(
        "Wrote {} ({}x{}, {} frame(s), {:?})",
        out.display(),
        image.width,
        image.height,
        image.frame_count,
        image.blend_mode
    );
    Ok(())
}

#[derive(Serialize)]
struct InstanceSummary {
    thing: usize,
    template: String,
    model: String,
    position: [f32; 3],
    sector: u32,
}

#[derive(Serialize)]
struct LevelSummary<'a> {
    name: &'a str,
    options: &'a ImportOptions,
    vertices: usize,
    faces: usize,
    sectors: usize,
    materials: Vec<MaterialSummary>,
    models: Vec<&'a str>,
    instances: Vec<InstanceSummary>,
    diagnostics: &'a [Diagnostic],
}

fn summarize<'a>(scene: &'a Scene, options: &'a ImportOptions) -> LevelSummary<'a> {
    LevelSummary {
        name: &scene.name,
        options,
        vertices: scene.level.vertices.len(),
        faces: scene.level.faces.len(),
        sectors: scene.sectors.len(),
        materials: scene.materials.iter().map(|m| m.summary()).collect(),
        models: scene.models.keys().map(String::as_str).collect(),
        instances: scene
            .instances
            .iter()
            .map(|i| InstanceSummary {
                thing: i.thing_index,
                template: i.template_name.clone(),
                model: i.model.name.clone(),
                position: [i.position.x, i.position.y, i.position.z],
                sector: i.sector_id,
            })
            .collect(),
        diagnostics: &scene.diagnostics,
    }
}

fn export_level(path: &Path, level: &str, out: &Path, options: ImportOptions) -> Result<()> {
    let archive = open_archive(path)?;
    eprintln!("Assembling level '{}' ...", asset_stem(level));

    let assembler = SceneAssembler::new(&archive, options);
    let scene = assembler
        .assemble_level_entry(level)
        .with_context(|| format!("assembling {}", file_name(level)))?;

    let summary = summarize(&scene, assembler.options());
    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;

    eprintln!("Export complete!");
    eprintln!("  Faces: {}", summary.faces);
    eprintln!("  Materials: {}", summary.materials.len());
    eprintln!("  Instances: {} ({} models)", summary.instances.len(), summary.models.len());
    eprintln!("  Diagnostics: {}", summary.diagnostics.len());
    Ok(())
}
