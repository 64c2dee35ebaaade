//! dist_toolkit 命令行工具
//!
//! # 使用方法
//!
//! ```bash
//! # 识别文件格式并输出摘要
//! dist_toolkit inspect effects.tkfx
//!
//! # 把 OBJ 模型导入为 ModelData
//! dist_toolkit import-obj ship.obj ship.tkmd
//!
//! # 把字体中嵌入的位图导出为 PNG
//! dist_toolkit export-font-pages arial.spritefont pages/
//! ```
//!
//! # 通用参数
//!
//! - `--config <path>`: 配置文件（默认 `dist_toolkit.toml`）
//! - `--verbose` / `--trace` / `--quiet`: 日志级别
//! - `--log-file <path>`: 同时输出日志到文件

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use dist_toolkit::core::{log, Config};
use dist_toolkit::effect::EffectData;
use dist_toolkit::font::{FontBitmap, SpriteFontData};
use dist_toolkit::model::{ModelData, ModelImporter, ObjImporter};
use dist_toolkit::serialization::{Container, ReaderOptions};
use dist_toolkit::{app_error, app_info};

const DEFAULT_CONFIG: &str = "dist_toolkit.toml";

/// 带值的参数，提取位置参数时一并跳过
const VALUE_FLAGS: [&str; 2] = ["--config", "--log-file"];

const USAGE: &str = "\
usage: dist_toolkit [options] <command> [args]

commands:
  inspect <file>                       detect the container format and print a summary
  import-obj <in.obj> <out.tkmd>       import a Wavefront OBJ as ModelData
  export-font-pages <font> <out_dir>   write embedded font bitmaps as PNG

options:
  --config <path>   configuration file (default dist_toolkit.toml)
  --verbose         debug logging
  --trace           trace logging
  --quiet           warnings and errors only
  --log-file <path> also log to a daily rolling file";

fn positional_args(args: &[String]) -> Vec<&str> {
    let mut positional = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            positional.push(arg.as_str());
        }
    }
    positional
}

fn config_path(args: &[String]) -> PathBuf {
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // 1. 加载配置（在初始化日志之前）
    let path = config_path(&args);
    let mut config = if path.exists() {
        match Config::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // 2. 应用命令行参数
    config.apply_args(&args);

    // 3. 验证配置
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // 4. 初始化日志系统
    let log_file = config
        .logging
        .file_output
        .then_some(config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    app_info!(version = env!("CARGO_PKG_VERSION"), "dist_toolkit starting");

    // 5. 执行命令
    if let Err(e) = run(&positional_args(&args), &config) {
        app_error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &[&str], config: &Config) -> anyhow::Result<()> {
    let options = config.reader_options();
    match args {
        ["inspect", file] => inspect(Path::new(file), options),
        ["import-obj", input, output] => import_obj(Path::new(input), Path::new(output)),
        ["export-font-pages", font, out_dir] => {
            export_font_pages(Path::new(font), Path::new(out_dir), options)
        }
        _ => bail!("{}", USAGE),
    }
}

fn inspect(path: &Path, options: ReaderOptions) -> anyhow::Result<()> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    app_info!(path = %path.display(), bytes = data.len(), "inspecting");

    if let Some(effects) = EffectData::load_with_options(&data, options)? {
        println!("EffectData (version {:#x})", EffectData::VERSION);
        println!("  shaders: {}", effects.shaders.len());
        for (i, shader) in effects.shaders.iter().enumerate() {
            println!(
                "    [{}] {:?} {} bytes, {} parameters{}",
                i,
                shader.ty,
                shader.bytecode.len(),
                shader.parameters().count(),
                shader.name.as_deref().map(|n| format!(", exported as {}", n)).unwrap_or_default()
            );
        }
        println!("  effects: {}", effects.effects.len());
        for effect in &effects.effects {
            let passes: usize = effect.techniques.iter().map(|t| t.passes.len()).sum();
            println!(
                "    {}: {} techniques, {} passes",
                effect.name,
                effect.techniques.len(),
                passes
            );
            effect.check_links(effects.shaders.len())?;
        }
        return Ok(());
    }

    if let Some(model) = ModelData::load_with_options(&data, options)? {
        println!("ModelData (version {:#x})", ModelData::VERSION);
        println!("  textures: {}", model.textures.len());
        println!("  materials: {}", model.materials.len());
        println!("  bones: {}", model.bones.len());
        println!("  meshes: {}", model.meshes.len());
        for mesh in &model.meshes {
            println!(
                "    {}: {} parts, radius {:.3}",
                mesh.name,
                mesh.mesh_parts.len(),
                mesh.bounding_sphere.radius
            );
        }
        println!("  vertices: {}", model.vertex_count());
        model.validate().context("model references are inconsistent")?;
        return Ok(());
    }

    if let Some(font) = SpriteFontData::load_with_options(&data, options)? {
        println!("SpriteFontData");
        println!("  name: {}", if font.font_name.is_empty() { "(unnamed)" } else { &font.font_name });
        println!("  line spacing: {}", font.line_spacing);
        println!("  glyphs: {}", font.glyphs.len());
        println!("  kernings: {}", font.kernings.len());
        for (i, bitmap) in font.bitmaps.iter().enumerate() {
            match bitmap {
                FontBitmap::External(file) => println!("  page {}: {}", i, file),
                FontBitmap::Image(b) => {
                    println!("  page {}: {}x{} {}", i, b.width, b.height, b.format)
                }
            }
        }
        return Ok(());
    }

    bail!("{}: not an EffectData, ModelData or sprite font file", path.display())
}

fn import_obj(input: &Path, output: &Path) -> anyhow::Result<()> {
    let model = ObjImporter::import_file(input)?;
    model
        .save_to_file(output)
        .with_context(|| format!("writing {}", output.display()))?;
    app_info!(
        input = %input.display(),
        output = %output.display(),
        meshes = model.meshes.len(),
        vertices = model.vertex_count(),
        "model imported"
    );
    Ok(())
}

fn export_font_pages(font_path: &Path, out_dir: &Path, options: ReaderOptions) -> anyhow::Result<()> {
    let data = std::fs::read(font_path).with_context(|| format!("reading {}", font_path.display()))?;
    let Some(font) = SpriteFontData::load_with_options(&data, options)? else {
        bail!("{}: not a sprite font", font_path.display());
    };
    std::fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let stem = font_path.file_stem().and_then(|s| s.to_str()).unwrap_or("font");
    let mut written = 0;
    for (i, bitmap) in font.bitmaps.iter().enumerate() {
        match bitmap {
            FontBitmap::Image(bitmap) => {
                let target = out_dir.join(format!("{}_{}.png", stem, i));
                bitmap.save_png(&target)?;
                println!("{}", target.display());
                written += 1;
            }
            FontBitmap::External(file) => {
                app_info!(page = i, file = %file, "page is an external file, skipped");
            }
        }
    }
    app_info!(pages = written, "font pages exported");
    Ok(())
}
