use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::{error, info, warn};
use walkdir::WalkDir;

use photo_sheet::state::library::Session;
use photo_sheet::{Config, Editor, Exporter, Raster};

/// Image formats accepted by the folder import
const PHOTO_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Result of a folder import operation
#[derive(Debug, Clone, Copy)]
struct ImportResult {
    imported_count: usize,
    skipped_count: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(folder) = args.next().map(PathBuf::from) else {
        eprintln!("usage: photo-sheet <folder> [output-dir]");
        return ExitCode::from(2);
    };
    let output_arg = args.next().map(PathBuf::from);

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let session = Session::new(config.page, config.layout, config.default_preset);
    let editor = Editor::new(session);

    let result = import_folder(&editor, &folder).await;
    info!(
        "📊 Import summary: {} added, {} skipped",
        result.imported_count, result.skipped_count
    );

    let output = match editor.export(&Exporter::default()).await {
        Ok(output) => output,
        Err(e) => {
            error!("❌ Export failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    for id in &output.unplaceable {
        warn!("⚠️  Photo {} is larger than the page and was left out", id);
    }

    let Some(dir) = output_arg.or_else(|| config.output_dir()) else {
        error!("❌ No output directory given and none could be determined");
        return ExitCode::FAILURE;
    };
    match output.write_to(&dir).await {
        Ok(path) => {
            info!(
                "✅ Wrote {} page(s) to {} ({} failed)",
                output.page_count(),
                path.display(),
                output.failures.len()
            );
            write_preview(&editor, config.preview_scale, &path).await;
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `$PHOTO_SHEET_CONFIG`, else `<config dir>/photo-sheet/config.json`
fn load_config() -> Result<Config, photo_sheet::ConfigError> {
    let path = std::env::var_os("PHOTO_SHEET_CONFIG")
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|dir| dir.join("photo-sheet").join("config.json")));

    match path {
        Some(path) => Config::load_or_default(&path),
        None => Ok(Config::default()),
    }
}

/// Save page 1 at preview density as `<pdf stem>-preview.png`
async fn write_preview(editor: &Editor, scale: f64, pdf_path: &Path) {
    let (surface, page) = match editor.preview(0, scale) {
        Ok(preview) => preview,
        Err(e) => {
            warn!("⚠️  Preview skipped: {}", e);
            return;
        }
    };
    let encoded = match Raster::encode(&surface) {
        Ok(raster) => raster,
        Err(e) => {
            warn!("⚠️  Preview skipped: {}", e);
            return;
        }
    };

    let stem = pdf_path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let path = pdf_path.with_file_name(format!("{stem}-preview.png"));
    match tokio::fs::write(&path, encoded.bytes()).await {
        Ok(()) => info!(
            "🖼️  Preview of page 1 ({} photo(s), {}x{} px) saved to {}",
            page.slots.len(),
            surface.width(),
            surface.height(),
            path.display()
        ),
        Err(e) => warn!("⚠️  Could not write preview {}: {}", path.display(), e),
    }
}

/// Ingest every photo under `folder`, in file name order
async fn import_folder(editor: &Editor, folder: &Path) -> ImportResult {
    let mut imported_count = 0;
    let mut skipped_count = 0;

    info!("🔍 Scanning folder: {}", folder.display());

    for entry in WalkDir::new(folder)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let is_photo = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| PHOTO_EXTENSIONS.contains(&ext.as_str()));
        if !is_photo {
            continue;
        }

        match editor.ingest_file(path).await {
            Ok(_) => imported_count += 1,
            Err(e) => {
                warn!("⚠️  Error importing {}: {}", path.display(), e);
                skipped_count += 1;
            }
        }
    }

    ImportResult {
        imported_count,
        skipped_count,
    }
}
