use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sensorhub_core::error::{HubError, Result};
use sensorhub_core::{
    Catalog, ContentHash, DeviceKind, DownloadManager, Ingested, SensorHub, Settings, TaskState,
};
use serde_json::json;
use walkdir::WalkDir;

use crate::presentation::cli::HubArgs;

const RAW_EXTENSION: &str = "rawdata";

fn settings_from_args(args: &HubArgs) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(root) = &args.root {
        settings.storage.root = root.clone();
    }
    Ok(settings)
}

fn hub_from_args(args: &HubArgs) -> Result<SensorHub> {
    SensorHub::open(settings_from_args(args)?)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Expand `inputs` into upload candidates. Files are taken as given;
/// directories yield their `.rawdata` files, one level deep unless `recursive`.
fn collect_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            out.push(input.clone());
            continue;
        }
        let depth = if recursive { usize::MAX } else { 1 };
        let mut found = Vec::new();
        for entry in WalkDir::new(input).max_depth(depth) {
            let entry = entry.map_err(std::io::Error::from)?;
            let p = entry.path();
            if entry.file_type().is_file() && p.extension().is_some_and(|e| e == RAW_EXTENSION) {
                found.push(p.to_path_buf());
            }
        }
        found.sort();
        out.extend(found);
    }
    Ok(out)
}

fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_ingested(ing: &Ingested) {
    println!(
        "{:<36} {:<32} {:>10} {:<8} {}{}",
        ing.file.id,
        ing.file.hash,
        ing.file.size,
        if ing.deduplicated { "dedup" } else { "stored" },
        ing.file.display_name(),
        if ing.created { "" } else { " (already registered)" },
    );
}

pub fn handle_ingest(
    args: &HubArgs,
    inputs: Vec<PathBuf>,
    recursive: bool,
    device: Option<DeviceKind>,
) -> Result<()> {
    let files = collect_inputs(&inputs, recursive)?;
    if files.is_empty() {
        eprintln!("ingest: no .{RAW_EXTENSION} files found");
        return Ok(());
    }
    let hub = hub_from_args(args)?;
    for path in files {
        let src = BufReader::new(File::open(&path)?);
        let ing = hub.ingest(src, &upload_name(&path), device)?;
        print_ingested(&ing);
    }
    Ok(())
}

pub fn handle_import(
    args: &HubArgs,
    zst: PathBuf,
    hash_hex: &str,
    name: Option<String>,
    device: Option<DeviceKind>,
) -> Result<()> {
    let expected = ContentHash::from_hex(hash_hex)?;
    let filename = name.unwrap_or_else(|| {
        let n = upload_name(&zst);
        n.strip_suffix(".zst").map(str::to_string).unwrap_or(n)
    });
    let hub = hub_from_args(args)?;
    let src = BufReader::new(File::open(&zst)?);
    let ing = hub.import_compressed(src, &expected, &filename, device)?;
    print_ingested(&ing);
    Ok(())
}

pub fn handle_verify(args: &HubArgs, hash_hex: &str) -> Result<()> {
    let hash = ContentHash::from_hex(hash_hex)?;
    let hub = hub_from_args(args)?;
    let v = hub.verify(&hash)?;
    println!(
        "frames={} compressed={} original={} rebuilt={}",
        v.frame_index.frames.len(),
        v.size,
        v.file_size_bytes,
        v.rebuilt
    );
    eprintln!("verify: OK");
    Ok(())
}

pub fn handle_frames(args: &HubArgs, hash_hex: &str) -> Result<()> {
    let hash = ContentHash::from_hex(hash_hex)?;
    let hub = hub_from_args(args)?;
    let blob = hub
        .catalog()
        .get_blob(&hash)
        .ok_or_else(|| HubError::NotFound(format!("blob {hash}")))?;
    match blob.frame_index {
        Some(index) => print_json(&index),
        None => {
            eprintln!("frames: no frame index recorded; run `verify {hash}` to rebuild it");
            Ok(())
        }
    }
}

pub fn handle_batches(args: &HubArgs, hash_hex: &str) -> Result<()> {
    let hash = ContentHash::from_hex(hash_hex)?;
    let hub = hub_from_args(args)?;
    let batches = hub.plan(&hash)?;
    if batches.is_empty() {
        println!("single-stream (no usable frame index)");
        return Ok(());
    }
    for b in &batches {
        println!(
            "#{:<5} frames={}-{} count={} c_bytes={}",
            b.batch_id,
            b.start_frame_idx,
            b.end_frame_idx,
            b.frames.len(),
            b.compressed_bytes
        );
    }
    Ok(())
}

pub fn handle_ls(args: &HubArgs, stats: bool) -> Result<()> {
    let hub = hub_from_args(args)?;
    let catalog = hub.catalog();
    for f in catalog.list_files() {
        let status = catalog
            .get_parse_result(&f.id)
            .map(|r| r.status.as_str())
            .unwrap_or("-");
        println!(
            "{:<36} {:<5} {:<10} {:>10} {}",
            f.id,
            f.device,
            status,
            f.size,
            f.display_name()
        );
    }
    if stats {
        print_json(&catalog.stats())?;
    }
    Ok(())
}

pub fn handle_rm(args: &HubArgs, file_id: &str) -> Result<()> {
    let hub = hub_from_args(args)?;
    let deleted = hub.delete_file(file_id)?;
    match deleted.orphaned {
        Some(hash) => eprintln!("rm: {} (blob {hash} removed)", deleted.file.display_name()),
        None => eprintln!("rm: {}", deleted.file.display_name()),
    }
    Ok(())
}

pub fn handle_parse(
    args: &HubArgs,
    file_id: &str,
    device: Option<DeviceKind>,
    watch: bool,
) -> Result<()> {
    let hub = hub_from_args(args)?;
    if hub.catalog().get_file(file_id).is_none() {
        return Err(HubError::NotFound(format!("file {file_id}")));
    }

    let result = if watch {
        std::thread::scope(|s| {
            let hub = &hub;
            s.spawn(move || {
                for ev in hub.subscribe(file_id) {
                    if let Ok(line) = serde_json::to_string(&ev) {
                        eprintln!("{line}");
                    }
                }
            });
            hub.parse_file(file_id, device)
        })?
    } else {
        hub.parse_file(file_id, device)?
    };

    println!(
        "{} status={} duration={}",
        file_id, result.status, result.duration
    );
    if let Some(dir) = &result.processed_dir {
        println!("output: {}", dir.display());
    }
    Ok(())
}

pub fn handle_progress(args: &HubArgs, file_id: &str) -> Result<()> {
    let hub = hub_from_args(args)?;
    // Live progress only exists inside the process running the parse.
    if let Some(state) = hub.progress().get(file_id) {
        return print_json(&state);
    }
    let r = hub
        .catalog()
        .get_parse_result(file_id)
        .ok_or_else(|| HubError::NotFound(format!("parse result for {file_id}")))?;
    print_json(&json!({
        "file_id": r.file_id,
        "status": r.status,
        "progress": r.progress,
        "duration": r.duration,
        "device_type_used": r.device_type_used,
        "error_message": r.error_message,
        "updated_at": r.updated_at,
    }))
}

/// Opens the catalog alone; `SensorHub::open` would already have reset the
/// stale entries before they could be counted.
pub fn handle_recover(args: &HubArgs) -> Result<()> {
    let settings = settings_from_args(args)?;
    std::fs::create_dir_all(&settings.storage.root)?;
    let n = Catalog::open(&settings.storage.root)?.recover_stale()?;
    println!("recovered {n} stale parse(s)");
    Ok(())
}

pub fn handle_download(args: &HubArgs, pairs: Vec<String>) -> Result<()> {
    if pairs.len() % 2 != 0 {
        return Err(HubError::Download(
            "expected URL FILENAME pairs".to_string(),
        ));
    }
    let settings = settings_from_args(args)?;
    let cfg = settings.download;
    let hub = Arc::new(SensorHub::open(settings)?);
    let manager = DownloadManager::new(Arc::clone(&hub), cfg)?;
    for pair in pairs.chunks(2) {
        manager.start_download(&pair[0], &pair[1])?;
    }

    let states = manager.join();
    print_json(&states)?;
    let failed = states.values().filter(|s| **s == TaskState::Failed).count();
    if failed > 0 {
        return Err(HubError::Download(format!("{failed} download(s) failed")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_yield_rawdata_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("day2");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.rawdata"), b"x").unwrap();
        std::fs::write(dir.path().join("a.rawdata"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(nested.join("c.rawdata"), b"x").unwrap();

        let flat = collect_inputs(&[dir.path().to_path_buf()], false).unwrap();
        let names: Vec<_> = flat.iter().map(|p| upload_name(p)).collect();
        assert_eq!(names, ["a.rawdata", "b.rawdata"]);

        let deep = collect_inputs(&[dir.path().to_path_buf()], true).unwrap();
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&nested.join("c.rawdata")));
    }

    #[test]
    fn explicit_files_are_kept_whatever_their_extension() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("log.txt");
        std::fs::write(&f, b"x").unwrap();
        assert_eq!(collect_inputs(&[f.clone()], false).unwrap(), vec![f]);
    }

    #[test]
    fn root_flag_overrides_configured_root() {
        let dir = tempfile::tempdir().unwrap();
        let args = HubArgs {
            root: Some(dir.path().join("hub")),
            config: Some(dir.path().join("missing").display().to_string()),
        };
        let s = settings_from_args(&args).unwrap();
        assert_eq!(s.storage.root, dir.path().join("hub"));
    }

    #[test]
    fn ingest_then_ls_through_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        std::fs::create_dir(&logs).unwrap();
        std::fs::write(logs.join("Ring_a.rawdata"), b"2024-05-01 10:00:00.000, 3C\n").unwrap();
        let args = HubArgs {
            root: Some(dir.path().join("hub")),
            config: Some(dir.path().join("missing").display().to_string()),
        };

        handle_ingest(&args, vec![logs], false, None).unwrap();
        handle_ls(&args, true).unwrap();

        let hub = hub_from_args(&args).unwrap();
        let files = hub.catalog().list_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].device, DeviceKind::Ring);
    }
}
