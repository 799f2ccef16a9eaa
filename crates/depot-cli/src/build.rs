//! # Build Subcommands
//!
//! Thin wrappers over [`depot_store::BuildSlot`]. Output goes to the given
//! writer so the handlers can be exercised without a terminal.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use depot_core::SlotState;
use depot_store::{FsBuildSlot, ReplacePolicy};

/// Build-slot subcommands.
#[derive(Subcommand, Debug)]
pub enum BuildCommand {
    /// Print the current build name, or `(none)`.
    Current,
    /// Print the slot state without creating or repairing anything.
    Status,
    /// Upload a local archive and make it the current build.
    Upload(UploadArgs),
    /// Delete the current build.
    Delete,
}

/// Arguments for `depot upload`.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Path to the `.zip` archive.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Store under this name instead of the file's own name.
    #[arg(long)]
    pub name: Option<String>,

    /// Keep the previous build on disk instead of deleting it.
    #[arg(long)]
    pub retain_previous: bool,
}

/// Execute a build subcommand against `uploads_dir`.
pub fn run_build(command: &BuildCommand, uploads_dir: &Path, out: &mut impl Write) -> Result<u8> {
    tracing::debug!(dir = %uploads_dir.display(), ?command, "running build command");
    match command {
        BuildCommand::Current => cmd_current(&depot_store::open_dir(uploads_dir), out),
        BuildCommand::Status => cmd_status(&depot_store::open_dir(uploads_dir), out),
        BuildCommand::Upload(args) => {
            let policy = if args.retain_previous {
                ReplacePolicy::RetainPrevious
            } else {
                ReplacePolicy::DeletePrevious
            };
            let slot = depot_store::open_dir(uploads_dir).with_policy(policy);
            cmd_upload(&slot, args, out)
        }
        BuildCommand::Delete => cmd_delete(&depot_store::open_dir(uploads_dir), out),
    }
}

fn cmd_current(slot: &FsBuildSlot, out: &mut impl Write) -> Result<u8> {
    let current = slot.current().context("failed to read current build")?;
    match current {
        Some(name) => writeln!(out, "{name}")?,
        None => writeln!(out, "(none)")?,
    }
    Ok(0)
}

fn cmd_status(slot: &FsBuildSlot, out: &mut impl Write) -> Result<u8> {
    let state = slot.state().context("failed to inspect uploads directory")?;
    match &state {
        SlotState::Empty => writeln!(out, "empty")?,
        SlotState::Present(name) => writeln!(out, "present {name}")?,
        SlotState::Dangling(name) => writeln!(out, "dangling {name}")?,
    }
    Ok(0)
}

fn cmd_upload(slot: &FsBuildSlot, args: &UploadArgs, out: &mut impl Write) -> Result<u8> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => match args.file.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => bail!("cannot derive a file name from {}", args.file.display()),
        },
    };

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read file: {}", args.file.display()))?;

    let receipt = slot
        .upload(&name, &bytes)
        .with_context(|| format!("upload of {name} failed"))?;

    writeln!(
        out,
        "OK: {} is now current ({} bytes)",
        receipt.file_name, receipt.bytes_written
    )?;
    if let Some(previous) = &receipt.replaced {
        let fate = if receipt.removed_previous { "removed" } else { "kept" };
        writeln!(out, "previous build {previous} {fate}")?;
    }
    Ok(0)
}

fn cmd_delete(slot: &FsBuildSlot, out: &mut impl Write) -> Result<u8> {
    let outcome = slot.delete_current().context("failed to delete current build")?;
    writeln!(out, "{}", outcome.message())?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(command: BuildCommand, dir: &Path) -> (u8, String) {
        let mut out = Vec::new();
        let code = run_build(&command, dir, &mut out).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    fn upload_args(file: PathBuf) -> UploadArgs {
        UploadArgs {
            file,
            name: None,
            retain_previous: false,
        }
    }

    #[test]
    fn current_on_fresh_directory_prints_none() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let (code, out) = run(BuildCommand::Current, &uploads);
        assert_eq!(code, 0);
        assert_eq!(out.trim(), "(none)");
        assert!(uploads.join("metadata.json").exists());
    }

    #[test]
    fn status_does_not_create_directory() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let (_, out) = run(BuildCommand::Status, &uploads);
        assert_eq!(out.trim(), "empty");
        assert!(!uploads.exists());
    }

    #[test]
    fn upload_then_current_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let archive = dir.path().join("game-v1.zip");
        std::fs::write(&archive, b"PK-one").unwrap();

        let (code, out) = run(BuildCommand::Upload(upload_args(archive)), &uploads);
        assert_eq!(code, 0);
        assert!(out.contains("game-v1.zip is now current (6 bytes)"));

        let (_, out) = run(BuildCommand::Current, &uploads);
        assert_eq!(out.trim(), "game-v1.zip");
        let (_, out) = run(BuildCommand::Status, &uploads);
        assert_eq!(out.trim(), "present game-v1.zip");

        let (_, out) = run(BuildCommand::Delete, &uploads);
        assert_eq!(out.trim(), "File deleted successfully");
        let (_, out) = run(BuildCommand::Current, &uploads);
        assert_eq!(out.trim(), "(none)");
    }

    #[test]
    fn upload_with_name_and_retain() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let archive = dir.path().join("build.bin");
        std::fs::write(&archive, b"x").unwrap();

        let mut args = upload_args(archive.clone());
        args.name = Some("game-v1.zip".into());
        run(BuildCommand::Upload(args), &uploads);

        let args = UploadArgs {
            file: archive,
            name: Some("game-v2.zip".into()),
            retain_previous: true,
        };
        let (_, out) = run(BuildCommand::Upload(args), &uploads);
        assert!(out.contains("previous build game-v1.zip kept"));
        assert!(uploads.join("game-v1.zip").exists());
    }

    #[test]
    fn status_reports_dangling_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let archive = dir.path().join("game.zip");
        std::fs::write(&archive, b"x").unwrap();
        run(BuildCommand::Upload(upload_args(archive)), &uploads);
        std::fs::remove_file(uploads.join("game.zip")).unwrap();

        let (_, out) = run(BuildCommand::Status, &uploads);
        assert_eq!(out.trim(), "dangling game.zip");
    }

    #[test]
    fn upload_of_non_zip_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("notes.txt");
        std::fs::write(&archive, b"x").unwrap();

        let mut out = Vec::new();
        let err = run_build(
            &BuildCommand::Upload(upload_args(archive)),
            &dir.path().join("uploads"),
            &mut out,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Only ZIP files are allowed"));
    }

    #[test]
    fn upload_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let err = run_build(
            &BuildCommand::Upload(upload_args(dir.path().join("absent.zip"))),
            &dir.path().join("uploads"),
            &mut out,
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to read file"));
    }
}
