//! Emission backends. Each backend renders the finished [`ProtocolModel`] into text artifacts;
//! writing them to disk is done separately by [`write_artifacts`].

pub mod cpp;
pub mod lua;
pub mod python;

use crate::config::Target;
use crate::error::GenError;
use crate::model::{Message, ProtocolModel};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile, TempPath};
use tracing::{debug, warn};

/// Comment lines are wrapped at this width (excluding indentation and comment markers).
pub const COMMENT_WIDTH: usize = 72;

/// Banner written at the top of every generated file.
pub const GENERATED_BANNER: &str = "Do not edit! This file is automatically generated by mavgen tool.";

/// One generated file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, contents: String) -> Self {
        Artifact { path: path.into(), contents }
    }
}

pub trait Emitter {
    fn target(&self) -> Target;

    /// Render all artifacts of this target. Must not touch the filesystem.
    fn emit(&self, model: &ProtocolModel) -> Result<Vec<Artifact>, GenError>;
}

pub fn emitter_for(target: Target) -> Box<dyn Emitter> {
    match target {
        Target::Cpp => Box::new(cpp::CppEmitter),
        Target::Python => Box::new(python::PythonEmitter),
        Target::Lua => Box::new(lua::LuaEmitter),
    }
}

/// Word-wrap `text` into comment lines. Paragraphs are separated by blank lines in the input;
/// every returned line starts with a single space.
pub fn wrap_comment(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in split_paragraphs(text) {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.len() + word.len() > COMMENT_WIDTH {
                lines.push(std::mem::take(&mut line));
            }
            line.push(' ');
            line.push_str(word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

/// `/** ... */` documentation block.
pub fn block_comment(out: &mut String, text: &str, indent: usize) {
    let lines = wrap_comment(text);
    if lines.is_empty() {
        return;
    }
    let pad = "    ".repeat(indent);
    out.push_str(&pad);
    out.push_str("/**");
    for line in &lines {
        out.push_str(line);
        out.push('\n');
        out.push_str(&pad);
        out.push_str(" *");
    }
    out.push_str("/\n");
}

/// Line comments with the given marker (`#`, `--`).
pub fn line_comment(out: &mut String, marker: &str, text: &str, indent: usize) {
    let pad = "    ".repeat(indent);
    for line in wrap_comment(text) {
        out.push_str(&pad);
        out.push_str(marker);
        out.push_str(&line);
        out.push('\n');
    }
}

/// Entry comment text: description followed by one paragraph per parameter, by index.
pub fn entry_comment(description: Option<&str>, params: &std::collections::BTreeMap<u32, String>) -> String {
    let mut text = String::new();
    if let Some(d) = description {
        text.push_str(d);
        text.push_str("\n\n");
    }
    for (index, p) in params {
        text.push_str(&format!("Param {}: {}\n\n", index, p));
    }
    text
}

/// Messages grouped by effective namespace, in order of first appearance of each namespace.
pub fn namespace_groups(model: &ProtocolModel) -> Vec<(Option<String>, Vec<&Message>)> {
    let ctx = model.context();
    let mut groups: Vec<(Option<String>, Vec<&Message>)> = Vec::new();
    for group in &model.groups {
        let ns = ctx.effective_namespace(group.namespace.as_deref()).map(str::to_string);
        let slot = match groups.iter().position(|(n, _)| *n == ns) {
            Some(i) => i,
            None => {
                groups.push((ns, Vec::new()));
                groups.len() - 1
            }
        };
        groups[slot].1.extend(model.messages_of(group));
    }
    groups
}

/// Write every artifact under `dir`, all or nothing.
///
/// Contents go to temporary files next to their destinations first and are moved into place
/// only once all of them are written. Replaced files are kept aside until every move succeeded;
/// a failed move puts them back, removes the files already moved in and the directories this
/// call created.
pub fn write_artifacts(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>, GenError> {
    let mut created = Vec::new();
    let result = stage(dir, artifacts, &mut created).and_then(commit);
    if result.is_err() {
        for d in created.iter().rev() {
            if let Err(e) = fs::remove_dir(d) {
                debug!(path = %d.display(), error = %e, "left directory in place");
            }
        }
    }
    result
}

type Staged = Vec<(NamedTempFile, PathBuf)>;

fn stage(dir: &Path, artifacts: &[Artifact], created: &mut Vec<PathBuf>) -> Result<Staged, GenError> {
    let mut staged = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let dest = dir.join(&artifact.path);
        let parent = dest.parent().unwrap_or(dir);
        create_dirs(parent, created)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(artifact.contents.as_bytes())?;
        tmp.flush()?;
        debug!(path = %dest.display(), bytes = artifact.contents.len(), "staged artifact");
        staged.push((tmp, dest));
    }
    Ok(staged)
}

/// `fs::create_dir_all`, recording every directory it had to create.
fn create_dirs(path: &Path, created: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut missing = Vec::new();
    let mut cur = Some(path);
    while let Some(p) = cur {
        if p.as_os_str().is_empty() || p.exists() {
            break;
        }
        missing.push(p.to_path_buf());
        cur = p.parent();
    }
    for p in missing.into_iter().rev() {
        fs::create_dir(&p)?;
        created.push(p);
    }
    Ok(())
}

fn persist_error(dest: &Path, reason: impl ToString) -> GenError {
    GenError::Persist { path: dest.display().to_string(), reason: reason.to_string() }
}

fn commit(staged: Staged) -> Result<Vec<PathBuf>, GenError> {
    if let Some((_, dest)) = staged.iter().find(|(_, dest)| dest.is_dir()) {
        return Err(persist_error(dest, "destination is a directory"));
    }
    let mut moved: Vec<(PathBuf, Option<TempPath>)> = Vec::with_capacity(staged.len());
    for (tmp, dest) in staged {
        match replace(tmp, &dest) {
            Ok(previous) => moved.push((dest, previous)),
            Err(e) => {
                rollback(moved);
                return Err(e);
            }
        }
    }
    // dropping the kept-aside files deletes them
    Ok(moved.into_iter().map(|(dest, _)| dest).collect())
}

/// Move `tmp` onto `dest`. The file it replaces, if any, is returned as a temporary path.
fn replace(tmp: NamedTempFile, dest: &Path) -> Result<Option<TempPath>, GenError> {
    let previous = if dest.exists() {
        let parent = dest.parent().unwrap_or(Path::new("."));
        let aside = Builder::new().prefix(".mavgen-previous").tempfile_in(parent)?.into_temp_path();
        fs::rename(dest, &aside)?;
        Some(aside)
    } else {
        None
    };
    match tmp.persist(dest) {
        Ok(_) => Ok(previous),
        Err(e) => {
            if let Some(aside) = previous {
                rollback(vec![(dest.to_path_buf(), Some(aside))]);
            }
            Err(persist_error(dest, e.error))
        }
    }
}

/// Undo moves, newest first.
fn rollback(moved: Vec<(PathBuf, Option<TempPath>)>) {
    for (dest, previous) in moved.into_iter().rev() {
        let undone = match previous {
            Some(aside) => aside.persist(&dest).map_err(|e| e.error),
            None => fs::remove_file(&dest),
        };
        if let Err(e) = undone {
            warn!(path = %dest.display(), error = %e, "could not undo artifact write");
        }
    }
}
