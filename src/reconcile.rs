use crate::book::{BookGroup, BookId};
use crate::cover::{self, CoverProvider};
use crate::note::{self, NO_COVER, NOTE_EXTENSION};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Covers live here, relative to the output directory.
pub const COVERS_DIR: &str = "covers";

/// A note already present in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingNote {
    pub path: PathBuf,
    pub clippings: Option<usize>,
    pub cover: Option<String>,
}

/// BookId → note mapping recovered from note headers alone.
#[derive(Debug, Default)]
pub struct ArtifactIndex {
    by_id: HashMap<BookId, ExistingNote>,
    taken_names: HashSet<String>,
}

impl ArtifactIndex {
    /// Build the index from `(path, content)` pairs. Every file name is
    /// reserved, note or not; the first note seen for an id wins.
    pub fn from_snapshot<I>(files: I) -> Self
    where
        I: IntoIterator<Item = (PathBuf, String)>,
    {
        let mut index = ArtifactIndex::default();
        for (path, content) in files {
            if let Some(name) = path.file_name() {
                index.taken_names.insert(name.to_string_lossy().to_string());
            }
            let Some(header) = note::read_header(&content) else {
                continue;
            };
            if let Some(first) = index.by_id.get(&header.id) {
                warn!(
                    "duplicate note for {}: {} (keeping {})",
                    header.id,
                    path.display(),
                    first.path.display()
                );
                continue;
            }
            index.by_id.insert(
                header.id,
                ExistingNote {
                    path,
                    clippings: header.clippings,
                    cover: header.cover,
                },
            );
        }
        index
    }

    /// Read every `*.md` file directly under `dir`, in file-name order.
    /// A missing directory is an empty index.
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            return Ok(ArtifactIndex::default());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("scanning {}", dir.display()))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(NOTE_EXTENSION)
            {
                continue;
            }
            let content = match fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    warn!("cannot read {}: {e}", path.display());
                    String::new()
                }
            };
            files.push((path.to_path_buf(), content));
        }
        let index = Self::from_snapshot(files);
        debug!("found {} notes in {}", index.len(), dir.display());
        Ok(index)
    }

    pub fn get(&self, id: &BookId) -> Option<&ExistingNote> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn is_name_taken(&self, name: &str) -> bool {
        self.taken_names.contains(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Skip,
}

/// Per-book decision. A note whose recorded count cannot be read is
/// treated as stale.
pub fn decide(existing: Option<&ExistingNote>, clippings: usize, rebuild: bool) -> Action {
    match existing {
        None => Action::Create,
        Some(_) if rebuild => Action::Update,
        Some(note) if note.clippings == Some(clippings) => Action::Skip,
        Some(_) => Action::Update,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(PathBuf),
    Updated(PathBuf),
    Skipped(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Tally {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created(_) => self.created += 1,
            Outcome::Updated(_) => self.updated += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Drives create/update/skip for every book against one output directory.
pub struct Reconciler<'a> {
    output_dir: PathBuf,
    rebuild: bool,
    dry_run: bool,
    covers: Option<&'a dyn CoverProvider>,
}

impl<'a> Reconciler<'a> {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Reconciler {
            output_dir: output_dir.into(),
            rebuild: false,
            dry_run: false,
            covers: None,
        }
    }

    pub fn rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn covers(mut self, provider: &'a dyn CoverProvider) -> Self {
        self.covers = Some(provider);
        self
    }

    /// Scan once, then settle each book. A failed book is reported through
    /// `observer` and counted; it never stops the others.
    pub fn run<F>(&self, groups: &[BookGroup], mut observer: F) -> Result<Tally>
    where
        F: FnMut(&BookGroup, &Outcome),
    {
        let index = ArtifactIndex::scan(&self.output_dir)?;
        let mut claimed: HashSet<String> = HashSet::new();
        let mut tally = Tally::default();

        for group in groups {
            let outcome = match self.settle(group, &index, &mut claimed) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("{} ({}): {e:#}", group.title, group.id);
                    Outcome::Failed(format!("{e:#}"))
                }
            };
            tally.record(&outcome);
            observer(group, &outcome);
        }
        Ok(tally)
    }

    fn settle(
        &self,
        group: &BookGroup,
        index: &ArtifactIndex,
        claimed: &mut HashSet<String>,
    ) -> Result<Outcome> {
        let existing = index.get(&group.id);
        let action = decide(existing, group.clippings.len(), self.rebuild);
        let path = match (action, existing) {
            (Action::Create, _) | (_, None) => self.allocate_path(group, index, claimed),
            (_, Some(note)) => note.path.clone(),
        };
        debug!("{} -> {:?} {}", group.id, action, path.display());

        if action == Action::Skip {
            return Ok(Outcome::Skipped(path));
        }
        if !self.dry_run {
            let cover = self.resolve_cover(group, existing);
            let content = note::render_note(group, &cover);
            write_atomic(&path, &content)?;
        }
        Ok(match action {
            Action::Create => {
                info!("created {}", path.display());
                Outcome::Created(path)
            }
            _ => {
                info!("updated {}", path.display());
                Outcome::Updated(path)
            }
        })
    }

    fn allocate_path(
        &self,
        group: &BookGroup,
        index: &ArtifactIndex,
        claimed: &mut HashSet<String>,
    ) -> PathBuf {
        let name = note::candidate_file_names(group)
            .find(|n| !index.is_name_taken(n) && !claimed.contains(n))
            .unwrap_or_else(|| note::note_file_name(group));
        claimed.insert(name.clone());
        self.output_dir.join(name)
    }

    /// Relative cover reference for the header. Falls back to what is
    /// already on disk, then to `NO_COVER`.
    fn resolve_cover(&self, group: &BookGroup, existing: Option<&ExistingNote>) -> String {
        let on_disk = self.existing_cover(group, existing);
        if let Some(cover) = &on_disk {
            if !self.rebuild {
                return cover.clone();
            }
        }
        let fallback = || on_disk.clone().unwrap_or_else(|| NO_COVER.to_string());
        let Some(provider) = self.covers else {
            return fallback();
        };

        let bytes = match provider.fetch(&group.title, group.primary_author()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no cover found for {}", group.title);
                return fallback();
            }
            Err(e) => {
                warn!("cover lookup failed for {}: {e:#}", group.title);
                return fallback();
            }
        };
        let ext = cover::image_extension(&bytes).unwrap_or("jpg");
        let file_name = format!("{}.{ext}", group.id);
        let covers_dir = self.output_dir.join(COVERS_DIR);
        let written = fs::create_dir_all(&covers_dir)
            .map_err(anyhow::Error::from)
            .and_then(|_| write_atomic(&covers_dir.join(&file_name), &bytes));
        match written {
            Ok(()) => format!("{COVERS_DIR}/{file_name}"),
            Err(e) => {
                warn!("cannot save cover for {}: {e:#}", group.title);
                fallback()
            }
        }
    }

    fn existing_cover(&self, group: &BookGroup, existing: Option<&ExistingNote>) -> Option<String> {
        let recorded = existing
            .and_then(|n| n.cover.as_deref())
            .filter(|c| *c != NO_COVER && self.output_dir.join(c).is_file());
        if let Some(cover) = recorded {
            return Some(cover.to_string());
        }
        let entries = fs::read_dir(self.output_dir.join(COVERS_DIR)).ok()?;
        let mut found: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| {
                Path::new(name).file_stem().and_then(|s| s.to_str()) == Some(group.id.as_str())
            })
            .collect();
        found.sort();
        found.into_iter().next().map(|name| format!("{COVERS_DIR}/{name}"))
    }
}

/// Write through a temp file in the target directory so an interrupted run
/// never leaves a half-written note.
fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(contents.as_ref())?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
