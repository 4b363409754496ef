//! Crash-safe snapshot persistence for the workspace.
//!
//! The whole entity graph is written as one JSON document. Writes go to a
//! temporary file in the target directory first and are renamed into place,
//! so the snapshot on disk is never partially written.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use greenlight_models::{Actor, Client, Epic, Project, SlaRule, Story};

use crate::error::{PersistenceError, Result};
use crate::store::Workspace;

/// Serializable image of a [`Workspace`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub epics: Vec<Epic>,
    #[serde(default)]
    pub stories: Vec<Story>,
    #[serde(default)]
    pub sla_rules: Vec<SlaRule>,
}

impl WorkspaceSnapshot {
    /// Captures the current contents of a workspace.
    pub fn capture(workspace: &Workspace) -> Result<Self> {
        Ok(Self {
            actors: workspace.all_actors()?,
            clients: workspace.all_clients()?,
            projects: workspace.all_projects()?,
            epics: workspace.all_epics()?,
            stories: workspace.all_stories()?,
            sla_rules: workspace.all_sla_rules()?,
        })
    }

    /// Builds a fresh workspace from this snapshot.
    pub fn restore(self) -> Result<Workspace> {
        let workspace = Workspace::new();
        for actor in self.actors {
            workspace.put_actor(actor)?;
        }
        for client in self.clients {
            workspace.put_client(client)?;
        }
        let mut uow = workspace.begin();
        for project in self.projects {
            uow.save_project(project);
        }
        for epic in self.epics {
            uow.save_epic(epic);
        }
        for story in self.stories {
            uow.save_story(story);
        }
        for rule in self.sla_rules {
            uow.save_sla_rule(rule);
        }
        uow.commit()?;
        Ok(workspace)
    }
}

/// Loads and saves workspace snapshots at a fixed path.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a snapshot store writing to the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Saves the workspace atomically.
    pub fn save(&self, workspace: &Workspace) -> Result<()> {
        let snapshot = WorkspaceSnapshot::capture(workspace)?;
        let json = serde_json::to_string_pretty(&snapshot)?;
        self.atomic_write(json.as_bytes())
    }

    /// Loads the workspace from disk.
    ///
    /// Returns an empty workspace if no snapshot file exists yet.
    pub fn load(&self) -> Result<Workspace> {
        if !self.path.exists() {
            return Ok(Workspace::new());
        }
        let data = fs::read_to_string(&self.path).map_err(|source| PersistenceError::ReadError {
            path: self.path.clone(),
            source,
        })?;
        let snapshot: WorkspaceSnapshot = serde_json::from_str(&data)?;
        snapshot.restore()
    }

    /// Writes to a temp file in the same directory, then renames into place.
    fn atomic_write(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| PersistenceError::WriteError {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut temp =
            tempfile::NamedTempFile::new_in(dir).map_err(|source| PersistenceError::WriteError {
                path: self.path.clone(),
                source,
            })?;
        temp.write_all(data)
            .and_then(|_| temp.flush())
            .map_err(|source| PersistenceError::WriteError {
                path: self.path.clone(),
                source,
            })?;
        temp.persist(&self.path)
            .map_err(|e| PersistenceError::WriteError {
                path: self.path.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenlight_models::{ActorId, EpicId};
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("workspace.json"));

        let workspace = Workspace::new();
        let manager = Actor::new("maria", 4);
        workspace.put_actor(manager.clone()).unwrap();

        let project = Project::new("Rollout", manager.id.clone());
        let epic = Epic::new("Auth", project.id.clone(), manager.id.clone());
        let story = Story::new("Login", epic.id.clone(), project.id.clone());
        let mut uow = workspace.begin();
        uow.save_project(project.clone());
        uow.save_epic(epic.clone());
        uow.save_story(story.clone());
        uow.commit().unwrap();

        store.save(&workspace).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.actor(&manager.id).unwrap(), manager);
        assert_eq!(loaded.project(&project.id).unwrap(), project);
        assert_eq!(loaded.stories_of(&epic.id).unwrap(), vec![story]);
    }

    #[test]
    fn test_load_missing_file_gives_empty_workspace() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("absent.json"));

        let workspace = store.load().unwrap();
        assert!(workspace
            .actor(&ActorId::from_string("actor-x"))
            .is_err());
        assert!(workspace
            .stories_of(&EpicId::from_string("epic-x"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested/dir/workspace.json"));

        store.save(&Workspace::new()).unwrap();
        assert!(dir.path().join("nested/dir/workspace.json").exists());
    }
}
