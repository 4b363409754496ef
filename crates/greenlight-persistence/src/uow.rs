//! Unit of work: transactional load-mutate-commit over the workspace.
//!
//! Every read records the version it observed (including reads that found
//! nothing). `commit` re-checks all observed versions under the write lock
//! and applies the staged writes only if none moved, so two overlapping
//! operations can never both act on stale sibling state — the loser gets a
//! `Conflict` and is re-run by the orchestrator.

use std::collections::HashMap;

use greenlight_models::{
    Actor, ActorId, Client, ClientId, Epic, EpicId, Project, ProjectId, SlaRule, SlaRuleId, Story,
    StoryId,
};

use crate::error::{PersistenceError, Result};
use crate::store::{not_found_actor, Key, Record, Workspace};

/// A transaction over the [`Workspace`].
///
/// Reads see the workspace plus this transaction's own staged writes.
/// Nothing is visible to other readers until [`UnitOfWork::commit`].
pub struct UnitOfWork<'a> {
    store: &'a Workspace,
    /// First-read version of every record this transaction touched.
    /// `None` means the record was observed absent.
    observed: HashMap<Key, Option<u64>>,
    /// Staged writes. `None` means delete.
    staged: HashMap<Key, Option<Record>>,
}

impl<'a> UnitOfWork<'a> {
    pub(crate) fn new(store: &'a Workspace) -> Self {
        Self {
            store,
            observed: HashMap::new(),
            staged: HashMap::new(),
        }
    }

    /// Loads an actor, recording the read for the commit-time check.
    pub fn actor(&mut self, id: &ActorId) -> Result<Actor> {
        match self.read(Key::Actor(id.clone()))? {
            Some(Record::Actor(actor)) => Ok(actor),
            _ => Err(not_found_actor(id)),
        }
    }

    /// Loads a client.
    pub fn client(&mut self, id: &ClientId) -> Result<Client> {
        match self.read(Key::Client(id.clone()))? {
            Some(Record::Client(client)) => Ok(client),
            _ => Err(self.not_found(Key::Client(id.clone()))),
        }
    }

    /// Loads a project.
    pub fn project(&mut self, id: &ProjectId) -> Result<Project> {
        match self.read(Key::Project(id.clone()))? {
            Some(Record::Project(project)) => Ok(project),
            _ => Err(self.not_found(Key::Project(id.clone()))),
        }
    }

    /// Loads an epic.
    pub fn epic(&mut self, id: &EpicId) -> Result<Epic> {
        match self.read(Key::Epic(id.clone()))? {
            Some(Record::Epic(epic)) => Ok(epic),
            _ => Err(self.not_found(Key::Epic(id.clone()))),
        }
    }

    /// Loads a story.
    pub fn story(&mut self, id: &StoryId) -> Result<Story> {
        match self.read(Key::Story(id.clone()))? {
            Some(Record::Story(story)) => Ok(story),
            _ => Err(self.not_found(Key::Story(id.clone()))),
        }
    }

    /// Loads an SLA rule.
    pub fn sla_rule(&mut self, id: &SlaRuleId) -> Result<SlaRule> {
        match self.read(Key::SlaRule(id.clone()))? {
            Some(Record::SlaRule(rule)) => Ok(rule),
            _ => Err(self.not_found(Key::SlaRule(id.clone()))),
        }
    }

    /// Lists the stories of an epic, merged with this transaction's staged
    /// writes. Every sibling read is recorded, which is what makes the
    /// cascade's all-complete check safe against concurrent completions.
    pub fn stories_of(&mut self, epic: &EpicId) -> Result<Vec<Story>> {
        let live = self.store.stories_of(epic)?;
        for story in &live {
            self.observe(Key::Story(story.id.clone()));
        }

        let mut merged: Vec<Story> = live
            .into_iter()
            .filter(|s| !self.staged.contains_key(&Key::Story(s.id.clone())))
            .collect();
        for write in self.staged.values().flatten() {
            if let Record::Story(story) = write {
                if &story.epic == epic {
                    merged.push(story.clone());
                }
            }
        }
        merged.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(merged)
    }

    /// Lists the epics of a project, merged with staged writes. Sibling
    /// reads are recorded as for [`UnitOfWork::stories_of`].
    pub fn epics_of(&mut self, project: &ProjectId) -> Result<Vec<Epic>> {
        let live = self.store.epics_of(project)?;
        for epic in &live {
            self.observe(Key::Epic(epic.id.clone()));
        }

        let mut merged: Vec<Epic> = live
            .into_iter()
            .filter(|e| !self.staged.contains_key(&Key::Epic(e.id.clone())))
            .collect();
        for write in self.staged.values().flatten() {
            if let Record::Epic(epic) = write {
                if &epic.project == project {
                    merged.push(epic.clone());
                }
            }
        }
        merged.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(merged)
    }

    /// Lists the projects of a client, merged with staged writes.
    pub fn projects_of(&mut self, client: &ClientId) -> Result<Vec<Project>> {
        let live = self.store.projects_of(client)?;
        for project in &live {
            self.observe(Key::Project(project.id.clone()));
        }

        let mut merged: Vec<Project> = live
            .into_iter()
            .filter(|p| !self.staged.contains_key(&Key::Project(p.id.clone())))
            .collect();
        for write in self.staged.values().flatten() {
            if let Record::Project(project) = write {
                if project.client.as_ref() == Some(client) {
                    merged.push(project.clone());
                }
            }
        }
        merged.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(merged)
    }

    /// Stages a project write.
    pub fn save_project(&mut self, project: Project) {
        self.stage(Record::Project(project));
    }

    /// Stages an epic write.
    pub fn save_epic(&mut self, epic: Epic) {
        self.stage(Record::Epic(epic));
    }

    /// Stages a story write.
    pub fn save_story(&mut self, story: Story) {
        self.stage(Record::Story(story));
    }

    /// Stages a client write.
    pub fn save_client(&mut self, client: Client) {
        self.stage(Record::Client(client));
    }

    /// Stages an SLA rule write.
    pub fn save_sla_rule(&mut self, rule: SlaRule) {
        self.stage(Record::SlaRule(rule));
    }

    /// Stages a project deletion.
    pub fn delete_project(&mut self, id: &ProjectId) {
        self.staged.insert(Key::Project(id.clone()), None);
    }

    /// Stages an epic deletion.
    pub fn delete_epic(&mut self, id: &EpicId) {
        self.staged.insert(Key::Epic(id.clone()), None);
    }

    /// Stages a story deletion.
    pub fn delete_story(&mut self, id: &StoryId) {
        self.staged.insert(Key::Story(id.clone()), None);
    }

    /// Stages a client deletion.
    pub fn delete_client(&mut self, id: &ClientId) {
        self.staged.insert(Key::Client(id.clone()), None);
    }

    /// Stages an SLA rule deletion.
    pub fn delete_sla_rule(&mut self, id: &SlaRuleId) {
        self.staged.insert(Key::SlaRule(id.clone()), None);
    }

    /// Validates every observed read and applies the staged writes
    /// atomically.
    ///
    /// # Errors
    ///
    /// `PersistenceError::Conflict` if any record read by this transaction
    /// changed since it was read. The whole transaction is then void; the
    /// caller decides whether to retry.
    pub fn commit(self) -> Result<()> {
        self.store.commit_writes(&self.observed, self.staged)
    }

    fn read(&mut self, key: Key) -> Result<Option<Record>> {
        if let Some(write) = self.staged.get(&key) {
            return Ok(write.clone());
        }
        match self.store.read(&key)? {
            Some((record, version)) => {
                self.observed.entry(key).or_insert(Some(version));
                Ok(Some(record))
            }
            None => {
                self.observed.entry(key).or_insert(None);
                Ok(None)
            }
        }
    }

    fn observe(&mut self, key: Key) {
        if self.staged.contains_key(&key) {
            return;
        }
        if let Ok(Some((_, version))) = self.store.read(&key) {
            self.observed.entry(key).or_insert(Some(version));
        }
    }

    fn stage(&mut self, record: Record) {
        self.staged.insert(record.key(), Some(record));
    }

    fn not_found(&self, key: Key) -> PersistenceError {
        PersistenceError::NotFound {
            kind: key.kind(),
            id: key.id_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Workspace, Project, Epic) {
        let store = Workspace::new();
        let manager = Actor::new("m", 4);
        store.put_actor(manager.clone()).unwrap();

        let project = Project::new("P", manager.id.clone());
        let epic = Epic::new("E", project.id.clone(), manager.id.clone());

        let mut uow = store.begin();
        uow.save_project(project.clone());
        uow.save_epic(epic.clone());
        uow.commit().unwrap();

        (store, project, epic)
    }

    #[test]
    fn test_reads_see_own_staged_writes() {
        let (store, _project, epic) = seeded();

        let mut uow = store.begin();
        let story = Story::new("S", epic.id.clone(), epic.project.clone());
        uow.save_story(story.clone());

        let loaded = uow.story(&story.id).unwrap();
        assert_eq!(loaded.title, "S");

        let siblings = uow.stories_of(&epic.id).unwrap();
        assert_eq!(siblings.len(), 1);
    }

    #[test]
    fn test_writes_invisible_until_commit() {
        let (store, _project, epic) = seeded();

        let mut uow = store.begin();
        let story = Story::new("S", epic.id.clone(), epic.project.clone());
        uow.save_story(story.clone());

        assert!(store.story(&story.id).is_err());
        uow.commit().unwrap();
        assert!(store.story(&story.id).is_ok());
    }

    #[test]
    fn test_sibling_scan_conflicts_with_concurrent_completion() {
        let (store, _project, epic) = seeded();

        let s1 = Story::new("S1", epic.id.clone(), epic.project.clone());
        let s2 = Story::new("S2", epic.id.clone(), epic.project.clone());
        let mut setup = store.begin();
        setup.save_story(s1.clone());
        setup.save_story(s2.clone());
        setup.commit().unwrap();

        // Transaction A scans the siblings, then B completes one of them.
        let mut a = store.begin();
        let _ = a.stories_of(&epic.id).unwrap();

        let mut b = store.begin();
        let mut s1b = b.story(&s1.id).unwrap();
        s1b.approval
            .approve(chrono_date());
        b.save_story(s1b);
        b.commit().unwrap();

        // A's view of the siblings is stale; its commit must fail even if it
        // only writes the epic.
        let mut stale_epic = a.epic(&epic.id).unwrap();
        stale_epic.deliverables = Some("late".to_string());
        a.save_epic(stale_epic);
        let err = a.commit().unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_delete_staged_and_applied() {
        let (store, _project, epic) = seeded();

        let story = Story::new("S", epic.id.clone(), epic.project.clone());
        let mut setup = store.begin();
        setup.save_story(story.clone());
        setup.commit().unwrap();

        let mut uow = store.begin();
        uow.delete_story(&story.id);
        // The staged delete hides the story from this transaction.
        assert!(uow.story(&story.id).is_err());
        assert!(uow.stories_of(&epic.id).unwrap().is_empty());
        uow.commit().unwrap();

        assert!(store.story(&story.id).is_err());
    }

    #[test]
    fn test_read_absent_then_concurrent_insert_conflicts() {
        let (store, _project, epic) = seeded();
        let id = StoryId::from_string("story-x");

        let mut a = store.begin();
        assert!(a.story(&id).is_err());

        // Another transaction inserts the record A observed as absent.
        let mut b = store.begin();
        let mut story = Story::new("S", epic.id.clone(), epic.project.clone());
        story.id = id.clone();
        b.save_story(story);
        b.commit().unwrap();

        let mut e = a.epic(&epic.id).unwrap();
        e.deliverables = Some("x".to_string());
        a.save_epic(e);
        assert!(a.commit().unwrap_err().is_conflict());
    }

    fn chrono_date() -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }
}
