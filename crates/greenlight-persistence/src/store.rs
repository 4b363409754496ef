//! The in-memory versioned workspace store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use greenlight_models::{
    Actor, ActorId, Client, ClientId, EntityKind, Epic, EpicId, Project, ProjectId, SlaRule,
    SlaRuleId, Story, StoryId,
};

use crate::error::{PersistenceError, Result};
use crate::uow::UnitOfWork;

/// Key identifying any record in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Key {
    Actor(ActorId),
    Client(ClientId),
    Project(ProjectId),
    Epic(EpicId),
    Story(StoryId),
    SlaRule(SlaRuleId),
}

impl Key {
    pub(crate) fn kind(&self) -> EntityKind {
        match self {
            Key::Actor(_) => EntityKind::Actor,
            Key::Client(_) => EntityKind::Client,
            Key::Project(_) => EntityKind::Project,
            Key::Epic(_) => EntityKind::Epic,
            Key::Story(_) => EntityKind::Story,
            Key::SlaRule(_) => EntityKind::SlaRule,
        }
    }

    pub(crate) fn id_string(&self) -> String {
        match self {
            Key::Actor(id) => id.to_string(),
            Key::Client(id) => id.to_string(),
            Key::Project(id) => id.to_string(),
            Key::Epic(id) => id.to_string(),
            Key::Story(id) => id.to_string(),
            Key::SlaRule(id) => id.to_string(),
        }
    }
}

/// Any record value, used by staged writes.
#[derive(Debug, Clone)]
pub(crate) enum Record {
    Actor(Actor),
    Client(Client),
    Project(Project),
    Epic(Epic),
    Story(Story),
    SlaRule(SlaRule),
}

impl Record {
    pub(crate) fn key(&self) -> Key {
        match self {
            Record::Actor(a) => Key::Actor(a.id.clone()),
            Record::Client(c) => Key::Client(c.id.clone()),
            Record::Project(p) => Key::Project(p.id.clone()),
            Record::Epic(e) => Key::Epic(e.id.clone()),
            Record::Story(s) => Key::Story(s.id.clone()),
            Record::SlaRule(r) => Key::SlaRule(r.id.clone()),
        }
    }
}

/// A stored value plus its monotonically increasing version.
#[derive(Debug, Clone)]
struct Versioned<T> {
    value: T,
    version: u64,
}

/// The full mutable state behind the workspace lock.
#[derive(Debug, Default)]
pub(crate) struct State {
    actors: HashMap<ActorId, Versioned<Actor>>,
    clients: HashMap<ClientId, Versioned<Client>>,
    projects: HashMap<ProjectId, Versioned<Project>>,
    epics: HashMap<EpicId, Versioned<Epic>>,
    stories: HashMap<StoryId, Versioned<Story>>,
    sla_rules: HashMap<SlaRuleId, Versioned<SlaRule>>,
    next_version: u64,
}

impl State {
    fn read(&self, key: &Key) -> Option<(Record, u64)> {
        match key {
            Key::Actor(id) => self
                .actors
                .get(id)
                .map(|v| (Record::Actor(v.value.clone()), v.version)),
            Key::Client(id) => self
                .clients
                .get(id)
                .map(|v| (Record::Client(v.value.clone()), v.version)),
            Key::Project(id) => self
                .projects
                .get(id)
                .map(|v| (Record::Project(v.value.clone()), v.version)),
            Key::Epic(id) => self
                .epics
                .get(id)
                .map(|v| (Record::Epic(v.value.clone()), v.version)),
            Key::Story(id) => self
                .stories
                .get(id)
                .map(|v| (Record::Story(v.value.clone()), v.version)),
            Key::SlaRule(id) => self
                .sla_rules
                .get(id)
                .map(|v| (Record::SlaRule(v.value.clone()), v.version)),
        }
    }

    fn version_of(&self, key: &Key) -> Option<u64> {
        self.read(key).map(|(_, version)| version)
    }

    fn apply(&mut self, key: Key, write: Option<Record>) {
        self.next_version += 1;
        let version = self.next_version;
        match (key, write) {
            (Key::Actor(id), Some(Record::Actor(value))) => {
                self.actors.insert(id, Versioned { value, version });
            }
            (Key::Actor(id), _) => {
                self.actors.remove(&id);
            }
            (Key::Client(id), Some(Record::Client(value))) => {
                self.clients.insert(id, Versioned { value, version });
            }
            (Key::Client(id), _) => {
                self.clients.remove(&id);
            }
            (Key::Project(id), Some(Record::Project(value))) => {
                self.projects.insert(id, Versioned { value, version });
            }
            (Key::Project(id), _) => {
                self.projects.remove(&id);
            }
            (Key::Epic(id), Some(Record::Epic(value))) => {
                self.epics.insert(id, Versioned { value, version });
            }
            (Key::Epic(id), _) => {
                self.epics.remove(&id);
            }
            (Key::Story(id), Some(Record::Story(value))) => {
                self.stories.insert(id, Versioned { value, version });
            }
            (Key::Story(id), _) => {
                self.stories.remove(&id);
            }
            (Key::SlaRule(id), Some(Record::SlaRule(value))) => {
                self.sla_rules.insert(id, Versioned { value, version });
            }
            (Key::SlaRule(id), _) => {
                self.sla_rules.remove(&id);
            }
        }
    }
}

/// Thread-safe, versioned store for the whole entity graph.
///
/// Direct accessors (`actor`, `project`, `stories_of`, ...) serve ad-hoc
/// reads and seeding; workflow mutations go through [`Workspace::begin`] so
/// that every read is validated again at commit time.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    state: Arc<RwLock<State>>,
}

impl Workspace {
    /// Creates an empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a unit of work against this workspace.
    pub fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self)
    }

    /// Inserts or replaces an actor outside any unit of work.
    pub fn put_actor(&self, actor: Actor) -> Result<()> {
        self.put(Record::Actor(actor))
    }

    /// Inserts or replaces a client outside any unit of work.
    pub fn put_client(&self, client: Client) -> Result<()> {
        self.put(Record::Client(client))
    }

    /// Loads an actor by id.
    pub fn actor(&self, id: &ActorId) -> Result<Actor> {
        match self.read(&Key::Actor(id.clone()))? {
            Some((Record::Actor(actor), _)) => Ok(actor),
            _ => Err(not_found_actor(id)),
        }
    }

    /// Loads a client by id.
    pub fn client(&self, id: &ClientId) -> Result<Client> {
        match self.read(&Key::Client(id.clone()))? {
            Some((Record::Client(client), _)) => Ok(client),
            _ => Err(PersistenceError::NotFound {
                kind: EntityKind::Client,
                id: id.to_string(),
            }),
        }
    }

    /// Loads a project by id.
    pub fn project(&self, id: &ProjectId) -> Result<Project> {
        match self.read(&Key::Project(id.clone()))? {
            Some((Record::Project(project), _)) => Ok(project),
            _ => Err(PersistenceError::NotFound {
                kind: EntityKind::Project,
                id: id.to_string(),
            }),
        }
    }

    /// Loads an epic by id.
    pub fn epic(&self, id: &EpicId) -> Result<Epic> {
        match self.read(&Key::Epic(id.clone()))? {
            Some((Record::Epic(epic), _)) => Ok(epic),
            _ => Err(PersistenceError::NotFound {
                kind: EntityKind::Epic,
                id: id.to_string(),
            }),
        }
    }

    /// Loads a story by id.
    pub fn story(&self, id: &StoryId) -> Result<Story> {
        match self.read(&Key::Story(id.clone()))? {
            Some((Record::Story(story), _)) => Ok(story),
            _ => Err(PersistenceError::NotFound {
                kind: EntityKind::Story,
                id: id.to_string(),
            }),
        }
    }

    /// Loads an SLA rule by id.
    pub fn sla_rule(&self, id: &SlaRuleId) -> Result<SlaRule> {
        match self.read(&Key::SlaRule(id.clone()))? {
            Some((Record::SlaRule(rule), _)) => Ok(rule),
            _ => Err(PersistenceError::NotFound {
                kind: EntityKind::SlaRule,
                id: id.to_string(),
            }),
        }
    }

    /// Lists the epics of a project, ordered by id.
    pub fn epics_of(&self, project: &ProjectId) -> Result<Vec<Epic>> {
        let state = self.lock_read()?;
        let mut epics: Vec<Epic> = state
            .epics
            .values()
            .filter(|v| &v.value.project == project)
            .map(|v| v.value.clone())
            .collect();
        epics.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(epics)
    }

    /// Lists the stories of an epic, ordered by id.
    pub fn stories_of(&self, epic: &EpicId) -> Result<Vec<Story>> {
        let state = self.lock_read()?;
        let mut stories: Vec<Story> = state
            .stories
            .values()
            .filter(|v| &v.value.epic == epic)
            .map(|v| v.value.clone())
            .collect();
        stories.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stories)
    }

    /// Lists the projects of a client, ordered by id.
    pub fn projects_of(&self, client: &ClientId) -> Result<Vec<Project>> {
        let state = self.lock_read()?;
        let mut projects: Vec<Project> = state
            .projects
            .values()
            .filter(|v| v.value.client.as_ref() == Some(client))
            .map(|v| v.value.clone())
            .collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(projects)
    }

    pub(crate) fn read(&self, key: &Key) -> Result<Option<(Record, u64)>> {
        Ok(self.lock_read()?.read(key))
    }

    /// Validates observed versions and applies staged writes atomically.
    pub(crate) fn commit_writes(
        &self,
        observed: &HashMap<Key, Option<u64>>,
        staged: HashMap<Key, Option<Record>>,
    ) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| PersistenceError::LockPoisoned(e.to_string()))?;

        for (key, seen) in observed {
            if state.version_of(key) != *seen {
                return Err(PersistenceError::Conflict {
                    kind: key.kind(),
                    id: key.id_string(),
                });
            }
        }

        for (key, write) in staged {
            state.apply(key, write);
        }
        Ok(())
    }

    fn put(&self, record: Record) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| PersistenceError::LockPoisoned(e.to_string()))?;
        state.apply(record.key(), Some(record));
        Ok(())
    }

    fn lock_read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| PersistenceError::LockPoisoned(e.to_string()))
    }

    pub(crate) fn all_actors(&self) -> Result<Vec<Actor>> {
        let state = self.lock_read()?;
        let mut actors: Vec<Actor> = state.actors.values().map(|v| v.value.clone()).collect();
        actors.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(actors)
    }

    pub(crate) fn all_clients(&self) -> Result<Vec<Client>> {
        let state = self.lock_read()?;
        let mut clients: Vec<Client> = state.clients.values().map(|v| v.value.clone()).collect();
        clients.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(clients)
    }

    pub(crate) fn all_projects(&self) -> Result<Vec<Project>> {
        let state = self.lock_read()?;
        let mut projects: Vec<Project> = state.projects.values().map(|v| v.value.clone()).collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(projects)
    }

    pub(crate) fn all_epics(&self) -> Result<Vec<Epic>> {
        let state = self.lock_read()?;
        let mut epics: Vec<Epic> = state.epics.values().map(|v| v.value.clone()).collect();
        epics.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(epics)
    }

    pub(crate) fn all_stories(&self) -> Result<Vec<Story>> {
        let state = self.lock_read()?;
        let mut stories: Vec<Story> = state.stories.values().map(|v| v.value.clone()).collect();
        stories.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stories)
    }

    pub(crate) fn all_sla_rules(&self) -> Result<Vec<SlaRule>> {
        let state = self.lock_read()?;
        let mut rules: Vec<SlaRule> = state.sla_rules.values().map(|v| v.value.clone()).collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rules)
    }
}

pub(crate) fn not_found_actor(id: &ActorId) -> PersistenceError {
    PersistenceError::NotFound {
        kind: EntityKind::Actor,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_load_actor() {
        let store = Workspace::new();
        let actor = Actor::new("maria", 4);
        store.put_actor(actor.clone()).unwrap();

        let loaded = store.actor(&actor.id).unwrap();
        assert_eq!(loaded, actor);
    }

    #[test]
    fn test_load_missing_project() {
        let store = Workspace::new();
        let result = store.project(&ProjectId::from_string("proj-missing"));
        assert!(matches!(result, Err(PersistenceError::NotFound { .. })));
    }

    #[test]
    fn test_children_queries_filter_and_order() {
        let store = Workspace::new();
        let manager = Actor::new("m", 4);
        store.put_actor(manager.clone()).unwrap();

        let project = Project::new("P", manager.id.clone());
        let other_project = Project::new("Q", manager.id.clone());
        let epic_b = Epic {
            id: EpicId::from_string("epic-b"),
            ..Epic::new("B", project.id.clone(), manager.id.clone())
        };
        let epic_a = Epic {
            id: EpicId::from_string("epic-a"),
            ..Epic::new("A", project.id.clone(), manager.id.clone())
        };
        let stray = Epic::new("stray", other_project.id.clone(), manager.id.clone());

        let mut uow = store.begin();
        uow.save_project(project.clone());
        uow.save_project(other_project);
        uow.save_epic(epic_b);
        uow.save_epic(epic_a);
        uow.save_epic(stray);
        uow.commit().unwrap();

        let epics = store.epics_of(&project.id).unwrap();
        assert_eq!(epics.len(), 2);
        assert_eq!(epics[0].id.as_str(), "epic-a");
        assert_eq!(epics[1].id.as_str(), "epic-b");
    }

    #[test]
    fn test_commit_conflict_on_changed_record() {
        let store = Workspace::new();
        let manager = Actor::new("m", 4);
        store.put_actor(manager.clone()).unwrap();

        let project = Project::new("P", manager.id.clone());
        let mut setup = store.begin();
        setup.save_project(project.clone());
        setup.commit().unwrap();

        // Two units of work read the same project.
        let mut first = store.begin();
        let mut second = store.begin();
        let mut p1 = first.project(&project.id).unwrap();
        let mut p2 = second.project(&project.id).unwrap();

        p1.deliverables = Some("first".to_string());
        first.save_project(p1);
        first.commit().unwrap();

        // The second commit must observe the moved version and fail.
        p2.deliverables = Some("second".to_string());
        second.save_project(p2);
        let err = second.commit().unwrap_err();
        assert!(err.is_conflict());

        let current = store.project(&project.id).unwrap();
        assert_eq!(current.deliverables.as_deref(), Some("first"));
    }
}
