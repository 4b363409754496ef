//! Builder patterns for hierarchy entities.

use chrono::NaiveDate;

use crate::hierarchy::{Epic, Project, Story};
use crate::ids::{ActorId, ClientId, EpicId, ProjectId};

/// Builder for creating [`Project`] instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ProjectBuilder {
    name: String,
    manager: ActorId,
    client: Option<ClientId>,
    creator: Option<ActorId>,
    deliverables: Option<String>,
    deadline: Option<NaiveDate>,
}

impl ProjectBuilder {
    /// Creates a builder with the required fields.
    pub fn new(name: impl Into<String>, manager: impl Into<ActorId>) -> Self {
        Self {
            name: name.into(),
            manager: manager.into(),
            client: None,
            creator: None,
            deliverables: None,
            deadline: None,
        }
    }

    /// Sets the owning client.
    pub fn client(mut self, client: impl Into<ClientId>) -> Self {
        self.client = Some(client.into());
        self
    }

    /// Sets the creating actor.
    pub fn creator(mut self, creator: impl Into<ActorId>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Sets the deliverables description.
    pub fn deliverables(mut self, text: impl Into<String>) -> Self {
        self.deliverables = Some(text.into());
        self
    }

    /// Sets the delivery deadline.
    pub fn deadline(mut self, date: NaiveDate) -> Self {
        self.deadline = Some(date);
        self
    }

    /// Builds the pending project.
    pub fn build(self) -> Project {
        let mut project = Project::new(self.name, self.manager);
        project.client = self.client;
        project.creator = self.creator;
        project.deliverables = self.deliverables;
        project.deadline = self.deadline;
        project
    }
}

/// Builder for creating [`Epic`] instances.
#[derive(Debug, Clone)]
pub struct EpicBuilder {
    name: String,
    project: ProjectId,
    manager: ActorId,
    creator: Option<ActorId>,
    deliverables: Option<String>,
    deadline: Option<NaiveDate>,
}

impl EpicBuilder {
    /// Creates a builder with the required fields.
    pub fn new(
        name: impl Into<String>,
        project: impl Into<ProjectId>,
        manager: impl Into<ActorId>,
    ) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            manager: manager.into(),
            creator: None,
            deliverables: None,
            deadline: None,
        }
    }

    /// Sets the creating actor.
    pub fn creator(mut self, creator: impl Into<ActorId>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Sets the deliverables description.
    pub fn deliverables(mut self, text: impl Into<String>) -> Self {
        self.deliverables = Some(text.into());
        self
    }

    /// Sets the delivery deadline.
    pub fn deadline(mut self, date: NaiveDate) -> Self {
        self.deadline = Some(date);
        self
    }

    /// Builds the pending epic.
    pub fn build(self) -> Epic {
        let mut epic = Epic::new(self.name, self.project, self.manager);
        epic.creator = self.creator;
        epic.deliverables = self.deliverables;
        epic.deadline = self.deadline;
        epic
    }
}

/// Builder for creating [`Story`] instances.
#[derive(Debug, Clone)]
pub struct StoryBuilder {
    title: String,
    epic: EpicId,
    project: ProjectId,
    assignee: Option<ActorId>,
    creator: Option<ActorId>,
    deliverables: Option<String>,
    due_date: Option<NaiveDate>,
    estimated_hours: Option<f64>,
}

impl StoryBuilder {
    /// Creates a builder with the required fields.
    pub fn new(
        title: impl Into<String>,
        epic: impl Into<EpicId>,
        project: impl Into<ProjectId>,
    ) -> Self {
        Self {
            title: title.into(),
            epic: epic.into(),
            project: project.into(),
            assignee: None,
            creator: None,
            deliverables: None,
            due_date: None,
            estimated_hours: None,
        }
    }

    /// Sets the assigned actor.
    pub fn assignee(mut self, assignee: impl Into<ActorId>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Sets the creating actor.
    pub fn creator(mut self, creator: impl Into<ActorId>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Sets the deliverables description.
    pub fn deliverables(mut self, text: impl Into<String>) -> Self {
        self.deliverables = Some(text.into());
        self
    }

    /// Sets the due date.
    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    /// Sets the effort estimate in hours.
    pub fn estimate(mut self, hours: f64) -> Self {
        self.estimated_hours = Some(hours);
        self
    }

    /// Builds the pending story.
    pub fn build(self) -> Story {
        let mut story = Story::new(self.title, self.epic, self.project);
        story.assignee = self.assignee;
        story.creator = self.creator;
        story.deliverables = self.deliverables;
        story.due_date = self.due_date;
        story.estimated_hours = self.estimated_hours;
        story
    }
}

/// Convenience constructors mirroring the builders.
impl Project {
    /// Creates a builder for a new project.
    pub fn builder(name: impl Into<String>, manager: impl Into<ActorId>) -> ProjectBuilder {
        ProjectBuilder::new(name, manager)
    }
}

impl Epic {
    /// Creates a builder for a new epic.
    pub fn builder(
        name: impl Into<String>,
        project: impl Into<ProjectId>,
        manager: impl Into<ActorId>,
    ) -> EpicBuilder {
        EpicBuilder::new(name, project, manager)
    }
}

impl Story {
    /// Creates a builder for a new story.
    pub fn builder(
        title: impl Into<String>,
        epic: impl Into<EpicId>,
        project: impl Into<ProjectId>,
    ) -> StoryBuilder {
        StoryBuilder::new(title, epic, project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_builder() {
        let manager = ActorId::from_string("actor-m");
        let creator = ActorId::from_string("actor-c");
        let project = Project::builder("Rollout", manager.clone())
            .creator(creator.clone())
            .deliverables("Phase one rollout")
            .build();

        assert_eq!(project.manager, manager);
        assert_eq!(project.creator, Some(creator));
        assert_eq!(project.deliverables.as_deref(), Some("Phase one rollout"));
        assert!(!project.approval.approved);
    }

    #[test]
    fn test_story_builder_defaults() {
        let story = Story::builder("Fix login", "epic-1", "proj-1").build();

        assert_eq!(story.epic.as_str(), "epic-1");
        assert_eq!(story.project.as_str(), "proj-1");
        assert!(story.assignee.is_none());
        assert!(story.due_date.is_none());
    }

    #[test]
    fn test_epic_builder_with_deadline() {
        let deadline = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let epic = Epic::builder("Auth", "proj-1", "actor-m")
            .deadline(deadline)
            .build();

        assert_eq!(epic.deadline, Some(deadline));
        assert!(epic.creator.is_none());
    }
}
