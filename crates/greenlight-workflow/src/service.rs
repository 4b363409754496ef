//! The workflow orchestrator.
//!
//! Every operation here runs the same shape: open a unit of work, load what
//! it needs, ask the policy, mutate through the approval workflow and the
//! cascade engine, commit, and only then hand queued notices to the
//! notification sink. A commit that loses a version race is retried from the
//! top a bounded number of times, so a half-applied cascade is never
//! observable and a lost race costs at most one delayed completion.

use std::sync::Arc;

use tracing::{debug, info, warn};

use greenlight_events::Notify;
use greenlight_models::{
    Actor, ActorId, Client, ClientId, EntityKind, EntityRef, Epic, EpicId, Notice, NoticeKind,
    Project, ProjectId, SlaRule, SlaRuleId, Story, StoryId,
};
use greenlight_persistence::{PersistenceError, UnitOfWork, Workspace};
use greenlight_policy::{authorize, Operation};

use crate::approval::ApprovalWorkflow;
use crate::cascade::{CascadeEngine, CascadeResult};
use crate::clock::{Clock, SystemClock};
use crate::config::WorkflowConfig;
use crate::dto::{EpicPatch, NewClient, NewEpic, NewProject, NewStory, ProjectPatch, StoryPatch};
use crate::error::{Result, WorkflowError};
use crate::identity::{Identity, StaticIdentity};

/// Result of [`WorkflowService::complete_story`].
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// The story after completion.
    pub story: Story,
    /// Which parent levels auto-completed as a consequence.
    pub cascade: CascadeResult,
}

/// The externally exposed workflow operations.
pub struct WorkflowService {
    store: Workspace,
    notifier: Arc<dyn Notify>,
    clock: Arc<dyn Clock>,
    identity: Arc<dyn Identity>,
    config: WorkflowConfig,
}

impl WorkflowService {
    /// Creates a service over `store` delivering notices to `notifier`.
    pub fn new(store: Workspace, notifier: Arc<dyn Notify>) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(SystemClock),
            identity: Arc::new(StaticIdentity::anonymous()),
            config: WorkflowConfig::default(),
        }
    }

    /// Replaces the clock (tests pin dates with [`crate::FixedClock`]).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Wires the identity collaborator.
    pub fn with_identity(mut self, identity: Arc<dyn Identity>) -> Self {
        self.identity = identity;
        self
    }

    /// Overrides the configuration.
    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// The underlying workspace, for boundary-layer reads.
    pub fn store(&self) -> &Workspace {
        &self.store
    }

    /// Resolves the calling actor through the identity collaborator.
    pub fn current_actor(&self) -> Result<Actor> {
        self.identity.current_actor()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Loads a project, view-gated.
    pub fn project(&self, id: &ProjectId, actor: &Actor) -> Result<Project> {
        authorize(actor, &Operation::View { kind: EntityKind::Project }).into_result()?;
        Ok(self.store.project(id)?)
    }

    /// Loads an epic, view-gated.
    pub fn epic(&self, id: &EpicId, actor: &Actor) -> Result<Epic> {
        authorize(actor, &Operation::View { kind: EntityKind::Epic }).into_result()?;
        Ok(self.store.epic(id)?)
    }

    /// Loads a story, view-gated.
    pub fn story(&self, id: &StoryId, actor: &Actor) -> Result<Story> {
        authorize(actor, &Operation::View { kind: EntityKind::Story }).into_result()?;
        Ok(self.store.story(id)?)
    }

    /// Loads a client, view-gated.
    pub fn client(&self, id: &ClientId, actor: &Actor) -> Result<Client> {
        authorize(actor, &Operation::View { kind: EntityKind::Client }).into_result()?;
        Ok(self.store.client(id)?)
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Creates a project. Senior creators get their project approved on the
    /// spot; everyone else starts in `Pending`.
    pub fn create_project(&self, dto: &NewProject, actor: &Actor) -> Result<Project> {
        self.transact(|uow, notices| {
            let manager = uow.actor(&dto.manager)?;
            authorize(actor, &Operation::CreateProject { manager: &manager }).into_result()?;
            if let Some(client) = &dto.client {
                uow.client(client)?;
            }

            let mut project = Project::builder(dto.name.clone(), dto.manager.clone())
                .creator(actor.id.clone())
                .build();
            project.client = dto.client.clone();
            project.deliverables = dto.deliverables.clone();
            project.deadline = dto.deadline;

            if actor.is_senior() {
                ApprovalWorkflow::approve(&mut project.approval, self.clock.today());
                notices.push(Notice::to_recipient(
                    NoticeKind::ProjectCreated,
                    EntityRef::Project(project.id.clone()),
                    project.manager.clone(),
                    format!("Project '{}' was created and approved", project.name),
                ));
            }

            info!(project = %project.id, actor = %actor.id, "creating project");
            uow.save_project(project.clone());
            Ok(project)
        })
    }

    /// Creates an epic under a project.
    pub fn create_epic(&self, dto: &NewEpic, actor: &Actor) -> Result<Epic> {
        self.transact(|uow, _notices| {
            let manager = uow.actor(&dto.manager)?;
            authorize(actor, &Operation::CreateEpic { manager: &manager }).into_result()?;

            let project = uow.project(&dto.project)?;
            let project_creator = load_actor_opt(uow, project.creator.as_ref())?;
            authorize(
                actor,
                &Operation::WorkflowOnProject {
                    creator: project_creator.as_ref(),
                },
            )
            .into_result()?;

            let mut epic = Epic::builder(dto.name.clone(), dto.project.clone(), dto.manager.clone())
                .creator(actor.id.clone())
                .build();
            epic.deliverables = dto.deliverables.clone();
            epic.start_date = dto.start_date;
            epic.deadline = dto.deadline;

            if actor.is_senior() {
                ApprovalWorkflow::approve(&mut epic.approval, self.clock.today());
            }

            info!(epic = %epic.id, project = %project.id, actor = %actor.id, "creating epic");
            uow.save_epic(epic.clone());
            Ok(epic)
        })
    }

    /// Creates a story under an epic and notifies the assignee.
    pub fn create_story(&self, dto: &NewStory, actor: &Actor) -> Result<Story> {
        self.transact(|uow, notices| {
            let assignee = load_actor_ref(uow, dto.assignee.as_ref())?;
            authorize(
                actor,
                &Operation::CreateStory {
                    assignee: assignee.as_ref(),
                },
            )
            .into_result()?;

            let epic = uow.epic(&dto.epic)?;

            let mut story =
                Story::builder(dto.title.clone(), dto.epic.clone(), epic.project.clone())
                    .creator(actor.id.clone())
                    .build();
            story.assignee = dto.assignee.clone();
            story.deliverables = dto.deliverables.clone();
            story.due_date = dto.due_date;
            story.deadline = dto.deadline;
            story.estimated_hours = dto.estimated_hours;

            if actor.is_senior() {
                ApprovalWorkflow::approve(&mut story.approval, self.clock.today());
            }

            if let Some(assignee) = &story.assignee {
                notices.push(Notice::to_recipient(
                    NoticeKind::StoryAssigned,
                    EntityRef::Story(story.id.clone()),
                    assignee.clone(),
                    format!("You have been assigned to story: {}", story.title),
                ));
            }
            if story.approval.approved {
                notices.push(Notice::to_recipient(
                    NoticeKind::StoryCompleted,
                    EntityRef::Story(story.id.clone()),
                    epic.manager.clone(),
                    format!("Story '{}' has been completed", story.title),
                ));
            }

            info!(story = %story.id, epic = %epic.id, actor = %actor.id, "creating story");
            uow.save_story(story.clone());
            Ok(story)
        })
    }

    /// Creates a client.
    pub fn create_client(&self, dto: &NewClient, actor: &Actor) -> Result<Client> {
        self.transact(|uow, _notices| {
            authorize(actor, &Operation::CreateClient).into_result()?;
            let mut client = Client::new(dto.name.clone());
            client.email = dto.email.clone();
            client.phone = dto.phone.clone();
            client.address = dto.address.clone();
            uow.save_client(client.clone());
            Ok(client)
        })
    }

    // ------------------------------------------------------------------
    // Update / approve
    // ------------------------------------------------------------------

    /// Updates a project. Approval carried on the patch goes through the
    /// approval workflow; clearing the flag is an invalid transition.
    pub fn update_project(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
        actor: &Actor,
    ) -> Result<Project> {
        self.transact(|uow, _notices| {
            authorize(actor, &Operation::Update { kind: EntityKind::Project }).into_result()?;
            let mut project = uow.project(id)?;

            reject_unapprove(patch.approved, project.approval.approved, EntityKind::Project)?;

            if patch.touches_work_fields() {
                let creator = load_actor_opt(uow, project.creator.as_ref())?;
                authorize(
                    actor,
                    &Operation::WorkOn {
                        kind: EntityKind::Project,
                        creator: creator.as_ref(),
                        approved: project.approval.approved,
                    },
                )
                .into_result()?;
            }

            if patch.approved == Some(true) && !project.approval.approved {
                let creator = effective_creator(
                    uow,
                    project.creator.as_ref(),
                    Some(&project.manager),
                )?;
                ApprovalWorkflow::can_approve(actor, creator.as_ref(), EntityKind::Project)
                    .into_result()?;
                ApprovalWorkflow::approve(&mut project.approval, self.clock.today());
                info!(project = %project.id, approver = %actor.id, "project approved");
            }

            if let Some(name) = &patch.name {
                project.name = name.clone();
            }
            if let Some(client) = &patch.client {
                uow.client(client)?;
                project.client = Some(client.clone());
            }
            if let Some(manager) = &patch.manager {
                uow.actor(manager)?;
                project.manager = manager.clone();
            }
            if let Some(deliverables) = &patch.deliverables {
                project.deliverables = Some(deliverables.clone());
            }
            if let Some(deadline) = patch.deadline {
                project.deadline = Some(deadline);
            }

            uow.save_project(project.clone());
            Ok(project)
        })
    }

    /// Updates an epic.
    pub fn update_epic(&self, id: &EpicId, patch: &EpicPatch, actor: &Actor) -> Result<Epic> {
        self.transact(|uow, notices| {
            authorize(actor, &Operation::Update { kind: EntityKind::Epic }).into_result()?;
            let mut epic = uow.epic(id)?;
            let project = uow.project(&epic.project)?;

            let project_creator = load_actor_opt(uow, project.creator.as_ref())?;
            authorize(
                actor,
                &Operation::WorkflowOnProject {
                    creator: project_creator.as_ref(),
                },
            )
            .into_result()?;

            reject_unapprove(patch.approved, epic.approval.approved, EntityKind::Epic)?;

            if patch.touches_work_fields() {
                // Legacy epics fall back to the project creator for the gate.
                let creator = match load_actor_opt(uow, epic.creator.as_ref())? {
                    Some(creator) => Some(creator),
                    None => project_creator.clone(),
                };
                authorize(
                    actor,
                    &Operation::WorkOn {
                        kind: EntityKind::Epic,
                        creator: creator.as_ref(),
                        approved: epic.approval.approved,
                    },
                )
                .into_result()?;
            }

            if patch.approved == Some(true) && !epic.approval.approved {
                let creator =
                    effective_creator(uow, epic.creator.as_ref(), Some(&epic.manager))?;
                ApprovalWorkflow::can_approve(actor, creator.as_ref(), EntityKind::Epic)
                    .into_result()?;
                ApprovalWorkflow::approve(&mut epic.approval, self.clock.today());
                info!(epic = %epic.id, approver = %actor.id, "epic approved");
                notices.push(Notice::to_recipient(
                    NoticeKind::EpicApproved,
                    EntityRef::Epic(epic.id.clone()),
                    project.manager.clone(),
                    format!("Epic '{}' has been approved", epic.name),
                ));
            }

            if let Some(name) = &patch.name {
                epic.name = name.clone();
            }
            if let Some(manager) = &patch.manager {
                uow.actor(manager)?;
                epic.manager = manager.clone();
            }
            if let Some(deliverables) = &patch.deliverables {
                epic.deliverables = Some(deliverables.clone());
            }
            if let Some(start_date) = patch.start_date {
                epic.start_date = Some(start_date);
            }
            if let Some(deadline) = patch.deadline {
                epic.deadline = Some(deadline);
            }

            uow.save_epic(epic.clone());
            Ok(epic)
        })
    }

    /// Updates a story. Approval carried on the patch completes the story
    /// and runs the cascade.
    pub fn update_story(&self, id: &StoryId, patch: &StoryPatch, actor: &Actor) -> Result<Story> {
        self.transact(|uow, notices| {
            authorize(actor, &Operation::Update { kind: EntityKind::Story }).into_result()?;
            let mut story = uow.story(id)?;
            let epic = uow.epic(&story.epic)?;

            reject_unapprove(patch.approved, story.approval.approved, EntityKind::Story)?;

            if patch.touches_work_fields() {
                let creator =
                    effective_creator(uow, story.creator.as_ref(), Some(&epic.manager))?;
                authorize(
                    actor,
                    &Operation::WorkOn {
                        kind: EntityKind::Story,
                        creator: creator.as_ref(),
                        approved: story.approval.approved,
                    },
                )
                .into_result()?;
            }

            if patch.touches_non_approval_fields() {
                let manager = load_actor_opt(uow, Some(&epic.manager))?;
                authorize(
                    actor,
                    &Operation::ModifyStory {
                        manager: manager.as_ref(),
                    },
                )
                .into_result()?;
            }

            let mut newly_completed = false;
            if patch.approved == Some(true) && !story.approval.approved {
                let creator =
                    effective_creator(uow, story.creator.as_ref(), Some(&epic.manager))?;
                ApprovalWorkflow::can_approve(actor, creator.as_ref(), EntityKind::Story)
                    .into_result()?;
                newly_completed =
                    ApprovalWorkflow::approve(&mut story.approval, self.clock.today());
                info!(story = %story.id, approver = %actor.id, "story approved");
                notices.push(Notice::to_recipient(
                    NoticeKind::StoryCompleted,
                    EntityRef::Story(story.id.clone()),
                    epic.manager.clone(),
                    format!("Story '{}' has been completed", story.title),
                ));
            }

            if let Some(title) = &patch.title {
                story.title = title.clone();
            }
            if let Some(assignee) = &patch.assignee {
                uow.actor(assignee)?;
                story.assignee = Some(assignee.clone());
            }
            if let Some(deliverables) = &patch.deliverables {
                story.deliverables = Some(deliverables.clone());
            }
            if let Some(due_date) = patch.due_date {
                story.due_date = Some(due_date);
            }
            if let Some(deadline) = patch.deadline {
                story.deadline = Some(deadline);
            }
            if let Some(estimated) = patch.estimated_hours {
                story.estimated_hours = Some(estimated);
            }
            if let Some(actual) = patch.actual_hours {
                story.actual_hours = Some(actual);
            }

            uow.save_story(story.clone());
            if newly_completed {
                CascadeEngine::on_story_completed(uow, &story, self.clock.today(), notices)?;
            }
            Ok(story)
        })
    }

    /// Explicitly approves an entity by kind and id.
    pub fn approve(&self, kind: EntityKind, id: &str, actor: &Actor) -> Result<EntityRef> {
        match kind {
            EntityKind::Project => self
                .approve_project(&ProjectId::from_string(id), actor)
                .map(|p| EntityRef::Project(p.id)),
            EntityKind::Epic => self
                .approve_epic(&EpicId::from_string(id), actor)
                .map(|e| EntityRef::Epic(e.id)),
            EntityKind::Story => self
                .approve_story(&StoryId::from_string(id), actor)
                .map(|s| EntityRef::Story(s.id)),
            other => Err(WorkflowError::InvalidTransition(format!(
                "a {} cannot be approved",
                other
            ))),
        }
    }

    /// Approves a project. Idempotent.
    pub fn approve_project(&self, id: &ProjectId, actor: &Actor) -> Result<Project> {
        self.transact(|uow, _notices| {
            let mut project = uow.project(id)?;
            if project.approval.approved {
                return Ok(project);
            }
            let creator =
                effective_creator(uow, project.creator.as_ref(), Some(&project.manager))?;
            ApprovalWorkflow::can_approve(actor, creator.as_ref(), EntityKind::Project)
                .into_result()?;
            ApprovalWorkflow::approve(&mut project.approval, self.clock.today());
            info!(project = %project.id, approver = %actor.id, "project approved");
            uow.save_project(project.clone());
            Ok(project)
        })
    }

    /// Approves an epic. Idempotent.
    pub fn approve_epic(&self, id: &EpicId, actor: &Actor) -> Result<Epic> {
        self.transact(|uow, notices| {
            let mut epic = uow.epic(id)?;
            if epic.approval.approved {
                return Ok(epic);
            }
            let project = uow.project(&epic.project)?;
            let creator = effective_creator(uow, epic.creator.as_ref(), Some(&epic.manager))?;
            ApprovalWorkflow::can_approve(actor, creator.as_ref(), EntityKind::Epic)
                .into_result()?;
            ApprovalWorkflow::approve(&mut epic.approval, self.clock.today());
            info!(epic = %epic.id, approver = %actor.id, "epic approved");
            notices.push(Notice::to_recipient(
                NoticeKind::EpicApproved,
                EntityRef::Epic(epic.id.clone()),
                project.manager.clone(),
                format!("Epic '{}' has been approved", epic.name),
            ));
            uow.save_epic(epic.clone());
            Ok(epic)
        })
    }

    /// Approves a story and cascades. Idempotent.
    pub fn approve_story(&self, id: &StoryId, actor: &Actor) -> Result<Story> {
        self.transact(|uow, notices| {
            let mut story = uow.story(id)?;
            if story.approval.approved {
                return Ok(story);
            }
            let epic = uow.epic(&story.epic)?;
            let creator = effective_creator(uow, story.creator.as_ref(), Some(&epic.manager))?;
            ApprovalWorkflow::can_approve(actor, creator.as_ref(), EntityKind::Story)
                .into_result()?;
            ApprovalWorkflow::approve(&mut story.approval, self.clock.today());
            info!(story = %story.id, approver = %actor.id, "story approved");
            notices.push(Notice::to_recipient(
                NoticeKind::StoryCompleted,
                EntityRef::Story(story.id.clone()),
                epic.manager.clone(),
                format!("Story '{}' has been completed", story.title),
            ));
            uow.save_story(story.clone());
            CascadeEngine::on_story_completed(uow, &story, self.clock.today(), notices)?;
            Ok(story)
        })
    }

    /// Marks a story completed and cascades upward. Idempotent.
    pub fn complete_story(&self, id: &StoryId, actor: &Actor) -> Result<CompletionOutcome> {
        self.transact(|uow, notices| {
            let mut story = uow.story(id)?;
            if story.is_complete() {
                return Ok(CompletionOutcome {
                    story,
                    cascade: CascadeResult::default(),
                });
            }
            authorize(actor, &Operation::CompleteStory).into_result()?;

            let epic = uow.epic(&story.epic)?;
            ApprovalWorkflow::approve(&mut story.approval, self.clock.today());
            info!(story = %story.id, actor = %actor.id, "story completed");
            notices.push(Notice::to_recipient(
                NoticeKind::StoryCompleted,
                EntityRef::Story(story.id.clone()),
                epic.manager.clone(),
                format!("Story '{}' has been marked as completed", story.title),
            ));

            uow.save_story(story.clone());
            let cascade =
                CascadeEngine::on_story_completed(uow, &story, self.clock.today(), notices)?;
            Ok(CompletionOutcome { story, cascade })
        })
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Deletes a project and everything under it.
    pub fn delete_project(&self, id: &ProjectId, actor: &Actor) -> Result<()> {
        self.transact(|uow, _notices| {
            let project = uow.project(id)?;
            authorize(actor, &Operation::DeleteProject).into_result()?;

            for epic in uow.epics_of(&project.id)? {
                for story in uow.stories_of(&epic.id)? {
                    uow.delete_story(&story.id);
                }
                uow.delete_epic(&epic.id);
            }
            uow.delete_project(&project.id);
            info!(project = %project.id, actor = %actor.id, "project deleted");
            Ok(())
        })
    }

    /// Deletes an epic and its stories.
    pub fn delete_epic(&self, id: &EpicId, actor: &Actor) -> Result<()> {
        self.transact(|uow, _notices| {
            let epic = uow.epic(id)?;
            let project = uow.project(&epic.project)?;
            let project_creator = load_actor_opt(uow, project.creator.as_ref())?;
            authorize(
                actor,
                &Operation::DeleteEpic {
                    project_creator: project_creator.as_ref(),
                },
            )
            .into_result()?;

            for story in uow.stories_of(&epic.id)? {
                uow.delete_story(&story.id);
            }
            uow.delete_epic(&epic.id);
            info!(epic = %epic.id, actor = %actor.id, "epic deleted");
            Ok(())
        })
    }

    /// Deletes a story.
    pub fn delete_story(&self, id: &StoryId, actor: &Actor) -> Result<()> {
        self.transact(|uow, _notices| {
            let story = uow.story(id)?;
            authorize(actor, &Operation::DeleteStory).into_result()?;
            uow.delete_story(&story.id);
            info!(story = %story.id, actor = %actor.id, "story deleted");
            Ok(())
        })
    }

    /// Deletes a client, unlinking its projects.
    pub fn delete_client(&self, id: &ClientId, actor: &Actor) -> Result<()> {
        self.transact(|uow, _notices| {
            let client = uow.client(id)?;
            authorize(actor, &Operation::DeleteClient).into_result()?;

            for mut project in uow.projects_of(&client.id)? {
                project.client = None;
                uow.save_project(project);
            }
            uow.delete_client(&client.id);
            info!(client = %client.id, actor = %actor.id, "client deleted");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // SLA rules
    // ------------------------------------------------------------------

    /// Creates or replaces an SLA rule.
    pub fn put_sla_rule(&self, rule: &SlaRule, actor: &Actor) -> Result<SlaRule> {
        self.transact(|uow, _notices| {
            authorize(actor, &Operation::MutateSlaRule).into_result()?;
            if let Some(project) = &rule.project {
                uow.project(project)?;
            }
            if let Some(epic) = &rule.epic {
                uow.epic(epic)?;
            }
            uow.save_sla_rule(rule.clone());
            Ok(rule.clone())
        })
    }

    /// Deletes an SLA rule.
    pub fn delete_sla_rule(&self, id: &SlaRuleId, actor: &Actor) -> Result<()> {
        self.transact(|uow, _notices| {
            let rule = uow.sla_rule(id)?;
            authorize(actor, &Operation::MutateSlaRule).into_result()?;
            uow.delete_sla_rule(&rule.id);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Transaction plumbing
    // ------------------------------------------------------------------

    /// Runs `op` inside a unit of work, retrying commit conflicts.
    ///
    /// Business errors abort immediately; only version conflicts re-run the
    /// whole closure. Notices queued by `op` are delivered after the commit
    /// succeeds, never before, so a rolled-back attempt leaves no trace.
    fn transact<T>(
        &self,
        mut op: impl FnMut(&mut UnitOfWork<'_>, &mut Vec<Notice>) -> Result<T>,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut uow = self.store.begin();
            let mut notices = Vec::new();
            let out = op(&mut uow, &mut notices)?;
            match uow.commit() {
                Ok(()) => {
                    self.dispatch(notices);
                    return Ok(out);
                }
                Err(err) if err.is_conflict() && attempt < self.config.max_commit_attempts => {
                    warn!(attempt, error = %err, "commit conflict, retrying");
                }
                Err(err) if err.is_conflict() => {
                    warn!(attempts = attempt, "giving up after repeated commit conflicts");
                    return Err(WorkflowError::Conflict);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn dispatch(&self, notices: Vec<Notice>) {
        for notice in notices {
            debug!(kind = ?notice.kind, "dispatching notice");
            self.notifier.notify(&notice);
        }
    }
}

/// Approval is monotonic: a patch asking to clear the flag on an approved
/// entity is rejected before any engine runs.
fn reject_unapprove(requested: Option<bool>, approved: bool, kind: EntityKind) -> Result<()> {
    if requested == Some(false) && approved {
        return Err(WorkflowError::InvalidTransition(format!(
            "{} approval cannot be revoked",
            kind
        )));
    }
    Ok(())
}

/// Loads an actor by optional id; a missing record counts as absent
/// (legacy rows reference people who may be long gone).
fn load_actor_opt(
    uow: &mut UnitOfWork<'_>,
    id: Option<&ActorId>,
) -> std::result::Result<Option<Actor>, PersistenceError> {
    match id {
        None => Ok(None),
        Some(id) => match uow.actor(id) {
            Ok(actor) => Ok(Some(actor)),
            Err(PersistenceError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        },
    }
}

/// Loads a referenced actor, failing when the reference is dangling.
fn load_actor_ref(
    uow: &mut UnitOfWork<'_>,
    id: Option<&ActorId>,
) -> std::result::Result<Option<Actor>, PersistenceError> {
    match id {
        None => Ok(None),
        Some(id) => uow.actor(id).map(Some),
    }
}

/// Resolves the effective creator: the recorded creator, falling back to the
/// entity's manager for legacy rows.
fn effective_creator(
    uow: &mut UnitOfWork<'_>,
    creator: Option<&ActorId>,
    manager: Option<&ActorId>,
) -> std::result::Result<Option<Actor>, PersistenceError> {
    if let Some(actor) = load_actor_opt(uow, creator)? {
        return Ok(Some(actor));
    }
    load_actor_opt(uow, manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use chrono::NaiveDate;
    use greenlight_events::Recorder;
    use greenlight_policy::DenyReason;

    use crate::clock::FixedClock;

    const TODAY: &str = "2025-06-15";

    fn today() -> NaiveDate {
        TODAY.parse().unwrap()
    }

    struct Harness {
        service: WorkflowService,
        recorder: Arc<Recorder>,
        admin: Actor,
        senior: Actor,
        lead: Actor,
        employee: Actor,
    }

    /// admin(5) <- senior(4) <- lead(3) <- employee(2)
    fn harness() -> Harness {
        let store = Workspace::new();
        let admin = Actor::new("ada", 5);
        let senior = Actor::new("sam", 4).reporting_to(&admin.id);
        let lead = Actor::new("lena", 3).reporting_to(&senior.id);
        let employee = Actor::new("eli", 2).reporting_to(&lead.id);
        for actor in [&admin, &senior, &lead, &employee] {
            store.put_actor((*actor).clone()).unwrap();
        }

        let recorder = Arc::new(Recorder::new());
        let service = WorkflowService::new(store, recorder.clone())
            .with_clock(Arc::new(FixedClock(today())));

        Harness {
            service,
            recorder,
            admin,
            senior,
            lead,
            employee,
        }
    }

    fn new_project(manager: &Actor) -> NewProject {
        NewProject {
            name: "Platform".to_string(),
            manager: manager.id.clone(),
            client: None,
            deliverables: None,
            deadline: None,
        }
    }

    fn new_epic(project: &Project, manager: &Actor) -> NewEpic {
        NewEpic {
            name: "Auth".to_string(),
            project: project.id.clone(),
            manager: manager.id.clone(),
            deliverables: None,
            start_date: None,
            deadline: None,
        }
    }

    fn new_story(epic: &Epic, assignee: Option<&Actor>) -> NewStory {
        NewStory {
            title: "Login form".to_string(),
            epic: epic.id.clone(),
            assignee: assignee.map(|a| a.id.clone()),
            deliverables: None,
            due_date: None,
            deadline: None,
            estimated_hours: None,
        }
    }

    #[test]
    fn test_level_three_creates_project_for_self_only() {
        let h = harness();

        let ok = h.service.create_project(&new_project(&h.lead), &h.lead);
        assert!(ok.is_ok());

        let err = h
            .service
            .create_project(&new_project(&h.senior), &h.lead)
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Denied(DenyReason::ManagerNotSelf(EntityKind::Project))
        ));
    }

    #[test]
    fn test_senior_creator_gets_immediate_approval() {
        let h = harness();

        let project = h
            .service
            .create_project(&new_project(&h.senior), &h.senior)
            .unwrap();

        assert!(project.approval.approved);
        assert_eq!(project.approval.end_date, Some(today()));
        assert_eq!(project.creator, Some(h.senior.id.clone()));

        let notices = h.recorder.recorded();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::ProjectCreated);
        assert_eq!(notices[0].recipient, Some(h.senior.id.clone()));
    }

    #[test]
    fn test_junior_creator_starts_pending() {
        let h = harness();

        let project = h
            .service
            .create_project(&new_project(&h.lead), &h.lead)
            .unwrap();

        assert!(!project.approval.approved);
        assert!(project.approval.end_date.is_none());
        assert!(h.recorder.is_empty());
    }

    #[test]
    fn test_create_epic_for_direct_report() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.senior), &h.senior)
            .unwrap();

        // lead reports to senior, so senior may hand them the epic.
        let epic = h
            .service
            .create_epic(&new_epic(&project, &h.lead), &h.senior)
            .unwrap();
        assert_eq!(epic.manager, h.lead.id);

        // employee is two levels down, not a direct report.
        let err = h
            .service
            .create_epic(&new_epic(&project, &h.employee), &h.senior)
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Denied(DenyReason::ManagerNotDirectReport(EntityKind::Epic))
        ));
    }

    #[test]
    fn test_create_story_notifies_assignee() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.senior), &h.senior)
            .unwrap();
        let epic = h
            .service
            .create_epic(&new_epic(&project, &h.senior), &h.senior)
            .unwrap();

        let story = h
            .service
            .create_story(&new_story(&epic, Some(&h.employee)), &h.employee)
            .unwrap();

        assert!(!story.approval.approved);
        let assigned: Vec<_> = h
            .recorder
            .recorded()
            .into_iter()
            .filter(|n| n.kind == NoticeKind::StoryAssigned)
            .collect();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].recipient, Some(h.employee.id.clone()));
    }

    #[test]
    fn test_employee_cannot_assign_story_to_others() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.senior), &h.senior)
            .unwrap();
        let epic = h
            .service
            .create_epic(&new_epic(&project, &h.senior), &h.senior)
            .unwrap();

        let err = h
            .service
            .create_story(&new_story(&epic, Some(&h.lead)), &h.employee)
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Denied(DenyReason::AssigneeNotSelf)
        ));
    }

    #[test]
    fn test_unapproved_story_cannot_be_worked_on() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.senior), &h.senior)
            .unwrap();
        let epic = h
            .service
            .create_epic(&new_epic(&project, &h.senior), &h.senior)
            .unwrap();
        let story = h
            .service
            .create_story(&new_story(&epic, Some(&h.employee)), &h.employee)
            .unwrap();

        let patch = StoryPatch {
            deliverables: Some("API sketch".to_string()),
            ..StoryPatch::default()
        };
        let err = h
            .service
            .update_story(&story.id, &patch, &h.employee)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "story cannot be worked on until approved by the creator's reporting manager"
        );
    }

    #[test]
    fn test_reporting_manager_approves_story_and_it_completes() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.senior), &h.senior)
            .unwrap();
        let epic = h
            .service
            .create_epic(&new_epic(&project, &h.senior), &h.senior)
            .unwrap();
        let story = h
            .service
            .create_story(&new_story(&epic, Some(&h.employee)), &h.employee)
            .unwrap();

        // An unrelated senior is not the creator's reporting manager.
        let err = h.service.approve_story(&story.id, &h.senior).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Denied(DenyReason::NotApprovalAuthority(EntityKind::Story))
        ));

        // lead is employee's reporting manager.
        let approved = h.service.approve_story(&story.id, &h.lead).unwrap();
        assert!(approved.approval.approved);
        assert_eq!(approved.approval.end_date, Some(today()));
    }

    #[test]
    fn test_approval_is_idempotent() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.lead), &h.lead)
            .unwrap();

        let first = h.service.approve_project(&project.id, &h.senior).unwrap();
        let second = h.service.approve_project(&project.id, &h.senior).unwrap();
        assert_eq!(first.approval, second.approval);

        // Even an actor without authority gets the unchanged entity back.
        let third = h.service.approve_project(&project.id, &h.employee).unwrap();
        assert_eq!(third.approval, first.approval);
    }

    #[test]
    fn test_unapprove_is_rejected() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.senior), &h.senior)
            .unwrap();

        let patch = ProjectPatch {
            approved: Some(false),
            ..ProjectPatch::default()
        };
        let err = h
            .service
            .update_project(&project.id, &patch, &h.admin)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));
        assert!(h
            .service
            .store()
            .project(&project.id)
            .unwrap()
            .approval
            .approved);
    }

    #[test]
    fn test_complete_story_cascades() {
        let h = harness();
        // Built by the level-3 lead so the epic and project start pending;
        // a senior creator's entities are born complete and cannot cascade.
        let project = h
            .service
            .create_project(&new_project(&h.lead), &h.lead)
            .unwrap();
        let epic = h
            .service
            .create_epic(&new_epic(&project, &h.lead), &h.lead)
            .unwrap();
        let s1 = h
            .service
            .create_story(&new_story(&epic, Some(&h.employee)), &h.employee)
            .unwrap();
        let s2 = h
            .service
            .create_story(&new_story(&epic, Some(&h.employee)), &h.employee)
            .unwrap();

        let first = h.service.complete_story(&s1.id, &h.employee).unwrap();
        assert!(!first.cascade.epic_completed);

        let second = h.service.complete_story(&s2.id, &h.employee).unwrap();
        assert!(second.cascade.epic_completed);
        assert!(second.cascade.project_completed);

        let epic = h.service.store().epic(&epic.id).unwrap();
        assert_eq!(epic.approval.end_date, Some(today()));
    }

    #[test]
    fn test_complete_story_is_idempotent() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.lead), &h.lead)
            .unwrap();
        let epic = h
            .service
            .create_epic(&new_epic(&project, &h.lead), &h.lead)
            .unwrap();
        let story = h
            .service
            .create_story(&new_story(&epic, Some(&h.employee)), &h.employee)
            .unwrap();

        h.service.complete_story(&story.id, &h.employee).unwrap();
        let before = h.recorder.len();

        let again = h.service.complete_story(&story.id, &h.employee).unwrap();
        assert_eq!(again.cascade, CascadeResult::default());
        assert_eq!(h.recorder.len(), before);
    }

    #[test]
    fn test_concurrent_sibling_completion_completes_epic_once() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.lead), &h.lead)
            .unwrap();
        let epic = h
            .service
            .create_epic(&new_epic(&project, &h.lead), &h.lead)
            .unwrap();
        let s1 = h
            .service
            .create_story(&new_story(&epic, Some(&h.employee)), &h.employee)
            .unwrap();
        let s2 = h
            .service
            .create_story(&new_story(&epic, Some(&h.employee)), &h.employee)
            .unwrap();

        let service = Arc::new(h.service);
        let handles: Vec<_> = [s1.id.clone(), s2.id.clone()]
            .into_iter()
            .map(|id| {
                let service = Arc::clone(&service);
                let actor = h.employee.clone();
                thread::spawn(move || service.complete_story(&id, &actor).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let epic = service.store().epic(&epic.id).unwrap();
        assert!(epic.approval.approved);

        // Exactly one epic-completed notice, whichever thread won the race.
        let epic_notices = h
            .recorder
            .recorded()
            .into_iter()
            .filter(|n| n.kind == NoticeKind::EpicCompleted)
            .count();
        assert_eq!(epic_notices, 1);
    }

    #[test]
    fn test_delete_project_removes_children() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.senior), &h.senior)
            .unwrap();
        let epic = h
            .service
            .create_epic(&new_epic(&project, &h.senior), &h.senior)
            .unwrap();
        let story = h
            .service
            .create_story(&new_story(&epic, Some(&h.senior)), &h.senior)
            .unwrap();

        let err = h.service.delete_project(&project.id, &h.lead).unwrap_err();
        assert!(matches!(err, WorkflowError::Denied(_)));

        h.service.delete_project(&project.id, &h.senior).unwrap();
        assert!(h.service.store().project(&project.id).is_err());
        assert!(h.service.store().epic(&epic.id).is_err());
        assert!(h.service.store().story(&story.id).is_err());
    }

    #[test]
    fn test_delete_missing_story_is_not_found() {
        let h = harness();
        let err = h
            .service
            .delete_story(&StoryId::from_string("story-missing"), &h.senior)
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::NotFound {
                kind: EntityKind::Story,
                ..
            }
        ));
    }

    #[test]
    fn test_delete_client_unlinks_projects() {
        let h = harness();
        let client = h
            .service
            .create_client(
                &NewClient {
                    name: "Acme".to_string(),
                    email: None,
                    phone: None,
                    address: None,
                },
                &h.senior,
            )
            .unwrap();

        let mut dto = new_project(&h.senior);
        dto.client = Some(client.id.clone());
        let project = h.service.create_project(&dto, &h.senior).unwrap();

        h.service.delete_client(&client.id, &h.senior).unwrap();
        assert!(h.service.store().client(&client.id).is_err());
        assert!(h
            .service
            .store()
            .project(&project.id)
            .unwrap()
            .client
            .is_none());
    }

    #[test]
    fn test_sla_rules_are_senior_only() {
        let h = harness();
        let project = h
            .service
            .create_project(&new_project(&h.senior), &h.senior)
            .unwrap();
        let rule = SlaRule::for_project(project.id.clone(), 48);

        let err = h.service.put_sla_rule(&rule, &h.lead).unwrap_err();
        assert!(matches!(err, WorkflowError::Denied(_)));

        h.service.put_sla_rule(&rule, &h.senior).unwrap();
        assert_eq!(
            h.service.store().sla_rule(&rule.id).unwrap().duration_hours,
            48
        );

        h.service.delete_sla_rule(&rule.id, &h.admin).unwrap();
        assert!(h.service.store().sla_rule(&rule.id).is_err());
    }

    #[test]
    fn test_current_actor_via_identity() {
        let h = harness();
        let service = WorkflowService::new(Workspace::new(), Arc::new(Recorder::new()))
            .with_identity(Arc::new(StaticIdentity::new(h.senior.clone())));
        assert_eq!(service.current_actor().unwrap().id, h.senior.id);

        let anonymous = WorkflowService::new(Workspace::new(), Arc::new(Recorder::new()));
        assert!(matches!(
            anonymous.current_actor(),
            Err(WorkflowError::Unauthenticated)
        ));
    }
}
