//! Cascading completion: story -> epic -> project.
//!
//! Strictly bottom-up, a single pass per completion event, never more than
//! two hops. All sibling reads go through the unit of work so their versions
//! are re-checked at commit time: two racing sibling completions cannot both
//! complete the parent, and the loser's retry sees the winner's writes.

use chrono::NaiveDate;
use tracing::info;

use greenlight_models::{EntityRef, Epic, Notice, NoticeKind, Story};
use greenlight_persistence::{Result, UnitOfWork};

use crate::approval::ApprovalWorkflow;

/// Which levels a completion event propagated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeResult {
    /// The owning epic completed on this pass.
    pub epic_completed: bool,
    /// The owning project completed on this pass.
    pub project_completed: bool,
}

/// Walks completion upward from a newly completed story.
pub struct CascadeEngine;

impl CascadeEngine {
    /// Propagates the completion of `story`.
    ///
    /// The caller must have staged the completed story in `uow` already —
    /// the sibling scan reads through the unit of work and must see it.
    /// Completion notices are queued on `notices`; the orchestrator sends
    /// them only after the unit of work commits.
    pub fn on_story_completed(
        uow: &mut UnitOfWork<'_>,
        story: &Story,
        today: NaiveDate,
        notices: &mut Vec<Notice>,
    ) -> Result<CascadeResult> {
        let mut result = CascadeResult::default();

        let siblings = uow.stories_of(&story.epic)?;
        // An epic with no stories is "not yet populated", never complete.
        if siblings.is_empty() || !siblings.iter().all(Story::is_complete) {
            return Ok(result);
        }

        let mut epic = uow.epic(&story.epic)?;
        if !ApprovalWorkflow::approve(&mut epic.approval, today) {
            // Already complete; nothing new to propagate.
            return Ok(result);
        }
        result.epic_completed = true;
        info!(
            epic = %epic.id,
            stories = siblings.len(),
            "epic auto-completed: all stories finished"
        );
        notices.push(Notice::to_recipient(
            NoticeKind::EpicCompleted,
            EntityRef::Epic(epic.id.clone()),
            epic.manager.clone(),
            format!("Epic '{}' completed - all stories are done", epic.name),
        ));
        uow.save_epic(epic.clone());

        let sibling_epics = uow.epics_of(&epic.project)?;
        if sibling_epics.is_empty() || !sibling_epics.iter().all(Epic::is_complete) {
            return Ok(result);
        }

        let mut project = uow.project(&epic.project)?;
        if ApprovalWorkflow::approve(&mut project.approval, today) {
            result.project_completed = true;
            info!(
                project = %project.id,
                epics = sibling_epics.len(),
                "project auto-completed: all epics finished"
            );
            notices.push(Notice::to_recipient(
                NoticeKind::ProjectCompleted,
                EntityRef::Project(project.id.clone()),
                project.manager.clone(),
                format!("Project '{}' completed - all epics are done", project.name),
            ));
            uow.save_project(project);
        }

        Ok(result)
    }
}
