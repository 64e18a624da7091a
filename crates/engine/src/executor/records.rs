//! Mutation step executors: tenant-scoped CRM/ops record writes.
//!
//! Every executor performs a single logical write through the repository
//! layer, always carrying the run's organization id. A config referencing a
//! record from another organization surfaces as NotFound, never as a
//! cross-tenant write.

use async_trait::async_trait;
use serde_json::{json, Value};

use flowline_core::workflow::ActionType;
use flowline_db::models::contact::{CreateContact, UpdateContact};
use flowline_db::models::opportunity::UpdateOpportunity;
use flowline_db::models::project::CreateProject;
use flowline_db::models::task::{CreateTask, TaskFilter, UpdateTask};
use flowline_db::repositories::{
    ActivityRepo, ContactRepo, OpportunityRepo, ProjectRepo, TaskRepo,
};
use flowline_db::DbPool;

use super::{StepContext, StepExecutor};
use crate::error::ExecError;

/// Deserialize a step config into a repository DTO.
fn parse_config<T: serde::de::DeserializeOwned>(config: &Value) -> Result<T, ExecError> {
    serde_json::from_value(config.clone())
        .map_err(|e| ExecError::Config(format!("invalid action config: {e}")))
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// `create_task`: insert a new task.
pub struct CreateTaskExecutor {
    pub pool: DbPool,
}

#[async_trait]
impl StepExecutor for CreateTaskExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::CreateTask
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let input: CreateTask = parse_config(ctx.config)?;
        let task = TaskRepo::create(&self.pool, ctx.org_id, &input).await?;
        Ok(json!({ "task_id": task.id, "title": task.title, "status": task.status }))
    }
}

/// `update_task`: partial update of one task.
pub struct UpdateTaskExecutor {
    pub pool: DbPool,
}

#[async_trait]
impl StepExecutor for UpdateTaskExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::UpdateTask
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let task_id = ctx.id_field("task_id")?;
        let set: UpdateTask = match ctx.config.get("set") {
            Some(set) => parse_config(set)?,
            None => parse_config(ctx.config)?,
        };

        let task = TaskRepo::update(&self.pool, ctx.org_id, task_id, &set)
            .await?
            .ok_or(ExecError::NotFound {
                entity: "Task",
                id: task_id,
            })?;

        Ok(json!({ "task_id": task.id, "status": task.status }))
    }
}

/// `bulk_update_tasks`: one set of field updates applied to every task
/// matching a filter.
pub struct BulkUpdateTasksExecutor {
    pub pool: DbPool,
}

#[async_trait]
impl StepExecutor for BulkUpdateTasksExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::BulkUpdateTasks
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let filter: TaskFilter = ctx
            .config
            .get("filter")
            .map(parse_config)
            .transpose()?
            .ok_or_else(|| ExecError::Config("missing field 'filter'".into()))?;
        let set: UpdateTask = ctx
            .config
            .get("set")
            .map(parse_config)
            .transpose()?
            .ok_or_else(|| ExecError::Config("missing field 'set'".into()))?;

        let updated = TaskRepo::bulk_update(&self.pool, ctx.org_id, &filter, &set).await?;
        Ok(json!({ "updated_count": updated }))
    }
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

/// `create_contact`: insert a new contact.
pub struct CreateContactExecutor {
    pub pool: DbPool,
}

#[async_trait]
impl StepExecutor for CreateContactExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::CreateContact
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let input: CreateContact = parse_config(ctx.config)?;
        let contact = ContactRepo::create(&self.pool, ctx.org_id, &input).await?;
        Ok(json!({ "contact_id": contact.id, "name": contact.name }))
    }
}

/// `update_contact`: partial update of one contact.
pub struct UpdateContactExecutor {
    pub pool: DbPool,
}

#[async_trait]
impl StepExecutor for UpdateContactExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::UpdateContact
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let contact_id = ctx.id_field("contact_id")?;
        let set: UpdateContact = match ctx.config.get("set") {
            Some(set) => parse_config(set)?,
            None => parse_config(ctx.config)?,
        };

        let contact = ContactRepo::update(&self.pool, ctx.org_id, contact_id, &set)
            .await?
            .ok_or(ExecError::NotFound {
                entity: "Contact",
                id: contact_id,
            })?;

        Ok(json!({ "contact_id": contact.id, "name": contact.name }))
    }
}

/// `add_tag` / `remove_tag`: tag mutation on a contact.
pub struct TagExecutor {
    pool: DbPool,
    action: ActionType,
}

impl TagExecutor {
    pub fn add(pool: DbPool) -> Self {
        Self {
            pool,
            action: ActionType::AddTag,
        }
    }

    pub fn remove(pool: DbPool) -> Self {
        Self {
            pool,
            action: ActionType::RemoveTag,
        }
    }
}

#[async_trait]
impl StepExecutor for TagExecutor {
    fn action_type(&self) -> ActionType {
        self.action
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let contact_id = ctx.id_field("contact_id")?;
        let tag = ctx.str_field("tag")?;

        let contact = match self.action {
            ActionType::AddTag => {
                ContactRepo::add_tag(&self.pool, ctx.org_id, contact_id, tag).await?
            }
            _ => ContactRepo::remove_tag(&self.pool, ctx.org_id, contact_id, tag).await?,
        }
        .ok_or(ExecError::NotFound {
            entity: "Contact",
            id: contact_id,
        })?;

        Ok(json!({ "contact_id": contact.id, "tags": contact.tags }))
    }
}

// ---------------------------------------------------------------------------
// Opportunities
// ---------------------------------------------------------------------------

/// `update_opportunity`: partial update of one opportunity.
pub struct UpdateOpportunityExecutor {
    pub pool: DbPool,
}

#[async_trait]
impl StepExecutor for UpdateOpportunityExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::UpdateOpportunity
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let opportunity_id = ctx.id_field("opportunity_id")?;
        let set: UpdateOpportunity = match ctx.config.get("set") {
            Some(set) => parse_config(set)?,
            None => parse_config(ctx.config)?,
        };

        let opportunity = OpportunityRepo::update(&self.pool, ctx.org_id, opportunity_id, &set)
            .await?
            .ok_or(ExecError::NotFound {
                entity: "Opportunity",
                id: opportunity_id,
            })?;

        Ok(json!({ "opportunity_id": opportunity.id, "stage": opportunity.stage }))
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// `create_project`: insert a new project.
pub struct CreateProjectExecutor {
    pub pool: DbPool,
}

#[async_trait]
impl StepExecutor for CreateProjectExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::CreateProject
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let input: CreateProject = parse_config(ctx.config)?;
        let project = ProjectRepo::create(&self.pool, ctx.org_id, &input).await?;
        Ok(json!({ "project_id": project.id, "name": project.name }))
    }
}

/// `create_project_from_opportunity`: convert a won opportunity into a
/// project. Converting the same opportunity twice is a conflict.
pub struct CreateProjectFromOpportunityExecutor {
    pub pool: DbPool,
}

#[async_trait]
impl StepExecutor for CreateProjectFromOpportunityExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::CreateProjectFromOpportunity
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let opportunity_id = ctx.id_field("opportunity_id")?;

        let opportunity = OpportunityRepo::find_by_id(&self.pool, ctx.org_id, opportunity_id)
            .await?
            .ok_or(ExecError::NotFound {
                entity: "Opportunity",
                id: opportunity_id,
            })?;

        if let Some(existing) =
            ProjectRepo::find_by_opportunity(&self.pool, ctx.org_id, opportunity_id).await?
        {
            return Err(ExecError::Conflict(format!(
                "opportunity {opportunity_id} already converted to project {}",
                existing.id
            )));
        }

        let name = ctx
            .opt_str_field("name")
            .map(str::to_string)
            .unwrap_or_else(|| opportunity.name.clone());

        let project = ProjectRepo::create(
            &self.pool,
            ctx.org_id,
            &CreateProject {
                name,
                status: None,
                opportunity_id: Some(opportunity_id),
            },
        )
        .await?;

        Ok(json!({ "project_id": project.id, "opportunity_id": opportunity_id }))
    }
}

/// `create_project_from_template`: instantiate a template into a project
/// plus one open task per template title.
pub struct CreateProjectFromTemplateExecutor {
    pub pool: DbPool,
}

#[async_trait]
impl StepExecutor for CreateProjectFromTemplateExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::CreateProjectFromTemplate
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let template_id = ctx.id_field("template_id")?;
        let name = ctx.str_field("name")?;

        let template = ProjectRepo::find_template_by_id(&self.pool, ctx.org_id, template_id)
            .await?
            .ok_or(ExecError::NotFound {
                entity: "ProjectTemplate",
                id: template_id,
            })?;

        let project = ProjectRepo::create(
            &self.pool,
            ctx.org_id,
            &CreateProject {
                name: name.to_string(),
                status: None,
                opportunity_id: None,
            },
        )
        .await?;

        let titles: Vec<String> = template
            .task_titles
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut task_ids = Vec::with_capacity(titles.len());
        for title in &titles {
            let task = TaskRepo::create(
                &self.pool,
                ctx.org_id,
                &CreateTask {
                    title: title.clone(),
                    project_id: Some(project.id),
                    status: None,
                    assignee_id: None,
                    tags: Vec::new(),
                },
            )
            .await?;
            task_ids.push(task.id);
        }

        Ok(json!({
            "project_id": project.id,
            "template_id": template_id,
            "task_ids": task_ids,
        }))
    }
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

/// `create_activity`: append one audit-trail entry for an entity.
pub struct CreateActivityExecutor {
    pub pool: DbPool,
}

#[async_trait]
impl StepExecutor for CreateActivityExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::CreateActivity
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let entity_type = ctx.str_field("entity_type")?;
        let entity_id = ctx.id_field("entity_id")?;
        let kind = ctx.str_field("kind")?;
        let note = ctx.opt_str_field("note");

        let activity =
            ActivityRepo::create(&self.pool, ctx.org_id, entity_type, entity_id, kind, note)
                .await?;

        Ok(json!({ "activity_id": activity.id }))
    }
}
