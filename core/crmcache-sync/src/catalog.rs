//! Entity types of the CRM API, in sync order.

use crate::registry::Registry;
use crmcache_types::EntityDescriptor;

const DATE_UPDATED: &str = "DATE_UPDATED_UTC";

fn comments() -> EntityDescriptor {
    EntityDescriptor::main(
        "Comment",
        "comments",
        "Comments",
        "COMMENT_ID",
        "COMMENT_ID",
        DATE_UPDATED,
    )
    .child_only()
}

fn links(name: &str, description: &str) -> EntityDescriptor {
    EntityDescriptor::primitive(name, description, "Links", "LINK_ID", "OBJECT_NAME")
        .without_rescan()
        .child_only()
}

/// Descriptors of every cached type, in registration order.
///
/// Link collections and comments are only reachable through their parents;
/// they are listed so marking, sweeping and pruning cover them.
pub fn crm_catalog() -> Vec<EntityDescriptor> {
    let opportunity_links = links("OpportunityLinks", "opportunity links");
    let event_links = links("EventLinks", "event links");
    let email_links = links("EmailLinks", "email links");

    vec![
        EntityDescriptor::primitive(
            "Pipeline",
            "pipelines",
            "Pipelines",
            "PIPELINE_ID",
            "PIPELINE_NAME",
        ),
        EntityDescriptor::primitive(
            "PipelineStage",
            "pipeline stages",
            "PipelineStages",
            "STAGE_ID",
            "STAGE_NAME",
        ),
        EntityDescriptor::primitive("User", "users", "Users", "USER_ID", "FIRST_NAME"),
        EntityDescriptor::primitive(
            "OpportunityCategory",
            "opportunity categories",
            "OpportunityCategories",
            "CATEGORY_ID",
            "CATEGORY_NAME",
        ),
        comments(),
        EntityDescriptor::main("Task", "tasks", "Tasks", "TASK_ID", "TITLE", DATE_UPDATED)
            .with_children(vec![comments()]),
        opportunity_links.clone(),
        EntityDescriptor::main(
            "Opportunity",
            "opportunities",
            "Opportunities",
            "OPPORTUNITY_ID",
            "OPPORTUNITY_NAME",
            DATE_UPDATED,
        )
        .with_children(vec![opportunity_links]),
        EntityDescriptor::main(
            "Project",
            "projects",
            "Projects",
            "PROJECT_ID",
            "PROJECT_NAME",
            DATE_UPDATED,
        ),
        EntityDescriptor::main("Lead", "leads", "Leads", "LEAD_ID", "TITLE", DATE_UPDATED),
        EntityDescriptor::primitive(
            "LeadStatus",
            "lead statuses",
            "LeadStatuses",
            "LEAD_STATUS_ID",
            "LEAD_STATUS",
        ),
        event_links.clone(),
        EntityDescriptor::main("Event", "events", "Events", "EVENT_ID", "TITLE", DATE_UPDATED)
            .with_children(vec![event_links]),
        email_links.clone(),
        EntityDescriptor::main("Email", "emails", "Emails", "EMAIL_ID", "SUBJECT", "EMAIL_DATE_UTC")
            .with_children(vec![comments(), email_links]),
        EntityDescriptor::main("Note", "notes", "Notes", "NOTE_ID", "TITLE", DATE_UPDATED)
            .with_children(vec![comments()]),
    ]
}

/// Registry holding [`crm_catalog`].
pub fn crm_registry() -> Registry {
    crm_catalog().into_iter().collect()
}
