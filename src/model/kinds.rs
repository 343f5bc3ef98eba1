use serde_json::Value;
use std::ops::{Deref, DerefMut};

use crate::logic::view::{ViewQuery, ViewResult};
use crate::model::{Document, EntitySpec, Id, Record, COMPANY, LOCATION, PROJECT, ROLE, SKILL, TOOL};
use crate::store::{DocumentStore, StoreResult};

/// A document kind with its own typed wrapper around `Document`.
pub trait Entity:
    Deref<Target = Document> + DerefMut + From<Document> + Into<Document> + Send + Sync + 'static
{
    const SPEC: &'static EntitySpec;
    /// Human-facing name used in API messages.
    const LABEL: &'static str;
}

pub async fn find_entity<E, S>(store: &S, id: &str) -> StoreResult<Option<E>>
where
    E: Entity,
    S: DocumentStore + ?Sized,
{
    let doc = Document::find_by_id(E::SPEC, store, id).await?;
    Ok(doc.map(E::from))
}

/// Rows of the kind's `all` view.
pub async fn list_entities<E, S>(store: &S) -> StoreResult<ViewResult>
where
    E: Entity,
    S: DocumentStore + ?Sized,
{
    Document::query_view(store, &ViewQuery::new(E::SPEC.doc_type, "all")).await
}

macro_rules! entity_kind {
    ($(#[$meta:meta])* $name:ident, $spec:expr, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(Document);

        impl $name {
            pub fn new(fields: Record) -> Self {
                Self(Document::new(Self::SPEC, fields))
            }

            pub async fn find_by_id<S>(store: &S, id: &str) -> StoreResult<Option<Self>>
            where
                S: DocumentStore + ?Sized,
            {
                find_entity(store, id).await
            }

            pub async fn get_all<S>(store: &S) -> StoreResult<ViewResult>
            where
                S: DocumentStore + ?Sized,
            {
                list_entities::<Self, S>(store).await
            }
        }

        impl Entity for $name {
            const SPEC: &'static EntitySpec = &$spec;
            const LABEL: &'static str = $label;
        }

        impl From<Document> for $name {
            fn from(doc: Document) -> Self {
                Self(doc)
            }
        }

        impl From<$name> for Document {
            fn from(entity: $name) -> Self {
                entity.0
            }
        }

        impl Deref for $name {
            type Target = Document;

            fn deref(&self) -> &Document {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Document {
                &mut self.0
            }
        }
    };
}

entity_kind!(
    /// An employer or client company.
    Company, COMPANY, "Company"
);
entity_kind!(Skill, SKILL, "Skill");
entity_kind!(Location, LOCATION, "Location");
entity_kind!(Role, ROLE, "Role");
entity_kind!(Tool, TOOL, "Tool");
entity_kind!(
    /// A project, linked to a company and to skill, role and tool ids.
    Project, PROJECT, "Project"
);

const REFERENCE_LISTS: [&str; 3] = ["skills", "roles", "tools"];

impl Project {
    /// Like `new`, but with the reference lists present (empty when not given).
    pub fn with_defaults(fields: Record) -> Self {
        let mut project = Self::new(fields);
        for list in REFERENCE_LISTS {
            project.array_mut(list);
        }
        project
    }

    pub fn assign_company(&mut self, company: &Company) -> &mut Self {
        if let Some(id) = company.id() {
            self.set("company", id.to_string());
        }
        self
    }

    pub fn add_skill(&mut self, skill: &Skill) -> &mut Self {
        self.push_reference("skills", skill.id());
        self
    }

    pub fn add_role(&mut self, role: &Role) -> &mut Self {
        self.push_reference("roles", role.id());
        self
    }

    pub fn remove_role(&mut self, role_id: &str) -> &mut Self {
        self.drop_reference("roles", role_id);
        self
    }

    pub fn add_tool(&mut self, tool: &Tool) -> &mut Self {
        self.push_reference("tools", tool.id());
        self
    }

    pub fn remove_tool(&mut self, tool_id: &str) -> &mut Self {
        self.drop_reference("tools", tool_id);
        self
    }

    /// Ids held in one of the reference lists, in insertion order.
    pub fn reference_ids(&self, list: &str) -> Vec<Id> {
        self.get(list)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Projects that were not removed, with company and skills embedded.
    pub async fn get_all_valid<S>(store: &S) -> StoreResult<ViewResult>
    where
        S: DocumentStore + ?Sized,
    {
        let query = ViewQuery::new(PROJECT.doc_type, "allValid")
            .include_docs()
            .transform("skills", "skill");
        Document::query_view(store, &query).await
    }

    fn push_reference(&mut self, list: &str, id: Option<&str>) {
        if let Some(id) = id {
            self.array_mut(list).push(Value::from(id));
        }
    }

    fn drop_reference(&mut self, list: &str, id: &str) {
        self.array_mut(list).retain(|item| item.as_str() != Some(id));
    }
}
