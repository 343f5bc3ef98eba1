use crate::model::FieldType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
}

impl FieldSpec {
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self { name, field_type }
    }
}

/// Lifecycle timestamps every document kind carries, validated before the
/// kind's own fields.
pub static TIMESTAMP_FIELDS: [FieldSpec; 3] = [
    FieldSpec { name: "createdOn", field_type: FieldType::Date },
    FieldSpec { name: "removedOn", field_type: FieldType::Date },
    FieldSpec { name: "updatedOn", field_type: FieldType::Date },
];

/// Declared shape of one document kind: its `type` discriminator and the
/// fields it persists, in validation order.
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySpec {
    pub doc_type: &'static str,
    own_fields: &'static [FieldSpec],
}

impl EntitySpec {
    pub const fn new(doc_type: &'static str, own_fields: &'static [FieldSpec]) -> Self {
        Self {
            doc_type,
            own_fields,
        }
    }

    /// All persisted fields: timestamps first, then the kind's own fields.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> + '_ {
        TIMESTAMP_FIELDS.iter().chain(self.own_fields.iter())
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields()
            .find(|field| field.name == name)
            .map(|field| field.field_type)
    }
}

pub const COMPANY: EntitySpec = EntitySpec::new(
    "company",
    &[
        FieldSpec { name: "name", field_type: FieldType::String },
        FieldSpec { name: "url", field_type: FieldType::Url },
        FieldSpec { name: "location", field_type: FieldType::Object },
    ],
);

pub const PROJECT: EntitySpec = EntitySpec::new(
    "project",
    &[
        FieldSpec { name: "name", field_type: FieldType::String },
        FieldSpec { name: "startDate", field_type: FieldType::Date },
        FieldSpec { name: "finishDate", field_type: FieldType::Date },
        FieldSpec { name: "client", field_type: FieldType::String },
        FieldSpec { name: "location", field_type: FieldType::Object },
        FieldSpec { name: "description", field_type: FieldType::String },
        FieldSpec { name: "duties", field_type: FieldType::Array },
        FieldSpec { name: "company", field_type: FieldType::String },
        FieldSpec { name: "skills", field_type: FieldType::Array },
        FieldSpec { name: "roles", field_type: FieldType::Array },
        FieldSpec { name: "tools", field_type: FieldType::Array },
    ],
);

pub const SKILL: EntitySpec = EntitySpec::new(
    "skill",
    &[
        FieldSpec { name: "name", field_type: FieldType::String },
        FieldSpec { name: "url", field_type: FieldType::Url },
    ],
);

pub const LOCATION: EntitySpec = EntitySpec::new(
    "location",
    &[
        FieldSpec { name: "city", field_type: FieldType::String },
        FieldSpec { name: "country", field_type: FieldType::String },
    ],
);

pub const ROLE: EntitySpec = EntitySpec::new(
    "role",
    &[
        FieldSpec { name: "name", field_type: FieldType::String },
        FieldSpec { name: "color", field_type: FieldType::String },
    ],
);

pub const TOOL: EntitySpec = EntitySpec::new(
    "tool",
    &[
        FieldSpec { name: "name", field_type: FieldType::String },
        FieldSpec { name: "url", field_type: FieldType::Url },
    ],
);
