//! Resource types: URL, schema and the identity map of live instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{Resource, ResourceError};
use crate::runtime::ResourceSystem;

/// Identity of a resource instance, unique within its [`ResourceType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Number(i64),
    Text(String),
}

impl ResourceId {
    pub fn to_value(&self) -> Value {
        match self {
            ResourceId::Number(n) => Value::from(*n),
            ResourceId::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Number(n) => write!(f, "{n}"),
            ResourceId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i32> for ResourceId {
    fn from(id: i32) -> Self {
        ResourceId::Number(i64::from(id))
    }
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        ResourceId::Number(id)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        ResourceId::Text(id.to_owned())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        ResourceId::Text(id)
    }
}

/// Declared type of a schema field. Stored, not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Number,
    String,
    Boolean,
    Object,
    Array,
    Any,
}

/// Field declarations of a resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    identity: String,
    fields: Vec<(String, FieldType)>,
}

impl Schema {
    /// An empty schema whose identity field is `id`.
    pub fn new() -> Self {
        Self {
            identity: "id".to_owned(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push((name.into(), field_type));
        self
    }

    pub fn identity_field(mut self, name: impl Into<String>) -> Self {
        self.identity = name.into();
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn fields(&self) -> &[(String, FieldType)] {
        &self.fields
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, field_type)| *field_type)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything needed to define a resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    /// Name used in logs, e.g. `"Person"`.
    pub name: String,
    /// Collection URL (`/people`) or a template containing `{id}`.
    pub url: String,
    pub schema: Schema,
}

impl ResourceDefinition {
    pub fn new(name: impl Into<String>, url: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            schema,
        }
    }
}

pub(crate) struct TypeInner {
    pub(crate) definition: ResourceDefinition,
    pub(crate) system: ResourceSystem,
    instances: RefCell<HashMap<ResourceId, Resource>>,
}

impl TypeInner {
    pub(crate) fn evict(&self, id: &ResourceId) {
        if self.instances.borrow_mut().remove(id).is_some() {
            debug!(resource = %self.definition.name, %id, "Evicted from identity map");
        }
    }

    /// Handles to every instance currently in the identity map.
    pub(crate) fn live_instances(&self) -> Vec<Resource> {
        self.instances.borrow().values().cloned().collect()
    }
}

/// A defined kind of resource and the cache of its live instances.
///
/// Asking for the same id twice yields the same instance until it is destroyed.
#[derive(Clone)]
pub struct ResourceType {
    inner: Rc<TypeInner>,
}

impl ResourceType {
    pub(crate) fn new(system: ResourceSystem, definition: ResourceDefinition) -> Self {
        info!(resource = %definition.name, url = %definition.url, "Resource type defined");
        Self {
            inner: Rc::new(TypeInner {
                definition,
                system,
                instances: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> TypeRef {
        Rc::downgrade(&self.inner)
    }

    pub fn name(&self) -> &str {
        &self.inner.definition.name
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.definition.schema
    }

    /// Address of the instance with `id`.
    pub fn resource_url(&self, id: &ResourceId) -> String {
        let url = &self.inner.definition.url;
        if url.contains("{id}") {
            url.replace("{id}", &id.to_string())
        } else {
            format!("{}/{}", url.trim_end_matches('/'), id)
        }
    }

    /// The cached instance for `id`, creating an unfetched one if needed.
    pub fn create(&self, id: impl Into<ResourceId>) -> Resource {
        let id = id.into();
        if let Some(existing) = self.find(&id) {
            return existing;
        }

        let mut data = Map::new();
        data.insert(self.schema().identity().to_owned(), id.to_value());
        let resource = Resource::new(
            id.clone(),
            self.resource_url(&id),
            data,
            self.inner.system.clone(),
            Rc::downgrade(&self.inner),
        );
        self.inner
            .instances
            .borrow_mut()
            .insert(id.clone(), resource.clone());
        debug!(resource = %self.name(), %id, "Instance created");
        resource
    }

    /// Like [`create`](Self::create), reading the id from `attributes` and
    /// assigning the remaining attributes into the instance's data.
    pub fn create_with(&self, attributes: Value) -> Result<Resource, ResourceError> {
        let Value::Object(attributes) = attributes else {
            return Err(ResourceError::NotAnObject(attributes.to_string()));
        };

        let field = self.schema().identity();
        let id = match attributes.get(field) {
            Some(Value::Number(n)) => n.as_i64().map(ResourceId::Number),
            Some(Value::String(s)) => Some(ResourceId::Text(s.clone())),
            Some(_) => None,
            None => {
                return Err(ResourceError::MissingIdentity {
                    field: field.to_owned(),
                })
            }
        }
        .ok_or_else(|| ResourceError::InvalidIdentity {
            field: field.to_owned(),
            value: attributes.get(field).map(Value::to_string).unwrap_or_default(),
        })?;

        let resource = self.create(id);
        resource.assign(&attributes);
        Ok(resource)
    }

    /// The live cached instance for `id`, if any.
    pub fn find(&self, id: &ResourceId) -> Option<Resource> {
        self.inner.instances.borrow().get(id).cloned()
    }

    /// Number of instances currently held in the identity map.
    pub fn cached_count(&self) -> usize {
        self.inner.instances.borrow().len()
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("definition", &self.inner.definition)
            .field("cached", &self.cached_count())
            .finish()
    }
}

pub(crate) type TypeRef = Weak<TypeInner>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_and_convert() {
        assert_eq!(ResourceId::from(7).to_string(), "7");
        assert_eq!(ResourceId::from("abc").to_value(), Value::from("abc"));
        let parsed: ResourceId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, ResourceId::Number(42));
    }

    #[test]
    fn schema_keeps_declared_fields() {
        let schema = Schema::new()
            .field("id", FieldType::Number)
            .field("name", FieldType::String);
        assert_eq!(schema.identity(), "id");
        assert_eq!(schema.field_type("name"), Some(FieldType::String));
        assert_eq!(schema.field_type("missing"), None);
    }
}
