#![forbid(unsafe_code)]

//! Schema definitions and the name ↔ id registry compiled from them.
//!
//! A [`Schema`] lists vertex and edge types with their attributes. Compiling
//! it against a backend yields a [`SchemaRegistry`]: the backend hands out
//! the stored integer ids once per schema and later compilations read the
//! same ids back. The registry also holds one attribute factory per type,
//! which builds the initial attribute map of new elements.

mod value;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::backend::SqlBackend;
use crate::types::{AttrId, ElementKind, Result, SeqGraphError, TypeId};

pub use value::{decode_value, encode_value, AttrDomain, AttrValue};

/// Builds the initial attribute map for a new element of one type.
pub type AttrFactory = Box<dyn Fn() -> BTreeMap<AttrId, AttrValue>>;

/// Attribute declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct AttrDef {
    /// Attribute name, unique within its type.
    pub name: String,
    /// Value domain.
    pub domain: AttrDomain,
    /// Initial value; the domain default when absent.
    pub default: Option<AttrValue>,
}

impl AttrDef {
    /// Declares an attribute starting at the domain default.
    pub fn new(name: impl Into<String>, domain: AttrDomain) -> Self {
        Self {
            name: name.into(),
            domain,
            default: None,
        }
    }

    /// Sets the initial value.
    pub fn with_default(mut self, value: impl Into<AttrValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Vertex or edge type declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDef {
    /// Type name, unique within its kind.
    pub name: String,
    /// Declared attributes.
    pub attrs: Vec<AttrDef>,
}

/// A named collection of vertex and edge types.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    name: String,
    vertex_types: Vec<TypeDef>,
    edge_types: Vec<TypeDef>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertex_types: Vec::new(),
            edge_types: Vec::new(),
        }
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a vertex type.
    pub fn vertex_type(mut self, name: impl Into<String>, attrs: Vec<AttrDef>) -> Self {
        self.vertex_types.push(TypeDef {
            name: name.into(),
            attrs,
        });
        self
    }

    /// Adds an edge type.
    pub fn edge_type(mut self, name: impl Into<String>, attrs: Vec<AttrDef>) -> Self {
        self.edge_types.push(TypeDef {
            name: name.into(),
            attrs,
        });
        self
    }

    fn types(&self) -> impl Iterator<Item = (ElementKind, &TypeDef)> {
        self.vertex_types
            .iter()
            .map(|t| (ElementKind::Vertex, t))
            .chain(self.edge_types.iter().map(|t| (ElementKind::Edge, t)))
    }
}

/// Compiled attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct AttrInfo {
    /// Stored id.
    pub id: AttrId,
    /// Attribute name.
    pub name: String,
    /// Value domain.
    pub domain: AttrDomain,
    /// Initial value of new elements.
    pub default: AttrValue,
}

/// Compiled type.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeInfo {
    /// Stored id.
    pub id: TypeId,
    /// Vertex or edge.
    pub kind: ElementKind,
    /// Type name.
    pub name: String,
    /// Attributes in declaration order.
    pub attrs: Vec<AttrInfo>,
}

impl TypeInfo {
    /// Looks up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&AttrInfo> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// Looks up an attribute by id.
    pub fn attr_by_id(&self, id: AttrId) -> Option<&AttrInfo> {
        self.attrs.iter().find(|a| a.id == id)
    }
}

/// Bidirectional type/attribute lookup plus per-type attribute factories.
pub struct SchemaRegistry {
    schema: String,
    by_name: HashMap<(ElementKind, String), TypeId>,
    types: FxHashMap<TypeId, TypeInfo>,
    factories: FxHashMap<TypeId, AttrFactory>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schema", &self.schema)
            .field("types", &self.types.len())
            .finish()
    }
}

impl SchemaRegistry {
    /// Resolves stored ids for every type and attribute of `schema`.
    pub fn compile(schema: &Schema, backend: &dyn SqlBackend) -> Result<Self> {
        let entries: Vec<(ElementKind, &str)> = schema
            .types()
            .map(|(kind, def)| (kind, def.name.as_str()))
            .collect();
        let type_ids = backend.register_types(&schema.name, &entries)?;

        let mut registry = Self {
            schema: schema.name.clone(),
            by_name: HashMap::new(),
            types: FxHashMap::default(),
            factories: FxHashMap::default(),
        };
        for ((kind, def), type_id) in schema.types().zip(type_ids) {
            if registry
                .by_name
                .insert((kind, def.name.clone()), type_id)
                .is_some()
            {
                return Err(SeqGraphError::Invalid("duplicate type name in schema"));
            }
            let names: Vec<&str> = def.attrs.iter().map(|a| a.name.as_str()).collect();
            let attr_ids = backend.register_attrs(&schema.name, type_id, &names)?;
            let attrs: Vec<AttrInfo> = def
                .attrs
                .iter()
                .zip(attr_ids)
                .map(|(a, id)| AttrInfo {
                    id,
                    name: a.name.clone(),
                    domain: a.domain,
                    default: a.default.clone().unwrap_or_else(|| a.domain.default_value()),
                })
                .collect();
            for a in &attrs {
                if !a.domain.accepts(&a.default) {
                    return Err(SeqGraphError::DomainMismatch {
                        name: a.name.clone(),
                        expected: a.domain.name(),
                        actual: a.default.kind_name(),
                    });
                }
            }
            let defaults: BTreeMap<AttrId, AttrValue> =
                attrs.iter().map(|a| (a.id, a.default.clone())).collect();
            registry
                .factories
                .insert(type_id, Box::new(move || defaults.clone()));
            registry.types.insert(
                type_id,
                TypeInfo {
                    id: type_id,
                    kind,
                    name: def.name.clone(),
                    attrs,
                },
            );
        }
        debug!(schema = %schema.name, types = registry.types.len(), "schema compiled");
        Ok(registry)
    }

    /// Schema name.
    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    /// Stored id of the type `name`.
    pub fn type_id(&self, kind: ElementKind, name: &str) -> Result<TypeId> {
        self.by_name
            .get(&(kind, name.to_owned()))
            .copied()
            .ok_or_else(|| SeqGraphError::UnknownType {
                kind,
                name: name.to_owned(),
            })
    }

    /// Compiled type for `id`.
    pub fn type_info(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(&id)
    }

    /// Name of the type stored as `id`.
    pub fn type_name(&self, id: TypeId) -> Option<&str> {
        self.types.get(&id).map(|t| t.name.as_str())
    }

    /// Attribute `name` of type `type_id`.
    pub fn attr(&self, type_id: TypeId, name: &str) -> Result<&AttrInfo> {
        let info = self
            .types
            .get(&type_id)
            .ok_or(SeqGraphError::Invalid("type id is not part of the schema"))?;
        info.attr(name).ok_or_else(|| SeqGraphError::UnknownAttribute {
            type_name: info.name.clone(),
            name: name.to_owned(),
        })
    }

    /// Replaces the attribute factory of `type_id`.
    pub fn register_factory(&mut self, type_id: TypeId, factory: AttrFactory) -> Result<()> {
        if !self.types.contains_key(&type_id) {
            return Err(SeqGraphError::Invalid("type id is not part of the schema"));
        }
        self.factories.insert(type_id, factory);
        Ok(())
    }

    /// Initial attribute map of a new element of `type_id`.
    pub fn instantiate(&self, type_id: TypeId) -> BTreeMap<AttrId, AttrValue> {
        self.factories
            .get(&type_id)
            .map(|factory| factory())
            .unwrap_or_default()
    }
}
