//! Scene graph: the captured objects and relationships of one rendered view.
//!
//! A [`Scene`] is produced externally and consumed read-only. The only state
//! it owns beyond its data is a derived cache (fingerprint and
//! `same_<attribute>` equivalence indexes). The cache lives in write-once
//! cells, so a scene can be shared across threads, and it is reset by every
//! method that hands out mutable access.

use crate::op::Attribute;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

// ══════════════════════════════════════════════════════════════════════════════
// Objects
// ══════════════════════════════════════════════════════════════════════════════

/// A text annotation attached to an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub body: String,
    /// Normalized image coordinates of the text anchor.
    #[serde(default)]
    pub pixel_coords: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl TextAnnotation {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            pixel_coords: Vec::new(),
            font: None,
            color: None,
        }
    }
}

/// The recorded value of one object field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// A single token (`"red"`, `"cube"`).
    Token(String),
    /// Several tokens; only unambiguous when it has exactly one.
    Tokens(Vec<String>),
    Text(TextAnnotation),
    /// Anything else the scene records (coordinates, rotation, ...).
    Other(serde_json::Value),
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Token(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Token(s)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(tokens: Vec<String>) -> Self {
        Self::Tokens(tokens)
    }
}

impl From<TextAnnotation> for AttrValue {
    fn from(text: TextAnnotation) -> Self {
        Self::Text(text)
    }
}

/// One object of a scene. Its position in [`Scene::objects`] is its identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    #[serde(flatten)]
    pub fields: BTreeMap<String, AttrValue>,
}

impl SceneObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, attribute: Attribute, value: impl Into<AttrValue>) -> Self {
        self.fields.insert(attribute.key().to_string(), value.into());
        self
    }

    pub fn attribute(&self, attribute: Attribute) -> Option<&AttrValue> {
        self.fields.get(attribute.key())
    }

    /// Body of the attached text annotation, if any.
    pub fn text_body(&self) -> Option<&str> {
        match self.attribute(Attribute::Text)? {
            AttrValue::Text(text) => Some(text.body.as_str()),
            AttrValue::Token(body) => Some(body.as_str()),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&TextAnnotation> {
        match self.attribute(Attribute::Text)? {
            AttrValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Relationships
// ══════════════════════════════════════════════════════════════════════════════

/// A `(subject, predicate, object)` relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject_idx: usize,
    pub predicate: String,
    pub object_idx: usize,
}

/// Spatial relationships between objects, in one of two shapes.
///
/// The shape is fixed per scene. `relate` nodes read the adjacency form and
/// `relate_triple` nodes read the triple form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relationships {
    /// `relation[name][i]` holds the indices related to object `i`.
    Adjacency(BTreeMap<String, Vec<Vec<usize>>>),
    Triples(Vec<Triple>),
}

impl Default for Relationships {
    fn default() -> Self {
        Self::Adjacency(BTreeMap::new())
    }
}

impl Relationships {
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Adjacency(_) => "adjacency",
            Self::Triples(_) => "triple",
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Fingerprint
// ══════════════════════════════════════════════════════════════════════════════

/// SHA-256 of a scene's canonical JSON.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneFingerprint(pub [u8; 32]);

impl fmt::Display for SceneFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SceneFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SceneFingerprint({self})")
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Scene
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
struct SceneCache {
    fingerprint: OnceLock<SceneFingerprint>,
    same: [OnceLock<Vec<Vec<usize>>>; Attribute::COUNT],
}

/// The queryable facts of one rendered view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    objects: Vec<SceneObject>,
    #[serde(default)]
    relationships: Relationships,
    #[serde(skip)]
    cache: SceneCache,
}

impl Scene {
    pub fn new(objects: Vec<SceneObject>, relationships: Relationships) -> Self {
        Self {
            objects,
            relationships,
            cache: SceneCache::default(),
        }
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object(&self, idx: usize) -> Option<&SceneObject> {
        self.objects.get(idx)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    /// Mutable access to the objects. Drops every derived cache.
    pub fn objects_mut(&mut self) -> &mut Vec<SceneObject> {
        self.cache = SceneCache::default();
        &mut self.objects
    }

    /// Replace the relationships. Drops every derived cache.
    pub fn set_relationships(&mut self, relationships: Relationships) {
        self.cache = SceneCache::default();
        self.relationships = relationships;
    }

    /// Content fingerprint, computed once per scene state.
    ///
    /// Two scenes with identical objects and relationships share a
    /// fingerprint.
    pub fn fingerprint(&self) -> SceneFingerprint {
        *self.cache.fingerprint.get_or_init(|| {
            let mut hasher = Sha256::new();
            let canonical = (&self.objects, &self.relationships);
            if serde_json::to_writer(&mut hasher, &canonical).is_err() {
                hasher = Sha256::new();
                hasher.update(format!("{canonical:?}").as_bytes());
            }
            SceneFingerprint(hasher.finalize().into())
        })
    }

    /// The cached `same_<attribute>` index, if it has been built.
    pub fn same_attribute_index(&self, attribute: Attribute) -> Option<&[Vec<usize>]> {
        self.cache.same[attribute.index()].get().map(Vec::as_slice)
    }

    /// Store a freshly built `same_<attribute>` index.
    ///
    /// If another caller stored one first, that one is kept and returned.
    pub fn init_same_attribute_index(
        &self,
        attribute: Attribute,
        index: Vec<Vec<usize>>,
    ) -> &[Vec<usize>] {
        self.cache.same[attribute.index()].get_or_init(|| index)
    }
}

impl PartialEq for Scene {
    fn eq(&self, other: &Self) -> bool {
        self.objects == other.objects && self.relationships == other.relationships
    }
}
