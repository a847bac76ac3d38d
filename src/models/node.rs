//! Knowledge node model.
//!
//! A node's `content` shape depends on its `node_type`. On the wire both are
//! sibling fields; in memory the type is carried by the [`NodeContent`]
//! variant itself so forms and views dispatch with an exhaustive match.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant-unique node identifier.
pub type NodeId = i64;

/// The eight kinds of knowledge node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Faq,
    Playbook,
    PermissionRule,
    SchemaIndex,
    SchemaField,
    Example,
    Entity,
    Concept,
}

impl NodeType {
    pub const ALL: [NodeType; 8] = [
        NodeType::Faq,
        NodeType::Playbook,
        NodeType::PermissionRule,
        NodeType::SchemaIndex,
        NodeType::SchemaField,
        NodeType::Example,
        NodeType::Entity,
        NodeType::Concept,
    ];

    /// Wire name (`snake_case`).
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Faq => "faq",
            NodeType::Playbook => "playbook",
            NodeType::PermissionRule => "permission_rule",
            NodeType::SchemaIndex => "schema_index",
            NodeType::SchemaField => "schema_field",
            NodeType::Example => "example",
            NodeType::Entity => "entity",
            NodeType::Concept => "concept",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown node type '{}'", s))
    }
}

/// Who may see a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    #[default]
    Internal,
    Restricted,
}

/// Editorial lifecycle of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

// ============================================================================
// Typed Content
// ============================================================================

/// Frequently asked question.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaqContent {
    pub question: String,
    pub answer: String,
    /// Alternative phrasings of the question.
    #[serde(default)]
    pub variants: Vec<String>,
}

/// Step-by-step operational guide.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybookContent {
    /// Markdown body.
    pub body: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

/// Access rule applied to data or answers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PermissionRuleContent {
    pub rule: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
}

/// Description of a dataset (table, index, collection).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaIndexContent {
    pub description: String,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Description of a single field in a dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaFieldContent {
    pub description: String,
    #[serde(default)]
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub nullable: bool,
}

/// Worked query example for a question.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExampleContent {
    pub question: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Business entity mapped onto data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityContent {
    pub entity_name: String,
    pub entity_path: String,
    #[serde(default)]
    pub key_attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Domain concept or glossary term.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConceptContent {
    pub definition: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Node content, one variant per [`NodeType`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Faq(FaqContent),
    Playbook(PlaybookContent),
    PermissionRule(PermissionRuleContent),
    SchemaIndex(SchemaIndexContent),
    SchemaField(SchemaFieldContent),
    Example(ExampleContent),
    Entity(EntityContent),
    Concept(ConceptContent),
}

impl NodeContent {
    /// The node type this content belongs to.
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeContent::Faq(_) => NodeType::Faq,
            NodeContent::Playbook(_) => NodeType::Playbook,
            NodeContent::PermissionRule(_) => NodeType::PermissionRule,
            NodeContent::SchemaIndex(_) => NodeType::SchemaIndex,
            NodeContent::SchemaField(_) => NodeType::SchemaField,
            NodeContent::Example(_) => NodeType::Example,
            NodeContent::Entity(_) => NodeType::Entity,
            NodeContent::Concept(_) => NodeType::Concept,
        }
    }

    /// Parse raw JSON content according to the declared node type.
    pub fn from_value(
        node_type: NodeType,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match node_type {
            NodeType::Faq => NodeContent::Faq(serde_json::from_value(value)?),
            NodeType::Playbook => NodeContent::Playbook(serde_json::from_value(value)?),
            NodeType::PermissionRule => {
                NodeContent::PermissionRule(serde_json::from_value(value)?)
            }
            NodeType::SchemaIndex => NodeContent::SchemaIndex(serde_json::from_value(value)?),
            NodeType::SchemaField => NodeContent::SchemaField(serde_json::from_value(value)?),
            NodeType::Example => NodeContent::Example(serde_json::from_value(value)?),
            NodeType::Entity => NodeContent::Entity(serde_json::from_value(value)?),
            NodeType::Concept => NodeContent::Concept(serde_json::from_value(value)?),
        })
    }

    /// Serialize the variant payload without its tag.
    pub fn to_value(&self) -> serde_json::Value {
        let value = match self {
            NodeContent::Faq(c) => serde_json::to_value(c),
            NodeContent::Playbook(c) => serde_json::to_value(c),
            NodeContent::PermissionRule(c) => serde_json::to_value(c),
            NodeContent::SchemaIndex(c) => serde_json::to_value(c),
            NodeContent::SchemaField(c) => serde_json::to_value(c),
            NodeContent::Example(c) => serde_json::to_value(c),
            NodeContent::Entity(c) => serde_json::to_value(c),
            NodeContent::Concept(c) => serde_json::to_value(c),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

// ============================================================================
// Knowledge Node
// ============================================================================

/// A typed content node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct KnowledgeNode {
    pub id: NodeId,
    pub tenant_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: NodeContent,
    pub tags: BTreeSet<String>,
    pub visibility: Visibility,
    pub status: NodeStatus,
    /// Schema-lineage nodes only.
    pub dataset_name: Option<String>,
    pub field_path: Option<String>,
    pub data_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Layout-assigned position, never persisted.
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl KnowledgeNode {
    /// Creates a draft node with the current timestamp.
    pub fn new(
        id: NodeId,
        tenant_id: impl Into<String>,
        title: impl Into<String>,
        content: NodeContent,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            tenant_id: tenant_id.into(),
            title: title.into(),
            summary: None,
            content,
            tags: BTreeSet::new(),
            visibility: Visibility::default(),
            status: NodeStatus::default(),
            dataset_name: None,
            field_path: None,
            data_type: None,
            created_at: now,
            updated_at: now,
            x: None,
            y: None,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.content.node_type()
    }

    /// Position assigned by the layout engine, if any.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.x.zip(self.y)
    }
}

/// Wire shape: `node_type` and untyped `content` side by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNode {
    id: NodeId,
    tenant_id: String,
    node_type: NodeType,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(default)]
    content: serde_json::Value,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default)]
    status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dataset_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_type: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
}

impl TryFrom<RawNode> for KnowledgeNode {
    type Error = serde_json::Error;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let content = NodeContent::from_value(raw.node_type, raw.content)?;
        Ok(Self {
            id: raw.id,
            tenant_id: raw.tenant_id,
            title: raw.title,
            summary: raw.summary,
            content,
            tags: raw.tags,
            visibility: raw.visibility,
            status: raw.status,
            dataset_name: raw.dataset_name,
            field_path: raw.field_path,
            data_type: raw.data_type,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            x: raw.x,
            y: raw.y,
        })
    }
}

impl From<KnowledgeNode> for RawNode {
    fn from(node: KnowledgeNode) -> Self {
        Self {
            id: node.id,
            tenant_id: node.tenant_id,
            node_type: node.content.node_type(),
            title: node.title,
            summary: node.summary,
            content: node.content.to_value(),
            tags: node.tags,
            visibility: node.visibility,
            status: node.status,
            dataset_name: node.dataset_name,
            field_path: node.field_path,
            data_type: node.data_type,
            created_at: node.created_at,
            updated_at: node.updated_at,
            x: node.x,
            y: node.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_faq_node() {
        let json = r#"{
            "id": 12,
            "tenant_id": "t1",
            "node_type": "faq",
            "title": "Reset password",
            "content": {"question": "How do I reset?", "answer": "Use the portal."},
            "tags": ["auth", "account"],
            "visibility": "public",
            "status": "published",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        }"#;
        let node: KnowledgeNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.node_type(), NodeType::Faq);
        assert_eq!(node.visibility, Visibility::Public);
        match &node.content {
            NodeContent::Faq(faq) => {
                assert_eq!(faq.question, "How do I reset?");
                assert!(faq.variants.is_empty());
            }
            other => panic!("unexpected content: {:?}", other),
        }
        assert!(node.position().is_none());
    }

    #[test]
    fn test_content_must_match_node_type() {
        // An entity requires entity_name and entity_path.
        let json = r#"{
            "id": 1, "tenant_id": "t1", "node_type": "entity", "title": "Customer",
            "content": {"question": "q", "answer": "a"},
            "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        assert!(serde_json::from_str::<KnowledgeNode>(json).is_err());
    }

    #[test]
    fn test_serialize_writes_node_type_beside_content() {
        let node = KnowledgeNode::new(
            5,
            "t1",
            "Revenue",
            NodeContent::Concept(ConceptContent {
                definition: "Money in".to_string(),
                aliases: vec!["income".to_string()],
            }),
        );
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["node_type"], "concept");
        assert_eq!(value["content"]["definition"], "Money in");
        assert!(value.get("x").is_none());
    }

    #[test]
    fn test_node_type_from_str() {
        assert_eq!(
            "permission_rule".parse::<NodeType>().unwrap(),
            NodeType::PermissionRule
        );
        assert!("widget".parse::<NodeType>().is_err());
        for t in NodeType::ALL {
            assert_eq!(t.as_str().parse::<NodeType>().unwrap(), t);
        }
    }
}
