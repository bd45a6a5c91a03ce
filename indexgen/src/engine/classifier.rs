use crate::errors::{MalformedReason, SchemaResult};
use crate::types::{EntityDescriptor, RelationDescriptor, RelationKind};

/// Where a relation lands in the resolved selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationRole {
    /// Many-to-one: the entity points at one target.
    Parent,
    /// One-to-many: many targets point back at the entity.
    Child,
}

/// Classifies a relation discovered on `owner`.
pub fn classify(relation: &RelationDescriptor, owner: &EntityDescriptor) -> SchemaResult<RelationRole> {
    if relation.target == owner.name {
        return Err(MalformedReason::SelfReference {
            entity: owner.name.clone(),
            relation: relation.name.clone(),
        }
        .into());
    }
    match relation.kind {
        RelationKind::BelongsTo => Ok(RelationRole::Parent),
        RelationKind::HasMany => Ok(RelationRole::Child),
        RelationKind::ManyToMany => Err(MalformedReason::ImplicitManyToMany {
            relation: relation.key().to_string(),
        }
        .into()),
    }
}

/// Rejects relations that cannot be emitted as a join field.
pub fn ensure_joinable(relation: &RelationDescriptor) -> SchemaResult<()> {
    if relation.composite {
        return Err(MalformedReason::CompositeKeyNotAllowed {
            relation: relation.key().to_string(),
        }
        .into());
    }
    Ok(())
}
