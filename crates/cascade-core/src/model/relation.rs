//! Declared relationships between record types

/// Relationship kind, as declared on the owning record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    MorphOne,
    MorphTo,
    HasMany,
    HasManyThrough,
    BelongsToMany,
    MorphMany,
    /// An accessor that is not a relationship the cascade understands
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

impl RelationKind {
    /// `None` for kinds that are not treated as relationships
    pub fn cardinality(self) -> Option<Cardinality> {
        match self {
            RelationKind::BelongsTo
            | RelationKind::HasOne
            | RelationKind::MorphOne
            | RelationKind::MorphTo => Some(Cardinality::One),
            RelationKind::HasMany
            | RelationKind::HasManyThrough
            | RelationKind::BelongsToMany
            | RelationKind::MorphMany => Some(Cardinality::Many),
            RelationKind::Other => None,
        }
    }

    /// The foreign key lives on the owning record rather than the child
    pub fn is_associate(self) -> bool {
        matches!(self, RelationKind::BelongsTo | RelationKind::MorphTo)
    }
}

/// Join table of a many-to-many relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pivot {
    pub table: String,
    pub parent_column: String,
    pub related_column: String,
}

impl Pivot {
    pub fn new(
        table: impl Into<String>,
        parent_column: impl Into<String>,
        related_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            parent_column: parent_column.into(),
            related_column: related_column.into(),
        }
    }
}

/// One entry of a record type's relationship table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub kind: RelationKind,
    /// Registry name of the related record type
    pub target: String,
    /// Child column for has-* kinds, owner column for belongs-to/morph-to
    pub foreign_key: String,
    /// Parent column copied into the child's foreign key (default: parent primary key)
    pub owner_key: Option<String>,
    /// Column holding the owning type name for morph kinds
    pub morph_type: Option<String>,
    pub pivot: Option<Pivot>,
}

impl Relation {
    pub fn new(kind: RelationKind, target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            foreign_key: foreign_key.into(),
            owner_key: None,
            morph_type: None,
            pivot: None,
        }
    }

    pub fn belongs_to(target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self::new(RelationKind::BelongsTo, target, foreign_key)
    }

    pub fn has_one(target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self::new(RelationKind::HasOne, target, foreign_key)
    }

    pub fn has_many(target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self::new(RelationKind::HasMany, target, foreign_key)
    }

    pub fn has_many_through(target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self::new(RelationKind::HasManyThrough, target, foreign_key)
    }

    pub fn morph_one(
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        morph_type: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::MorphOne, target, foreign_key).with_morph_type(morph_type)
    }

    pub fn morph_many(
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        morph_type: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::MorphMany, target, foreign_key).with_morph_type(morph_type)
    }

    pub fn morph_to(
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        morph_type: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::MorphTo, target, foreign_key).with_morph_type(morph_type)
    }

    pub fn belongs_to_many(target: impl Into<String>, pivot: Pivot) -> Self {
        let foreign_key = pivot.parent_column.clone();
        let mut relation = Self::new(RelationKind::BelongsToMany, target, foreign_key);
        relation.pivot = Some(pivot);
        relation
    }

    pub fn with_owner_key(mut self, owner_key: impl Into<String>) -> Self {
        self.owner_key = Some(owner_key.into());
        self
    }

    pub fn with_morph_type(mut self, morph_type: impl Into<String>) -> Self {
        self.morph_type = Some(morph_type.into());
        self
    }

    pub fn cardinality(&self) -> Option<Cardinality> {
        self.kind.cardinality()
    }
}
