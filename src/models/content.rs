use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[sea_orm(string_value = "post")]
    Post,
    #[sea_orm(string_value = "comment")]
    Comment,
}

/// A reference to a post or comment living in the content store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentRef {
    pub content_type: ContentType,
    pub content_id: i32,
}

impl ContentRef {
    pub fn new(content_type: ContentType, content_id: i32) -> Self {
        Self {
            content_type,
            content_id,
        }
    }

    /// Build a reference from the nullable column pair stored on ledger rows.
    pub fn from_columns(
        content_type: Option<ContentType>,
        content_id: Option<i32>,
    ) -> Option<Self> {
        Some(Self::new(content_type?, content_id?))
    }
}
