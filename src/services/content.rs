use crate::{
    error::{AppError, AppResult},
    models::{comment, post, Comment, CommentModel, ContentRef, ContentType, Post, PostModel},
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Filter for the moderated content listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentFilter {
    pub content_type: Option<ContentType>,
    pub shadowbanned: Option<bool>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContentItem {
    pub content_type: ContentType,
    pub id: i32,
    pub user_id: Option<i32>,
    pub excerpt: String,
    pub visible: bool,
    pub shadowbanned: bool,
    pub shadowbanned_reason: Option<String>,
    pub shadowbanned_at: Option<String>,
    pub created_at: String,
}

const EXCERPT_CHARS: usize = 140;

fn excerpt(content: &str) -> String {
    content.chars().take(EXCERPT_CHARS).collect()
}

impl From<PostModel> for ContentItem {
    fn from(p: PostModel) -> Self {
        Self {
            content_type: ContentType::Post,
            id: p.id,
            user_id: p.user_id,
            excerpt: excerpt(&p.content),
            visible: p.published && !p.shadowbanned,
            shadowbanned: p.shadowbanned,
            shadowbanned_reason: p.shadowbanned_reason,
            shadowbanned_at: p.shadowbanned_at.map(|t| t.to_string()),
            created_at: p.created_at.to_string(),
        }
    }
}

impl From<CommentModel> for ContentItem {
    fn from(c: CommentModel) -> Self {
        Self {
            content_type: ContentType::Comment,
            id: c.id,
            user_id: c.user_id,
            excerpt: excerpt(&c.content),
            visible: !c.hidden,
            shadowbanned: c.hidden,
            shadowbanned_reason: c.shadowbanned_reason,
            shadowbanned_at: c.shadowbanned_at.map(|t| t.to_string()),
            created_at: c.created_at.to_string(),
        }
    }
}

/// Read access to the content store.
pub struct ContentService {
    db: DatabaseConnection,
}

impl ContentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Owner of the referenced item, `NotFound` when the row is gone.
    pub async fn owner_of(&self, content: ContentRef) -> AppResult<Option<i32>> {
        match content.content_type {
            ContentType::Post => Post::find_by_id(content.content_id)
                .one(&self.db)
                .await?
                .map(|p| p.user_id)
                .ok_or(AppError::NotFound),
            ContentType::Comment => Comment::find_by_id(content.content_id)
                .one(&self.db)
                .await?
                .map(|c| c.user_id)
                .ok_or(AppError::NotFound),
        }
    }

    pub async fn list(
        &self,
        filter: ContentFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ContentItem>, u64)> {
        match filter.content_type.unwrap_or(ContentType::Post) {
            ContentType::Post => {
                let mut query = Post::find();
                if let Some(flag) = filter.shadowbanned {
                    query = query.filter(post::Column::Shadowbanned.eq(flag));
                }
                if let Some(visible) = filter.visible {
                    query = if visible {
                        query
                            .filter(post::Column::Published.eq(true))
                            .filter(post::Column::Shadowbanned.eq(false))
                    } else {
                        query.filter(
                            sea_orm::Condition::any()
                                .add(post::Column::Published.eq(false))
                                .add(post::Column::Shadowbanned.eq(true)),
                        )
                    };
                }

                let paginator = query
                    .order_by_desc(post::Column::CreatedAt)
                    .order_by_desc(post::Column::Id)
                    .paginate(&self.db, per_page);
                let total = paginator.num_items().await?;
                let posts = paginator.fetch_page(page.saturating_sub(1)).await?;
                Ok((posts.into_iter().map(ContentItem::from).collect(), total))
            }
            ContentType::Comment => {
                let mut query = Comment::find();
                // Comments carry a single flag for both notions.
                if let Some(flag) = filter.shadowbanned {
                    query = query.filter(comment::Column::Hidden.eq(flag));
                }
                if let Some(visible) = filter.visible {
                    query = query.filter(comment::Column::Hidden.eq(!visible));
                }

                let paginator = query
                    .order_by_desc(comment::Column::CreatedAt)
                    .order_by_desc(comment::Column::Id)
                    .paginate(&self.db, per_page);
                let total = paginator.num_items().await?;
                let comments = paginator.fetch_page(page.saturating_sub(1)).await?;
                Ok((comments.into_iter().map(ContentItem::from).collect(), total))
            }
        }
    }
}
