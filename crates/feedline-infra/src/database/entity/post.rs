//! Post entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use feedline_core::domain::{Post, PostOwner};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub author_id: Option<i64>,
    pub project_id: Option<i64>,
    pub hashtags: Vec<String>,
    pub views: i64,
    pub published: bool,
    pub deleted: bool,
    pub verified: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub published_at: Option<DateTimeWithTimeZone>,
    pub scheduled_at: Option<DateTimeWithTimeZone>,
    pub verified_date: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Post {
    fn from(model: Model) -> Self {
        // The posts_owner_check constraint guarantees exactly one reference.
        let owner = match (model.author_id, model.project_id) {
            (None, Some(project_id)) => PostOwner::Project(project_id),
            (author_id, _) => PostOwner::Author(author_id.unwrap_or_default()),
        };
        Self {
            id: model.id,
            content: model.content,
            owner,
            hashtags: model.hashtags,
            views: model.views,
            published: model.published,
            deleted: model.deleted,
            verified: model.verified,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            published_at: model.published_at.map(Into::into),
            scheduled_at: model.scheduled_at.map(Into::into),
            verified_date: model.verified_date.map(Into::into),
        }
    }
}

impl From<Post> for ActiveModel {
    fn from(post: Post) -> Self {
        Self {
            id: Set(post.id),
            content: Set(post.content),
            author_id: Set(post.owner.author_id()),
            project_id: Set(post.owner.project_id()),
            hashtags: Set(post.hashtags),
            views: Set(post.views),
            published: Set(post.published),
            deleted: Set(post.deleted),
            verified: Set(post.verified),
            created_at: Set(post.created_at.into()),
            updated_at: Set(post.updated_at.into()),
            published_at: Set(post.published_at.map(Into::into)),
            scheduled_at: Set(post.scheduled_at.map(Into::into)),
            verified_date: Set(post.verified_date.map(Into::into)),
        }
    }
}
