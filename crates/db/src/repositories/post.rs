//! Post repository for database operations.
//!
//! Implements the post store using SeaORM.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use crate::entities::posts;
use picshare_core::post::{NewPost, Post, PostChanges, PostError, PostRepository as PostRepoTrait};
use picshare_shared::PostId;

/// Post repository implementation.
#[derive(Debug, Clone)]
pub struct PostRepository {
    db: DatabaseConnection,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: PostId) -> Result<Option<posts::Model>, PostError> {
        posts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(|e| PostError::repository(e.to_string()))
    }
}

#[async_trait]
impl PostRepoTrait for PostRepository {
    async fn create(&self, input: NewPost) -> Result<Post, PostError> {
        let now = Utc::now();
        let active_model = posts::ActiveModel {
            id: Set(PostId::new().into_inner()),
            name: Set(input.name),
            caption: Set(input.caption),
            photo: Set(input.photo),
            photo_public_id: Set(input.photo_public_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| PostError::repository(e.to_string()))?;

        Ok(to_domain(model))
    }

    async fn list(&self) -> Result<Vec<Post>, PostError> {
        let models = posts::Entity::find()
            .order_by_asc(posts::Column::CreatedAt)
            .order_by_asc(posts::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| PostError::repository(e.to_string()))?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostError> {
        Ok(self.find_model(id).await?.map(to_domain))
    }

    async fn update(&self, id: PostId, changes: PostChanges) -> Result<Option<Post>, PostError> {
        let Some(model) = self.find_model(id).await? else {
            return Ok(None);
        };

        let mut active_model = model.into_active_model();
        active_model.name = Set(changes.name);
        active_model.caption = Set(changes.caption);
        active_model.updated_at = Set(Utc::now().into());

        let model = active_model
            .update(&self.db)
            .await
            .map_err(|e| PostError::repository(e.to_string()))?;

        Ok(Some(to_domain(model)))
    }

    async fn delete(&self, id: PostId) -> Result<Option<Post>, PostError> {
        let Some(model) = self.find_model(id).await? else {
            return Ok(None);
        };

        let result = posts::Entity::delete_many()
            .filter(posts::Column::Id.eq(id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(|e| PostError::repository(e.to_string()))?;

        if result.rows_affected == 0 {
            debug!(post_id = %id, "Post removed by a concurrent delete");
            return Ok(None);
        }

        Ok(Some(to_domain(model)))
    }
}

/// Convert database model to domain post.
fn to_domain(model: posts::Model) -> Post {
    Post {
        id: PostId::from_uuid(model.id),
        name: model.name,
        caption: model.caption,
        photo: model.photo,
        photo_public_id: model.photo_public_id,
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    }
}
