//! Saved analyses: the source image in object storage, the result in SQLite.

pub mod db;
pub mod objects;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::material::Material;

pub use db::Database;
pub use objects::{ObjectStore, UrlSigner};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAnalysis {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_path: String,
    pub materials: Vec<Material>,
    pub overall_analysis: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Database calls run on tokio's blocking pool: SQLite statements (and the
/// WAL fsync on commit) must not stall the workers serving analysis requests.
pub struct Persistence {
    pub db: Arc<Database>,
    pub objects: ObjectStore,
    pub signer: UrlSigner,
}

impl Persistence {
    /// Stores the image first so a row never points at a missing object.
    pub async fn save(
        &self,
        user_id: Uuid,
        image_data_url: &str,
        materials: Vec<Material>,
        overall_analysis: Option<String>,
    ) -> Result<SavedAnalysis> {
        let jpeg = objects::decode_to_jpeg(image_data_url)?;
        let image_path = self.objects.put_jpeg(user_id, &jpeg).await?;

        let analysis = SavedAnalysis {
            id: Uuid::new_v4(),
            user_id,
            image_path: image_path.clone(),
            materials,
            overall_analysis,
            created_at: Utc::now(),
            image_url: None,
        };

        let analysis = match self
            .blocking(move |db| db.insert(&analysis).map(|()| analysis))
            .await
        {
            Ok(analysis) => analysis,
            Err(err) => {
                if let Err(cleanup) = self.objects.remove(&image_path).await {
                    tracing::error!(
                        path = %image_path,
                        error = %cleanup,
                        "orphaned object after failed insert"
                    );
                }
                return Err(err);
            }
        };

        tracing::info!(id = %analysis.id, user = %user_id, "analysis saved");
        Ok(self.with_signed_url(analysis))
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<SavedAnalysis>> {
        let rows = self.blocking(move |db| db.list(user_id)).await?;
        Ok(rows.into_iter().map(|a| self.with_signed_url(a)).collect())
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<SavedAnalysis> {
        self.blocking(move |db| db.get(user_id, id))
            .await?
            .ok_or_else(|| AppError::NotFound("Analysis".into()))
    }

    /// Removes the stored image, then the row.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let analysis = self.get(user_id, id).await?;
        self.objects.remove(&analysis.image_path).await?;
        self.blocking(move |db| db.delete(user_id, id)).await?;
        tracing::info!(id = %id, user = %user_id, "analysis deleted");
        Ok(())
    }

    /// Object bytes for a signed download link.
    pub async fn signed_object(&self, path: &str, expires: i64, token: &str) -> Result<Vec<u8>> {
        if !self.signer.verify(path, expires, token) {
            return Err(AppError::Forbidden);
        }
        self.objects.get(path).await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    fn with_signed_url(&self, mut analysis: SavedAnalysis) -> SavedAnalysis {
        analysis.image_url = Some(self.signer.signed_url(&analysis.image_path));
        analysis
    }
}
