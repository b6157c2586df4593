//! MongoDB database wrapper.

use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::info;

/// Database wrapper for MongoDB operations.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if connection fails.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        Ok(Self {
            db: client.database(db_name),
        })
    }

    /// Get a typed collection from the database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Create the indexes lookups rely on. Idempotent.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let unique = IndexOptions::builder().unique(true).build();

        self.db
            .collection::<mongodb::bson::Document>("categories")
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "category_id": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await?;
        self.db
            .collection::<mongodb::bson::Document>("categories")
            .create_index(IndexModel::builder().keys(doc! { "owner_id": 1 }).build())
            .await?;

        let connections = self.db.collection::<mongodb::bson::Document>("vk_connections");
        connections
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "telegram_user_id": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;
        connections
            .create_index(IndexModel::builder().keys(doc! { "accounts.vk_user_id": 1 }).build())
            .await?;

        info!("MongoDB indexes ensured");
        Ok(())
    }
}
