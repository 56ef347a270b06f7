use mongodb::{Client, Database, IndexModel};
use mongodb::bson::doc;
use mongodb::options::{Collation, CollationStrength, IndexOptions};
use rocket::fairing::AdHoc;

pub fn init() -> AdHoc {
    AdHoc::on_ignite("MongoDB", |rocket| async {
        match connect().await {
            Ok(database) => {
                info!("✓ MongoDB connected successfully");
                if let Err(e) = ensure_indexes(&database).await {
                    error!("✗ Failed to create indexes: {}", e);
                }
                rocket.manage(database)
            }
            Err(e) => {
                error!("✗ Failed to connect to MongoDB: {}", e);
                rocket
            }
        }
    })
}

async fn connect() -> Result<Database, mongodb::error::Error> {
    let uri = crate::config::Config::mongodb_uri();
    let client = Client::with_uri_str(&uri).await?;

    // Test connection
    client
        .database("admin")
        .run_command(doc! {"ping": 1}, None)
        .await?;

    Ok(client.database(&crate::config::Config::database_name()))
}

/// Uniqueness invariants live in the store, not in handler code: a
/// check-then-insert in a handler would race two identical requests
/// into both succeeding.
async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Case-insensitive unique email, across deleted and live users alike.
    let email_index = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(
            IndexOptions::builder()
                .unique(true)
                .collation(
                    Collation::builder()
                        .locale("en")
                        .strength(CollationStrength::Secondary)
                        .build(),
                )
                .build(),
        )
        .build();
    db.collection::<mongodb::bson::Document>("users")
        .create_index(email_index, None)
        .await?;

    // Company names are stored pre-normalized (lowercase).
    let company_name_index = IndexModel::builder()
        .keys(doc! { "name": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    db.collection::<mongodb::bson::Document>("companies")
        .create_index(company_name_index, None)
        .await?;

    // One application per (job, candidate) pair.
    let application_index = IndexModel::builder()
        .keys(doc! { "job": 1, "candidate": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    db.collection::<mongodb::bson::Document>("applications")
        .create_index(application_index, None)
        .await?;

    Ok(())
}

pub type DbConn = Database;
