use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use super::store::{duplicate_email, JobStore, Store, UserStore};
use crate::models::{Job, JobChanges, JobFilter, JobPage, JobSort, User};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for jobs-service");

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            )
            .build();

        self.users()
            .create_index(email_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create email index on users collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on users.email");

        let owner_index = IndexModel::builder()
            .keys(doc! { "owner_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("owner_created_lookup".to_string())
                    .build(),
            )
            .build();

        self.jobs()
            .create_index(owner_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create owner index on jobs collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on jobs.(owner_id, created_at)");

        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn jobs(&self) -> Collection<Job> {
        self.db.collection("jobs")
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY_CODE
    )
}

fn list_query(owner_id: &str, filter: &JobFilter) -> Document {
    let mut query = doc! { "owner_id": owner_id };
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(search) = filter.search.as_deref() {
        query.insert(
            "title",
            doc! { "$regex": regex::escape(search), "$options": "i" },
        );
    }
    query
}

fn sort_document(sort: JobSort) -> Document {
    match sort {
        JobSort::Latest => doc! { "created_at": -1 },
        JobSort::Oldest => doc! { "created_at": 1 },
        JobSort::TitleAsc => doc! { "title": 1 },
        JobSort::TitleDesc => doc! { "title": -1 },
    }
}

fn set_document(changes: &JobChanges) -> Document {
    let mut set = doc! { "updated_at": BsonDateTime::from_chrono(Utc::now()) };
    if let Some(title) = &changes.title {
        set.insert("title", title.as_str());
    }
    if let Some(company) = &changes.company {
        set.insert("company", company.as_str());
    }
    if let Some(status) = changes.status {
        set.insert("status", Bson::String(status.as_str().to_string()));
    }
    set
}

#[async_trait]
impl UserStore for MongoDb {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match self.users().insert_one(user, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(duplicate_email()),
            Err(e) => {
                tracing::error!("Failed to insert user: {}", e);
                Err(AppError::from(e))
            }
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.users()
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(AppError::from)
    }
}

#[async_trait]
impl JobStore for MongoDb {
    async fn insert_job(&self, job: &Job) -> Result<(), AppError> {
        self.jobs().insert_one(job, None).await.map_err(|e| {
            tracing::error!("Failed to insert job: {}", e);
            AppError::from(e)
        })?;
        Ok(())
    }

    async fn list_jobs(&self, owner_id: &str, filter: &JobFilter) -> Result<JobPage, AppError> {
        let query = list_query(owner_id, filter);

        let total = self.jobs().count_documents(query.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(sort_document(filter.sort))
            .skip(filter.skip())
            .limit(filter.limit as i64)
            .build();

        let jobs: Vec<Job> = self
            .jobs()
            .find(query, options)
            .await?
            .try_collect()
            .await?;

        Ok(JobPage { jobs, total })
    }

    async fn find_job(&self, id: &str, owner_id: &str) -> Result<Option<Job>, AppError> {
        self.jobs()
            .find_one(doc! { "_id": id, "owner_id": owner_id }, None)
            .await
            .map_err(AppError::from)
    }

    async fn update_job(
        &self,
        id: &str,
        owner_id: &str,
        changes: &JobChanges,
    ) -> Result<Option<Job>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.jobs()
            .find_one_and_update(
                doc! { "_id": id, "owner_id": owner_id },
                doc! { "$set": set_document(changes) },
                options,
            )
            .await
            .map_err(AppError::from)
    }

    async fn delete_job(&self, id: &str, owner_id: &str) -> Result<bool, AppError> {
        let result = self
            .jobs()
            .delete_one(doc! { "_id": id, "owner_id": owner_id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl Store for MongoDb {
    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;

    #[test]
    fn search_is_escaped_and_case_insensitive() {
        let filter = JobFilter {
            search: Some("c++ (senior)".to_string()),
            status: Some(JobStatus::Declined),
            ..Default::default()
        };
        let query = list_query("owner", &filter);

        assert_eq!(query.get_str("owner_id").unwrap(), "owner");
        assert_eq!(query.get_str("status").unwrap(), "declined");
        let title = query.get_document("title").unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), r"c\+\+ \(senior\)");
        assert_eq!(title.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn set_document_only_touches_given_fields() {
        let set = set_document(&JobChanges {
            company: Some("Acme".to_string()),
            ..Default::default()
        });
        assert_eq!(set.get_str("company").unwrap(), "Acme");
        assert!(set.get("title").is_none());
        assert!(set.get("updated_at").is_some());
    }
}
