//! `find` command

use super::{
    connection_manager, load_or_report, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR, EXIT_FATAL,
};
use crate::adapters::store::QueryOptions;
use crate::core::repository::Repository;
use crate::domain::RepositoryError;
use clap::Args;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document};

/// Arguments for the find command
#[derive(Args, Debug)]
pub struct FindArgs {
    /// Collection to query; defaults to `store.collection_name`
    #[arg(long)]
    pub collection: Option<String>,

    /// Filter as a JSON object (extended JSON accepted)
    #[arg(long, default_value = "{}")]
    pub filter: String,

    /// Sort specification as a JSON object, e.g. {"created":-1}
    #[arg(long)]
    pub sort: Option<String>,

    /// Maximum number of documents to print
    #[arg(long)]
    pub limit: Option<i64>,
}

/// Parses a JSON object into a BSON document
pub fn parse_document(json: &str) -> Result<Document, String> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("invalid JSON: {e}"))?;
    match Bson::try_from(value).map_err(|e| format!("invalid extended JSON: {e}"))? {
        Bson::Document(document) => Ok(document),
        other => Err(format!("expected a JSON object, got {other}")),
    }
}

impl FindArgs {
    /// Execute the find command
    pub async fn execute(&self, config_path: &str, dry_run: bool) -> anyhow::Result<i32> {
        let Some(config) = load_or_report(config_path) else {
            return Ok(EXIT_CONFIG_ERROR);
        };

        let Some(collection) = self
            .collection
            .clone()
            .or_else(|| config.store.collection_name.clone())
        else {
            println!("❌ No collection given and store.collection_name is not set");
            return Ok(EXIT_CONFIG_ERROR);
        };

        let mut options = QueryOptions::new();
        let filter = match parse_document(&self.filter) {
            Ok(filter) => filter,
            Err(e) => {
                println!("❌ Invalid --filter: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };
        if let Some(ref sort) = self.sort {
            match parse_document(sort) {
                Ok(spec) => options = options.sort(spec),
                Err(e) => {
                    println!("❌ Invalid --sort: {e}");
                    return Ok(EXIT_CONFIG_ERROR);
                }
            }
        }
        if let Some(limit) = self.limit {
            options = options.limit(limit);
        }

        let manager = connection_manager(&config, dry_run);
        let repository: Repository<Document> =
            Repository::from_config(manager.clone(), &config).with_collection(collection);

        let outcome = print_matches(&repository, filter, options).await;
        manager.dispose().await;

        match outcome {
            Ok(count) => {
                tracing::info!(collection = %repository.collection(), count = count, "Find completed");
                Ok(0)
            }
            Err(e @ RepositoryError::Connection(_)) => {
                println!("❌ Failed to connect: {e}");
                Ok(EXIT_CONNECTION_ERROR)
            }
            Err(e) => {
                crate::log_error_with_context!(e, "Find failed");
                println!("❌ Query failed: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }
}

async fn print_matches(
    repository: &Repository<Document>,
    filter: Document,
    options: QueryOptions,
) -> crate::domain::Result<usize> {
    let mut stream = repository.stream_with(filter, options).await?;
    let mut count = 0;
    while let Some(document) = stream.try_next().await? {
        let json = Bson::Document(document).into_relaxed_extjson();
        println!("{json}");
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let filter = parse_document(r#"{"status":"open","n":{"$gt":2}}"#).unwrap();
        assert_eq!(filter.get_str("status").unwrap(), "open");
        assert!(filter.get_document("n").unwrap().contains_key("$gt"));

        let sort = parse_document(r#"{"created":-1}"#).unwrap();
        assert_eq!(sort.keys().collect::<Vec<_>>(), vec!["created"]);
    }

    #[test]
    fn test_parse_document_rejects_non_object() {
        assert!(parse_document("[1,2]").is_err());
        assert!(parse_document("not json").is_err());
    }
}
