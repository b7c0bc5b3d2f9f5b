//! Conversion API.

use std::collections::BTreeMap;

use converto_archive::{ArchiveMerger, ArchivePart, CollisionPolicy, MergeSummary};
use futures::future::try_join_all;

use crate::client::ConvertoClient;
use crate::error::{Error, Result};
use crate::types::{ConvertCategory, ConvertJob, ConvertRequest};

/// Merged output of a conversion batch.
#[derive(Debug, Clone)]
pub struct ConvertOutput {
    /// A single zip holding every converted file.
    pub archive: Vec<u8>,
    pub summary: MergeSummary,
}

/// Conversion API client.
pub struct ConvertApi {
    client: ConvertoClient,
    merger: ArchiveMerger,
}

impl ConvertApi {
    pub(crate) fn new(client: ConvertoClient) -> Self {
        Self {
            client,
            merger: ArchiveMerger::new(),
        }
    }

    /// How name clashes between converted files are resolved.
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.merger = ArchiveMerger::with_collision_policy(policy);
        self
    }

    /// Convert a batch of files.
    ///
    /// Jobs are grouped by converter category and target format; each group
    /// is one backend request and all groups run concurrently. The results
    /// are flattened into one zip. Any failed group fails the batch.
    pub async fn convert(&self, jobs: &[ConvertJob]) -> Result<ConvertOutput> {
        if jobs.is_empty() {
            return Err(Error::Config("no files to convert".to_string()));
        }

        let groups = group_jobs(jobs);
        tracing::info!(files = jobs.len(), groups = groups.len(), "Converting files");

        let parts = try_join_all(
            groups
                .into_iter()
                .map(|((category, format), paths)| self.convert_group(category, format, paths)),
        )
        .await?;

        let (archive, summary) = self.merger.merge_with_summary(&parts)?;
        if summary.fallbacks() > 0 {
            tracing::warn!(
                fallbacks = summary.fallbacks(),
                "Some results were unreadable archives and were kept as files"
            );
        }
        Ok(ConvertOutput { archive, summary })
    }

    /// Convert one group of inputs that share a category and target format.
    pub async fn convert_group(
        &self,
        category: ConvertCategory,
        output_format: String,
        input_paths: Vec<String>,
    ) -> Result<ArchivePart> {
        let path = format!("convert_to/{}", category);
        tracing::debug!(%category, format = %output_format, files = input_paths.len(), "Converting group");

        let body = ConvertRequest {
            input_paths,
            output_format,
        };
        let download = self.client.post_for_download(&path, &body).await?;
        let file_name = download
            .file_name
            .unwrap_or_else(|| format!("file_{}.{}", uuid::Uuid::new_v4(), body.output_format));
        Ok(ArchivePart::new(file_name, download.data))
    }
}

fn group_jobs(jobs: &[ConvertJob]) -> BTreeMap<(ConvertCategory, String), Vec<String>> {
    let mut groups: BTreeMap<(ConvertCategory, String), Vec<String>> = BTreeMap::new();
    for job in jobs {
        groups
            .entry((job.category(), job.normalized_format()))
            .or_default()
            .push(job.input_path.clone());
    }
    groups
}
