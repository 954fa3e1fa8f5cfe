
use crate::data_types::cluster_record::{ClusterRecord, SampleClusters};
use crate::data_types::haplotypes::HaplotypeCall;
use crate::haplotype_caller::HaplotypeCaller;
use crate::sequence_alignment::AlignmentError;

use log::{debug, trace, warn};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TallyError {
    #[error("sample {sample_name:?} has more passed-QC reads ({passed_qc_reads}) than total reads ({total_reads})")]
    ReadCountMismatch { sample_name: String, total_reads: u64, passed_qc_reads: u64 },
    #[error("failed to call haplotype for sample {sample_name:?}, cluster {cluster_id:?}: {source}")]
    Alignment { sample_name: String, cluster_id: String, source: AlignmentError }
}

/// The two read counts that come from outside of pbaa cluster files
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SampleReadCounts {
    /// All reads sequenced for the sample
    pub total_reads: u64,
    /// Reads that made it into clustering
    pub passed_qc_reads: u64
}

/// Read accounting for a single sample
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SampleTally {
    /// The sample name
    sample_name: String,
    /// All reads sequenced for the sample
    total_reads: u64,
    /// Reads that never made it into clustering
    failed_qc: u64,
    /// Reads in clusters from the failed set; these are also counted in a haplotype or `failed_haplotyping`
    failed_filters: u64,
    /// Reads in clusters without a recognized haplotype
    failed_haplotyping: u64,
    /// Reads per haplotype, same order as the vocabulary
    haplotype_counts: Vec<u64>
}

impl SampleTally {
    /// Creates an empty tally for a sample
    /// # Arguments
    /// * `sample_name` - the sample name
    /// * `read_counts` - total and passed-QC read counts
    /// * `num_haplotypes` - the size of the vocabulary
    /// # Errors
    /// * if there are more passed-QC reads than total reads
    pub fn new(sample_name: &str, read_counts: SampleReadCounts, num_haplotypes: usize) -> Result<SampleTally, TallyError> {
        let failed_qc: u64 = read_counts.total_reads.checked_sub(read_counts.passed_qc_reads)
            .ok_or_else(|| TallyError::ReadCountMismatch {
                sample_name: sample_name.to_string(),
                total_reads: read_counts.total_reads,
                passed_qc_reads: read_counts.passed_qc_reads
            })?;
        Ok(SampleTally {
            sample_name: sample_name.to_string(),
            total_reads: read_counts.total_reads,
            failed_qc,
            failed_filters: 0,
            failed_haplotyping: 0,
            haplotype_counts: vec![0; num_haplotypes]
        })
    }

    /// Adds one classified cluster.
    /// Clusters from the failed set count toward `failed_filters` AND toward their haplotype (or `failed_haplotyping`).
    /// # Arguments
    /// * `cluster` - the cluster record
    /// * `call` - the haplotype call for the cluster sequence
    pub fn add_cluster(&mut self, cluster: &ClusterRecord, call: &HaplotypeCall) {
        if !cluster.passed_filter {
            self.failed_filters += cluster.read_count;
        }
        match call {
            HaplotypeCall::Recognized { index, .. } => {
                self.haplotype_counts[*index] += cluster.read_count;
            },
            HaplotypeCall::Unrecognized(_) |
            HaplotypeCall::Indeterminate => {
                self.failed_haplotyping += cluster.read_count;
            }
        };
    }

    pub fn sample_name(&self) -> &str {
        &self.sample_name
    }

    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    pub fn failed_qc(&self) -> u64 {
        self.failed_qc
    }

    pub fn failed_filters(&self) -> u64 {
        self.failed_filters
    }

    pub fn failed_haplotyping(&self) -> u64 {
        self.failed_haplotyping
    }

    pub fn haplotype_counts(&self) -> &[u64] {
        &self.haplotype_counts
    }

    /// Every read that was placed into either a haplotype or `failed_haplotyping`
    pub fn classified_reads(&self) -> u64 {
        self.failed_haplotyping + self.haplotype_counts.iter().sum::<u64>()
    }
}

/// One cluster's haplotype assignment, `haplotype` is None for anything not in the vocabulary
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterAssignment {
    pub sample_name: String,
    pub cluster_id: String,
    pub haplotype: Option<String>
}

/// Everything produced for one sample
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SampleResult {
    /// The finished read accounting
    pub tally: SampleTally,
    /// One entry per cluster, passed clusters first
    pub assignments: Vec<ClusterAssignment>
}

/// Classifies every cluster of a sample and accumulates the read counts.
/// # Arguments
/// * `caller` - the haplotype caller
/// * `sample_name` - the sample being processed
/// * `read_counts` - the total and passed-QC read counts for the sample
/// * `clusters` - the passed and failed clusters for the sample
/// # Errors
/// * if the read counts are inconsistent
/// * if any cluster sequence contains invalid symbols
pub fn tally_sample(
    caller: &HaplotypeCaller, sample_name: &str, read_counts: SampleReadCounts, clusters: &SampleClusters
) -> Result<SampleResult, TallyError> {
    let num_haplotypes: usize = caller.config().vocabulary().len();
    let mut tally = SampleTally::new(sample_name, read_counts, num_haplotypes)?;
    let mut assignments: Vec<ClusterAssignment> = Vec::with_capacity(clusters.len());

    for cluster in clusters.iter() {
        let call: HaplotypeCall = caller.classify(&cluster.sequence)
            .map_err(|source| TallyError::Alignment {
                sample_name: sample_name.to_string(),
                cluster_id: cluster.cluster_id.clone(),
                source
            })?;
        trace!("{} cluster {} (reads={}, freq={}, passed={}, chimeric={}): {:?}",
            sample_name, cluster.cluster_id, cluster.read_count, cluster.cluster_frequency,
            cluster.passed_filter, cluster.possibly_chimeric, call
        );
        if cluster.possibly_chimeric && cluster.passed_filter {
            debug!("{} cluster {} is flagged as possibly chimeric", sample_name, cluster.cluster_id);
        }

        tally.add_cluster(cluster, &call);
        assignments.push(ClusterAssignment {
            sample_name: sample_name.to_string(),
            cluster_id: cluster.cluster_id.clone(),
            haplotype: call.haplotype().map(|h| h.to_string())
        });
    }

    // the cluster read counts should add up to the passed-QC reads
    let cluster_reads: u64 = tally.classified_reads();
    if cluster_reads != read_counts.passed_qc_reads {
        warn!("{}: clusters contain {} reads, but {} reads passed QC", sample_name, cluster_reads, read_counts.passed_qc_reads);
    }

    debug!("{}: total={}, failed_qc={}, failed_filters={}, failed_haplotyping={}, haplotypes={:?}",
        sample_name, tally.total_reads, tally.failed_qc, tally.failed_filters, tally.failed_haplotyping, tally.haplotype_counts
    );

    Ok(SampleResult {
        tally,
        assignments
    })
}
