
use crate::cluster_tally::{SampleResult, tally_sample};
use crate::haplotype_caller::{HaplotypeCaller, HaplotypeConfig};
use crate::pbaa_parsing::{SampleInputPaths, load_sample_inputs};

use log::debug;
use std::path::Path;

/// Loads the pbaa outputs for one sample, calls every cluster, and tallies the reads.
/// # Arguments
/// * `config` - the run configuration
/// * `pbaa_dir` - the pbaa results folder
/// * `fastq_dir` - the folder with FASTQ index files
/// * `sample_name` - the sample to process
/// # Errors
/// * if any input file is missing or malformed
/// * if the read counts are inconsistent or a cluster sequence is invalid
pub fn process_sample(
    config: &HaplotypeConfig, pbaa_dir: &Path, fastq_dir: &Path, sample_name: &str
) -> Result<SampleResult, Box<dyn std::error::Error>> {
    let paths = SampleInputPaths::new(pbaa_dir, fastq_dir, sample_name);
    debug!("{}: loading inputs {:?}", sample_name, paths);
    let (read_counts, clusters) = load_sample_inputs(&paths, sample_name)?;
    debug!("{}: {} passed clusters, {} failed clusters, {:?}", sample_name, clusters.passed.len(), clusters.failed.len(), read_counts);

    let caller = HaplotypeCaller::new(config);
    let result: SampleResult = tally_sample(&caller, sample_name, read_counts, &clusters)?;
    Ok(result)
}
