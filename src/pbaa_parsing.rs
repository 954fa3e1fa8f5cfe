
use crate::cluster_tally::SampleReadCounts;
use crate::data_types::cluster_record::{ClusterRecord, SampleClusters};

use bio::io::fasta;
use log::{debug, trace};
use simple_error::bail;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// All the per-sample input files from pbaa and the FASTQ index
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SampleInputPaths {
    /// Clusters that passed the pbaa filters
    pub passed_clusters: PathBuf,
    /// Clusters that failed the pbaa filters
    pub failed_clusters: PathBuf,
    /// pbaa read tracking file, one line per read that entered clustering
    pub read_info: PathBuf,
    /// FASTQ index, one line per sequenced read
    pub fastq_index: PathBuf
}

impl SampleInputPaths {
    /// Builds the expected file layout for a sample
    /// # Arguments
    /// * `pbaa_dir` - the pbaa results folder, one sub-folder per sample
    /// * `fastq_dir` - the folder with `<sample>.fastq.fai` files
    /// * `sample_name` - the sample name
    pub fn new(pbaa_dir: &Path, fastq_dir: &Path, sample_name: &str) -> SampleInputPaths {
        let sample_dir: PathBuf = pbaa_dir.join(sample_name);
        SampleInputPaths {
            passed_clusters: sample_dir.join(format!("{sample_name}_passed_cluster_sequences.fasta")),
            failed_clusters: sample_dir.join(format!("{sample_name}_failed_cluster_sequences.fasta")),
            read_info: sample_dir.join(format!("{sample_name}_read_info.txt")),
            fastq_index: fastq_dir.join(format!("{sample_name}.fastq.fai"))
        }
    }

    /// Makes sure every input file is present
    /// # Errors
    /// * if any of the files does not exist
    pub fn check_exists(&self) -> Result<(), Box<dyn std::error::Error>> {
        for path in [&self.passed_clusters, &self.failed_clusters, &self.read_info, &self.fastq_index] {
            if !path.is_file() {
                bail!("Required input file does not exist: {}", path.display());
            }
        }
        Ok(())
    }
}

/// Returns the sample names in a pbaa results folder, which is every sub-folder, sorted by name.
/// # Arguments
/// * `pbaa_dir` - the pbaa results folder
/// # Errors
/// * if the folder cannot be read
/// * if a sub-folder name is not valid UTF-8
pub fn get_pbaa_samples(pbaa_dir: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut sample_names: Vec<String> = vec![];
    for entry in std::fs::read_dir(pbaa_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            trace!("Ignoring non-folder entry {:?}", entry.path());
            continue;
        }
        match entry.file_name().into_string() {
            Ok(s) => sample_names.push(s),
            Err(os_name) => bail!("Sample folder name is not valid UTF-8: {:?}", os_name)
        };
    }
    sample_names.sort();
    Ok(sample_names)
}

/// Counts the lines in a file, a final line without a newline still counts.
/// # Arguments
/// * `filename` - the file to count
/// # Errors
/// * if the file cannot be opened or read
pub fn count_lines(filename: &Path) -> Result<u64, Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(filename)?);
    let mut num_lines: u64 = 0;
    for line in reader.split(b'\n') {
        line?;
        num_lines += 1;
    }
    Ok(num_lines)
}

/// Loads all cluster records from a pbaa cluster FASTA file.
/// # Arguments
/// * `filename` - the FASTA file
/// * `sample_name` - the sample the clusters belong to
/// * `passed_filter` - true for the passed cluster file, false for the failed one
/// # Errors
/// * if the file cannot be opened or is not FASTA
/// * if any label is missing a required field
pub fn load_cluster_file(filename: &Path, sample_name: &str, passed_filter: bool) -> Result<Vec<ClusterRecord>, Box<dyn std::error::Error>> {
    let fasta_reader = fasta::Reader::new(File::open(filename)?);
    let mut clusters: Vec<ClusterRecord> = vec![];
    for entry in fasta_reader.records() {
        let record: fasta::Record = entry?;
        let label: String = match record.desc() {
            Some(desc) => format!("{} {}", record.id(), desc),
            None => record.id().to_string()
        };
        clusters.push(ClusterRecord::from_label(sample_name, &label, record.seq(), passed_filter)?);
    }
    debug!("Loaded {} clusters from {:?}", clusters.len(), filename);
    Ok(clusters)
}

/// Loads everything needed to tally one sample.
/// # Arguments
/// * `paths` - the sample input files
/// * `sample_name` - the sample name
/// # Errors
/// * if any file is missing or cannot be parsed
pub fn load_sample_inputs(paths: &SampleInputPaths, sample_name: &str) -> Result<(SampleReadCounts, SampleClusters), Box<dyn std::error::Error>> {
    paths.check_exists()?;
    let read_counts = SampleReadCounts {
        total_reads: count_lines(&paths.fastq_index)?,
        passed_qc_reads: count_lines(&paths.read_info)?
    };
    let clusters = SampleClusters {
        passed: load_cluster_file(&paths.passed_clusters, sample_name, true)?,
        failed: load_cluster_file(&paths.failed_clusters, sample_name, false)?
    };
    Ok((read_counts, clusters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_get_pbaa_samples() {
        let sample_names = get_pbaa_samples(Path::new("./test_data/pbaa")).unwrap();
        assert_eq!(sample_names, vec!["sampleA".to_string(), "sampleB".to_string()]);
    }

    #[test]
    fn test_sample_paths() {
        let paths = SampleInputPaths::new(Path::new("results/pbaa"), Path::new("results/fastq"), "s1");
        assert_eq!(paths.passed_clusters, PathBuf::from("results/pbaa/s1/s1_passed_cluster_sequences.fasta"));
        assert_eq!(paths.failed_clusters, PathBuf::from("results/pbaa/s1/s1_failed_cluster_sequences.fasta"));
        assert_eq!(paths.read_info, PathBuf::from("results/pbaa/s1/s1_read_info.txt"));
        assert_eq!(paths.fastq_index, PathBuf::from("results/fastq/s1.fastq.fai"));
        assert!(paths.check_exists().is_err());
    }

    #[test]
    fn test_count_lines() {
        let mut trailing = tempfile::NamedTempFile::new().unwrap();
        write!(trailing, "a\nb\nc\n").unwrap();
        trailing.flush().unwrap();
        assert_eq!(count_lines(trailing.path()).unwrap(), 3);

        let mut no_trailing = tempfile::NamedTempFile::new().unwrap();
        write!(no_trailing, "a\nb\nc").unwrap();
        no_trailing.flush().unwrap();
        assert_eq!(count_lines(no_trailing.path()).unwrap(), 3);

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(count_lines(empty.path()).unwrap(), 0);
    }

    #[test]
    fn test_load_sample_inputs() {
        let paths = SampleInputPaths::new(Path::new("./test_data/pbaa"), Path::new("./test_data/fastq"), "sampleA");
        let (read_counts, clusters) = load_sample_inputs(&paths, "sampleA").unwrap();
        assert_eq!(read_counts, SampleReadCounts { total_reads: 12, passed_qc_reads: 10 });

        assert_eq!(clusters.passed.len(), 2);
        assert_eq!(clusters.failed.len(), 1);
        assert!(clusters.passed.iter().all(|c| c.passed_filter && c.sample_name == "sampleA"));
        assert!(!clusters.failed[0].passed_filter);

        let ids: Vec<&str> = clusters.iter().map(|c| c.cluster_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert_eq!(clusters.total_read_count(), 10);
        assert_eq!(clusters.failed[0].sequence, b"NNNNNNNNNN".to_vec());
        assert!(clusters.passed[1].possibly_chimeric);
    }

    #[test]
    fn test_bad_label() {
        let mut fasta = tempfile::NamedTempFile::new().unwrap();
        writeln!(fasta, ">s_cluster-0 cluster_freq:1.0\nACGT").unwrap();
        fasta.flush().unwrap();
        let result = load_cluster_file(fasta.path(), "s", true);
        assert!(result.is_err());
    }
}
