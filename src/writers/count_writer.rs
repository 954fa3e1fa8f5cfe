
use std::fs::File;
use std::path::Path;

use crate::cluster_tally::SampleTally;

/// Writes the per-sample read accounting table.
/// The haplotype columns depend on the configured vocabulary, so rows are written as raw records.
pub struct CountWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>,
    /// Number of haplotype columns, each row must match
    num_haplotypes: usize
}

impl CountWriter {
    /// Creates a new writer for a given filename, the header is written immediately
    /// # Arguments
    /// * `filename` - the path to write the counts to
    /// * `haplotypes` - the vocabulary in column order
    pub fn new(filename: &Path, haplotypes: &[String]) -> csv::Result<CountWriter> {
        let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(b',')
            .has_headers(false)
            .from_path(filename)?;

        let mut header: Vec<String> = ["sample_name", "total_reads", "failed_qc", "failed_filters", "failed_haplotyping"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend(haplotypes.iter().map(|h| format!("haplotype_{h}_reads")));
        csv_writer.write_record(&header)?;

        Ok(CountWriter {
            csv_writer,
            num_haplotypes: haplotypes.len()
        })
    }

    /// Writes the row for a single sample
    /// # Arguments
    /// * `tally` - the finished tally for the sample
    /// # Errors
    /// * if the tally was built with a different number of haplotypes than the header
    /// * if the row cannot be written
    pub fn write_tally(&mut self, tally: &SampleTally) -> csv::Result<()> {
        if tally.haplotype_counts().len() != self.num_haplotypes {
            return Err(csv::Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("tally for {} has {} haplotype counts, header has {}", tally.sample_name(), tally.haplotype_counts().len(), self.num_haplotypes)
            )));
        }
        let mut row: Vec<String> = vec![
            tally.sample_name().to_string(),
            tally.total_reads().to_string(),
            tally.failed_qc().to_string(),
            tally.failed_filters().to_string(),
            tally.failed_haplotyping().to_string()
        ];
        row.extend(tally.haplotype_counts().iter().map(|c| c.to_string()));
        self.csv_writer.write_record(&row)?;
        self.csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster_tally::SampleReadCounts;
    use crate::data_types::cluster_record::ClusterRecord;
    use crate::data_types::haplotypes::{HaplotypeCall, HaplotypeVocabulary};

    #[test]
    fn test_write_counts() {
        let out_dir = tempfile::tempdir().unwrap();
        let filename = out_dir.path().join("gene.haplotype_counts.csv");
        let haplotypes = vec!["cg".to_string()];
        let mut writer = CountWriter::new(&filename, &haplotypes).unwrap();

        let mut tally = SampleTally::new("sample", SampleReadCounts { total_reads: 100, passed_qc_reads: 90 }, 1).unwrap();
        let cluster = ClusterRecord::from_label("sample", "cluster-0_ReadCount-90 cluster_freq:1.0", b"ACGTAGGT", true).unwrap();
        tally.add_cluster(&cluster, &HaplotypeCall::Recognized { haplotype: "cg".to_string(), index: 0 });
        writer.write_tally(&tally).unwrap();
        std::mem::drop(writer);

        let contents = std::fs::read_to_string(&filename).unwrap();
        assert_eq!(contents, "sample_name,total_reads,failed_qc,failed_filters,failed_haplotyping,haplotype_cg_reads\nsample,100,10,0,0,90\n");
    }

    #[test]
    fn test_multiple_haplotype_columns() {
        let out_dir = tempfile::tempdir().unwrap();
        let filename = out_dir.path().join("counts.csv");
        let haplotypes = vec!["ct".to_string(), "ga".to_string(), "cg".to_string()];
        let mut writer = CountWriter::new(&filename, &haplotypes).unwrap();
        let tally = SampleTally::new("s1", SampleReadCounts { total_reads: 3, passed_qc_reads: 0 }, 3).unwrap();
        writer.write_tally(&tally).unwrap();
        std::mem::drop(writer);

        let contents = std::fs::read_to_string(&filename).unwrap();
        assert_eq!(contents, "sample_name,total_reads,failed_qc,failed_filters,failed_haplotyping,haplotype_ct_reads,haplotype_ga_reads,haplotype_cg_reads\ns1,3,3,0,0,0,0,0\n");
    }

    #[test]
    fn test_header_keeps_configured_case() {
        let out_dir = tempfile::tempdir().unwrap();
        let filename = out_dir.path().join("counts.csv");
        let haplotypes = vec!["CG".to_string(), "Ct".to_string()];
        let vocabulary = HaplotypeVocabulary::new(&haplotypes, 2).unwrap();
        let writer = CountWriter::new(&filename, vocabulary.haplotypes()).unwrap();
        std::mem::drop(writer);

        let contents = std::fs::read_to_string(&filename).unwrap();
        assert_eq!(contents, "sample_name,total_reads,failed_qc,failed_filters,failed_haplotyping,haplotype_CG_reads,haplotype_Ct_reads\n");
    }

    #[test]
    fn test_column_count_mismatch() {
        let out_dir = tempfile::tempdir().unwrap();
        let filename = out_dir.path().join("counts.csv");
        let haplotypes = vec!["ct".to_string(), "ga".to_string()];
        let mut writer = CountWriter::new(&filename, &haplotypes).unwrap();
        let tally = SampleTally::new("s1", SampleReadCounts { total_reads: 3, passed_qc_reads: 0 }, 3).unwrap();
        assert!(writer.write_tally(&tally).is_err());
    }
}
