
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::cluster_tally::ClusterAssignment;

/// Column names for the cluster assignment table
const CLUSTER_HEADER: [&str; 3] = ["sample_name", "cluster_name", "haplotype"];

/// Writes the table of clusters that were assigned a haplotype
pub struct ClusterWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>
}

/// Contains all the data written to each row of the cluster file
#[derive(Serialize)]
struct ClusterRow<'a> {
    /// the sample name
    sample_name: &'a str,
    /// the pbaa cluster number
    cluster_name: &'a str,
    /// the assigned haplotype
    haplotype: &'a str
}

impl ClusterWriter {
    /// Creates a new writer for a given filename, the header is written immediately
    /// # Arguments
    /// * `filename` - the path to write all assignments to
    pub fn new(filename: &Path) -> csv::Result<ClusterWriter> {
        // header is written by hand so that it is present even with no assigned clusters
        let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(b',')
            .has_headers(false)
            .from_path(filename)?;
        csv_writer.write_record(CLUSTER_HEADER)?;
        Ok(ClusterWriter {
            csv_writer
        })
    }

    /// Writes the assignments for one sample, anything without a haplotype is skipped.
    /// # Arguments
    /// * `assignments` - the cluster assignments, written in the given order
    /// # Errors
    /// * if the csv_writer has any errors
    pub fn write_assignments(&mut self, assignments: &[ClusterAssignment]) -> csv::Result<()> {
        for assignment in assignments.iter() {
            if let Some(haplotype) = assignment.haplotype.as_deref() {
                let row = ClusterRow {
                    sample_name: &assignment.sample_name,
                    cluster_name: &assignment.cluster_id,
                    haplotype
                };
                self.csv_writer.serialize(&row)?;
            }
        }
        self.csv_writer.flush()?;
        Ok(())
    }
}
