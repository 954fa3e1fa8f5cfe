/// Contains the writer for the cluster assignment table
pub mod cluster_writer;
/// Contains the writer for the per-sample haplotype count table
pub mod count_writer;
