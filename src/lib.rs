
/// CLI functionality and checks
pub mod cli;
/// Per-sample read accounting across passed and failed clusters
pub mod cluster_tally;
/// Contains the core data types for references, clusters, and haplotypes
pub mod data_types;
/// Assigns a two-locus haplotype code to a cluster sequence
pub mod haplotype_caller;
/// Loading of pbaa cluster files and the read count sources for each sample
pub mod pbaa_parsing;
/// Organizes the workflow for a single sample: load, classify, and tally
pub mod sample_processor;
/// Local alignment against the reference and orientation selection
pub mod sequence_alignment;
/// Contains the CSV output writers
pub mod writers;
