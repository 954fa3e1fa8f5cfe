/// Contains the cluster record type and the pbaa label parser
pub mod cluster_record;
/// Haplotype vocabulary and call outcomes
pub mod haplotypes;
/// Wrapper for the in-memory amplicon reference
pub mod reference_sequence;
