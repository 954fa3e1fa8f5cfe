
use crate::data_types::haplotypes::{HaplotypeCall, HaplotypeVocabulary, VocabularyError};
use crate::data_types::reference_sequence::ReferenceSequence;
use crate::sequence_alignment::{AlignmentError, ReferenceAlignment, ScoringPolicy, resolve};

use log::trace;

/// pbaa reports clusters it could not build a consensus for with this sequence
pub const PLACEHOLDER_SEQUENCE: &[u8] = b"NNNNNNNNNN";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("SNP position {position} is outside the reference (length {reference_len})")]
    InvalidPosition { position: usize, reference_len: usize },
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
    #[error("invalid scoring: {0}")]
    InvalidScoring(String)
}

/// Everything that is fixed for the duration of a run
#[derive(Clone, Debug)]
pub struct HaplotypeConfig {
    /// The amplicon reference that clusters are aligned to
    reference: ReferenceSequence,
    /// 0-based reference coordinates of the SNP sites, in code order
    snp_positions: [usize; 2],
    /// The haplotypes we report counts for
    vocabulary: HaplotypeVocabulary,
    /// Local alignment scores
    scoring: ScoringPolicy
}

impl HaplotypeConfig {
    /// Creates and validates the run configuration.
    /// # Arguments
    /// * `reference` - the loaded reference
    /// * `snp_positions` - the two 0-based SNP coordinates
    /// * `haplotypes` - the vocabulary, in output order
    /// * `scoring` - the alignment scoring
    /// # Errors
    /// * if either position is outside the reference
    /// * if the vocabulary is empty, has duplicates, or has codes of the wrong length
    /// * if the scoring has positive gap penalties or mismatch >= match
    pub fn new(reference: ReferenceSequence, snp_positions: [usize; 2], haplotypes: &[String], scoring: ScoringPolicy) -> Result<HaplotypeConfig, ConfigError> {
        for &position in snp_positions.iter() {
            if position >= reference.len() {
                return Err(ConfigError::InvalidPosition { position, reference_len: reference.len() });
            }
        }

        let vocabulary = HaplotypeVocabulary::new(haplotypes, snp_positions.len())?;

        if scoring.gap_open > 0 || scoring.gap_extend > 0 {
            return Err(ConfigError::InvalidScoring(format!("gap penalties must be <= 0, got open={} extend={}", scoring.gap_open, scoring.gap_extend)));
        }
        if scoring.mismatch_score >= scoring.match_score {
            return Err(ConfigError::InvalidScoring(format!("match score ({}) must be greater than mismatch score ({})", scoring.match_score, scoring.mismatch_score)));
        }

        Ok(HaplotypeConfig {
            reference,
            snp_positions,
            vocabulary,
            scoring
        })
    }

    pub fn reference(&self) -> &ReferenceSequence {
        &self.reference
    }

    pub fn snp_positions(&self) -> &[usize; 2] {
        &self.snp_positions
    }

    pub fn vocabulary(&self) -> &HaplotypeVocabulary {
        &self.vocabulary
    }

    pub fn scoring(&self) -> &ScoringPolicy {
        &self.scoring
    }
}

/// Reads the query symbols at each SNP site and builds the lower-case code
/// # Arguments
/// * `alignment` - the orientation-resolved alignment
/// * `snp_positions` - reference coordinates, already validated against the reference length
pub fn haplotype_code(alignment: &ReferenceAlignment, snp_positions: &[usize]) -> String {
    snp_positions.iter()
        .map(|&p| {
            let symbol: u8 = alignment.query_symbol_at(p)
                .expect("SNP positions are validated against the reference length");
            symbol.to_ascii_lowercase() as char
        })
        .collect()
}

/// Assigns haplotypes to cluster sequences using a fixed configuration
pub struct HaplotypeCaller<'a> {
    config: &'a HaplotypeConfig
}

impl<'a> HaplotypeCaller<'a> {
    pub fn new(config: &'a HaplotypeConfig) -> HaplotypeCaller<'a> {
        HaplotypeCaller {
            config
        }
    }

    pub fn config(&self) -> &HaplotypeConfig {
        self.config
    }

    /// Classifies a single cluster sequence.
    /// Placeholder and empty sequences are `Indeterminate` and never aligned.
    /// # Arguments
    /// * `sequence` - the consensus sequence, any case
    /// # Errors
    /// * if the sequence contains symbols other than A, C, G, T, or N
    pub fn classify(&self, sequence: &[u8]) -> Result<HaplotypeCall, AlignmentError> {
        if sequence.eq_ignore_ascii_case(PLACEHOLDER_SEQUENCE) {
            trace!("Placeholder sequence, skipping alignment");
            return Ok(HaplotypeCall::Indeterminate);
        }

        let alignment: ReferenceAlignment = match resolve(self.config.reference.sequence(), sequence, &self.config.scoring) {
            Ok(a) => a,
            Err(AlignmentError::EmptyQuery) => {
                trace!("Empty sequence, skipping alignment");
                return Ok(HaplotypeCall::Indeterminate);
            },
            Err(e) => return Err(e)
        };

        let code: String = haplotype_code(&alignment, &self.config.snp_positions);
        trace!("{:?} alignment with score {} produced code {:?}", alignment.orientation(), alignment.score(), code);
        Ok(match self.config.vocabulary.index_of(&code) {
            Some(index) => HaplotypeCall::Recognized { haplotype: code, index },
            None => HaplotypeCall::Unrecognized(code)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bio::alphabets::dna::revcomp;

    const REFERENCE: &[u8] = b"GATTACACCGTTAGCTAGGCTTAACGGATCCA";
    const LONG_REFERENCE: &[u8] = b"GCTAAAGACAATTACATAACATACACGTCAGCACGAAACTTGTTGGCCCAGTGTGAATCGCTTAAGGGTTAAGTAAGTGT";

    fn build_config(reference: &[u8], snp_positions: [usize; 2], haplotypes: &[&str]) -> HaplotypeConfig {
        let haplotypes: Vec<String> = haplotypes.iter().map(|h| h.to_string()).collect();
        HaplotypeConfig::new(
            ReferenceSequence::new("test", reference),
            snp_positions, &haplotypes, ScoringPolicy::default()
        ).unwrap()
    }

    /// The reference with two substitutions at the SNP sites used below
    fn variant_query(base_1: u8, base_2: u8) -> Vec<u8> {
        let mut query = REFERENCE.to_vec();
        query[8] = base_1;
        query[21] = base_2;
        query
    }

    #[test]
    fn test_unrecognized_identity() {
        let config = build_config(b"ACGTACGT", [1, 5], &["cg", "ct"]);
        let caller = HaplotypeCaller::new(&config);
        assert_eq!(caller.classify(b"ACGTACGT").unwrap(), HaplotypeCall::Unrecognized("cc".to_string()));
    }

    #[test]
    fn test_recognized() {
        let config = build_config(b"ACGTACGT", [1, 5], &["cg"]);
        let caller = HaplotypeCaller::new(&config);
        assert_eq!(
            caller.classify(b"ACGTAGGT").unwrap(),
            HaplotypeCall::Recognized { haplotype: "cg".to_string(), index: 0 }
        );

        // configured codes match regardless of case, the call is always lower-case
        let config = build_config(b"ACGTACGT", [1, 5], &["CT", "CG"]);
        let caller = HaplotypeCaller::new(&config);
        assert_eq!(
            caller.classify(b"ACGTAGGT").unwrap(),
            HaplotypeCall::Recognized { haplotype: "cg".to_string(), index: 1 }
        );
    }

    #[test]
    fn test_placeholder() {
        let config = build_config(b"ACGTACGT", [1, 5], &["cg"]);
        let caller = HaplotypeCaller::new(&config);
        assert_eq!(caller.classify(b"NNNNNNNNNN").unwrap(), HaplotypeCall::Indeterminate);
        assert_eq!(caller.classify(b"nnnnnnnnnn").unwrap(), HaplotypeCall::Indeterminate);
        assert_eq!(caller.classify(b"").unwrap(), HaplotypeCall::Indeterminate);

        let config = build_config(REFERENCE, [0, 31], &["ga"]);
        let caller = HaplotypeCaller::new(&config);
        assert_eq!(caller.classify(PLACEHOLDER_SEQUENCE).unwrap(), HaplotypeCall::Indeterminate);
    }

    #[test]
    fn test_invalid_symbol() {
        let config = build_config(REFERENCE, [8, 21], &["ct"]);
        let caller = HaplotypeCaller::new(&config);
        assert!(matches!(caller.classify(b"GATTACAXCG"), Err(AlignmentError::InvalidSymbol { symbol: 'X', .. })));
    }

    #[test]
    fn test_orientation_symmetry() {
        let config = build_config(REFERENCE, [8, 21], &["ct", "ga", "cg"]);
        let caller = HaplotypeCaller::new(&config);
        for &(b1, b2, expected) in [(b'C', b'T', "ct"), (b'G', b'A', "ga"), (b'C', b'G', "cg"), (b'T', b'T', "tt")].iter() {
            let query = variant_query(b1, b2);
            let forward = caller.classify(&query).unwrap();
            let reverse = caller.classify(&revcomp(&query)).unwrap();
            assert_eq!(forward, reverse);
            let code = match forward {
                HaplotypeCall::Recognized { haplotype, .. } => haplotype,
                HaplotypeCall::Unrecognized(code) => code,
                HaplotypeCall::Indeterminate => panic!("unexpected indeterminate call")
            };
            assert_eq!(code, expected);
        }
    }

    #[test]
    fn test_deterministic() {
        let config = build_config(REFERENCE, [8, 21], &["ct"]);
        let caller = HaplotypeCaller::new(&config);
        let query = variant_query(b'C', b'T');
        let first = caller.classify(&query).unwrap();
        assert_eq!(first, HaplotypeCall::Recognized { haplotype: "ct".to_string(), index: 0 });
        for _ in 0..5 {
            assert_eq!(caller.classify(&query).unwrap(), first);
        }
    }

    #[test]
    fn test_partial_coverage() {
        // the query stops before the second SNP, so it reads as a gap
        let config = build_config(REFERENCE, [8, 25], &["cg"]);
        let caller = HaplotypeCaller::new(&config);
        assert_eq!(caller.classify(&REFERENCE[0..16]).unwrap(), HaplotypeCall::Unrecognized("c-".to_string()));
    }

    /// LONG_REFERENCE with the A/G variant at position 6 and the G/A variant at position 70
    fn long_variant_query() -> Vec<u8> {
        let mut query = LONG_REFERENCE.to_vec();
        query[6] = b'A';
        query[70] = b'G';
        query
    }

    #[test]
    fn test_deletion_between_sites() {
        let config = build_config(LONG_REFERENCE, [6, 70], &["ga", "ag"]);
        let caller = HaplotypeCaller::new(&config);
        let expected = HaplotypeCall::Recognized { haplotype: "ag".to_string(), index: 1 };

        // drop the T at position 40, every base after it moves up by one
        let mut query = long_variant_query();
        query.remove(40);
        assert_eq!(caller.classify(&query).unwrap(), expected);
        assert_eq!(caller.classify(&revcomp(&query)).unwrap(), expected);

        // a deletion closer to the second site
        let mut query = long_variant_query();
        query.remove(55);
        assert_eq!(caller.classify(&query).unwrap(), expected);
    }

    #[test]
    fn test_insertion_between_sites() {
        let config = build_config(LONG_REFERENCE, [6, 70], &["ga", "ag"]);
        let caller = HaplotypeCaller::new(&config);
        let expected = HaplotypeCall::Recognized { haplotype: "ag".to_string(), index: 1 };

        let mut query = long_variant_query();
        query.insert(40, b'A');
        assert_eq!(caller.classify(&query).unwrap(), expected);
        assert_eq!(caller.classify(&revcomp(&query)).unwrap(), expected);
    }

    #[test]
    fn test_config_errors() {
        let reference = ReferenceSequence::new("test", b"ACGTACGT");
        let haplotypes = vec!["cg".to_string()];
        assert_eq!(
            HaplotypeConfig::new(reference.clone(), [1, 8], &haplotypes, ScoringPolicy::default()).unwrap_err(),
            ConfigError::InvalidPosition { position: 8, reference_len: 8 }
        );
        assert_eq!(
            HaplotypeConfig::new(reference.clone(), [1, 5], &[], ScoringPolicy::default()).unwrap_err(),
            ConfigError::Vocabulary(VocabularyError::EmptyVocabulary)
        );

        let positive_gap = ScoringPolicy { gap_open: 5, ..Default::default() };
        assert!(matches!(
            HaplotypeConfig::new(reference.clone(), [1, 5], &haplotypes, positive_gap),
            Err(ConfigError::InvalidScoring(_))
        ));
        let flat = ScoringPolicy { match_score: 9, mismatch_score: 9, ..Default::default() };
        assert!(matches!(
            HaplotypeConfig::new(reference, [1, 5], &haplotypes, flat),
            Err(ConfigError::InvalidScoring(_))
        ));
    }
}
