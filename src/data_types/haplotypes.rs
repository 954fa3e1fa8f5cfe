
use rustc_hash::FxHashMap as HashMap;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum VocabularyError {
    #[error("at least one haplotype must be provided")]
    EmptyVocabulary,
    #[error("haplotype {haplotype:?} must have length {expected}, one allele per SNP site")]
    HaplotypeLength { haplotype: String, expected: usize },
    #[error("haplotype {haplotype:?} was provided more than once")]
    DuplicateHaplotype { haplotype: String }
}

/// The ordered set of haplotype codes we report counts for
#[derive(Clone, Debug)]
pub struct HaplotypeVocabulary {
    /// Codes as configured, in configured order; this is also the output column order
    haplotypes: Vec<String>,
    /// Lookup from lower-case code to index in `haplotypes`
    index_map: HashMap<String, usize>
}

impl HaplotypeVocabulary {
    /// Builds the vocabulary.
    /// Codes keep their configured spelling for reporting, lookups are on the lower-case form.
    /// # Arguments
    /// * `haplotypes` - the codes in the order they should be reported
    /// * `code_len` - the required length of each code, one character per SNP site
    /// # Errors
    /// * if `haplotypes` is empty
    /// * if any code is not exactly `code_len` characters
    /// * if any code appears twice, ignoring case
    pub fn new(haplotypes: &[String], code_len: usize) -> Result<HaplotypeVocabulary, VocabularyError> {
        if haplotypes.is_empty() {
            return Err(VocabularyError::EmptyVocabulary);
        }

        let mut index_map: HashMap<String, usize> = Default::default();
        for (index, haplotype) in haplotypes.iter().enumerate() {
            if haplotype.chars().count() != code_len {
                return Err(VocabularyError::HaplotypeLength { haplotype: haplotype.clone(), expected: code_len });
            }
            if index_map.insert(haplotype.to_ascii_lowercase(), index).is_some() {
                return Err(VocabularyError::DuplicateHaplotype { haplotype: haplotype.clone() });
            }
        }

        Ok(HaplotypeVocabulary {
            haplotypes: haplotypes.to_vec(),
            index_map
        })
    }

    pub fn haplotypes(&self) -> &[String] {
        &self.haplotypes
    }

    pub fn len(&self) -> usize {
        self.haplotypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.haplotypes.is_empty()
    }

    /// Returns the column index for a lower-case code if it is part of the vocabulary
    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.index_map.get(code).copied()
    }
}

/// Outcome of calling the haplotype for one cluster sequence
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HaplotypeCall {
    /// The code is in the vocabulary; `index` is its position in the vocabulary
    Recognized { haplotype: String, index: usize },
    /// The code is well-formed but not part of the vocabulary
    Unrecognized(String),
    /// The sequence was a placeholder (or empty), so no alignment was attempted
    Indeterminate
}

impl HaplotypeCall {
    /// The haplotype to report, only set for recognized codes
    pub fn haplotype(&self) -> Option<&str> {
        match self {
            HaplotypeCall::Recognized { haplotype, .. } => Some(haplotype),
            HaplotypeCall::Unrecognized(_) |
            HaplotypeCall::Indeterminate => None
        }
    }
}
