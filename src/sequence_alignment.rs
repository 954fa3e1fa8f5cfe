
use bio::alignment::pairwise::Aligner;
use bio::alignment::{Alignment, AlignmentOperation};
use bio::alphabets::dna::revcomp;
use log::trace;
use std::ops::Range;

/// Symbol reported for reference columns that have no aligned query base
pub const GAP_SYMBOL: u8 = b'-';
/// The symbols we allow in a query, after upper-casing
const VALID_SYMBOLS: &[u8] = b"ACGTN";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AlignmentError {
    #[error("query sequence is empty")]
    EmptyQuery,
    #[error("query sequence contains invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol { symbol: char, position: usize }
}

/// Scores used for local alignment, all values are in tenths of a point.
/// Match and mismatch are both positive so that coverage drives the orientation choice.
/// Gaps are free by default, so an indel never shifts the bases that follow it onto the wrong reference column.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScoringPolicy {
    /// Score for identical symbols
    pub match_score: i32,
    /// Score for differing symbols
    pub mismatch_score: i32,
    /// Penalty for opening a gap, must be <= 0
    pub gap_open: i32,
    /// Penalty for each gap position, must be <= 0
    pub gap_extend: i32
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        ScoringPolicy {
            match_score: 10,
            mismatch_score: 9,
            gap_open: 0,
            gap_extend: 0
        }
    }
}

/// Which strand of the query produced an alignment
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Orientation {
    Forward,
    ReverseComplement
}

/// A local alignment projected onto reference coordinates.
/// Every reference position maps to the aligned query symbol or `GAP_SYMBOL`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferenceAlignment {
    /// Alignment score from the DP
    score: i32,
    /// The strand of the query that was aligned
    orientation: Orientation,
    /// Reference range covered by the local alignment, 0-based and end exclusive
    reference_range: Range<usize>,
    /// Length = reference length; query symbol per reference column
    query_columns: Vec<u8>
}

impl ReferenceAlignment {
    /// Converts a `bio` alignment where x is the query and y is the reference
    fn from_alignment(alignment: &Alignment, query: &[u8], reference_len: usize, orientation: Orientation) -> ReferenceAlignment {
        let mut query_columns: Vec<u8> = vec![GAP_SYMBOL; reference_len];
        let mut x: usize = alignment.xstart;
        let mut y: usize = alignment.ystart;
        for op in alignment.operations.iter() {
            match op {
                AlignmentOperation::Match |
                AlignmentOperation::Subst => {
                    query_columns[y] = query[x];
                    x += 1;
                    y += 1;
                },
                AlignmentOperation::Del => {
                    // reference base with no query base, leave the gap symbol
                    y += 1;
                },
                AlignmentOperation::Ins => {
                    x += 1;
                },
                // local alignments have these filtered out already
                AlignmentOperation::Xclip(_) |
                AlignmentOperation::Yclip(_) => {}
            };
        }
        assert_eq!(x, alignment.xend);
        assert_eq!(y, alignment.yend);

        ReferenceAlignment {
            score: alignment.score,
            orientation,
            reference_range: alignment.ystart..alignment.yend,
            query_columns
        }
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn reference_range(&self) -> &Range<usize> {
        &self.reference_range
    }

    /// Returns the query symbol aligned to a reference coordinate, `GAP_SYMBOL` if nothing is aligned there.
    /// Returns None if `position` is past the end of the reference.
    /// # Arguments
    /// * `position` - 0-based reference coordinate
    pub fn query_symbol_at(&self, position: usize) -> Option<u8> {
        self.query_columns.get(position).copied()
    }
}

/// Upper-cases a query and makes sure it is a non-empty nucleotide sequence
fn normalize_query(query: &[u8]) -> Result<Vec<u8>, AlignmentError> {
    if query.is_empty() {
        return Err(AlignmentError::EmptyQuery);
    }
    let normalized: Vec<u8> = query.to_ascii_uppercase();
    if let Some(position) = normalized.iter().position(|c| !VALID_SYMBOLS.contains(c)) {
        return Err(AlignmentError::InvalidSymbol { symbol: query[position] as char, position });
    }
    Ok(normalized)
}

/// Runs the local alignment on an already normalized query
fn local_alignment(reference: &[u8], query: &[u8], scoring: &ScoringPolicy, orientation: Orientation) -> ReferenceAlignment {
    let match_score: i32 = scoring.match_score;
    let mismatch_score: i32 = scoring.mismatch_score;
    let match_fn = move |a: u8, b: u8| if a == b { match_score } else { mismatch_score };
    let mut aligner = Aligner::with_capacity(query.len(), reference.len(), scoring.gap_open, scoring.gap_extend, match_fn);
    let alignment: Alignment = aligner.local(query, reference);
    trace!("{:?} alignment: score={}, query={}..{}, reference={}..{}", orientation, alignment.score, alignment.xstart, alignment.xend, alignment.ystart, alignment.yend);
    ReferenceAlignment::from_alignment(&alignment, query, reference.len(), orientation)
}

/// Locally aligns a query against the reference in the given orientation.
/// # Arguments
/// * `reference` - the upper-case reference sequence
/// * `query` - the query sequence, any case
/// * `scoring` - the scoring policy
/// # Errors
/// * if `query` is empty
/// * if `query` contains anything other than A, C, G, T, or N
pub fn align(reference: &[u8], query: &[u8], scoring: &ScoringPolicy) -> Result<ReferenceAlignment, AlignmentError> {
    let normalized: Vec<u8> = normalize_query(query)?;
    Ok(local_alignment(reference, &normalized, scoring, Orientation::Forward))
}

/// Aligns both the query and its reverse complement, returning whichever scores strictly higher.
/// Equal scores keep the forward orientation.
/// # Arguments
/// * `reference` - the upper-case reference sequence
/// * `query` - the query sequence, any case
/// * `scoring` - the scoring policy
/// # Errors
/// * if `query` is empty or contains invalid symbols
pub fn resolve(reference: &[u8], query: &[u8], scoring: &ScoringPolicy) -> Result<ReferenceAlignment, AlignmentError> {
    let normalized: Vec<u8> = normalize_query(query)?;
    let forward = local_alignment(reference, &normalized, scoring, Orientation::Forward);
    let rev_comp: Vec<u8> = revcomp(&normalized);
    let reverse = local_alignment(reference, &rev_comp, scoring, Orientation::ReverseComplement);
    if reverse.score() > forward.score() {
        Ok(reverse)
    } else {
        Ok(forward)
    }
}
